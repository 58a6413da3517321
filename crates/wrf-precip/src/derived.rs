//! The derived per-interval precipitation field and the title marker.

use std::path::Path;

use tracing::warn;

use crate::config::DerivedFieldConfig;
use crate::error::{PrecipError, Result};
use crate::store::{AttrValue, Field, GridFile, VariableDef};

/// Derived field held in memory until it is written to the current file.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedField {
    pub def: VariableDef,
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl DerivedField {
    /// Zero-filled field over the `(Time, south_north, west_east)` grid of `file`.
    pub fn define<F: GridFile>(file: &F, config: &DerivedFieldConfig) -> Result<Self> {
        let shape = config
            .dimensions
            .iter()
            .map(|dim| {
                file.dimension_len(dim)?
                    .ok_or_else(|| PrecipError::MissingDimension {
                        path: file.path().to_path_buf(),
                        dimension: dim.clone(),
                    })
            })
            .collect::<Result<Vec<usize>>>()?;

        Ok(Self::zeroed(config, shape))
    }

    /// Zero-filled field with an explicit shape.
    pub fn zeroed(config: &DerivedFieldConfig, shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            def: variable_def(config),
            shape,
            values: vec![0.0; len],
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Add `current - previous` elementwise.
    ///
    /// Both inputs must have exactly this field's shape. `files` names the
    /// `(previous, current)` pair the values were read from.
    pub fn add_difference(
        &mut self,
        files: (&Path, &Path),
        previous: &Field,
        current: &Field,
    ) -> Result<()> {
        for field in [previous, current] {
            if field.shape != self.shape {
                return Err(PrecipError::ShapeMismatch {
                    field: field.name.clone(),
                    previous: files.0.to_path_buf(),
                    current: files.1.to_path_buf(),
                    expected: self.shape.clone(),
                    found: field.shape.clone(),
                });
            }
        }

        for ((total, prev), curr) in self
            .values
            .iter_mut()
            .zip(&previous.values)
            .zip(&current.values)
        {
            *total += curr - prev;
        }
        Ok(())
    }

    /// Define the variable in `file` and write the accumulated values.
    pub fn write_to<F: GridFile>(&self, file: &mut F) -> Result<()> {
        file.define_variable(&self.def, &self.values)
    }
}

/// Variable schema of the derived field, attributes in WRF order.
pub fn variable_def(config: &DerivedFieldConfig) -> VariableDef {
    VariableDef {
        name: config.name.clone(),
        dimensions: config.dimensions.to_vec(),
        attributes: vec![
            ("FieldType".to_string(), AttrValue::Int(config.field_type)),
            ("MemoryOrder".to_string(), AttrValue::from(config.memory_order.as_str())),
            ("description".to_string(), AttrValue::from(config.description.as_str())),
            ("units".to_string(), AttrValue::from(config.units.as_str())),
            ("stagger".to_string(), AttrValue::from(config.stagger.as_str())),
            ("coordinates".to_string(), AttrValue::from(config.coordinates.as_str())),
        ],
    }
}

/// Append `suffix` to the title attribute of `file`.
///
/// A file without a title gets the suffix alone, trimmed. Returns the new title.
pub fn annotate_title<F: GridFile>(file: &mut F, attribute: &str, suffix: &str) -> Result<String> {
    let title = match file.text_attribute(attribute)? {
        Some(existing) => format!("{}{}", existing, suffix),
        None => {
            warn!(
                file = %file.path().display(),
                attribute,
                "Title attribute missing, writing marker only"
            );
            suffix.trim_start().to_string()
        }
    };
    file.set_text_attribute(attribute, &title)?;
    Ok(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Dataset, MemoryStore};
    use crate::store::{GridStore, OpenMode};

    fn files() -> (&'static Path, &'static Path) {
        (Path::new("wrfout_a"), Path::new("wrfout_b"))
    }

    fn field_of(name: &str, shape: &[usize], values: &[f32]) -> Field {
        Field {
            name: name.to_string(),
            shape: shape.to_vec(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_define_uses_grid_dimensions() {
        let store = MemoryStore::new();
        store.insert("f.nc", Dataset::wrf(3, 4).with_time(60.0));
        let file = store.open(Path::new("f.nc"), OpenMode::ReadOnly).unwrap();

        let field = DerivedField::define(&file, &DerivedFieldConfig::default()).unwrap();
        assert_eq!(field.shape, vec![1, 3, 4]);
        assert_eq!(field.values, vec![0.0; 12]);
        assert_eq!(field.name(), "PRECIP_H");
    }

    #[test]
    fn test_define_requires_dimensions() {
        let store = MemoryStore::new();
        store.insert("f.nc", Dataset::default().with_dimension("Time", 1));
        let file = store.open(Path::new("f.nc"), OpenMode::ReadOnly).unwrap();

        let err = DerivedField::define(&file, &DerivedFieldConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            PrecipError::MissingDimension { ref dimension, .. } if dimension == "south_north"
        ));
    }

    #[test]
    fn test_attributes_match_wrf_conventions() {
        let def = variable_def(&DerivedFieldConfig::default());
        assert_eq!(def.dimensions, vec!["Time", "south_north", "west_east"]);
        let get = |key: &str| {
            def.attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("FieldType"), Some(AttrValue::Int(104)));
        assert_eq!(get("MemoryOrder"), Some(AttrValue::from("XY")));
        assert_eq!(get("units"), Some(AttrValue::from("mm/[OUTPUT TIME INTERVAL]")));
        assert_eq!(get("stagger"), Some(AttrValue::from("")));
        assert_eq!(get("coordinates"), Some(AttrValue::from("XLONG XLAT")));
    }

    #[test]
    fn test_add_difference_accumulates() {
        let mut total = DerivedField::zeroed(&DerivedFieldConfig::default(), vec![1, 1, 2]);
        let shape = [1, 1, 2];
        total
            .add_difference(
                files(),
                &field_of("RAINC", &shape, &[1.0, 2.0]),
                &field_of("RAINC", &shape, &[4.0, 2.0]),
            )
            .unwrap();
        total
            .add_difference(
                files(),
                &field_of("RAINNC", &shape, &[0.0, 1.0]),
                &field_of("RAINNC", &shape, &[1.0, 6.0]),
            )
            .unwrap();
        assert_eq!(total.values, vec![4.0, 5.0]);
    }

    #[test]
    fn test_add_difference_rejects_shape_mismatch() {
        let mut total = DerivedField::zeroed(&DerivedFieldConfig::default(), vec![1, 2, 2]);
        let err = total
            .add_difference(
                files(),
                &field_of("RAINC", &[1, 2, 2], &[0.0; 4]),
                &field_of("RAINC", &[1, 4], &[0.0; 4]),
            )
            .unwrap_err();
        assert!(matches!(err, PrecipError::ShapeMismatch { ref field, .. } if field == "RAINC"));
        let message = err.to_string();
        assert!(message.contains("wrfout_a") && message.contains("wrfout_b"));
        assert_eq!(total.values, vec![0.0; 4]);
    }

    #[test]
    fn test_annotate_title_appends_suffix() {
        let store = MemoryStore::new();
        store.insert("f.nc", Dataset::wrf(1, 1).with_title("OUTPUT FROM WRF"));
        let mut file = store.open(Path::new("f.nc"), OpenMode::ReadWrite).unwrap();

        let title = annotate_title(&mut file, "TITLE", " POST-PROCESSED").unwrap();
        assert_eq!(title, "OUTPUT FROM WRF POST-PROCESSED");
        assert_eq!(store.get("f.nc").unwrap().title(), Some("OUTPUT FROM WRF POST-PROCESSED"));
    }

    #[test]
    fn test_annotate_missing_title() {
        let store = MemoryStore::new();
        store.insert("f.nc", Dataset::wrf(1, 1).without_title());
        let mut file = store.open(Path::new("f.nc"), OpenMode::ReadWrite).unwrap();

        let title = annotate_title(&mut file, "TITLE", " POST-PROCESSED").unwrap();
        assert_eq!(title, "POST-PROCESSED");
    }
}
