//! Summing accumulation differences into the derived field.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::derived::DerivedField;
use crate::error::Result;
use crate::store::{GridFile, Lookup};

/// A source field that could not contribute to the derived field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    pub field: String,
    /// File the field was missing from.
    pub file: PathBuf,
}

impl fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "variable \"{}\" missing in \"{}\", skipping",
            self.field,
            self.file.display()
        )
    }
}

/// Add `current - previous` of every field in `fields` into `derived`.
///
/// Fields are visited in list order. A field missing from the previous file
/// is not looked up in the current one, so each skipped field yields exactly
/// one warning. Shape mismatches and storage faults are errors.
pub fn accumulate<P: GridFile, C: GridFile>(
    fields: &[String],
    previous: &P,
    current: &C,
    derived: &mut DerivedField,
) -> Result<Vec<FieldWarning>> {
    let mut warnings = Vec::new();

    for name in fields {
        let prev = match previous.lookup_variable(name)? {
            Lookup::Found(field) => field,
            Lookup::NotFound => {
                warnings.push(missing(name, previous.path()));
                continue;
            }
        };
        let curr = match current.lookup_variable(name)? {
            Lookup::Found(field) => field,
            Lookup::NotFound => {
                warnings.push(missing(name, current.path()));
                continue;
            }
        };

        derived.add_difference((previous.path(), current.path()), &prev, &curr)?;
        debug!(field = %name, "Added accumulation since last output time");
    }

    Ok(warnings)
}

fn missing(field: &str, file: &Path) -> FieldWarning {
    let warning = FieldWarning {
        field: field.to_string(),
        file: file.to_path_buf(),
    };
    warn!(field, file = %file.display(), "{}", warning);
    warning
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DerivedFieldConfig;
    use crate::memory::{Dataset, MemoryStore};
    use crate::store::{GridStore, OpenMode};
    use crate::PrecipError;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_in_previous_skips_current_lookup() {
        let store = MemoryStore::new();
        store.insert("a", Dataset::wrf(1, 1).with_time(0.0));
        store.insert("b", Dataset::wrf(1, 1).with_time(60.0).with_field("RAINC", &[3.0]));
        let a = store.open(Path::new("a"), OpenMode::ReadOnly).unwrap();
        let b = store.open(Path::new("b"), OpenMode::ReadOnly).unwrap();

        let mut derived = DerivedField::zeroed(&DerivedFieldConfig::default(), vec![1, 1, 1]);
        let warnings = accumulate(&names(&["RAINC"]), &a, &b, &mut derived).unwrap();

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].file, PathBuf::from("a"));
        assert_eq!(derived.values, vec![0.0]);
    }

    #[test]
    fn test_missing_in_current_names_current_file() {
        let store = MemoryStore::new();
        store.insert("a", Dataset::wrf(1, 1).with_time(0.0).with_field("RAINNC", &[1.0]));
        store.insert("b", Dataset::wrf(1, 1).with_time(60.0));
        let a = store.open(Path::new("a"), OpenMode::ReadOnly).unwrap();
        let b = store.open(Path::new("b"), OpenMode::ReadOnly).unwrap();

        let mut derived = DerivedField::zeroed(&DerivedFieldConfig::default(), vec![1, 1, 1]);
        let warnings = accumulate(&names(&["RAINNC"]), &a, &b, &mut derived).unwrap();

        assert_eq!(warnings, vec![FieldWarning {
            field: "RAINNC".to_string(),
            file: PathBuf::from("b"),
        }]);
        assert_eq!(
            warnings[0].to_string(),
            "variable \"RAINNC\" missing in \"b\", skipping"
        );
    }

    #[test]
    fn test_sums_fields_present_in_both() {
        let store = MemoryStore::new();
        store.insert(
            "a",
            Dataset::wrf(1, 2)
                .with_time(0.0)
                .with_field("RAINC", &[1.0, 1.0])
                .with_field("RAINNC", &[2.0, 0.0]),
        );
        store.insert(
            "b",
            Dataset::wrf(1, 2)
                .with_time(60.0)
                .with_field("RAINC", &[3.0, 1.0])
                .with_field("RAINNC", &[5.0, 4.0]),
        );
        let a = store.open(Path::new("a"), OpenMode::ReadOnly).unwrap();
        let b = store.open(Path::new("b"), OpenMode::ReadOnly).unwrap();

        let mut derived = DerivedField::zeroed(&DerivedFieldConfig::default(), vec![1, 1, 2]);
        let warnings = accumulate(&names(&["RAINC", "RAINNC"]), &a, &b, &mut derived).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(derived.values, vec![5.0, 4.0]);
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let store = MemoryStore::new();
        store.insert(
            "a",
            Dataset::wrf(2, 2)
                .with_time(0.0)
                .with_dimension("soil_layers", 4)
                .with_variable("RAINC", &["soil_layers"], &[0.0; 4]),
        );
        store.insert(
            "b",
            Dataset::wrf(2, 2)
                .with_time(60.0)
                .with_dimension("soil_layers", 4)
                .with_variable("RAINC", &["soil_layers"], &[1.0; 4]),
        );
        let a = store.open(Path::new("a"), OpenMode::ReadOnly).unwrap();
        let b = store.open(Path::new("b"), OpenMode::ReadOnly).unwrap();

        let mut derived = DerivedField::zeroed(&DerivedFieldConfig::default(), vec![1, 2, 2]);
        let err = accumulate(&names(&["RAINC"]), &a, &b, &mut derived).unwrap_err();
        match err {
            PrecipError::ShapeMismatch { field, previous, current, .. } => {
                assert_eq!(field, "RAINC");
                assert_eq!(previous, PathBuf::from("a"));
                assert_eq!(current, PathBuf::from("b"));
            }
            other => panic!("expected a shape mismatch, got {other:?}"),
        }
    }
}
