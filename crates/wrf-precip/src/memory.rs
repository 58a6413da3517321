//! In-memory storage backend.
//!
//! Holds datasets keyed by path behind a shared lock so handles opened from
//! the same [`MemoryStore`] see each other's writes, the way files on disk
//! would. Used by the test suite and for dry runs of synthetic data.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{PrecipError, Result};
use crate::store::{AttrValue, Field, GridFile, GridStore, Lookup, OpenMode, VariableDef};

/// A variable stored in a [`Dataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemVariable {
    pub dimensions: Vec<String>,
    pub values: Vec<f64>,
    pub attributes: Vec<(String, AttrValue)>,
}

/// Contents of one in-memory file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub dimensions: BTreeMap<String, usize>,
    pub variables: BTreeMap<String, MemVariable>,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Dataset {
    /// An empty WRF-like file with one time step on a `south_north x west_east` grid.
    pub fn wrf(south_north: usize, west_east: usize) -> Self {
        Self::default()
            .with_dimension("Time", 1)
            .with_dimension("south_north", south_north)
            .with_dimension("west_east", west_east)
            .with_title("OUTPUT FROM WRF V4.5 MODEL")
    }

    pub fn with_dimension(mut self, name: &str, len: usize) -> Self {
        self.dimensions.insert(name.to_string(), len);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.attributes
            .insert("TITLE".to_string(), AttrValue::Text(title.to_string()));
        self
    }

    pub fn without_title(mut self) -> Self {
        self.attributes.remove("TITLE");
        self
    }

    /// Set `XTIME` to a single value in minutes.
    pub fn with_time(self, minutes: f64) -> Self {
        self.with_time_values(&[minutes])
    }

    /// Set `XTIME` to several values, resizing the `Time` dimension to match.
    pub fn with_time_values(mut self, minutes: &[f64]) -> Self {
        self.dimensions.insert("Time".to_string(), minutes.len());
        self.variables.insert(
            "XTIME".to_string(),
            MemVariable {
                dimensions: vec!["Time".to_string()],
                values: minutes.to_vec(),
                attributes: vec![(
                    "units".to_string(),
                    AttrValue::Text("minutes since simulation start".to_string()),
                )],
            },
        );
        self
    }

    /// Add a `(Time, south_north, west_east)` field.
    pub fn with_field(self, name: &str, values: &[f32]) -> Self {
        self.with_variable(name, &["Time", "south_north", "west_east"], values)
    }

    /// Add a variable over arbitrary, already declared dimensions.
    pub fn with_variable(mut self, name: &str, dimensions: &[&str], values: &[f32]) -> Self {
        self.variables.insert(
            name.to_string(),
            MemVariable {
                dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
                values: values.iter().map(|&v| f64::from(v)).collect(),
                attributes: Vec::new(),
            },
        );
        self
    }

    /// Title attribute, if it is text.
    pub fn title(&self) -> Option<&str> {
        match self.attributes.get("TITLE") {
            Some(AttrValue::Text(title)) => Some(title),
            _ => None,
        }
    }

    /// Values of a variable narrowed to `f32`.
    pub fn values(&self, name: &str) -> Option<Vec<f32>> {
        self.variables
            .get(name)
            .map(|v| v.values.iter().map(|&x| x as f32).collect())
    }

    fn shape_of(&self, path: &Path, variable: &MemVariable) -> Result<Vec<usize>> {
        variable
            .dimensions
            .iter()
            .map(|d| {
                self.dimensions.get(d).copied().ok_or_else(|| {
                    PrecipError::storage(path, format!("undeclared dimension {}", d))
                })
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    files: BTreeMap<PathBuf, Dataset>,
    faults: HashSet<PathBuf>,
    mutations: usize,
}

/// Shared collection of in-memory datasets.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add or replace a file.
    pub fn insert<P: Into<PathBuf>>(&self, path: P, dataset: Dataset) {
        self.lock().files.insert(path.into(), dataset);
    }

    /// Snapshot of a file's contents.
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<Dataset> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    /// Make every later operation on `path` fail with a storage fault.
    pub fn inject_fault<P: Into<PathBuf>>(&self, path: P) {
        self.lock().faults.insert(path.into());
    }

    /// Number of write operations performed through this store.
    pub fn mutation_count(&self) -> usize {
        self.lock().mutations
    }
}

impl GridStore for MemoryStore {
    type File = MemoryFile;

    fn open(&self, path: &Path, mode: OpenMode) -> Result<MemoryFile> {
        let state = self.lock();
        if state.faults.contains(path) {
            return Err(PrecipError::storage(path, "injected fault on open"));
        }
        if !state.files.contains_key(path) {
            return Err(PrecipError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )));
        }
        Ok(MemoryFile {
            store: self.clone(),
            path: path.to_path_buf(),
            mode,
        })
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.lock();
        let dataset = state.files.get(from).cloned().ok_or_else(|| {
            PrecipError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", from.display()),
            ))
        })?;
        state.files.insert(to.to_path_buf(), dataset);
        state.mutations += 1;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }
}

/// Handle to one file in a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryFile {
    store: MemoryStore,
    path: PathBuf,
    mode: OpenMode,
}

impl MemoryFile {
    fn read<T>(&self, f: impl FnOnce(&Dataset) -> Result<T>) -> Result<T> {
        let state = self.store.lock();
        if state.faults.contains(&self.path) {
            return Err(PrecipError::storage(&self.path, "injected read fault"));
        }
        let dataset = state
            .files
            .get(&self.path)
            .ok_or_else(|| PrecipError::storage(&self.path, "file removed while open"))?;
        f(dataset)
    }

    fn write<T>(&mut self, f: impl FnOnce(&mut Dataset) -> Result<T>) -> Result<T> {
        if self.mode == OpenMode::ReadOnly {
            return Err(PrecipError::ReadOnly(self.path.clone()));
        }
        let mut state = self.store.lock();
        if state.faults.contains(&self.path) {
            return Err(PrecipError::storage(&self.path, "injected write fault"));
        }
        let dataset = state
            .files
            .get_mut(&self.path)
            .ok_or_else(|| PrecipError::storage(&self.path, "file removed while open"))?;
        let out = f(dataset)?;
        state.mutations += 1;
        Ok(out)
    }
}

impl GridFile for MemoryFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn lookup_variable(&self, name: &str) -> Result<Lookup<Field>> {
        Ok(self.lookup_values_f64(name)?.map(|(shape, values)| Field {
            name: name.to_string(),
            shape,
            values: values.into_iter().map(|v| v as f32).collect(),
        }))
    }

    fn lookup_values_f64(&self, name: &str) -> Result<Lookup<(Vec<usize>, Vec<f64>)>> {
        self.read(|dataset| match dataset.variables.get(name) {
            Some(variable) => {
                let shape = dataset.shape_of(&self.path, variable)?;
                Ok(Lookup::Found((shape, variable.values.clone())))
            }
            None => Ok(Lookup::NotFound),
        })
    }

    fn has_variable(&self, name: &str) -> Result<bool> {
        self.read(|dataset| Ok(dataset.variables.contains_key(name)))
    }

    fn dimension_len(&self, name: &str) -> Result<Option<usize>> {
        self.read(|dataset| Ok(dataset.dimensions.get(name).copied()))
    }

    fn text_attribute(&self, name: &str) -> Result<Option<String>> {
        self.read(|dataset| match dataset.attributes.get(name) {
            Some(AttrValue::Text(text)) => Ok(Some(text.clone())),
            Some(other) => Err(PrecipError::storage(
                &self.path,
                format!("attribute {} is not text: {:?}", name, other),
            )),
            None => Ok(None),
        })
    }

    fn set_text_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.write(|dataset| {
            dataset
                .attributes
                .insert(name.to_string(), AttrValue::Text(value.to_string()));
            Ok(())
        })
    }

    fn define_variable(&mut self, def: &VariableDef, values: &[f32]) -> Result<()> {
        let path = self.path.clone();
        self.write(|dataset| {
            if dataset.variables.contains_key(&def.name) {
                return Err(PrecipError::storage(
                    &path,
                    format!("variable {} already defined", def.name),
                ));
            }
            let variable = MemVariable {
                dimensions: def.dimensions.clone(),
                values: values.iter().map(|&v| f64::from(v)).collect(),
                attributes: def.attributes.clone(),
            };
            let expected: usize = dataset.shape_of(&path, &variable)?.iter().product();
            if expected != values.len() {
                return Err(PrecipError::storage(
                    &path,
                    format!(
                        "{} values given for {} ({} expected)",
                        values.len(),
                        def.name,
                        expected
                    ),
                ));
            }
            dataset.variables.insert(def.name.clone(), variable);
            Ok(())
        })
    }
}
