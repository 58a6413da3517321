//! Storage capability used by the pipeline.
//!
//! The pipeline never talks to a file format directly. It opens files through
//! a [`GridStore`] and works on the returned [`GridFile`] handles, which lets
//! the same code run against NetCDF files on disk ([`crate::NetcdfStore`]) or
//! in-memory datasets ([`crate::MemoryStore`]).
//!
//! Variable lookups return `Result<Lookup<T>>`: `Ok(Lookup::NotFound)` is the
//! only way to say "absent", so genuine faults can never be mistaken for a
//! missing variable.

use std::path::Path;

use crate::error::Result;

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// Outcome of resolving a variable by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Convert into an `Option`, dropping the distinction from errors.
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

/// Values of a variable read from a file, flattened in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl Field {
    /// Number of elements implied by the shape.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Attribute value attached to a variable or a file.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i32),
    Float(f32),
    Text(String),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f32> for AttrValue {
    fn from(value: f32) -> Self {
        AttrValue::Float(value)
    }
}

/// Schema of a variable to be added to a file.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    /// Dimension names, outermost first.
    pub dimensions: Vec<String>,
    /// Attributes in the order they are written.
    pub attributes: Vec<(String, AttrValue)>,
}

/// An open handle to one gridded output file.
///
/// Handles release their resources when dropped.
pub trait GridFile {
    /// Path the handle was opened from.
    fn path(&self) -> &Path;

    /// Read a variable as `f32` values.
    fn lookup_variable(&self, name: &str) -> Result<Lookup<Field>>;

    /// Read a variable as `f64` values (used for time coordinates).
    fn lookup_values_f64(&self, name: &str) -> Result<Lookup<(Vec<usize>, Vec<f64>)>>;

    /// Check for a variable without reading its data.
    fn has_variable(&self, name: &str) -> Result<bool>;

    /// Length of a named dimension, `None` if the file does not define it.
    fn dimension_len(&self, name: &str) -> Result<Option<usize>>;

    /// File-level text attribute, `None` if absent.
    fn text_attribute(&self, name: &str) -> Result<Option<String>>;

    /// Create or overwrite a file-level text attribute.
    fn set_text_attribute(&mut self, name: &str, value: &str) -> Result<()>;

    /// Add a new `f32` variable and write all of its values.
    fn define_variable(&mut self, def: &VariableDef, values: &[f32]) -> Result<()>;
}

/// Opens [`GridFile`] handles.
pub trait GridStore {
    type File: GridFile;

    fn open(&self, path: &Path, mode: OpenMode) -> Result<Self::File>;

    /// Copy a file to a new location, used when results go to a separate file.
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> bool;
}
