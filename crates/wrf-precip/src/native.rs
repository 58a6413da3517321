//! NetCDF storage backend using the native netcdf library.
//!
//! WRF history files are NetCDF (classic or NetCDF-4/HDF5). Files are opened
//! read-only with `netcdf::open` and for modification with `netcdf::append`,
//! so the derived field is added to the existing file without copying the
//! other variables.
//!
//! # Limitations
//!
//! Adding a variable relies on the netcdf library entering define mode on
//! its own, which NetCDF-4 files do. Classic and 64-bit-offset files need an
//! explicit redefinition step that is not performed here, so appending
//! `PRECIP_H` to them may fail with a NetCDF error. Convert such files to
//! NetCDF-4 first (`nccopy -k nc4`).

use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing::debug;

use crate::error::{PrecipError, Result};
use crate::store::{AttrValue, Field, GridFile, GridStore, Lookup, OpenMode, VariableDef};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints diagnostics even when a failed lookup is handled
/// by the caller, which buries the pipeline's own warnings. It only needs to
/// run once per process, before the first file is opened.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable automatic error output.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Opens NetCDF files on the local filesystem.
///
/// Writing requires NetCDF-4 files; classic-format files are read fine but
/// adding a variable to them may fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfStore;

impl NetcdfStore {
    pub fn new() -> Self {
        Self
    }
}

impl GridStore for NetcdfStore {
    type File = NetcdfFile;

    fn open(&self, path: &Path, mode: OpenMode) -> Result<NetcdfFile> {
        silence_hdf5_errors();

        if !path.exists() {
            return Err(PrecipError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )));
        }

        let handle = match mode {
            OpenMode::ReadOnly => Handle::Read(netcdf::open(path)?),
            OpenMode::ReadWrite => Handle::Write(netcdf::append(path)?),
        };
        debug!(file = %path.display(), ?mode, "Opened NetCDF file");

        Ok(NetcdfFile {
            path: path.to_path_buf(),
            handle,
        })
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::copy(from, to)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

enum Handle {
    Read(netcdf::File),
    Write(netcdf::FileMut),
}

/// An open NetCDF file. Closed when dropped.
pub struct NetcdfFile {
    path: PathBuf,
    handle: Handle,
}

impl NetcdfFile {
    fn file(&self) -> &netcdf::File {
        match &self.handle {
            Handle::Read(file) => file,
            Handle::Write(file) => file,
        }
    }

    fn file_mut(&mut self) -> Result<&mut netcdf::FileMut> {
        match &mut self.handle {
            Handle::Write(file) => Ok(file),
            Handle::Read(_) => Err(PrecipError::ReadOnly(self.path.clone())),
        }
    }
}

impl std::fmt::Debug for NetcdfFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.handle {
            Handle::Read(_) => OpenMode::ReadOnly,
            Handle::Write(_) => OpenMode::ReadWrite,
        };
        f.debug_struct("NetcdfFile")
            .field("path", &self.path)
            .field("mode", &mode)
            .finish()
    }
}

impl GridFile for NetcdfFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn lookup_variable(&self, name: &str) -> Result<Lookup<Field>> {
        let Some(var) = self.file().variable(name) else {
            return Ok(Lookup::NotFound);
        };
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let values: Vec<f32> = var.get_values::<f32, _>(..)?;

        Ok(Lookup::Found(Field {
            name: name.to_string(),
            shape,
            values,
        }))
    }

    fn lookup_values_f64(&self, name: &str) -> Result<Lookup<(Vec<usize>, Vec<f64>)>> {
        let Some(var) = self.file().variable(name) else {
            return Ok(Lookup::NotFound);
        };
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let values: Vec<f64> = var.get_values::<f64, _>(..)?;
        Ok(Lookup::Found((shape, values)))
    }

    fn has_variable(&self, name: &str) -> Result<bool> {
        Ok(self.file().variable(name).is_some())
    }

    fn dimension_len(&self, name: &str) -> Result<Option<usize>> {
        Ok(self.file().dimension(name).map(|d| d.len()))
    }

    fn text_attribute(&self, name: &str) -> Result<Option<String>> {
        let Some(attr) = self.file().attribute(name) else {
            return Ok(None);
        };
        match attr.value()? {
            netcdf::AttributeValue::Str(text) => Ok(Some(text)),
            other => Err(PrecipError::storage(
                &self.path,
                format!("attribute {} is not text: {:?}", name, other),
            )),
        }
    }

    fn set_text_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.file_mut()?.add_attribute(name, value)?;
        Ok(())
    }

    fn define_variable(&mut self, def: &VariableDef, values: &[f32]) -> Result<()> {
        let dims: Vec<&str> = def.dimensions.iter().map(String::as_str).collect();
        let file = self.file_mut()?;
        let mut var = file.add_variable::<f32>(&def.name, &dims)?;

        for (key, value) in &def.attributes {
            match value {
                AttrValue::Int(v) => var.put_attribute(key, *v)?,
                AttrValue::Float(v) => var.put_attribute(key, *v)?,
                AttrValue::Text(v) => var.put_attribute(key, v.as_str())?,
            };
        }

        var.put_values(values, ..)?;
        Ok(())
    }
}
