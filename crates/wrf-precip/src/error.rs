//! Error types for precipitation post-processing.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for post-processing operations.
pub type Result<T> = std::result::Result<T, PrecipError>;

/// Errors raised while post-processing a sequence of output files.
///
/// Everything here aborts the run. Missing source fields are not errors;
/// they are reported as [`crate::FieldWarning`]s.
#[derive(Error, Debug)]
pub enum PrecipError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the NetCDF library
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// Storage backend fault that is not a missing variable
    #[error("storage fault in {path}: {message}")]
    Storage { path: PathBuf, message: String },

    /// Write attempted through a read-only handle
    #[error("{0} is open read-only")]
    ReadOnly(PathBuf),

    /// The time coordinate variable is absent
    #[error("time variable {variable} missing in {path}")]
    MissingTimeRecord { path: PathBuf, variable: String },

    /// Time arrays of the two files differ in shape
    #[error(
        "inconsistent time record length between files {previous} & {current}: \
         {previous_shape:?} vs {current_shape:?}, both must be of length 1"
    )]
    InconsistentTimeRecord {
        previous: PathBuf,
        current: PathBuf,
        previous_shape: Vec<usize>,
        current_shape: Vec<usize>,
    },

    /// Time array is not one-dimensional with a single observation
    #[error("time record length in {path} is not 1 (shape {shape:?} holding {length} values)")]
    TimeRecordLength {
        path: PathBuf,
        shape: Vec<usize>,
        length: usize,
    },

    /// Elapsed time between the two files is not the expected interval
    #[error(
        "time gap between files {previous} & {current} is not the expected interval: \
         expected {expected} min, found {actual} min"
    )]
    UnexpectedTimeGap {
        previous: PathBuf,
        current: PathBuf,
        expected: f64,
        actual: f64,
    },

    /// Grid dimension needed for the derived field is absent
    #[error("dimension {dimension} missing in {path}")]
    MissingDimension { path: PathBuf, dimension: String },

    /// A source field does not match the derived field's shape
    #[error(
        "shape mismatch for {field} between files {previous} & {current}: \
         expected {expected:?}, found {found:?}"
    )]
    ShapeMismatch {
        field: String,
        previous: PathBuf,
        current: PathBuf,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// Error without a file name of its own, raised while processing a pair
    #[error("while processing {previous} & {current}: {source}")]
    Pair {
        previous: PathBuf,
        current: PathBuf,
        source: Box<PrecipError>,
    },

    /// Pipeline configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl PrecipError {
    /// Create a storage fault for `path`.
    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Attach the pair being processed unless the error already names a file.
    pub fn in_pair(self, previous: &Path, current: &Path) -> Self {
        match self {
            PrecipError::Io(_) => {}
            #[cfg(feature = "netcdf")]
            PrecipError::NetCdf(_) => {}
            other => return other,
        }
        PrecipError::Pair {
            previous: previous.to_path_buf(),
            current: current.to_path_buf(),
            source: Box::new(self),
        }
    }

    /// The underlying error, looking through [`PrecipError::Pair`].
    pub fn root(&self) -> &PrecipError {
        match self {
            PrecipError::Pair { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error came from the time-consistency checks.
    pub fn is_time_validation(&self) -> bool {
        matches!(
            self.root(),
            PrecipError::InconsistentTimeRecord { .. }
                | PrecipError::TimeRecordLength { .. }
                | PrecipError::UnexpectedTimeGap { .. }
        )
    }
}
