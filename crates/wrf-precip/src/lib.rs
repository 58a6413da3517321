//! Hourly precipitation post-processing for WRF output.
//!
//! WRF writes precipitation as running totals since the start of the
//! simulation (`RAINC`, `RAINNC`, ...). Dispersion models such as FLEXPART-WRF
//! need the amount that fell during each output interval instead. This crate
//! walks a chronologically ordered list of history files, differences each
//! file against the one before it and stores the sum of all precipitation
//! types as a new variable `PRECIP_H`.
//!
//! # Architecture
//!
//! - [`PrecipPipeline`] drives the run over `(previous, current)` pairs.
//! - [`GridStore`] / [`GridFile`] abstract the file format. [`NetcdfStore`]
//!   reads and writes real NetCDF files; [`MemoryStore`] keeps datasets in
//!   memory.
//! - [`PipelineConfig`] carries the field list, expected interval and output
//!   metadata, loadable from YAML.
//!
//! The NetCDF backend writes to NetCDF-4 files. Classic and 64-bit-offset
//! WRF output is not supported for writing; convert it with `nccopy -k nc4`.
//!
//! # Example
//!
//! ```ignore
//! use wrf_precip::{NetcdfStore, PipelineConfig, PrecipPipeline};
//!
//! let pipeline = PrecipPipeline::new(NetcdfStore::new(), PipelineConfig::default())?;
//! let report = pipeline.run(&["wrfout_d01_00", "wrfout_d01_01", "wrfout_d01_02"])?;
//! println!("{} processed, {} skipped", report.processed(), report.skipped());
//! ```

pub mod accumulate;
pub mod config;
pub mod derived;
pub mod error;
pub mod guard;
pub mod memory;
#[cfg(feature = "netcdf")]
mod native;
pub mod pairs;
pub mod pipeline;
pub mod store;
pub mod validate;

// Re-exports
pub use accumulate::{accumulate, FieldWarning};
pub use config::{DerivedFieldConfig, OutputMode, PipelineConfig};
pub use derived::{annotate_title, DerivedField};
pub use error::{PrecipError, Result};
pub use guard::{check_processed, GuardDecision};
pub use memory::{Dataset, MemoryFile, MemoryStore};
#[cfg(feature = "netcdf")]
pub use native::{silence_hdf5_errors, NetcdfFile, NetcdfStore};
pub use pairs::{file_pairs, output_path};
pub use pipeline::{PairOutcome, PairReport, PrecipPipeline, RunReport};
pub use store::{AttrValue, Field, GridFile, GridStore, Lookup, OpenMode, VariableDef};
pub use validate::{validate_time_step, TimeRecord};
