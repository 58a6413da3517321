//! Pipeline configuration.
//!
//! Every value the pipeline depends on (source fields, expected interval,
//! derived field metadata, title marker) lives in [`PipelineConfig`]. The
//! defaults describe standard WRF output; a YAML file can override any part.
//!
//! ```yaml
//! source_fields: [RAINC, RAINNC]
//! expected_interval_minutes: 60
//! output:
//!   mode: copy
//!   prefix: pwrfout
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{PrecipError, Result};

/// Accumulated precipitation variables written by WRF.
pub const DEFAULT_SOURCE_FIELDS: &[&str] =
    &["RAINC", "RAINSH", "RAINNC", "SNOWNC", "GRAUPELNC", "HAILNC"];

/// Expected spacing between consecutive output files, in minutes.
pub const DEFAULT_INTERVAL_MINUTES: f64 = 60.0;

/// Time coordinate variable holding minutes since simulation start.
pub const DEFAULT_TIME_VARIABLE: &str = "XTIME";

/// Name of the derived per-interval precipitation variable.
pub const DEFAULT_DERIVED_NAME: &str = "PRECIP_H";

/// Global attribute holding the file title.
pub const DEFAULT_TITLE_ATTRIBUTE: &str = "TITLE";

/// Marker appended to the title of every processed file.
pub const DEFAULT_TITLE_SUFFIX: &str = " POST-PROCESSED TO WORK WITH FLX_WRF2";

/// Output file prefix used in copy mode when none is given.
pub const DEFAULT_OUTPUT_PREFIX: &str = "pwrfout";

/// Prefix of WRF history file names.
pub const WRF_OUTPUT_PREFIX: &str = "wrfout";

/// Configuration for one run of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Accumulated fields summed into the derived field, in processing order.
    pub source_fields: Vec<String>,

    /// Required `current - previous` time difference (minutes).
    pub expected_interval_minutes: f64,

    /// Time coordinate variable name.
    pub time_variable: String,

    /// Derived field name and metadata.
    pub derived: DerivedFieldConfig,

    /// Global attribute that receives the title marker.
    pub title_attribute: String,

    /// Text appended to the title.
    pub title_suffix: String,

    /// Where results are written.
    pub output: OutputMode,

    /// Validate and compute without writing anything.
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_fields: DEFAULT_SOURCE_FIELDS.iter().map(|s| s.to_string()).collect(),
            expected_interval_minutes: DEFAULT_INTERVAL_MINUTES,
            time_variable: DEFAULT_TIME_VARIABLE.to_string(),
            derived: DerivedFieldConfig::default(),
            title_attribute: DEFAULT_TITLE_ATTRIBUTE.to_string(),
            title_suffix: DEFAULT_TITLE_SUFFIX.to_string(),
            output: OutputMode::default(),
            dry_run: false,
        }
    }
}

/// Name, dimensions and attributes of the derived field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivedFieldConfig {
    pub name: String,
    /// Time, south-north and west-east dimension names.
    pub dimensions: [String; 3],
    pub field_type: i32,
    pub memory_order: String,
    pub description: String,
    pub units: String,
    pub stagger: String,
    pub coordinates: String,
}

impl Default for DerivedFieldConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DERIVED_NAME.to_string(),
            dimensions: [
                "Time".to_string(),
                "south_north".to_string(),
                "west_east".to_string(),
            ],
            field_type: 104,
            memory_order: "XY".to_string(),
            description: "TOTAL PRECIPITATION SINCE LAST OUTPUT TIME".to_string(),
            units: "mm/[OUTPUT TIME INTERVAL]".to_string(),
            stagger: String::new(),
            coordinates: "XLONG XLAT".to_string(),
        }
    }
}

/// Where the derived field is written.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutputMode {
    /// Add the derived field to the current file itself.
    #[default]
    InPlace,
    /// Copy the current file to a sibling named with `prefix` and write there.
    Copy {
        #[serde(default = "default_output_prefix")]
        prefix: String,
    },
}

impl OutputMode {
    /// Copy mode with [`DEFAULT_OUTPUT_PREFIX`].
    pub fn copy() -> Self {
        OutputMode::Copy {
            prefix: default_output_prefix(),
        }
    }
}

fn default_output_prefix() -> String {
    DEFAULT_OUTPUT_PREFIX.to_string()
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text and validate it.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the source field list.
    pub fn with_source_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_interval(mut self, minutes: f64) -> Self {
        self.expected_interval_minutes = minutes;
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Check the configuration for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.source_fields.is_empty() {
            return Err(PrecipError::InvalidConfig(
                "at least one source field is required".to_string(),
            ));
        }
        if let Some(blank) = self.source_fields.iter().find(|f| f.trim().is_empty()) {
            return Err(PrecipError::InvalidConfig(format!(
                "blank source field name {:?}",
                blank
            )));
        }
        if self.source_fields.iter().any(|f| f == &self.derived.name) {
            return Err(PrecipError::InvalidConfig(format!(
                "derived field {} cannot also be a source field",
                self.derived.name
            )));
        }
        if !self.expected_interval_minutes.is_finite() || self.expected_interval_minutes <= 0.0 {
            return Err(PrecipError::InvalidConfig(format!(
                "expected interval must be positive, got {}",
                self.expected_interval_minutes
            )));
        }
        if self.derived.name.trim().is_empty() {
            return Err(PrecipError::InvalidConfig(
                "derived field name is empty".to_string(),
            ));
        }
        if self.time_variable.trim().is_empty() {
            return Err(PrecipError::InvalidConfig(
                "time variable name is empty".to_string(),
            ));
        }
        if let OutputMode::Copy { prefix } = &self.output {
            if prefix.is_empty() || prefix.contains(std::path::MAIN_SEPARATOR) {
                return Err(PrecipError::InvalidConfig(format!(
                    "invalid output prefix {:?}",
                    prefix
                )));
            }
        }
        Ok(())
    }
}
