//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use wrf_precip::{OutputMode, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "ppwrf")]
#[command(about = "Add per-interval precipitation to WRF output for FLEXPART-WRF")]
pub struct Args {
    /// WRF history files in chronological order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Configuration file path (YAML)
    #[arg(short, long, env = "PPWRF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Accumulated fields to sum, comma separated
    #[arg(short, long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,

    /// Expected time between files, in minutes
    #[arg(short, long)]
    pub interval: Option<f64>,

    /// Write results to prefixed copies instead of modifying the inputs
    #[arg(long)]
    pub output_prefix: Option<String>,

    /// Validate and compute without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Log level
    #[arg(long, default_value = "info", env = "PPWRF_LOG_LEVEL")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

impl Args {
    /// Configuration file (or defaults) with command-line overrides applied.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_yaml(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(fields) = &self.fields {
            config = config.with_source_fields(fields.iter().map(|f| f.trim()));
        }
        if let Some(interval) = self.interval {
            config = config.with_interval(interval);
        }
        if let Some(prefix) = &self.output_prefix {
            config = config.with_output(OutputMode::Copy {
                prefix: prefix.clone(),
            });
        }
        if self.dry_run {
            config = config.with_dry_run(true);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use test_utils::temp_test_dir;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("ppwrf").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_files_are_required() {
        assert!(Args::try_parse_from(["ppwrf"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["wrfout_d01_00", "wrfout_d01_01"]);
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.log_level, "info");
        assert!(!args.dry_run);

        let config = args.pipeline_config().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "--fields",
            "RAINC, RAINNC",
            "--interval",
            "30",
            "--output-prefix",
            "pwrfout",
            "--dry-run",
            "a",
            "b",
        ]);

        let config = args.pipeline_config().unwrap();
        assert_eq!(config.source_fields, vec!["RAINC", "RAINNC"]);
        assert_eq!(config.expected_interval_minutes, 30.0);
        assert_eq!(
            config.output,
            OutputMode::Copy {
                prefix: "pwrfout".to_string()
            }
        );
        assert!(config.dry_run);
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let args = parse(&["--interval", "0", "a", "b"]);
        assert!(args.pipeline_config().is_err());
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let dir = temp_test_dir();
        let path = dir.path().join("ppwrf.yaml");
        fs::write(&path, "source_fields: [RAINC]\nexpected_interval_minutes: 180\n").unwrap();

        let config_arg = path.to_string_lossy().to_string();
        let args = parse(&["--config", &config_arg, "--interval", "60", "a", "b"]);
        let config = args.pipeline_config().unwrap();

        assert_eq!(config.source_fields, vec!["RAINC"]);
        assert_eq!(config.expected_interval_minutes, 60.0);
    }

    #[test]
    fn test_missing_config_file() {
        let args = parse(&["--config", "/nonexistent/ppwrf.yaml", "a", "b"]);
        let err = args.pipeline_config().unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }
}
