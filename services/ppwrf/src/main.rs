//! WRF precipitation post-processor.
//!
//! Adds the precipitation that fell during each output interval (`PRECIP_H`)
//! to a chronologically ordered list of WRF history files, so that
//! FLEXPART-WRF can read it directly.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cli::Args;
use wrf_precip::{NetcdfStore, PrecipPipeline, RunReport};

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let config = args.pipeline_config()?;
    info!(
        files = args.files.len(),
        fields = ?config.source_fields,
        output = ?config.output,
        "Starting ppwrf"
    );

    let pipeline = PrecipPipeline::new(NetcdfStore::new(), config)
        .context("Invalid pipeline configuration")?;
    let report = pipeline
        .run(&args.files)
        .context("Post-processing aborted")?;

    log_summary(&report);

    Ok(())
}

/// Final summary line. Individual field warnings were already logged by the
/// pipeline as they happened.
fn log_summary(report: &RunReport) {
    info!(
        processed = report.processed(),
        skipped = report.skipped(),
        warnings = report.warnings().count(),
        "Done"
    );
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use wrf_precip::{Dataset, MemoryStore, PipelineConfig};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_missing_field_is_logged_once() {
        let store = MemoryStore::new();
        store.insert(
            "wrfout_d01_00",
            Dataset::wrf(1, 1).with_time(0.0).with_field("RAINC", &[1.0]),
        );
        store.insert(
            "wrfout_d01_01",
            Dataset::wrf(1, 1)
                .with_time(60.0)
                .with_field("RAINC", &[2.0])
                .with_field("RAINSH", &[1.0]),
        );
        let config = PipelineConfig::default().with_source_fields(["RAINC", "RAINSH"]);
        let pipeline = PrecipPipeline::new(store, config).unwrap();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let report = pipeline.run(&["wrfout_d01_00", "wrfout_d01_01"]).unwrap();
            assert_eq!(report.warnings().count(), 1);
            log_summary(&report);
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("\"RAINSH\" missing in").count(), 1);
        assert!(output.contains("Done"));
    }
}
