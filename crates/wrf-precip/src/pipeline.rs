//! The post-processing pipeline over an ordered list of output files.
//!
//! # Flow per pair
//!
//! ```text
//! (previous, current)
//!      │
//!      ├─► resolve target (current file, or its copy)
//!      ├─► guard: target already has PRECIP_H? ──► Skipped
//!      ├─► validate XTIME of both files (fatal on failure)
//!      ├─► define zero-filled PRECIP_H over the target grid
//!      ├─► accumulate current - previous for each source field
//!      ├─► write PRECIP_H, append title marker
//!      ▼
//!   Processed
//! ```
//!
//! Nothing is written to a file until every check and the accumulation for
//! its pair have succeeded.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use crate::accumulate::{accumulate, FieldWarning};
use crate::config::PipelineConfig;
use crate::derived::{annotate_title, DerivedField};
use crate::error::Result;
use crate::guard::{check_processed, GuardDecision};
use crate::pairs::{file_pairs, output_path};
use crate::store::{GridFile, GridStore, OpenMode};
use crate::validate::{validate_time_step, TimeRecord};

/// What happened to one `(previous, current)` pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// The target already carried the derived field.
    Skipped,
    /// The derived field was computed.
    Processed {
        warnings: Vec<FieldWarning>,
        /// Source fields that contributed.
        contributing: Vec<String>,
        /// False in dry-run mode.
        written: bool,
    },
}

/// Result of processing one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    pub previous: PathBuf,
    pub current: PathBuf,
    /// File that received (or already had) the derived field.
    pub target: PathBuf,
    pub outcome: PairOutcome,
}

impl PairReport {
    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, PairOutcome::Skipped)
    }

    pub fn warnings(&self) -> &[FieldWarning] {
        match &self.outcome {
            PairOutcome::Processed { warnings, .. } => warnings,
            PairOutcome::Skipped => &[],
        }
    }
}

/// Summary of a whole run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub pairs: Vec<PairReport>,
}

impl RunReport {
    pub fn processed(&self) -> usize {
        self.pairs.iter().filter(|p| !p.is_skipped()).count()
    }

    pub fn skipped(&self) -> usize {
        self.pairs.iter().filter(|p| p.is_skipped()).count()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &FieldWarning> {
        self.pairs.iter().flat_map(|p| p.warnings())
    }
}

/// Converts accumulated precipitation into per-interval precipitation.
///
/// Constructed per run; holds no state between runs other than its
/// configuration.
#[derive(Debug, Clone)]
pub struct PrecipPipeline<S: GridStore> {
    store: S,
    config: PipelineConfig,
}

impl<S: GridStore> PrecipPipeline<S> {
    /// Create a pipeline, validating the configuration.
    pub fn new(store: S, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process every consecutive pair of `paths` in order.
    ///
    /// The first fatal error stops the run; files processed before it keep
    /// their changes.
    pub fn run<P: AsRef<Path>>(&self, paths: &[P]) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::default();

        if paths.len() < 2 {
            warn!(files = paths.len(), "Need at least two files to difference, nothing to do");
            return Ok(report);
        }

        info!(
            files = paths.len(),
            pairs = paths.len() - 1,
            fields = ?self.config.source_fields,
            interval_minutes = self.config.expected_interval_minutes,
            dry_run = self.config.dry_run,
            "Starting precipitation post-processing"
        );

        for (previous, current) in file_pairs(paths) {
            report.pairs.push(self.process_pair(previous, current)?);
        }

        info!(
            processed = report.processed(),
            skipped = report.skipped(),
            warnings = report.warnings().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Post-processing complete"
        );
        Ok(report)
    }

    /// Process a single `(previous, current)` pair.
    ///
    /// Errors that do not name a file of their own come back wrapped in
    /// [`crate::PrecipError::Pair`].
    pub fn process_pair(&self, previous: &Path, current: &Path) -> Result<PairReport> {
        self.process(previous, current)
            .map_err(|e| e.in_pair(previous, current))
    }

    fn process(&self, previous: &Path, current: &Path) -> Result<PairReport> {
        let target = output_path(current, &self.config.output);
        let derived_name = &self.config.derived.name;

        if target != current && self.store.exists(&target) {
            // An existing copy from an earlier run decides on its own.
            let existing = self.store.open(&target, OpenMode::ReadOnly)?;
            if check_processed(&existing, derived_name)? == GuardDecision::Skip {
                return Ok(self.skipped(previous, current, target));
            }
        }

        let previous_file = self.store.open(previous, OpenMode::ReadOnly)?;
        let current_mode = if self.config.dry_run || target != current {
            OpenMode::ReadOnly
        } else {
            OpenMode::ReadWrite
        };
        let current_file = self.store.open(current, current_mode)?;

        if check_processed(&current_file, derived_name)? == GuardDecision::Skip {
            return Ok(self.skipped(previous, current, target));
        }

        let time_var = &self.config.time_variable;
        let previous_time = TimeRecord::read(&previous_file, time_var)?;
        let current_time = TimeRecord::read(&current_file, time_var)?;
        validate_time_step(
            previous,
            &previous_time,
            current,
            &current_time,
            self.config.expected_interval_minutes,
        )?;

        let mut derived = DerivedField::define(&current_file, &self.config.derived)?;
        let warnings = accumulate(
            &self.config.source_fields,
            &previous_file,
            &current_file,
            &mut derived,
        )?;
        let contributing: Vec<String> = self
            .config
            .source_fields
            .iter()
            .filter(|f| !warnings.iter().any(|w| &w.field == *f))
            .cloned()
            .collect();
        drop(previous_file);

        let written = if self.config.dry_run {
            info!(file = %current.display(), "Dry run, not writing derived field");
            false
        } else {
            self.write_result(current_file, &target, &derived)?;
            true
        };

        info!(
            previous = %previous.display(),
            current = %current.display(),
            target = %target.display(),
            contributing = ?contributing,
            warnings = warnings.len(),
            "Computed {}",
            derived.name()
        );

        Ok(PairReport {
            previous: previous.to_path_buf(),
            current: current.to_path_buf(),
            target,
            outcome: PairOutcome::Processed {
                warnings,
                contributing,
                written,
            },
        })
    }

    fn write_result(&self, current_file: S::File, target: &Path, derived: &DerivedField) -> Result<()> {
        let mut out = if current_file.path() == target {
            current_file
        } else {
            let source = current_file.path().to_path_buf();
            drop(current_file);
            if !self.store.exists(target) {
                self.store.copy(&source, target)?;
            }
            self.store.open(target, OpenMode::ReadWrite)?
        };

        derived.write_to(&mut out)?;
        annotate_title(
            &mut out,
            &self.config.title_attribute,
            &self.config.title_suffix,
        )?;
        Ok(())
    }

    fn skipped(&self, previous: &Path, current: &Path, target: PathBuf) -> PairReport {
        info!(
            file = %target.display(),
            "File {} already processed, skipping",
            target.display()
        );
        PairReport {
            previous: previous.to_path_buf(),
            current: current.to_path_buf(),
            target,
            outcome: PairOutcome::Skipped,
        }
    }
}
