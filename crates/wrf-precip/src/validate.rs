//! Time-consistency checks between consecutive output files.
//!
//! Differencing two accumulated snapshots only yields an hourly amount when
//! each file holds a single output time and the files are exactly one
//! interval apart. Any violation aborts the whole run.

use std::path::Path;

use crate::error::{PrecipError, Result};
use crate::store::{GridFile, Lookup};

/// Accepted deviation from the expected interval, in minutes.
pub const TIME_TOLERANCE_MINUTES: f64 = 1e-3;

/// Values and shape of a time coordinate variable.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRecord {
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl TimeRecord {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Self {
        Self { shape, values }
    }

    /// Read the time variable `name` from `file`.
    pub fn read<F: GridFile>(file: &F, name: &str) -> Result<Self> {
        match file.lookup_values_f64(name)? {
            Lookup::Found((shape, values)) => Ok(Self { shape, values }),
            Lookup::NotFound => Err(PrecipError::MissingTimeRecord {
                path: file.path().to_path_buf(),
                variable: name.to_string(),
            }),
        }
    }
}

/// Validate the time records of a `(previous, current)` pair.
///
/// Checks run in order: equal shapes, a single current observation, then
/// `current - previous == expected_interval` within [`TIME_TOLERANCE_MINUTES`].
/// Returns the measured gap in minutes.
pub fn validate_time_step(
    previous_path: &Path,
    previous: &TimeRecord,
    current_path: &Path,
    current: &TimeRecord,
    expected_interval: f64,
) -> Result<f64> {
    if previous.shape != current.shape {
        return Err(PrecipError::InconsistentTimeRecord {
            previous: previous_path.to_path_buf(),
            current: current_path.to_path_buf(),
            previous_shape: previous.shape.clone(),
            current_shape: current.shape.clone(),
        });
    }

    if current.shape.len() != 1 || current.values.len() != 1 {
        return Err(PrecipError::TimeRecordLength {
            path: current_path.to_path_buf(),
            shape: current.shape.clone(),
            length: current.values.len(),
        });
    }

    let previous_time = previous.values.first().copied().ok_or_else(|| {
        PrecipError::TimeRecordLength {
            path: previous_path.to_path_buf(),
            shape: previous.shape.clone(),
            length: 0,
        }
    })?;
    let gap = current.values[0] - previous_time;
    if (gap - expected_interval).abs() > TIME_TOLERANCE_MINUTES {
        return Err(PrecipError::UnexpectedTimeGap {
            previous: previous_path.to_path_buf(),
            current: current_path.to_path_buf(),
            expected: expected_interval,
            actual: gap,
        });
    }

    Ok(gap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(minutes: f64) -> TimeRecord {
        TimeRecord::new(vec![1], vec![minutes])
    }

    fn check(previous: &TimeRecord, current: &TimeRecord) -> Result<f64> {
        validate_time_step(Path::new("f1"), previous, Path::new("f2"), current, 60.0)
    }

    #[test]
    fn test_one_hour_apart_passes() {
        assert_eq!(check(&single(60.0), &single(120.0)).unwrap(), 60.0);
    }

    #[test]
    fn test_shape_mismatch_checked_first() {
        let previous = single(0.0);
        let current = TimeRecord::new(vec![2], vec![60.0, 120.0]);
        let err = check(&previous, &current).unwrap_err();
        assert!(matches!(err, PrecipError::InconsistentTimeRecord { .. }));
        assert!(err.to_string().contains("inconsistent time record length"));
    }

    #[test]
    fn test_multiple_records_in_both_files() {
        let previous = TimeRecord::new(vec![2], vec![0.0, 60.0]);
        let current = TimeRecord::new(vec![2], vec![120.0, 180.0]);
        let err = check(&previous, &current).unwrap_err();
        assert!(matches!(err, PrecipError::TimeRecordLength { length: 2, .. }));
        assert!(err.to_string().contains("is not 1"));
    }

    #[test]
    fn test_scalar_time_record_reports_shape() {
        let scalar = TimeRecord::new(Vec::new(), vec![60.0]);
        let err = check(&TimeRecord::new(Vec::new(), vec![0.0]), &scalar).unwrap_err();
        assert!(matches!(
            err,
            PrecipError::TimeRecordLength { ref shape, length: 1, .. } if shape.is_empty()
        ));
        assert!(err.to_string().contains("shape []"));
    }

    #[test]
    fn test_wrong_gap() {
        let err = check(&single(0.0), &single(30.0)).unwrap_err();
        match err {
            PrecipError::UnexpectedTimeGap { expected, actual, .. } => {
                assert_eq!(expected, 60.0);
                assert_eq!(actual, 30.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reversed_order_is_rejected() {
        // Files listed newest first give a negative gap.
        let err = check(&single(120.0), &single(60.0)).unwrap_err();
        assert!(matches!(err, PrecipError::UnexpectedTimeGap { .. }));
    }

    #[test]
    fn test_float_noise_within_tolerance() {
        assert!(check(&single(59.99995), &single(120.0)).is_ok());
    }

    #[test]
    fn test_custom_interval() {
        let gap = validate_time_step(
            Path::new("a"),
            &single(0.0),
            Path::new("b"),
            &single(180.0),
            180.0,
        )
        .unwrap();
        assert_eq!(gap, 180.0);
    }
}
