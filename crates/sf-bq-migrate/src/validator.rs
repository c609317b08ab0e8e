//! Row count validation between source and destination.

use tracing::{info, warn};

/// Outcome of comparing source and destination row counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Match,
    Mismatch { expected: i64, actual: i64 },
}

impl Validation {
    pub fn is_match(&self) -> bool {
        matches!(self, Validation::Match)
    }
}

/// Compare counts for one table. A sampled run passes when the
/// destination holds at least the sample cap.
pub fn validate(
    table: &str,
    source_rows: i64,
    loaded_rows: i64,
    sample_limit: Option<usize>,
) -> Validation {
    let expected = match sample_limit {
        Some(limit) => source_rows.min(limit as i64),
        None => source_rows,
    };
    if loaded_rows == expected {
        info!(table, rows = loaded_rows, "row counts match");
        Validation::Match
    } else {
        warn!(
            table,
            expected,
            actual = loaded_rows,
            "row count mismatch"
        );
        Validation::Mismatch {
            expected,
            actual: loaded_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(validate("t", 100, 100, None).is_match());
    }

    #[test]
    fn test_mismatch_reports_counts() {
        assert_eq!(
            validate("t", 100, 90, None),
            Validation::Mismatch {
                expected: 100,
                actual: 90
            }
        );
    }

    #[test]
    fn test_sampled_run_caps_expectation() {
        assert!(validate("t", 5000, 100, Some(100)).is_match());
        // fewer source rows than the cap must still match exactly
        assert!(validate("t", 40, 40, Some(100)).is_match());
        assert!(!validate("t", 40, 100, Some(100)).is_match());
    }
}
