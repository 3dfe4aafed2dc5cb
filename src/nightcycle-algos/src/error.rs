use thiserror::Error;

/// Degraded-data outcomes of a sleep analysis run. None of them is fatal: the
/// analyzer turns each into a valid (possibly empty) result.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SleepAnalysisError {
    #[error("no monitoring batch provides a utc offset for the analysis window")]
    NoTimezoneData,
    #[error("heart rate shows only {found} regime transitions")]
    InsufficientTransitions { found: usize },
    #[error("no sleep cycles detected in the analysis window")]
    EmptyWindow,
}
