use std::fmt;

use thiserror::Error;

/// Which side of a transition a section list plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The end of the track that is currently playing.
    Outro,
    /// The start of the track that would play next.
    Intro,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outro => f.write_str("outro"),
            Self::Intro => f.write_str("intro"),
        }
    }
}

/// Matching failures.
///
/// `InsufficientData` and `AnalysisUnavailable` are per-candidate conditions:
/// the ranker and planner turn them into skips. `NoCandidates` is the only one
/// that reaches the caller as a hard failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("no usable {role} sections")]
    InsufficientData { role: Role },
    #[error("analysis unavailable for {track_id}: {reason}")]
    AnalysisUnavailable { track_id: String, reason: String },
    #[error("no candidate could be scored")]
    NoCandidates,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("section window k must be at least 1")]
    ZeroWindow,
    #[error("weight `{name}` must be a finite non-negative number, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("span `{name}` must be a finite positive number, got {value}")]
    InvalidSpan { name: &'static str, value: f64 },
    #[error("energy range `{name}` is empty ({min}..{max})")]
    EmptyRange { name: &'static str, min: f64, max: f64 },
}

pub type Result<T> = std::result::Result<T, MatchError>;
