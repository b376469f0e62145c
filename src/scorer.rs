use std::fmt;

use serde::Serialize;

use crate::analysis::Section;
use crate::config::MatchConfig;
use crate::error::{MatchError, Result, Role};

/// Per-dimension absolute differences between outro and intro averages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breakdown {
    /// BPM
    pub tempo_delta: f64,
    /// dB
    pub loudness_delta: f64,
    pub energy_delta: f64,
}

impl fmt::Display for Breakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tempoΔ={:.3}, loudnessΔ={:.3}, energyΔ={:.3}",
            self.tempo_delta, self.loudness_delta, self.energy_delta
        )
    }
}

/// Combined score for one outro → intro pairing. Lower is better; 0 is a perfect match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub value: f64,
    pub breakdown: Breakdown,
}

impl Score {
    pub fn for_track(self, track_id: impl Into<String>) -> MatchResult {
        MatchResult {
            track_id: track_id.into(),
            score: self.value,
            breakdown: self.breakdown,
        }
    }
}

/// A scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub track_id: String,
    pub score: f64,
    pub breakdown: Breakdown,
}

/// Score how well `intro` follows `outro`.
///
/// Each dimension is averaged over its section list, the absolute differences
/// are divided by the configured spans and combined as a weighted sum. The two
/// arguments play different roles, so `score(a, b)` and `score(b, a)` are not
/// expected to agree.
pub fn score(outro: &[Section], intro: &[Section], config: &MatchConfig) -> Result<Score> {
    let from = Averages::of(outro).ok_or(MatchError::InsufficientData { role: Role::Outro })?;
    let to = Averages::of(intro).ok_or(MatchError::InsufficientData { role: Role::Intro })?;

    let breakdown = Breakdown {
        tempo_delta: (from.tempo - to.tempo).abs(),
        loudness_delta: (from.loudness - to.loudness).abs(),
        energy_delta: (from.energy - to.energy).abs(),
    };

    let w = &config.weights;
    let s = &config.spans;
    let value = w.tempo * breakdown.tempo_delta / s.tempo
        + w.loudness * breakdown.loudness_delta / s.loudness
        + w.energy * breakdown.energy_delta / s.energy;

    Ok(Score { value, breakdown })
}

struct Averages {
    tempo: f64,
    loudness: f64,
    energy: f64,
}

impl Averages {
    fn of(sections: &[Section]) -> Option<Self> {
        if sections.is_empty() {
            return None;
        }
        let n = sections.len() as f64;
        let (tempo, loudness, energy) = sections.iter().fold((0.0, 0.0, 0.0), |acc, s| {
            (acc.0 + s.tempo, acc.1 + s.loudness, acc.2 + s.energy)
        });
        Some(Self {
            tempo: tempo / n,
            loudness: loudness / n,
            energy: energy / n,
        })
    }
}
