//! Section-level audio analysis as supplied by the analysis provider.
//!
//! The provider reports tempo and loudness per structural section but no
//! energy. [`EnergyModel`] derives a 0-1 energy proxy from the two.

use serde::{Deserialize, Serialize};

/// A structurally distinct time segment of a track (intro, verse, chorus...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
    /// BPM
    pub tempo: f64,
    /// dB
    pub loudness: f64,
    /// Energy proxy, 0-1.
    pub energy: f64,
}

impl Section {
    /// Build a section whose energy is derived from tempo and loudness.
    pub fn derived(
        start: f64,
        duration: f64,
        tempo: f64,
        loudness: f64,
        model: &EnergyModel,
    ) -> Self {
        Self {
            start,
            duration,
            tempo,
            loudness,
            energy: model.energy(tempo, loudness),
        }
    }
}

/// Analysis of one track: ordered sections plus track-level tempo and loudness.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackAnalysis {
    pub track_id: String,
    sections: Vec<Section>,
    pub tempo: f64,
    pub loudness: f64,
}

impl TrackAnalysis {
    /// Sections are put in chronological order here; callers can pass them in any order.
    pub fn new(
        track_id: impl Into<String>,
        mut sections: Vec<Section>,
        tempo: f64,
        loudness: f64,
    ) -> Self {
        sections.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self {
            track_id: track_id.into(),
            sections,
            tempo,
            loudness,
        }
    }

    /// An analysis with no usable sections.
    pub fn empty(track_id: impl Into<String>) -> Self {
        Self::new(track_id, Vec::new(), 0.0, 0.0)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn has_sections(&self) -> bool {
        !self.sections.is_empty()
    }
}

/// Energy proxy: tempo and loudness each normalized into 0-1 over a
/// configured range, clamped, then mixed by weight.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnergyModel {
    pub tempo_min: f64,
    pub tempo_max: f64,
    pub loudness_min: f64,
    pub loudness_max: f64,
    pub tempo_weight: f64,
    pub loudness_weight: f64,
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self {
            tempo_min: 60.0,
            tempo_max: 180.0,
            loudness_min: -30.0,
            loudness_max: 0.0,
            tempo_weight: 0.5,
            loudness_weight: 0.5,
        }
    }
}

impl EnergyModel {
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        use crate::error::ConfigError;

        if !(self.tempo_max > self.tempo_min) {
            return Err(ConfigError::EmptyRange {
                name: "tempo",
                min: self.tempo_min,
                max: self.tempo_max,
            });
        }
        if !(self.loudness_max > self.loudness_min) {
            return Err(ConfigError::EmptyRange {
                name: "loudness",
                min: self.loudness_min,
                max: self.loudness_max,
            });
        }
        for (name, value) in [
            ("tempo_weight", self.tempo_weight),
            ("loudness_weight", self.loudness_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }

    /// Energy proxy for one section, always within 0-1.
    pub fn energy(&self, tempo: f64, loudness: f64) -> f64 {
        let total = self.tempo_weight + self.loudness_weight;
        if total <= 0.0 {
            return 0.0;
        }
        let tempo_norm = normalize(tempo, self.tempo_min, self.tempo_max);
        let loudness_norm = normalize(loudness, self.loudness_min, self.loudness_max);
        ((self.tempo_weight * tempo_norm + self.loudness_weight * loudness_norm) / total)
            .clamp(0.0, 1.0)
    }
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}
