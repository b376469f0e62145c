use crate::analysis::{Section, TrackAnalysis};

/// Intro/outro summary of a track used for transition scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    /// First K sections, chronological.
    pub intro: Vec<Section>,
    /// Last K sections, chronological.
    pub outro: Vec<Section>,
}

impl Fingerprint {
    /// Take the first and last `k` sections of a track.
    ///
    /// Tracks with fewer than `k` sections use all of them for both ends, and the
    /// two ends may overlap when there are no more than `2k` sections. A `k` of 0
    /// is treated as 1.
    pub fn build(analysis: &TrackAnalysis, k: usize) -> Self {
        let sections = analysis.sections();
        let take = k.max(1).min(sections.len());

        Self {
            intro: sections[..take].to_vec(),
            outro: sections[sections.len() - take..].to_vec(),
        }
    }
}
