use std::cmp::Ordering;

use crate::analysis::{Section, TrackAnalysis};
use crate::config::MatchConfig;
use crate::error::{MatchError, Result};
use crate::fingerprint::Fingerprint;
use crate::scorer::{self, MatchResult};

/// A track eligible to play next, with its fingerprint already built.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub track_id: String,
    pub year: i32,
    pub analysis: TrackAnalysis,
    pub fingerprint: Fingerprint,
}

impl Candidate {
    pub fn new(analysis: TrackAnalysis, year: i32, k: usize) -> Self {
        let fingerprint = Fingerprint::build(&analysis, k);
        Self {
            track_id: analysis.track_id.clone(),
            year,
            analysis,
            fingerprint,
        }
    }
}

/// A candidate left out of the ranking, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub track_id: String,
    pub error: MatchError,
}

/// Candidates ordered best first, plus the ones that could not be scored.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    pub matches: Vec<MatchResult>,
    pub skipped: Vec<Skipped>,
}

impl Ranking {
    /// The most compatible candidate.
    pub fn best(&self) -> Result<&MatchResult> {
        self.matches.first().ok_or(MatchError::NoCandidates)
    }

    /// Drop matches after ranking (e.g. recently played). Order is preserved.
    pub fn retain(&mut self, mut keep: impl FnMut(&MatchResult) -> bool) {
        self.matches.retain(|m| keep(m));
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Score every candidate's intro against the current outro and sort ascending.
///
/// Candidates without intro sections are recorded in `skipped` instead of
/// failing the whole ranking. Equal scores are ordered by `track_id`.
pub fn rank(current_outro: &[Section], candidates: &[Candidate], config: &MatchConfig) -> Ranking {
    let mut ranking = Ranking::default();

    for candidate in candidates {
        match scorer::score(current_outro, &candidate.fingerprint.intro, config) {
            Ok(score) => ranking.matches.push(score.for_track(&candidate.track_id)),
            Err(e) => {
                log::debug!("Skipping {}: {}", candidate.track_id, e);
                ranking.skipped.push(Skipped {
                    track_id: candidate.track_id.clone(),
                    error: e,
                });
            }
        }
    }

    ranking.matches.sort_by(compare);
    ranking
}

fn compare(a: &MatchResult, b: &MatchResult) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.track_id.cmp(&b.track_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Role;

    fn section(tempo: f64, loudness: f64, energy: f64) -> Section {
        Section {
            start: 0.0,
            duration: 10.0,
            tempo,
            loudness,
            energy,
        }
    }

    fn candidate(id: &str, sections: Vec<Section>) -> Candidate {
        Candidate::new(TrackAnalysis::new(id, sections, 120.0, -8.0), 2018, 2)
    }

    fn outro() -> Vec<Section> {
        vec![section(120.0, -8.0, 0.7)]
    }

    #[test]
    fn test_close_candidate_ranks_first() {
        let candidates = vec![
            candidate("b", vec![section(95.0, -15.0, 0.3)]),
            candidate("a", vec![section(121.0, -8.2, 0.68)]),
        ];
        let ranking = rank(&outro(), &candidates, &MatchConfig::default());

        let ids: Vec<&str> = ranking.matches.iter().map(|m| m.track_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(ranking.matches[0].score < 0.05);
        assert!(ranking.matches[1].score > 0.3);
        assert_eq!(ranking.best().unwrap().track_id, "a");
    }

    #[test]
    fn test_sorted_ascending() {
        let candidates: Vec<Candidate> = (0..10)
            .map(|i| candidate(&format!("t{i}"), vec![section(80.0 + i as f64 * 7.0, -10.0, 0.5)]))
            .collect();
        let ranking = rank(&outro(), &candidates, &MatchConfig::default());
        assert_eq!(ranking.len(), 10);
        for pair in ranking.matches.windows(2) {
            assert!(pair[0].score <= pair[1].score);
        }
    }

    #[test]
    fn test_ties_broken_by_track_id() {
        let same = vec![section(110.0, -9.0, 0.6)];
        let candidates = vec![
            candidate("zeta", same.clone()),
            candidate("alpha", same.clone()),
            candidate("mike", same),
        ];
        let config = MatchConfig::default();

        let first = rank(&outro(), &candidates, &config);
        let ids: Vec<&str> = first.matches.iter().map(|m| m.track_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mike", "zeta"]);

        // Repeated runs give the same order
        for _ in 0..5 {
            assert_eq!(rank(&outro(), &candidates, &config).matches, first.matches);
        }
    }

    #[test]
    fn test_zero_section_candidate_skipped() {
        let candidates = vec![
            candidate("empty", vec![]),
            candidate("ok", vec![section(118.0, -8.0, 0.7)]),
        ];
        let ranking = rank(&outro(), &candidates, &MatchConfig::default());

        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking.matches[0].track_id, "ok");
        assert_eq!(
            ranking.skipped,
            vec![Skipped {
                track_id: "empty".into(),
                error: MatchError::InsufficientData { role: Role::Intro },
            }]
        );
    }

    #[test]
    fn test_empty_pool_has_no_best() {
        let ranking = rank(&outro(), &[], &MatchConfig::default());
        assert!(ranking.is_empty());
        assert_eq!(ranking.best(), Err(MatchError::NoCandidates));
    }

    #[test]
    fn test_only_unusable_candidates_has_no_best() {
        let candidates = vec![candidate("x", vec![]), candidate("y", vec![])];
        let ranking = rank(&outro(), &candidates, &MatchConfig::default());
        assert_eq!(ranking.skipped.len(), 2);
        assert_eq!(ranking.best(), Err(MatchError::NoCandidates));
    }

    #[test]
    fn test_empty_outro_skips_everything() {
        let candidates = vec![candidate("a", vec![section(120.0, -8.0, 0.7)])];
        let ranking = rank(&[], &candidates, &MatchConfig::default());
        assert!(ranking.is_empty());
        assert_eq!(
            ranking.skipped[0].error,
            MatchError::InsufficientData { role: Role::Outro }
        );
    }

    #[test]
    fn test_retain_keeps_order() {
        let candidates = vec![
            candidate("a", vec![section(120.0, -8.0, 0.7)]),
            candidate("b", vec![section(110.0, -8.0, 0.7)]),
            candidate("c", vec![section(100.0, -8.0, 0.7)]),
        ];
        let mut ranking = rank(&outro(), &candidates, &MatchConfig::default());
        ranking.retain(|m| m.track_id != "a");

        let ids: Vec<&str> = ranking.matches.iter().map(|m| m.track_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(ranking.best().unwrap().track_id, "b");
    }
}
