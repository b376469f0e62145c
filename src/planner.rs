use serde::Serialize;

use crate::analysis::TrackAnalysis;
use crate::config::MatchConfig;
use crate::error::{ConfigError, Result};
use crate::fingerprint::Fingerprint;
use crate::provider::{AnalysisProvider, TrackRef};
use crate::ranker::{self, Candidate, Ranking, Skipped};
use crate::scorer::MatchResult;

/// Hands the chosen track to whatever plays music. Supplied by the host.
pub trait TransitionSink {
    fn request_transition(&self, track_id: &str);
}

impl<F: Fn(&str)> TransitionSink for F {
    fn request_transition(&self, track_id: &str) {
        self(track_id)
    }
}

/// The recommended next track plus the full ranking it was picked from.
#[derive(Debug, Clone)]
pub struct Plan {
    pub best: MatchResult,
    pub ranking: Ranking,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    best: &'a MatchResult,
    ranked: &'a [MatchResult],
    skipped: Vec<SkippedReport<'a>>,
}

#[derive(Serialize)]
struct SkippedReport<'a> {
    track_id: &'a str,
    reason: String,
}

impl Plan {
    /// JSON rendering for callers that log or display the plan.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let report = PlanReport {
            best: &self.best,
            ranked: &self.ranking.matches,
            skipped: self
                .ranking
                .skipped
                .iter()
                .map(|s| SkippedReport {
                    track_id: &s.track_id,
                    reason: s.error.to_string(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&report)
    }
}

/// Builds fingerprints, ranks candidates and picks the next track.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: MatchConfig,
}

impl Planner {
    /// Fails on configurations that could rank a distant candidate above an identical one.
    pub fn new(config: MatchConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Rank already-materialized candidates against the current track's outro.
    pub fn plan_candidates(
        &self,
        current: &TrackAnalysis,
        candidates: &[Candidate],
    ) -> Result<Plan> {
        let current_fp = Fingerprint::build(current, self.config.k);
        let ranking = ranker::rank(&current_fp.outro, candidates, &self.config);
        Self::finish(ranking)
    }

    /// Fetch analyses through `provider` and rank the candidates.
    ///
    /// Candidates whose analysis is unavailable are skipped like candidates
    /// without sections. If the current track itself has no analysis every
    /// candidate ends up skipped and the plan fails with `NoCandidates`.
    pub fn plan<P>(
        &self,
        provider: &P,
        current_track_id: &str,
        candidates: &[TrackRef],
    ) -> Result<Plan>
    where
        P: AnalysisProvider + ?Sized,
    {
        let current = provider.get_analysis(current_track_id).unwrap_or_else(|e| {
            log::warn!("Current track: {}", e);
            TrackAnalysis::empty(current_track_id)
        });

        let mut unavailable = Vec::new();
        let mut pool = Vec::with_capacity(candidates.len());
        for r in candidates {
            match provider.get_analysis(&r.track_id) {
                Ok(analysis) => pool.push(Candidate::new(analysis, r.year, self.config.k)),
                Err(e) => {
                    log::debug!("Skipping {}: {}", r.track_id, e);
                    unavailable.push(Skipped {
                        track_id: r.track_id.clone(),
                        error: e,
                    });
                }
            }
        }

        let current_fp = Fingerprint::build(&current, self.config.k);
        let mut ranking = ranker::rank(&current_fp.outro, &pool, &self.config);
        ranking.skipped.extend(unavailable);

        log::info!(
            "Ranked {} candidates for {} ({} skipped)",
            ranking.len(),
            current_track_id,
            ranking.skipped.len()
        );
        Self::finish(ranking)
    }

    /// Plan, then ask `sink` to transition to the best match.
    pub fn plan_and_transition<P, S>(
        &self,
        provider: &P,
        current_track_id: &str,
        candidates: &[TrackRef],
        sink: &S,
    ) -> Result<Plan>
    where
        P: AnalysisProvider + ?Sized,
        S: TransitionSink + ?Sized,
    {
        let plan = self.plan(provider, current_track_id, candidates)?;
        log::info!(
            "Transition {} -> {} (score {:.4})",
            current_track_id,
            plan.best.track_id,
            plan.best.score
        );
        sink.request_transition(&plan.best.track_id);
        Ok(plan)
    }

    fn finish(ranking: Ranking) -> Result<Plan> {
        let best = ranking.best()?.clone();
        Ok(Plan { best, ranking })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Section;
    use crate::config::Weights;
    use crate::error::MatchError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn section(start: f64, tempo: f64, loudness: f64, energy: f64) -> Section {
        Section {
            start,
            duration: 10.0,
            tempo,
            loudness,
            energy,
        }
    }

    struct Fixture(HashMap<String, TrackAnalysis>);

    impl AnalysisProvider for Fixture {
        fn get_analysis(&self, track_id: &str) -> Result<TrackAnalysis> {
            self.0
                .get(track_id)
                .cloned()
                .ok_or_else(|| MatchError::AnalysisUnavailable {
                    track_id: track_id.to_string(),
                    reason: "not in fixture".into(),
                })
        }
    }

    fn fixture() -> Fixture {
        let mut tracks = HashMap::new();
        // Outro (last two sections) averages tempo 120, loudness -8, energy 0.7
        tracks.insert(
            "current".to_string(),
            TrackAnalysis::new(
                "current",
                vec![
                    section(0.0, 90.0, -20.0, 0.2),
                    section(10.0, 118.0, -9.0, 0.6),
                    section(20.0, 122.0, -7.0, 0.8),
                ],
                115.0,
                -10.0,
            ),
        );
        tracks.insert(
            "a".to_string(),
            TrackAnalysis::new(
                "a",
                vec![
                    section(0.0, 121.0, -8.2, 0.68),
                    section(10.0, 121.0, -8.2, 0.68),
                    section(20.0, 60.0, -30.0, 0.0),
                ],
                110.0,
                -12.0,
            ),
        );
        tracks.insert(
            "b".to_string(),
            TrackAnalysis::new("b", vec![section(0.0, 95.0, -15.0, 0.3)], 95.0, -15.0),
        );
        tracks.insert("empty".to_string(), TrackAnalysis::empty("empty"));
        Fixture(tracks)
    }

    fn refs(ids: &[&str]) -> Vec<TrackRef> {
        ids.iter().map(|id| TrackRef::new(*id, 2018)).collect()
    }

    #[test]
    fn test_plan_picks_closest_intro() {
        let planner = Planner::default();
        let plan = planner
            .plan(&fixture(), "current", &refs(&["b", "a"]))
            .unwrap();

        assert_eq!(plan.best.track_id, "a");
        assert!(plan.best.score < 0.05, "got {}", plan.best.score);
        assert_eq!(plan.ranking.len(), 2);
        assert_eq!(plan.ranking.matches[1].track_id, "b");
        assert!(plan.ranking.matches[1].score > 0.3);
    }

    #[test]
    fn test_unavailable_and_empty_are_skipped() {
        let planner = Planner::default();
        let plan = planner
            .plan(&fixture(), "current", &refs(&["missing", "empty", "b"]))
            .unwrap();

        assert_eq!(plan.best.track_id, "b");
        let skipped: Vec<&str> = plan.ranking.skipped.iter().map(|s| s.track_id.as_str()).collect();
        assert_eq!(skipped.len(), 2);
        assert!(skipped.contains(&"missing"));
        assert!(skipped.contains(&"empty"));
    }

    #[test]
    fn test_empty_pool_is_no_candidates() {
        let planner = Planner::default();
        let err = planner.plan(&fixture(), "current", &[]).unwrap_err();
        assert_eq!(err, MatchError::NoCandidates);
    }

    #[test]
    fn test_all_unusable_is_no_candidates() {
        let planner = Planner::default();
        let err = planner
            .plan(&fixture(), "current", &refs(&["missing", "empty"]))
            .unwrap_err();
        assert_eq!(err, MatchError::NoCandidates);
    }

    #[test]
    fn test_current_without_analysis() {
        let planner = Planner::default();
        let err = planner
            .plan(&fixture(), "unknown", &refs(&["a", "b"]))
            .unwrap_err();
        assert_eq!(err, MatchError::NoCandidates);
    }

    #[test]
    fn test_sink_receives_best() {
        let requested = RefCell::new(Vec::new());
        let sink = |id: &str| requested.borrow_mut().push(id.to_string());

        let plan = Planner::default()
            .plan_and_transition(&fixture(), "current", &refs(&["a", "b"]), &sink)
            .unwrap();

        assert_eq!(plan.best.track_id, "a");
        assert_eq!(*requested.borrow(), vec!["a".to_string()]);
    }

    #[test]
    fn test_sink_not_called_without_candidates() {
        let requested = RefCell::new(Vec::<String>::new());
        let sink = |id: &str| requested.borrow_mut().push(id.to_string());

        let result = Planner::default().plan_and_transition(&fixture(), "current", &[], &sink);
        assert!(result.is_err());
        assert!(requested.borrow().is_empty());
    }

    #[test]
    fn test_plan_candidates_uses_k() {
        let fx = fixture();
        let current = fx.get_analysis("current").unwrap();
        let a = fx.get_analysis("a").unwrap();

        // k=1: current outro is the last section only (122, -7, 0.8)
        let planner = Planner::new(MatchConfig {
            k: 1,
            ..MatchConfig::default()
        })
        .unwrap();
        let plan = planner
            .plan_candidates(&current, &[Candidate::new(a, 2018, 1)])
            .unwrap();
        assert!((plan.best.breakdown.tempo_delta - 1.0).abs() < 1e-10);
        assert!((plan.best.breakdown.loudness_delta - 1.2).abs() < 1e-10);
    }

    #[test]
    fn test_plan_candidates_empty_current() {
        let fx = fixture();
        let a = fx.get_analysis("a").unwrap();
        let plan = Planner::default().plan_candidates(
            &TrackAnalysis::empty("current"),
            &[Candidate::new(a, 2018, 2)],
        );
        assert_eq!(plan.unwrap_err(), MatchError::NoCandidates);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let negative = MatchConfig {
            weights: Weights {
                tempo: -1.0,
                ..Weights::default()
            },
            ..MatchConfig::default()
        };
        assert!(matches!(
            Planner::new(negative),
            Err(ConfigError::InvalidWeight { name: "tempo", .. })
        ));

        let mut nan_span = MatchConfig::default();
        nan_span.spans.energy = f64::NAN;
        assert!(Planner::new(nan_span).is_err());

        let zero_k = MatchConfig {
            k: 0,
            ..MatchConfig::default()
        };
        assert_eq!(Planner::new(zero_k).unwrap_err(), ConfigError::ZeroWindow);
    }

    #[test]
    fn test_identical_intro_wins() {
        let outro = vec![section(0.0, 120.0, -8.0, 0.7)];
        let same = TrackAnalysis::new("same", outro.clone(), 120.0, -8.0);
        let far = TrackAnalysis::new("far", vec![section(0.0, 60.0, -8.0, 0.7)], 60.0, -8.0);
        let current = TrackAnalysis::new("current", outro, 120.0, -8.0);

        let planner = Planner::new(MatchConfig::default()).unwrap();
        let plan = planner
            .plan_candidates(
                &current,
                &[Candidate::new(far, 2018, 2), Candidate::new(same, 2018, 2)],
            )
            .unwrap();
        assert_eq!(plan.best.track_id, "same");
        assert_eq!(plan.best.score, 0.0);
        assert!(plan.ranking.matches[1].score > 0.0);
    }

    #[test]
    fn test_plan_json() {
        let plan = Planner::default()
            .plan(&fixture(), "current", &refs(&["a", "missing"]))
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
        assert_eq!(json["best"]["track_id"], "a");
        assert_eq!(json["ranked"].as_array().unwrap().len(), 1);
        assert_eq!(json["skipped"][0]["track_id"], "missing");
    }
}
