//! Collaborator capabilities the planner consumes, and candidate pool assembly.
//!
//! Implementations fetch data however they like (HTTP, files, fixtures); the
//! matching core only ever sees the already-materialized results.

use std::collections::HashSet;

use crate::analysis::TrackAnalysis;
use crate::error::Result;

/// A track id with its release year.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackRef {
    pub track_id: String,
    pub year: i32,
}

impl TrackRef {
    pub fn new(track_id: impl Into<String>, year: i32) -> Self {
        Self {
            track_id: track_id.into(),
            year,
        }
    }
}

/// Track metadata search.
pub trait MetadataProvider {
    /// Tracks released within `year - window ..= year + window`, at most `limit`.
    fn search_by_year_window(&self, year: i32, window: u32, limit: usize) -> Result<Vec<TrackRef>>;

    /// Metadata for one track, if known.
    fn lookup(&self, track_id: &str) -> Option<TrackRef>;
}

/// Section-level audio analysis.
pub trait AnalysisProvider {
    /// Fails with `AnalysisUnavailable` when the provider has no section data.
    fn get_analysis(&self, track_id: &str) -> Result<TrackAnalysis>;
}

/// Which search results may become candidates.
#[derive(Debug, Clone, Default)]
pub struct PoolFilter {
    /// Keep only tracks released in the seed's own year.
    pub same_year_only: bool,
    /// Track ids to leave out, e.g. recently played.
    pub exclude: HashSet<String>,
}

/// Turn search results into a candidate pool for `seed`.
///
/// The seed itself is never a candidate, excluded ids are dropped, and
/// duplicates keep their first occurrence.
pub fn assemble_pool(seed: &TrackRef, refs: Vec<TrackRef>, filter: &PoolFilter) -> Vec<TrackRef> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut pool = Vec::with_capacity(refs.len());

    for r in refs {
        if r.track_id == seed.track_id {
            continue;
        }
        if filter.same_year_only && r.year != seed.year {
            continue;
        }
        if filter.exclude.contains(&r.track_id) {
            continue;
        }
        if !seen.insert(r.track_id.clone()) {
            continue;
        }
        pool.push(r);
    }

    log::debug!("Candidate pool for {}: {} tracks", seed.track_id, pool.len());
    pool
}
