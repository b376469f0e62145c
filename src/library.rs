//! File-backed track library.
//!
//! One JSON document per track, in the shape the music-metadata provider returns
//! (track metadata plus audio analysis). Documents are loaded in parallel and the
//! resulting library serves both provider capabilities from memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Deserialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::analysis::{EnergyModel, Section, TrackAnalysis};
use crate::error::{MatchError, Result};
use crate::provider::{AnalysisProvider, MetadataProvider, TrackRef};

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Library directory not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid track document {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A track document as stored on disk.
#[derive(Debug, Deserialize)]
pub struct TrackDocument {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistDocument>,
    pub album: AlbumDocument,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub analysis: Option<AnalysisDocument>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistDocument {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumDocument {
    pub release_date: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalysisDocument {
    #[serde(default)]
    pub track: TrackLevel,
    #[serde(default)]
    pub sections: Vec<SectionDocument>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrackLevel {
    #[serde(default)]
    pub tempo: f64,
    #[serde(default = "default_loudness")]
    pub loudness: f64,
}

#[derive(Debug, Deserialize)]
pub struct SectionDocument {
    pub start: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub tempo: f64,
    #[serde(default = "default_loudness")]
    pub loudness: f64,
    /// Used as-is when present; otherwise derived from tempo and loudness.
    #[serde(default)]
    pub energy: Option<f64>,
}

fn default_loudness() -> f64 {
    -20.0
}

impl TrackDocument {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Release year from the leading `YYYY` of the album's release date.
    pub fn release_year(&self) -> Option<i32> {
        self.album.release_date.get(..4)?.parse().ok()
    }

    fn into_track(self, model: &EnergyModel) -> Option<LibraryTrack> {
        let year = match self.release_year() {
            Some(y) => y,
            None => {
                log::warn!(
                    "Skipping {}: unparseable release date {:?}",
                    self.id,
                    self.album.release_date
                );
                return None;
            }
        };

        let analysis = self.analysis.map(|doc| {
            let sections = doc
                .sections
                .iter()
                .map(|s| match s.energy {
                    Some(energy) => Section {
                        start: s.start,
                        duration: s.duration,
                        tempo: s.tempo,
                        loudness: s.loudness,
                        energy,
                    },
                    None => Section::derived(s.start, s.duration, s.tempo, s.loudness, model),
                })
                .collect();
            TrackAnalysis::new(self.id.clone(), sections, doc.track.tempo, doc.track.loudness)
        });

        Some(LibraryTrack {
            track_ref: TrackRef::new(self.id, year),
            name: self.name,
            artists: self.artists.into_iter().map(|a| a.name).collect(),
            popularity: self.popularity,
            duration_ms: self.duration_ms,
            analysis,
        })
    }
}

/// A track held in memory.
#[derive(Debug, Clone)]
pub struct LibraryTrack {
    pub track_ref: TrackRef,
    pub name: String,
    pub artists: Vec<String>,
    pub popularity: u32,
    pub duration_ms: u64,
    pub analysis: Option<TrackAnalysis>,
}

impl LibraryTrack {
    /// "Artist - Title" for display.
    pub fn display_name(&self) -> String {
        if self.artists.is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.artists.join(", "), self.name)
        }
    }

    pub fn duration_min(&self) -> f64 {
        self.duration_ms as f64 / 60_000.0
    }
}

pub struct LoadResult {
    pub library: LocalLibrary,
    pub loaded: usize,
    pub failed: usize,
}

/// Tracks indexed by id, sorted by id.
#[derive(Debug, Default)]
pub struct LocalLibrary {
    tracks: Vec<LibraryTrack>,
    by_id: HashMap<String, usize>,
}

impl LocalLibrary {
    /// Build from parsed documents. Later documents with a duplicate id are ignored.
    pub fn from_documents(docs: Vec<TrackDocument>, model: &EnergyModel) -> Self {
        let mut tracks: Vec<LibraryTrack> = docs
            .into_iter()
            .filter_map(|doc| doc.into_track(model))
            .collect();
        // Stable sort keeps the first of any duplicate ids in front
        tracks.sort_by(|a, b| a.track_ref.track_id.cmp(&b.track_ref.track_id));
        tracks.dedup_by(|b, a| a.track_ref.track_id == b.track_ref.track_id);

        let by_id = tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.track_ref.track_id.clone(), i))
            .collect();
        Self { tracks, by_id }
    }

    /// Load every `*.json` document under `dir` using `jobs` worker threads.
    /// Unreadable or invalid documents are logged and counted, not fatal.
    pub fn load(
        dir: &Path,
        model: &EnergyModel,
        jobs: usize,
    ) -> std::result::Result<LoadResult, LibraryError> {
        if !dir.is_dir() {
            return Err(LibraryError::NotFound(dir.to_path_buf()));
        }

        let paths: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            })
            .map(|e| e.into_path())
            .collect();

        log::info!("Loading {} track documents from {}", paths.len(), dir.display());

        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} documents")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .build()?;

        let results: Vec<std::result::Result<TrackDocument, LibraryError>> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let result = read_document(path);
                    pb.inc(1);
                    result
                })
                .collect()
        });
        pb.finish_and_clear();

        let mut docs = Vec::with_capacity(results.len());
        let mut failed = 0;
        for result in results {
            match result {
                Ok(doc) => docs.push(doc),
                Err(e) => {
                    log::warn!("{}", e);
                    failed += 1;
                }
            }
        }

        let library = Self::from_documents(docs, model);
        let loaded = library.len();
        Ok(LoadResult {
            library,
            loaded,
            failed,
        })
    }

    pub fn get(&self, track_id: &str) -> Option<&LibraryTrack> {
        self.by_id.get(track_id).map(|&i| &self.tracks[i])
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

fn read_document(path: &Path) -> std::result::Result<TrackDocument, LibraryError> {
    let text = std::fs::read_to_string(path).map_err(|source| LibraryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    TrackDocument::from_json(&text).map_err(|source| LibraryError::Json {
        path: path.to_path_buf(),
        source,
    })
}

impl MetadataProvider for LocalLibrary {
    fn search_by_year_window(&self, year: i32, window: u32, limit: usize) -> Result<Vec<TrackRef>> {
        let window = i64::from(window);
        Ok(self
            .tracks
            .iter()
            .filter(|t| (i64::from(t.track_ref.year) - i64::from(year)).abs() <= window)
            .take(limit)
            .map(|t| t.track_ref.clone())
            .collect())
    }

    fn lookup(&self, track_id: &str) -> Option<TrackRef> {
        self.get(track_id).map(|t| t.track_ref.clone())
    }
}

impl AnalysisProvider for LocalLibrary {
    fn get_analysis(&self, track_id: &str) -> Result<TrackAnalysis> {
        let unavailable = |reason: &str| MatchError::AnalysisUnavailable {
            track_id: track_id.to_string(),
            reason: reason.to_string(),
        };

        let track = self.get(track_id).ok_or_else(|| unavailable("unknown track"))?;
        match &track.analysis {
            Some(analysis) if analysis.has_sections() => Ok(analysis.clone()),
            Some(_) => Err(unavailable("no section data")),
            None => Err(unavailable("no audio analysis")),
        }
    }
}
