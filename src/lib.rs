pub mod analysis;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod library;
pub mod planner;
pub mod provider;
pub mod ranker;
pub mod scorer;

/// Application name for XDG paths
pub const APP_NAME: &str = "yeardj";
