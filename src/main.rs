use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use yeardj::config::{AppConfig, MatchConfig};
use yeardj::error::MatchError;
use yeardj::fingerprint::Fingerprint;
use yeardj::library::LocalLibrary;
use yeardj::planner::{Plan, Planner};
use yeardj::provider::{AnalysisProvider, MetadataProvider, PoolFilter, assemble_pool};

#[derive(Parser)]
#[command(name = "yeardj", version, about = "Year-wise DJ transition matcher")]
struct Cli {
    /// Directory of track documents
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick the next track for a currently playing seed track
    Plan {
        /// Currently playing track id
        #[arg(long)]
        seed: String,

        /// Target release year (defaults to the seed's year)
        #[arg(long)]
        year: Option<i32>,

        /// Year window (+/-)
        #[arg(long)]
        window: Option<u32>,

        /// Number of candidate tracks
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Allow matching outside the seed's exact year if within window
        #[arg(long)]
        allow_cross_year: bool,

        /// Sections taken from each end of a track
        #[arg(short)]
        k: Option<usize>,

        /// Track ids to leave out (e.g. recently played)
        #[arg(long)]
        exclude: Vec<String>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score a single transition from one track into another
    Score {
        /// Track that is playing
        from: String,

        /// Track that would play next
        to: String,

        /// Sections taken from each end of a track
        #[arg(short)]
        k: Option<usize>,
    },

    /// Show the intro and outro sections of a track
    Fingerprint {
        track: String,

        /// Sections taken from each end of a track
        #[arg(short)]
        k: Option<usize>,
    },

    /// List tracks released within a year window
    Search {
        #[arg(long)]
        year: i32,

        /// Year window (+/-)
        #[arg(long)]
        window: Option<u32>,

        /// Number of results
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();
    config.energy.validate().context("Invalid [energy] config")?;

    // Resolve library directory: CLI > config > XDG default
    let library_dir = cli
        .library
        .or(config.library_dir.clone())
        .unwrap_or_else(yeardj::config::default_library_dir);

    let loaded = LocalLibrary::load(&library_dir, &config.energy, config.resolve_workers())
        .context("Failed to load library")?;
    log::info!(
        "Library: {} tracks from {} ({} unreadable)",
        loaded.loaded,
        library_dir.display(),
        loaded.failed
    );
    let library = loaded.library;

    match cli.command {
        Commands::Plan {
            seed,
            year,
            window,
            limit,
            allow_cross_year,
            k,
            exclude,
            json,
        } => {
            let mut matching = config.matching.clone();
            if let Some(k) = k {
                matching.k = k;
            }
            if let Some(window) = window {
                matching.year_window = window;
            }
            if let Some(limit) = limit {
                matching.limit = limit;
            }
            if allow_cross_year {
                matching.same_year_only = false;
            }
            let (year_window, limit) = (matching.year_window, matching.limit);
            let filter = PoolFilter {
                same_year_only: matching.same_year_only,
                exclude: exclude.into_iter().collect(),
            };
            let planner = Planner::new(matching).context("Invalid matching config")?;

            let seed_ref = library
                .lookup(&seed)
                .with_context(|| format!("Seed track {} is not in the library", seed))?;
            let year = year.unwrap_or(seed_ref.year);

            let found = library.search_by_year_window(year, year_window, limit)?;
            let pool = assemble_pool(&seed_ref, found, &filter);

            let sink = |track_id: &str| {
                let name = library.get(track_id).map(|t| t.display_name()).unwrap_or_default();
                log::info!("Transition requested: {} {}", track_id, name);
            };

            let plan = match planner.plan_and_transition(&library, &seed, &pool, &sink) {
                Ok(plan) => plan,
                Err(MatchError::NoCandidates) => {
                    println!("No suitable transition match found.");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if json {
                println!("{}", plan.to_json().context("Failed to render plan")?);
            } else {
                print_plan(&library, &seed, &plan);
            }
        }

        Commands::Score { from, to, k } => {
            let matching = with_k(&config.matching, k)?;
            let from_fp = Fingerprint::build(&library.get_analysis(&from)?, matching.k);
            let to_fp = Fingerprint::build(&library.get_analysis(&to)?, matching.k);
            let score = yeardj::scorer::score(&from_fp.outro, &to_fp.intro, &matching)?;

            println!("From track: {}", from);
            println!("To track:   {}", to);
            println!("Score:      {:.4}", score.value);
            println!("Why:        {}", score.breakdown);
        }

        Commands::Fingerprint { track, k } => {
            let matching = with_k(&config.matching, k)?;
            let analysis = library.get_analysis(&track)?;
            let fp = Fingerprint::build(&analysis, matching.k);

            println!(
                "{} ({} sections, {:.1} BPM, {:.1} dB)",
                track,
                analysis.sections().len(),
                analysis.tempo,
                analysis.loudness
            );
            println!();
            print_sections("Intro", &fp.intro);
            println!();
            print_sections("Outro", &fp.outro);
        }

        Commands::Search { year, window, limit } => {
            let window = window.unwrap_or(config.matching.year_window);
            let limit = limit.unwrap_or(config.matching.limit);
            let found = library.search_by_year_window(year, window, limit)?;

            if found.is_empty() {
                println!("No tracks released {}±{}.", year, window);
                return Ok(());
            }

            println!(
                "{:<24} {:>6} {:>5} {:>4}  {}",
                "Track", "Year", "Min", "Pop", "Title"
            );
            println!("{}", "-".repeat(82));
            for r in &found {
                let Some(t) = library.get(&r.track_id) else {
                    continue;
                };
                println!(
                    "{:<24} {:>6} {:>5.1} {:>4}  {}",
                    r.track_id,
                    r.year,
                    t.duration_min(),
                    t.popularity,
                    t.display_name()
                );
            }
        }
    }

    Ok(())
}

fn with_k(matching: &MatchConfig, k: Option<usize>) -> Result<MatchConfig> {
    let mut matching = matching.clone();
    if let Some(k) = k {
        matching.k = k;
    }
    matching.validate().context("Invalid matching config")?;
    Ok(matching)
}

/// Print the recommendation followed by the full ranking.
fn print_plan(library: &LocalLibrary, seed: &str, plan: &Plan) {
    println!("Next transition match");
    println!("From track: {}", seed);
    println!("To track:   {}", plan.best.track_id);
    println!("Score:      {:.4}", plan.best.score);
    println!("Why:        {}", plan.best.breakdown);
    println!();

    println!(
        "{:>3} {:<24} {:>7}  {:>6} {:>6} {:>6}  {}",
        "#", "Track", "Score", "BPMΔ", "dBΔ", "EngΔ", "Title"
    );
    println!("{}", "-".repeat(90));

    for (rank, m) in plan.ranking.matches.iter().enumerate() {
        let name = library.get(&m.track_id).map(|t| t.display_name()).unwrap_or_default();
        let name: String = if name.chars().count() > 30 {
            format!("{}...", name.chars().take(27).collect::<String>())
        } else {
            name
        };
        println!(
            "{:>3} {:<24} {:>7.4}  {:>6.1} {:>6.1} {:>6.3}  {}",
            rank + 1,
            m.track_id,
            m.score,
            m.breakdown.tempo_delta,
            m.breakdown.loudness_delta,
            m.breakdown.energy_delta,
            name,
        );
    }

    if !plan.ranking.skipped.is_empty() {
        println!();
        println!("Skipped {} candidates:", plan.ranking.skipped.len());
        for s in &plan.ranking.skipped {
            println!("  {:<24} {}", s.track_id, s.error);
        }
    }

    println!();
    println!("Score = weighted outro→intro distance (0 = identical, lower = smoother)");
}

fn print_sections(label: &str, sections: &[yeardj::analysis::Section]) {
    println!("{}:", label);
    println!(
        "  {:>8} {:>8} {:>7} {:>7} {:>6}",
        "Start", "Length", "BPM", "dB", "Energy"
    );
    for s in sections {
        println!(
            "  {:>8.1} {:>8.1} {:>7.1} {:>7.1} {:>6.3}",
            s.start, s.duration, s.tempo, s.loudness, s.energy
        );
    }
}
