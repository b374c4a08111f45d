mod config;
mod db;
mod error;
mod export;
mod filter;
mod keywords;
mod loader;
mod normalize;
mod record;
mod stage;

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::Settings;
use crate::error::Stage;
use crate::keywords::KeywordList;

#[derive(Parser)]
#[command(name = "feedsift", about = "Normalize, filter and export scraped job posts")]
struct Cli {
    /// Settings file (default: ./feedsift.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keywords → parse → filter → store, always all four steps
    Run {
        #[command(flatten)]
        paths: PathArgs,
        #[command(flatten)]
        policy: PolicyArgs,
        /// Ask for custom keywords instead of the configured ones
        #[arg(long)]
        ask: bool,
    },
    /// Normalize the raw file into the parsed stage file
    Parse {
        #[command(flatten)]
        paths: PathArgs,
        #[arg(long)]
        ask: bool,
    },
    /// Filter the parsed stage file into the filtered stage file
    Filter {
        #[command(flatten)]
        paths: PathArgs,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Export the filtered stage file to CSV, Excel and SQLite
    Store {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Merge a JSON/NDJSON batch of scraped posts into the raw file, skipping posts already there
    Append {
        /// Batch file to merge
        #[arg(long)]
        batch: PathBuf,
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Print the active keyword list
    Keywords {
        #[arg(long)]
        ask: bool,
    },
}

#[derive(Args)]
struct PathArgs {
    /// Raw scraped posts (JSON array or NDJSON)
    #[arg(long)]
    raw: Option<PathBuf>,
    /// Parsed stage file
    #[arg(long)]
    parsed: Option<PathBuf>,
    /// Filtered stage file
    #[arg(long)]
    filtered: Option<PathBuf>,
    /// CSV output
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Excel output
    #[arg(long)]
    xlsx: Option<PathBuf>,
    /// SQLite output
    #[arg(long)]
    sqlite: Option<PathBuf>,
}

impl PathArgs {
    fn apply(self, s: &mut Settings) {
        if let Some(p) = self.raw {
            s.raw_path = p;
        }
        if let Some(p) = self.parsed {
            s.parsed_path = p;
        }
        if let Some(p) = self.filtered {
            s.filtered_path = p;
        }
        if let Some(p) = self.csv {
            s.csv_path = p;
        }
        if let Some(p) = self.xlsx {
            s.xlsx_path = p;
        }
        if let Some(p) = self.sqlite {
            s.sqlite_path = p;
        }
    }
}

#[derive(Args)]
struct PolicyArgs {
    #[arg(long)]
    min_likes: Option<u64>,
    #[arg(long)]
    min_comments: Option<u64>,
    /// Keep posts that matched no keyword
    #[arg(long)]
    allow_unmatched: bool,
}

impl PolicyArgs {
    fn apply(self, s: &mut Settings) {
        if let Some(n) = self.min_likes {
            s.min_likes = n;
        }
        if let Some(n) = self.min_comments {
            s.min_comments = n;
        }
        if self.allow_unmatched {
            s.require_keywords = false;
        }
    }
}

/// Logs go to stderr so `feedsift keywords` output stays pipeable.
/// `RUST_LOG` overrides the default of this crate's info events only.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "feedsift=info".into());
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { paths, policy, ask } => {
            paths.apply(&mut settings);
            policy.apply(&mut settings);
            run_pipeline(&settings, ask)
        }
        Commands::Parse { paths, ask } => {
            paths.apply(&mut settings);
            let keywords = choose_keywords(&settings, ask)?;
            let n = parse_step(&settings, &keywords)?;
            println!("Parsed {} posts → {}", n, settings.parsed_path.display());
            Ok(())
        }
        Commands::Filter { paths, policy } => {
            paths.apply(&mut settings);
            policy.apply(&mut settings);
            let (kept, total) = filter_step(&settings)?;
            println!(
                "Saved {} filtered posts (of {}) → {}",
                kept,
                total,
                settings.filtered_path.display()
            );
            Ok(())
        }
        Commands::Store { paths } => {
            paths.apply(&mut settings);
            let n = store_step(&settings)?;
            for path in [&settings.csv_path, &settings.xlsx_path, &settings.sqlite_path] {
                println!("Saved {} posts → {}", n, path.display());
            }
            Ok(())
        }
        Commands::Append { batch, paths } => {
            paths.apply(&mut settings);
            let incoming = loader::load_objects(&batch)?;
            let mut seen = loader::seen_keys(&settings.raw_path)?;
            let added = loader::append_raw(&settings.raw_path, incoming, &mut seen)?;
            println!("Saved {} new posts. Total seen: {}", added, seen.len());
            Ok(())
        }
        Commands::Keywords { ask } => {
            let keywords = choose_keywords(&settings, ask)?;
            for kw in keywords.as_slice() {
                println!("{}", kw);
            }
            Ok(())
        }
    }
}

fn run_pipeline(settings: &Settings, ask: bool) -> Result<()> {
    let started = Instant::now();

    // Step 1: keywords (prompt before the progress bar takes the terminal)
    let keywords = choose_keywords(settings, ask)?;
    info!("Using {} keywords", keywords.len());
    println!("Using keywords: {}\n", keywords.as_slice().join(", "));

    let pb = ProgressBar::new(3);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:20.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    // Step 2: parse
    pb.set_message("parsing");
    let parsed = parse_step(settings, &keywords)?;
    pb.inc(1);

    // Step 3: filter
    pb.set_message("filtering");
    let (kept, _) = filter_step(settings)?;
    pb.inc(1);

    // Step 4: store
    pb.set_message("storing");
    store_step(settings)?;
    pb.inc(1);
    pb.finish_and_clear();

    println!("Parsed {} posts, kept {}.\n", parsed, kept);
    println!("Pipeline finished successfully in {}!\n", elapsed_label(started.elapsed()));
    println!("Raw → {}", settings.raw_path.display());
    println!("Parsed → {}", settings.parsed_path.display());
    println!("Filtered → {}", settings.filtered_path.display());
    println!("CSV → {}", settings.csv_path.display());
    println!("Excel → {}", settings.xlsx_path.display());
    println!("SQLite → {}", settings.sqlite_path.display());
    Ok(())
}

fn choose_keywords(settings: &Settings, ask: bool) -> Result<KeywordList> {
    let configured = settings.keyword_list();
    if !ask {
        return Ok(configured);
    }
    let mut input = io::stdin().lock();
    let mut output = io::stdout();
    keywords::prompt_keywords(&mut input, &mut output, &configured)
        .context("Failed to read keywords")
}

fn parse_step(settings: &Settings, keywords: &KeywordList) -> Result<usize> {
    let raws = loader::load(&settings.raw_path)?;
    info!("Loaded {} raw posts from {}", raws.len(), settings.raw_path.display());

    let parsed = normalize::normalize_all(&raws, keywords);
    stage::write_stage(&settings.parsed_path, &parsed)?;
    info!("Parsed {} posts → {}", parsed.len(), settings.parsed_path.display());
    Ok(parsed.len())
}

/// Returns (kept, total).
fn filter_step(settings: &Settings) -> Result<(usize, usize)> {
    let parsed = stage::read_stage(&settings.parsed_path, Stage::Parsed)?;
    let policy = settings.filter_policy();
    let kept = filter::filter(&parsed, &policy);
    stage::write_stage(&settings.filtered_path, &kept)?;
    info!(
        min_likes = policy.min_likes,
        min_comments = policy.min_comments,
        require_keywords = policy.require_keywords,
        "Kept {} of {} posts",
        kept.len(),
        parsed.len()
    );
    Ok((kept.len(), parsed.len()))
}

fn store_step(settings: &Settings) -> Result<usize> {
    let posts = stage::read_stage(&settings.filtered_path, Stage::Filtered)?;

    export::write_csv(&settings.csv_path, &posts)?;
    info!("Saved {} posts → {}", posts.len(), settings.csv_path.display());

    export::write_xlsx(&settings.xlsx_path, &posts)?;
    info!("Saved {} posts → {}", posts.len(), settings.xlsx_path.display());

    let conn = db::connect(&settings.sqlite_path)?;
    db::init_schema(&conn)?;
    let n = db::replace_posts(&conn, &posts)?;
    info!("Saved {} posts → {}", n, settings.sqlite_path.display());
    Ok(posts.len())
}

/// Wall time of a pipeline run: milliseconds for quick runs, which is most
/// of them, then seconds, then minutes.
fn elapsed_label(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}
