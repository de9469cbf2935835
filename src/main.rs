//! Binary entry point: load configuration, open the song catalog and drive the
//! Ratatui event loop until the user exits.
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use setlist_search_builder::config::default_log_path;
use setlist_search_builder::db::{ensure_schema, import_songs, song_count};
use setlist_search_builder::{run_app, App, Config, FormSubmission, RowList};

#[derive(Parser, Debug)]
#[command(name = "setlist-search", about = "Build setlist searches from the terminal")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Song catalog database
    #[arg(long)]
    database: Option<PathBuf>,

    /// Site hosting the search results
    #[arg(long)]
    base_url: Option<String>,

    /// Print the URL of an empty search and exit
    #[arg(long)]
    print_url: bool,

    /// Import songs (one `name[,plays]` per line) into the catalog and exit
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config =
        Config::load(cli.config.as_deref())?.with_overrides(cli.database, cli.base_url)?;
    init_tracing(&config.log_filter)?;

    if cli.print_url {
        let url = FormSubmission::from_rows(&RowList::new()).to_url(&config.results_url()?)?;
        println!("{url}");
        return Ok(());
    }

    let db_path = config.database_path()?;
    let mut conn = ensure_schema(&db_path)?;

    if let Some(path) = cli.import {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let added = import_songs(&mut conn, &text)?;
        let total = song_count(&conn)?;
        info!(added, total, file = %path.display(), "imported songs");
        println!("Imported {added} new songs ({total} in catalog).");
        return Ok(());
    }

    info!(catalog = %db_path.display(), songs = song_count(&conn)?, "opened song catalog");
    let mut app = App::new(
        conn,
        config.picker_config(),
        config.results_url()?,
        config.search_limit,
    );
    run_app(&mut app)
}

/// Send `tracing` output to a log file; the terminal belongs to the UI.
fn init_tracing(default_filter: &str) -> Result<()> {
    let path = default_log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create log directory")?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
