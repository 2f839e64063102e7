use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use simplelog::{Config, WriteLogger};

use lectern::app::{run_reader, setup_terminal};
use lectern::book::Book;
use lectern::document::{DocumentSource, EpubDocument};
use lectern::event_source::KeyboardEventSource;
use lectern::panic_handler::{initialize_panic_handler, restore_terminal};
use lectern::session;
use lectern::settings::Settings;

const LOG_FILENAME: &str = "lectern.log";

/// Read an EPUB in the terminal, picking up where you left off.
#[derive(Parser, Debug)]
#[command(name = "lectern", version, about)]
struct Cli {
    /// Path to the EPUB file
    book: PathBuf,

    /// Write the log here instead of the cache directory
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("lectern"))
        .filter(|dir| std::fs::create_dir_all(dir).is_ok())
        .map(|dir| dir.join(LOG_FILENAME))
        .unwrap_or_else(|| PathBuf::from(LOG_FILENAME))
}

fn fallback_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (settings, settings_error) = match Settings::load() {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };

    let log_path = cli.log_file.clone().unwrap_or_else(default_log_path);
    WriteLogger::init(
        settings.log_level_filter(),
        Config::default(),
        File::create(&log_path)
            .with_context(|| format!("cannot create log file {}", log_path.display()))?,
    )?;
    initialize_panic_handler();
    if let Some(e) = settings_error {
        warn!("Ignoring unreadable settings: {e:#}");
    }

    info!("Starting lectern on {}", cli.book.display());

    let mut document = EpubDocument::open(&cli.book)
        .with_context(|| format!("cannot open {}", cli.book.display()))?;
    let saved = session::load(&cli.book)?;
    let title = document
        .title()
        .unwrap_or_else(|| fallback_title(&cli.book));

    let mut book = Book::from_document(&mut document, title, &settings, saved.as_ref())
        .with_context(|| format!("cannot read {}", cli.book.display()))?;

    let mut terminal = setup_terminal()?;
    let res = run_reader(&mut terminal, &mut book, &mut KeyboardEventSource);
    restore_terminal();

    if let Err(err) = res {
        error!("Reader error: {err:?}");
        return Err(err);
    }

    let state = book.snapshot();
    if let Err(err) = session::save(&cli.book, &state) {
        error!("Failed to save session: {err}");
        return Err(err).context("reading position was not saved");
    }

    info!("Shutting down lectern");
    Ok(())
}
