//! Headless ezlaunch front end
//!
//! Scans the content directory, keeps it in sync while running, and turns
//! button events read from stdin into hold gestures.
//!
//! # Commands
//!
//! One per line on stdin:
//! - `down <button>` / `up <button>` - Button press and release (`Start`, `X`, `code:96`, ...)
//! - `next` / `prev` / `focus <n>` - Move the focus
//! - `confirm` - Persist the focused position and print the content path to launch,
//!   or carry out a pending reset
//! - `reset` - Ask to delete the focused title's save data (same as holding the
//!   reset combo); the next `confirm` deletes it, any other command cancels
//! - `list` - Print the library
//! - `rescan` - Request a rescan
//! - `quit`

mod commands;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use ezlaunch_core::library::spawn_rescan_loop;
use ezlaunch_core::{ComboFired, GestureRecognizer, Library, LibrarySynchronizer, Prefs, config};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use session::{Flow, Session};

/// Headless console launcher
#[derive(Parser)]
#[command(name = "ezlaunch")]
#[command(about = "Headless console launcher driven by line commands on stdin")]
#[command(version)]
struct Cli {
    /// Config file (default: platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Content directory, overriding the config file
    #[arg(long)]
    dir: Option<PathBuf>,
}

/// Events delivered to the command loop from background tasks.
enum Event {
    Combo(ComboFired),
    Library(Library),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    if let Some(dir) = cli.dir {
        config.library.directory = dir;
    }

    let prefs = Prefs::load_or_default(config::prefs_path());
    let sync = Arc::new(LibrarySynchronizer::new(config.library.clone(), prefs));
    sync.ensure_directory();
    let library = sync.scan();
    tracing::info!(
        "Found {} titles in {}",
        library.len(),
        sync.directory().display()
    );

    let runtime = tokio::runtime::Handle::current();
    let (tx, mut events) = mpsc::unbounded_channel::<Event>();

    let library_tx = tx.clone();
    let rescan = spawn_rescan_loop(
        &runtime,
        sync.clone(),
        config.library.rescan_debounce(),
        move |library| {
            let _ = library_tx.send(Event::Library(library));
        },
    );

    let watch_trigger = rescan.trigger();
    if sync.start_watching(move || watch_trigger.notify()).is_err() {
        tracing::info!("Live updates disabled; use `rescan` to refresh the library");
    }

    let recognizer = GestureRecognizer::new(runtime.clone());
    for combo in &config.input.combos {
        let combo_tx = tx.clone();
        let combo = combo.to_combo(move |fired| {
            let _ = combo_tx.send(Event::Combo(fired.clone()));
        });
        if let Err(e) = recognizer.register_combo(combo) {
            tracing::warn!("Skipping combo: {}", e);
        }
    }
    drop(tx);

    let mut session = Session::new(sync, recognizer, rescan.trigger(), std::io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match commands::parse(&line) {
                    Ok(Some(command)) => {
                        if session.handle_command(command)? == Flow::Quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("error: {:#}", e),
                }
            }
            Some(event) = events.recv() => match event {
                Event::Combo(fired) => session.handle_combo(&fired)?,
                Event::Library(library) => session.handle_library(library)?,
            },
        }
    }

    session.finish();
    rescan.shutdown();
    Ok(())
}
