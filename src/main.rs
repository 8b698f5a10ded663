//! ReviewFlow - Keyboard-driven review workflow engine
//!
//! Main entry point for the terminal harness.
//!
//! # Overview
//!
//! This binary drives a [`ReviewSession`] from stdin, one key combo per line, so the
//! engine can be exercised without a rendering layer. It initializes:
//! - Configuration loading ([`ConfigManager`], YAML + `REVIEWFLOW_*` environment overrides)
//! - Logging infrastructure (file rotation + console output)
//! - Tokio async runtime (autosave timers and draft persistence)
//! - The review session over a [`FileDraftStore`]
//!
//! # Execution Flow
//!
//! 1. Load `ReviewFlow Config.yaml` and `ReviewFlow Documents.yaml` from `ReviewFlow Data/`
//! 2. Initialize logging → logs/reviewflow.<date>
//! 3. Create tokio runtime with 2 worker threads
//! 4. Restore drafts from `ReviewFlow Data/drafts/`
//! 5. Read commands from stdin until `quit` or EOF
//! 6. Flush unsaved decisions, log metrics, shut down the runtime with a 5s timeout
//!
//! # Input
//!
//! - Key combos: `a`, `shift+tab`, `ctrl+s`, `right`, `3`, `cmd+k`, ...
//! - `focus input` / `focus document`: Key events arrive from a text control or the page
//! - `mode fields` / `mode documents`: Who owns the arrow keys
//! - `select <id>`: Pick a document as the quick switcher would
//! - `prompt`: Print the extraction prompt for the selected document
//! - `help`, `quit`

use anyhow::{Context, Result};
use reviewflow::keyboard::{FocusTarget, KeyEvent};
use reviewflow::services::{DocumentNavigator, ReviewShortcutDispatcher};
use reviewflow::{
    APP_NAME, ConfigManager, FileDraftStore, KeyboardHub, Metrics, ReviewMode, ReviewSession,
    VERSION,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

const DATA_DIR: &str = "ReviewFlow Data";
const BASE_PROMPT: &str = "Extract the requested fields from the document as JSON.";

fn print_help() {
    println!("Document navigation:");
    for entry in DocumentNavigator::catalogue() {
        println!("  {}", entry);
    }
    println!("Field review:");
    for entry in ReviewShortcutDispatcher::catalogue() {
        println!("  {}", entry);
    }
    println!("Commands: focus <input|document>, mode <fields|documents>, select <id>, prompt, help, quit");
}

fn parse_focus(name: &str) -> Option<FocusTarget> {
    match name {
        "document" | "page" => Some(FocusTarget::Document),
        "input" => Some(FocusTarget::Input),
        "textarea" => Some(FocusTarget::TextArea),
        "editable" | "contenteditable" => Some(FocusTarget::ContentEditable),
        _ => None,
    }
}

fn parse_mode(name: &str) -> Option<ReviewMode> {
    match name {
        "documents" | "docs" => Some(ReviewMode::Documents),
        "fields" => Some(ReviewMode::Fields),
        _ => None,
    }
}

/// Main entry point for the ReviewFlow terminal harness
///
/// # Errors
///
/// This function can fail if:
/// - The data directory cannot be created or its YAML files are invalid
/// - Logging initialization fails (disk space, permissions)
/// - Tokio runtime creation fails (system resources)
/// - Stdin cannot be read
fn main() -> Result<()> {
    let config_manager = ConfigManager::new(DATA_DIR)?;
    let config = config_manager.load_review_config()?;

    let _log_guard = reviewflow::logging::setup_logging_from(&config.logging, "reviewflow")?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let manifest = config_manager.load_manifest()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("reviewflow-worker")
        .build()
        .context("Failed to create tokio runtime")?;
    let _enter = runtime.enter();

    tracing::info!("Tokio runtime initialized with {} worker threads", 2);

    let store = FileDraftStore::new(config_manager.config_dir().join("drafts"));
    let saved = runtime.block_on(store.load())?;

    let hub = KeyboardHub::new();
    let metrics = Arc::new(Metrics::new());
    let session = ReviewSession::new(
        &config,
        &hub,
        manifest.documents,
        Some(&saved),
        Arc::new(store),
        Arc::clone(&metrics),
    )?;

    let mut changes = session.state().subscribe();
    let printer = runtime.spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => println!("  -> {:?}", change),
                Err(RecvError::Lagged(skipped)) => println!("  ({} state change(s) skipped)", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    print_help();
    let state = session.state().snapshot();
    println!(
        "{} document(s), selected: {}, {} field decision(s) pending",
        state.documents.len(),
        state.selected_document.as_deref().unwrap_or("none"),
        state.snapshot.pending_count()
    );

    let mut focus = FocusTarget::Document;
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (line, ""),
        };

        match command {
            "quit" | "exit" => break,
            "help" => print_help(),
            "prompt" => println!("{}", session.extraction_prompt(BASE_PROMPT)),
            "select" => {
                session.select_document(argument);
            }
            "focus" => match parse_focus(argument) {
                Some(target) => {
                    focus = target;
                    println!("Focus: {:?}", focus);
                }
                None => println!("Unknown focus target '{}'", argument),
            },
            "mode" => match parse_mode(argument) {
                Some(mode) => {
                    session.set_mode(mode);
                }
                None => println!("Unknown mode '{}'", argument),
            },
            _ => match KeyEvent::parse(line) {
                Ok(event) => {
                    let mut event = event.with_focus(focus.clone());
                    match session.dispatch(&mut event) {
                        Ok(_) if !event.default_prevented() => println!("(ignored {})", line),
                        Ok(_) => {}
                        Err(e) => println!("Dispatch failed: {}", e),
                    }
                }
                Err(e) => println!("{}", e),
            },
        }
        io::stdout().flush().ok();
    }

    tracing::info!("Input closed, shutting down");

    if let Some(outcome) = runtime.block_on(session.shutdown()) {
        println!("Final save: {:?}", outcome);
    }
    printer.abort();

    drop(_enter);
    runtime.shutdown_timeout(Duration::from_secs(5));

    tracing::info!("Application shutdown complete");
    Ok(())
}
