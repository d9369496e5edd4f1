mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::sync::Arc;

use barkeep::bar::click_listener;
use barkeep::bar::dispatch::{self, Dispatcher};
use barkeep::config::Config;
use barkeep::plugin::PluginHandle;
use barkeep::sync::UpdateQueue;
use barkeep::theme::Theme;
use cli::Cli;

/// Initialize logging to stderr; stdout carries the bar protocol.
///
/// Log level is controlled with the RUST_LOG env var (default: info).
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("barkeep {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_logging();
    tracing::info!("barkeep starting");

    let config = Config::load(cli.config.as_deref())?;
    if config.plugins.is_empty() {
        tracing::warn!("no plugins configured, the bar will stay empty");
    }
    let theme = Theme::from_config(&config.theme);

    // Entry order is the dispatch order and the instance id space.
    let mut handles = Vec::with_capacity(config.plugins.len());
    for (id, entry) in config.plugins.iter().enumerate() {
        let source = entry
            .source()
            .with_context(|| format!("plugin entry {}", id))?;
        handles.push(PluginHandle::new(id, source, entry.config.as_ref())?);
    }

    let queue = Arc::new(UpdateQueue::new(handles.len()));
    dispatch::start_plugins(&mut handles, &queue)?;
    let handles = Arc::new(handles);

    if handles.iter().any(|h| h.click_events()) {
        // Detached on purpose: the listener lives for the process
        // lifetime and is never joined.
        let _ = click_listener::spawn(Arc::clone(&handles), io::BufReader::new(io::stdin()))?;
    }

    let stdout = io::stdout().lock();
    Dispatcher::new(handles, queue, theme, stdout).run()
}
