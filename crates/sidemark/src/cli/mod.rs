/// Clap argument definitions
mod args;

/// `save` and `load`
mod convert;

/// `stats` and `prune`
mod inspect;

/// File-backed image store
mod store;

/// Shared CLI utilities
mod util;

use clap::Parser;
use log::LevelFilter;

pub use args::Cli;
use args::Commands;

/// Helper to run async operations in sync context
fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures_lite::future::block_on(f)
}

/// Main entry point for the CLI
pub fn run_cli() {
    let cli = Cli::parse();

    // RUST_LOG still overrides per module
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = match util::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Error loading config: {}", e);
            std::process::exit(1);
        }
    };
    log::debug!("Using config {:?}", config);

    let success = match cli.command {
        Commands::Save { tree, note } => convert::handle_save(&tree, &note, &config),

        Commands::Load { note, output } => {
            convert::handle_load(&note, output.as_deref(), &config)
        }

        Commands::Stats { note } => inspect::handle_stats(&note, &config),

        Commands::Prune { note, dry_run } => inspect::handle_prune(&note, dry_run),
    };

    if !success {
        std::process::exit(1);
    }
}
