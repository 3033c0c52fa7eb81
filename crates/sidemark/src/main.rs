//! `sidemark` command-line interface.
//!
//! Saves editor document trees as a markdown note plus a JSON sidecar, and
//! loads them back.

/// CLI module - command-line interface for sidemark
mod cli;

fn main() {
    cli::run_cli();
}
