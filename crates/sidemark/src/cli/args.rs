//! Command-line argument structures and enums

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sidemark")]
#[command(about = "Store rich-text documents as plain markdown plus a formatting sidecar", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Converter config file (defaults to <config dir>/sidemark/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log conversion details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an editor JSON tree as a note and its sidecar
    ///
    /// The sidecar is written next to the note as NOTE.sidecar.json. If one
    /// already exists its creation time is kept. Inline images are stored
    /// in an `.images` directory beside the note.
    Save {
        /// Editor document tree (JSON)
        tree: PathBuf,

        /// Note to write (markdown)
        note: PathBuf,
    },

    /// Rebuild the editor JSON tree from a note and its sidecar
    ///
    /// A missing sidecar is not an error: the note loads without formatting.
    Load {
        /// Note to read (markdown)
        note: PathBuf,

        /// Write the tree here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show block, word and reading-time statistics for a note
    Stats {
        /// Note to inspect
        note: PathBuf,
    },

    /// Drop sidecar entries for blocks no longer in the note
    Prune {
        /// Note whose sidecar should be pruned
        note: PathBuf,

        /// Show what would be removed without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["sidemark", "prune", "a.md", "--dry-run", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Prune { note, dry_run } => {
                assert_eq!(note, PathBuf::from("a.md"));
                assert!(dry_run);
            }
            _ => panic!("expected prune"),
        }
    }
}
