//! `stats` and `prune`: reading and tidying a note's sidecar.

use std::path::Path;

use chrono::Local;
use sidemark_core::block_id::collect_block_ids;
use sidemark_core::sidecar::{MetaUpdate, reading_time, word_count};
use sidemark_core::{ConverterConfig, Deserializer, Node, Result, Sidecar};

use crate::cli::util::{read_note, sidecar_path, write_file};

/// Statistics for one note.
#[derive(Debug, PartialEq, Eq)]
struct NoteStats {
    blocks: usize,
    words: usize,
    minutes: u32,
    formatted_blocks: usize,
}

/// Handle the stats command
/// Returns true on success, false on error
pub fn handle_stats(note: &Path, config: &ConverterConfig) -> bool {
    let pair = match read_note(note) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("✗ Error reading {}: {}", note.display(), e);
            return false;
        }
    };
    let stats = stats(&pair.text, &pair.sidecar, config);

    println!("{}", note.display());
    println!("  Blocks: {}", stats.blocks);
    println!("  Words: {}", stats.words);
    println!("  Reading time: {} min", stats.minutes);
    println!("  Formatted blocks: {}", stats.formatted_blocks);
    if pair.existing {
        let meta = &pair.sidecar.meta;
        println!(
            "  Created: {}",
            meta.created.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
        println!(
            "  Modified: {}",
            meta.modified.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    } else {
        println!("  No sidecar");
    }
    true
}

/// Handle the prune command
/// Returns true on success, false on error
pub fn handle_prune(note: &Path, dry_run: bool) -> bool {
    match prune(note, dry_run) {
        Ok(stale) if stale.is_empty() => {
            println!("✓ Nothing to prune");
            true
        }
        Ok(stale) => {
            if dry_run {
                println!("Would remove {} stale blocks:", stale.len());
            } else {
                println!("✓ Removed {} stale blocks:", stale.len());
            }
            for id in stale {
                println!("  {}", id);
            }
            true
        }
        Err(e) => {
            eprintln!("✗ Error pruning {}: {}", note.display(), e);
            false
        }
    }
}

/// Words of every text-bearing block, counted block by block.
fn words(node: &Node) -> usize {
    match node {
        Node::Paragraph { .. } | Node::Heading { .. } => word_count(&node.plain_text()),
        _ if !node.children().is_empty() => node.children().iter().map(words).sum(),
        _ => word_count(&node.plain_text()),
    }
}

fn stats(text: &str, sidecar: &Sidecar, config: &ConverterConfig) -> NoteStats {
    let doc = Deserializer::new(config.clone()).parse(text, sidecar);
    let words = words(&doc);
    let live = collect_block_ids(text);
    NoteStats {
        blocks: doc.children().len(),
        words,
        minutes: reading_time(words, config.words_per_minute),
        formatted_blocks: sidecar
            .block_ids()
            .iter()
            .filter(|id| live.contains(*id))
            .count(),
    }
}

/// Drop sidecar entries for blocks missing from the note. Returns the removed ids.
fn prune(note: &Path, dry_run: bool) -> Result<Vec<String>> {
    let mut pair = read_note(note)?;
    if !pair.existing {
        return Ok(Vec::new());
    }

    let live = collect_block_ids(&pair.text);
    let stale = pair.sidecar.stale_block_ids(&live);
    if stale.is_empty() || dry_run {
        return Ok(stale);
    }

    pair.sidecar.retain_blocks(&live);
    pair.sidecar.update_meta(MetaUpdate::default());
    write_file(&sidecar_path(note), &pair.sidecar.to_json()?)?;
    log::debug!("Pruned {:?} from {}", stale, note.display());
    Ok(stale)
}
