//! `save` and `load`: converting between editor JSON and a note on disk.

use std::path::{Path, PathBuf};

use sidemark_core::{ConverterConfig, Deserializer, Node, Result, Serializer, Sidecar};

use crate::cli::block_on;
use crate::cli::store::FileImageStore;
use crate::cli::util::{images_dir, read_file, read_note, read_optional, sidecar_path, write_file};

/// Handle the save command
/// Returns true on success, false on error
pub fn handle_save(tree: &Path, note: &Path, config: &ConverterConfig) -> bool {
    match save(tree, note, config) {
        Ok(sidecar) => {
            println!("✓ Saved {}", note.display());
            println!("  Sidecar: {}", sidecar.display());
            true
        }
        Err(e) => {
            eprintln!("✗ Error saving {}: {}", note.display(), e);
            false
        }
    }
}

/// Handle the load command
/// Returns true on success, false on error
pub fn handle_load(note: &Path, output: Option<&Path>, config: &ConverterConfig) -> bool {
    let json = match load(note, config) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("✗ Error loading {}: {}", note.display(), e);
            return false;
        }
    };

    match output {
        Some(path) => match write_file(path, &json) {
            Ok(()) => {
                println!("✓ Wrote {}", path.display());
                true
            }
            Err(e) => {
                eprintln!("✗ {}", e);
                false
            }
        },
        None => {
            println!("{}", json);
            true
        }
    }
}

/// Write `tree` as `note` plus its sidecar. Returns the sidecar path.
fn save(tree: &Path, note: &Path, config: &ConverterConfig) -> Result<PathBuf> {
    let doc: Node = serde_json::from_str(&read_file(tree)?)?;
    let store = FileImageStore::new(images_dir(note));
    let serializer = Serializer::new(config.clone());

    let sidecar_file = sidecar_path(note);
    let saved = match read_optional(&sidecar_file)? {
        Some(previous) => {
            let previous = Sidecar::from_json(&previous)?;
            block_on(serializer.reserialize(&doc, &previous, &store))?
        }
        None => block_on(serializer.serialize(&doc, &store))?,
    };

    let mut text = saved.text;
    if !text.is_empty() {
        text.push('\n');
    }
    write_file(note, &text)?;
    write_file(&sidecar_file, &saved.sidecar.to_json()?)?;
    Ok(sidecar_file)
}

/// Rebuild a note's tree as pretty-printed editor JSON.
fn load(note: &Path, config: &ConverterConfig) -> Result<String> {
    let pair = read_note(note)?;
    let store = FileImageStore::new(images_dir(note));
    let doc = block_on(Deserializer::new(config.clone()).deserialize(
        &pair.text,
        &pair.sidecar,
        &store,
    ))?;
    Ok(serde_json::to_string_pretty(&doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use sidemark_core::config::MissingImagePolicy;
    use tempfile::TempDir;

    fn tree() -> Value {
        json!({
            "type": "doc",
            "content": [
                {
                    "type": "heading",
                    "attrs": { "level": 2, "blockId": "abc123" },
                    "content": [{ "type": "text", "text": "Plan" }]
                },
                {
                    "type": "paragraph",
                    "attrs": { "blockId": "def456" },
                    "content": [{
                        "type": "text",
                        "text": "Buy milk",
                        "marks": [{ "type": "highlight", "attrs": { "color": "yellow" } }]
                    }]
                },
                {
                    "type": "image",
                    "attrs": { "blockId": "img1", "src": "data:image/png;base64,AAAA", "alt": "dot" }
                }
            ]
        })
    }

    fn write_tree(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("tree.json");
        std::fs::write(&path, tree().to_string()).unwrap();
        path
    }

    #[test]
    fn test_save_writes_note_sidecar_and_images() {
        let dir = TempDir::new().unwrap();
        let note = dir.path().join("plan.md");

        let sidecar = save(&write_tree(&dir), &note, &ConverterConfig::default()).unwrap();
        assert_eq!(sidecar, dir.path().join("plan.sidecar.json"));

        let text = std::fs::read_to_string(&note).unwrap();
        assert!(text.starts_with("<!-- @mid:abc123 -->\n## Plan\n\n<!-- @mid:def456 -->\nBuy milk"));
        assert!(text.ends_with('\n'));
        assert!(!text.contains("data:"));

        let images: Vec<_> = std::fs::read_dir(dir.path().join(".images"))
            .unwrap()
            .collect();
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn test_save_then_load_returns_the_tree() {
        let dir = TempDir::new().unwrap();
        let note = dir.path().join("plan.md");
        save(&write_tree(&dir), &note, &ConverterConfig::default()).unwrap();

        let loaded: Value = serde_json::from_str(&load(&note, &ConverterConfig::default()).unwrap()).unwrap();
        assert_eq!(loaded, tree());
    }

    #[test]
    fn test_resave_keeps_created() {
        let dir = TempDir::new().unwrap();
        let note = dir.path().join("plan.md");
        let tree = write_tree(&dir);
        let config = ConverterConfig::default();

        let sidecar_file = save(&tree, &note, &config).unwrap();
        let first = Sidecar::from_json(&std::fs::read_to_string(&sidecar_file).unwrap()).unwrap();
        save(&tree, &note, &config).unwrap();
        let second = Sidecar::from_json(&std::fs::read_to_string(&sidecar_file).unwrap()).unwrap();

        assert_eq!(first.meta.created, second.meta.created);
        assert!(second.meta.modified >= first.meta.modified);
    }

    #[test]
    fn test_load_without_sidecar() {
        let dir = TempDir::new().unwrap();
        let note = dir.path().join("plain.md");
        std::fs::write(&note, "# Hi\n\nSome **bold** text\n").unwrap();

        let loaded: Value = serde_json::from_str(&load(&note, &ConverterConfig::default()).unwrap()).unwrap();
        assert_eq!(
            loaded,
            json!({
                "type": "doc",
                "content": [
                    {
                        "type": "heading",
                        "attrs": { "level": 1 },
                        "content": [{ "type": "text", "text": "Hi" }]
                    },
                    {
                        "type": "paragraph",
                        "content": [
                            { "type": "text", "text": "Some " },
                            { "type": "text", "text": "bold", "marks": [{ "type": "bold" }] },
                            { "type": "text", "text": " text" }
                        ]
                    }
                ]
            })
        );
    }

    #[test]
    fn test_missing_image_policy() {
        let dir = TempDir::new().unwrap();
        let note = dir.path().join("pic.md");
        std::fs::write(&note, "![cat](@img:0123456789abcdef)\n").unwrap();

        assert!(load(&note, &ConverterConfig::default()).is_err());

        let config = ConverterConfig {
            missing_images: MissingImagePolicy::KeepReference,
            ..Default::default()
        };
        let loaded = load(&note, &config).unwrap();
        assert!(loaded.contains("@img:0123456789abcdef"));
    }
}
