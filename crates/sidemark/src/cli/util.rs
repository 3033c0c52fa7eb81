//! Shared utilities for CLI commands

use std::path::{Path, PathBuf};

use sidemark_core::{ConverterConfig, Result, Sidecar, SidemarkError};

/// Where a note's sidecar lives: `plan.md` → `plan.sidecar.json`.
pub fn sidecar_path(note: &Path) -> PathBuf {
    note.with_extension("sidecar.json")
}

/// Directory holding a note's stored images.
pub fn images_dir(note: &Path) -> PathBuf {
    note.parent()
        .unwrap_or_else(|| Path::new("."))
        .join(".images")
}

/// Default config file location, if the platform has a config directory.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sidemark").join("config.toml"))
}

pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| SidemarkError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a file that may legitimately be absent.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SidemarkError::FileRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| SidemarkError::FileWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| SidemarkError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the converter config.
///
/// An explicit path must exist. The default location is optional: if it is
/// missing (or there is no config directory) the defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<ConverterConfig> {
    let content = match explicit {
        Some(path) => Some(read_file(path)?),
        None => match config_path() {
            Some(path) => read_optional(&path)?,
            None => {
                log::debug!("{}; using defaults", SidemarkError::NoConfigDir);
                None
            }
        },
    };
    match content {
        Some(content) => ConverterConfig::from_toml_str(&content),
        None => Ok(ConverterConfig::default()),
    }
}

/// A note's body and sidecar. `existing` is false when no sidecar file was found.
pub struct NotePair {
    pub text: String,
    pub sidecar: Sidecar,
    pub existing: bool,
}

pub fn read_note(note: &Path) -> Result<NotePair> {
    let text = read_file(note)?;
    let raw = read_optional(&sidecar_path(note))?;
    let existing = raw.is_some();
    if !existing {
        log::info!("No sidecar for {}; loading without formatting", note.display());
    }
    Ok(NotePair {
        text,
        sidecar: Sidecar::parse_or_empty(raw.as_deref())?,
        existing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidemark_core::config::TableMode;
    use tempfile::TempDir;

    #[test]
    fn test_sidecar_path_replaces_extension() {
        assert_eq!(
            sidecar_path(Path::new("notes/plan.md")),
            PathBuf::from("notes/plan.sidecar.json")
        );
        assert_eq!(images_dir(Path::new("plan.md")), PathBuf::from(".images"));
        assert_eq!(
            images_dir(Path::new("notes/plan.md")),
            PathBuf::from("notes/.images")
        );
    }

    #[test]
    fn test_explicit_config_is_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tables = \"placeholder\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.tables, TableMode::Placeholder);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, SidemarkError::FileRead { .. }));
    }

    #[test]
    fn test_read_note_without_sidecar() {
        let dir = TempDir::new().unwrap();
        let note = dir.path().join("a.md");
        std::fs::write(&note, "hello").unwrap();

        let pair = read_note(&note).unwrap();
        assert_eq!(pair.text, "hello");
        assert!(!pair.existing);
        assert!(pair.sidecar.is_empty());
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep").join("er").join("a.md");
        write_file(&path, "x").unwrap();
        assert_eq!(read_file(&path).unwrap(), "x");
    }
}
