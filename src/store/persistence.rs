// Persistence du catalogue - document JSON unique, réécrit en entier

use crate::store::StoreError;
use crate::store::button::SoundButton;
use std::path::{Path, PathBuf};

/// Serialize the whole collection to the on-disk document format
pub fn encode(buttons: &[SoundButton]) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec_pretty(buttons)?)
}

/// Parse a document produced by [`encode`]
pub fn decode(bytes: &[u8]) -> Result<Vec<SoundButton>, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write `bytes` to `path` through a sibling temporary file
///
/// The rename replaces the previous document in one step, so a crash mid-write
/// leaves either the old or the new document on disk, never a truncated one.
pub fn write_document(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);
    std::fs::write(&temp_path, bytes)?;

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_encode_is_insertion_ordered() {
        let buttons = vec![
            SoundButton::new("B", "b.wav", "Default", 0),
            SoundButton::new("A", "a.wav", "Default", 1),
        ];

        let decoded = decode(&encode(&buttons).unwrap()).unwrap();
        assert_eq!(decoded, buttons);
        assert_eq!(decoded[0].label, "B");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(b"{ not json").is_err());
        assert!(decode(br#"{"label":"not an array"}"#).is_err());
    }

    #[test]
    fn test_write_document_replaces_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("buttons.json");

        write_document(&path, b"[]").unwrap();
        write_document(&path, b"[ ]").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"[ ]");
        assert!(!temp_path_for(&path).exists());
    }
}
