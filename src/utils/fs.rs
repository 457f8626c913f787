//! Store file persistence helpers
//!
//! Small JSON documents written atomically with owner-only permissions

use crate::utils::error::{BrokerError, BrokerResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Load a JSON store file into memory
///
/// A missing or unreadable file yields `None` so the caller starts from empty
/// state; corruption is logged, never fatal.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to read store file {:?}: {}", path, e);
            }
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => {
            debug!("Loaded store file {:?}", path);
            Some(value)
        }
        Err(e) => {
            warn!("Ignoring corrupt store file {:?}: {}", path, e);
            None
        }
    }
}

/// Write a JSON store file atomically
///
/// Pretty-prints into a temporary file in the target directory, restricts it
/// to owner read/write on Unix, then renames over the destination.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> BrokerResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| BrokerError::Persistence(format!("no parent directory for {:?}", path)))?;

    fs::create_dir_all(dir)
        .map_err(|e| BrokerError::Persistence(format!("create {:?}: {}", dir, e)))?;

    let content = serde_json::to_string_pretty(value)
        .map_err(|e| BrokerError::Persistence(format!("serialize {:?}: {}", path, e)))?;

    let tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| BrokerError::Persistence(format!("temp file in {:?}: {}", dir, e)))?;

    fs::write(tmp.path(), content.as_bytes())
        .map_err(|e| BrokerError::Persistence(format!("write {:?}: {}", tmp.path(), e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))
            .map_err(|e| BrokerError::Persistence(format!("chmod {:?}: {}", tmp.path(), e)))?;
    }

    tmp.persist(path)
        .map_err(|e| BrokerError::Persistence(format!("rename into {:?}: {}", path, e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        name: String,
        count: u64,
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");

        let doc = Doc {
            name: "wallet".to_string(),
            count: 3,
        };
        write_json_atomic(&path, &doc).unwrap();

        let loaded: Doc = load_json(&path).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Option<Doc> = load_json(&dir.path().join("absent.json"));
        assert!(loaded.is_none());
    }

    #[test]
    fn test_corrupt_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, "{not json").unwrap();

        let loaded: Option<Doc> = load_json(&path);
        assert!(loaded.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_only_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_json_atomic(
            &path,
            &Doc {
                name: "vault".to_string(),
                count: 0,
            },
        )
        .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
