//! OAuth access tokens remembered per profile.
//!
//! Tokens live in a JSON file readable only by the owner. Basic-auth
//! passwords are never written here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub token_secret: String,
}

impl StoredToken {
    pub fn new(token: impl Into<String>, token_secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_secret: token_secret.into(),
        }
    }
}

impl fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredToken")
            .field("token", &self.token)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Store at `~/.atlassian-connector/credentials`.
    pub fn open_default() -> Result<Self> {
        let home = dirs::home_dir().context("Cannot determine home directory")?;
        Ok(Self::at(home.join(".atlassian-connector").join("credentials")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remember the token for `profile`, replacing any previous one.
    pub fn save(&self, profile: &str, token: &StoredToken) -> Result<()> {
        let mut tokens = self.read_all()?;
        tokens.insert(profile.to_string(), token.clone());
        self.write_all(&tokens)?;
        debug!(profile, path = %self.path.display(), "Stored access token");
        Ok(())
    }

    pub fn load(&self, profile: &str) -> Result<Option<StoredToken>> {
        Ok(self.read_all()?.remove(profile))
    }

    /// Forget the token for `profile`. Returns whether one was stored.
    pub fn delete(&self, profile: &str) -> Result<bool> {
        let mut tokens = self.read_all()?;
        let removed = tokens.remove(profile).is_some();
        if removed {
            self.write_all(&tokens)?;
        }
        Ok(removed)
    }

    fn read_all(&self) -> Result<BTreeMap<String, StoredToken>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Unable to read credentials at {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Malformed credentials file {}", self.path.display()))
    }

    fn write_all(&self, tokens: &BTreeMap<String, StoredToken>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create credentials directory {}", parent.display())
            })?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let file = options
            .open(&self.path)
            .with_context(|| format!("Unable to write credentials at {}", self.path.display()))?;
        serde_json::to_writer_pretty(file, tokens)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> TokenStore {
        TokenStore::at(dir.path().join("nested").join("credentials"))
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).load("work").unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.save("work", &StoredToken::new("tok", "sec")).unwrap();
        store.save("home", &StoredToken::new("tok2", "sec2")).unwrap();

        assert_eq!(
            store.load("work").unwrap(),
            Some(StoredToken::new("tok", "sec"))
        );
        assert_eq!(
            store.load("home").unwrap(),
            Some(StoredToken::new("tok2", "sec2"))
        );
    }

    #[test]
    fn test_save_replaces_previous_token() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.save("work", &StoredToken::new("old", "old")).unwrap();
        store.save("work", &StoredToken::new("new", "new")).unwrap();

        assert_eq!(store.load("work").unwrap().unwrap().token, "new");
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.save("work", &StoredToken::new("tok", "sec")).unwrap();
        assert!(store.delete("work").unwrap());
        assert!(!store.delete("work").unwrap());
        assert!(store.load("work").unwrap().is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{not json").unwrap();

        let err = store.load("work").unwrap_err();
        assert!(err.to_string().contains("Malformed credentials file"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let token = StoredToken::new("visible", "hidden");
        assert!(!format!("{token:?}").contains("hidden"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save("work", &StoredToken::new("tok", "sec")).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
