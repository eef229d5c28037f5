use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Directory under the home directory holding config and stored tokens.
pub const CONFIG_DIR: &str = ".atlassian-connector";

/// Connector configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    /// Load configuration from the provided path or the default config file.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Config::default_path);

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Unable to read config file at {}", path.display()))?;

        serde_yaml::from_str(&raw)
            .with_context(|| format!("Malformed YAML in config file {}", path.display()))
    }

    /// Persist the configuration to disk, creating parent directories if needed.
    pub fn save<P: AsRef<Path>>(&self, path: Option<P>) -> Result<()> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Config::default_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create config directory {}", parent.display())
            })?;
        }

        let serialized = serde_yaml::to_string(self)?;
        fs::write(&path, serialized)
            .with_context(|| format!("Unable to write config file {}", path.display()))?;

        Ok(())
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Returns the requested profile, else the default one, else the first.
    pub fn resolve_profile<'a>(
        &'a self,
        requested: Option<&'a str>,
    ) -> Option<(&'a str, &'a Profile)> {
        if let Some(name) = requested {
            self.profiles.get(name).map(|profile| (name, profile))
        } else if let Some(default_name) = self.default_profile.as_deref() {
            self.profiles
                .get(default_name)
                .map(|profile| (default_name, profile))
        } else {
            self.profiles
                .iter()
                .next()
                .map(|(name, profile)| (name.as_str(), profile))
        }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(CONFIG_DIR);
        path.push("config.yaml");
        path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    #[default]
    Jira,
    Confluence,
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductKind::Jira => f.write_str("jira"),
            ProductKind::Confluence => f.write_str("confluence"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    OAuth,
    Basic,
}

/// Timeouts in milliseconds, as written in the YAML file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_request_ms")]
    pub request_ms: u64,
    #[serde(default = "default_upload_ms")]
    pub upload_ms: u64,
}

fn default_request_ms() -> u64 {
    5_000
}

fn default_upload_ms() -> u64 {
    50_000
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            request_ms: default_request_ms(),
            upload_ms: default_upload_ms(),
        }
    }
}

impl TimeoutSettings {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn upload(&self) -> Duration {
        Duration::from_millis(self.upload_ms)
    }
}

/// One server plus the way to authenticate against it. Fields are optional
/// so a profile can be written before the key or username is known; the
/// accessors below fail with a readable message when a needed one is absent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    pub base_url: Option<String>,
    #[serde(default)]
    pub product: ProductKind,
    #[serde(default)]
    pub auth: AuthMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

impl Profile {
    pub fn base_url(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .ok_or_else(|| anyhow!("Profile has no base_url"))
    }

    pub fn username(&self) -> Result<&str> {
        self.username
            .as_deref()
            .ok_or_else(|| anyhow!("Basic authentication requires a username in the profile"))
    }

    pub fn consumer_key(&self) -> Result<&str> {
        self.consumer_key
            .as_deref()
            .ok_or_else(|| anyhow!("OAuth requires a consumer_key in the profile"))
    }

    /// Key path with a leading `~/` expanded to the home directory.
    pub fn private_key_path(&self) -> Result<PathBuf> {
        let path = self
            .private_key_path
            .as_deref()
            .ok_or_else(|| anyhow!("OAuth requires a private_key_path in the profile"))?;

        match (path.strip_prefix("~"), dirs::home_dir()) {
            (Ok(rest), Some(home)) => Ok(home.join(rest)),
            _ => Ok(path.to_path_buf()),
        }
    }
}
