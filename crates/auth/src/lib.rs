use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Key under which a profile's API token is stored.
pub fn token_key(profile: &str) -> String {
    format!("jira-users:{profile}")
}

/// API tokens kept in a JSON file readable only by the owner.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `~/.jira-users/credentials`.
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().context("Cannot determine home directory")?;
        Ok(Self::new(home.join(".jira-users").join("credentials")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_secret(&self, account: &str, secret: &str) -> Result<()> {
        let mut creds = self.read_all()?;
        creds.insert(account.to_string(), secret.to_string());
        self.write_all(&creds)?;
        debug!(account, "Secret stored");
        Ok(())
    }

    pub fn get_secret(&self, account: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(account))
    }

    /// Removes a secret. Returns whether one was present.
    pub fn delete_secret(&self, account: &str) -> Result<bool> {
        let mut creds = self.read_all()?;
        let removed = creds.remove(account).is_some();
        if removed {
            self.write_all(&creds)?;
            debug!(account, "Secret removed");
        }
        Ok(removed)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path).with_context(|| {
            format!("Unable to read credentials file {}", self.path.display())
        })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).with_context(|| {
            format!("Malformed credentials file {}", self.path.display())
        })
    }

    fn write_all(&self, creds: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).with_context(|| {
            format!("Unable to write credentials file {}", self.path.display())
        })?;
        let json = serde_json::to_string_pretty(creds)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
