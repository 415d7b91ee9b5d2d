//! Locally persisted provider API keys.
//!
//! WARNING: keys are only base64 encoded before they are written to
//! disk. That keeps them from being read over someone's shoulder and
//! nothing more: anyone who can read `credentials.json` can recover
//! every key. Swapping in an OS keychain or authenticated encryption
//! should keep the `load`/`save` signatures below unchanged.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use thiserror::Error;

/// Providers a key can be stored for.
pub const PROVIDERS: [&str; 3] = ["gemini", "chatGPT", "claude"];

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Failed to access credential file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode credentials: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Stored key for {0} is not valid")]
    Decode(String),
}

/// Provider id to secret, always holding an entry for every known
/// provider. An empty secret means the provider is unset.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    pub fn empty() -> Self {
        Self(
            PROVIDERS
                .iter()
                .map(|p| (p.to_string(), String::new()))
                .collect(),
        )
    }

    /// Build from pairs, ignoring providers that aren't known.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut creds = Self::empty();
        for (provider, secret) in pairs {
            creds.set(provider, secret);
        }
        creds
    }

    /// The secret for `provider` if one is set.
    pub fn get(&self, provider: &str) -> Option<&str> {
        self.0
            .get(provider)
            .map(String::as_str)
            .filter(|secret| !secret.is_empty())
    }

    pub fn is_set(&self, provider: &str) -> bool {
        self.get(provider).is_some()
    }

    /// Returns false when `provider` is not one of [`PROVIDERS`].
    pub fn set(&mut self, provider: &str, secret: &str) -> bool {
        match self.0.get_mut(provider) {
            Some(slot) => {
                *slot = secret.trim().to_string();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, provider: &str) -> bool {
        self.set(provider, "")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Display form that never shows more than the last four chars.
    pub fn masked(&self, provider: &str) -> String {
        match self.get(provider) {
            None => String::from("(unset)"),
            Some(secret) => {
                let chars: Vec<char> = secret.chars().collect();
                if chars.len() <= 4 {
                    "*".repeat(chars.len())
                } else {
                    let tail: String = chars[chars.len() - 4..].iter().collect();
                    format!("{}{}", "*".repeat(8), tail)
                }
            }
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(PROVIDERS.iter().map(|p| (p, self.masked(p))))
            .finish()
    }
}

/// Result of [`CredentialStore::load`]. Loading never fails, a
/// broken store reads as empty with a warning attached.
#[derive(Debug)]
pub struct LoadedCredentials {
    pub credentials: Credentials,
    pub warning: Option<String>,
}

pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> LoadedCredentials {
        if !self.path.exists() {
            return LoadedCredentials {
                credentials: Credentials::empty(),
                warning: None,
            };
        }

        match self.read() {
            Ok(credentials) => LoadedCredentials {
                credentials,
                warning: None,
            },
            Err(e) => {
                tracing::warn!("Ignoring stored API keys at {}: {}", self.path.display(), e);
                LoadedCredentials {
                    credentials: Credentials::empty(),
                    warning: Some(format!("Stored API keys could not be read: {}", e)),
                }
            }
        }
    }

    fn read(&self) -> Result<Credentials, CredentialError> {
        let content = fs::read_to_string(&self.path)?;
        let stored: BTreeMap<String, String> = serde_json::from_str(&content)?;

        let mut creds = Credentials::empty();
        for provider in PROVIDERS {
            if let Some(value) = stored.get(provider) {
                let secret = reveal(value).ok_or(CredentialError::Decode(provider.to_string()))?;
                creds.set(provider, &secret);
            }
        }
        Ok(creds)
    }

    /// Replace the stored keys. The file is written to a sibling and
    /// renamed into place so a failed save leaves the previous keys.
    pub fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let stored: BTreeMap<&str, String> = PROVIDERS
            .iter()
            .map(|p| (*p, obfuscate(credentials.get(p).unwrap_or(""))))
            .collect();
        let content = serde_json::to_string_pretty(&stored)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let result = fs::write(&tmp_path, content).and_then(|_| fs::rename(&tmp_path, &self.path));
        if let Err(e) = result {
            tracing::error!("Failed to save API keys to {}: {}", self.path.display(), e);
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        tracing::info!("Saved API keys to {}", self.path.display());
        Ok(())
    }
}

fn obfuscate(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    STANDARD.encode(secret.as_bytes())
}

fn reveal(stored: &str) -> Option<String> {
    if stored.is_empty() {
        return Some(String::new());
    }
    STANDARD
        .decode(stored)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}
