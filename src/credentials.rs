//! Credential loading: layered secret resolution.
//!
//! Each required credential is looked up in an ordered list of sources
//! (the TOML secrets file, then the process environment). The first source
//! with a non-empty value wins. A secrets file that is absent or malformed is
//! skipped, never treated as fatal.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ConfigError;

/// The three secrets the agent router needs.
///
/// Variant order is the order in which missing names are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CredentialName {
    /// Inference-service token (Hugging Face).
    #[serde(rename = "HF_TOKEN")]
    HfToken,
    /// Completion-service key (Groq).
    #[serde(rename = "GROQ_API_KEY")]
    GroqApiKey,
    /// Weather-service key (Tomorrow.io).
    #[serde(rename = "TOMORROW_API_KEY")]
    TomorrowApiKey,
}

impl CredentialName {
    pub const ALL: [CredentialName; 3] = [
        CredentialName::HfToken,
        CredentialName::GroqApiKey,
        CredentialName::TomorrowApiKey,
    ];

    /// Key used in the secrets file and as the environment variable name.
    pub fn key(&self) -> &'static str {
        match self {
            Self::HfToken => "HF_TOKEN",
            Self::GroqApiKey => "GROQ_API_KEY",
            Self::TomorrowApiKey => "TOMORROW_API_KEY",
        }
    }

    /// Human-facing name of the backing service.
    pub fn service_label(&self) -> &'static str {
        match self {
            Self::HfToken => "Hugging Face",
            Self::GroqApiKey => "Groq API",
            Self::TomorrowApiKey => "Tomorrow.io API",
        }
    }
}

impl fmt::Display for CredentialName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ── Sources ─────────────────────────────────────────────────────────────

/// A place secrets can be read from.
pub trait SecretSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Look up a raw value. Empty values are filtered by the loader.
    fn get(&self, key: &str) -> Option<String>;
}

/// Top-level string keys of a TOML secrets file.
#[derive(Debug)]
pub struct SecretsFile {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl SecretsFile {
    /// Read and parse a secrets file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(path, &content)
    }

    /// Parse secrets from TOML text. Non-string values are ignored.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let table = content.parse::<toml::Table>().map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                reason: e.message().to_string(),
            }
        })?;

        let values = table
            .into_iter()
            .filter_map(|(key, value)| match value {
                toml::Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretSource for SecretsFile {
    fn name(&self) -> &str {
        "secrets-file"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Process environment.
pub struct EnvSource;

impl SecretSource for EnvSource {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory source, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MapSource {
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SecretSource for MapSource {
    fn name(&self) -> &str {
        "map"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

// ── Credential set ──────────────────────────────────────────────────────

/// Resolved credentials. Each slot is present or absent; never mutated after load.
#[derive(Debug, Default)]
pub struct CredentialSet {
    hf_token: Option<SecretString>,
    groq_api_key: Option<SecretString>,
    tomorrow_api_key: Option<SecretString>,
}

impl CredentialSet {
    pub fn get(&self, name: CredentialName) -> Option<&SecretString> {
        match name {
            CredentialName::HfToken => self.hf_token.as_ref(),
            CredentialName::GroqApiKey => self.groq_api_key.as_ref(),
            CredentialName::TomorrowApiKey => self.tomorrow_api_key.as_ref(),
        }
    }

    pub fn is_present(&self, name: CredentialName) -> bool {
        self.get(name).is_some()
    }

    fn slot(&mut self, name: CredentialName) -> &mut Option<SecretString> {
        match name {
            CredentialName::HfToken => &mut self.hf_token,
            CredentialName::GroqApiKey => &mut self.groq_api_key,
            CredentialName::TomorrowApiKey => &mut self.tomorrow_api_key,
        }
    }
}

/// The complete set of credentials the router facade is built from.
#[derive(Debug)]
pub struct ResolvedCredentials {
    pub weather_api_key: SecretString,
    pub hf_token: SecretString,
    pub groq_api_key: SecretString,
}

/// Outcome of a load: the set plus the names no source could provide.
#[derive(Debug)]
pub struct LoadedCredentials {
    pub credentials: CredentialSet,
    pub missing: BTreeSet<CredentialName>,
}

impl LoadedCredentials {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Names of missing credentials, in report order.
    pub fn missing_names(&self) -> Vec<String> {
        self.missing.iter().map(|n| n.key().to_string()).collect()
    }

    /// Presence flags for every credential, taken at load time.
    pub fn presence(&self) -> Vec<(CredentialName, bool)> {
        CredentialName::ALL
            .iter()
            .map(|name| (*name, self.credentials.is_present(*name)))
            .collect()
    }

    /// Gate startup: all three credentials or a fatal error naming the gaps.
    pub fn require(mut self) -> Result<ResolvedCredentials, ConfigError> {
        if !self.is_complete() {
            return Err(ConfigError::MissingCredentials {
                names: self.missing_names(),
            });
        }

        let mut take = |name: CredentialName| {
            self.credentials
                .slot(name)
                .take()
                .ok_or_else(|| ConfigError::MissingCredentials {
                    names: vec![name.key().to_string()],
                })
        };

        Ok(ResolvedCredentials {
            weather_api_key: take(CredentialName::TomorrowApiKey)?,
            hf_token: take(CredentialName::HfToken)?,
            groq_api_key: take(CredentialName::GroqApiKey)?,
        })
    }
}

// ── Loader ──────────────────────────────────────────────────────────────

/// Resolves credentials over an ordered list of sources.
pub struct CredentialLoader {
    sources: Vec<Box<dyn SecretSource>>,
}

impl CredentialLoader {
    pub fn new(sources: Vec<Box<dyn SecretSource>>) -> Self {
        Self { sources }
    }

    /// Secrets file at `secrets_path` (if readable and well-formed), then the environment.
    pub fn standard(secrets_path: &Path) -> Self {
        let mut sources: Vec<Box<dyn SecretSource>> = Vec::with_capacity(2);
        match SecretsFile::load(secrets_path) {
            Ok(file) => {
                info!(path = %file.path().display(), "Loaded secrets file");
                sources.push(Box::new(file));
            }
            Err(e) => {
                debug!(
                    path = %secrets_path.display(),
                    error = %e,
                    "Secrets file unavailable, falling back to environment"
                );
            }
        }
        sources.push(Box::new(EnvSource));
        Self::new(sources)
    }

    /// Resolve every credential and collect the ones no source provides.
    pub fn load(&self) -> LoadedCredentials {
        let mut credentials = CredentialSet::default();
        let mut missing = BTreeSet::new();

        for name in CredentialName::ALL {
            let found = self.sources.iter().find_map(|source| {
                source
                    .get(name.key())
                    .filter(|v| !v.is_empty())
                    .map(|v| (source.name(), v))
            });

            match found {
                Some((source, value)) => {
                    debug!(credential = %name, source, "Credential resolved");
                    *credentials.slot(name) = Some(SecretString::from(value));
                }
                None => {
                    missing.insert(name);
                }
            }
        }

        LoadedCredentials {
            credentials,
            missing,
        }
    }
}
