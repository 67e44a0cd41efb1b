use sha2::{Digest, Sha256};

use postmort_core::{AnonymizationConfig, AnonymizationMode, ConfigError, Record};

/// Token for records whose author was already missing at collection time.
const MISSING_AUTHOR_TOKEN: &str = "anonymous";

/// Pseudonym length in hex chars (64 bits of the digest).
const TOKEN_LEN: usize = 16;

/// One-way pseudonymizer for author identifiers.
///
/// The same `(author, salt)` pair always yields the same token, so
/// per-author analyses survive anonymization; nothing maps tokens back.
pub struct Anonymizer {
    salt: String,
}

impl Anonymizer {
    /// Builds an anonymizer with an explicit salt. Mostly for tests and for
    /// callers that manage salt storage themselves.
    #[must_use]
    pub fn with_salt(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    /// Builds an anonymizer from config, resolving the salt from the
    /// process environment.
    ///
    /// # Errors
    ///
    /// In `stable` mode, fails when the salt env var is unset or empty.
    pub fn from_config(config: &AnonymizationConfig) -> Result<Self, ConfigError> {
        Self::from_config_with(config, |var| std::env::var(var))
    }

    /// Like [`Anonymizer::from_config`], but with an injected env lookup so
    /// tests can use a plain map instead of mutating the process
    /// environment.
    ///
    /// # Errors
    ///
    /// In `stable` mode, fails when the lookup cannot produce a non-empty
    /// salt.
    pub fn from_config_with<F>(config: &AnonymizationConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let salt = match config.mode {
            AnonymizationMode::Stable => match lookup(&config.salt_env) {
                Ok(salt) if !salt.is_empty() => salt,
                _ => return Err(ConfigError::MissingEnvVar(config.salt_env.clone())),
            },
            AnonymizationMode::PerRun => format!("{:032x}", rand::random::<u128>()),
        };
        Ok(Self { salt })
    }

    /// Pseudonym for one author id.
    #[must_use]
    pub fn token(&self, author_id: &str) -> String {
        if author_id.is_empty() {
            return MISSING_AUTHOR_TOKEN.to_string();
        }
        let digest = Sha256::digest(format!("{author_id}\x00{}", self.salt).as_bytes());
        format!("{digest:x}")[..TOKEN_LEN].to_string()
    }

    /// Replaces the record's author id with its pseudonym.
    #[must_use]
    pub fn anonymize(&self, mut record: Record) -> Record {
        record.author_id = self.token(&record.author_id);
        record
    }
}

impl std::fmt::Debug for Anonymizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anonymizer")
            .field("salt", &"[redacted]")
            .finish()
    }
}
