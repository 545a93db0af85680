//! Trusted signing keys.
//!
//! The identity provider publishes its public keys as a JWKS document. A
//! [`KeyStore`] holds the decoded set behind an `Arc` that request handlers
//! only read; [`spawn_refresh`] swaps in a freshly fetched set on a timer.

use chrono::{DateTime, Utc};
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet, PublicKeyUse};
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to fetch JWKS from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read JWKS file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JWKS document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("JWKS contains no usable RSA signing keys")]
    Empty,
}

/// Where the JWKS document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Url(String),
    File(PathBuf),
    Inline(String),
}

impl KeySource {
    pub async fn load(&self, client: &reqwest::Client) -> Result<SigningKeys, KeyError> {
        let document = match self {
            KeySource::Url(url) => {
                let fetch_err = |source| KeyError::Fetch {
                    url: url.clone(),
                    source,
                };
                client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(fetch_err)?
                    .text()
                    .await
                    .map_err(fetch_err)?
            }
            KeySource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| KeyError::Read {
                        path: path.clone(),
                        source,
                    })?
            }
            KeySource::Inline(json) => json.clone(),
        };

        SigningKeys::from_json(&document)
    }
}

/// Decoding keys indexed by `kid`.
#[derive(Clone)]
pub struct SigningKeys {
    keys: HashMap<String, DecodingKey>,
    loaded_at: DateTime<Utc>,
}

impl SigningKeys {
    pub fn from_json(document: &str) -> Result<Self, KeyError> {
        let set: JwkSet = serde_json::from_str(document)?;
        Self::from_jwks(&set)
    }

    /// Keeps RSA signature keys that carry a `kid`; skips the rest.
    pub fn from_jwks(set: &JwkSet) -> Result<Self, KeyError> {
        let mut keys = HashMap::new();

        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                tracing::debug!("Skipping JWK without kid");
                continue;
            };
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                tracing::debug!(kid = %kid, "Skipping encryption key");
                continue;
            }
            if !matches!(jwk.algorithm, AlgorithmParameters::RSA(_)) {
                tracing::debug!(kid = %kid, "Skipping non-RSA key");
                continue;
            }
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => {
                    tracing::warn!(kid = %kid, error = %e, "Skipping undecodable JWK");
                }
            }
        }

        if keys.is_empty() {
            return Err(KeyError::Empty);
        }

        Ok(Self {
            keys,
            loaded_at: Utc::now(),
        })
    }

    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Current key set. Readers take a cheap `Arc` snapshot; only the refresh
/// task writes.
pub struct KeyStore {
    current: RwLock<Arc<SigningKeys>>,
}

impl KeyStore {
    pub fn new(keys: SigningKeys) -> Self {
        Self {
            current: RwLock::new(Arc::new(keys)),
        }
    }

    pub fn current(&self) -> Arc<SigningKeys> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, keys: SigningKeys) {
        let keys = Arc::new(keys);
        match self.current.write() {
            Ok(mut guard) => *guard = keys,
            Err(poisoned) => *poisoned.into_inner() = keys,
        }
    }
}

/// Reloads `source` into `store` every `every`. A failed reload keeps the
/// previous keys.
pub fn spawn_refresh(
    store: Arc<KeyStore>,
    source: KeySource,
    client: reqwest::Client,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; startup already loaded.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match source.load(&client).await {
                Ok(keys) => {
                    tracing::info!(keys = keys.len(), "Signing keys refreshed");
                    store.replace(keys);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Signing key refresh failed; keeping previous keys");
                }
            }
        }
    })
}
