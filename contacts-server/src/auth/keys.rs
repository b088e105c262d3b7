//! Resolution of token signing keys from the authority's published metadata

use crate::config::AuthConfig;
use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::DecodingKey;
use log::{debug, info, warn};
use moka::future::Cache as MokaCache;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;

/// Unknown key ids force a JWKS refetch at most this often
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeySourceError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("Signing key '{0}' was not found")]
    KeyNotFound(String),
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
    #[error("Invalid authority URL: {0}")]
    InvalidAuthority(String),
}

/// Provider of the public keys that access tokens are verified against
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Decoding key for the given key id
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeySourceError>;

    /// Checks that at least one signing key can currently be resolved
    async fn check(&self) -> Result<(), KeySourceError>;
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

#[derive(Debug)]
struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Keys fetched over HTTP via the authority's discovery document.
///
/// Both the discovery document and the key set are cached for the configured
/// TTL; concurrent misses share a single fetch. Forced refreshes for unknown
/// key ids are serialized so that one rotation costs one refetch.
#[derive(Clone)]
pub struct RemoteJwks {
    client: reqwest::Client,
    discovery_url: Url,
    discovery: MokaCache<String, Arc<String>>,
    jwks: MokaCache<String, Arc<CachedJwks>>,
    refresh_interval: Duration,
    refresh_lock: Arc<Mutex<()>>,
}

impl RemoteJwks {
    pub fn new(config: &AuthConfig) -> Result<Self, KeySourceError> {
        let discovery_url = http_url(&config.discovery_url()).map_err(|reason| {
            KeySourceError::InvalidAuthority(format!("{}: {reason}", config.authority))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(config.http_timeout())
            .build()
            .map_err(|e| KeySourceError::Client(e.to_string()))?;

        Ok(Self {
            client,
            discovery_url,
            discovery: MokaCache::builder()
                .max_capacity(16)
                .time_to_live(config.jwks_cache_ttl())
                .build(),
            jwks: MokaCache::builder()
                .max_capacity(16)
                .time_to_live(config.jwks_cache_ttl())
                .build(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    #[cfg(test)]
    fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    async fn jwks_uri(&self) -> Result<Arc<String>, KeySourceError> {
        let client = self.client.clone();
        let url = self.discovery_url.to_string();
        self.discovery
            .try_get_with(url.clone(), async move {
                let document: DiscoveryDocument = fetch_json(&client, &url).await?;
                let jwks_uri = http_url(&document.jwks_uri).map_err(|reason| {
                    KeySourceError::Fetch {
                        url: url.clone(),
                        reason: format!("invalid jwks_uri '{}': {reason}", document.jwks_uri),
                    }
                })?;
                debug!("Resolved jwks_uri {} from {}", jwks_uri, url);
                Ok::<_, KeySourceError>(Arc::new(jwks_uri.to_string()))
            })
            .await
            .map_err(|e: Arc<KeySourceError>| (*e).clone())
    }

    async fn key_set(&self) -> Result<Arc<CachedJwks>, KeySourceError> {
        let jwks_uri = self.jwks_uri().await?;
        let client = self.client.clone();
        let url = jwks_uri.to_string();
        self.jwks
            .try_get_with(jwks_uri.to_string(), async move {
                let keys: JwkSet = fetch_json(&client, &url).await?;
                info!("Fetched {} signing key(s) from {}", keys.keys.len(), url);
                Ok::<_, KeySourceError>(Arc::new(CachedJwks {
                    keys,
                    fetched_at: Instant::now(),
                }))
            })
            .await
            .map_err(|e: Arc<KeySourceError>| (*e).clone())
    }

    /// Drops the cached key set so the next lookup refetches it
    async fn invalidate_key_set(&self) -> Result<(), KeySourceError> {
        let jwks_uri = self.jwks_uri().await?;
        self.jwks.invalidate(jwks_uri.as_str()).await;
        Ok(())
    }
}

#[async_trait]
impl KeySource for RemoteJwks {
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeySourceError> {
        let cached = self.key_set().await?;
        if let Some(jwk) = find_jwk(&cached.keys, kid) {
            return decoding_key_from_jwk(jwk);
        }

        let _refresh = self.refresh_lock.lock().await;

        // A refresh may have completed while waiting for the lock
        let cached = self.key_set().await?;
        if let Some(jwk) = find_jwk(&cached.keys, kid) {
            return decoding_key_from_jwk(jwk);
        }
        if cached.fetched_at.elapsed() < self.refresh_interval {
            return Err(KeySourceError::KeyNotFound(kid.to_string()));
        }

        // The authority may have rotated its keys since the last fetch
        debug!("Key id {} not in cached key set, refreshing", kid);
        self.invalidate_key_set().await?;
        let refreshed = self.key_set().await?;
        find_jwk(&refreshed.keys, kid)
            .ok_or_else(|| KeySourceError::KeyNotFound(kid.to_string()))
            .and_then(decoding_key_from_jwk)
    }

    async fn check(&self) -> Result<(), KeySourceError> {
        let cached = self.key_set().await?;
        if cached.keys.keys.iter().any(|jwk| decoding_key_from_jwk(jwk).is_ok()) {
            Ok(())
        } else {
            Err(KeySourceError::InvalidKey(
                "the key set holds no usable Ed25519 key".to_string(),
            ))
        }
    }
}

async fn fetch_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, KeySourceError> {
    let fetch_error = |reason: String| KeySourceError::Fetch {
        url: url.to_string(),
        reason,
    };

    let response = client.get(url).send().await.map_err(|e| {
        warn!("Request to {} failed: {}", url, e);
        fetch_error(e.to_string())
    })?;

    if !response.status().is_success() {
        warn!("Request to {} returned status {}", url, response.status());
        return Err(fetch_error(format!("unexpected status {}", response.status())));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| fetch_error(format!("invalid response body: {e}")))
}

/// Parses an absolute http(s) URL
fn http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(format!("unsupported scheme '{scheme}'")),
    }
}

fn find_jwk<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|key| key.common.key_id.as_deref() == Some(kid))
}

/// Accepts only Ed25519 octet key pairs
fn decoding_key_from_jwk(jwk: &Jwk) -> Result<DecodingKey, KeySourceError> {
    if let Some(alg) = jwk.common.key_algorithm {
        if !matches!(alg, KeyAlgorithm::EdDSA) {
            return Err(KeySourceError::InvalidKey(format!(
                "unexpected key algorithm {alg:?}"
            )));
        }
    }

    match &jwk.algorithm {
        AlgorithmParameters::OctetKeyPair(params)
            if matches!(params.curve, EllipticCurve::Ed25519) =>
        {
            DecodingKey::from_ed_components(&params.x)
                .map_err(|e| KeySourceError::InvalidKey(e.to_string()))
        }
        _ => Err(KeySourceError::InvalidKey(
            "expected an Ed25519 OKP key".to_string(),
        )),
    }
}

/// Fixed key set, for exercising the gate without HTTP
#[cfg(test)]
pub struct StaticKeySource {
    keys: JwkSet,
}

#[cfg(test)]
impl StaticKeySource {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }
}

#[cfg(test)]
#[async_trait]
impl KeySource for StaticKeySource {
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeySourceError> {
        find_jwk(&self.keys, kid)
            .ok_or_else(|| KeySourceError::KeyNotFound(kid.to_string()))
            .and_then(decoding_key_from_jwk)
    }

    async fn check(&self) -> Result<(), KeySourceError> {
        Ok(())
    }
}
