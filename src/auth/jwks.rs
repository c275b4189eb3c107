// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Security
//!
//! - JWKS is fetched via HTTPS only (enforced in config)
//! - Keys are cached with a configurable TTL
//! - An unknown `kid` forces at most one refetch per [`MIN_REFETCH_INTERVAL`]
//!
//! ## Usage
//!
//! Built in main.rs from `FIREBASE_JWKS_URL` and owned by the Firebase
//! provider. The background refresher keeps the cache warm.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};

use super::error::ProviderError;

/// Default JWKS cache TTL (5 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Minimum spacing between refetches forced by an unknown `kid`.
pub const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// JWKS manager with caching.
///
/// Fetches and caches the signing keys of the managed identity provider.
/// Clones share the same cache.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS endpoint
    jwks_url: String,
    /// Cache TTL
    cache_ttl: Duration,
    /// Cached JWKS
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// Start of the last forced refetch, successful or not
    last_forced_refetch: Arc<Mutex<Option<Instant>>>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint URL (e.g. Google's securetoken JWKS)
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::JwksFetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            last_forced_refetch: Arc::new(Mutex::new(None)),
            client,
        })
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch JWKS (with caching).
    async fn get_jwks(&self) -> Result<JwkSet, ProviderError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        match self.fetch_jwks().await {
            Ok(jwks) => {
                self.store(jwks.clone()).await;
                Ok(jwks)
            }
            Err(e) => {
                // Serve stale keys rather than failing every request
                let cache = self.cache.read().await;
                match &*cache {
                    Some(entry) => {
                        tracing::warn!(error = %e, "JWKS fetch failed; using stale keys");
                        Ok(entry.jwks.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, ProviderError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| ProviderError::JwksFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::JwksFetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| ProviderError::JwksFetch(e.to_string()))?;

        tracing::debug!(keys = jwks.keys.len(), "fetched JWKS");
        Ok(jwks)
    }

    async fn store(&self, jwks: JwkSet) {
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks,
            fetched_at: Instant::now(),
        });
    }

    /// Get a decoding key for the given key ID.
    ///
    /// A missing `kid` forces one refetch to pick up rotated keys, unless the
    /// cache or a previous forced refetch is younger than
    /// [`MIN_REFETCH_INTERVAL`]. Failed attempts count too.
    pub async fn get_decoding_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), ProviderError> {
        let jwks = self.get_jwks().await?;
        if let Some(jwk) = jwks.find(kid) {
            return jwk_to_decoding_key(jwk);
        }

        if !self.claim_forced_refetch().await {
            return Err(ProviderError::NoMatchingKey);
        }

        tracing::debug!(kid, "unknown key id; refreshing JWKS");
        self.refresh().await?;
        let jwks = self.get_jwks().await?;
        let jwk = jwks.find(kid).ok_or(ProviderError::NoMatchingKey)?;
        jwk_to_decoding_key(jwk)
    }

    /// Force refresh the JWKS cache.
    pub async fn refresh(&self) -> Result<(), ProviderError> {
        let jwks = self.fetch_jwks().await?;
        self.store(jwks).await;
        Ok(())
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        if let Some(entry) = &*cache {
            entry.fetched_at.elapsed() < self.cache_ttl
        } else {
            false
        }
    }

    async fn cache_older_than(&self, age: Duration) -> bool {
        let cache = self.cache.read().await;
        match &*cache {
            Some(entry) => entry.fetched_at.elapsed() >= age,
            None => true,
        }
    }

    /// Reserve the next forced refetch slot, stamping the attempt before it
    /// is made so concurrent misses and failing fetches share one slot.
    async fn claim_forced_refetch(&self) -> bool {
        let mut last = self.last_forced_refetch.lock().await;
        if let Some(at) = *last {
            if at.elapsed() < MIN_REFETCH_INTERVAL {
                return false;
            }
        }
        if !self.cache_older_than(MIN_REFETCH_INTERVAL).await {
            return false;
        }
        *last = Some(Instant::now());
        true
    }
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), ProviderError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| ProviderError::InvalidKey(format!("RSA components: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| ProviderError::InvalidKey(format!("EC components: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok((key, alg))
        }
        _ => Err(ProviderError::InvalidKey(
            "unsupported key type in JWKS".to_string(),
        )),
    }
}

#[cfg(test)]
impl JwksManager {
    /// Manager whose cache is pre-seeded and never expires.
    pub(crate) fn with_static_keys(jwks: JwkSet) -> Self {
        Self::with_keys_fetched_at("https://127.0.0.1:9/jwks.json", jwks, Instant::now())
    }

    /// Manager pointed at `jwks_url` whose cache was filled at `fetched_at`.
    pub(crate) fn with_keys_fetched_at(jwks_url: &str, jwks: JwkSet, fetched_at: Instant) -> Self {
        Self {
            jwks_url: jwks_url.to_string(),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            cache: Arc::new(RwLock::new(Some(CacheEntry { jwks, fetched_at }))),
            last_forced_refetch: Arc::new(Mutex::new(None)),
            client: reqwest::Client::new(),
        }
    }
}
