//! Best-effort client identity resolution.
//!
//! The identity keys server-side rate limiting. It is looked up from a public
//! IP echo service and is trivially spoofable; callers only rely on getting
//! *some* string back. [`resolve_or_fallback`] never fails: lookup errors,
//! blank answers and timeouts all produce a generated `demo-xxxxxxxx` id.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::SessionError;

/// Public IP echo endpoint.
pub const IPIFY_ENDPOINT: &str = "https://api.ipify.org?format=json";

/// Default budget for an identity lookup.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

const FALLBACK_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Source of a client identity string.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self) -> Result<String, SessionError>;
}

/// Resolver that always answers with a preconfigured identity.
#[derive(Debug, Clone)]
pub struct FixedIdentity(pub String);

#[async_trait]
impl IdentityResolver for FixedIdentity {
    async fn resolve(&self) -> Result<String, SessionError> {
        Ok(self.0.clone())
    }
}

#[derive(Deserialize)]
struct IpifyResponse {
    ip: String,
}

/// Looks up the caller's public IP via ipify.
#[derive(Debug, Clone)]
pub struct IpifyResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl IpifyResolver {
    pub fn new() -> Self {
        Self::with_endpoint(IPIFY_ENDPOINT)
    }

    /// Use a compatible service at `endpoint` (must answer `{"ip": "..."}`).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for IpifyResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityResolver for IpifyResolver {
    async fn resolve(&self) -> Result<String, SessionError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SessionError::Identity(e.to_string()))?;
        let body: IpifyResponse = response
            .json()
            .await
            .map_err(|e| SessionError::Identity(e.to_string()))?;
        Ok(body.ip)
    }
}

/// Generate a pseudo-identity of the form `demo-` followed by eight base-36 characters.
pub fn fallback_identity() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| FALLBACK_ALPHABET[rng.gen_range(0..FALLBACK_ALPHABET.len())] as char)
        .collect();
    format!("demo-{suffix}")
}

/// Resolve an identity, substituting [`fallback_identity`] on any failure.
pub async fn resolve_or_fallback(resolver: &dyn IdentityResolver, timeout: Duration) -> String {
    match tokio::time::timeout(timeout, resolver.resolve()).await {
        Ok(Ok(identity)) if !identity.trim().is_empty() => {
            debug!(%identity, "identity: resolved");
            identity.trim().to_string()
        }
        Ok(Ok(_)) => {
            warn!("identity: resolver returned a blank identity, using fallback");
            fallback_identity()
        }
        Ok(Err(e)) => {
            warn!(error = %e, "identity: lookup failed, using fallback");
            fallback_identity()
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "identity: lookup timed out, using fallback");
            fallback_identity()
        }
    }
}
