// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token verification.

use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Identity carried by a valid Firebase ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    /// Firebase has confirmed the caller owns `email`.
    pub email_verified: bool,
    /// `admin: true` custom claim
    pub admin_claim: bool,
}

/// Token verification error categories.
#[derive(Debug, Clone)]
pub enum TokenError {
    /// The token is malformed, expired, or issued for another project.
    Invalid(String),
    /// Signing keys could not be fetched.
    Transient(String),
}

#[derive(Clone)]
enum VerifierMode {
    Firebase,
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for ID tokens issued by Firebase Authentication.
pub struct FirebaseTokenVerifier {
    http_client: reqwest::Client,
    project_id: String,
    expected_issuer: String,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl FirebaseTokenVerifier {
    /// Production verifier that fetches and caches Google's signing keys.
    pub fn new(project_id: &str) -> anyhow::Result<Self> {
        let verifier = Self::with_mode(project_id, VerifierMode::Firebase)?;

        tracing::info!(
            project_id = %verifier.project_id,
            issuer = %verifier.expected_issuer,
            "Initialized Firebase ID token verifier"
        );
        Ok(verifier)
    }

    /// Verifier with a static RSA public key, for local and integration tests.
    pub fn new_with_static_key(
        project_id: &str,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static key kid must not be empty");
        }

        Self::with_mode(
            project_id,
            VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
        )
    }

    fn with_mode(project_id: &str, mode: VerifierMode) -> anyhow::Result<Self> {
        if project_id.trim().is_empty() {
            anyhow::bail!("Firebase project ID must not be empty");
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building JWKS HTTP client")?;

        Ok(Self {
            http_client,
            project_id: project_id.to_string(),
            expected_issuer: format!("https://securetoken.google.com/{project_id}"),
            mode,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify a raw ID token.
    pub async fn verify(&self, token: &str) -> Result<VerifiedIdentity, TokenError> {
        let header = decode_header(token)
            .map_err(|e| TokenError::Invalid(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(TokenError::Invalid(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| TokenError::Invalid("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.expected_issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<FirebaseClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| TokenError::Invalid(format!("JWT validation failed: {e}")))?
            .claims;

        if claims.sub.is_empty() {
            return Err(TokenError::Invalid("empty sub claim".to_string()));
        }
        validate_iat(claims.iat)?;

        tracing::debug!(uid = %claims.sub, exp = claims.exp, "Verified Firebase ID token");

        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
            admin_claim: claims.admin.unwrap_or(false),
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, TokenError> {
        if let VerifierMode::StaticKey {
            kid: static_kid,
            decoding_key,
        } = &self.mode
        {
            if kid == static_kid {
                return Ok(decoding_key.clone());
            }
            return Err(TokenError::Invalid(format!(
                "unknown JWT kid for static verifier: {kid}"
            )));
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        // Keys rotate; a miss on a fresh cache forces one more fetch.
        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(TokenError::Invalid(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), TokenError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(jwks_uri = JWKS_URL, "Refreshing Firebase JWKS cache");

        let response = self
            .http_client
            .get(JWKS_URL)
            .send()
            .await
            .map_err(|e| TokenError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TokenError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| TokenError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_keys(jwks);
        if keys_by_kid.is_empty() {
            return Err(TokenError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Firebase JWKS cache refreshed");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    exp: usize,
    iat: Option<usize>,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    admin: Option<bool>,
}

/// RS256 signing keys by kid; anything else is skipped.
fn usable_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }
        if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

fn validate_iat(iat: Option<usize>) -> Result<(), TokenError> {
    let Some(iat) = iat else {
        return Err(TokenError::Invalid("missing iat claim".to_string()));
    };

    if iat as u64 > now_unix_secs() + CLOCK_SKEW_SECS {
        return Err(TokenError::Invalid("iat claim is in the future".to_string()));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|raw| raw.trim_matches('"').parse::<u64>().ok())
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cache_control_max_age_valid() {
        assert_eq!(
            parse_cache_control_max_age("public, max-age=19845, must-revalidate, no-transform"),
            Some(19845)
        );
        assert_eq!(parse_cache_control_max_age("max-age=\"120\""), Some(120));
    }

    #[test]
    fn parse_cache_control_max_age_invalid() {
        assert_eq!(parse_cache_control_max_age("public, immutable"), None);
        assert_eq!(parse_cache_control_max_age("max-age=abc"), None);
        assert_eq!(parse_cache_control_max_age(""), None);
    }

    #[test]
    fn rejects_empty_project() {
        assert!(FirebaseTokenVerifier::new("").is_err());
    }

    #[test]
    fn skips_non_signing_keys() {
        let jwks: Jwks = serde_json::from_value(serde_json::json!({
            "keys": [
                { "kid": "enc", "kty": "RSA", "use": "enc", "n": "AQAB", "e": "AQAB" },
                { "kid": "ec", "kty": "EC", "n": "AQAB", "e": "AQAB" },
                { "kid": "", "kty": "RSA", "n": "AQAB", "e": "AQAB" }
            ]
        }))
        .unwrap();
        assert!(usable_keys(jwks).is_empty());
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let verifier = FirebaseTokenVerifier::new_with_static_key(
            "test-project",
            "kid-1",
            DecodingKey::from_rsa_components("AQAB", "AQAB").unwrap(),
        )
        .unwrap();

        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(TokenError::Invalid(_))
        ));
    }
}
