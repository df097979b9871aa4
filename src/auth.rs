//! Firebase ID token validation
//!
//! Tokens are RS256 JWTs issued by `securetoken.google.com`. Public keys are
//! fetched from Google's JWKS endpoint and cached for an hour.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::{Error, Result};

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Claims extracted from a Firebase ID token
#[derive(Debug, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    pub exp: u64,
    pub iss: Option<String>,
}

struct CachedJwks {
    keys: Vec<jsonwebtoken::jwk::Jwk>,
    expires_at: Instant,
}

/// Validates Firebase ID tokens against Google's published keys
pub struct TokenVerifier {
    project_id: String,
    client: reqwest::Client,
    keys: Arc<RwLock<Option<CachedJwks>>>,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(project_id: String) -> Self {
        Self {
            project_id,
            client: reqwest::Client::new(),
            keys: Arc::new(RwLock::new(None)),
        }
    }

    /// Validate a token and return the authenticated user id
    ///
    /// # Errors
    ///
    /// Returns `Error::Auth` if the token is malformed, expired, signed by an
    /// unknown key, or issued for a different project.
    pub async fn verify(&self, token: &str) -> Result<String> {
        let claims = self.validate(token).await?;
        Ok(claims.sub)
    }

    /// Validate a token and return its claims
    ///
    /// # Errors
    ///
    /// Returns `Error::Auth` when validation fails for any reason.
    pub async fn validate(&self, token: &str) -> Result<IdTokenClaims> {
        let jwks = self.get_jwks().await?;

        let header =
            decode_header(token).map_err(|e| Error::Auth(format!("invalid JWT header: {e}")))?;
        tracing::debug!(
            alg = ?header.alg,
            kid = ?header.kid,
            jwks_count = jwks.len(),
            "validating ID token"
        );

        let expected_issuer = format!("https://securetoken.google.com/{}", self.project_id);
        let mut last_error = None;

        // Try each key until one works (key rotation support)
        for jwk in &jwks {
            // Prefer the key matching the header's kid when both are present
            if let (Some(kid), Some(jwk_kid)) = (&header.kid, &jwk.common.key_id) {
                if kid != jwk_kid {
                    continue;
                }
            }

            let key = match DecodingKey::from_jwk(jwk) {
                Ok(k) => k,
                Err(e) => {
                    tracing::debug!(
                        jwk_kid = ?jwk.common.key_id,
                        error = %e,
                        "skipping JWK: failed to create decoding key"
                    );
                    continue;
                }
            };

            let mut validation = Validation::new(header.alg);
            validation.validate_exp = true;
            validation.set_audience(&[&self.project_id]);
            validation.set_issuer(&[&expected_issuer]);

            match decode::<IdTokenClaims>(token, &key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => {
                    tracing::debug!(
                        jwk_kid = ?jwk.common.key_id,
                        error = %e,
                        "JWK did not validate token"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(Error::Auth(format!(
            "no valid key found for ID token (kid={:?}, last_error={last_error:?})",
            header.kid,
        )))
    }

    /// Fetch the secure-token JWKS (cached for 1 hour)
    async fn get_jwks(&self) -> Result<Vec<jsonwebtoken::jwk::Jwk>> {
        {
            let cache = self.keys.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.keys.clone());
                }
            }
        }

        let response = self
            .client
            .get(JWKS_URL)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("failed to fetch JWKS: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Auth(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        let jwk_set: jsonwebtoken::jwk::JwkSet = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("invalid JWKS response: {e}")))?;

        tracing::debug!(key_count = jwk_set.keys.len(), "fetched JWKS");

        let keys = jwk_set.keys;
        let mut cache = self.keys.write().await;
        *cache = Some(CachedJwks {
            keys: keys.clone(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        });

        Ok(keys)
    }
}
