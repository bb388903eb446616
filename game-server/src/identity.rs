//! C2 — Identity Gate. Verifies a bearer token's signature, issuer, and
//! expiration, and returns the immutable identity claim that every other
//! component treats as the single source of truth for "who is this".
//!
//! The core never accepts a userId supplied in a request body for
//! authorisation purposes — it is always the `sub` claim out of a token
//! that passed verification here.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use moka::Expiry;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AppError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    exp: u64,
}

struct PerTokenExpiry;

impl Expiry<String, (Identity, u64)> for PerTokenExpiry {
    fn expire_after_create(&self, _key: &String, value: &(Identity, u64), _created_at: Instant) -> Option<Duration> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let (_, exp) = value;
        Some(Duration::from_secs(exp.saturating_sub(now)))
    }
}

pub struct IdentityGate {
    decoding_key: DecodingKey,
    validation: Validation,
    cache: Cache<String, (Identity, u64)>,
}

impl IdentityGate {
    /// `signing_secret` stands in for the identity provider's verification
    /// key (HS256 shared secret). Issuer/audience checks are enforced
    /// against the configured user pool / client id.
    pub fn new(config: &Config, signing_secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if !config.user_pool_id.is_empty() {
            validation.set_issuer(&[config.user_pool_id.clone()]);
        }
        if !config.user_pool_client_id.is_empty() {
            validation.set_audience(&[config.user_pool_client_id.clone()]);
        } else {
            validation.validate_aud = false;
        }

        let cache = Cache::builder()
            .expire_after(PerTokenExpiry)
            .max_capacity(10_000)
            .build();

        IdentityGate {
            decoding_key: DecodingKey::from_secret(signing_secret),
            validation,
            cache,
        }
    }

    pub async fn verify(&self, token: &str) -> Result<Identity, AppError> {
        if let Some((identity, _)) = self.cache.get(token).await {
            return Ok(identity);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::AuthInvalid(e.to_string()))?;

        let identity = Identity {
            user_id: data.claims.sub,
            email: data.claims.email,
            display_name: data.claims.name,
        };

        self.cache.insert(token.to_string(), (identity.clone(), data.claims.exp)).await;
        Ok(identity)
    }
}

pub type SharedIdentityGate = Arc<IdentityGate>;
