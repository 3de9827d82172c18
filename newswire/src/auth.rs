use chrono::{DateTime, Duration, TimeZone, Utc};
use common::AuthConfig;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AuthError;

/// Used only when no secret is configured. Anyone who knows it can mint tokens.
const DEV_SECRET: &str = "newswire-dev-secret";

/// JWT claims we encode (subject = user id)
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// A verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies HS256 tokens signed with a shared secret.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    insecure: bool,
}

impl TokenAuthority {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
            insecure: false,
        }
    }

    /// Build from the env var named in the config, falling back to the built-in
    /// development secret with a warning.
    pub fn from_config(config: &AuthConfig) -> Self {
        match common::secret_from_env(&config.secret_env) {
            Some(secret) => Self::new(&secret, config.token_ttl_hours),
            None => {
                warn!(
                    env = %config.secret_env,
                    "signing secret not set; using the built-in development secret. \
                     Tokens are forgeable, do not deploy like this"
                );
                let mut authority = Self::new(DEV_SECRET, config.token_ttl_hours);
                authority.insecure = true;
                authority
            }
        }
    }

    /// True when signing with the built-in development secret.
    pub fn is_insecure(&self) -> bool {
        self.insecure
    }

    /// Create a signed token for `user_id` expiring after the configured TTL (24h by default).
    pub fn issue(&self, user_id: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        self.issue_with_times(user_id, now, now + self.ttl)
    }

    /// Create a token with an explicit expiry.
    pub fn issue_expiring_at(
        &self,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        self.issue_with_times(user_id, Utc::now(), expires_at)
    }

    fn issue_with_times(
        &self,
        user_id: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<AuthToken, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            }
        })?;

        let claims = data.claims;
        let issued_at = Utc.timestamp_opt(claims.iat, 0).single().ok_or(AuthError::Invalid)?;
        let expires_at = Utc.timestamp_opt(claims.exp, 0).single().ok_or(AuthError::Invalid)?;

        Ok(AuthToken {
            user_id: claims.sub,
            issued_at,
            expires_at,
        })
    }
}
