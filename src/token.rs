use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::ApiError;

/// Seconds an issued token stays valid. Verification is stateless, so a token
/// cannot be revoked before this elapses; the short window is the trade-off
/// for O(1) request authentication with no session store.
pub const TOKEN_TTL_SECS: u64 = 3600;

/// Claims
///
/// The signed payload embedded in every identity token: who the token was
/// issued for and until when it may be accepted.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id.
    pub sub: Uuid,
    /// The user's email at issuance time.
    pub email: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: usize,
    /// Absolute expiry, seconds since the Unix epoch.
    pub exp: usize,
}

/// TokenService
///
/// Issues and verifies signed, time-boxed identity tokens. Built once at
/// startup from the configured secret and shared immutably; the secret never
/// appears in logs or serialized state.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, TOKEN_TTL_SECS)
    }

    /// Constructor with an explicit TTL, used by tests that need to observe
    /// expiry without waiting an hour.
    pub fn with_ttl(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    /// Produces a signed token binding `user_id` and `email`, expiring
    /// exactly `ttl_secs` after issuance.
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, ApiError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ApiError::Internal(format!("system clock error: {e}")))?
            .as_secs();

        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now as usize,
            exp: (now + self.ttl_secs) as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Verifies a presented token. Returns `None` when the token is
    /// malformed, wrongly signed or expired; that simply means "anonymous".
    /// This is an expected outcome, not an error.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // No leeway: a token is valid until exactly iat + TTL and not after.
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .ok()
    }
}
