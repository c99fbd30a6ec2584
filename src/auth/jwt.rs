use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Issue claims for a subject. Both timestamps derive from a single
    /// `Utc::now()` read so issuance and expiry can never disagree.
    pub fn new(subject: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Encode a signed bearer token for `subject`, expiring after `ttl`. The TTL
/// comes from configuration, never from request input.
pub fn encode_token(subject: &str, ttl: Duration, secret: &str) -> Result<String, AuthError> {
    let claims = Claims::new(subject, ttl);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal(format!("JWT encode failed: {e}")))
}

/// Decode and verify a bearer token. Signature verification happens before
/// any claim is interpreted; an expired-but-genuine token is reported as
/// `TokenExpired`, everything else (tampered, foreign key, garbage) as
/// `TokenInvalid`.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    // No leeway: a token with a 1s TTL is dead at 1s, not 61s.
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    })
}

/// Expiry check for request-filtering middleware: `Ok(false)` for a live
/// token, `Ok(true)` for an expired one, `Err(TokenInvalid)` for a forgery.
pub fn is_expired(token: &str, secret: &str) -> Result<bool, AuthError> {
    match decode_token(token, secret) {
        Ok(_) => Ok(false),
        Err(AuthError::TokenExpired) => Ok(true),
        Err(e) => Err(e),
    }
}
