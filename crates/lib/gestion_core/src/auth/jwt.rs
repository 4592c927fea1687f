//! Access token inspection.
//!
//! The client cannot verify the server's signature; it only reads the claims
//! to report when the current access token expires. Nothing here decides
//! whether a token is accepted.

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;

use crate::{CoreError, CoreResult};

/// Claims of interest in an access token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessTokenClaims {
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Subject user id, when the issuer includes it.
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl AccessTokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// Read the claims of an access token without verifying its signature.
pub fn inspect_access_token(token: &str) -> CoreResult<AccessTokenClaims> {
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| CoreError::Token(format!("jwt header: {e}")))?;
    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    decode::<AccessTokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| CoreError::Token(format!("jwt decode: {e}")))
}
