//! Bearer-token verification.
//!
//! Token issuance is external: whoever holds the shared secret (the login
//! service, or the `skillwise token` command during development) mints
//! tokens of the form `owner_id.tag`, where `tag` is the lowercase-hex
//! HMAC-SHA256 of the owner id under the secret. This module only verifies
//! that shape — it never issues tokens at request time and holds no user
//! database.
//!
//! Verification is constant-time via `Mac::verify_slice`, so forged tags
//! cannot be probed byte by byte. Handlers treat any verification failure
//! as a hard precondition failure: the request body is never processed.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies (and, for tooling, issues) HMAC-signed bearer tokens.
pub struct TokenVerifier {
    secret: Vec<u8>,
}

impl TokenVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Reads the signing secret from the named environment variable.
    pub fn from_env(var: &str) -> anyhow::Result<Self> {
        let secret =
            std::env::var(var).map_err(|_| anyhow::anyhow!("{} environment variable not set", var))?;
        if secret.is_empty() {
            anyhow::bail!("{} must not be empty", var);
        }
        Ok(Self::new(secret.into_bytes()))
    }

    fn tag(&self, owner_id: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(owner_id.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Mints a token for `owner_id`. Used by the operator CLI and tests.
    pub fn issue(&self, owner_id: &str) -> String {
        format!("{}.{}", owner_id, hex::encode(self.tag(owner_id)))
    }

    /// Checks a bearer token and returns the verified owner id.
    pub fn verify(&self, token: &str) -> Result<String, ApiError> {
        // Owner ids may contain dots; the tag is everything after the last one.
        let (owner_id, tag_hex) = token
            .rsplit_once('.')
            .ok_or_else(|| ApiError::Unauthorized("malformed token".to_string()))?;
        if owner_id.is_empty() {
            return Err(ApiError::Unauthorized("malformed token".to_string()));
        }
        let tag = hex::decode(tag_hex)
            .map_err(|_| ApiError::Unauthorized("malformed token".to_string()))?;

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(owner_id.as_bytes());
        mac.verify_slice(&tag)
            .map_err(|_| ApiError::Unauthorized("invalid token".to_string()))?;

        Ok(owner_id.to_string())
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, ApiError> {
    let header =
        header.ok_or_else(|| ApiError::Unauthorized("no token provided".to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("no token provided".to_string()))?;
    if token.trim().is_empty() {
        return Err(ApiError::Unauthorized("empty token".to_string()));
    }
    Ok(token)
}
