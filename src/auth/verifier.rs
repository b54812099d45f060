//! JWT verification against pinned public keys.
//!
//! Tokens are accepted only when the RS256 signature checks out
//! against the supplied key AND the essential claims (issuer,
//! audience, subject) match AND the nonce claim equals the nonce
//! generated for this exchange. The nonce check is what prevents a
//! captured response from being replayed to re-assert a session.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::api::{Error, Result};
use crate::models::Tenant;

/// Claims decoded from a verified platform token.
#[derive(Debug, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    #[serde(default)]
    pub nonce: Option<String>,
    /// Namespaced custom claim; literal form of
    /// `TOKEN_NAMESPACE + "tenants"`, present in identity tokens only.
    #[serde(default, rename = "https://www.onekey.com/tenants")]
    pub tenants: Option<Vec<Tenant>>,
}

/// Verify `raw_token` and return its decoded claims.
///
/// `nonce` must be the value generated for the request that produced
/// this token; `expected_subject` is the email the session was opened
/// for. Any failure - bad signature, malformed token, claim mismatch,
/// expired timestamps, nonce mismatch - is reported as
/// [`Error::TokenInvalid`]. A token that is not correctly signed is
/// never accepted, however well its claims match.
pub fn verify_token(
    nonce: &str,
    expected_subject: &str,
    raw_token: &str,
    public_key_pem: &[u8],
    expected_issuer: &str,
    expected_audience: &str,
) -> Result<TokenClaims> {
    let key = DecodingKey::from_rsa_pem(public_key_pem)
        .map_err(|e| Error::TokenInvalid(format!("invalid public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[expected_issuer]);
    validation.set_audience(&[expected_audience]);
    validation.sub = Some(expected_subject.to_string());
    // exp/nbf stay optional but are enforced when present.
    validation.set_required_spec_claims(&["iss", "aud", "sub"]);

    let data = decode::<TokenClaims>(raw_token, &key, &validation)
        .map_err(|e| Error::TokenInvalid(e.to_string()))?;

    match data.claims.nonce.as_deref() {
        Some(candidate) if candidate == nonce => Ok(data.claims),
        Some(_) => Err(Error::TokenInvalid("nonce mismatch".into())),
        None => Err(Error::TokenInvalid("missing nonce claim".into())),
    }
}
