//! Client-side decoding of JWT-shaped access tokens.
//!
//! The signature is not verified here; the backend does that on every
//! request. The payload only tells the dashboard who is logged in and when
//! the token stops being usable.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::AuthError;
use crate::models::{BackendUser, Identity, UserId};

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
    #[serde(default)]
    sub: Option<UserId>,
    #[serde(default)]
    user: Option<BackendUser>,
    #[serde(flatten)]
    flat: BackendUser,
}

fn decode_claims(token: &str) -> Result<Claims, AuthError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(_signature), None) if !header.is_empty() => payload,
        _ => {
            return Err(AuthError::MalformedCredential(
                "token is not header.payload.signature".to_string(),
            ))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::MalformedCredential(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::MalformedCredential(format!("payload is not a claims object: {}", e)))
}

fn expiry_of(claims: &Claims) -> Result<DateTime<Utc>, AuthError> {
    let exp = claims
        .exp
        .ok_or_else(|| AuthError::MalformedCredential("missing exp claim".to_string()))?;
    DateTime::from_timestamp(exp, 0)
        .ok_or_else(|| AuthError::MalformedCredential(format!("exp {} out of range", exp)))
}

/// Expiry instant carried by the token.
pub fn expiry(token: &str) -> Result<DateTime<Utc>, AuthError> {
    expiry_of(&decode_claims(token)?)
}

/// Decode the identity carried by `token`.
///
/// The account is taken from the embedded `user` claim, else from flat
/// claims (`sub`, `email`, `role`, ...). `fallback` supplies the account when
/// the token has none, e.g. the `user`/`admin` object of a login response.
/// Expiry is not checked here.
pub fn decode_identity(token: &str, fallback: Option<BackendUser>) -> Result<Identity, AuthError> {
    let claims = decode_claims(token)?;
    let expires_at = expiry_of(&claims)?;

    let subject = claims.sub;
    let with_subject = |mut account: BackendUser| {
        if account.id.is_none() {
            account.id = subject.clone();
        }
        account
    };

    let account = match claims.user.filter(|u| !u.is_empty()) {
        Some(user) => with_subject(user),
        None if claims.flat.email.is_some() => with_subject(claims.flat),
        None => match fallback {
            Some(account) => with_subject(account),
            None => with_subject(claims.flat),
        },
    };

    account.into_identity(expires_at)
}
