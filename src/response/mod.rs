//! Token endpoint response parsing.
//!
//! Providers answer either with a JSON object or with an
//! `application/x-www-form-urlencoded` body (GitHub's default). Field lookup
//! tries JSON first and falls back to query-string parsing of the same body.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::error::OAuthError;
use crate::token::TokenSnapshot;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const TOKEN_TYPE_KEY: &str = "token_type";
pub const EXPIRES_IN_KEY: &str = "expires_in";

/// Lifetime in seconds applied when the server omits `expires_in` (RFC 6749 §4.2.2).
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Look up a field in a token response body.
///
/// Returns `None` for absent, null or empty values. Numbers and booleans are
/// rendered as strings so `"expires_in": 3600` and `"expires_in": "3600"`
/// read the same.
pub fn parse_field(content: &str, key: &str) -> Option<String> {
    let value = match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => match map.get(key)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        },
        _ => url::form_urlencoded::parse(content.trim().as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())?,
    };
    (!value.is_empty()).then_some(value)
}

/// Compute the expiry instant for an `expires_in` value.
///
/// Anything that is not a positive whole number of seconds falls back to
/// [`DEFAULT_TOKEN_LIFETIME_SECS`]. Whole floats such as `3600.0` count.
pub fn expires_at_from(expires_in: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    match expires_in.and_then(lifetime_secs) {
        Some(secs) if secs > 0 => Duration::try_seconds(secs)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
        _ => now + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
    }
}

fn lifetime_secs(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && secs.fract() == 0.0)
            .map(|secs| secs as i64)
    })
}

/// Build the token snapshot for a successful exchange.
///
/// `refresh_token` is whatever the caller already resolved for this exchange.
pub fn token_snapshot(
    content: &str,
    refresh_token: Option<String>,
    now: DateTime<Utc>,
) -> Result<TokenSnapshot, OAuthError> {
    let access_token = parse_field(content, ACCESS_TOKEN_KEY).ok_or_else(|| {
        OAuthError::UnexpectedResponse(format!(
            "token response did not contain {ACCESS_TOKEN_KEY}"
        ))
    })?;
    let expires_in = parse_field(content, EXPIRES_IN_KEY);
    Ok(TokenSnapshot {
        access_token: Some(access_token),
        refresh_token,
        token_type: parse_field(content, TOKEN_TYPE_KEY),
        expires_at: Some(expires_at_from(expires_in.as_deref(), now)),
    })
}
