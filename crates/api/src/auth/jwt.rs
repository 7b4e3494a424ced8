//! Hand-rolled HS256 bearer tokens.
//!
//! Tokens are wire-compatible with the previous deployment of this API:
//! three unpadded base64url segments joined by `.`, header exactly
//! `{"typ":"JWT","alg":"HS256"}`, payload
//! `{"user_id":<int>,"username":<string|null>,"iat":<secs>,"exp":<secs>}`.
//! The signature is HMAC-SHA256 over the two encoded segments as
//! transmitted — verification never re-encodes the decoded JSON, so
//! formatting differences in a forged payload cannot produce a matching
//! signature by accident.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

/// Token lifetime applied when the configured value cannot be parsed.
pub const DEFAULT_TTL_SECONDS: i64 = 86_400;

/// Field order matters: the serialized bytes must match the wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Header {
    typ: String,
    alg: String,
}

impl Header {
    fn hs256() -> Self {
        Self {
            typ: "JWT".to_string(),
            alg: "HS256".to_string(),
        }
    }
}

/// Token payload. `username` serializes as JSON `null` when absent — it is
/// never omitted, matching tokens issued by the previous deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i64,
    pub username: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Why a token was rejected. Callers collapse all variants to a single
/// unauthenticated response; the variant is for logging only.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Wrong segment count, invalid base64url, or invalid JSON.
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    /// Issuance-side failure (claims serialization or MAC setup).
    #[error("token signing failed")]
    Signing,
}

/// Issues and validates bearer tokens with a server-held secret.
///
/// Construct once from the configuration at startup and clone into state;
/// issuance and validation are pure functions of the token, the secret, and
/// the clock.
#[derive(Clone)]
pub struct JwtManager {
    secret: Vec<u8>,
    ttl_seconds: i64,
}

impl JwtManager {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issues a signed token for `user_id`, expiring `ttl_seconds` from now.
    pub fn issue(&self, user_id: i64, username: Option<&str>) -> Result<String, JwtError> {
        self.issue_at(user_id, username, OffsetDateTime::now_utc().unix_timestamp())
    }

    fn issue_at(&self, user_id: i64, username: Option<&str>, now: i64) -> Result<String, JwtError> {
        let header = serde_json::to_vec(&Header::hs256()).map_err(|_| JwtError::Signing)?;
        let claims = Claims {
            user_id,
            username: username.map(str::to_owned),
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| JwtError::Signing)?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = sign(signing_input.as_bytes(), &self.secret)?;

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Validates a token end-to-end and returns the subject user id.
    ///
    /// Never panics: every failure path is a [`JwtError`].
    pub fn validate(&self, token: &str) -> Result<i64, JwtError> {
        self.validate_at(token, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Explicit-clock variant of [`validate`](Self::validate).
    pub(crate) fn validate_at(&self, token: &str, now: i64) -> Result<i64, JwtError> {
        let (header_b64, payload_b64, signature_b64) = split_segments(token)?;

        let header_raw = decode_segment(header_b64)?;
        let header: Header = serde_json::from_slice(&header_raw).map_err(|_| JwtError::Malformed)?;
        if header.alg != "HS256" || header.typ != "JWT" {
            return Err(JwtError::Malformed);
        }
        let payload_raw = decode_segment(payload_b64)?;

        // Sign the segments exactly as transmitted.
        let signing_input = format!("{header_b64}.{payload_b64}");
        let expected = sign(signing_input.as_bytes(), &self.secret)?;
        let provided = decode_segment(signature_b64)?;
        if !bool::from(expected.as_slice().ct_eq(&provided)) {
            return Err(JwtError::BadSignature);
        }

        let claims: Claims =
            serde_json::from_slice(&payload_raw).map_err(|_| JwtError::Malformed)?;
        if claims.exp < now {
            return Err(JwtError::Expired);
        }

        Ok(claims.user_id)
    }

    /// Decodes the payload without verifying the signature.
    ///
    /// For diagnostics and expiry-warning UI only — nothing returned from
    /// here may feed an authorization decision.
    pub fn peek_payload(&self, token: &str) -> Option<Claims> {
        let (_, payload_b64, _) = split_segments(token).ok()?;
        let payload_raw = decode_segment(payload_b64).ok()?;
        serde_json::from_slice(&payload_raw).ok()
    }

    /// True if the token is unparsable or expires within `threshold_seconds`.
    pub fn expires_within(&self, token: &str, threshold_seconds: i64) -> bool {
        self.expires_within_at(
            token,
            threshold_seconds,
            OffsetDateTime::now_utc().unix_timestamp(),
        )
    }

    fn expires_within_at(&self, token: &str, threshold_seconds: i64, now: i64) -> bool {
        match self.peek_payload(token) {
            Some(claims) => claims.exp - now < threshold_seconds,
            None => true,
        }
    }
}

/// Parses a token lifetime given as an integer with an optional `s`, `m`,
/// `h`, or `d` suffix (seconds when omitted). Returns `None` for anything
/// else; the caller decides the fallback.
pub fn parse_ttl(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (digits, unit) = match trimmed.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => {
            let (digits, suffix) = trimmed.split_at(idx);
            let mut chars = suffix.chars();
            let unit = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            (digits, unit)
        }
        None => (trimmed, 's'),
    };

    let value: i64 = digits.parse().ok()?;
    let scale = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3_600,
        'd' => 86_400,
        _ => return None,
    };

    value.checked_mul(scale)
}

fn split_segments(token: &str) -> Result<(&str, &str, &str), JwtError> {
    let mut parts = token.split('.');
    let header = parts.next().ok_or(JwtError::Malformed)?;
    let payload = parts.next().ok_or(JwtError::Malformed)?;
    let signature = parts.next().ok_or(JwtError::Malformed)?;
    if parts.next().is_some() {
        return Err(JwtError::Malformed);
    }
    Ok((header, payload, signature))
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, JwtError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| JwtError::Malformed)
}

fn sign(message: &[u8], secret: &[u8]) -> Result<Vec<u8>, JwtError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| JwtError::Signing)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-at-least-32-chars!";

    fn manager(ttl_seconds: i64) -> JwtManager {
        JwtManager::new(TEST_SECRET, ttl_seconds)
    }

    #[test]
    fn issue_then_validate_returns_subject() {
        let jwt = manager(3600);

        for (user_id, username) in [(1, Some("ana")), (42, None), (i64::MAX, Some("z"))] {
            let token = jwt.issue(user_id, username).expect("should issue");
            assert_eq!(jwt.validate(&token).expect("should validate"), user_id);
        }
    }

    #[test]
    fn header_segment_is_wire_exact() {
        let jwt = manager(3600);
        let token = jwt.issue(7, Some("ana")).expect("should issue");
        let header_b64 = token.split('.').next().expect("has header");

        let header_raw = URL_SAFE_NO_PAD.decode(header_b64).expect("valid b64");
        assert_eq!(header_raw, br#"{"typ":"JWT","alg":"HS256"}"#);
    }

    #[test]
    fn payload_preserves_field_order_and_null_username() {
        let jwt = manager(3600);
        let token = jwt.issue(7, None).expect("should issue");
        let payload_b64 = token.split('.').nth(1).expect("has payload");

        let payload_raw = URL_SAFE_NO_PAD.decode(payload_b64).expect("valid b64");
        let text = String::from_utf8(payload_raw).expect("utf8 payload");
        assert!(
            text.starts_with(r#"{"user_id":7,"username":null,"iat":"#),
            "payload not wire-shaped: {text}"
        );
    }

    #[test]
    fn token_uses_unpadded_urlsafe_alphabet() {
        let jwt = manager(3600);
        let token = jwt.issue(123_456, Some("padding?~")).expect("should issue");

        assert!(!token.contains('='));
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn expiry_matches_issued_ttl() {
        let jwt = manager(600);
        let token = jwt.issue_at(7, None, 1_000).expect("should issue");
        let claims = jwt.peek_payload(&token).expect("parsable payload");

        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 1_600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = manager(1);
        let token = jwt.issue_at(7, Some("ana"), 1_000).expect("should issue");

        // Two seconds later the one-second token is gone...
        assert!(matches!(
            jwt.validate_at(&token, 1_002),
            Err(JwtError::Expired)
        ));
        // ...but just inside the lifetime it is still good.
        assert_eq!(jwt.validate_at(&token, 1_000).expect("still valid"), 7);
        assert_eq!(jwt.validate_at(&token, 1_001).expect("still valid"), 7);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let jwt = manager(3600);
        let other = JwtManager::new("another-secret-entirely-different", 3600);
        let token = jwt.issue(7, None).expect("should issue");

        assert!(matches!(
            other.validate(&token),
            Err(JwtError::BadSignature)
        ));
    }

    #[test]
    fn peek_payload_does_not_verify() {
        let jwt = manager(3600);
        let other = JwtManager::new("another-secret-entirely-different", 3600);
        let token = jwt.issue(7, Some("ana")).expect("should issue");

        // A manager with the wrong secret can still read the payload.
        let claims = other.peek_payload(&token).expect("peek ignores signature");
        assert_eq!(claims.user_id, 7);
    }

    #[test]
    fn expires_within_thresholds() {
        let jwt = manager(600);
        let token = jwt.issue_at(7, None, 1_000).expect("should issue");

        assert!(!jwt.expires_within_at(&token, 300, 1_000));
        assert!(jwt.expires_within_at(&token, 300, 1_301));
        // Unparsable input always reports as expiring.
        assert!(jwt.expires_within_at("garbage", 300, 1_000));
    }

    #[test]
    fn parse_ttl_grammar() {
        assert_eq!(parse_ttl("45"), Some(45));
        assert_eq!(parse_ttl("45s"), Some(45));
        assert_eq!(parse_ttl("10m"), Some(600));
        assert_eq!(parse_ttl("24h"), Some(86_400));
        assert_eq!(parse_ttl("7d"), Some(604_800));
        assert_eq!(parse_ttl(" 30m "), Some(1_800));

        assert_eq!(parse_ttl(""), None);
        assert_eq!(parse_ttl("h"), None);
        assert_eq!(parse_ttl("10w"), None);
        assert_eq!(parse_ttl("1h30m"), None);
        assert_eq!(parse_ttl("-5"), None);
        assert_eq!(parse_ttl("ten"), None);
    }
}
