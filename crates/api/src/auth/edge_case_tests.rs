//! Edge Case Tests for the Authentication System
//!
//! Tests critical boundary conditions in:
//! - Token structure handling (malformed inputs must reject, never panic)
//! - Tamper detection (signature and payload mutation)
//! - Expiry boundaries

#[cfg(test)]
mod token_tests {
    use super::super::jwt::{JwtError, JwtManager};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    const TEST_SECRET: &str = "test-secret-key-at-least-32-chars!";

    fn manager() -> JwtManager {
        JwtManager::new(TEST_SECRET, 3600)
    }

    // =========================================================================
    // Wrong segment counts (0, 1, 2, 4+) - must reject as malformed, not panic
    // =========================================================================
    #[test]
    fn test_wrong_segment_counts_are_malformed() {
        let jwt = manager();
        let valid = jwt.issue(7, Some("ana")).expect("should issue");
        let (header, payload) = {
            let mut parts = valid.split('.');
            (
                parts.next().expect("header").to_string(),
                parts.next().expect("payload").to_string(),
            )
        };

        let candidates = [
            String::new(),
            "justonesegment".to_string(),
            format!("{header}.{payload}"),
            format!("{valid}.extra"),
            format!("{valid}..."),
            "not.a.valid.token".to_string(),
        ];

        for candidate in &candidates {
            assert!(
                matches!(jwt.validate(candidate), Err(JwtError::Malformed)),
                "expected malformed rejection for {candidate:?}"
            );
        }
    }

    // =========================================================================
    // Invalid base64 alphabet in any segment - malformed, not a crash
    // =========================================================================
    #[test]
    fn test_invalid_base64_segments_are_malformed() {
        let jwt = manager();
        let valid = jwt.issue(7, Some("ana")).expect("should issue");
        let parts: Vec<&str> = valid.split('.').collect();

        for i in 0..3 {
            let mut mutated = parts.clone();
            mutated[i] = "!!not-base64url!!";
            let token = mutated.join(".");
            assert!(
                matches!(jwt.validate(&token), Err(JwtError::Malformed)),
                "segment {i} with invalid alphabet should be malformed"
            );
        }
    }

    // =========================================================================
    // Non-JSON header/payload bytes - malformed
    // =========================================================================
    #[test]
    fn test_non_json_segments_are_malformed() {
        let jwt = manager();
        let valid = jwt.issue(7, None).expect("should issue");
        let parts: Vec<&str> = valid.split('.').collect();

        let garbage = URL_SAFE_NO_PAD.encode(b"definitely not json");
        let bad_header = format!("{}.{}.{}", garbage, parts[1], parts[2]);
        assert!(matches!(
            jwt.validate(&bad_header),
            Err(JwtError::Malformed)
        ));
    }

    // =========================================================================
    // Single-bit flips in the signature - must fail as a signature mismatch
    // =========================================================================
    #[test]
    fn test_signature_bit_flips_are_detected() {
        let jwt = manager();
        let valid = jwt.issue(7, Some("ana")).expect("should issue");
        let parts: Vec<&str> = valid.split('.').collect();
        let signature = URL_SAFE_NO_PAD.decode(parts[2]).expect("valid signature");

        for i in 0..signature.len() {
            let mut tampered = signature.clone();
            tampered[i] ^= 0x01;
            let token = format!(
                "{}.{}.{}",
                parts[0],
                parts[1],
                URL_SAFE_NO_PAD.encode(&tampered)
            );
            assert!(
                matches!(jwt.validate(&token), Err(JwtError::BadSignature)),
                "bit flip at signature byte {i} should be detected"
            );
        }
    }

    // =========================================================================
    // Payload mutation without re-signing - must fail as a signature mismatch
    // =========================================================================
    #[test]
    fn test_payload_tampering_is_detected() {
        let jwt = manager();
        let valid = jwt.issue(7, Some("ana")).expect("should issue");
        let parts: Vec<&str> = valid.split('.').collect();

        let payload = URL_SAFE_NO_PAD.decode(parts[1]).expect("valid payload");
        let payload_text = String::from_utf8(payload).expect("utf8 payload");
        let escalated = payload_text.replace(r#""user_id":7"#, r#""user_id":1"#);
        assert_ne!(payload_text, escalated, "fixture must actually mutate");

        let token = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(escalated.as_bytes()),
            parts[2]
        );
        assert!(matches!(jwt.validate(&token), Err(JwtError::BadSignature)));
    }

    // =========================================================================
    // Signature spliced from another valid token - rejected
    // =========================================================================
    #[test]
    fn test_spliced_signature_is_rejected() {
        let jwt = manager();
        let victim = jwt.issue(7, Some("ana")).expect("should issue");
        let attacker = jwt.issue(1, Some("eve")).expect("should issue");

        let victim_parts: Vec<&str> = victim.split('.').collect();
        let attacker_parts: Vec<&str> = attacker.split('.').collect();

        let token = format!(
            "{}.{}.{}",
            victim_parts[0], victim_parts[1], attacker_parts[2]
        );
        assert!(matches!(jwt.validate(&token), Err(JwtError::BadSignature)));
    }

    // =========================================================================
    // Header naming any algorithm other than HS256 - rejected outright
    // =========================================================================
    #[test]
    fn test_foreign_algorithm_header_is_rejected() {
        let jwt = manager();
        let valid = jwt.issue(7, None).expect("should issue");
        let parts: Vec<&str> = valid.split('.').collect();

        let none_header = URL_SAFE_NO_PAD.encode(br#"{"typ":"JWT","alg":"none"}"#);
        let token = format!("{}.{}.{}", none_header, parts[1], parts[2]);
        assert!(matches!(jwt.validate(&token), Err(JwtError::Malformed)));
    }

    // =========================================================================
    // Expiry is checked only after the signature - forged "fresh" tokens fail
    // =========================================================================
    #[test]
    fn test_forged_unexpired_token_still_fails_signature() {
        let jwt = manager();
        let other = JwtManager::new("a-completely-different-secret-key", 3600);
        let forged = other.issue(7, Some("ana")).expect("should issue");

        assert!(matches!(jwt.validate(&forged), Err(JwtError::BadSignature)));
    }
}
