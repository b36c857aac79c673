use std::time::Duration;

use super::*;
use crate::services::auth::UserRole;

const NOW: i64 = 1_800_000_000;

fn config() -> JwtConfig {
    JwtConfig { secret: "unit-test-secret".into(), audience: "authenticated".into(), ttl: Duration::from_secs(3600) }
}

fn user() -> User {
    User {
        id: Uuid::new_v4(),
        email: "asha@example.com".into(),
        name: Some("Asha".into()),
        auth_id: None,
        profile_pic_url: None,
        points: 0,
        role: UserRole::User,
        profile_complete: false,
        created_at: time::OffsetDateTime::UNIX_EPOCH,
    }
}

#[test]
fn bytes_to_hex_formats_lowercase_pairs() {
    assert_eq!(bytes_to_hex(&[0x00, 0xab, 0x0f]), "00ab0f");
}

#[test]
fn issued_token_decodes_with_same_config() {
    let cfg = config();
    let u = user();
    let token = issue_token_at(&cfg, &u, NOW).unwrap();
    assert_eq!(token.split('.').count(), 3);

    let claims = decode_token_at(&cfg, &token, NOW + 10).unwrap();
    assert_eq!(claims.sub, u.id);
    assert_eq!(claims.email, "asha@example.com");
    assert_eq!(claims.exp, NOW + 3600);
    assert_eq!(claims.iat, NOW);
    assert_eq!(claims.user_metadata.name.as_deref(), Some("Asha"));
    assert_eq!(claims.role.as_deref(), Some("user"));
}

#[test]
fn expired_token_is_rejected() {
    let cfg = config();
    let token = issue_token_at(&cfg, &user(), NOW).unwrap();
    assert_eq!(decode_token_at(&cfg, &token, NOW + 3600), Err(TokenError::Expired));
    assert_eq!(TokenError::Expired.to_string(), "Token has expired");
}

#[test]
fn wrong_secret_is_invalid() {
    let token = issue_token_at(&config(), &user(), NOW).unwrap();
    let other = JwtConfig { secret: "different".into(), ..config() };
    assert_eq!(decode_token_at(&other, &token, NOW), Err(TokenError::Invalid));
}

#[test]
fn tampered_payload_is_invalid() {
    let cfg = config();
    let token = issue_token_at(&cfg, &user(), NOW).unwrap();
    let parts: Vec<&str> = token.split('.').collect();
    let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"x","exp":9999999999}"#);
    let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
    assert_eq!(decode_token_at(&cfg, &forged, NOW), Err(TokenError::Invalid));
}

#[test]
fn malformed_tokens_are_invalid() {
    let cfg = config();
    for bad in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
        assert_eq!(decode_token_at(&cfg, bad, NOW), Err(TokenError::Invalid), "token {bad:?}");
    }
}

#[test]
fn non_hs256_header_is_invalid() {
    let cfg = config();
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"00000000-0000-0000-0000-000000000001"}"#);
    let input = format!("{header}.{payload}");
    let sig = URL_SAFE_NO_PAD.encode(sign(&cfg.secret, input.as_bytes()).unwrap());
    assert_eq!(decode_token_at(&cfg, &format!("{input}.{sig}"), NOW), Err(TokenError::Invalid));
}

#[test]
fn audience_mismatch_is_invalid_claims() {
    let cfg = config();
    let token = issue_token_at(&JwtConfig { audience: "other".into(), ..config() }, &user(), NOW).unwrap();
    assert_eq!(decode_token_at(&cfg, &token, NOW), Err(TokenError::InvalidClaims));
}

#[test]
fn audience_array_is_accepted() {
    let cfg = config();
    let claims = serde_json::json!({
        "sub": Uuid::new_v4().to_string(),
        "email": "a@example.com",
        "aud": ["other", "authenticated"],
        "exp": NOW + 60,
        "user_metadata": {}
    });
    let token = encode_claims(&cfg.secret, &claims).unwrap();
    let decoded = decode_token_at(&cfg, &token, NOW).unwrap();
    assert_eq!(decoded.user_metadata, UserMetadata::default());
    assert_eq!(decoded.role, None);
}

#[test]
fn missing_identity_fields_are_invalid_payload() {
    let cfg = config();
    let base = serde_json::json!({
        "sub": Uuid::new_v4().to_string(),
        "email": "a@example.com",
        "aud": "authenticated",
        "exp": NOW + 60,
        "user_metadata": {"name": "A"}
    });
    for field in ["sub", "email", "user_metadata"] {
        let mut claims = base.clone();
        claims.as_object_mut().unwrap().remove(field);
        let token = encode_claims(&cfg.secret, &claims).unwrap();
        assert_eq!(decode_token_at(&cfg, &token, NOW), Err(TokenError::InvalidPayload), "without {field}");
    }
}

#[test]
fn non_uuid_subject_is_invalid_payload() {
    let cfg = config();
    let claims = serde_json::json!({
        "sub": "not-a-uuid",
        "email": "a@example.com",
        "aud": "authenticated",
        "exp": NOW + 60,
        "user_metadata": {}
    });
    let token = encode_claims(&cfg.secret, &claims).unwrap();
    assert_eq!(decode_token_at(&cfg, &token, NOW), Err(TokenError::InvalidPayload));
}

#[test]
fn error_messages_match_api_contract() {
    assert_eq!(TokenError::Invalid.to_string(), "Invalid token");
    assert_eq!(TokenError::InvalidClaims.to_string(), "Invalid token claims");
    assert_eq!(TokenError::InvalidPayload.to_string(), "Invalid token payload");
}
