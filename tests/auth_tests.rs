//! Unit tests for password hashing, token issuance/verification and the
//! e-mail domain restriction.

use chrono::Utc;

use amfi_matching_api::auth::{
    decode_token, generate_token, hash_password, is_email_allowed, verify_password,
};
use amfi_matching_api::config::Config;
use amfi_matching_api::models::User;

fn test_config(allowed_domain: Option<&str>, expires_hours: i64) -> Config {
    Config {
        database_url: "postgres://localhost/test".to_string(),
        port: 0,
        jwt_secret: "test-secret-with-enough-length".to_string(),
        jwt_expires_hours: expires_hours,
        upload_dir: "uploads".to_string(),
        allowed_email_domain: allowed_domain.map(str::to_string),
    }
}

fn test_user() -> User {
    User {
        id: 42,
        email: "ana@amfi.finance".to_string(),
        password_hash: String::new(),
        name: "Ana".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn password_hash_verifies_and_rejects() {
    let hash = hash_password("correct horse battery staple").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("correct horse battery staple", &hash));
    assert!(!verify_password("wrong password", &hash));
}

#[test]
fn hashing_twice_salts_differently() {
    let a = hash_password("same password").unwrap();
    let b = hash_password("same password").unwrap();
    assert_ne!(a, b);
    assert!(verify_password("same password", &a));
    assert!(verify_password("same password", &b));
}

#[test]
fn unparseable_stored_hash_fails_verification_quietly() {
    assert!(!verify_password("anything", "not-a-valid-hash"));
    assert!(!verify_password("anything", ""));
}

#[test]
fn token_round_trip_preserves_claims() {
    let config = test_config(None, 24);
    let user = test_user();

    let token = generate_token(&user, &config).unwrap();
    let claims = decode_token(&token, &config.jwt_secret).unwrap();

    assert_eq!(claims.sub, 42);
    assert_eq!(claims.email, "ana@amfi.finance");
    assert!(claims.exp > claims.iat);
}

#[test]
fn token_with_wrong_secret_is_rejected() {
    let config = test_config(None, 24);
    let token = generate_token(&test_user(), &config).unwrap();

    assert!(decode_token(&token, "a-completely-different-secret").is_err());
}

#[test]
fn expired_token_is_rejected() {
    // Negative lifetime puts exp in the past, beyond the default leeway.
    let config = test_config(None, -2);
    let token = generate_token(&test_user(), &config).unwrap();

    assert!(decode_token(&token, &config.jwt_secret).is_err());
}

#[test]
fn tampered_token_is_rejected() {
    let config = test_config(None, 24);
    let mut token = generate_token(&test_user(), &config).unwrap();
    token.push('x');

    assert!(decode_token(&token, &config.jwt_secret).is_err());
}

#[test]
fn domain_restriction_applies_case_insensitively() {
    let config = test_config(Some("amfi.finance"), 24);

    assert!(is_email_allowed(&config, "ana@amfi.finance"));
    assert!(is_email_allowed(&config, "ana@AMFI.FINANCE"));
    assert!(!is_email_allowed(&config, "ana@gmail.com"));
    assert!(!is_email_allowed(&config, "not-an-email"));
    assert!(!is_email_allowed(&config, "amfi.finance"));
}

#[test]
fn no_configured_domain_allows_everyone() {
    let config = test_config(None, 24);

    assert!(is_email_allowed(&config, "ana@gmail.com"));
    assert!(is_email_allowed(&config, "bob@example.org"));
}
