use feedbox::TokenService;
use feedbox::token::{Claims, TOKEN_TTL_SECS};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

mod common;
use common::TEST_SECRET;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Mints a token with arbitrary timestamps, bypassing the service, to probe
/// verification edge cases.
fn mint_token(user_id: Uuid, iat: u64, exp: u64, secret: &str) -> String {
    let claims = Claims {
        sub: user_id,
        email: "a@b.com".to_string(),
        iat: iat as usize,
        exp: exp as usize,
    };
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

#[test]
fn fresh_token_verifies_and_binds_identity() {
    let svc = TokenService::new(TEST_SECRET);
    let user_id = Uuid::new_v4();

    let token = svc.issue(user_id, "a@b.com").unwrap();
    let claims = svc.verify(&token).expect("fresh token must verify");

    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.email, "a@b.com");
    assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS as usize);
}

#[test]
fn token_expires_after_ttl() {
    let svc = TokenService::new(TEST_SECRET);
    let now = now_secs();

    // Issued two hours ago with the standard one-hour TTL: expired.
    let expired = mint_token(Uuid::new_v4(), now - 7200, now - 7200 + TOKEN_TTL_SECS, TEST_SECRET);
    assert!(svc.verify(&expired).is_none());

    // Still inside the window: verifies.
    let live = mint_token(Uuid::new_v4(), now - 10, now - 10 + TOKEN_TTL_SECS, TEST_SECRET);
    assert!(svc.verify(&live).is_some());
}

#[test]
fn expiry_boundary_is_exact() {
    let svc = TokenService::new(TEST_SECRET);
    let now = now_secs();

    // Inside the final second of the window: still verifies.
    let last_second = mint_token(Uuid::new_v4(), now + 1 - TOKEN_TTL_SECS, now + 1, TEST_SECRET);
    assert!(svc.verify(&last_second).is_some());

    // One second past exp: rejected. The default 60s leeway would have
    // accepted this.
    let one_past = mint_token(Uuid::new_v4(), now - 1 - TOKEN_TTL_SECS, now - 1, TEST_SECRET);
    assert!(svc.verify(&one_past).is_none());
}

#[test]
fn flipped_character_invalidates_token() {
    let svc = TokenService::new(TEST_SECRET);
    let token = svc.issue(Uuid::new_v4(), "a@b.com").unwrap();

    // Flip one character in the signature segment.
    let mut chars: Vec<char> = token.chars().collect();
    let last = chars.len() - 1;
    chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
    let tampered: String = chars.into_iter().collect();

    assert!(svc.verify(&tampered).is_none());
}

#[test]
fn token_signed_with_other_secret_is_rejected() {
    let svc = TokenService::new(TEST_SECRET);
    let now = now_secs();
    let forged = mint_token(Uuid::new_v4(), now, now + TOKEN_TTL_SECS, "some-other-secret");
    assert!(svc.verify(&forged).is_none());
}

#[test]
fn malformed_tokens_resolve_to_anonymous() {
    let svc = TokenService::new(TEST_SECRET);
    for garbage in ["", "x", "a.b", "a.b.c.d", "Bearer abc"] {
        assert!(svc.verify(garbage).is_none(), "{garbage:?} should not verify");
    }
}
