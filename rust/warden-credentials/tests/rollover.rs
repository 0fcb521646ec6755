//! Key rotation scenarios exercised through the public API.
//!
//! A deployment rotates its signing key by restarting with a new active key
//! and the previous key listed as a fallback. These tests model successive
//! restarts by building new handlers from new key material.

use chrono::Utc;
use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::SeedableRng;
use rsa::RsaPrivateKey;
use testresult::TestResult;
use warden_credentials::{Claims, CredentialHandler, KeyMaterial, Rs256Handler, Token, TokenError};

fn test_key(seed: u64) -> RsaPrivateKey {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    RsaPrivateKey::new(&mut rng, 2048).expect("key generation")
}

fn claims() -> Claims {
    Claims {
        tenant: Some("tenant-1".into()),
        is_user: true,
        ..Claims::new(
            "mender",
            "user-1",
            "mender.users.manage",
            Utc::now().timestamp() + 3600,
        )
    }
}

#[test]
fn tokens_survive_rotation_while_the_old_key_is_a_fallback() -> TestResult {
    let first = test_key(10);
    let second = test_key(11);

    let claims = claims();

    let before = Rs256Handler::new(&KeyMaterial::new(first.clone()));
    let encoded = before.issue(&Token::new(claims.clone()))?;

    let during = Rs256Handler::new(&KeyMaterial::new(second.clone()).with_fallback(first));
    assert_eq!(during.verify(&encoded)?.claims(), &claims);

    let after = Rs256Handler::new(&KeyMaterial::new(second));
    assert_eq!(after.verify(&encoded), Err(TokenError::Invalid));
    Ok(())
}

#[test]
fn handlers_are_usable_through_a_trait_object() -> TestResult {
    let handler: Box<dyn CredentialHandler> =
        Box::new(Rs256Handler::new(&KeyMaterial::new(test_key(12))));

    let claims = claims();

    let encoded = handler.issue(&Token::new(claims.clone()))?;
    let token = handler.verify(&encoded)?;

    assert_eq!(token.into_claims(), claims);
    Ok(())
}

#[test]
fn expired_tokens_are_distinguished_from_invalid_ones() -> TestResult {
    let handler = Rs256Handler::new(&KeyMaterial::new(test_key(13)));
    let stale = Claims {
        expires_at: Utc::now().timestamp() - 10,
        ..claims()
    };

    let encoded = handler.issue(&Token::new(stale))?;
    assert_eq!(handler.verify(&encoded), Err(TokenError::Expired));

    let garbage = format!("{encoded}x");
    assert_eq!(handler.verify(&garbage), Err(TokenError::Invalid));
    Ok(())
}
