use crate::db::models::DbUser;
use crate::error::HubError;
use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// Hash a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, HubError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `false` on mismatch and on a stored hash that does not parse.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Stand-in hash for usernames that do not exist.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("face-detect-hub-absent-user").unwrap_or_default());

/// Check a login attempt against the stored hash, if any. An unknown user still
/// costs one argon2 verification, so response time does not reveal which names exist.
pub fn verify_login(password: &str, stored_hash: Option<&str>) -> bool {
    match stored_hash {
        Some(hash) => verify_password(password, hash),
        None => {
            let _ = verify_password(password, &DUMMY_HASH);
            false
        }
    }
}

/// Bearer token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks HS256 bearer tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, user: &DbUser) -> Result<String, HubError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            iat: now,
            exp: now.saturating_add(ttl),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, HubError> {
        Ok(encode(&Header::default(), claims, &self.encoding)?)
    }

    /// Signature and expiry check; every failure collapses to `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<Claims, HubError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                HubError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> DbUser {
        DbUser {
            id: "u-1".to_string(),
            username: "alice".to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn unknown_user_never_verifies() {
        assert!(DUMMY_HASH.starts_with("$argon2"));
        assert!(!verify_login("face-detect-hub-absent-user", None));
        assert!(!verify_login("", None));

        let hash = hash_password("hunter2").unwrap();
        assert!(verify_login("hunter2", Some(&hash)));
        assert!(!verify_login("hunter3", Some(&hash)));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn issued_token_carries_user() {
        let issuer = TokenIssuer::new(b"test-secret", Duration::from_secs(60));
        let token = issuer.issue(&user()).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new(b"test-secret", Duration::from_secs(60));
        let now = Utc::now().timestamp();
        let token = issuer
            .sign(&Claims {
                sub: "u-1".to_string(),
                username: "alice".to_string(),
                iat: now - 120,
                exp: now - 60,
            })
            .unwrap();
        assert!(matches!(issuer.verify(&token), Err(HubError::InvalidToken)));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let ours = TokenIssuer::new(b"ours", Duration::from_secs(60));
        let theirs = TokenIssuer::new(b"theirs", Duration::from_secs(60));
        let token = theirs.issue(&user()).unwrap();
        assert!(matches!(ours.verify(&token), Err(HubError::InvalidToken)));
    }
}
