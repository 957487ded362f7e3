//! Token signing and password hashing.
//!
//! Access tokens use HMAC-SHA256 and carry their issue time for expiry.
//!
//! ## Token Format
//!
//! Tokens are composed of:
//! - 16 bytes: user id
//! - 16 bytes: session id
//! - 8 bytes: issued-at (Unix millis, big-endian)
//! - 32 bytes: HMAC-SHA256 signature
//!
//! Total: 72 bytes, base64url-encoded (no padding) for transport.

use crate::error::{HostError, HostResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_LEN: usize = 72;
const SIGNED_LEN: usize = 40;

/// Identity carried by a valid access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    /// Signed-in user.
    pub user_id: Uuid,
    /// Session the token belongs to.
    pub session_id: Uuid,
    /// Issue time, Unix millis.
    pub issued_at: u64,
}

/// Issues and validates access tokens.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    expiry: Duration,
}

impl TokenSigner {
    /// Creates a signer.
    pub fn new(secret: Vec<u8>, expiry: Duration) -> Self {
        Self { secret, expiry }
    }

    /// Returns the token lifetime.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Creates an access token for `user_id` within `session_id`.
    pub fn issue(&self, user_id: Uuid, session_id: Uuid) -> String {
        let mut data = Vec::with_capacity(TOKEN_LEN);
        data.extend_from_slice(user_id.as_bytes());
        data.extend_from_slice(session_id.as_bytes());
        data.extend_from_slice(&now_millis().to_be_bytes());

        let signature = self.sign(&data);
        data.extend_from_slice(&signature);
        URL_SAFE_NO_PAD.encode(data)
    }

    /// Validates a token's signature and age.
    pub fn validate(&self, token: &str) -> HostResult<TokenClaims> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| HostError::InvalidToken("malformed token".into()))?;
        if bytes.len() != TOKEN_LEN {
            return Err(HostError::InvalidToken("invalid token length".into()));
        }

        let (signed, signature) = bytes.split_at(SIGNED_LEN);
        let mut mac = self.mac();
        mac.update(signed);
        mac.verify_slice(signature)
            .map_err(|_| HostError::InvalidToken("invalid signature".into()))?;

        let user_id = uuid_at(signed, 0)?;
        let session_id = uuid_at(signed, 16)?;
        let issued_at = signed[32..40]
            .try_into()
            .map(u64::from_be_bytes)
            .map_err(|_| HostError::InvalidToken("invalid timestamp".into()))?;

        let expiry_millis = self.expiry.as_millis() as u64;
        if now_millis() > issued_at.saturating_add(expiry_millis) {
            return Err(HostError::InvalidToken("token is expired".into()));
        }

        Ok(TokenClaims {
            user_id,
            session_id,
            issued_at,
        })
    }

    fn sign(&self, data: &[u8]) -> [u8; 32] {
        let mut mac = self.mac();
        mac.update(data);
        mac.finalize().into_bytes().into()
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length, so this never fails.
        match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC can take key of any size"),
        }
    }
}

fn uuid_at(bytes: &[u8], offset: usize) -> HostResult<Uuid> {
    Uuid::from_slice(&bytes[offset..offset + 16])
        .map_err(|_| HostError::InvalidToken("invalid subject".into()))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A salted password digest.
#[derive(Clone)]
pub struct PasswordHash {
    salt: [u8; 16],
    digest: [u8; 32],
}

impl PasswordHash {
    /// Hashes `password` under a fresh random salt.
    pub fn new(password: &str) -> Self {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let digest = Self::mac(&salt, password).finalize().into_bytes().into();
        Self { salt, digest }
    }

    /// Checks `password` against the digest in constant time.
    pub fn verify(&self, password: &str) -> bool {
        Self::mac(&self.salt, password)
            .verify_slice(&self.digest)
            .is_ok()
    }

    fn mac(salt: &[u8; 16], password: &str) -> HmacSha256 {
        let mut mac = match HmacSha256::new_from_slice(salt) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC can take key of any size"),
        };
        mac.update(password.as_bytes());
        mac
    }
}

/// Creates an opaque random refresh token.
pub fn random_token() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"test-secret-key-32-bytes-long!!".to_vec(), Duration::from_secs(60))
    }

    #[test]
    fn issue_and_validate_token() {
        let signer = signer();
        let user = Uuid::new_v4();
        let session = Uuid::new_v4();

        let token = signer.issue(user, session);
        let claims = signer.validate(&token).unwrap();
        assert_eq!(claims.user_id, user);
        assert_eq!(claims.session_id, session);
    }

    #[test]
    fn reject_tampered_token() {
        let signer = signer();
        let token = signer.issue(Uuid::new_v4(), Uuid::new_v4());

        let mut bytes = URL_SAFE_NO_PAD.decode(&token).unwrap();
        bytes[50] ^= 0xFF; // Flip a bit in the signature
        let tampered = URL_SAFE_NO_PAD.encode(bytes);

        assert!(signer.validate(&tampered).is_err());
    }

    #[test]
    fn reject_foreign_secret() {
        let token = signer().issue(Uuid::new_v4(), Uuid::new_v4());
        let other = TokenSigner::new(b"another-secret".to_vec(), Duration::from_secs(60));
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn reject_expired_token() {
        let signer = TokenSigner::new(b"secret".to_vec(), Duration::from_secs(0));
        let token = signer.issue(Uuid::new_v4(), Uuid::new_v4());

        // Wait a tiny bit to ensure expiration
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(
            signer.validate(&token),
            Err(HostError::InvalidToken("token is expired".into()))
        );
    }

    #[test]
    fn reject_garbage() {
        assert!(signer().validate("not a token").is_err());
        assert!(signer().validate("").is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = PasswordHash::new("correct horse");
        assert!(hash.verify("correct horse"));
        assert!(!hash.verify("correct horse "));
        assert!(!hash.verify(""));
    }

    #[test]
    fn password_hashes_are_salted() {
        let a = PasswordHash::new("same");
        let b = PasswordHash::new("same");
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn refresh_tokens_are_unique() {
        assert_ne!(random_token(), random_token());
    }
}
