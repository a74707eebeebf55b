//! Credential encryption using scrypt-derived AES-256-GCM keys
//!
//! Provider API keys are stored as self-contained cipher tokens: four
//! colon-separated base64 segments (salt, iv, tag, ciphertext). A fresh salt
//! and iv are generated per call, so two encryptions of the same plaintext
//! never produce identical tokens.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// scrypt cost parameters: N=2^14, r=8, p=1.
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Crypto error types
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption secret is not configured")]
    MissingSecret,
    #[error("invalid token format: expected 4 colon-separated base64 segments")]
    InvalidFormat,
    #[error("decryption failed: ciphertext could not be authenticated")]
    AuthenticationFailed,
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

/// Symmetric cipher bound to the configured encryption secret.
///
/// The secret is optional at construction time; its absence only surfaces
/// when encryption or decryption is actually attempted.
#[derive(Clone)]
pub struct SecretCipher {
    secret: Option<String>,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("configured", &self.secret.is_some())
            .finish()
    }
}

impl SecretCipher {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    fn secret(&self) -> Result<&str, CryptoError> {
        self.secret.as_deref().ok_or(CryptoError::MissingSecret)
    }

    fn derive_key(&self, salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        scrypt::scrypt(self.secret()?.as_bytes(), salt, &params, key.as_mut())
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(key)
    }

    /// Encrypt a plaintext into a `salt:iv:tag:ciphertext` token.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut salt = [0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);

        let key = self.derive_key(&salt)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_ref()));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let mut sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        // aes-gcm appends the tag to the ciphertext; the token keeps them in
        // separate segments
        let tag = sealed.split_off(sealed.len() - TAG_LEN);
        let ciphertext = sealed;

        Ok(format!(
            "{}:{}:{}:{}",
            BASE64.encode(salt),
            BASE64.encode(nonce),
            BASE64.encode(tag),
            BASE64.encode(ciphertext),
        ))
    }

    /// Decrypt a `salt:iv:tag:ciphertext` token back into its plaintext.
    pub fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        self.secret()?;

        let segments: Vec<&str> = token.split(':').collect();
        let [salt, nonce, tag, ciphertext] = segments.as_slice() else {
            return Err(CryptoError::InvalidFormat);
        };

        let salt = BASE64.decode(salt).map_err(|_| CryptoError::InvalidFormat)?;
        let nonce = BASE64
            .decode(nonce)
            .map_err(|_| CryptoError::InvalidFormat)?;
        let tag = BASE64.decode(tag).map_err(|_| CryptoError::InvalidFormat)?;
        let ciphertext = BASE64
            .decode(ciphertext)
            .map_err(|_| CryptoError::InvalidFormat)?;

        if salt.len() != SALT_LEN || nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
            return Err(CryptoError::InvalidFormat);
        }

        let key = self.derive_key(&salt)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_ref()));

        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), sealed.as_ref())
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::AuthenticationFailed)
    }
}
