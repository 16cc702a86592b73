//! Session key agreement for decryption requests
//!
//! Each retrieval attempt generates one ephemeral `SessionStaticSecret`. For
//! every participant the requester derives a pairwise `SessionSharedSecret`
//! from that secret and the participant's published `SessionStaticKey`
//! (X25519), expanded with HKDF-SHA256. Requests and responses are sealed with
//! ChaCha20-Poly1305 under the pairwise key.

use crate::errors::{QuorumError, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use curve25519_dalek::montgomery::MontgomeryPoint;
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

const SHARED_SECRET_INFO: &[u8] = b"QUORUM_SESSION_SHARED_SECRET_V1";
const NONCE_LEN: usize = 12;

/// Ephemeral X25519 secret for one retrieval attempt
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionStaticSecret([u8; 32]);

impl SessionStaticSecret {
    /// Generate a fresh secret from the OS RNG
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Rebuild a secret from stored bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Public half to publish alongside requests
    pub fn public_key(&self) -> SessionStaticKey {
        SessionStaticKey(MontgomeryPoint::mul_base_clamped(self.0).to_bytes())
    }

    /// Derive the pairwise secret shared with `peer`
    pub fn derive_shared_secret(&self, peer: &SessionStaticKey) -> Result<SessionSharedSecret> {
        let mut shared_point = MontgomeryPoint(peer.0).mul_clamped(self.0).to_bytes();
        if bool::from(shared_point[..].ct_eq(&[0u8; 32][..])) {
            return Err(QuorumError::crypto("Session key agreement produced identity point"));
        }
        let hkdf = Hkdf::<Sha256>::new(None, &shared_point);
        let mut okm = [0u8; 32];
        hkdf.expand(SHARED_SECRET_INFO, &mut okm)
            .map_err(|e| QuorumError::crypto(format!("HKDF expansion failed: {e}")))?;
        shared_point.zeroize();
        Ok(SessionSharedSecret(okm))
    }
}

impl fmt::Debug for SessionStaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionStaticSecret(<redacted>)")
    }
}

/// Published X25519 session key of a requester or participant
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionStaticKey([u8; 32]);

impl SessionStaticKey {
    /// Wrap raw key bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Hex form without prefix
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse hex, tolerating a `0x` prefix
    pub fn from_hex(value: &str) -> Result<Self> {
        let stripped = value.strip_prefix("0x").unwrap_or(value);
        let bytes = hex::decode(stripped)
            .map_err(|e| QuorumError::invalid(format!("Invalid session key: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| QuorumError::invalid("Invalid session key: expected 32 bytes"))?;
        Ok(Self::from_bytes(bytes))
    }
}

impl fmt::Debug for SessionStaticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionStaticKey({})", self.to_hex())
    }
}

impl Serialize for SessionStaticKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SessionStaticKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_hex(&value).map_err(serde::de::Error::custom)
    }
}

/// Pairwise symmetric key between requester and one participant
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionSharedSecret([u8; 32]);

impl SessionSharedSecret {
    /// Encrypt with a random nonce; output is `nonce || ciphertext`
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.0));
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|e| QuorumError::crypto(format!("ChaCha20-Poly1305 encryption failed: {e}")))?;
        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt `nonce || ciphertext` produced by [`seal`](Self::seal)
    pub fn open(&self, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN {
            return Err(QuorumError::crypto("Sealed payload shorter than nonce"));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.0));
        cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|e| QuorumError::crypto(format!("ChaCha20-Poly1305 decryption failed: {e}")))
    }
}

impl fmt::Debug for SessionSharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSharedSecret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairwise_secrets_agree() {
        let requester = SessionStaticSecret::random();
        let participant = SessionStaticSecret::random();

        let ours = requester
            .derive_shared_secret(&participant.public_key())
            .unwrap();
        let theirs = participant
            .derive_shared_secret(&requester.public_key())
            .unwrap();

        let sealed = ours.seal(b"decryption request", b"ritual-7").unwrap();
        assert_eq!(theirs.open(&sealed, b"ritual-7").unwrap(), b"decryption request");
    }

    #[test]
    fn test_open_rejects_wrong_peer_and_aad() {
        let requester = SessionStaticSecret::random();
        let participant = SessionStaticSecret::random();
        let stranger = SessionStaticSecret::random();

        let shared = requester
            .derive_shared_secret(&participant.public_key())
            .unwrap();
        let wrong = stranger
            .derive_shared_secret(&requester.public_key())
            .unwrap();

        let sealed = shared.seal(b"payload", b"aad").unwrap();
        assert!(wrong.open(&sealed, b"aad").is_err());
        assert!(shared.open(&sealed, b"other").is_err());
        assert!(shared.open(&sealed[..4], b"aad").is_err());
    }

    #[test]
    fn test_static_key_hex_round_trip() {
        let key = SessionStaticSecret::random().public_key();
        let parsed = SessionStaticKey::from_hex(&format!("0x{}", key.to_hex())).unwrap();
        assert_eq!(parsed, key);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(serde_json::from_str::<SessionStaticKey>(&json).unwrap(), key);
    }

    #[test]
    fn test_identity_point_rejected() {
        let secret = SessionStaticSecret::random();
        let identity = SessionStaticKey::from_bytes([0u8; 32]);
        assert!(secret.derive_shared_secret(&identity).is_err());
    }
}
