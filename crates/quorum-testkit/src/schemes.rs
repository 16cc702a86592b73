//! Deterministic stand-ins for the opaque cryptographic schemes
//!
//! These are oracles, not cryptography: anyone holding the public inputs can
//! forge fragments and shares. They keep the properties the retrieval
//! protocols rely on:
//!
//! - fragments and shares are bound to their capsule/header and keys,
//! - a tampered fragment fails verification,
//! - combination fails below the threshold,
//! - wrong keys fail closed.
//!
//! The threshold travels inside the policy / ritual key (first byte), so the
//! schemes stay stateless.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use quorum_core::effects::{ReencryptionScheme, ThresholdScheme};
use quorum_core::protocol::{
    Capsule, CapsuleFrag, Ciphertext, CiphertextHeader, DecryptionShare, EncryptedTreasureMap,
    FerveoVariant, PublicKey, SecretKey, SharedSecret, TreasureMap, VerifiedCapsuleFrag,
};
use quorum_core::{Address, QuorumError, Result};
use rand::{rngs::OsRng, RngCore};
use std::collections::BTreeSet;

const NONCE_LEN: usize = 12;
const SEED_LEN: usize = 32;
const TAG_LEN: usize = 32;

const DATA_KEY_CONTEXT: &str = "quorum-testkit toy pre data key";
const CFRAG_CONTEXT: &str = "quorum-testkit toy pre cfrag";
const TREASURE_MAP_CONTEXT: &str = "quorum-testkit toy treasure map";
const RECIPIENT_CONTEXT: &str = "quorum-testkit toy recipient key";
const DKG_SECRET_CONTEXT: &str = "quorum-testkit toy dkg secret";

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

fn derive_key(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

fn seal(key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let nonce: [u8; NONCE_LEN] = random_bytes();
    let ciphertext = ChaCha20Poly1305::new(Key::from_slice(key))
        .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
        .map_err(|e| QuorumError::crypto(format!("toy seal failed: {e}")))?;
    Ok([&nonce[..], &ciphertext[..]].concat())
}

fn open(key: &[u8; 32], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN {
        return Err(QuorumError::crypto("toy ciphertext too short"));
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    ChaCha20Poly1305::new(Key::from_slice(key))
        .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| QuorumError::crypto("toy decryption failed"))
}

fn threshold_of(key: &PublicKey) -> Result<usize> {
    key.as_bytes()
        .first()
        .map(|t| usize::from(*t))
        .ok_or_else(|| QuorumError::crypto("empty toy key"))
}

fn address_prefix(bytes: &[u8]) -> Result<Address> {
    let prefix: [u8; Address::LENGTH] = bytes
        .get(..Address::LENGTH)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| QuorumError::crypto("toy fragment too short"))?;
    Ok(Address::new(prefix))
}

/// Flip one bit so verification fails
pub fn corrupt(bytes: &[u8]) -> Vec<u8> {
    let mut corrupted = bytes.to_vec();
    if let Some(last) = corrupted.last_mut() {
        *last ^= 0x01;
    }
    corrupted
}

/// Toy proxy re-encryption
#[derive(Debug, Clone, Copy, Default)]
pub struct ToyPre;

impl ToyPre {
    /// Policy key requiring `threshold` fragments
    pub fn policy_key(threshold: u8) -> PublicKey {
        let seed: [u8; SEED_LEN] = random_bytes();
        PublicKey::from_bytes([&[threshold][..], &seed[..]].concat())
    }

    /// Random signing-side key for a publisher
    pub fn publisher_key() -> PublicKey {
        PublicKey::from_bytes(random_bytes::<SEED_LEN>().to_vec())
    }

    /// Fresh recipient keypair
    pub fn recipient_keypair() -> (SecretKey, PublicKey) {
        let secret = SecretKey::from_bytes(random_bytes::<SEED_LEN>().to_vec());
        let public = Self::recipient_public_key(&secret);
        (secret, public)
    }

    /// Public half of a recipient secret
    pub fn recipient_public_key(secret: &SecretKey) -> PublicKey {
        PublicKey::from_bytes(derive_key(RECIPIENT_CONTEXT, &[secret.as_bytes()]).to_vec())
    }

    /// Encrypt a participant map for the recipient
    pub fn encrypt_treasure_map(
        map: &TreasureMap,
        recipient_key: &PublicKey,
        publisher_verifying_key: &PublicKey,
    ) -> Result<EncryptedTreasureMap> {
        let key = derive_key(
            TREASURE_MAP_CONTEXT,
            &[recipient_key.as_bytes(), publisher_verifying_key.as_bytes()],
        );
        Ok(EncryptedTreasureMap::from_bytes(seal(&key, &map.to_bytes()?, &[])?))
    }

    fn cfrag_tag(
        participant: &Address,
        capsule: &Capsule,
        publisher_verifying_key: &PublicKey,
        policy_encrypting_key: &PublicKey,
        recipient_encrypting_key: &PublicKey,
    ) -> blake3::Hash {
        let key = derive_key(
            CFRAG_CONTEXT,
            &[
                capsule.as_bytes(),
                publisher_verifying_key.as_bytes(),
                policy_encrypting_key.as_bytes(),
                recipient_encrypting_key.as_bytes(),
            ],
        );
        blake3::keyed_hash(&key, participant.as_bytes())
    }

    /// Fragment an honest participant would return
    pub fn reencrypt(
        participant: &Address,
        capsule: &Capsule,
        publisher_verifying_key: &PublicKey,
        policy_encrypting_key: &PublicKey,
        recipient_encrypting_key: &PublicKey,
    ) -> CapsuleFrag {
        let tag = Self::cfrag_tag(
            participant,
            capsule,
            publisher_verifying_key,
            policy_encrypting_key,
            recipient_encrypting_key,
        );
        CapsuleFrag::from_bytes([&participant.as_bytes()[..], &tag.as_bytes()[..]].concat())
    }

    fn data_key(policy_encrypting_key: &PublicKey, capsule: &Capsule) -> [u8; 32] {
        derive_key(
            DATA_KEY_CONTEXT,
            &[policy_encrypting_key.as_bytes(), capsule.as_bytes()],
        )
    }
}

impl ReencryptionScheme for ToyPre {
    fn encrypt(
        &self,
        policy_encrypting_key: &PublicKey,
        plaintext: &[u8],
    ) -> Result<(Capsule, Vec<u8>)> {
        let threshold = policy_encrypting_key
            .as_bytes()
            .first()
            .copied()
            .ok_or_else(|| QuorumError::crypto("empty toy key"))?;
        let seed: [u8; SEED_LEN] = random_bytes();
        let capsule = Capsule::from_bytes([&[threshold][..], &seed[..]].concat());
        let key = Self::data_key(policy_encrypting_key, &capsule);
        let ciphertext = seal(&key, plaintext, capsule.as_bytes())?;
        Ok((capsule, ciphertext))
    }

    fn decrypt_treasure_map(
        &self,
        encrypted: &EncryptedTreasureMap,
        recipient_secret_key: &SecretKey,
        publisher_verifying_key: &PublicKey,
    ) -> Result<TreasureMap> {
        let recipient_key = Self::recipient_public_key(recipient_secret_key);
        let key = derive_key(
            TREASURE_MAP_CONTEXT,
            &[recipient_key.as_bytes(), publisher_verifying_key.as_bytes()],
        );
        TreasureMap::from_bytes(&open(&key, encrypted.as_bytes(), &[])?)
    }

    fn verify_cfrag(
        &self,
        cfrag: CapsuleFrag,
        capsule: &Capsule,
        publisher_verifying_key: &PublicKey,
        policy_encrypting_key: &PublicKey,
        recipient_encrypting_key: &PublicKey,
    ) -> Result<VerifiedCapsuleFrag> {
        let bytes = cfrag.as_bytes();
        if bytes.len() != Address::LENGTH + TAG_LEN {
            return Err(QuorumError::crypto("toy fragment has wrong length"));
        }
        let participant = address_prefix(bytes)?;
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[Address::LENGTH..]);
        let expected = Self::cfrag_tag(
            &participant,
            capsule,
            publisher_verifying_key,
            policy_encrypting_key,
            recipient_encrypting_key,
        );
        if blake3::Hash::from(tag) != expected {
            return Err(QuorumError::crypto("toy fragment tag mismatch"));
        }
        Ok(VerifiedCapsuleFrag::from_verified(cfrag))
    }

    fn decrypt_reencrypted(
        &self,
        _recipient_secret_key: &SecretKey,
        policy_encrypting_key: &PublicKey,
        capsule: &Capsule,
        cfrags: Vec<VerifiedCapsuleFrag>,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let threshold = capsule
            .as_bytes()
            .first()
            .map(|t| usize::from(*t))
            .ok_or_else(|| QuorumError::crypto("empty toy capsule"))?;
        let contributors = cfrags
            .iter()
            .map(|cfrag| address_prefix(cfrag.as_cfrag().as_bytes()))
            .collect::<Result<BTreeSet<_>>>()?;
        if contributors.len() < threshold {
            return Err(QuorumError::crypto(format!(
                "toy combine needs {threshold} fragments, got {}",
                contributors.len()
            )));
        }
        let key = Self::data_key(policy_encrypting_key, capsule);
        open(&key, ciphertext, capsule.as_bytes())
    }
}

/// Toy threshold decryption
#[derive(Debug, Clone, Copy, Default)]
pub struct ToyDkg;

impl ToyDkg {
    /// Ritual key requiring `threshold` shares
    pub fn ritual_public_key(threshold: u8) -> PublicKey {
        ToyPre::policy_key(threshold)
    }

    fn secret_for(header: &CiphertextHeader) -> [u8; 32] {
        derive_key(DKG_SECRET_CONTEXT, &[header.as_bytes()])
    }

    /// Share an honest participant would compute for `header`
    pub fn decryption_share(participant: &Address, header: &CiphertextHeader) -> Result<DecryptionShare> {
        let threshold = header
            .as_bytes()
            .first()
            .copied()
            .ok_or_else(|| QuorumError::crypto("empty toy header"))?;
        let secret = Self::secret_for(header);
        Ok(DecryptionShare::from_bytes(
            [&participant.as_bytes()[..], &[threshold][..], &secret[..]].concat(),
        ))
    }
}

impl ThresholdScheme for ToyDkg {
    fn encrypt(&self, dkg_public_key: &PublicKey, plaintext: &[u8], aad: &[u8]) -> Result<Ciphertext> {
        threshold_of(dkg_public_key)?;
        let seed: [u8; SEED_LEN] = random_bytes();
        let header = CiphertextHeader::from_bytes([dkg_public_key.as_bytes(), &seed[..]].concat());
        let payload = seal(&Self::secret_for(&header), plaintext, aad)?;
        Ok(Ciphertext { header, payload })
    }

    fn combine_shares(
        &self,
        _variant: FerveoVariant,
        shares: Vec<DecryptionShare>,
    ) -> Result<SharedSecret> {
        let mut contributors = BTreeSet::new();
        let mut combined: Option<(u8, Vec<u8>)> = None;
        for share in &shares {
            let bytes = share.as_bytes();
            if bytes.len() != Address::LENGTH + 1 + 32 {
                return Err(QuorumError::crypto("toy share has wrong length"));
            }
            contributors.insert(address_prefix(bytes)?);
            let threshold = bytes[Address::LENGTH];
            let secret = bytes[Address::LENGTH + 1..].to_vec();
            match &combined {
                None => combined = Some((threshold, secret)),
                Some((t, s)) if *t == threshold && *s == secret => {}
                Some(_) => return Err(QuorumError::crypto("toy shares disagree")),
            }
        }
        let (threshold, secret) =
            combined.ok_or_else(|| QuorumError::crypto("no shares to combine"))?;
        if contributors.len() < usize::from(threshold) {
            return Err(QuorumError::crypto(format!(
                "toy combine needs {threshold} shares, got {}",
                contributors.len()
            )));
        }
        Ok(SharedSecret::from_bytes(secret))
    }

    fn decrypt_with_shared_secret(
        &self,
        ciphertext: &Ciphertext,
        aad: &[u8],
        shared_secret: &SharedSecret,
    ) -> Result<Vec<u8>> {
        let key: [u8; 32] = shared_secret
            .as_bytes()
            .try_into()
            .map_err(|_| QuorumError::crypto("toy shared secret has wrong length"))?;
        open(&key, &ciphertext.payload, aad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_fragment_binding() {
        let policy = ToyPre::policy_key(2);
        let publisher = ToyPre::publisher_key();
        let (secret, recipient) = ToyPre::recipient_keypair();
        let (capsule, ciphertext) = ToyPre.encrypt(&policy, b"hello").unwrap();

        let cfrags: Vec<_> = [1u8, 2]
            .iter()
            .map(|b| {
                let cfrag =
                    ToyPre::reencrypt(&Address::new([*b; 20]), &capsule, &publisher, &policy, &recipient);
                ToyPre
                    .verify_cfrag(cfrag, &capsule, &publisher, &policy, &recipient)
                    .unwrap()
            })
            .collect();

        let forged = CapsuleFrag::from_bytes(corrupt(cfrags[0].as_cfrag().as_bytes()));
        assert!(ToyPre
            .verify_cfrag(forged, &capsule, &publisher, &policy, &recipient)
            .is_err());

        assert!(ToyPre
            .decrypt_reencrypted(&secret, &policy, &capsule, cfrags[..1].to_vec(), &ciphertext)
            .is_err());
        let plaintext = ToyPre
            .decrypt_reencrypted(&secret, &policy, &capsule, cfrags, &ciphertext)
            .unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn test_dkg_combination() {
        let key = ToyDkg::ritual_public_key(2);
        let ciphertext = ToyDkg.encrypt(&key, b"secret", b"aad").unwrap();
        let shares: Vec<_> = [7u8, 8]
            .iter()
            .map(|b| ToyDkg::decryption_share(&Address::new([*b; 20]), &ciphertext.header).unwrap())
            .collect();

        assert!(ToyDkg
            .combine_shares(FerveoVariant::Simple, shares[..1].to_vec())
            .is_err());
        let secret = ToyDkg
            .combine_shares(FerveoVariant::Simple, shares)
            .unwrap();
        assert_eq!(
            ToyDkg
                .decrypt_with_shared_secret(&ciphertext, b"aad", &secret)
                .unwrap(),
            b"secret"
        );
        assert!(ToyDkg
            .decrypt_with_shared_secret(&ciphertext, b"other", &secret)
            .is_err());
    }
}
