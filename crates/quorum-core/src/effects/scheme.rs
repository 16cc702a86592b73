//! Opaque cryptographic primitives
//!
//! Fragment generation, re-encryption, share combination and key derivation
//! are provided by an external library. The retrieval protocols only need the
//! operations below, all of which are pure and synchronous.

use crate::errors::Result;
use crate::protocol::{
    Capsule, CapsuleFrag, Ciphertext, DecryptionShare, EncryptedTreasureMap, FerveoVariant,
    PublicKey, SecretKey, SharedSecret, TreasureMap, VerifiedCapsuleFrag,
};

/// Proxy re-encryption primitives
pub trait ReencryptionScheme: Send + Sync {
    /// Encrypt under a policy key, returning the capsule and ciphertext body
    fn encrypt(&self, policy_encrypting_key: &PublicKey, plaintext: &[u8])
        -> Result<(Capsule, Vec<u8>)>;

    /// Decrypt and authenticate a participant map.
    ///
    /// Must fail rather than return a map when either key is wrong.
    fn decrypt_treasure_map(
        &self,
        encrypted: &EncryptedTreasureMap,
        recipient_secret_key: &SecretKey,
        publisher_verifying_key: &PublicKey,
    ) -> Result<TreasureMap>;

    /// Verify a fragment against its capsule and the policy's keys
    fn verify_cfrag(
        &self,
        cfrag: CapsuleFrag,
        capsule: &Capsule,
        publisher_verifying_key: &PublicKey,
        policy_encrypting_key: &PublicKey,
        recipient_encrypting_key: &PublicKey,
    ) -> Result<VerifiedCapsuleFrag>;

    /// Combine verified fragments and decrypt the ciphertext body
    fn decrypt_reencrypted(
        &self,
        recipient_secret_key: &SecretKey,
        policy_encrypting_key: &PublicKey,
        capsule: &Capsule,
        cfrags: Vec<VerifiedCapsuleFrag>,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;
}

/// Threshold (DKG) decryption primitives
pub trait ThresholdScheme: Send + Sync {
    /// Encrypt under a ritual's DKG public key with associated data
    fn encrypt(&self, dkg_public_key: &PublicKey, plaintext: &[u8], aad: &[u8]) -> Result<Ciphertext>;

    /// Combine decryption shares into the ciphertext's shared secret
    fn combine_shares(
        &self,
        variant: FerveoVariant,
        shares: Vec<DecryptionShare>,
    ) -> Result<SharedSecret>;

    /// Decrypt with a combined shared secret
    fn decrypt_with_shared_secret(
        &self,
        ciphertext: &Ciphertext,
        aad: &[u8],
        shared_secret: &SharedSecret,
    ) -> Result<Vec<u8>>;
}
