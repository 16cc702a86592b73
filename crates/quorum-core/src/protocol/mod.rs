//! Wire objects exchanged with the relay and network participants
//!
//! Re-encryption objects (`pre`) and threshold-decryption objects (`dkg`) are
//! opaque byte carriers as far as this crate is concerned; the cryptographic
//! meaning lives behind the scheme traits in `effects::scheme`.

pub mod dkg;
pub mod keys;
pub mod lingo;
pub mod pre;

pub use dkg::{
    AccessControlPolicy, Ciphertext, CiphertextHeader, DecryptionShare,
    EncryptedThresholdDecryptionRequest, EncryptedThresholdDecryptionResponse, FerveoVariant,
    SharedSecret, ThresholdDecryptionRequest, ThresholdDecryptionResponse,
};
pub use keys::{PublicKey, SecretKey};
pub use lingo::{Conditions, Context};
pub use pre::{
    Capsule, CapsuleFrag, EncryptedKeyFrag, EncryptedTreasureMap, RetrievalKit, RetrievalOutcome,
    TreasureMap, VerifiedCapsuleFrag,
};
