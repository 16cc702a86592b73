//! Collaborator interfaces
//!
//! Every external dependency of the condition engine and the retrieval
//! protocols is reached through one of these traits and injected by the
//! caller. Production handlers live in `crate::handlers` and in
//! `quorum-retrieval`; deterministic handlers for tests live in
//! `quorum-testkit`.

pub mod chain;
pub mod relay;
pub mod scheme;
pub mod signer;
pub mod storage;

pub use chain::{ChainEffects, RitualParticipant};
pub use relay::{DecryptOutcome, DecryptRequest, RelayEffects, RetrieveCfragsRequest};
pub use scheme::{ReencryptionScheme, ThresholdScheme};
pub use signer::SignerEffects;
pub use storage::StorageEffects;
