//! Quorum Testing Infrastructure
//!
//! Deterministic, in-memory collaborators for the condition engine and the
//! retrieval protocols.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! quorum-testkit = { path = "../quorum-testkit" }
//! ```
//!
//! ```rust,no_run
//! use quorum_testkit::*;
//!
//! let policy = PrePolicyFixture::new(2, 3).unwrap();
//! let relay = MockRelay::new()
//!     .with_behavior(participant(1), ParticipantBehavior::Error("offline".into()));
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod chain;
pub mod fixtures;
pub mod relay;
pub mod schemes;
pub mod signer;
pub mod storage;

pub use chain::MockChain;
pub use fixtures::{participant, DkgRitualFixture, PrePolicyFixture};
pub use relay::{MockRelay, ParticipantBehavior, RecordedCall};
pub use schemes::{ToyDkg, ToyPre};
pub use signer::MockSigner;
pub use storage::MemoryStorageHandler;

/// Install a test subscriber honouring `RUST_LOG`; later calls are no-ops
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
