//! Session cryptography
//!
//! Only the requester-side key agreement is implemented here. Re-encryption
//! and threshold combination stay behind the scheme traits.

pub mod session;

pub use session::{SessionSharedSecret, SessionStaticKey, SessionStaticSecret};
