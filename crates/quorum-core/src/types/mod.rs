//! Identifier types

pub mod identifiers;

pub use identifiers::{Address, ChainId, RitualId};
