#![deny(missing_docs)]

//! Accord SDK - peer-to-peer mutual authentication.
//!
//! Re-exports every accord component for single-crate usage.

pub use accord_auth as auth;
pub use accord_primitives as primitives;
pub use accord_wallet as wallet;
