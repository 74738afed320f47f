//! Elliptic-curve key types used throughout accord.

mod private_key;
mod public_key;
mod signature;
mod symmetric;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
pub use symmetric::SymmetricKey;
