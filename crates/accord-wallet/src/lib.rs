//! Wallet layer for the accord protocol.
//!
//! Exposes the [`Wallet`] trait the protocol core consumes (identity key
//! retrieval, signing, verification, HMAC, and symmetric encryption, all
//! parameterized by `(protocol, key_id, counterparty)`) and
//! [`ProtoWallet`], an in-memory implementation over a single root key
//! using two-party child derivation.

mod error;
mod key_deriver;
mod proto_wallet;
mod wallet_trait;

pub mod types;

pub use error::WalletError;
pub use key_deriver::KeyDeriver;
pub use proto_wallet::ProtoWallet;
pub use wallet_trait::Wallet;
