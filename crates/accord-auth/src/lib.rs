//! Peer-to-peer mutual authentication for the accord protocol.
//!
//! Two parties holding long-lived identity keys run a four-way handshake
//! over any framed [`Transport`], binding a session to a pair of
//! wallet-verifiable nonces. Under that session they exchange signed
//! general payloads and selectively-disclosed certificates.
//!
//! The entry point is [`Peer`]: give it a wallet and a transport, then
//! call [`Peer::to_peer`]; the handshake runs on demand.

pub mod certificates;
pub mod codec;
pub mod nonce;
pub mod peer;
pub mod session_manager;
pub mod transport;
pub mod types;

mod error;

pub use error::AuthError;
pub use peer::{Peer, PeerOptions, DEFAULT_HANDSHAKE_TIMEOUT};
pub use session_manager::{DefaultSessionManager, SessionManager};
pub use transport::{MessageHandler, Transport};
pub use types::*;
