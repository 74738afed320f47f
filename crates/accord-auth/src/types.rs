//! Core protocol types — AuthMessage, MessageType, PeerSession,
//! RequestedCertificateSet.

use std::collections::BTreeMap;

use accord_primitives::ec::PublicKey;
use accord_wallet::types::{Protocol, SecurityLevel};
use serde::{Deserialize, Serialize};

use crate::certificates::VerifiableCertificate;

/// Protocol version carried by every message. There is no negotiation;
/// mismatched versions are dropped.
pub const AUTH_VERSION: &str = "0.1";

/// Derivation protocol under which all auth message signatures are made.
pub fn signing_protocol() -> Protocol {
    Protocol::new(SecurityLevel::Counterparty, "auth message signature")
}

/// The five message kinds of the auth protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Opens a handshake, contributing the initiator's session nonce.
    InitialRequest,
    /// Closes a handshake, contributing and binding both session nonces.
    InitialResponse,
    /// Asks the peer for certificates under an established session.
    CertificateRequest,
    /// Carries certificates answering a request.
    CertificateResponse,
    /// An application payload under an established session.
    General,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageType::InitialRequest => "initialRequest",
            MessageType::InitialResponse => "initialResponse",
            MessageType::CertificateRequest => "certificateRequest",
            MessageType::CertificateResponse => "certificateResponse",
            MessageType::General => "general",
        };
        write!(f, "{}", name)
    }
}

/// A message exchanged during the auth protocol.
///
/// One record carries the superset of fields; which are required depends
/// on the kind (see [`codec::validate`](crate::codec::validate)). Nonce
/// fields are base64 strings, payload and signature are raw bytes.
#[derive(Debug, Clone)]
pub struct AuthMessage {
    /// Protocol version; always [`AUTH_VERSION`].
    pub version: String,
    /// The kind of message.
    pub message_type: MessageType,
    /// Sender's long-lived identity key.
    pub identity_key: PublicKey,
    /// Fresh per-message entropy (base64 of 32 random bytes).
    pub nonce: String,
    /// The sender's session nonce (initial messages and certificate
    /// responses).
    pub initial_nonce: String,
    /// The recipient's session nonce, echoed back to locate the session.
    pub your_nonce: String,
    /// Certificates requested from the recipient.
    pub requested_certificates: RequestedCertificateSet,
    /// Certificates disclosed to the recipient.
    pub certificates: Vec<VerifiableCertificate>,
    /// Application payload (`general` only).
    pub payload: Vec<u8>,
    /// Signature over the kind-specific canonical data.
    pub signature: Vec<u8>,
}

impl AuthMessage {
    /// A message of the given kind with all optional fields empty.
    pub fn new(message_type: MessageType, identity_key: PublicKey) -> Self {
        AuthMessage {
            version: AUTH_VERSION.to_string(),
            message_type,
            identity_key,
            nonce: String::new(),
            initial_nonce: String::new(),
            your_nonce: String::new(),
            requested_certificates: RequestedCertificateSet::default(),
            certificates: Vec::new(),
            payload: Vec::new(),
            signature: Vec::new(),
        }
    }
}

/// A set of certificates one party asks another to disclose.
///
/// Serialization order is deterministic (`BTreeMap`, certifiers in listed
/// order) because the JSON form is signed on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedCertificateSet {
    /// Identity keys of acceptable certifiers.
    pub certifiers: Vec<PublicKey>,
    /// Certificate type → field names that must be disclosed.
    pub certificate_types: BTreeMap<String, Vec<String>>,
}

impl RequestedCertificateSet {
    /// True when the set requests nothing.
    pub fn is_empty(&self) -> bool {
        self.certifiers.is_empty() && self.certificate_types.is_empty()
    }
}

/// One side's view of a session with a peer.
///
/// Created unauthenticated by the initiator and completed when the
/// initial response verifies; created directly authenticated by the
/// responder, which considers the session live once its own signed
/// response has been sent (mutual authentication is only established for
/// the responder when the initiator accepts that response).
#[derive(Debug, Clone)]
pub struct PeerSession {
    /// Whether the handshake has completed from this side's perspective.
    pub is_authenticated: bool,
    /// The nonce this side contributed.
    pub session_nonce: String,
    /// The nonce the peer contributed, once learned.
    pub peer_nonce: Option<String>,
    /// The peer's identity key, once learned.
    pub peer_identity_key: Option<PublicKey>,
    /// Milliseconds since the epoch of the last update; newest wins when
    /// several sessions exist for one identity.
    pub last_update: i64,
}
