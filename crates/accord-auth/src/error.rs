use crate::types::MessageType;

/// Errors raised by the authentication core.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required field is missing or empty for the message kind.
    #[error("malformed {kind} message: missing {field}")]
    Malformed {
        kind: MessageType,
        field: &'static str,
    },

    /// A received `your_nonce` was not produced by this wallet.
    #[error("nonce was not created by this wallet")]
    NonceRejected,

    /// No session matches the given nonce or identity key.
    #[error("session not found")]
    SessionMissing,

    /// A session exists but lacks state the operation requires.
    #[error("session is incomplete: {0}")]
    SessionIncomplete(&'static str),

    /// A message signature failed verification.
    #[error("invalid signature")]
    SignatureInvalid,

    /// A received certificate set does not satisfy its request.
    #[error("certificate validation failed: {0}")]
    CertificateValidation(String),

    /// The transport failed to deliver a message.
    #[error("transport failure: {0}")]
    Transport(String),

    /// No initial response arrived within the wait window.
    #[error("initial response timed out")]
    HandshakeTimeout,

    /// The handshake completed without producing an authenticated session.
    #[error("authentication failed")]
    HandshakeFailed,

    /// The certificate already carries a signature.
    #[error("certificate is already signed")]
    AlreadySigned,

    /// The certificate carries no signature yet.
    #[error("certificate is not signed")]
    NotSigned,

    /// The master keyring is missing or empty.
    #[error("missing master keyring")]
    MissingMasterKeyring,

    /// A named field is absent from the certificate.
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// A named field has no entry in the keyring.
    #[error("key not found in keyring: {0}")]
    KeyNotFoundInKeyring(String),

    /// A certificate field or revelation key failed to decrypt.
    #[error("field decryption failed: {0}")]
    FieldDecryption(String),

    /// A certificate field or revelation key failed to encrypt.
    #[error("field encryption failed: {0}")]
    FieldEncryption(String),

    /// An error from the wallet layer.
    #[error("wallet error: {0}")]
    Wallet(#[from] accord_wallet::WalletError),

    /// An error from the primitives layer.
    #[error(transparent)]
    Primitives(#[from] accord_primitives::PrimitivesError),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
