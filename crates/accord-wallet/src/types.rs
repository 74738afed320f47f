//! Argument and result types for wallet operations.

use accord_primitives::ec::{PrivateKey, PublicKey, Signature};

/// How widely a derived key may be reused, encoded as the first segment
/// of the derivation string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityLevel {
    /// Key shared across applications and counterparties.
    #[default]
    Silent = 0,
    /// Key scoped to one application.
    App = 1,
    /// Key scoped to one application and one counterparty.
    Counterparty = 2,
}

/// A named derivation protocol with its security level.
#[derive(Debug, Clone, Default)]
pub struct Protocol {
    pub level: SecurityLevel,
    pub name: String,
}

impl Protocol {
    pub fn new(level: SecurityLevel, name: impl Into<String>) -> Self {
        Protocol {
            level,
            name: name.into(),
        }
    }
}

/// The other party to a cryptographic operation.
#[derive(Debug, Clone, Default)]
pub enum Counterparty {
    /// The wallet owner themselves.
    #[default]
    Myself,
    /// The well-known "anyone" party (root scalar 1); used for material
    /// that must be verifiable without a specific counterparty.
    Anyone,
    /// A specific party identified by public key.
    Other(PublicKey),
}

/// The private key of the well-known "anyone" party.
pub fn anyone_key() -> PrivateKey {
    let mut bytes = [0u8; 32];
    bytes[31] = 1;
    PrivateKey::from_bytes(&bytes).expect("scalar 1 is a valid key")
}

/// Key-derivation parameters shared by every wallet operation.
#[derive(Debug, Clone, Default)]
pub struct DerivationArgs {
    pub protocol: Protocol,
    pub key_id: String,
    pub counterparty: Counterparty,
}

/// Arguments for retrieving a public key.
#[derive(Debug, Clone, Default)]
pub struct GetPublicKeyArgs {
    pub derivation: DerivationArgs,
    /// Return the wallet's long-lived identity key instead of a derived key.
    pub identity_key: bool,
    /// Derive the key for this wallet rather than for the counterparty.
    pub for_self: bool,
}

/// Result of a public key retrieval.
#[derive(Debug, Clone)]
pub struct GetPublicKeyResult {
    pub public_key: PublicKey,
}

/// Arguments for creating a signature. `data` is SHA-256 hashed before
/// signing.
#[derive(Debug, Clone)]
pub struct CreateSignatureArgs {
    pub derivation: DerivationArgs,
    pub data: Vec<u8>,
}

/// Result of a signature creation.
#[derive(Debug, Clone)]
pub struct CreateSignatureResult {
    pub signature: Signature,
}

/// Arguments for verifying a signature over `data`.
#[derive(Debug, Clone)]
pub struct VerifySignatureArgs {
    pub derivation: DerivationArgs,
    pub data: Vec<u8>,
    pub signature: Signature,
    /// Verify against a key derived for this wallet (signatures this
    /// wallet produced) rather than for the counterparty.
    pub for_self: bool,
}

/// Result of a signature verification.
#[derive(Debug, Clone)]
pub struct VerifySignatureResult {
    pub valid: bool,
}

/// Arguments for computing an HMAC over `data`.
#[derive(Debug, Clone)]
pub struct CreateHmacArgs {
    pub derivation: DerivationArgs,
    pub data: Vec<u8>,
}

/// Result of an HMAC creation.
#[derive(Debug, Clone)]
pub struct CreateHmacResult {
    pub hmac: [u8; 32],
}

/// Arguments for verifying an HMAC.
#[derive(Debug, Clone)]
pub struct VerifyHmacArgs {
    pub derivation: DerivationArgs,
    pub data: Vec<u8>,
    pub hmac: [u8; 32],
}

/// Result of an HMAC verification.
#[derive(Debug, Clone)]
pub struct VerifyHmacResult {
    pub valid: bool,
}

/// Arguments for encrypting data under a derived symmetric key.
#[derive(Debug, Clone)]
pub struct EncryptArgs {
    pub derivation: DerivationArgs,
    pub plaintext: Vec<u8>,
}

/// Result of an encryption.
#[derive(Debug, Clone)]
pub struct EncryptResult {
    pub ciphertext: Vec<u8>,
}

/// Arguments for decrypting data under a derived symmetric key.
#[derive(Debug, Clone)]
pub struct DecryptArgs {
    pub derivation: DerivationArgs,
    pub ciphertext: Vec<u8>,
}

/// Result of a decryption.
#[derive(Debug, Clone)]
pub struct DecryptResult {
    pub plaintext: Vec<u8>,
}
