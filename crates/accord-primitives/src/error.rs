/// Errors raised by the primitives layer.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    /// The bytes do not form a valid secp256k1 private scalar.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// The bytes do not form a valid secp256k1 curve point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The bytes do not form a valid ECDSA signature.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A derived or combined point landed at infinity.
    #[error("derived point is at infinity")]
    PointAtInfinity,

    /// Symmetric encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Symmetric decryption failed (bad key, IV, or tag).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Hex decoding error.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
