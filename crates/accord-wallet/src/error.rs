/// Errors raised by the wallet layer.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The protocol name violates the derivation-string rules.
    #[error("invalid protocol: {0}")]
    InvalidProtocol(String),

    /// The key ID violates the derivation-string rules.
    #[error("invalid key ID: {0}")]
    InvalidKeyId(String),

    /// Arguments are inconsistent or incomplete for the operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An error from the primitives layer.
    #[error(transparent)]
    Primitives(#[from] accord_primitives::PrimitivesError),
}
