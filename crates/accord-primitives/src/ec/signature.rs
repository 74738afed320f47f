//! Low-S ECDSA signatures in fixed 64-byte form.

use k256::ecdsa;
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// An ECDSA signature over secp256k1.
///
/// Always normalized to low-S. On the wire it is the 64-byte `r ‖ s`
/// encoding; there is no DER form in this protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    inner: ecdsa::Signature,
}

impl Signature {
    /// Sign a 32-byte digest with deterministic (RFC 6979) nonces.
    pub fn sign(digest: &[u8], key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let sig: ecdsa::Signature = key
            .signing_key()
            .sign_prehash(digest)
            .map_err(|e| PrimitivesError::Signing(e.to_string()))?;
        let inner = sig.normalize_s().unwrap_or(sig);
        Ok(Signature { inner })
    }

    /// Verify against a 32-byte digest and public key.
    pub fn verify(&self, digest: &[u8], key: &PublicKey) -> bool {
        key.verifying_key().verify_prehash(digest, &self.inner).is_ok()
    }

    /// Parse the 64-byte `r ‖ s` encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let inner = ecdsa::Signature::from_slice(bytes)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature { inner })
    }

    /// The 64-byte `r ‖ s` encoding.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }
}
