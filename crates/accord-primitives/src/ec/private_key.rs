//! secp256k1 private key with two-party child derivation.

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::ScalarPrimitive;
use k256::{Scalar, Secp256k1};
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::hash::hmac_sha256;
use crate::PrimitivesError;

/// A secp256k1 private key.
///
/// Besides signing, a private key can compute ECDH shared secrets and
/// derive child keys offset by an HMAC over a derivation tag, so that two
/// parties each holding one root key can independently arrive at the same
/// child key pair.
#[derive(Clone)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a fresh random private key from the OS RNG.
    pub fn random() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    /// Build a private key from a 32-byte big-endian scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != 32 {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let inner = SigningKey::from_bytes(bytes.into())
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner })
    }

    /// Build a private key from a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".into(),
            ));
        }
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// The 32-byte big-endian scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    /// Lowercase hex of the scalar.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.inner.verifying_key())
    }

    /// Sign a 32-byte message digest with deterministic (RFC 6979) nonces.
    pub fn sign(&self, digest: &[u8]) -> Result<Signature, PrimitivesError> {
        Signature::sign(digest, self)
    }

    /// ECDH: multiply the counterparty's public point by this scalar.
    pub fn shared_secret(&self, other: &PublicKey) -> Result<PublicKey, PrimitivesError> {
        let point = other.to_projective()? * self.to_scalar();
        let encoded = point.to_affine().to_encoded_point(true);
        PublicKey::from_bytes(encoded.as_bytes())
    }

    /// Derive a child private key for the given counterparty and tag.
    ///
    /// The child scalar is `self + HMAC-SHA256(shared_secret, tag)` mod n,
    /// mirroring [`PublicKey::derive_child`] so both parties agree on the
    /// derived key pair without revealing their roots.
    pub fn derive_child(
        &self,
        counterparty: &PublicKey,
        tag: &str,
    ) -> Result<PrivateKey, PrimitivesError> {
        let shared = self.shared_secret(counterparty)?;
        let offset = hmac_sha256(&shared.to_bytes(), tag.as_bytes());

        let child = self.to_scalar() + scalar_reduce(&offset);
        let primitive: ScalarPrimitive<Secp256k1> = child.into();
        Self::from_bytes(&primitive.to_bytes())
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }

    pub(crate) fn to_scalar(&self) -> Scalar {
        *self.inner.as_nonzero_scalar().as_ref()
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        let mut bytes = self.inner.to_bytes();
        bytes.zeroize();
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the scalar.
        write!(f, "PrivateKey({})", self.public_key().to_hex())
    }
}

/// Reduce a 32-byte big-endian value into a curve scalar.
pub(crate) fn scalar_reduce(bytes: &[u8; 32]) -> Scalar {
    use k256::elliptic_curve::ops::Reduce;
    <Scalar as Reduce<k256::U256>>::reduce(k256::U256::from_be_slice(bytes))
}
