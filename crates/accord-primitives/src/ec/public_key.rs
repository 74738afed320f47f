//! secp256k1 public key in compressed SEC1 form.

use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{AffinePoint, ProjectivePoint};
use std::fmt;

use crate::ec::private_key::{scalar_reduce, PrivateKey};
use crate::ec::signature::Signature;
use crate::hash::hmac_sha256;
use crate::PrimitivesError;

/// A secp256k1 public key.
///
/// Serialized everywhere as the 33-byte compressed SEC1 encoding; the hex
/// form of that encoding is what the protocol calls an identity key.
#[derive(Clone, Copy)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Parse a SEC1-encoded point (compressed or uncompressed).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.is_empty() {
            return Err(PrimitivesError::InvalidPublicKey(
                "public key bytes are empty".into(),
            ));
        }
        let inner = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| PrimitivesError::InvalidPublicKey(e.to_string()))?;
        Ok(PublicKey { inner })
    }

    /// Parse a hex-encoded SEC1 point.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// The 33-byte compressed SEC1 encoding.
    pub fn to_bytes(&self) -> [u8; 33] {
        let point = self.inner.to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Lowercase hex of the compressed encoding (the identity-key form).
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Verify an ECDSA signature over a 32-byte digest.
    pub fn verify(&self, digest: &[u8], sig: &Signature) -> bool {
        sig.verify(digest, self)
    }

    /// Derive a child public key for the given counterparty and tag.
    ///
    /// The child point is `self + HMAC-SHA256(shared_secret, tag) * G`,
    /// the public-side mirror of [`PrivateKey::derive_child`].
    pub fn derive_child(
        &self,
        counterparty: &PrivateKey,
        tag: &str,
    ) -> Result<PublicKey, PrimitivesError> {
        let shared = counterparty.shared_secret(self)?;
        let offset = hmac_sha256(&shared.to_bytes(), tag.as_bytes());

        let child = self.to_projective()? + ProjectivePoint::GENERATOR * scalar_reduce(&offset);
        let encoded = child.to_affine().to_encoded_point(true);
        PublicKey::from_bytes(encoded.as_bytes())
    }

    pub(crate) fn from_verifying_key(vk: &VerifyingKey) -> Self {
        PublicKey { inner: *vk }
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.inner
    }

    pub(crate) fn to_projective(&self) -> Result<ProjectivePoint, PrimitivesError> {
        let encoded = self.inner.to_encoded_point(false);
        let point = AffinePoint::from_encoded_point(&encoded);
        if bool::from(point.is_some()) {
            Ok(ProjectivePoint::from(point.unwrap()))
        } else {
            Err(PrimitivesError::PointAtInfinity)
        }
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// Serialized as the compressed-hex identity-key form, which keeps the
// canonical JSON the protocol signs stable and readable.
impl serde::Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex_str = <String as serde::Deserialize>::deserialize(deserializer)?;
        PublicKey::from_hex(&hex_str).map_err(serde::de::Error::custom)
    }
}
