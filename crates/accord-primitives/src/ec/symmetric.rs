//! AES-256-GCM symmetric encryption for certificate field material.

use aes::Aes256;
use aes_gcm::aead::generic_array::typenum::U32;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::{AeadInPlace, AesGcm, KeyInit};
use rand::RngCore;

use crate::PrimitivesError;

const IV_LEN: usize = 32;
const TAG_LEN: usize = 16;

/// A 32-byte symmetric key.
///
/// Ciphertext layout is `IV (32) ‖ ciphertext ‖ tag (16)`; the wide IV
/// keeps collision odds negligible for keys that encrypt many values.
/// Key material is zeroized on drop.
pub struct SymmetricKey {
    key: zeroize::Zeroizing<[u8; 32]>,
}

impl SymmetricKey {
    /// Wrap existing key bytes. Shorter inputs are left-padded with
    /// zeros; longer inputs are truncated to 32 bytes.
    pub fn new(key: &[u8]) -> Self {
        let mut padded = [0u8; 32];
        if key.len() < 32 {
            padded[32 - key.len()..].copy_from_slice(key);
        } else {
            padded.copy_from_slice(&key[..32]);
        }
        SymmetricKey {
            key: zeroize::Zeroizing::new(padded),
        }
    }

    /// Generate a random key from the OS RNG.
    pub fn random() -> Self {
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        SymmetricKey {
            key: zeroize::Zeroizing::new(key),
        }
    }

    /// Encrypt `plaintext`, producing `IV ‖ ciphertext ‖ tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, PrimitivesError> {
        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let cipher = AesGcm::<Aes256, U32>::new(GenericArray::from_slice(self.key.as_ref()));
        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&iv), &[], &mut buffer)
            .map_err(|e| PrimitivesError::Encryption(e.to_string()))?;

        let mut out = Vec::with_capacity(IV_LEN + buffer.len() + TAG_LEN);
        out.extend_from_slice(&iv);
        out.extend_from_slice(&buffer);
        out.extend_from_slice(&tag);
        Ok(out)
    }

    /// Decrypt a message produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, message: &[u8]) -> Result<Vec<u8>, PrimitivesError> {
        if message.len() < IV_LEN + TAG_LEN {
            return Err(PrimitivesError::Decryption(
                "message too short for IV and tag".into(),
            ));
        }

        let iv = &message[..IV_LEN];
        let ciphertext = &message[IV_LEN..message.len() - TAG_LEN];
        let tag = &message[message.len() - TAG_LEN..];

        let cipher = AesGcm::<Aes256, U32>::new(GenericArray::from_slice(self.key.as_ref()));
        let mut buffer = ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(iv),
                &[],
                &mut buffer,
                GenericArray::from_slice(tag),
            )
            .map_err(|e| PrimitivesError::Decryption(e.to_string()))?;

        Ok(buffer)
    }

    /// The raw key bytes.
    pub fn to_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = SymmetricKey::random();
        let plaintext = b"a thing to encrypt";

        let ciphertext = key.encrypt(plaintext).unwrap();
        assert_ne!(&ciphertext[IV_LEN..ciphertext.len() - TAG_LEN], plaintext);
        assert_eq!(key.decrypt(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn wrong_key_fails() {
        let ciphertext = SymmetricKey::random().encrypt(b"secret").unwrap();
        assert!(SymmetricKey::random().decrypt(&ciphertext).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = SymmetricKey::random();
        let mut ciphertext = key.encrypt(b"secret").unwrap();
        let mid = ciphertext.len() / 2;
        ciphertext[mid] ^= 0x01;
        assert!(key.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn short_key_is_padded() {
        let key = SymmetricKey::new(&[0xAB; 31]);
        let ciphertext = key.encrypt(b"test message").unwrap();
        assert_eq!(key.decrypt(&ciphertext).unwrap(), b"test message");
    }

    #[test]
    fn too_short_message_rejected() {
        let key = SymmetricKey::random();
        assert!(key.decrypt(&[0u8; 10]).is_err());
    }
}
