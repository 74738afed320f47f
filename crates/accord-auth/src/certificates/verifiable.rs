//! A certificate prepared for a specific verifier.

use std::collections::BTreeMap;

use accord_primitives::ec::SymmetricKey;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use accord_wallet::types::{Counterparty, DecryptArgs, DerivationArgs};
use accord_wallet::Wallet;

use crate::certificates::Certificate;
use crate::error::AuthError;

/// A certificate plus a keyring that lets one verifier decrypt the
/// disclosed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCertificate {
    pub certificate: Certificate,
    /// Field name → base64 revelation key, encrypted subject→verifier.
    pub keyring: BTreeMap<String, String>,
    /// Plaintext values recovered by [`decrypt_fields`](Self::decrypt_fields);
    /// local state, never on the wire.
    #[serde(skip)]
    pub decrypted_fields: BTreeMap<String, String>,
}

impl VerifiableCertificate {
    pub fn new(certificate: Certificate, keyring: BTreeMap<String, String>) -> Self {
        VerifiableCertificate {
            certificate,
            keyring,
            decrypted_fields: BTreeMap::new(),
        }
    }

    /// Verify the certifier signature.
    pub fn verify(&self) -> Result<(), AuthError> {
        self.certificate.verify()
    }

    /// Decrypt every keyring field with the verifier's wallet.
    ///
    /// Each keyring entry holds the field's revelation key encrypted
    /// between the subject and this verifier; the key then opens the
    /// field ciphertext itself.
    pub fn decrypt_fields(
        &mut self,
        verifier_wallet: &dyn Wallet,
    ) -> Result<BTreeMap<String, String>, AuthError> {
        if self.keyring.is_empty() {
            return Err(AuthError::FieldDecryption(
                "a keyring is required to decrypt certificate fields".into(),
            ));
        }

        let subject = Counterparty::Other(self.certificate.subject);
        let mut decrypted = BTreeMap::new();

        for (field_name, sealed_key) in &self.keyring {
            let sealed_key_bytes = BASE64.decode(sealed_key).map_err(|e| {
                AuthError::FieldDecryption(format!("keyring entry '{}': {}", field_name, e))
            })?;

            let (protocol, key_id) =
                Certificate::field_encryption(field_name, &self.certificate.serial_number);
            let revelation_key = verifier_wallet
                .decrypt(DecryptArgs {
                    derivation: DerivationArgs {
                        protocol,
                        key_id,
                        counterparty: subject.clone(),
                    },
                    ciphertext: sealed_key_bytes,
                })
                .map_err(|e| {
                    AuthError::FieldDecryption(format!("keyring entry '{}': {}", field_name, e))
                })?
                .plaintext;

            let sealed_value = self.certificate.fields.get(field_name).ok_or_else(|| {
                AuthError::FieldNotFound(field_name.clone())
            })?;
            let sealed_value_bytes = BASE64.decode(sealed_value).map_err(|e| {
                AuthError::FieldDecryption(format!("field '{}': {}", field_name, e))
            })?;

            if revelation_key.len() != 32 {
                return Err(AuthError::FieldDecryption(format!(
                    "revelation key for '{}' is not 32 bytes",
                    field_name
                )));
            }
            let plaintext = SymmetricKey::new(&revelation_key)
                .decrypt(&sealed_value_bytes)
                .map_err(|e| {
                    AuthError::FieldDecryption(format!("field '{}': {}", field_name, e))
                })?;

            let value = String::from_utf8(plaintext).map_err(|e| {
                AuthError::FieldDecryption(format!("field '{}': {}", field_name, e))
            })?;
            decrypted.insert(field_name.clone(), value);
        }

        self.decrypted_fields = decrypted.clone();
        Ok(decrypted)
    }
}
