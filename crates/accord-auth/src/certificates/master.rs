//! Certificate issuance and the master keyring.

use std::collections::BTreeMap;

use accord_primitives::ec::{PublicKey, SymmetricKey};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;

use accord_wallet::types::{
    Counterparty, DecryptArgs, DerivationArgs, EncryptArgs, GetPublicKeyArgs,
};
use accord_wallet::Wallet;

use crate::certificates::Certificate;
use crate::error::AuthError;
use crate::nonce::random_base64;

/// A certificate held by its subject, together with the master keyring
/// that can unlock every field.
#[derive(Debug, Clone)]
pub struct MasterCertificate {
    pub certificate: Certificate,
    /// Field name → base64 of the field's revelation key, encrypted
    /// between certifier and subject.
    pub master_keyring: BTreeMap<String, String>,
}

impl MasterCertificate {
    /// Pair a certificate with its master keyring. Every certificate
    /// field must have a keyring entry.
    pub fn new(
        certificate: Certificate,
        master_keyring: BTreeMap<String, String>,
    ) -> Result<Self, AuthError> {
        if master_keyring.is_empty() {
            return Err(AuthError::MissingMasterKeyring);
        }
        for field_name in certificate.fields.keys() {
            if !master_keyring.contains_key(field_name) {
                return Err(AuthError::KeyNotFoundInKeyring(field_name.clone()));
            }
        }
        Ok(MasterCertificate {
            certificate,
            master_keyring,
        })
    }
}

/// Encrypted field values plus the master keyring produced at issuance.
pub struct CertificateFields {
    pub fields: BTreeMap<String, String>,
    pub master_keyring: BTreeMap<String, String>,
}

/// Encrypt plaintext field values for a certificate.
///
/// Each field gets its own random 32-byte revelation key; the value is
/// sealed under that key and the key itself is sealed between the
/// issuing wallet and `other` (the subject, or the certifier when the
/// subject issues to itself).
pub fn create_certificate_fields(
    issuing_wallet: &dyn Wallet,
    other: &Counterparty,
    plain_fields: &BTreeMap<String, String>,
) -> Result<CertificateFields, AuthError> {
    let mut fields = BTreeMap::new();
    let mut master_keyring = BTreeMap::new();

    for (name, value) in plain_fields {
        let mut key_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key_bytes);
        let revelation_key = SymmetricKey::new(&key_bytes);

        let sealed_value = revelation_key
            .encrypt(value.as_bytes())
            .map_err(|e| AuthError::FieldEncryption(format!("field '{}': {}", name, e)))?;
        fields.insert(name.clone(), BASE64.encode(&sealed_value));

        // Serial number is not known at field-creation time; the keyring
        // entry is scoped to the field name alone.
        let (protocol, key_id) = Certificate::field_encryption(name, "");
        let sealed_key = issuing_wallet.encrypt(EncryptArgs {
            derivation: DerivationArgs {
                protocol,
                key_id,
                counterparty: other.clone(),
            },
            plaintext: key_bytes.to_vec(),
        })?;
        master_keyring.insert(name.clone(), BASE64.encode(&sealed_key.ciphertext));
    }

    Ok(CertificateFields {
        fields,
        master_keyring,
    })
}

/// Issue a signed certificate for `subject` over plaintext fields.
pub fn issue_certificate(
    certifier_wallet: &dyn Wallet,
    subject: &PublicKey,
    plain_fields: &BTreeMap<String, String>,
    certificate_type: &str,
    serial_number: Option<String>,
) -> Result<MasterCertificate, AuthError> {
    let serial_number = serial_number.unwrap_or_else(|| random_base64(32));

    let created = create_certificate_fields(
        certifier_wallet,
        &Counterparty::Other(*subject),
        plain_fields,
    )?;

    let certifier = certifier_wallet
        .get_public_key(GetPublicKeyArgs {
            identity_key: true,
            ..Default::default()
        })?
        .public_key;

    let mut certificate = Certificate::new(
        certificate_type.to_string(),
        serial_number,
        *subject,
        certifier,
        created.fields,
    );
    certificate.sign(certifier_wallet)?;

    MasterCertificate::new(certificate, created.master_keyring)
}

/// Decrypt one field via the master keyring, returning the revelation
/// key and the plaintext value.
pub fn decrypt_field(
    wallet: &dyn Wallet,
    master_keyring: &BTreeMap<String, String>,
    field_name: &str,
    sealed_value: &str,
    other: &Counterparty,
) -> Result<(Vec<u8>, String), AuthError> {
    let sealed_key = master_keyring
        .get(field_name)
        .ok_or_else(|| AuthError::KeyNotFoundInKeyring(field_name.to_string()))?;
    let sealed_key_bytes = BASE64.decode(sealed_key)?;

    let (protocol, key_id) = Certificate::field_encryption(field_name, "");
    let revelation_key = wallet
        .decrypt(DecryptArgs {
            derivation: DerivationArgs {
                protocol,
                key_id,
                counterparty: other.clone(),
            },
            ciphertext: sealed_key_bytes,
        })?
        .plaintext;

    if revelation_key.len() != 32 {
        return Err(AuthError::FieldDecryption(format!(
            "revelation key for '{}' is not 32 bytes",
            field_name
        )));
    }

    let sealed_value_bytes = BASE64.decode(sealed_value)?;
    let plaintext = SymmetricKey::new(&revelation_key)
        .decrypt(&sealed_value_bytes)
        .map_err(|e| AuthError::FieldDecryption(format!("field '{}': {}", field_name, e)))?;

    let value = String::from_utf8(plaintext)
        .map_err(|e| AuthError::FieldDecryption(format!("field '{}': {}", field_name, e)))?;
    Ok((revelation_key, value))
}

/// Build a keyring revealing `fields_to_reveal` to `verifier`: each
/// revelation key is recovered via the master keyring and re-encrypted
/// between the subject and the verifier, scoped to the serial number.
pub fn keyring_for_verifier(
    subject_wallet: &dyn Wallet,
    certifier: &Counterparty,
    verifier: &Counterparty,
    master: &MasterCertificate,
    fields_to_reveal: &[String],
) -> Result<BTreeMap<String, String>, AuthError> {
    if master.master_keyring.is_empty() {
        return Err(AuthError::MissingMasterKeyring);
    }

    let mut keyring = BTreeMap::new();
    for field_name in fields_to_reveal {
        let sealed_value = master
            .certificate
            .fields
            .get(field_name)
            .ok_or_else(|| AuthError::FieldNotFound(field_name.clone()))?;

        let (revelation_key, _) = decrypt_field(
            subject_wallet,
            &master.master_keyring,
            field_name,
            sealed_value,
            certifier,
        )?;

        let (protocol, key_id) =
            Certificate::field_encryption(field_name, &master.certificate.serial_number);
        let sealed_for_verifier = subject_wallet.encrypt(EncryptArgs {
            derivation: DerivationArgs {
                protocol,
                key_id,
                counterparty: verifier.clone(),
            },
            plaintext: revelation_key,
        })?;
        keyring.insert(field_name.clone(), BASE64.encode(&sealed_for_verifier.ciphertext));
    }

    Ok(keyring)
}
