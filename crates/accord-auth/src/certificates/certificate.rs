//! Base certificate type with certifier signing and verification.

use std::collections::BTreeMap;

use accord_primitives::ec::{PublicKey, Signature};
use accord_wallet::types::{
    Counterparty, CreateSignatureArgs, DerivationArgs, GetPublicKeyArgs, Protocol, SecurityLevel,
    VerifySignatureArgs,
};
use accord_wallet::{ProtoWallet, Wallet};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// An identity certificate.
///
/// Field values are stored encrypted (base64 ciphertext per field); the
/// matching revelation keys travel separately in a keyring. The
/// certifier's signature covers everything except itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// Certificate type identifier.
    pub certificate_type: String,
    /// Unique serial number (base64 of 32 random bytes).
    pub serial_number: String,
    /// The party the certificate is about.
    pub subject: PublicKey,
    /// The party that issued and signed it.
    pub certifier: PublicKey,
    /// Encrypted field values, field name → base64 ciphertext.
    pub fields: BTreeMap<String, String>,
    /// Certifier signature over the signing payload.
    pub signature: Vec<u8>,
}

impl Certificate {
    /// A new unsigned certificate.
    pub fn new(
        certificate_type: String,
        serial_number: String,
        subject: PublicKey,
        certifier: PublicKey,
        fields: BTreeMap<String, String>,
    ) -> Self {
        Certificate {
            certificate_type,
            serial_number,
            subject,
            certifier,
            fields,
            signature: Vec::new(),
        }
    }

    /// The deterministic byte form the certifier signs: length-prefixed
    /// type and serial, both key points, then the fields in map order.
    fn signing_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_chunk(&mut out, self.certificate_type.as_bytes());
        write_chunk(&mut out, self.serial_number.as_bytes());
        out.extend_from_slice(&self.subject.to_bytes());
        out.extend_from_slice(&self.certifier.to_bytes());
        out.extend_from_slice(&(self.fields.len() as u32).to_le_bytes());
        for (name, value) in &self.fields {
            write_chunk(&mut out, name.as_bytes());
            write_chunk(&mut out, value.as_bytes());
        }
        out
    }

    /// Sign with the certifier's wallet, stamping its identity key as the
    /// certifier.
    pub fn sign(&mut self, certifier_wallet: &dyn Wallet) -> Result<(), AuthError> {
        if !self.signature.is_empty() {
            return Err(AuthError::AlreadySigned);
        }

        self.certifier = certifier_wallet
            .get_public_key(GetPublicKeyArgs {
                identity_key: true,
                ..Default::default()
            })?
            .public_key;

        let result = certifier_wallet.create_signature(CreateSignatureArgs {
            derivation: self.signing_derivation(),
            data: self.signing_payload(),
        })?;
        self.signature = result.signature.to_bytes().to_vec();
        Ok(())
    }

    /// Verify the certifier signature. Anyone can do this, so the check
    /// runs under the well-known "anyone" wallet.
    pub fn verify(&self) -> Result<(), AuthError> {
        if self.signature.is_empty() {
            return Err(AuthError::NotSigned);
        }

        let signature = Signature::from_bytes(&self.signature)
            .map_err(|_| AuthError::SignatureInvalid)?;

        let mut derivation = self.signing_derivation();
        derivation.counterparty = Counterparty::Other(self.certifier);

        let result = ProtoWallet::anyone().verify_signature(VerifySignatureArgs {
            derivation,
            data: self.signing_payload(),
            signature,
            for_self: false,
        })?;
        if !result.valid {
            return Err(AuthError::SignatureInvalid);
        }
        Ok(())
    }

    fn signing_derivation(&self) -> DerivationArgs {
        DerivationArgs {
            protocol: Protocol::new(SecurityLevel::Counterparty, "certificate signature"),
            key_id: format!("{} {}", self.certificate_type, self.serial_number),
            counterparty: Counterparty::Anyone,
        }
    }

    /// Derivation parameters protecting one field's revelation key.
    pub fn field_encryption(field_name: &str, serial_number: &str) -> (Protocol, String) {
        let protocol = Protocol::new(SecurityLevel::Counterparty, "certificate field encryption");
        let key_id = if serial_number.is_empty() {
            field_name.to_string()
        } else {
            format!("{} {}", serial_number, field_name)
        };
        (protocol, key_id)
    }
}

fn write_chunk(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}
