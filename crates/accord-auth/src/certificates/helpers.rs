//! Selecting certificates for disclosure and validating received sets.

use std::sync::RwLock;

use accord_primitives::ec::PublicKey;
use accord_wallet::types::Counterparty;
use accord_wallet::Wallet;

use crate::certificates::{keyring_for_verifier, MasterCertificate, VerifiableCertificate};
use crate::error::AuthError;
use crate::types::{AuthMessage, RequestedCertificateSet};

/// The certificates a peer holds and can disclose.
pub trait CertificateStore: Send + Sync {
    fn list(&self) -> Vec<MasterCertificate>;
}

/// In-memory certificate store.
#[derive(Default)]
pub struct MemoryCertificateStore {
    certificates: RwLock<Vec<MasterCertificate>>,
}

impl MemoryCertificateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, certificate: MasterCertificate) {
        self.certificates
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(certificate);
    }
}

impl CertificateStore for MemoryCertificateStore {
    fn list(&self) -> Vec<MasterCertificate> {
        self.certificates
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Select certificates from `store` matching `request` and prepare them
/// for disclosure to `verifier`.
///
/// A certificate qualifies when its type is in the request's type map,
/// its certifier is in the certifier list (an empty list accepts any),
/// and it carries every requested field. Returns an empty vector when
/// nothing qualifies.
pub fn get_verifiable_certificates(
    wallet: &dyn Wallet,
    store: &dyn CertificateStore,
    request: &RequestedCertificateSet,
    verifier: &PublicKey,
) -> Result<Vec<VerifiableCertificate>, AuthError> {
    let mut matches = Vec::new();

    for master in store.list() {
        let certificate = &master.certificate;

        let Some(required_fields) = request
            .certificate_types
            .get(&certificate.certificate_type)
        else {
            continue;
        };
        if !request.certifiers.is_empty() && !request.certifiers.contains(&certificate.certifier)
        {
            continue;
        }
        if !required_fields
            .iter()
            .all(|f| certificate.fields.contains_key(f))
        {
            continue;
        }

        let keyring = keyring_for_verifier(
            wallet,
            &Counterparty::Other(certificate.certifier),
            &Counterparty::Other(*verifier),
            &master,
            required_fields,
        )?;
        matches.push(VerifiableCertificate::new(certificate.clone(), keyring));
    }

    Ok(matches)
}

/// Validate the certificates enclosed in `message` against `request`.
///
/// Every certificate must be subject-bound to the message sender, carry
/// a valid certifier signature, match the request's certifier list and
/// type map (where non-empty), and disclose every requested field in a
/// form `wallet` can decrypt.
pub fn validate_certificates(
    wallet: &dyn Wallet,
    message: &AuthMessage,
    request: &RequestedCertificateSet,
) -> Result<(), AuthError> {
    if message.certificates.is_empty() {
        return Err(AuthError::CertificateValidation(
            "no certificates were provided".into(),
        ));
    }

    for certificate in &message.certificates {
        if certificate.certificate.subject != message.identity_key {
            return Err(AuthError::CertificateValidation(
                "certificate subject does not match sender identity key".into(),
            ));
        }

        certificate.verify()?;

        if !request.certifiers.is_empty()
            && !request
                .certifiers
                .contains(&certificate.certificate.certifier)
        {
            return Err(AuthError::CertificateValidation(format!(
                "certifier {} was not requested",
                certificate.certificate.certifier
            )));
        }

        if !request.certificate_types.is_empty() {
            let Some(required_fields) = request
                .certificate_types
                .get(&certificate.certificate.certificate_type)
            else {
                return Err(AuthError::CertificateValidation(format!(
                    "certificate type '{}' was not requested",
                    certificate.certificate.certificate_type
                )));
            };

            let mut disclosed = certificate.clone();
            let decrypted = disclosed.decrypt_fields(wallet)?;
            for field in required_fields {
                if !decrypted.contains_key(field) {
                    return Err(AuthError::CertificateValidation(format!(
                        "required field '{}' was not disclosed",
                        field
                    )));
                }
            }
        }
    }

    Ok(())
}
