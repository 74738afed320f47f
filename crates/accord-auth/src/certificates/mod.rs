//! Identity certificates with selectively-disclosable fields.
//!
//! A certifier issues a [`MasterCertificate`] whose field values are
//! encrypted under per-field random keys; the subject later discloses
//! chosen fields to a verifier by re-encrypting those keys into a
//! [`VerifiableCertificate`] keyring.

mod certificate;
mod helpers;
mod master;
mod verifiable;

pub use certificate::Certificate;
pub use helpers::{
    get_verifiable_certificates, validate_certificates, CertificateStore, MemoryCertificateStore,
};
pub use master::{
    create_certificate_fields, issue_certificate, keyring_for_verifier, CertificateFields,
    MasterCertificate,
};
pub use verifiable::VerifiableCertificate;
