//! Tests for certificate issuance, disclosure, and validation.

use std::collections::BTreeMap;

use accord_auth::certificates::{
    get_verifiable_certificates, issue_certificate, keyring_for_verifier, validate_certificates,
    Certificate, MasterCertificate, MemoryCertificateStore, VerifiableCertificate,
};
use accord_auth::nonce::random_base64;
use accord_auth::types::{AuthMessage, MessageType, RequestedCertificateSet};
use accord_primitives::ec::PrivateKey;
use accord_wallet::types::Counterparty;
use accord_wallet::ProtoWallet;

fn key(val: u8) -> PrivateKey {
    let mut bytes = [0u8; 32];
    bytes[31] = val;
    PrivateKey::from_bytes(&bytes).unwrap()
}

fn plain_fields() -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("name".to_string(), "Alice Example".to_string());
    fields.insert("email".to_string(), "alice@example.com".to_string());
    fields
}

#[test]
fn sign_and_verify() {
    let certifier = ProtoWallet::new(key(7));
    let subject = key(42).public_key();

    let mut certificate = Certificate::new(
        "identity".into(),
        random_base64(32),
        subject,
        certifier.identity_key(),
        plain_fields(),
    );
    certificate.sign(&certifier).unwrap();
    assert!(!certificate.signature.is_empty());
    certificate.verify().unwrap();
}

#[test]
fn tampering_breaks_verification() {
    let certifier = ProtoWallet::new(key(7));
    let subject = key(42).public_key();

    let mut certificate = Certificate::new(
        "identity".into(),
        random_base64(32),
        subject,
        certifier.identity_key(),
        plain_fields(),
    );
    certificate.sign(&certifier).unwrap();

    certificate
        .fields
        .insert("name".to_string(), "Mallory".to_string());
    assert!(certificate.verify().is_err());
}

#[test]
fn unsigned_and_double_signed_are_rejected() {
    let certifier = ProtoWallet::new(key(7));
    let subject = key(42).public_key();

    let mut certificate = Certificate::new(
        "identity".into(),
        random_base64(32),
        subject,
        certifier.identity_key(),
        BTreeMap::new(),
    );
    assert!(certificate.verify().is_err());

    certificate.sign(&certifier).unwrap();
    assert!(certificate.sign(&certifier).is_err());
}

#[test]
fn issue_and_disclose_to_verifier() {
    let certifier = ProtoWallet::new(key(7));
    let subject_wallet = ProtoWallet::new(key(42));
    let verifier_wallet = ProtoWallet::new(key(69));

    let master = issue_certificate(
        &certifier,
        &subject_wallet.identity_key(),
        &plain_fields(),
        "identity",
        None,
    )
    .unwrap();
    master.certificate.verify().unwrap();

    // The subject reveals only the email.
    let keyring = keyring_for_verifier(
        &subject_wallet,
        &Counterparty::Other(certifier.identity_key()),
        &Counterparty::Other(verifier_wallet.identity_key()),
        &master,
        &["email".to_string()],
    )
    .unwrap();
    assert_eq!(keyring.len(), 1);

    let mut disclosed = VerifiableCertificate::new(master.certificate.clone(), keyring);
    let fields = disclosed.decrypt_fields(&verifier_wallet).unwrap();
    assert_eq!(fields.get("email").unwrap(), "alice@example.com");
    assert!(!fields.contains_key("name"));

    // A wallet that was not the disclosure target cannot decrypt.
    let outsider = ProtoWallet::new(key(99));
    let mut stolen = disclosed.clone();
    assert!(stolen.decrypt_fields(&outsider).is_err());
}

#[test]
fn keyring_requires_known_fields() {
    let certifier = ProtoWallet::new(key(7));
    let subject_wallet = ProtoWallet::new(key(42));

    let master = issue_certificate(
        &certifier,
        &subject_wallet.identity_key(),
        &plain_fields(),
        "identity",
        None,
    )
    .unwrap();

    let result = keyring_for_verifier(
        &subject_wallet,
        &Counterparty::Other(certifier.identity_key()),
        &Counterparty::Other(key(69).public_key()),
        &master,
        &["passport".to_string()],
    );
    assert!(result.is_err());
}

#[test]
fn master_keyring_must_cover_every_field() {
    let certifier = ProtoWallet::new(key(7));
    let subject = key(42).public_key();

    let mut certificate = Certificate::new(
        "identity".into(),
        random_base64(32),
        subject,
        certifier.identity_key(),
        plain_fields(),
    );
    certificate.sign(&certifier).unwrap();

    let mut partial_keyring = BTreeMap::new();
    partial_keyring.insert("name".to_string(), "sealed".to_string());
    assert!(MasterCertificate::new(certificate.clone(), partial_keyring).is_err());
    assert!(MasterCertificate::new(certificate, BTreeMap::new()).is_err());
}

#[test]
fn store_selection_filters_by_type_certifier_and_fields() {
    let certifier = ProtoWallet::new(key(7));
    let other_certifier = ProtoWallet::new(key(8));
    let subject_wallet = ProtoWallet::new(key(42));
    let subject = subject_wallet.identity_key();
    let verifier = key(69).public_key();

    let store = MemoryCertificateStore::new();
    store.add(issue_certificate(&certifier, &subject, &plain_fields(), "identity", None).unwrap());
    store.add(
        issue_certificate(&other_certifier, &subject, &plain_fields(), "identity", None).unwrap(),
    );
    store.add(issue_certificate(&certifier, &subject, &plain_fields(), "contact", None).unwrap());

    let mut request = RequestedCertificateSet::default();
    request.certifiers.push(certifier.identity_key());
    request
        .certificate_types
        .insert("identity".into(), vec!["name".into()]);

    let matches =
        get_verifiable_certificates(&subject_wallet, &store, &request, &verifier).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].certificate.certificate_type, "identity");
    assert_eq!(matches[0].certificate.certifier, certifier.identity_key());

    // Requesting a field no certificate carries matches nothing.
    let mut request = RequestedCertificateSet::default();
    request
        .certificate_types
        .insert("identity".into(), vec!["passport".into()]);
    let matches =
        get_verifiable_certificates(&subject_wallet, &store, &request, &verifier).unwrap();
    assert!(matches.is_empty());
}

#[test]
fn received_certificates_validate_against_the_request() {
    let certifier = ProtoWallet::new(key(7));
    let subject_wallet = ProtoWallet::new(key(42));
    let subject = subject_wallet.identity_key();
    let verifier_wallet = ProtoWallet::new(key(69));

    let master =
        issue_certificate(&certifier, &subject, &plain_fields(), "identity", None).unwrap();

    let mut request = RequestedCertificateSet::default();
    request.certifiers.push(certifier.identity_key());
    request
        .certificate_types
        .insert("identity".into(), vec!["email".into()]);

    let store = MemoryCertificateStore::new();
    store.add(master);
    let disclosed = get_verifiable_certificates(
        &subject_wallet,
        &store,
        &request,
        &verifier_wallet.identity_key(),
    )
    .unwrap();

    let mut message = AuthMessage::new(MessageType::CertificateResponse, subject);
    message.certificates = disclosed;

    validate_certificates(&verifier_wallet, &message, &request).unwrap();

    // A sender that is not the subject fails validation.
    let mut stolen = message.clone();
    stolen.identity_key = key(99).public_key();
    assert!(validate_certificates(&verifier_wallet, &stolen, &request).is_err());

    // An unrequested certifier fails validation.
    let mut strict = request.clone();
    strict.certifiers = vec![key(8).public_key()];
    assert!(validate_certificates(&verifier_wallet, &message, &strict).is_err());

    // An empty enclosure fails validation.
    let mut empty = message.clone();
    empty.certificates.clear();
    assert!(validate_certificates(&verifier_wallet, &empty, &request).is_err());
}
