//! Tests for wallet-bound nonce creation and verification.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use accord_auth::nonce::{create_nonce, random_base64, verify_nonce};
use accord_primitives::ec::PrivateKey;
use accord_wallet::ProtoWallet;

#[test]
fn random_base64_length_and_uniqueness() {
    let one = random_base64(32);
    let two = random_base64(32);
    assert_ne!(one, two);
    assert_eq!(BASE64.decode(&one).unwrap().len(), 32);
}

#[test]
fn own_nonce_verifies() {
    let wallet = ProtoWallet::new(PrivateKey::random());
    let nonce = create_nonce(&wallet).unwrap();
    assert!(verify_nonce(&nonce, &wallet).unwrap());
}

#[test]
fn foreign_nonce_does_not_verify() {
    let minter = ProtoWallet::new(PrivateKey::random());
    let other = ProtoWallet::new(PrivateKey::random());
    let nonce = create_nonce(&minter).unwrap();
    assert!(!verify_nonce(&nonce, &other).unwrap());
}

#[test]
fn tampered_nonce_does_not_verify() {
    let wallet = ProtoWallet::new(PrivateKey::random());
    let nonce = create_nonce(&wallet).unwrap();

    let mut bytes = BASE64.decode(&nonce).unwrap();
    bytes[0] ^= 0x01;
    let tampered = BASE64.encode(&bytes);
    assert!(!verify_nonce(&tampered, &wallet).unwrap());
}

#[test]
fn malformed_nonce_is_an_error() {
    let wallet = ProtoWallet::new(PrivateKey::random());
    assert!(verify_nonce("not base64!!!", &wallet).is_err());
    assert!(verify_nonce(&BASE64.encode([0u8; 8]), &wallet).is_err());
}

#[test]
fn nonces_are_unique() {
    let wallet = ProtoWallet::new(PrivateKey::random());
    let one = create_nonce(&wallet).unwrap();
    let two = create_nonce(&wallet).unwrap();
    assert_ne!(one, two);
    assert!(verify_nonce(&one, &wallet).unwrap());
    assert!(verify_nonce(&two, &wallet).unwrap());
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        // Strings the wallet never minted must never verify, whatever
        // their shape; malformed input errors rather than panics.
        #[test]
        fn arbitrary_strings_never_verify(input in "[A-Za-z0-9+/=]{0,96}") {
            let wallet = ProtoWallet::new(PrivateKey::random());
            if let Ok(valid) = verify_nonce(&input, &wallet) {
                prop_assert!(!valid);
            }
        }
    }
}
