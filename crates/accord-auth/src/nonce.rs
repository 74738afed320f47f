//! Wallet-bound session nonces.
//!
//! A nonce is `base64(random_16 ‖ HMAC-SHA256(random_16))` with the HMAC
//! keyed inside the issuing wallet. The issuer can later recognize its
//! own nonces without storing them, which is how a peer detects replayed
//! or forged `your_nonce` values: it only accepts nonces it could have
//! minted itself.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;

use accord_wallet::types::{
    Counterparty, CreateHmacArgs, DerivationArgs, Protocol, SecurityLevel, VerifyHmacArgs,
};
use accord_wallet::Wallet;

use crate::error::AuthError;

const SEED_LEN: usize = 16;
const TAG_LEN: usize = 32;

fn nonce_derivation(seed: &[u8]) -> DerivationArgs {
    DerivationArgs {
        protocol: Protocol::new(SecurityLevel::App, "session nonce"),
        key_id: BASE64.encode(seed),
        counterparty: Counterparty::Myself,
    }
}

/// Random bytes of the given length, base64 encoded.
pub fn random_base64(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64.encode(&bytes)
}

/// Mint a fresh nonce bound to `wallet`.
pub fn create_nonce(wallet: &dyn Wallet) -> Result<String, AuthError> {
    let mut seed = [0u8; SEED_LEN];
    rand::thread_rng().fill_bytes(&mut seed);

    let result = wallet.create_hmac(CreateHmacArgs {
        derivation: nonce_derivation(&seed),
        data: seed.to_vec(),
    })?;

    let mut combined = Vec::with_capacity(SEED_LEN + TAG_LEN);
    combined.extend_from_slice(&seed);
    combined.extend_from_slice(&result.hmac);
    Ok(BASE64.encode(&combined))
}

/// Check whether `nonce` was minted by `wallet` via [`create_nonce`].
///
/// Malformed input (bad base64, wrong length) is an error; a well-formed
/// nonce with a wrong tag is `Ok(false)`.
pub fn verify_nonce(nonce: &str, wallet: &dyn Wallet) -> Result<bool, AuthError> {
    let bytes = BASE64.decode(nonce)?;
    if bytes.len() != SEED_LEN + TAG_LEN {
        return Err(AuthError::NonceRejected);
    }

    let seed = &bytes[..SEED_LEN];
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&bytes[SEED_LEN..]);

    let result = wallet.verify_hmac(VerifyHmacArgs {
        derivation: nonce_derivation(seed),
        data: seed.to_vec(),
        hmac: tag,
    })?;
    Ok(result.valid)
}
