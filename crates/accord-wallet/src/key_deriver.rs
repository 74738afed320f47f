//! Two-party key derivation from a root private key.
//!
//! Every derived key is offset from the root by an HMAC over a
//! derivation string `"{level}-{protocol}-{key_id}"`, computed under the
//! ECDH shared secret with the counterparty. Both parties can therefore
//! derive the same child key pair, one holding the private half and the
//! other the public half, which is what lets a signature bind a specific
//! `(protocol, key_id, counterparty)` triple.

use accord_primitives::ec::{PrivateKey, PublicKey, SymmetricKey};

use crate::error::WalletError;
use crate::types::{anyone_key, Counterparty, Protocol};

/// Derives private, public, and symmetric keys from a root private key.
#[derive(Clone, Debug)]
pub struct KeyDeriver {
    root: PrivateKey,
}

impl KeyDeriver {
    pub fn new(root: PrivateKey) -> Self {
        KeyDeriver { root }
    }

    /// A deriver rooted at the well-known "anyone" key.
    pub fn anyone() -> Self {
        KeyDeriver { root: anyone_key() }
    }

    /// The root key's public half, which serves as the identity key.
    pub fn identity_key(&self) -> PublicKey {
        self.root.public_key()
    }

    /// Derive the private key for `(protocol, key_id, counterparty)`.
    pub fn derive_private_key(
        &self,
        protocol: &Protocol,
        key_id: &str,
        counterparty: &Counterparty,
    ) -> Result<PrivateKey, WalletError> {
        let other = self.resolve(counterparty);
        let tag = derivation_string(protocol, key_id)?;
        Ok(self.root.derive_child(&other, &tag)?)
    }

    /// Derive a public key for `(protocol, key_id, counterparty)`.
    ///
    /// With `for_self` false this is the counterparty's child key, the
    /// key their signatures verify under. With `for_self` true it is the
    /// public half of our own derived private key.
    pub fn derive_public_key(
        &self,
        protocol: &Protocol,
        key_id: &str,
        counterparty: &Counterparty,
        for_self: bool,
    ) -> Result<PublicKey, WalletError> {
        let other = self.resolve(counterparty);
        let tag = derivation_string(protocol, key_id)?;

        if for_self {
            Ok(self.root.derive_child(&other, &tag)?.public_key())
        } else {
            Ok(other.derive_child(&self.root, &tag)?)
        }
    }

    /// Derive the shared symmetric key for `(protocol, key_id, counterparty)`.
    ///
    /// The key is the x-coordinate of the ECDH point between the two
    /// derived child keys, so both parties compute the same value.
    pub fn derive_symmetric_key(
        &self,
        protocol: &Protocol,
        key_id: &str,
        counterparty: &Counterparty,
    ) -> Result<SymmetricKey, WalletError> {
        // "anyone" needs a concrete point on the public side of the ECDH.
        let counterparty = match counterparty {
            Counterparty::Anyone => Counterparty::Other(anyone_key().public_key()),
            c => c.clone(),
        };

        let child_pub = self.derive_public_key(protocol, key_id, &counterparty, false)?;
        let child_priv = self.derive_private_key(protocol, key_id, &counterparty)?;
        let shared = child_priv.shared_secret(&child_pub)?;

        // Compressed point is prefix byte + 32-byte x-coordinate.
        Ok(SymmetricKey::new(&shared.to_bytes()[1..]))
    }

    fn resolve(&self, counterparty: &Counterparty) -> PublicKey {
        match counterparty {
            Counterparty::Myself => self.root.public_key(),
            Counterparty::Anyone => anyone_key().public_key(),
            Counterparty::Other(key) => *key,
        }
    }
}

/// Build and validate the derivation string `"{level}-{protocol}-{key_id}"`.
fn derivation_string(protocol: &Protocol, key_id: &str) -> Result<String, WalletError> {
    if key_id.is_empty() {
        return Err(WalletError::InvalidKeyId(
            "key IDs must be 1 character or more".into(),
        ));
    }
    if key_id.len() > 800 {
        return Err(WalletError::InvalidKeyId(
            "key IDs must be 800 characters or less".into(),
        ));
    }

    let name = protocol.name.trim().to_lowercase();
    if name.len() < 5 {
        return Err(WalletError::InvalidProtocol(
            "protocol names must be 5 characters or more".into(),
        ));
    }
    if name.len() > 400 {
        return Err(WalletError::InvalidProtocol(
            "protocol names must be 400 characters or less".into(),
        ));
    }
    if name.contains("  ") {
        return Err(WalletError::InvalidProtocol(
            "protocol names cannot contain consecutive spaces".into(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' ')
    {
        return Err(WalletError::InvalidProtocol(
            "protocol names can only contain letters, numbers and spaces".into(),
        ));
    }
    if name.ends_with(" protocol") {
        return Err(WalletError::InvalidProtocol(
            "protocol names must not end with \" protocol\"".into(),
        ));
    }

    Ok(format!("{}-{}-{}", protocol.level as u8, name, key_id))
}
