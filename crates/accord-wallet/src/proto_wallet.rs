//! In-memory wallet over a single root key.

use accord_primitives::ec::{PrivateKey, PublicKey};
use accord_primitives::hash::{hmac_sha256, sha256};

use crate::error::WalletError;
use crate::key_deriver::KeyDeriver;
use crate::types::*;
use crate::wallet_trait::Wallet;

/// A wallet holding one root private key, with every operation keyed by
/// derivation. Suitable as a session identity for a [`Peer`]; holds no
/// transaction or persistence machinery.
///
/// [`Peer`]: https://docs.rs/accord-auth
#[derive(Clone, Debug)]
pub struct ProtoWallet {
    deriver: KeyDeriver,
}

impl ProtoWallet {
    pub fn new(root: PrivateKey) -> Self {
        ProtoWallet {
            deriver: KeyDeriver::new(root),
        }
    }

    /// A wallet rooted at the well-known "anyone" key, for verifying
    /// material addressed to no one in particular.
    pub fn anyone() -> Self {
        ProtoWallet {
            deriver: KeyDeriver::anyone(),
        }
    }

    /// The wallet's long-lived identity key.
    pub fn identity_key(&self) -> PublicKey {
        self.deriver.identity_key()
    }
}

impl Wallet for ProtoWallet {
    fn get_public_key(&self, args: GetPublicKeyArgs) -> Result<GetPublicKeyResult, WalletError> {
        if args.identity_key {
            return Ok(GetPublicKeyResult {
                public_key: self.deriver.identity_key(),
            });
        }

        if args.derivation.protocol.name.is_empty() || args.derivation.key_id.is_empty() {
            return Err(WalletError::InvalidArgument(
                "protocol and key_id are required unless identity_key is set".into(),
            ));
        }

        let public_key = self.deriver.derive_public_key(
            &args.derivation.protocol,
            &args.derivation.key_id,
            &args.derivation.counterparty,
            args.for_self,
        )?;
        Ok(GetPublicKeyResult { public_key })
    }

    fn create_signature(
        &self,
        args: CreateSignatureArgs,
    ) -> Result<CreateSignatureResult, WalletError> {
        let digest = sha256(&args.data);
        let key = self.deriver.derive_private_key(
            &args.derivation.protocol,
            &args.derivation.key_id,
            &args.derivation.counterparty,
        )?;
        let signature = key.sign(&digest)?;
        Ok(CreateSignatureResult { signature })
    }

    fn verify_signature(
        &self,
        args: VerifySignatureArgs,
    ) -> Result<VerifySignatureResult, WalletError> {
        if args.data.is_empty() {
            return Err(WalletError::InvalidArgument(
                "data to verify must not be empty".into(),
            ));
        }

        let digest = sha256(&args.data);
        let key = self.deriver.derive_public_key(
            &args.derivation.protocol,
            &args.derivation.key_id,
            &args.derivation.counterparty,
            args.for_self,
        )?;
        Ok(VerifySignatureResult {
            valid: args.signature.verify(&digest, &key),
        })
    }

    fn create_hmac(&self, args: CreateHmacArgs) -> Result<CreateHmacResult, WalletError> {
        let key = self.deriver.derive_symmetric_key(
            &args.derivation.protocol,
            &args.derivation.key_id,
            &args.derivation.counterparty,
        )?;
        Ok(CreateHmacResult {
            hmac: hmac_sha256(key.to_bytes(), &args.data),
        })
    }

    fn verify_hmac(&self, args: VerifyHmacArgs) -> Result<VerifyHmacResult, WalletError> {
        let key = self.deriver.derive_symmetric_key(
            &args.derivation.protocol,
            &args.derivation.key_id,
            &args.derivation.counterparty,
        )?;
        let expected = hmac_sha256(key.to_bytes(), &args.data);
        Ok(VerifyHmacResult {
            valid: expected == args.hmac,
        })
    }

    fn encrypt(&self, args: EncryptArgs) -> Result<EncryptResult, WalletError> {
        let key = self.deriver.derive_symmetric_key(
            &args.derivation.protocol,
            &args.derivation.key_id,
            &args.derivation.counterparty,
        )?;
        Ok(EncryptResult {
            ciphertext: key.encrypt(&args.plaintext)?,
        })
    }

    fn decrypt(&self, args: DecryptArgs) -> Result<DecryptResult, WalletError> {
        let key = self.deriver.derive_symmetric_key(
            &args.derivation.protocol,
            &args.derivation.key_id,
            &args.derivation.counterparty,
        )?;
        Ok(DecryptResult {
            plaintext: key.decrypt(&args.ciphertext)?,
        })
    }
}
