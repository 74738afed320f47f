//! The wallet interface the protocol core consumes.

use crate::error::WalletError;
use crate::types::*;

/// Cryptographic operations the accord core requires from a wallet.
///
/// Every operation derives its working key from `(protocol, key_id,
/// counterparty)`, so two wallets that agree on those parameters can
/// verify each other's signatures and HMACs without sharing secrets.
pub trait Wallet: Send + Sync {
    fn get_public_key(&self, args: GetPublicKeyArgs) -> Result<GetPublicKeyResult, WalletError>;

    fn create_signature(
        &self,
        args: CreateSignatureArgs,
    ) -> Result<CreateSignatureResult, WalletError>;
    fn verify_signature(
        &self,
        args: VerifySignatureArgs,
    ) -> Result<VerifySignatureResult, WalletError>;

    fn create_hmac(&self, args: CreateHmacArgs) -> Result<CreateHmacResult, WalletError>;
    fn verify_hmac(&self, args: VerifyHmacArgs) -> Result<VerifyHmacResult, WalletError>;

    fn encrypt(&self, args: EncryptArgs) -> Result<EncryptResult, WalletError>;
    fn decrypt(&self, args: DecryptArgs) -> Result<DecryptResult, WalletError>;
}
