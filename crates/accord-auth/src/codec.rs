//! Structural validation of inbound messages.
//!
//! Each message kind requires a specific subset of [`AuthMessage`]
//! fields; anything missing or empty is rejected before a processor
//! touches wallet or session state.

use crate::error::AuthError;
use crate::types::{AuthMessage, MessageType};

/// Check the kind-specific required fields of `message`.
///
/// | kind                | required                                           |
/// |---------------------|----------------------------------------------------|
/// | initialRequest      | initial_nonce                                      |
/// | initialResponse     | initial_nonce, your_nonce, signature               |
/// | certificateRequest  | nonce, your_nonce, requested_certificates, signature |
/// | certificateResponse | nonce, your_nonce, certificates, signature         |
/// | general             | nonce, your_nonce, payload, signature              |
///
/// The sender identity key is required for every kind and is present by
/// construction. Version checking happens in the dispatcher, which drops
/// mismatches instead of erroring.
pub fn validate(message: &AuthMessage) -> Result<(), AuthError> {
    let kind = message.message_type;
    let missing = |field: &'static str| AuthError::Malformed { kind, field };

    match kind {
        MessageType::InitialRequest => {
            if message.initial_nonce.is_empty() {
                return Err(missing("initial_nonce"));
            }
        }
        MessageType::InitialResponse => {
            if message.initial_nonce.is_empty() {
                return Err(missing("initial_nonce"));
            }
            if message.your_nonce.is_empty() {
                return Err(missing("your_nonce"));
            }
            if message.signature.is_empty() {
                return Err(missing("signature"));
            }
        }
        MessageType::CertificateRequest => {
            if message.nonce.is_empty() {
                return Err(missing("nonce"));
            }
            if message.your_nonce.is_empty() {
                return Err(missing("your_nonce"));
            }
            if message.requested_certificates.is_empty() {
                return Err(missing("requested_certificates"));
            }
            if message.signature.is_empty() {
                return Err(missing("signature"));
            }
        }
        MessageType::CertificateResponse => {
            if message.nonce.is_empty() {
                return Err(missing("nonce"));
            }
            if message.your_nonce.is_empty() {
                return Err(missing("your_nonce"));
            }
            if message.certificates.is_empty() {
                return Err(missing("certificates"));
            }
            if message.signature.is_empty() {
                return Err(missing("signature"));
            }
        }
        MessageType::General => {
            if message.nonce.is_empty() {
                return Err(missing("nonce"));
            }
            if message.your_nonce.is_empty() {
                return Err(missing("your_nonce"));
            }
            if message.payload.is_empty() {
                return Err(missing("payload"));
            }
            if message.signature.is_empty() {
                return Err(missing("signature"));
            }
        }
    }

    Ok(())
}
