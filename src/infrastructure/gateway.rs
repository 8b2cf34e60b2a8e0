//! Payment gateway signature check.
//!
//! The gateway signs `"{gateway_order_id}|{gateway_payment_id}"` with the
//! shared secret using HMAC-SHA256 and sends the lowercase hex digest.

use std::fmt;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::ports::PaymentSignatureVerifier;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct HmacSignatureVerifier {
    secret: Arc<[u8]>,
}

impl HmacSignatureVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    fn mac(&self, gateway_order_id: &str, gateway_payment_id: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(gateway_order_id.as_bytes());
        mac.update(b"|");
        mac.update(gateway_payment_id.as_bytes());
        Some(mac)
    }

    /// Hex signature the gateway would send for this pair.
    pub fn sign(&self, gateway_order_id: &str, gateway_payment_id: &str) -> String {
        self.mac(gateway_order_id, gateway_payment_id)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default()
    }
}

impl PaymentSignatureVerifier for HmacSignatureVerifier {
    fn verify(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };
        self.mac(gateway_order_id, gateway_payment_id)
            .is_some_and(|mac| mac.verify_slice(&expected).is_ok())
    }
}

impl fmt::Debug for HmacSignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}
