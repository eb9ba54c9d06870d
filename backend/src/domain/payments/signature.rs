//! Gateway callback signature verification.
//!
//! The gateway signs `"{order_id}|{payment_id}"` with HMAC-SHA256 keyed by the
//! merchant secret and hex encodes the digest. The amount is never part of
//! the signed message; the credited amount always comes from the stored
//! payment record.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Server-held secret that never leaves the process.
///
/// `Debug` output is redacted and the backing buffer is zeroed on drop.
#[derive(Clone)]
pub struct GatewaySecret(Zeroizing<String>);

impl GatewaySecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for GatewaySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GatewaySecret(**redacted**)")
    }
}

/// Verifies gateway payment signatures.
///
/// # Examples
/// ```
/// use voicepost_backend::domain::{GatewaySecret, PaymentSignatureVerifier};
///
/// let verifier = PaymentSignatureVerifier::new(GatewaySecret::new("secret"));
/// let signature = verifier.sign("order_1", "pay_1");
/// assert!(verifier.verify("order_1", "pay_1", &signature));
/// assert!(!verifier.verify("order_1", "pay_2", &signature));
/// ```
#[derive(Debug, Clone)]
pub struct PaymentSignatureVerifier {
    secret: GatewaySecret,
}

impl PaymentSignatureVerifier {
    pub fn new(secret: GatewaySecret) -> Self {
        Self { secret }
    }

    fn mac_for(&self, order_id: &str, payment_id: &str) -> HmacSha256 {
        #[expect(clippy::expect_used, reason = "HMAC accepts keys of any length")]
        let mut mac = HmacSha256::new_from_slice(self.secret.expose().as_bytes())
            .expect("HMAC key of any length");
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        mac
    }

    /// Compute the hex signature the gateway would send for this pair.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        hex::encode(self.mac_for(order_id, payment_id).finalize().into_bytes())
    }

    /// Check a hex signature in constant time.
    ///
    /// Malformed hex never verifies.
    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let Ok(provided) = hex::decode(signature.trim()) else {
            return false;
        };
        self.mac_for(order_id, payment_id)
            .verify_slice(&provided)
            .is_ok()
    }
}
