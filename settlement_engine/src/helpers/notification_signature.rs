//! Gateway notifications are signed with `SHA-512(order_id ‖ status_code ‖ gross_amount ‖ server_key)`, hex-encoded
//! in lower case. The fields are concatenated exactly as received, so `gross_amount` keeps its decimal places.
use sha2::{Digest, Sha512};

pub fn notification_signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks the signature in constant time. An empty server key never verifies.
pub fn verify_notification_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
    signature: &str,
) -> bool {
    if server_key.is_empty() {
        return false;
    }
    let expected = notification_signature(order_id, status_code, gross_amount, server_key);
    let signature = signature.trim().to_ascii_lowercase();
    if expected.len() != signature.len() {
        return false;
    }
    expected.bytes().zip(signature.bytes()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}
