//! Webhook request signature verification.
//!
//! The platform signs each webhook delivery with
//! `v0=HMAC_SHA256(secret, "v0:{timestamp}:{body}")`. Requests older than
//! the drift window are rejected outright to blunt replay.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signature version prefix on the basestring and the header value.
const VERSION: &str = "v0";

/// Maximum allowed age of a signed request, in seconds.
pub const MAX_TIMESTAMP_DRIFT_SECS: i64 = 300;

/// Verify a webhook signature.
///
/// `timestamp` is the signing timestamp header (unix seconds, as sent),
/// `body` the raw request bytes, `signature` the `v0=<hex>` header value,
/// and `now_unix` the receiver's clock. Comparison is constant-time via
/// the HMAC verify primitive.
pub fn verify_signature(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now_unix: i64,
) -> bool {
    let Ok(ts) = timestamp.parse::<i64>() else {
        return false;
    };
    if (now_unix - ts).abs() > MAX_TIMESTAMP_DRIFT_SECS {
        return false;
    }

    let Some(hex_sig) = signature.strip_prefix(&format!("{VERSION}=")) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(format!("{VERSION}:{timestamp}:").as_bytes());
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Produce the `v0=<hex>` signature for a request. Used by tests and any
/// outbound callback we may need to sign.
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(format!("{VERSION}:{timestamp}:").as_bytes());
    mac.update(body);
    format!("{VERSION}={}", hex::encode(mac.finalize().into_bytes()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
