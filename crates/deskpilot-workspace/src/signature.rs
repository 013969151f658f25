// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification.
//!
//! Inbound webhooks carry `X-Deskpilot-Timestamp` and
//! `X-Deskpilot-Signature` headers. The signature is an HMAC-SHA256 over
//! `"{timestamp}:{body}"` with a shared secret, hex-encoded with a `v1=`
//! prefix. Timestamps outside the skew window are rejected to prevent
//! replay. Verification happens before any state is touched.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted clock skew between sender and receiver, seconds.
pub const MAX_SKEW_SECS: i64 = 300;

/// Computes the signature header value for a payload.
pub fn sign(secret: &str, timestamp: &str, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body.as_bytes());
    format!("v1={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a signature header against the payload.
///
/// `now_unix` is the receiver's current unix time; `timestamp` must be a
/// unix-seconds string within [`MAX_SKEW_SECS`]. Comparison is
/// constant-time via the MAC verifier.
pub fn verify(
    secret: &str,
    timestamp: &str,
    body: &str,
    signature: &str,
    now_unix: i64,
) -> bool {
    let Ok(sent_at) = timestamp.parse::<i64>() else {
        return false;
    };
    if (now_unix - sent_at).abs() > MAX_SKEW_SECS {
        return false;
    }

    let Some(hex_part) = signature.strip_prefix("v1=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_part) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "shhh";
    const NOW: i64 = 1_770_000_000;

    #[test]
    fn sign_verify_round_trip() {
        let ts = NOW.to_string();
        let sig = sign(SECRET, &ts, r#"{"text":"hi"}"#);
        assert!(verify(SECRET, &ts, r#"{"text":"hi"}"#, &sig, NOW));
    }

    #[test]
    fn wrong_secret_fails() {
        let ts = NOW.to_string();
        let sig = sign(SECRET, &ts, "body");
        assert!(!verify("other", &ts, "body", &sig, NOW));
    }

    #[test]
    fn tampered_body_fails() {
        let ts = NOW.to_string();
        let sig = sign(SECRET, &ts, "body");
        assert!(!verify(SECRET, &ts, "tampered", &sig, NOW));
    }

    #[test]
    fn stale_timestamp_fails() {
        let ts = (NOW - MAX_SKEW_SECS - 1).to_string();
        let sig = sign(SECRET, &ts, "body");
        assert!(!verify(SECRET, &ts, "body", &sig, NOW));
    }

    #[test]
    fn future_timestamp_within_skew_passes() {
        let ts = (NOW + 30).to_string();
        let sig = sign(SECRET, &ts, "body");
        assert!(verify(SECRET, &ts, "body", &sig, NOW));
    }

    #[test]
    fn malformed_inputs_fail_closed() {
        assert!(!verify(SECRET, "not-a-number", "body", "v1=00", NOW));
        let ts = NOW.to_string();
        assert!(!verify(SECRET, &ts, "body", "missing-prefix", NOW));
        assert!(!verify(SECRET, &ts, "body", "v1=zznothex", NOW));
    }
}
