//! Payment processor webhooks.
//!
//! Signature header format: `t=<unix seconds>,v1=<hex hmac>[,v1=...]` where the
//! HMAC-SHA256 is computed over `"{t}.{raw body}"` with the endpoint secret.

use std::collections::HashMap;
use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::PaymentError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Verify a webhook signature header against the raw payload.
///
/// Any one matching `v1` entry is accepted. `now` is unix seconds.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` if the header is malformed, the
/// timestamp is outside `tolerance`, or no signature matches.
pub fn verify_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(PaymentError::InvalidSignature("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature("missing v1 signature"));
    }
    if now.abs_diff(timestamp) > tolerance.as_secs() {
        return Err(PaymentError::InvalidSignature("timestamp outside tolerance"));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::InvalidSignature("unusable secret"))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.into_iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });

    if matched {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature("no matching signature"))
    }
}

/// A webhook event envelope. Only checkout session events carry data we use.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: SessionObject,
}

/// The checkout session object inside an event.
#[derive(Debug, Deserialize)]
pub struct SessionObject {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub payment_status: Option<String>,
}

impl WebhookEvent {
    /// Parse an event from the raw (already verified) body.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidPayload` if the body isn't an event.
    pub fn parse(payload: &[u8]) -> Result<Self, PaymentError> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Sign a payload the way the processor does.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const TOLERANCE: Duration = Duration::from_secs(300);
    const NOW: i64 = 1_800_000_000;

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, SECRET, NOW);
        assert!(verify_signature(&header, payload, SECRET, TOLERANCE, NOW + 10).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let header = sign(br#"{"id":"evt_1"}"#, SECRET, NOW);
        let result = verify_signature(&header, br#"{"id":"evt_2"}"#, SECRET, TOLERANCE, NOW);
        assert!(matches!(result, Err(PaymentError::InvalidSignature("no matching signature"))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"{}";
        let header = sign(payload, "whsec_other", NOW);
        assert!(verify_signature(&header, payload, SECRET, TOLERANCE, NOW).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = b"{}";
        let header = sign(payload, SECRET, NOW - 301);
        let result = verify_signature(&header, payload, SECRET, TOLERANCE, NOW);
        assert!(matches!(result, Err(PaymentError::InvalidSignature("timestamp outside tolerance"))));
    }

    #[test]
    fn test_any_matching_v1_accepted() {
        let payload = b"{}";
        let good = sign(payload, SECRET, NOW);
        let v1 = good.split_once(",v1=").unwrap().1;
        let header = format!("t={NOW},v1=deadbeef,v1={v1}");
        assert!(verify_signature(&header, payload, SECRET, TOLERANCE, NOW).is_ok());
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_signature("garbage", b"{}", SECRET, TOLERANCE, NOW).is_err());
        assert!(verify_signature("t=abc,v1=00", b"{}", SECRET, TOLERANCE, NOW).is_err());
        assert!(verify_signature(&format!("t={NOW}"), b"{}", SECRET, TOLERANCE, NOW).is_err());
    }

    #[test]
    fn test_parse_session_completed() {
        let payload = br#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_1",
                "payment_status": "paid",
                "metadata": {"orderIds": "a,b", "userId": "user_1", "appId": "marketplace"}
            }}
        }"#;
        let event = WebhookEvent::parse(payload).unwrap();
        assert_eq!(event.kind, "checkout.session.completed");
        assert_eq!(event.data.object.metadata["orderIds"], "a,b");
        assert_eq!(event.data.object.payment_status.as_deref(), Some("paid"));
    }
}
