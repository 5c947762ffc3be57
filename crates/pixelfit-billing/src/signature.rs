//! Stripe Webhook Signatures
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`.
//! The signed message is `"<t>.<raw body>"`, keyed with the endpoint secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed payload, matching Stripe's own libraries
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Parsed `stripe-signature` header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                // Undecodable entries can never match; skip them rather than fail
                "v1" => {
                    if let Ok(bytes) = hex::decode(value) {
                        signatures.push(bytes);
                    }
                }
                _ => {}
            }
        }

        match timestamp {
            Some(timestamp) if !signatures.is_empty() => Ok(Self {
                timestamp,
                signatures,
            }),
            _ => Err(PaymentError::WebhookSignature(
                "Unable to extract timestamp and signatures from header".into(),
            )),
        }
    }
}

/// Verifies payloads signed with one endpoint secret
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify against the current time
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<()> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verify as if the current time were `now` (unix seconds)
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<()> {
        let header = SignatureHeader::parse(header)?;

        let mac = self.mac(header.timestamp, payload)?;
        let matched = header
            .signatures
            .iter()
            .any(|candidate| mac.clone().verify_slice(candidate).is_ok());

        if !matched {
            return Err(PaymentError::WebhookSignature(
                "No signatures found matching the expected signature for payload".into(),
            ));
        }

        if now - header.timestamp > self.tolerance_secs {
            return Err(PaymentError::WebhookSignature(
                "Timestamp outside the tolerance zone".into(),
            ));
        }

        Ok(())
    }

    /// Produce a header value for `payload`, as Stripe would send it
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String> {
        let digest = self.mac(timestamp, payload)?.finalize().into_bytes();
        Ok(format!("t={},v1={}", timestamp, hex::encode(digest)))
    }

    fn mac(&self, timestamp: i64, payload: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| PaymentError::Config(format!("invalid webhook secret: {e}")))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

/// Sign `payload` with `secret` at the current time
pub fn sign_payload(payload: &[u8], secret: &str) -> Result<String> {
    SignatureVerifier::new(secret).sign(payload, chrono::Utc::now().timestamp())
}
