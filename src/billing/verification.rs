//! Webhook signature verification.
//!
//! The billing provider signs each delivery with an HMAC-SHA256 over
//! `"{timestamp}.{body}"` and sends it as a `t=<unix>,v1=<hex>` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("signature header is missing a timestamp")]
    MissingTimestamp,

    #[error("signature header is missing a v1 signature")]
    MissingSignature,

    #[error("signature header is malformed")]
    MalformedHeader,

    #[error("webhook timestamp outside tolerance window")]
    TimestampOutOfTolerance,

    #[error("webhook signature mismatch")]
    SignatureMismatch,
}

/// Verifies provider signatures on raw webhook bodies.
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

struct SignatureParts {
    timestamp: i64,
    signature: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// Verify a delivery against the current clock.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<(), VerificationError> {
        let now = chrono::Utc::now().timestamp();
        self.verify_at(payload, signature_header, now)
    }

    /// Verify a delivery against an explicit clock reading.
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now_unix: i64,
    ) -> Result<(), VerificationError> {
        let parts = parse_signature_header(signature_header)?;

        if (now_unix - parts.timestamp).abs() > self.tolerance_secs {
            return Err(VerificationError::TimestampOutOfTolerance);
        }

        let signed_payload = format!("{}.{}", parts.timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| VerificationError::MalformedHeader)?;
        mac.update(signed_payload.as_bytes());
        let expected = mac.finalize().into_bytes();

        let provided = hex::decode(&parts.signature)
            .map_err(|_| VerificationError::SignatureMismatch)?;

        // Constant-time comparison
        if expected.as_slice().ct_eq(provided.as_slice()).unwrap_u8() != 1 {
            return Err(VerificationError::SignatureMismatch);
        }

        Ok(())
    }
}

fn parse_signature_header(header: &str) -> Result<SignatureParts, VerificationError> {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<String> = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => {
                timestamp = Some(v.parse().map_err(|_| VerificationError::MalformedHeader)?);
            }
            Some(("v1", v)) => {
                signature = Some(v.to_string());
            }
            // Unknown scheme versions are skipped, anything else is garbage
            Some((k, _)) if k.starts_with('v') => {}
            _ => return Err(VerificationError::MalformedHeader),
        }
    }

    let timestamp = timestamp.ok_or(VerificationError::MissingTimestamp)?;
    let signature = signature.ok_or(VerificationError::MissingSignature)?;

    Ok(SignatureParts { timestamp, signature })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let verifier = WebhookVerifier::new("whsec_test", 300);
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let now = 1_700_000_000;
        let header = format!("t={},v1={}", now, sign(payload, "whsec_test", now));

        assert_eq!(verifier.verify_at(payload, &header, now), Ok(()));
    }

    #[test]
    fn rejects_wrong_secret() {
        let verifier = WebhookVerifier::new("whsec_test", 300);
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let now = 1_700_000_000;
        let header = format!("t={},v1={}", now, sign(payload, "other_secret", now));

        assert_eq!(
            verifier.verify_at(payload, &header, now),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let verifier = WebhookVerifier::new("whsec_test", 300);
        let payload = b"{}";
        let then = 1_700_000_000;
        let header = format!("t={},v1={}", then, sign(payload, "whsec_test", then));

        assert_eq!(
            verifier.verify_at(payload, &header, then + 600),
            Err(VerificationError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn rejects_missing_parts() {
        let verifier = WebhookVerifier::new("whsec_test", 300);

        assert_eq!(
            verifier.verify_at(b"{}", "v1=abc", 0),
            Err(VerificationError::MissingTimestamp)
        );
        assert_eq!(
            verifier.verify_at(b"{}", "t=123", 123),
            Err(VerificationError::MissingSignature)
        );
        assert_eq!(
            verifier.verify_at(b"{}", "garbage", 0),
            Err(VerificationError::MalformedHeader)
        );
    }
}
