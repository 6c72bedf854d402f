use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, warn};

use crate::configuration::PaymentSettings;

type HmacSha256 = Hmac<Sha256>;

/// Why an inbound webhook was refused. These are the only failures that ever
/// reach the payment processor as a non-2xx.
#[derive(Debug, Error, PartialEq)]
pub enum SignatureError {
    #[error("No signatures found matching the expected signature for payload")]
    Mismatch,

    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,

    #[error("Missing signature header")]
    MissingHeader,

    #[error("Timestamp outside the tolerance zone")]
    Expired,

    #[error("Webhook signing secret is not configured")]
    NotConfigured,
}

/// How inbound webhook payloads are authenticated
#[derive(Clone)]
pub enum WebhookVerifier {
    /// HMAC-SHA256 over `"{timestamp}.{payload}"`, header `t=..,v1=..`
    Signed { secret: String, tolerance_seconds: i64 },
    /// Development mode, payloads are trusted as they arrive
    Unsigned,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signed {
                tolerance_seconds, ..
            } => f
                .debug_struct("Signed")
                .field("tolerance_seconds", tolerance_seconds)
                .finish_non_exhaustive(),
            Self::Unsigned => f.write_str("Unsigned"),
        }
    }
}

impl WebhookVerifier {
    /// Unsigned mode has to be asked for explicitly, a missing secret on its
    /// own refuses to start
    pub fn from_settings(settings: &PaymentSettings) -> Result<Self, SignatureError> {
        match settings.webhook_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Ok(Self::Signed {
                secret: secret.to_string(),
                tolerance_seconds: settings.signature_tolerance_seconds,
            }),
            _ if settings.allow_unsigned_webhooks => {
                warn!("no webhook secret configured, unsigned webhook payloads will be accepted");
                Ok(Self::Unsigned)
            }
            _ => Err(SignatureError::NotConfigured),
        }
    }

    #[tracing::instrument(skip(self, payload, header))]
    pub fn verify(&self, payload: &[u8], header: Option<&str>, now: i64) -> Result<(), SignatureError> {
        match self {
            Self::Unsigned => {
                warn!("accepting unsigned webhook payload");
                Ok(())
            }
            Self::Signed {
                secret,
                tolerance_seconds,
            } => {
                let header = header.ok_or(SignatureError::MissingHeader)?;
                let (timestamp, signatures) = parse_header(header)?;
                let mut matched = false;
                for signature in signatures {
                    let mac = signed_mac(secret, payload, timestamp)?;
                    if mac.verify_slice(&signature).is_ok() {
                        matched = true;
                        break;
                    }
                }
                if !matched {
                    return Err(SignatureError::Mismatch);
                }
                if now.abs_diff(timestamp) > tolerance_seconds.unsigned_abs() {
                    return Err(SignatureError::Expired);
                }
                debug!("webhook signature verified");
                Ok(())
            }
        }
    }
}

/// Splits `t=..,v1=..[,v1=..]`. Unknown schemes are skipped, undecodable
/// `v1` values are ignored.
fn parse_header(header: &str) -> Result<(i64, Vec<Vec<u8>>), SignatureError> {
    let mut timestamp = None;
    let mut signatures = vec![];
    for part in header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(value)) => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::MalformedHeader)?,
                );
            }
            (Some("v1"), Some(value)) => {
                if let Ok(signature) = hex::decode(value) {
                    signatures.push(signature);
                }
            }
            _ => {}
        }
    }
    match timestamp {
        Some(timestamp) if !signatures.is_empty() => Ok((timestamp, signatures)),
        _ => Err(SignatureError::MalformedHeader),
    }
}

fn signed_mac(secret: &str, payload: &[u8], timestamp: i64) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::NotConfigured)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Builds a header the way the payment processor signs its deliveries
pub fn sign_payload(secret: &str, payload: &[u8], timestamp: i64) -> Result<String, SignatureError> {
    let mac = signed_mac(secret, payload, timestamp)?;
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}
