use crate::error::VerificationError;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use http::HeaderMap;
use sha2::Sha256;
use std::io;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Slack-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";

const SIGNATURE_VERSION: &str = "v0";
const SIGNATURE_PREFIX: &str = "v0=";
const DEFAULT_TOLERANCE_SECS: i64 = 60 * 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Maximum distance between the request timestamp and the local clock.
    /// `None` turns the replay check off.
    pub tolerance: Option<Duration>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        VerifyOptions {
            tolerance: Some(Duration::seconds(DEFAULT_TOLERANCE_SECS)),
        }
    }
}

/// Running HMAC-SHA256 over `v0:<timestamp>:<body>`.
///
/// The headers are checked up front; body bytes are fed through [`update`](Self::update)
/// or the [`io::Write`] impl as they are read, and [`ensure`](Self::ensure) settles the
/// outcome once the body is exhausted.
pub struct SecretsVerifier {
    mac: HmacSha256,
    expected: Vec<u8>,
}

impl SecretsVerifier {
    pub fn new(headers: &HeaderMap, secret: impl AsRef<[u8]>) -> Result<Self, VerificationError> {
        Self::with_options(headers, secret, &VerifyOptions::default())
    }

    pub fn with_options(
        headers: &HeaderMap,
        secret: impl AsRef<[u8]>,
        options: &VerifyOptions,
    ) -> Result<Self, VerificationError> {
        let signature = header_value(headers, SIGNATURE_HEADER)?;
        let timestamp = header_value(headers, TIMESTAMP_HEADER)?;

        let request_time: i64 = timestamp
            .parse()
            .map_err(|_| VerificationError::MalformedTimestamp(timestamp.to_string()))?;

        let expected = signature
            .strip_prefix(SIGNATURE_PREFIX)
            .and_then(|digest| hex::decode(digest).ok())
            .ok_or(VerificationError::MalformedSignature)?;

        if let Some(tolerance) = options.tolerance {
            let now = Utc::now().timestamp();
            if now.abs_diff(request_time) > tolerance.num_seconds().unsigned_abs() {
                warn!(request_time, now, "rejecting stale slack request");
                return Err(VerificationError::StaleTimestamp {
                    timestamp: request_time,
                    tolerance_secs: tolerance.num_seconds(),
                });
            }
        }

        let mut mac = keyed_mac(secret.as_ref())?;
        mac.update(format!("{}:{}:", SIGNATURE_VERSION, timestamp).as_bytes());

        Ok(SecretsVerifier { mac, expected })
    }

    pub fn update(&mut self, data: &[u8]) {
        self.mac.update(data);
    }

    /// Compares the computed digest with the signature header in constant time.
    pub fn ensure(self) -> Result<(), VerificationError> {
        match self.mac.verify_slice(&self.expected) {
            Ok(()) => {
                debug!("slack request signature verified");
                Ok(())
            }
            Err(_) => {
                warn!("slack request signature mismatch");
                Err(VerificationError::SignatureMismatch)
            }
        }
    }
}

impl io::Write for SecretsVerifier {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Verifies a fully buffered body against the signing headers.
pub fn verify_signature(
    headers: &HeaderMap,
    secret: impl AsRef<[u8]>,
    body: &[u8],
) -> Result<(), VerificationError> {
    let mut verifier = SecretsVerifier::new(headers, secret)?;
    verifier.update(body);
    verifier.ensure()
}

/// Produces the `v0=<hex>` signature Slack would send for `body` at `timestamp`.
///
/// Only fails with [`VerificationError::InvalidSecret`], which HMAC key setup
/// reports through its fallible `KeyInit` signature.
pub fn compute_signature(
    secret: impl AsRef<[u8]>,
    timestamp: &str,
    body: &[u8],
) -> Result<String, VerificationError> {
    let mut mac = keyed_mac(secret.as_ref())?;
    mac.update(format!("{}:{}:", SIGNATURE_VERSION, timestamp).as_bytes());
    mac.update(body);
    Ok(format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes())))
}

// HMAC accepts keys of any length; the error arm only satisfies `KeyInit`'s signature.
fn keyed_mac(secret: &[u8]) -> Result<HmacSha256, VerificationError> {
    HmacSha256::new_from_slice(secret).map_err(|_| VerificationError::InvalidSecret)
}

fn header_value<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<&'a str, VerificationError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(VerificationError::MissingHeader(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    const SECRET: &str = "abcd12345";

    fn now() -> String {
        Utc::now().timestamp().to_string()
    }

    fn signed_headers(timestamp: &str, body: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let signature = compute_signature(SECRET, timestamp, body).unwrap();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&signature).unwrap());
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(timestamp).unwrap());
        headers
    }

    #[test]
    fn matches_slack_reference_signature() {
        // Worked example from Slack's request verification guide.
        let body = b"token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
        let signature =
            compute_signature("8f742231b10e8888abcd99yyyzzz85a5", "1531420618", body).unwrap();
        assert_eq!(
            signature,
            "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503"
        );
    }

    #[test]
    fn secrets_of_any_length_are_usable_keys() {
        for secret in ["".to_string(), "k".to_string(), "s".repeat(200)] {
            assert!(compute_signature(&secret, "1531420618", b"text=hi").is_ok());
        }
    }

    #[test]
    fn accepts_correctly_signed_body() {
        let timestamp = now();
        let body = b"token=tokenish&text=hello";
        let headers = signed_headers(&timestamp, body);

        assert_eq!(verify_signature(&headers, SECRET, body), Ok(()));
    }

    #[test]
    fn streamed_updates_match_single_update() {
        let timestamp = now();
        let body = b"command=%2Fpunch&text=some+text";
        let headers = signed_headers(&timestamp, body);

        let mut verifier = SecretsVerifier::new(&headers, SECRET).unwrap();
        for chunk in body.chunks(3) {
            verifier.update(chunk);
        }
        assert_eq!(verifier.ensure(), Ok(()));
    }

    #[test]
    fn single_bit_flip_in_body_is_a_mismatch() {
        let timestamp = now();
        let body = b"token=tokenish&text=hello".to_vec();
        let headers = signed_headers(&timestamp, &body);

        let mut tampered = body.clone();
        tampered[body.len() - 1] ^= 0x01;

        assert_eq!(
            verify_signature(&headers, SECRET, &tampered),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn wrong_secret_is_a_mismatch() {
        let timestamp = now();
        let body = b"text=hello";
        let headers = signed_headers(&timestamp, body);

        assert_eq!(
            verify_signature(&headers, "not-the-secret", body),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn missing_headers_are_reported_by_name() {
        let timestamp = now();
        let mut headers = signed_headers(&timestamp, b"");
        headers.remove(TIMESTAMP_HEADER);
        assert_eq!(
            SecretsVerifier::new(&headers, SECRET).err(),
            Some(VerificationError::MissingHeader(TIMESTAMP_HEADER))
        );

        let mut headers = signed_headers(&timestamp, b"");
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_static(""));
        assert_eq!(
            SecretsVerifier::new(&headers, SECRET).err(),
            Some(VerificationError::MissingHeader(SIGNATURE_HEADER))
        );
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let timestamp = now();
        let body = b"text=hello";
        let signature = compute_signature(SECRET, &timestamp, body).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-slack-signature", HeaderValue::from_str(&signature).unwrap());
        headers.insert("X-SLACK-REQUEST-TIMESTAMP", HeaderValue::from_str(&timestamp).unwrap());

        assert_eq!(verify_signature(&headers, SECRET, body), Ok(()));
    }

    #[test]
    fn rejects_malformed_timestamp_and_signature() {
        let mut headers = signed_headers("not-a-number", b"");
        assert_eq!(
            SecretsVerifier::new(&headers, SECRET).err(),
            Some(VerificationError::MalformedTimestamp("not-a-number".to_string()))
        );

        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(&now()).unwrap());
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_static("v1=abcdef"));
        assert_eq!(
            SecretsVerifier::new(&headers, SECRET).err(),
            Some(VerificationError::MalformedSignature)
        );

        headers.insert(SIGNATURE_HEADER, HeaderValue::from_static("v0=not-hex"));
        assert_eq!(
            SecretsVerifier::new(&headers, SECRET).err(),
            Some(VerificationError::MalformedSignature)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected_unless_disabled() {
        let stale = (Utc::now().timestamp() - 60 * 10).to_string();
        let body = b"text=hello";
        let headers = signed_headers(&stale, body);

        assert!(matches!(
            verify_signature(&headers, SECRET, body),
            Err(VerificationError::StaleTimestamp { tolerance_secs: 300, .. })
        ));

        let options = VerifyOptions { tolerance: None };
        let mut verifier = SecretsVerifier::with_options(&headers, SECRET, &options).unwrap();
        verifier.update(body);
        assert_eq!(verifier.ensure(), Ok(()));
    }
}
