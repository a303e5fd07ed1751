use crate::types::SlashCommand;
use http::Method;
use thiserror::Error;

/// Why a request failed Slack's signing-secret check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("missing required header {0}")]
    MissingHeader(&'static str),

    #[error("malformed request timestamp {0:?}")]
    MalformedTimestamp(String),

    #[error("malformed request signature")]
    MalformedSignature,

    #[error("request timestamp {timestamp} is outside the {tolerance_secs}s tolerance")]
    StaleTimestamp { timestamp: i64, tolerance_secs: i64 },

    /// `KeyInit::new_from_slice` is fallible by signature. HMAC-SHA256 takes keys
    /// of any length, so this is not produced for real secrets.
    #[error("signing secret cannot be used as an HMAC key")]
    InvalidSecret,

    #[error("request signature does not match the computed signature")]
    SignatureMismatch,
}

/// Why the `payload=` value could not be query-unescaped.
#[derive(Debug, Error)]
pub enum UrlDecodeError {
    #[error("invalid percent escape at byte {0}")]
    InvalidEscape(usize),

    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Error)]
pub enum SlackRequestError {
    #[error("invalid method {0}, expected POST")]
    InvalidMethod(Method),

    #[error("request verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// The body was decoded but its signature did not check out. The command
    /// is kept so callers can log it; it must not be trusted.
    #[error("slash command failed verification: {source}")]
    Unverified {
        command: Box<SlashCommand>,
        #[source]
        source: VerificationError,
    },

    #[error("failed to read request body: {0}")]
    BodyRead(#[source] std::io::Error),

    #[error("failed to parse form body: {0}")]
    FormParse(#[from] serde_urlencoded::de::Error),

    #[error("request body is {len} bytes, shorter than the {prefix_len} byte payload prefix")]
    BodyTooShort { len: usize, prefix_len: usize },

    #[error("failed to url-decode payload: {0}")]
    UrlDecode(#[from] UrlDecodeError),

    #[error("failed to decode interaction payload: {0}")]
    JsonDecode(#[from] serde_json::Error),
}

impl SlackRequestError {
    /// The authentication failure behind this error, if it is one.
    pub fn verification_error(&self) -> Option<&VerificationError> {
        match self {
            SlackRequestError::Verification(err) => Some(err),
            SlackRequestError::Unverified { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn unverified_command(&self) -> Option<&SlashCommand> {
        match self {
            SlackRequestError::Unverified { command, .. } => Some(command.as_ref()),
            _ => None,
        }
    }
}
