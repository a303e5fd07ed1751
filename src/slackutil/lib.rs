//! Verify-and-decode helpers for inbound Slack requests.
//!
//! [`SlackRequest`] wraps an `http::Request` with a readable body and offers two
//! decoders: [`SlackRequest::parse_slash_command`], which checks the `v0`
//! signing-secret signature while parsing the form body in a single pass, and
//! [`SlackRequest::dialog_input`], which pulls the submitted values out of a
//! dialog's `payload=` callback.

mod error;
mod request;
mod tee;
mod types;
mod verifier;

pub use error::{SlackRequestError, UrlDecodeError, VerificationError};
pub use request::{SlackRequest, MAX_BODY_BYTES, PAYLOAD_PREFIX_LEN};
pub use tee::TeeReader;
pub use types::{IdentityRef, InteractionCallback, SlashCommand};
pub use verifier::{
    compute_signature, verify_signature, SecretsVerifier, VerifyOptions, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
