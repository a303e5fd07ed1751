use crate::error::{SlackRequestError, UrlDecodeError};
use crate::tee::TeeReader;
use crate::types::{InteractionCallback, SlashCommand};
use crate::verifier::{SecretsVerifier, VerifyOptions};
use http::{HeaderMap, Method, Request};
use std::collections::HashMap;
use std::io::{self, Read};
use tracing::debug;

/// Length of the `payload=` form key that precedes the interaction JSON.
pub const PAYLOAD_PREFIX_LEN: usize = 8;

/// Largest body either decoder will buffer.
pub const MAX_BODY_BYTES: u64 = 10 << 20;

/// An inbound Slack request whose body has not been read yet.
///
/// Every decoder takes `self` by value: the body is a one-shot stream and is
/// either drained completely or left untouched and dropped.
#[derive(Debug)]
pub struct SlackRequest<B> {
    request: Request<B>,
}

impl<B: Read> SlackRequest<B> {
    pub fn new(request: Request<B>) -> Self {
        SlackRequest { request }
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn into_inner(self) -> Request<B> {
        self.request
    }

    /// Parses a slash command and checks its signature with the default replay tolerance.
    ///
    /// A command that parsed but failed the signature check comes back inside
    /// [`SlackRequestError::Unverified`].
    pub fn parse_slash_command(
        self,
        signing_secret: impl AsRef<[u8]>,
    ) -> Result<SlashCommand, SlackRequestError> {
        self.parse_slash_command_with(signing_secret, &VerifyOptions::default())
    }

    pub fn parse_slash_command_with(
        self,
        signing_secret: impl AsRef<[u8]>,
        options: &VerifyOptions,
    ) -> Result<SlashCommand, SlackRequestError> {
        self.ensure_post()?;

        let (parts, body) = self.request.into_parts();
        let verifier = SecretsVerifier::with_options(&parts.headers, signing_secret, options)?;

        // One pass over the body: the verifier hashes the bytes the form parser sees.
        let mut tee = TeeReader::new(body, verifier);
        let form = read_body(&mut tee)?;
        let (_, verifier) = tee.into_inner();

        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&form)?;
        let command = SlashCommand::from_form_pairs(pairs);

        match verifier.ensure() {
            Ok(()) => {
                debug!(command = %command.command, team_id = %command.team_id, "parsed slash command");
                Ok(command)
            }
            Err(source) => Err(SlackRequestError::Unverified {
                command: Box::new(command),
                source,
            }),
        }
    }

    /// Decodes the `payload=` interaction envelope. The signature is not checked.
    pub fn interaction_callback(self) -> Result<InteractionCallback, SlackRequestError> {
        self.ensure_post()?;

        let body = read_body(self.request.into_body())?;

        let payload = body
            .get(PAYLOAD_PREFIX_LEN..)
            .ok_or(SlackRequestError::BodyTooShort {
                len: body.len(),
                prefix_len: PAYLOAD_PREFIX_LEN,
            })?;

        // Query unescaping: '+' is a space, %2B stays a literal plus.
        let payload = String::from_utf8(payload.to_vec())
            .map_err(UrlDecodeError::from)?
            .replace('+', " ");
        check_escapes(&payload)?;
        let json = urlencoding::decode(&payload).map_err(UrlDecodeError::from)?;

        Ok(serde_json::from_str(&json)?)
    }

    /// Returns the submitted dialog values, or an empty map when the payload is
    /// some other kind of interaction.
    pub fn dialog_input(self) -> Result<HashMap<String, String>, SlackRequestError> {
        let callback = self.interaction_callback()?;
        if !matches!(callback, InteractionCallback::DialogSubmission { .. }) {
            debug!(kind = callback.kind(), "interaction is not a dialog submission");
        }
        Ok(callback.into_submission())
    }

    fn ensure_post(&self) -> Result<(), SlackRequestError> {
        if self.request.method() != Method::POST {
            return Err(SlackRequestError::InvalidMethod(self.request.method().clone()));
        }
        Ok(())
    }
}

fn read_body<R: Read>(reader: R) -> Result<Vec<u8>, SlackRequestError> {
    let mut body = Vec::new();
    reader
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut body)
        .map_err(SlackRequestError::BodyRead)?;
    if body.len() as u64 > MAX_BODY_BYTES {
        return Err(SlackRequestError::BodyRead(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("request body exceeds {} bytes", MAX_BODY_BYTES),
        )));
    }
    Ok(body)
}

// Every '%' must start a two-digit hex escape.
fn check_escapes(payload: &str) -> Result<(), UrlDecodeError> {
    let bytes = payload.as_bytes();
    for (i, _) in bytes.iter().enumerate().filter(|(_, b)| **b == b'%') {
        let valid = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(UrlDecodeError::InvalidEscape(i));
        }
    }
    Ok(())
}

impl<B: Read> From<Request<B>> for SlackRequest<B> {
    fn from(request: Request<B>) -> Self {
        SlackRequest::new(request)
    }
}
