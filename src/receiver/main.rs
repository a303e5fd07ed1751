use lambda_http::{http, run, service_fn, Body, Error, Request, Response};
use slackutil::{SlackRequest, SlackRequestError};
use std::io::Cursor;
use tracing::{info, warn};

mod config;
mod types;

use config::Config;
use types::SlackResponse;

async fn function_handler(event: Request, config: &Config) -> Result<Response<Body>, Error> {
    route(event, config)
}

fn route(event: Request, config: &Config) -> Result<Response<Body>, Error> {
    let path = event.uri().path().trim_end_matches('/').to_string();

    // The decoders read the body as a stream.
    let (parts, body) = event.into_parts();
    let request = SlackRequest::new(http::Request::from_parts(parts, Cursor::new(body.to_vec())));

    match path.as_str() {
        "/commands" => handle_command(request, config),
        "/interactions" => handle_interaction(request),
        _ => text_response(404, "Not Found"),
    }
}

fn handle_command(
    request: SlackRequest<Cursor<Vec<u8>>>,
    config: &Config,
) -> Result<Response<Body>, Error> {
    let command =
        match request.parse_slash_command_with(&config.signing_secret, &config.verify_options) {
            Ok(command) => command,
            Err(err) => return error_response(&err),
        };

    info!(command = %command.command, user_id = %command.user_id, "accepted slash command");

    let response = SlackResponse {
        response_type: "ephemeral".to_string(),
        text: format!("Received {} {}", command.command, command.text)
            .trim_end()
            .to_string(),
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&response)?))?)
}

fn handle_interaction(request: SlackRequest<Cursor<Vec<u8>>>) -> Result<Response<Body>, Error> {
    let input = match request.dialog_input() {
        Ok(input) => input,
        Err(err) => return error_response(&err),
    };

    if input.is_empty() {
        info!("interaction carried no dialog submission");
    } else {
        let fields: Vec<&str> = input.keys().map(String::as_str).collect();
        info!(?fields, "accepted dialog submission");
    }

    // Slack closes the dialog on an empty 200.
    Ok(Response::builder().status(200).body(Body::Empty)?)
}

fn error_response(err: &SlackRequestError) -> Result<Response<Body>, Error> {
    warn!(error = %err, "rejecting slack request");
    match err {
        SlackRequestError::InvalidMethod(_) => text_response(405, "Method Not Allowed"),
        SlackRequestError::Verification(_) | SlackRequestError::Unverified { .. } => {
            text_response(401, "Unauthorized")
        }
        _ => text_response(400, "Bad Request"),
    }
}

fn text_response(status: u16, text: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Body::from(text.to_string()))?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env()?;
    let config = &config;

    run(service_fn(move |event: Request| async move {
        function_handler(event, config).await
    }))
    .await
}
