use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SlackResponse {
    pub response_type: String,
    pub text: String,
}
