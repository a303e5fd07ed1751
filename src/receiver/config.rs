use chrono::Duration;
use lambda_http::Error;
use slackutil::VerifyOptions;

const SIGNING_SECRET_VAR: &str = "SLACK_SIGNING_SECRET";
const TOLERANCE_VAR: &str = "SLACK_TIMESTAMP_TOLERANCE_SECS";

#[derive(Debug, Clone)]
pub struct Config {
    pub signing_secret: String,
    pub verify_options: VerifyOptions,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// `SLACK_TIMESTAMP_TOLERANCE_SECS=0` disables the replay check.
    pub fn from_vars<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let signing_secret = lookup(SIGNING_SECRET_VAR)
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| format!("{} must be set", SIGNING_SECRET_VAR))?;

        let verify_options = match lookup(TOLERANCE_VAR) {
            None => VerifyOptions::default(),
            Some(raw) => {
                let secs: u32 = raw
                    .trim()
                    .parse()
                    .map_err(|e| format!("invalid {} {:?}: {}", TOLERANCE_VAR, raw, e))?;
                VerifyOptions {
                    tolerance: (secs > 0).then(|| Duration::seconds(i64::from(secs))),
                }
            }
        };

        Ok(Config {
            signing_secret,
            verify_options,
        })
    }
}
