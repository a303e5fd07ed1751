use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct SlashCommand {
    pub token: String,
    pub team_id: String,
    pub team_domain: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: String,
    pub trigger_id: String,
}

impl SlashCommand {
    /// Builds a command from decoded form pairs. The first occurrence of a key
    /// wins, unknown keys are ignored and absent keys stay empty.
    pub(crate) fn from_form_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params: HashMap<String, String> = HashMap::new();
        for (key, value) in pairs {
            params.entry(key).or_insert(value);
        }
        let mut field = |name: &str| params.remove(name).unwrap_or_default();

        SlashCommand {
            token: field("token"),
            team_id: field("team_id"),
            team_domain: field("team_domain"),
            channel_id: field("channel_id"),
            channel_name: field("channel_name"),
            user_id: field("user_id"),
            user_name: field("user_name"),
            command: field("command"),
            text: field("text"),
            response_url: field("response_url"),
            trigger_id: field("trigger_id"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct IdentityRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub domain: String,
}

/// Payload posted to the interactivity endpoint, discriminated by `type`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionCallback {
    DialogSubmission {
        #[serde(default, deserialize_with = "nullable_submission")]
        submission: HashMap<String, String>,
        #[serde(default, deserialize_with = "null_as_default")]
        callback_id: String,
        #[serde(default, deserialize_with = "null_as_default")]
        state: String,
        #[serde(default, deserialize_with = "null_as_default")]
        response_url: String,
        #[serde(default, deserialize_with = "null_as_default")]
        action_ts: String,
        #[serde(default, deserialize_with = "null_as_default")]
        team: IdentityRef,
        #[serde(default, deserialize_with = "null_as_default")]
        user: IdentityRef,
        #[serde(default, deserialize_with = "null_as_default")]
        channel: IdentityRef,
    },
    DialogCancellation,
    InteractiveMessage,
    BlockActions,
    BlockSuggestion,
    ViewSubmission,
    ViewClosed,
    MessageAction,
    Shortcut,
    #[serde(other)]
    Unknown,
}

impl InteractionCallback {
    pub fn kind(&self) -> &'static str {
        match self {
            InteractionCallback::DialogSubmission { .. } => "dialog_submission",
            InteractionCallback::DialogCancellation => "dialog_cancellation",
            InteractionCallback::InteractiveMessage => "interactive_message",
            InteractionCallback::BlockActions => "block_actions",
            InteractionCallback::BlockSuggestion => "block_suggestion",
            InteractionCallback::ViewSubmission => "view_submission",
            InteractionCallback::ViewClosed => "view_closed",
            InteractionCallback::MessageAction => "message_action",
            InteractionCallback::Shortcut => "shortcut",
            InteractionCallback::Unknown => "unknown",
        }
    }

    /// Returns the dialog's input values, or an empty map for any other kind of callback.
    pub fn into_submission(self) -> HashMap<String, String> {
        match self {
            InteractionCallback::DialogSubmission { submission, .. } => submission,
            _ => HashMap::new(),
        }
    }
}

// Slack sends `null` for absent envelope fields; treat it like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Optional dialog elements left blank arrive as `null`.
fn nullable_submission<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, Option<String>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect())
}
