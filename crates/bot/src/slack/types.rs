//! Slack Block Kit types and Web API payloads.
//!
//! These types represent the subset of the Slack Block Kit API
//! needed for deploy prompts: sections, dividers and an actions block with
//! confirmable buttons. Block order is significant; the renderer relies on
//! `Vec<Block>` serializing in insertion order.
//!
//! See: <https://api.slack.com/block-kit>

use serde::{Deserialize, Serialize};

/// A Slack message with blocks.
#[derive(Debug, Clone, Serialize)]
pub struct SlackMessage {
    /// Channel ID to post to.
    pub channel: String,
    /// Message blocks; omitted for plain text messages.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    /// Plain text fallback for notifications.
    pub text: String,
}

/// Block Kit block types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Section block with text.
    Section { text: Text },
    /// Actions block with interactive elements.
    Actions { elements: Vec<ActionElement> },
    /// Divider block (horizontal line).
    Divider,
}

impl Block {
    /// Create a section block with markdown text.
    #[must_use]
    pub fn mrkdwn_section(text: impl Into<String>) -> Self {
        Self::Section {
            text: Text::mrkdwn(text),
        }
    }

    /// The text of a section block, if this is one.
    #[must_use]
    pub fn section_text(&self) -> Option<&str> {
        match self {
            Self::Section { text } => Some(text.as_str()),
            Self::Actions { .. } | Self::Divider => None,
        }
    }
}

/// Text object for section blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    /// Markdown text (supports formatting).
    Mrkdwn { text: String },
}

impl Text {
    /// Create a markdown text object.
    #[must_use]
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    /// The raw text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mrkdwn { text } => text,
        }
    }
}

/// Plain text object (for buttons and dialogs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainText {
    #[serde(rename = "type")]
    pub text_type: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<bool>,
}

impl PlainText {
    /// Create a new plain text object.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text_type: "plain_text",
            text: text.into(),
            emoji: None,
        }
    }

    /// Plain text with `:emoji:` shortcodes rendered, as on button labels.
    #[must_use]
    pub fn with_emoji(text: impl Into<String>) -> Self {
        Self {
            emoji: Some(true),
            ..Self::new(text)
        }
    }
}

/// Action block elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionElement {
    /// Interactive button.
    Button {
        text: PlainText,
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<ButtonStyle>,
        #[serde(skip_serializing_if = "Option::is_none")]
        confirm: Option<ConfirmationDialog>,
    },
}

/// Confirmation dialog shown before a button's action is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationDialog {
    pub title: PlainText,
    pub text: PlainText,
    pub confirm: PlainText,
    pub deny: PlainText,
}

/// Button style (affects color).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    /// Green primary button.
    Primary,
    /// Red danger button.
    Danger,
}

/// Visibility of a `response_url` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Visible to everyone in the channel.
    InChannel,
    /// Visible only to the user who ran the command.
    #[default]
    Ephemeral,
}

/// Reply posted to a slash command's `response_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseMessage {
    pub response_type: ResponseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

impl ResponseMessage {
    /// A text-only reply.
    #[must_use]
    pub fn text(response_type: ResponseType, text: impl Into<String>) -> Self {
        Self {
            response_type,
            text: Some(text.into()),
            blocks: Vec::new(),
        }
    }

    /// A blocks-only reply.
    #[must_use]
    pub const fn blocks(response_type: ResponseType, blocks: Vec<Block>) -> Self {
        Self {
            response_type,
            text: None,
            blocks,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Response from posting a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostMessageResponse {
    /// Whether the request was successful.
    pub ok: bool,
    /// Channel ID where message was posted.
    #[serde(default)]
    pub channel: Option<String>,
    /// Message timestamp (unique ID).
    #[serde(default)]
    pub ts: Option<String>,
    /// Error message if not ok.
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from updating a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMessageResponse {
    /// Whether the request was successful.
    pub ok: bool,
    /// Channel ID.
    #[serde(default)]
    pub channel: Option<String>,
    /// Updated message timestamp.
    #[serde(default)]
    pub ts: Option<String>,
    /// Error message if not ok.
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from scheduling a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleMessageResponse {
    /// Whether the request was successful.
    pub ok: bool,
    /// Channel ID.
    #[serde(default)]
    pub channel: Option<String>,
    /// Identifier of the scheduled message.
    #[serde(default)]
    pub scheduled_message_id: Option<String>,
    /// Unix time the message will be posted.
    #[serde(default)]
    pub post_at: Option<i64>,
    /// Error message if not ok.
    #[serde(default)]
    pub error: Option<String>,
}

// =============================================================================
// Inbound Payloads
// =============================================================================

/// Slash command invocation, decoded from the form-encoded request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlashCommand {
    /// Command name including the leading slash (e.g. `/deploy-by-branch`).
    pub command: String,
    /// Everything typed after the command name.
    pub text: String,
    /// Invoking user's Slack ID.
    pub user_id: String,
    /// Channel the command was run in.
    pub channel_id: String,
    /// URL for delayed replies.
    pub response_url: String,
}

impl SlashCommand {
    /// Build a command from decoded form fields, ignoring unknown keys.
    pub fn from_form<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut command = Self::default();
        for (key, value) in fields {
            match key.as_ref() {
                "command" => command.command = value.into(),
                "text" => command.text = value.into(),
                "user_id" => command.user_id = value.into(),
                "channel_id" => command.channel_id = value.into(),
                "response_url" => command.response_url = value.into(),
                _ => {}
            }
        }
        command
    }
}

/// Slack interaction payload from button clicks.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionPayload {
    /// Type of interaction.
    #[serde(rename = "type")]
    pub interaction_type: String,
    /// User who triggered the interaction.
    pub user: InteractionUser,
    /// Container information.
    #[serde(default)]
    pub container: Option<InteractionContainer>,
    /// Channel where interaction occurred.
    #[serde(default)]
    pub channel: Option<InteractionChannel>,
    /// Message the interactive element belongs to.
    #[serde(default)]
    pub message: Option<InteractionMessage>,
    /// Actions that were triggered.
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
    /// Response URL for replying to the interaction.
    #[serde(default)]
    pub response_url: Option<String>,
}

impl InteractionPayload {
    /// Channel of the originating message.
    #[must_use]
    pub fn channel_id(&self) -> Option<&str> {
        self.channel
            .as_ref()
            .map(|c| c.id.as_str())
            .or_else(|| self.container.as_ref()?.channel_id.as_deref())
    }

    /// Timestamp of the originating message.
    #[must_use]
    pub fn message_ts(&self) -> Option<&str> {
        self.message
            .as_ref()
            .map(|m| m.ts.as_str())
            .or_else(|| self.container.as_ref()?.message_ts.as_deref())
    }
}

/// User who triggered an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionUser {
    /// Slack user ID.
    pub id: String,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Container for the interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionContainer {
    /// Container type (e.g., "message").
    #[serde(rename = "type")]
    pub container_type: String,
    /// Message timestamp.
    #[serde(default)]
    pub message_ts: Option<String>,
    /// Channel ID.
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// Channel where interaction occurred.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionChannel {
    /// Channel ID.
    pub id: String,
    /// Channel name.
    #[serde(default)]
    pub name: Option<String>,
}

/// The message an interaction originated from.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionMessage {
    /// Message timestamp, also the key for `chat.update`.
    pub ts: String,
}

/// Action that was triggered.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionAction {
    /// Action ID (set when creating the button).
    pub action_id: String,
    /// Block ID containing this action.
    #[serde(default)]
    pub block_id: Option<String>,
    /// Value attached to the action.
    #[serde(default)]
    pub value: Option<String>,
    /// Action type.
    #[serde(rename = "type", default)]
    pub action_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_divider_serializes_as_bare_type() {
        let value = serde_json::to_value(Block::Divider).expect("serialize");
        assert_eq!(value, json!({"type": "divider"}));
    }

    #[test]
    fn test_section_serializes_mrkdwn() {
        let value = serde_json::to_value(Block::mrkdwn_section("*hi*")).expect("serialize");
        assert_eq!(
            value,
            json!({"type": "section", "text": {"type": "mrkdwn", "text": "*hi*"}})
        );
    }

    #[test]
    fn test_response_message_skips_empty_fields() {
        let value = serde_json::to_value(ResponseMessage::text(ResponseType::InChannel, "ok"))
            .expect("serialize");
        assert_eq!(value, json!({"response_type": "in_channel", "text": "ok"}));
    }

    #[test]
    fn test_slash_command_from_form() {
        let command = SlashCommand::from_form([
            ("command", "/deploy-by-branch"),
            ("text", "release/fee_collab @devs"),
            ("user_id", "U123"),
            ("channel_id", "C456"),
            ("response_url", "https://hooks.slack.com/commands/1"),
            ("team_id", "T789"),
        ]);

        assert_eq!(command.command, "/deploy-by-branch");
        assert_eq!(command.text, "release/fee_collab @devs");
        assert_eq!(command.user_id, "U123");
        assert_eq!(command.channel_id, "C456");
        assert_eq!(command.response_url, "https://hooks.slack.com/commands/1");
    }

    #[test]
    fn test_interaction_payload_prefers_message_fields() {
        let payload: InteractionPayload = serde_json::from_value(json!({
            "type": "block_actions",
            "user": {"id": "U1"},
            "container": {"type": "message", "message_ts": "1.1", "channel_id": "C-container"},
            "channel": {"id": "CBR2V3XEX", "name": "deploy-bot-testing"},
            "message": {"ts": "1548261231.000200"},
            "actions": [{"action_id": "approve_deploy", "value": "{}", "type": "button"}]
        }))
        .expect("valid payload");

        assert_eq!(payload.channel_id(), Some("CBR2V3XEX"));
        assert_eq!(payload.message_ts(), Some("1548261231.000200"));
    }

    #[test]
    fn test_interaction_payload_falls_back_to_container() {
        let payload: InteractionPayload = serde_json::from_value(json!({
            "type": "block_actions",
            "user": {"id": "U1"},
            "container": {"type": "message", "message_ts": "1.1", "channel_id": "C-container"},
            "actions": []
        }))
        .expect("valid payload");

        assert_eq!(payload.channel_id(), Some("C-container"));
        assert_eq!(payload.message_ts(), Some("1.1"));
    }
}
