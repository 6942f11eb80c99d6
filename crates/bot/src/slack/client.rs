//! Slack Web API client.
//!
//! Provides methods for posting, updating and scheduling messages, replying
//! to `response_url`s, and verifying webhook signatures.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, error, instrument};

use super::error::SlackError;
use super::types::{
    Block, PostMessageResponse, ResponseMessage, ScheduleMessageResponse, SlackMessage,
    UpdateMessageResponse,
};

/// Slack Web API base URL.
const SLACK_API_BASE: &str = "https://slack.com/api";

/// Maximum age of a signed request before it is treated as a replay.
const MAX_REQUEST_AGE_SECS: i64 = 300;

/// Outbound chat operations used by the deploy workflows and commands.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Post a message to a channel; the returned `ts` identifies it for updates.
    async fn post_message(
        &self,
        channel: &str,
        blocks: Vec<Block>,
        fallback_text: &str,
    ) -> Result<PostMessageResponse, SlackError>;

    /// Replace an existing message in place.
    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        blocks: Vec<Block>,
        fallback_text: &str,
    ) -> Result<UpdateMessageResponse, SlackError>;

    /// Schedule a plain text message for a future unix time.
    async fn schedule_message(
        &self,
        channel: &str,
        text: &str,
        post_at: i64,
    ) -> Result<ScheduleMessageResponse, SlackError>;

    /// Reply to a slash command's `response_url`.
    async fn respond(&self, response_url: &str, message: ResponseMessage)
    -> Result<(), SlackError>;
}

/// Slack API client.
#[derive(Clone)]
pub struct SlackClient {
    /// HTTP client.
    client: Client,
    /// Bot token for authentication.
    bot_token: SecretString,
    /// Signing secret for verifying webhooks.
    signing_secret: SecretString,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("bot_token", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    /// Create a new Slack client.
    #[must_use]
    pub fn new(bot_token: SecretString, signing_secret: SecretString) -> Self {
        Self {
            client: Client::new(),
            bot_token,
            signing_secret,
        }
    }

    /// Verify a Slack webhook signature.
    ///
    /// This implements Slack's signature verification:
    /// <https://api.slack.com/authentication/verifying-requests-from-slack>
    ///
    /// # Arguments
    ///
    /// * `timestamp` - The `X-Slack-Request-Timestamp` header value
    /// * `body` - The raw request body
    /// * `signature` - The `X-Slack-Signature` header value
    ///
    /// # Errors
    ///
    /// Returns error if signature verification fails.
    #[instrument(skip(self, body, signature))]
    pub fn verify_signature(
        &self,
        timestamp: &str,
        body: &str,
        signature: &str,
    ) -> Result<(), SlackError> {
        let ts: i64 = timestamp
            .parse()
            .map_err(|_| SlackError::InvalidSignature("Invalid timestamp".to_string()))?;

        if (chrono::Utc::now().timestamp() - ts).abs() > MAX_REQUEST_AGE_SECS {
            return Err(SlackError::InvalidSignature(
                "Request timestamp too old".to_string(),
            ));
        }

        let expected = sign(self.signing_secret.expose_secret(), timestamp, body)?;

        if !constant_time_compare(&expected, signature) {
            return Err(SlackError::InvalidSignature(
                "Signature mismatch".to_string(),
            ));
        }

        debug!("Slack signature verified");

        Ok(())
    }

    /// POST a JSON body to a Web API method and return the raw response.
    async fn call<T: serde::Serialize + Sync>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<reqwest::Response, SlackError> {
        self.client
            .post(format!("{SLACK_API_BASE}/{method}"))
            .bearer_auth(self.bot_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))
    }
}

#[async_trait]
impl ChatApi for SlackClient {
    #[instrument(skip(self, blocks, fallback_text), fields(channel = %channel))]
    async fn post_message(
        &self,
        channel: &str,
        blocks: Vec<Block>,
        fallback_text: &str,
    ) -> Result<PostMessageResponse, SlackError> {
        let message = SlackMessage {
            channel: channel.to_string(),
            blocks,
            text: fallback_text.to_string(),
        };

        let result: PostMessageResponse = self
            .call("chat.postMessage", &message)
            .await?
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if !result.ok {
            error!(
                error = ?result.error,
                "Slack API error posting message"
            );
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        debug!(
            ts = ?result.ts,
            channel = ?result.channel,
            "Message posted to Slack"
        );

        Ok(result)
    }

    #[instrument(skip(self, blocks, fallback_text), fields(channel = %channel, ts = %ts))]
    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        blocks: Vec<Block>,
        fallback_text: &str,
    ) -> Result<UpdateMessageResponse, SlackError> {
        #[derive(serde::Serialize)]
        struct UpdateMessage<'a> {
            channel: &'a str,
            ts: &'a str,
            blocks: Vec<Block>,
            text: &'a str,
        }

        let message = UpdateMessage {
            channel,
            ts,
            blocks,
            text: fallback_text,
        };

        let result: UpdateMessageResponse = self
            .call("chat.update", &message)
            .await?
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if !result.ok {
            error!(
                error = ?result.error,
                "Slack API error updating message"
            );
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        debug!(ts = %ts, "Message updated in Slack");

        Ok(result)
    }

    #[instrument(skip(self, text), fields(channel = %channel, post_at = post_at))]
    async fn schedule_message(
        &self,
        channel: &str,
        text: &str,
        post_at: i64,
    ) -> Result<ScheduleMessageResponse, SlackError> {
        #[derive(serde::Serialize)]
        struct ScheduleMessage<'a> {
            channel: &'a str,
            text: &'a str,
            post_at: i64,
        }

        let message = ScheduleMessage {
            channel,
            text,
            post_at,
        };

        let result: ScheduleMessageResponse = self
            .call("chat.scheduleMessage", &message)
            .await?
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if !result.ok {
            error!(
                error = ?result.error,
                "Slack API error scheduling message"
            );
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        debug!(
            scheduled_message_id = ?result.scheduled_message_id,
            "Message scheduled in Slack"
        );

        Ok(result)
    }

    #[instrument(skip(self, response_url, message))]
    async fn respond(
        &self,
        response_url: &str,
        message: ResponseMessage,
    ) -> Result<(), SlackError> {
        let response = self
            .client
            .post(response_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SlackError::Response(format!(
                "Response URL returned {status}: {body}"
            )));
        }

        debug!("Responded to Slack response_url");

        Ok(())
    }
}

/// Compute the `v0=` signature Slack sends for a request.
pub(crate) fn sign(secret: &str, timestamp: &str, body: &str) -> Result<String, SlackError> {
    let sig_basestring = format!("v0:{timestamp}:{body}");

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| SlackError::InvalidSignature(e.to_string()))?;

    mac.update(sig_basestring.as_bytes());

    Ok(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
