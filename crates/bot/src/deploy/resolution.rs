//! Resolving a prompt by approval or cancellation.

use deploy_bot_core::{DeployAction, DeployPromptToken, PromptState};
use tracing::{info, instrument};

use super::{DeployError, DeployWorkflow};
use crate::slack::{build_deploy_resolved_message, deploy_fallback_text};

/// One button click on a deploy prompt, with its token already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    /// User who clicked.
    pub user_id: String,
    /// Channel of the prompt message.
    pub channel_id: String,
    /// Timestamp of the prompt message.
    pub message_ts: String,
    /// Token carried by the clicked button.
    pub token: DeployPromptToken,
}

impl ResolutionRequest {
    /// Build a request from an interaction, decoding the button value once.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::MalformedToken`] if the value does not decode.
    pub fn decode(
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
        message_ts: impl Into<String>,
        value: &str,
    ) -> Result<Self, DeployError> {
        Ok(Self {
            user_id: user_id.into(),
            channel_id: channel_id.into(),
            message_ts: message_ts.into(),
            token: DeployPromptToken::decode(value)?,
        })
    }
}

impl DeployWorkflow {
    /// Apply `action` to the prompt.
    ///
    /// # Errors
    ///
    /// See [`Self::resolve_approve`] and [`Self::resolve_cancel`].
    pub async fn resolve(
        &self,
        action: DeployAction,
        request: &ResolutionRequest,
    ) -> Result<PromptState, DeployError> {
        match action {
            DeployAction::Approve => self.resolve_approve(request).await,
            DeployAction::Cancel => self.resolve_cancel(request).await,
        }
    }

    /// Release the CircleCI approval job, then mark the prompt approved.
    ///
    /// The message is left untouched if the approval call fails.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Ci`] if approval is not accepted, or
    /// [`DeployError::Chat`] if the message update fails.
    #[instrument(
        skip(self, request),
        fields(
            branch = %request.token.branch_name,
            workflow_id = %request.token.workflow_id,
            job_id = %request.token.job_id,
            user = %request.user_id,
        )
    )]
    pub async fn resolve_approve(
        &self,
        request: &ResolutionRequest,
    ) -> Result<PromptState, DeployError> {
        self.ci
            .approve(&request.token.workflow_id, &request.token.job_id)
            .await?;

        info!("Deploy approved");

        self.render_resolution(DeployAction::Approve, request).await
    }

    /// Mark the prompt cancelled. Never touches CircleCI.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Chat`] if the message update fails.
    #[instrument(
        skip(self, request),
        fields(branch = %request.token.branch_name, user = %request.user_id)
    )]
    pub async fn resolve_cancel(
        &self,
        request: &ResolutionRequest,
    ) -> Result<PromptState, DeployError> {
        info!("Deploy prompt cancelled");

        self.render_resolution(DeployAction::Cancel, request).await
    }

    async fn render_resolution(
        &self,
        action: DeployAction,
        request: &ResolutionRequest,
    ) -> Result<PromptState, DeployError> {
        let blocks = build_deploy_resolved_message(
            &request.token,
            action,
            &request.message_ts,
            &request.user_id,
        );

        self.chat
            .update_message(
                &request.channel_id,
                &request.message_ts,
                blocks,
                &deploy_fallback_text(&request.token, Some(action)),
            )
            .await?;

        Ok(action.terminal_state())
    }
}
