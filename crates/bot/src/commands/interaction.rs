//! Approve and Cancel button clicks on deploy prompts.

use deploy_bot_core::DeployAction;
use tracing::{error, info, instrument};

use super::Commands;
use crate::deploy::{DeployError, ResolutionRequest};

impl Commands {
    /// Resolve a prompt button click, reporting failures to the channel.
    ///
    /// With a guard installed, only the first click per message is acted on;
    /// a failed resolution gives up its claim so the prompt stays usable.
    #[instrument(
        skip(self, value),
        fields(action = %action, user = %user_id, channel = %channel_id, ts = %message_ts)
    )]
    pub async fn resolve_prompt(
        &self,
        action: DeployAction,
        user_id: &str,
        channel_id: &str,
        message_ts: &str,
        value: &str,
    ) {
        if let Some(guard) = &self.guard
            && !guard.claim(channel_id, message_ts).await
        {
            info!("Ignoring repeated resolution of prompt");
            return;
        }

        let result = match ResolutionRequest::decode(user_id, channel_id, message_ts, value) {
            Ok(request) => self.deploy.resolve(action, &request).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(state) => info!(state = ?state, "Prompt resolved"),
            Err(e) => {
                error!(error = %e, "Unable to resolve prompt");
                if let Some(guard) = &self.guard {
                    guard.release(channel_id, message_ts).await;
                }
                self.say(channel_id, &resolution_failure_message(action, &e))
                    .await;
            }
        }
    }
}

fn resolution_failure_message(action: DeployAction, error: &DeployError) -> String {
    match action {
        DeployAction::Approve => format!("Unable to deploy: {error}"),
        DeployAction::Cancel => format!("Unable to remove approval button: {error}"),
    }
}
