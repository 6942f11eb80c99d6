//! `/latest-deploy <app>`

use tracing::{error, info};

use super::{CommandError, Commands, parse_argument};
use crate::slack::{ResponseMessage, ResponseType, SlashCommand, pr_summary_block};

impl Commands {
    pub(super) async fn latest_deploy(&self, command: &SlashCommand) {
        if let Err(e) = self.try_latest_deploy(command).await {
            error!(error = %e, "Unable to get latest deploy");
            self.reply(
                command,
                ResponseMessage::text(
                    ResponseType::Ephemeral,
                    format!("Unable to get commits: {e}"),
                ),
            )
            .await;
        }
    }

    async fn try_latest_deploy(&self, command: &SlashCommand) -> Result<(), CommandError> {
        let app = parse_argument(&command.text, 0).ok_or(CommandError::MissingArguments("app_name"))?;
        let sources = self.release_sources()?;

        let hash = sources.heroku_hash(app).await?;
        info!(app, hash = %hash, "Latest git hash found");

        let pulls = sources.github.pulls_for_commit(&hash).await?;

        self.chat
            .respond(
                &command.response_url,
                ResponseMessage::text(
                    ResponseType::InChannel,
                    format!("Latest Deployed on {app}:"),
                ),
            )
            .await?;

        for pr in &pulls {
            self.chat
                .respond(
                    &command.response_url,
                    ResponseMessage::blocks(ResponseType::InChannel, vec![pr_summary_block(pr)]),
                )
                .await?;
        }

        Ok(())
    }
}
