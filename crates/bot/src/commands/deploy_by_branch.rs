//! `/deploy-by-branch <branch> [@recipient]`

use std::fmt::Display;

use tracing::error;

use super::{Commands, parse_argument};
use crate::slack::SlashCommand;

/// Help text posted when a deploy prompt could not be created.
#[must_use]
pub fn deploy_help_message(text: &str, error: &dyn Display) -> String {
    format!(
        "Unable to deploy with parameters: `{text}`, example usages:\n\
         `/deploy-by-branch release/fee_collab`\n\
         `/deploy-by-branch release/fee_collab @task-automation-devs`\n\
         Error: {error}"
    )
}

impl Commands {
    pub(super) async fn deploy_by_branch(&self, command: &SlashCommand) {
        let branch = parse_argument(&command.text, 0).unwrap_or_default();
        let recipient = parse_argument(&command.text, 1);

        if let Err(e) = self
            .deploy
            .prompt_deploy(&command.channel_id, branch, recipient)
            .await
        {
            error!(error = %e, branch, "Unable to prompt deploy");
            self.say(
                &command.channel_id,
                &deploy_help_message(&command.text, &e),
            )
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use deploy_bot_core::{JobId, PipelineId, WorkflowId};

    use super::*;
    use crate::circleci::{MockCiApi, PipelineSummary};
    use crate::commands::CommandKind;
    use crate::commands::test_support::{commands, slash};
    use crate::slack::{Block, MockChatApi, PostMessageResponse};

    #[test]
    fn test_help_message() {
        assert_eq!(
            deploy_help_message("", &"missing branch name"),
            "Unable to deploy with parameters: ``, example usages:\n\
             `/deploy-by-branch release/fee_collab`\n\
             `/deploy-by-branch release/fee_collab @task-automation-devs`\n\
             Error: missing branch name"
        );
    }

    #[tokio::test]
    async fn test_recipient_reaches_preamble() {
        let mut ci = MockCiApi::new();
        ci.expect_find_latest_pipeline()
            .withf(|branch: &str| branch == "release/fee_collab")
            .returning(|_| {
                Ok(PipelineSummary {
                    id: PipelineId::new("p1"),
                    commit_sha: "abc123".to_string(),
                    commit_subject: "Fix bug".to_string(),
                })
            });
        ci.expect_find_latest_workflow()
            .returning(|_| Ok(WorkflowId::new("w1")));
        ci.expect_find_approval_job()
            .returning(|_| Ok(Some(JobId::new("j1"))));

        let mut chat = MockChatApi::new();
        chat.expect_post_message()
            .withf(|channel: &str, blocks: &Vec<Block>, _text: &str| {
                channel == "C123"
                    && blocks.first().and_then(Block::section_text)
                        == Some(
                            "Approval requested for branch release/fee_collab, @task-automation-devs",
                        )
            })
            .times(1)
            .returning(|_, _, _| Ok(PostMessageResponse::default()));

        commands(ci, chat, None)
            .dispatch(
                CommandKind::DeployByBranch,
                &slash("/deploy-by-branch", "release/fee_collab @task-automation-devs"),
            )
            .await;
    }

    #[tokio::test]
    async fn test_failure_posts_help_to_channel() {
        let mut ci = MockCiApi::new();
        ci.expect_find_latest_pipeline().never();

        let mut chat = MockChatApi::new();
        chat.expect_post_message()
            .withf(|channel: &str, blocks: &Vec<Block>, text: &str| {
                channel == "C123"
                    && blocks.is_empty()
                    && text.starts_with("Unable to deploy with parameters: ``")
                    && text.ends_with("Error: missing branch name")
            })
            .times(1)
            .returning(|_, _, _| Ok(PostMessageResponse::default()));

        commands(ci, chat, None)
            .dispatch(CommandKind::DeployByBranch, &slash("/deploy-by-branch", ""))
            .await;
    }
}
