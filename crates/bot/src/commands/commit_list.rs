//! `/commit-list <app> <filter>`: merged PRs not yet deployed on an app.
//!
//! Walks the commits between the app's deployed hash and the head of the
//! stable branch, keeps those that touched a path containing `filter`, and
//! lists the pull requests they came from.

use std::fmt::Display;

use tracing::{debug, error, info};

use super::{CommandError, Commands, parse_argument};
use crate::slack::{
    Block, ResponseMessage, ResponseType, SlashCommand, no_commits_block, pr_summary_block,
};

/// Slack rejects messages with more blocks than this.
const MAX_BLOCKS_PER_MESSAGE: usize = 50;

/// Help text sent when the commit list could not be built.
#[must_use]
pub fn commit_list_help_message(text: &str, error: &dyn Display) -> String {
    format!(
        "Unable to get latest commits with parameters: `{text}`, example usages:\n\
         `/commit-list stp-instant-cd fee_collab`\n\
         `/commit-list stp-resware-api-plus resware`\n\
         Error: {error}"
    )
}

impl Commands {
    pub(super) async fn commit_list(&self, command: &SlashCommand) {
        if let Err(e) = self.try_commit_list(command).await {
            error!(error = %e, "Unable to list commits");
            self.reply(
                command,
                ResponseMessage::text(
                    ResponseType::Ephemeral,
                    commit_list_help_message(&command.text, &e),
                ),
            )
            .await;
        }
    }

    async fn try_commit_list(&self, command: &SlashCommand) -> Result<(), CommandError> {
        let (Some(app), Some(filter)) = (
            parse_argument(&command.text, 0),
            parse_argument(&command.text, 1),
        ) else {
            return Err(CommandError::MissingArguments("app_name or item_filter"));
        };
        let sources = self.release_sources()?;

        self.chat
            .respond(
                &command.response_url,
                ResponseMessage::text(
                    ResponseType::InChannel,
                    format!(
                        "`{app}`: loading latest undeployed commits with item_filter `{filter}`..."
                    ),
                ),
            )
            .await?;

        let stable_head = sources.github.branch_head(&sources.stable_branch).await?;
        info!(stable_head = %stable_head, "Got latest stable commit");

        let deployed = sources.deployed_hash(app).await?;

        let commits = match sources.github.compare(&deployed, &stable_head).await {
            Ok(commits) => commits,
            Err(e) => {
                error!(error = %e, base = %deployed, head = %stable_head, "Unable to compare hashes");
                self.reply(
                    command,
                    ResponseMessage::text(
                        ResponseType::InChannel,
                        "Unable to retrieve commits. See logs for details",
                    ),
                )
                .await;
                return Ok(());
            }
        };

        let mut blocks: Vec<Block> = Vec::new();
        for sha in commits {
            let files = sources.github.commit_files(&sha).await?;
            if !files.iter().any(|file| file.contains(filter)) {
                debug!(sha = %sha, filter, "No matching files in commit");
                continue;
            }

            for pr in sources.github.pulls_for_commit(&sha).await? {
                blocks.push(pr_summary_block(&pr));
            }
        }

        if blocks.is_empty() {
            blocks.push(no_commits_block(app, filter));
        }

        for chunk in blocks.chunks(MAX_BLOCKS_PER_MESSAGE) {
            self.chat
                .respond(
                    &command.response_url,
                    ResponseMessage::blocks(ResponseType::InChannel, chunk.to_vec()),
                )
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockall::Sequence;

    use super::*;
    use crate::circleci::MockCiApi;
    use crate::commands::test_support::{TEST_RESPONSE_URL, commands, slash};
    use crate::commands::{CommandKind, ReleaseSources};
    use crate::github::{GitHubError, MockSourceHost, PullRequest};
    use crate::heroku::MockConfigVarSource;
    use crate::slack::MockChatApi;

    fn pr(number: u64) -> PullRequest {
        PullRequest {
            number,
            title: format!("Change {number}"),
            html_url: format!("https://github.com/StatesTitle/underwriter/pull/{number}"),
            merged_at: None,
        }
    }

    fn sources(github: MockSourceHost, hash_override: Option<&str>) -> ReleaseSources {
        let mut heroku = MockConfigVarSource::new();
        heroku
            .expect_deployed_git_hash()
            .withf(|app: &str| app == "stp-instant-cd")
            .returning(|_| Ok(Some("deployed".to_string())));

        ReleaseSources {
            github: Arc::new(github),
            heroku: Some(Arc::new(heroku)),
            stable_branch: "stable".to_string(),
            hash_override: hash_override.map(ToString::to_string),
        }
    }

    fn response_text(message: &ResponseMessage) -> String {
        message
            .text
            .clone()
            .or_else(|| {
                message
                    .blocks
                    .first()
                    .and_then(Block::section_text)
                    .map(ToString::to_string)
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_help_message() {
        let message = commit_list_help_message("stp-instant-cd", &"boom");
        assert!(message.starts_with(
            "Unable to get latest commits with parameters: `stp-instant-cd`, example usages:\n"
        ));
        assert!(message.ends_with("Error: boom"));
    }

    #[tokio::test]
    async fn test_lists_prs_for_matching_commits() {
        let mut github = MockSourceHost::new();
        github
            .expect_branch_head()
            .withf(|branch: &str| branch == "stable")
            .returning(|_| Ok("stable-head".to_string()));
        github
            .expect_compare()
            .withf(|base: &str, head: &str| base == "deployed" && head == "stable-head")
            .returning(|_, _| Ok(vec!["c1".to_string(), "c2".to_string()]));
        github.expect_commit_files().returning(|sha| {
            Ok(match sha {
                "c1" => vec!["underwriter/fee_collab/models.py".to_string()],
                _ => vec!["docs/README.md".to_string()],
            })
        });
        github
            .expect_pulls_for_commit()
            .withf(|sha: &str| sha == "c1")
            .times(1)
            .returning(|_| Ok(vec![pr(101)]));

        let mut chat = MockChatApi::new();
        let mut seq = Sequence::new();
        chat.expect_respond()
            .withf(|url: &str, message: &ResponseMessage| {
                url == TEST_RESPONSE_URL
                    && message.response_type == ResponseType::InChannel
                    && response_text(message)
                        == "`stp-instant-cd`: loading latest undeployed commits with item_filter `fee_collab`..."
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        chat.expect_respond()
            .withf(|_url: &str, message: &ResponseMessage| {
                message.blocks.len() == 1 && response_text(message).contains("#101")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        commands(MockCiApi::new(), chat, Some(sources(github, None)))
            .dispatch(
                CommandKind::CommitList,
                &slash("/commit-list", "stp-instant-cd fee_collab"),
            )
            .await;
    }

    #[tokio::test]
    async fn test_no_matches_sends_no_commits_block() {
        let mut github = MockSourceHost::new();
        github
            .expect_branch_head()
            .returning(|_| Ok("stable-head".to_string()));
        github
            .expect_compare()
            .withf(|base: &str, _head: &str| base == "override-hash")
            .returning(|_, _| Ok(vec!["c1".to_string()]));
        github
            .expect_commit_files()
            .returning(|_| Ok(vec!["other/file.py".to_string()]));
        github.expect_pulls_for_commit().never();

        let mut chat = MockChatApi::new();
        chat.expect_respond()
            .withf(|_url: &str, message: &ResponseMessage| {
                response_text(message).contains("loading latest undeployed commits")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        chat.expect_respond()
            .withf(|_url: &str, message: &ResponseMessage| {
                response_text(message)
                    == "No commits were merged matching `fee_collab` since `stp-instant-cd` was last deployed"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        commands(
            MockCiApi::new(),
            chat,
            Some(sources(github, Some("override-hash"))),
        )
        .dispatch(
            CommandKind::CommitList,
            &slash("/commit-list-test", "stp-instant-cd fee_collab"),
        )
        .await;
    }

    #[tokio::test]
    async fn test_compare_failure_reports_and_stops() {
        let mut github = MockSourceHost::new();
        github
            .expect_branch_head()
            .returning(|_| Ok("stable-head".to_string()));
        github.expect_compare().returning(|_, _| {
            Err(GitHubError::Api {
                status: 404,
                message: "No common ancestor".to_string(),
            })
        });
        github.expect_commit_files().never();

        let mut chat = MockChatApi::new();
        let mut seq = Sequence::new();
        chat.expect_respond()
            .withf(|_url: &str, message: &ResponseMessage| {
                response_text(message).contains("loading latest undeployed commits")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        chat.expect_respond()
            .withf(|_url: &str, message: &ResponseMessage| {
                response_text(message) == "Unable to retrieve commits. See logs for details"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        commands(MockCiApi::new(), chat, Some(sources(github, None)))
            .dispatch(
                CommandKind::CommitList,
                &slash("/commit-list", "stp-instant-cd fee_collab"),
            )
            .await;
    }

    #[tokio::test]
    async fn test_missing_filter_sends_help() {
        let mut chat = MockChatApi::new();
        chat.expect_respond()
            .withf(|_url: &str, message: &ResponseMessage| {
                message.response_type == ResponseType::Ephemeral
                    && response_text(message)
                        .ends_with("Error: Missing app_name or item_filter in command text")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        commands(MockCiApi::new(), chat, None)
            .dispatch(CommandKind::CommitList, &slash("/commit-list", "stp-instant-cd"))
            .await;
    }

    #[tokio::test]
    async fn test_unconfigured_github_sends_help() {
        let mut chat = MockChatApi::new();
        chat.expect_respond()
            .withf(|_url: &str, message: &ResponseMessage| {
                response_text(message).ends_with("Error: GitHub is not configured for this bot")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        commands(MockCiApi::new(), chat, None)
            .dispatch(
                CommandKind::CommitList,
                &slash("/commit-list", "stp-instant-cd fee_collab"),
            )
            .await;
    }
}
