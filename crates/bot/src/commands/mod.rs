//! Slash command and button handlers.
//!
//! Every handler owns its failure reporting: errors are logged once and
//! turned into exactly one message back to the user, so callers only need to
//! spawn the returned future.
//!
//! | Command | Reply channel |
//! |---|---|
//! | `/deploy-by-branch <branch> [@recipient]` | prompt posted to the channel |
//! | `/commit-list <app> <filter>` | `response_url`, in channel |
//! | `/latest-deploy <app>` | `response_url`, in channel |
//! | `/deploy-reminder [in\|at] <time> [@recipient]` | posted + scheduled |
//!
//! Each command also answers to its `-test` suffixed name.

mod commit_list;
mod deploy_by_branch;
mod error;
mod interaction;
mod latest_deploy;
pub mod reminder;

use std::sync::Arc;

use chrono_tz::Tz;
use tracing::{error, instrument};

pub use commit_list::commit_list_help_message;
pub use deploy_by_branch::deploy_help_message;
pub use error::CommandError;
pub use reminder::{MAX_REMINDER_MINUTES, ReminderError, ReminderPlan, plan_reminder};

use crate::deploy::{DeployWorkflow, ResolutionGuard};
use crate::github::SourceHost;
use crate::heroku::ConfigVarSource;
use crate::slack::{ChatApi, ResponseMessage, SlashCommand};

/// Suffix accepted on every command name for staging installs.
const TEST_SUFFIX: &str = "-test";

/// Slash commands the bot answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    DeployByBranch,
    CommitList,
    LatestDeploy,
    DeployReminder,
}

impl CommandKind {
    /// Resolve a command name such as `/commit-list-test`.
    #[must_use]
    pub fn parse(command: &str) -> Option<Self> {
        let name = command.trim().trim_start_matches('/');
        let name = name.strip_suffix(TEST_SUFFIX).unwrap_or(name);

        match name {
            "deploy-by-branch" => Some(Self::DeployByBranch),
            "commit-list" => Some(Self::CommitList),
            "latest-deploy" => Some(Self::LatestDeploy),
            "deploy-reminder" => Some(Self::DeployReminder),
            _ => None,
        }
    }
}

/// The `index`th space-separated argument of `text`, if present and non-empty.
#[must_use]
pub fn parse_argument(text: &str, index: usize) -> Option<&str> {
    text.split(' ').nth(index).filter(|arg| !arg.is_empty())
}

/// GitHub and Heroku access for the release-note commands.
#[derive(Clone)]
pub struct ReleaseSources {
    pub github: Arc<dyn SourceHost>,
    pub heroku: Option<Arc<dyn ConfigVarSource>>,
    pub stable_branch: String,
    /// Deployed hash to use instead of asking Heroku (local testing).
    pub hash_override: Option<String>,
}

impl ReleaseSources {
    /// Commit currently running on `app` according to Heroku.
    async fn heroku_hash(&self, app: &str) -> Result<String, CommandError> {
        let heroku = self
            .heroku
            .as_ref()
            .ok_or(CommandError::NotConfigured("Heroku"))?;

        heroku
            .deployed_git_hash(app)
            .await?
            .ok_or_else(|| CommandError::NoDeployedHash(app.to_string()))
    }

    /// Like [`Self::heroku_hash`], but honouring the configured override.
    async fn deployed_hash(&self, app: &str) -> Result<String, CommandError> {
        match &self.hash_override {
            Some(hash) => Ok(hash.clone()),
            None => self.heroku_hash(app).await,
        }
    }
}

/// Handlers for every slash command and prompt button.
#[derive(Clone)]
pub struct Commands {
    chat: Arc<dyn ChatApi>,
    deploy: DeployWorkflow,
    release: Option<ReleaseSources>,
    timezone: Tz,
    guard: Option<ResolutionGuard>,
}

impl std::fmt::Debug for Commands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commands")
            .field("release_configured", &self.release.is_some())
            .field("timezone", &self.timezone)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl Commands {
    /// Create the handlers.
    #[must_use]
    pub fn new(
        chat: Arc<dyn ChatApi>,
        deploy: DeployWorkflow,
        release: Option<ReleaseSources>,
        timezone: Tz,
    ) -> Self {
        Self {
            chat,
            deploy,
            release,
            timezone,
            guard: None,
        }
    }

    /// Drop repeated resolutions of the same prompt.
    #[must_use]
    pub fn with_guard(mut self, guard: ResolutionGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Run a slash command to completion, reporting any failure to the user.
    #[instrument(
        skip(self, command),
        fields(user = %command.user_id, channel = %command.channel_id)
    )]
    pub async fn dispatch(&self, kind: CommandKind, command: &SlashCommand) {
        match kind {
            CommandKind::DeployByBranch => self.deploy_by_branch(command).await,
            CommandKind::CommitList => self.commit_list(command).await,
            CommandKind::LatestDeploy => self.latest_deploy(command).await,
            CommandKind::DeployReminder => self.deploy_reminder(command).await,
        }
    }

    fn release_sources(&self) -> Result<&ReleaseSources, CommandError> {
        self.release
            .as_ref()
            .ok_or(CommandError::NotConfigured("GitHub"))
    }

    /// Post a plain text message to a channel, logging failures.
    async fn say(&self, channel: &str, text: &str) {
        if let Err(e) = self.chat.post_message(channel, Vec::new(), text).await {
            error!(error = %e, channel, "Failed to post message");
        }
    }

    /// Reply through a command's `response_url`, logging failures.
    async fn reply(&self, command: &SlashCommand, message: ResponseMessage) {
        if let Err(e) = self.chat.respond(&command.response_url, message).await {
            error!(error = %e, "Failed to respond to command");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_kind_parse() {
        assert_eq!(
            CommandKind::parse("/deploy-by-branch"),
            Some(CommandKind::DeployByBranch)
        );
        assert_eq!(
            CommandKind::parse("/commit-list-test"),
            Some(CommandKind::CommitList)
        );
        assert_eq!(
            CommandKind::parse("/latest-deploy"),
            Some(CommandKind::LatestDeploy)
        );
        assert_eq!(
            CommandKind::parse("/deploy-reminder-test"),
            Some(CommandKind::DeployReminder)
        );
        assert_eq!(CommandKind::parse("/deploy"), None);
        assert_eq!(CommandKind::parse("/commit-list-test-test"), None);
    }

    #[test]
    fn test_parse_argument() {
        let text = "stp-instant-cd fee_collab";
        assert_eq!(parse_argument(text, 0), Some("stp-instant-cd"));
        assert_eq!(parse_argument(text, 1), Some("fee_collab"));
        assert_eq!(parse_argument(text, 2), None);
    }

    #[test]
    fn test_parse_argument_empty_text() {
        assert_eq!(parse_argument("", 0), None);
        assert_eq!(parse_argument("app  filter", 1), None);
    }
}
