//! Command handler errors.

use thiserror::Error;

use crate::github::GitHubError;
use crate::heroku::HerokuError;
use crate::slack::SlackError;

/// Errors raised by the peripheral slash commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A required positional argument was absent.
    #[error("Missing {0} in command text")]
    MissingArguments(&'static str),

    /// The command needs an integration that has no credentials.
    #[error("{0} is not configured for this bot")]
    NotConfigured(&'static str),

    /// The app has no recorded deployed commit.
    #[error("no deployed git hash found for `{0}`")]
    NoDeployedHash(String),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Heroku(#[from] HerokuError),

    #[error(transparent)]
    Chat(#[from] SlackError),
}
