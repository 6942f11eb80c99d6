//! Application state shared across handlers.

use std::sync::Arc;

use crate::commands::Commands;
use crate::slack::SlackClient;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    slack: SlackClient,
    commands: Commands,
}

impl AppState {
    #[must_use]
    pub fn new(slack: SlackClient, commands: Commands) -> Self {
        Self {
            inner: Arc::new(AppStateInner { slack, commands }),
        }
    }

    /// Client used to verify inbound request signatures.
    #[must_use]
    pub fn slack(&self) -> &SlackClient {
        &self.inner.slack
    }

    #[must_use]
    pub fn commands(&self) -> &Commands {
        &self.inner.commands
    }
}
