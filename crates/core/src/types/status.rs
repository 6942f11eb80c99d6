//! Action and state enums for deploy prompts and reminders.

use serde::{Deserialize, Serialize};

/// Interactive action a user can take on a deploy prompt.
///
/// Parsed from the Slack `action_id` attached to each button, so the
/// `Display`/`FromStr` forms are part of the message wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployAction {
    /// Approve the pending CircleCI approval job.
    Approve,
    /// Dismiss the prompt without touching CircleCI.
    Cancel,
}

impl DeployAction {
    /// Slack `action_id` for the approve button.
    pub const APPROVE_ACTION_ID: &'static str = "approve_deploy";
    /// Slack `action_id` for the cancel button.
    pub const CANCEL_ACTION_ID: &'static str = "cancel_deploy_prompt";

    /// The Slack `action_id` used for this action's button.
    #[must_use]
    pub const fn action_id(self) -> &'static str {
        match self {
            Self::Approve => Self::APPROVE_ACTION_ID,
            Self::Cancel => Self::CANCEL_ACTION_ID,
        }
    }

    /// The prompt state this action resolves to.
    #[must_use]
    pub const fn terminal_state(self) -> PromptState {
        match self {
            Self::Approve => PromptState::Approved,
            Self::Cancel => PromptState::Cancelled,
        }
    }
}

impl std::fmt::Display for DeployAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.action_id())
    }
}

impl std::str::FromStr for DeployAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::APPROVE_ACTION_ID => Ok(Self::Approve),
            Self::CANCEL_ACTION_ID => Ok(Self::Cancel),
            _ => Err(format!("unknown deploy action: {s}")),
        }
    }
}

/// Lifecycle of a posted deploy prompt.
///
/// Only ever observable through the rendering that currently occupies the
/// Slack message; nothing stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromptState {
    /// Posted with Approve/Cancel buttons.
    #[default]
    Posted,
    /// Approval job released; buttons removed.
    Approved,
    /// Prompt dismissed; buttons removed.
    Cancelled,
}

/// How a deploy reminder time is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderVerb {
    /// `at 12:34` - an absolute wall-clock time.
    At,
    /// `in 30` - a number of minutes from now.
    In,
}

impl std::fmt::Display for ReminderVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::At => write!(f, "at"),
            Self::In => write!(f, "in"),
        }
    }
}

impl std::str::FromStr for ReminderVerb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "at" => Ok(Self::At),
            "in" => Ok(Self::In),
            _ => Err(format!("invalid reminder verb: {s}")),
        }
    }
}
