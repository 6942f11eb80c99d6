//! Slack integration for deploy prompts and command replies.
//!
//! This module provides:
//! - [`SlackClient`] for sending, updating and scheduling messages
//! - [`ChatApi`], the seam the workflows depend on
//! - Block Kit types for building rich messages
//! - Message builders for the deploy prompt and its terminal renderings
//! - Webhook signature verification
//!
//! # Flow
//!
//! 1. `/deploy-by-branch` posts a prompt with Approve and Cancel buttons
//! 2. A user clicks one of them
//! 3. Webhook handler receives the interaction, verifies the signature
//! 4. The CircleCI approval job is released (Approve only)
//! 5. The prompt is updated in place with who resolved it and when

mod client;
mod error;
pub mod messages;
mod types;

#[cfg(test)]
pub use client::MockChatApi;
#[cfg(test)]
pub(crate) use client::sign;
pub use client::{ChatApi, SlackClient};
pub use error::SlackError;
pub use messages::{
    build_deploy_prompt_message, build_deploy_resolved_message, deploy_fallback_text,
    no_commits_block, pr_summary_block,
};
pub use types::{
    ActionElement, Block, ButtonStyle, ConfirmationDialog, InteractionAction, InteractionPayload,
    InteractionUser, PlainText, PostMessageResponse, ResponseMessage, ResponseType,
    ScheduleMessageResponse, SlashCommand, Text, UpdateMessageResponse,
};
