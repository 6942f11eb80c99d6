//! Deploy-by-branch approval workflow.
//!
//! A prompt is posted after three chained CircleCI lookups succeed, and is
//! resolved at most once by an Approve or Cancel click. The token embedded in
//! the prompt's buttons is the only state; nothing is stored between the two
//! halves.
//!
//! ```text
//! /deploy-by-branch  ─►  prompt_deploy  ─►  Posted
//!                                            │
//!                      approve_deploy  ◄─────┼─────►  cancel_deploy_prompt
//!                            │                               │
//!                        Approved                        Cancelled
//! ```

mod error;
mod guard;
mod prompt;
mod resolution;

use std::sync::Arc;

pub use error::DeployError;
pub use guard::ResolutionGuard;
pub use prompt::{PostedPrompt, pending_approval};
pub use resolution::ResolutionRequest;

use crate::circleci::CiApi;
use crate::slack::ChatApi;

/// Orchestrates the CI client and the chat client for deploy prompts.
#[derive(Clone)]
pub struct DeployWorkflow {
    ci: Arc<dyn CiApi>,
    chat: Arc<dyn ChatApi>,
}

impl std::fmt::Debug for DeployWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployWorkflow").finish_non_exhaustive()
    }
}

impl DeployWorkflow {
    /// Create a workflow over the given clients.
    #[must_use]
    pub fn new(ci: Arc<dyn CiApi>, chat: Arc<dyn ChatApi>) -> Self {
        Self { ci, chat }
    }
}
