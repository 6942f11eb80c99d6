//! Deploy prompt token: the state embedded in a prompt's buttons.
//!
//! The token is the only record of a pending approval. It travels to Slack as
//! the `value` of the Approve and Cancel buttons and comes back verbatim in
//! the interaction payload, so it must survive an encode/decode round trip
//! field for field.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{JobId, WorkflowId};

/// Errors that can occur when decoding a [`DeployPromptToken`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The value is not a JSON object with all five fields.
    #[error("malformed deploy prompt token: {0}")]
    Malformed(String),
}

/// Everything needed to resolve a pending deploy approval.
///
/// Built only after the pipeline, workflow and approval-job lookups have all
/// succeeded, so `job_id` and `workflow_id` always come from the same run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployPromptToken {
    /// Branch requested for deploy.
    pub branch_name: String,
    /// Head commit of the most recent pipeline on the branch.
    pub commit_sha: String,
    /// Commit summary line, may be empty.
    pub commit_subject: String,
    /// Pending approval job inside the workflow.
    pub job_id: JobId,
    /// Workflow containing the approval job.
    pub workflow_id: WorkflowId,
}

impl DeployPromptToken {
    /// Serialize the token to the compact JSON carried on a button.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::json!({
            "branch_name": self.branch_name,
            "commit_sha": self.commit_sha,
            "commit_subject": self.commit_subject,
            "job_id": self.job_id,
            "workflow_id": self.workflow_id,
        })
        .to_string()
    }

    /// Parse a token from a button value.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`] if the value is not JSON, a field is
    /// missing, or the branch name is empty.
    pub fn decode(value: &str) -> Result<Self, TokenError> {
        let token: Self =
            serde_json::from_str(value).map_err(|e| TokenError::Malformed(e.to_string()))?;

        if token.branch_name.trim().is_empty() {
            return Err(TokenError::Malformed("branch_name is empty".to_string()));
        }

        Ok(token)
    }
}
