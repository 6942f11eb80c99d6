//! Deploy workflow errors.

use deploy_bot_core::{PipelineId, TokenError, WorkflowId};
use thiserror::Error;

use crate::circleci::CircleCiError;
use crate::slack::SlackError;

/// Errors raised while prompting for or resolving a deploy.
///
/// Workflows return these unchanged; the command and interaction handlers
/// turn each one into a single user-visible message.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The command text did not name a branch.
    #[error("missing branch name")]
    MissingBranch,

    /// The latest workflow of the branch has no manual approval job.
    #[error("no approval job found in workflow `{workflow_id}` of pipeline `{pipeline_id}`")]
    NoApprovalGate {
        pipeline_id: PipelineId,
        workflow_id: WorkflowId,
    },

    /// A CircleCI lookup or the approval call failed.
    #[error(transparent)]
    Ci(#[from] CircleCiError),

    /// The button value could not be decoded.
    #[error(transparent)]
    MalformedToken(#[from] TokenError),

    /// Posting or updating the Slack message failed.
    #[error(transparent)]
    Chat(#[from] SlackError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_approval_gate_names_both_ids() {
        let err = DeployError::NoApprovalGate {
            pipeline_id: PipelineId::new("p1"),
            workflow_id: WorkflowId::new("w1"),
        };
        assert_eq!(
            err.to_string(),
            "no approval job found in workflow `w1` of pipeline `p1`"
        );
    }

    #[test]
    fn test_ci_error_is_transparent() {
        let err = DeployError::from(CircleCiError::Request("connection reset".into()));
        assert_eq!(err.to_string(), "CircleCI request failed: connection reset");
    }
}
