//! Posting the interactive deploy prompt.

use deploy_bot_core::DeployPromptToken;
use tracing::{info, instrument};

use super::{DeployError, DeployWorkflow};
use crate::circleci::CiApi;
use crate::slack::{build_deploy_prompt_message, deploy_fallback_text};

/// A prompt that made it into a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedPrompt {
    /// Channel the prompt was posted to.
    pub channel: String,
    /// Slack timestamp identifying the prompt message.
    pub ts: String,
    /// Token embedded in the prompt's buttons.
    pub token: DeployPromptToken,
}

/// Run the pipeline, workflow and approval-job lookups for `branch_name`.
///
/// Lookups run strictly in order and stop at the first failure.
///
/// # Errors
///
/// - [`DeployError::MissingBranch`] if the branch is blank
/// - [`DeployError::Ci`] if any lookup fails
/// - [`DeployError::NoApprovalGate`] if the workflow has no approval job
pub async fn pending_approval(
    ci: &dyn CiApi,
    branch_name: &str,
) -> Result<DeployPromptToken, DeployError> {
    let branch_name = branch_name.trim();
    if branch_name.is_empty() {
        return Err(DeployError::MissingBranch);
    }

    let pipeline = ci.find_latest_pipeline(branch_name).await?;
    let workflow_id = ci.find_latest_workflow(&pipeline.id).await?;
    let Some(job_id) = ci.find_approval_job(&workflow_id).await? else {
        return Err(DeployError::NoApprovalGate {
            pipeline_id: pipeline.id,
            workflow_id,
        });
    };

    Ok(DeployPromptToken {
        branch_name: branch_name.to_string(),
        commit_sha: pipeline.commit_sha,
        commit_subject: pipeline.commit_subject,
        job_id,
        workflow_id,
    })
}

impl DeployWorkflow {
    /// Look up the pending approval for `branch_name` and post a prompt for it.
    ///
    /// Nothing is posted unless every lookup in [`pending_approval`] succeeds.
    ///
    /// # Errors
    ///
    /// Any error from [`pending_approval`], or [`DeployError::Chat`] if
    /// posting fails.
    #[instrument(skip(self), fields(channel = %channel_id, branch = %branch_name))]
    pub async fn prompt_deploy(
        &self,
        channel_id: &str,
        branch_name: &str,
        recipient: Option<&str>,
    ) -> Result<PostedPrompt, DeployError> {
        let token = pending_approval(self.ci.as_ref(), branch_name).await?;

        let blocks = build_deploy_prompt_message(&token, recipient);
        let response = self
            .chat
            .post_message(channel_id, blocks, &deploy_fallback_text(&token, None))
            .await?;

        let posted = PostedPrompt {
            channel: response.channel.unwrap_or_else(|| channel_id.to_string()),
            ts: response.ts.unwrap_or_default(),
            token,
        };

        info!(
            ts = %posted.ts,
            workflow_id = %posted.token.workflow_id,
            job_id = %posted.token.job_id,
            "Deploy prompt posted"
        );

        Ok(posted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use deploy_bot_core::{JobId, PipelineId, WorkflowId};
    use mockall::Sequence;

    use super::*;
    use crate::circleci::{CircleCiError, LookupKind, MockCiApi, PipelineSummary};
    use crate::slack::{ActionElement, Block, MockChatApi, PostMessageResponse, SlackError};

    fn pipeline() -> PipelineSummary {
        PipelineSummary {
            id: PipelineId::new("p1"),
            commit_sha: "abc123".to_string(),
            commit_subject: "Fix bug".to_string(),
        }
    }

    fn posted_response() -> PostMessageResponse {
        PostMessageResponse {
            ok: true,
            channel: Some("C123".to_string()),
            ts: Some("1548261231.000200".to_string()),
            error: None,
        }
    }

    fn workflow(ci: MockCiApi, chat: MockChatApi) -> DeployWorkflow {
        DeployWorkflow::new(Arc::new(ci), Arc::new(chat))
    }

    /// CI mock with all three lookups succeeding, in order.
    fn ci_with_gate(job: Option<&'static str>) -> MockCiApi {
        let mut ci = MockCiApi::new();
        let mut seq = Sequence::new();

        ci.expect_find_latest_pipeline()
            .withf(|branch: &str| branch == "release/fee_collab")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(pipeline()));
        ci.expect_find_latest_workflow()
            .withf(|id: &PipelineId| id.as_str() == "p1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(WorkflowId::new("w1")));
        ci.expect_find_approval_job()
            .withf(|id: &WorkflowId| id.as_str() == "w1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(job.map(JobId::new)));
        ci.expect_approve().never();

        ci
    }

    #[tokio::test]
    async fn test_prompt_posts_token_for_approval_job() {
        let mut chat = MockChatApi::new();
        chat.expect_post_message()
            .withf(|channel: &str, blocks: &Vec<Block>, _text: &str| {
                channel == "C123" && blocks.len() == 4
            })
            .times(1)
            .returning(|_, _, _| Ok(posted_response()));

        let posted = workflow(ci_with_gate(Some("j1")), chat)
            .prompt_deploy("C123", "release/fee_collab", None)
            .await
            .expect("prompt posted");

        assert_eq!(posted.ts, "1548261231.000200");
        assert_eq!(
            posted.token,
            DeployPromptToken {
                branch_name: "release/fee_collab".to_string(),
                commit_sha: "abc123".to_string(),
                commit_subject: "Fix bug".to_string(),
                job_id: JobId::new("j1"),
                workflow_id: WorkflowId::new("w1"),
            }
        );
    }

    #[tokio::test]
    async fn test_prompt_buttons_carry_decodable_token() {
        let mut chat = MockChatApi::new();
        chat.expect_post_message()
            .withf(|_channel: &str, blocks: &Vec<Block>, _text: &str| {
                let Some(Block::Actions { elements }) = blocks.last() else {
                    return false;
                };
                elements.iter().all(|element| {
                    let ActionElement::Button { value, .. } = element;
                    value
                        .as_deref()
                        .and_then(|v| DeployPromptToken::decode(v).ok())
                        .is_some_and(|token| {
                            token.job_id.as_str() == "j1" && token.workflow_id.as_str() == "w1"
                        })
                })
            })
            .times(1)
            .returning(|_, _, _| Ok(posted_response()));

        let result = workflow(ci_with_gate(Some("j1")), chat)
            .prompt_deploy("C123", "release/fee_collab", Some("@task-automation-devs"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_no_approval_job_posts_nothing() {
        let mut chat = MockChatApi::new();
        chat.expect_post_message().never();

        let err = workflow(ci_with_gate(None), chat)
            .prompt_deploy("C123", "release/fee_collab", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::NoApprovalGate { ref pipeline_id, ref workflow_id }
                if pipeline_id.as_str() == "p1" && workflow_id.as_str() == "w1"
        ));
    }

    #[tokio::test]
    async fn test_pipeline_failure_stops_chain() {
        let mut ci = MockCiApi::new();
        ci.expect_find_latest_pipeline().times(1).returning(|branch| {
            Err(CircleCiError::Lookup {
                kind: LookupKind::NoPipeline,
                key: branch.to_string(),
                status: 404,
                body: "Not found".to_string(),
            })
        });
        ci.expect_find_latest_workflow().never();
        ci.expect_find_approval_job().never();

        let mut chat = MockChatApi::new();
        chat.expect_post_message().never();

        let err = workflow(ci, chat)
            .prompt_deploy("C123", "release/missing", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::Ci(CircleCiError::Lookup {
                kind: LookupKind::NoPipeline,
                status: 404,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_workflow_failure_stops_chain() {
        let mut ci = MockCiApi::new();
        ci.expect_find_latest_pipeline()
            .times(1)
            .returning(|_| Ok(pipeline()));
        ci.expect_find_latest_workflow().times(1).returning(|id| {
            Err(CircleCiError::Lookup {
                kind: LookupKind::NoWorkflow,
                key: id.to_string(),
                status: 200,
                body: "no items returned".to_string(),
            })
        });
        ci.expect_find_approval_job().never();

        let mut chat = MockChatApi::new();
        chat.expect_post_message().never();

        let err = workflow(ci, chat)
            .prompt_deploy("C123", "release/fee_collab", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::Ci(CircleCiError::Lookup {
                kind: LookupKind::NoWorkflow,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_blank_branch_makes_no_calls() {
        let mut ci = MockCiApi::new();
        ci.expect_find_latest_pipeline().never();
        let mut chat = MockChatApi::new();
        chat.expect_post_message().never();

        let err = workflow(ci, chat)
            .prompt_deploy("C123", "   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::MissingBranch));
    }

    #[tokio::test]
    async fn test_post_failure_is_chat_error() {
        let mut chat = MockChatApi::new();
        chat.expect_post_message()
            .times(1)
            .returning(|_, _, _| Err(SlackError::Api("channel_not_found".to_string())));

        let err = workflow(ci_with_gate(Some("j1")), chat)
            .prompt_deploy("C123", "release/fee_collab", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Chat(SlackError::Api(_))));
    }
}
