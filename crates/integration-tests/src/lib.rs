//! Integration test support for the deploy bot.
//!
//! Hand-written fakes for the outbound seams, so the full command path can be
//! driven without Slack or CircleCI.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p deploy-bot-integration-tests
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use deploy_bot::circleci::{CiApi, CircleCiError, LookupKind, PipelineSummary};
use deploy_bot::commands::Commands;
use deploy_bot::deploy::DeployWorkflow;
use deploy_bot::slack::{
    Block, ChatApi, PostMessageResponse, ResponseMessage, ScheduleMessageResponse, SlackError,
    SlashCommand, UpdateMessageResponse,
};
use deploy_bot_core::{JobId, PipelineId, WorkflowId};

/// Timestamp Slack assigns to every message posted through [`RecordingChat`].
pub const POSTED_TS: &str = "1700000000.000100";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// CircleCI stand-in with a single branch, pipeline, workflow and job.
#[derive(Debug)]
pub struct FakeCi {
    pub pipeline: Option<PipelineSummary>,
    pub workflow: Option<WorkflowId>,
    pub approval_job: Option<JobId>,
    /// Status returned by the approval endpoint; anything but 202 fails.
    pub approve_status: u16,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeCi {
    fn default() -> Self {
        Self {
            pipeline: Some(PipelineSummary {
                id: PipelineId::new("p1"),
                commit_sha: "abc123".to_string(),
                commit_subject: "Fix bug".to_string(),
            }),
            workflow: Some(WorkflowId::new("w1")),
            approval_job: Some(JobId::new("j1")),
            approve_status: 202,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeCi {
    /// Latest workflow has no approval job.
    pub fn without_gate() -> Self {
        Self {
            approval_job: None,
            ..Self::default()
        }
    }

    /// Branch has no pipelines.
    pub fn without_pipeline() -> Self {
        Self {
            pipeline: None,
            ..Self::default()
        }
    }

    /// Approval endpoint answers with `status` instead of 202.
    pub fn rejecting_approval(status: u16) -> Self {
        Self {
            approve_status: status,
            ..Self::default()
        }
    }

    /// Every call made so far, e.g. `pipeline:main` or `approve:w1:j1`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Number of approval calls made.
    pub fn approvals(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with("approve:"))
            .count()
    }

    fn record(&self, call: String) {
        lock(&self.calls).push(call);
    }
}

fn not_found(kind: LookupKind, key: &str) -> CircleCiError {
    CircleCiError::Lookup {
        kind,
        key: key.to_string(),
        status: 404,
        body: "Not found".to_string(),
    }
}

#[async_trait]
impl CiApi for FakeCi {
    async fn find_latest_pipeline(&self, branch: &str) -> Result<PipelineSummary, CircleCiError> {
        self.record(format!("pipeline:{branch}"));
        self.pipeline
            .clone()
            .ok_or_else(|| not_found(LookupKind::NoPipeline, branch))
    }

    async fn find_latest_workflow(
        &self,
        pipeline_id: &PipelineId,
    ) -> Result<WorkflowId, CircleCiError> {
        self.record(format!("workflow:{pipeline_id}"));
        self.workflow
            .clone()
            .ok_or_else(|| not_found(LookupKind::NoWorkflow, pipeline_id.as_str()))
    }

    async fn find_approval_job(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<JobId>, CircleCiError> {
        self.record(format!("jobs:{workflow_id}"));
        Ok(self.approval_job.clone())
    }

    async fn approve(&self, workflow_id: &WorkflowId, job_id: &JobId) -> Result<(), CircleCiError> {
        self.record(format!("approve:{workflow_id}:{job_id}"));
        if self.approve_status == 202 {
            Ok(())
        } else {
            Err(CircleCiError::Approval {
                job_id: job_id.clone(),
                status: self.approve_status,
                body: "{\"message\":\"Job is not approvable\"}".to_string(),
            })
        }
    }
}

/// A message as it reached the fake Slack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: String,
    pub ts: Option<String>,
    pub blocks: Vec<Block>,
    pub text: String,
}

/// Slack stand-in that records every outbound call.
#[derive(Debug, Default)]
pub struct RecordingChat {
    posted: Mutex<Vec<SentMessage>>,
    updated: Mutex<Vec<SentMessage>>,
    scheduled: Mutex<Vec<(String, String, i64)>>,
    responses: Mutex<Vec<ResponseMessage>>,
}

impl RecordingChat {
    pub fn posted(&self) -> Vec<SentMessage> {
        lock(&self.posted).clone()
    }

    pub fn updated(&self) -> Vec<SentMessage> {
        lock(&self.updated).clone()
    }

    pub fn scheduled(&self) -> Vec<(String, String, i64)> {
        lock(&self.scheduled).clone()
    }

    pub fn responses(&self) -> Vec<ResponseMessage> {
        lock(&self.responses).clone()
    }
}

#[async_trait]
impl ChatApi for RecordingChat {
    async fn post_message(
        &self,
        channel: &str,
        blocks: Vec<Block>,
        fallback_text: &str,
    ) -> Result<PostMessageResponse, SlackError> {
        lock(&self.posted).push(SentMessage {
            channel: channel.to_string(),
            ts: None,
            blocks,
            text: fallback_text.to_string(),
        });
        Ok(PostMessageResponse {
            ok: true,
            channel: Some(channel.to_string()),
            ts: Some(POSTED_TS.to_string()),
            error: None,
        })
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        blocks: Vec<Block>,
        fallback_text: &str,
    ) -> Result<UpdateMessageResponse, SlackError> {
        lock(&self.updated).push(SentMessage {
            channel: channel.to_string(),
            ts: Some(ts.to_string()),
            blocks,
            text: fallback_text.to_string(),
        });
        Ok(UpdateMessageResponse {
            ok: true,
            channel: Some(channel.to_string()),
            ts: Some(ts.to_string()),
            error: None,
        })
    }

    async fn schedule_message(
        &self,
        channel: &str,
        text: &str,
        post_at: i64,
    ) -> Result<ScheduleMessageResponse, SlackError> {
        lock(&self.scheduled).push((channel.to_string(), text.to_string(), post_at));
        Ok(ScheduleMessageResponse {
            ok: true,
            channel: Some(channel.to_string()),
            ..ScheduleMessageResponse::default()
        })
    }

    async fn respond(&self, _response_url: &str, message: ResponseMessage) -> Result<(), SlackError> {
        lock(&self.responses).push(message);
        Ok(())
    }
}

/// Command handlers backed by the given fakes, without release sources.
pub fn commands(ci: &Arc<FakeCi>, chat: &Arc<RecordingChat>) -> Commands {
    let deploy = DeployWorkflow::new(ci.clone(), chat.clone());
    Commands::new(
        chat.clone(),
        deploy,
        None,
        chrono_tz::America::Los_Angeles,
    )
}

/// A slash command invocation in channel `C123` by user `U42`.
pub fn slash(command: &str, text: &str) -> SlashCommand {
    SlashCommand {
        command: command.to_string(),
        text: text.to_string(),
        user_id: "U42".to_string(),
        channel_id: "C123".to_string(),
        response_url: "https://hooks.slack.com/commands/T1/1/abc".to_string(),
    }
}
