//! CircleCI v2 API response types.
//!
//! Only the fields the lookup chain reads are modelled; everything else in
//! the payloads is ignored.

use deploy_bot_core::{JobId, PipelineId, WorkflowId};
use serde::Deserialize;

/// Job `type` value marking a manual approval gate.
pub const APPROVAL_JOB_TYPE: &str = "approval";

/// Paged list wrapper used by every list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// A pipeline run.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    #[serde(default)]
    pub vcs: PipelineVcs,
}

/// Version control details of a pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineVcs {
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub commit: Option<PipelineCommit>,
}

/// Commit metadata attached to a pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineCommit {
    #[serde(default)]
    pub subject: Option<String>,
}

/// A workflow inside a pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
}

/// A job inside a workflow.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: String,
}

impl Job {
    /// Whether this job is a manual approval gate.
    #[must_use]
    pub fn is_approval(&self) -> bool {
        self.job_type == APPROVAL_JOB_TYPE
    }
}

/// What the prompt needs to know about the latest pipeline of a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub id: PipelineId,
    pub commit_sha: String,
    pub commit_subject: String,
}

impl From<Pipeline> for PipelineSummary {
    fn from(pipeline: Pipeline) -> Self {
        let commit_subject = pipeline
            .vcs
            .commit
            .and_then(|c| c.subject)
            .unwrap_or_default();

        Self {
            id: pipeline.id,
            commit_sha: pipeline.vcs.revision,
            commit_subject,
        }
    }
}

/// Pick the approval job from a workflow's jobs: the last one typed `approval`.
#[must_use]
pub fn select_approval_job(jobs: Vec<Job>) -> Option<JobId> {
    jobs.into_iter()
        .rev()
        .find(Job::is_approval)
        .map(|job| job.id)
}
