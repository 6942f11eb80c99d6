//! CircleCI v2 API client.

use std::sync::Arc;

use async_trait::async_trait;
use deploy_bot_core::{JobId, PipelineId, WorkflowId};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::error::{CircleCiError, LookupKind};
use super::types::{Job, Page, Pipeline, PipelineSummary, Workflow, select_approval_job};
use crate::config::CircleCiConfig;

/// Header CircleCI reads the personal API token from.
const TOKEN_HEADER: &str = "Circle-Token";

/// The CI operations the deploy workflows depend on.
///
/// Each method issues exactly one request and never retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CiApi: Send + Sync {
    /// Most recent pipeline triggered for `branch`.
    async fn find_latest_pipeline(&self, branch: &str) -> Result<PipelineSummary, CircleCiError>;

    /// First workflow of a pipeline.
    async fn find_latest_workflow(
        &self,
        pipeline_id: &PipelineId,
    ) -> Result<WorkflowId, CircleCiError>;

    /// Approval job of a workflow, or `None` if the workflow has no gate.
    async fn find_approval_job(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<JobId>, CircleCiError>;

    /// Release an approval job. Succeeds only on `202 Accepted`.
    async fn approve(&self, workflow_id: &WorkflowId, job_id: &JobId)
    -> Result<(), CircleCiError>;
}

/// CircleCI API client scoped to one project.
#[derive(Clone)]
pub struct CircleCiClient {
    inner: Arc<CircleCiClientInner>,
}

struct CircleCiClientInner {
    client: reqwest::Client,
    api_base: String,
    project_slug: String,
}

impl std::fmt::Debug for CircleCiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircleCiClient")
            .field("api_base", &self.inner.api_base)
            .field("project_slug", &self.inner.project_slug)
            .finish_non_exhaustive()
    }
}

impl CircleCiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &CircleCiConfig) -> Result<Self, CircleCiError> {
        let mut token = HeaderValue::from_str(config.token.expose_secret())
            .map_err(|e| CircleCiError::Parse(format!("Invalid API token format: {e}")))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, token);
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(CircleCiClientInner {
                client,
                api_base: config.api_base.trim_end_matches('/').to_string(),
                project_slug: config.project_slug.clone(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.api_base)
    }

    /// GET a list endpoint and return its first page of items.
    ///
    /// Anything other than 200 becomes a `Lookup` error of `kind` carrying the
    /// upstream status and body.
    async fn get_items<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        kind: LookupKind,
        key: &str,
    ) -> Result<Vec<T>, CircleCiError> {
        let response = request.send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(%kind, key, status = status.as_u16(), "CircleCI lookup failed");
            return Err(CircleCiError::Lookup {
                kind,
                key: key.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let page: Page<T> = response
            .json()
            .await
            .map_err(|e| CircleCiError::Parse(format!("Failed to parse response: {e}")))?;

        Ok(page.items)
    }

    /// Error for a 200 response whose item list was empty.
    fn empty(kind: LookupKind, key: &str) -> CircleCiError {
        CircleCiError::Lookup {
            kind,
            key: key.to_string(),
            status: StatusCode::OK.as_u16(),
            body: "no items returned".to_string(),
        }
    }
}

#[async_trait]
impl CiApi for CircleCiClient {
    #[instrument(skip(self), fields(branch = %branch))]
    async fn find_latest_pipeline(&self, branch: &str) -> Result<PipelineSummary, CircleCiError> {
        let request = self
            .inner
            .client
            .get(self.url(&format!("project/{}/pipeline", self.inner.project_slug)))
            .query(&[("branch", branch)]);

        let pipelines: Vec<Pipeline> = self
            .get_items(request, LookupKind::NoPipeline, branch)
            .await?;

        let summary = pipelines
            .into_iter()
            .next()
            .map(PipelineSummary::from)
            .ok_or_else(|| Self::empty(LookupKind::NoPipeline, branch))?;

        debug!(pipeline_id = %summary.id, sha = %summary.commit_sha, "Found pipeline");
        Ok(summary)
    }

    #[instrument(skip(self), fields(pipeline_id = %pipeline_id))]
    async fn find_latest_workflow(
        &self,
        pipeline_id: &PipelineId,
    ) -> Result<WorkflowId, CircleCiError> {
        let request = self
            .inner
            .client
            .get(self.url(&format!("pipeline/{pipeline_id}/workflow")));

        let workflows: Vec<Workflow> = self
            .get_items(request, LookupKind::NoWorkflow, pipeline_id.as_str())
            .await?;

        let workflow_id = workflows
            .into_iter()
            .next()
            .map(|w| w.id)
            .ok_or_else(|| Self::empty(LookupKind::NoWorkflow, pipeline_id.as_str()))?;

        debug!(workflow_id = %workflow_id, "Found workflow");
        Ok(workflow_id)
    }

    #[instrument(skip(self), fields(workflow_id = %workflow_id))]
    async fn find_approval_job(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<JobId>, CircleCiError> {
        let request = self
            .inner
            .client
            .get(self.url(&format!("workflow/{workflow_id}/job")));

        let jobs: Vec<Job> = self
            .get_items(request, LookupKind::NoJobs, workflow_id.as_str())
            .await?;

        let job_id = select_approval_job(jobs);
        debug!(job_id = ?job_id, "Looked up approval job");
        Ok(job_id)
    }

    #[instrument(skip(self), fields(workflow_id = %workflow_id, job_id = %job_id))]
    async fn approve(&self, workflow_id: &WorkflowId, job_id: &JobId) -> Result<(), CircleCiError> {
        let response = self
            .inner
            .client
            .post(self.url(&format!("workflow/{workflow_id}/approve/{job_id}")))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "CircleCI approval rejected");
            return Err(CircleCiError::Approval {
                job_id: job_id.clone(),
                status: status.as_u16(),
                body,
            });
        }

        debug!("Approval job released");
        Ok(())
    }
}
