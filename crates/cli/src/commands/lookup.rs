//! CircleCI lookup command.
//!
//! Runs the same pipeline, workflow and approval-job chain as
//! `/deploy-by-branch` without posting anything or approving the job.
//!
//! # Environment Variables
//!
//! - `CIRCLE_CI_TOKEN` - CircleCI personal API token
//! - `CIRCLECI_API_BASE` - API base URL (optional)
//! - `CIRCLECI_PROJECT_SLUG` - Project slug (optional)

use deploy_bot::circleci::{CircleCiClient, CircleCiError};
use deploy_bot::config::{CircleCiConfig, ConfigError};
use deploy_bot::deploy::{DeployError, pending_approval};
use thiserror::Error;

/// Errors that can occur during a lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("CircleCI client error: {0}")]
    Client(#[from] CircleCiError),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

/// Resolve `branch` to the token a prompt would carry.
pub async fn run(branch: &str) -> Result<(), LookupError> {
    let config = CircleCiConfig::from_env()?;
    let client = CircleCiClient::new(&config)?;

    tracing::info!("Looking up {} in {}...", branch, config.project_slug);
    let token = pending_approval(&client, branch).await?;

    tracing::info!("Pending approval found!");
    tracing::info!("  Commit: {} {}", token.commit_sha, token.commit_subject);
    tracing::info!("  Workflow: {}", token.workflow_id);
    tracing::info!("  Approval job: {}", token.job_id);
    tracing::info!("");
    tracing::info!("Button value:");
    tracing::info!("  {}", token.encode());

    Ok(())
}
