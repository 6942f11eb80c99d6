//! CircleCI API client for the deploy approval chain.
//!
//! # API Reference
//!
//! - Base URL: `https://circleci.com/api/v2`
//! - Authentication: personal API token via the `Circle-Token` header
//! - Lookup chain: pipeline by branch, workflow by pipeline, jobs by workflow
//! - Approval: `POST workflow/{id}/approve/{job}` answers `202 Accepted`

mod client;
mod error;
mod types;

#[cfg(test)]
pub use client::MockCiApi;
pub use client::{CiApi, CircleCiClient};
pub use error::{CircleCiError, LookupKind};
pub use types::{APPROVAL_JOB_TYPE, Job, PipelineSummary, select_approval_job};
