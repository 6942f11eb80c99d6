//! CircleCI-related errors.

use std::fmt;

use deploy_bot_core::JobId;
use thiserror::Error;

/// Which stage of the lookup chain came back empty or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// No pipeline for the branch.
    NoPipeline,
    /// No workflow for the pipeline.
    NoWorkflow,
    /// The jobs of the workflow could not be listed.
    NoJobs,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPipeline => write!(f, "no pipeline found for branch"),
            Self::NoWorkflow => write!(f, "no workflow found for pipeline"),
            Self::NoJobs => write!(f, "no jobs found for workflow"),
        }
    }
}

/// Errors that can occur when talking to the CircleCI API.
#[derive(Debug, Error)]
pub enum CircleCiError {
    /// HTTP request failed before a response arrived.
    #[error("CircleCI request failed: {0}")]
    Request(String),

    /// A read returned an unexpected status or no items.
    #[error("{kind} `{key}` (status {status}): {body}")]
    Lookup {
        kind: LookupKind,
        key: String,
        status: u16,
        body: String,
    },

    /// The approval call did not return 202 Accepted.
    #[error("approval of job `{job_id}` failed (status {status}): {body}")]
    Approval {
        job_id: JobId,
        status: u16,
        body: String,
    },

    /// A successful response could not be decoded.
    #[error("CircleCI response error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for CircleCiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_display_carries_status_and_body() {
        let err = CircleCiError::Lookup {
            kind: LookupKind::NoPipeline,
            key: "release/x".to_string(),
            status: 404,
            body: "{\"message\":\"Not found\"}".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("no pipeline found for branch `release/x`"));
        assert!(message.contains("404"));
        assert!(message.contains("Not found"));
    }

    #[test]
    fn test_approval_display() {
        let err = CircleCiError::Approval {
            job_id: JobId::new("j1"),
            status: 400,
            body: "already approved".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "approval of job `j1` failed (status 400): already approved"
        );
    }
}
