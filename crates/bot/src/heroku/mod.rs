//! Heroku Platform API client.
//!
//! The only question asked of Heroku is which commit an app is running,
//! read from the config vars CircleCI sets on deploy.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::HerokuConfig;

/// Heroku Platform API base URL.
const BASE_URL: &str = "https://api.heroku.com";

/// Config var set on Docker-based apps.
const GIT_HASH_VAR: &str = "GIT_HASH";

/// Config var set on slug-based apps.
const SLUG_COMMIT_VAR: &str = "HEROKU_SLUG_COMMIT";

/// Errors that can occur when interacting with the Heroku API.
#[derive(Debug, Error)]
pub enum HerokuError {
    /// HTTP request failed.
    #[error("Heroku request failed: {0}")]
    Request(String),

    /// API returned an error response.
    #[error("Heroku API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Heroku parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for HerokuError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

/// Read access to an app's config vars.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigVarSource: Send + Sync {
    /// Commit currently deployed on `app`, if the app records one.
    async fn deployed_git_hash(&self, app: &str) -> Result<Option<String>, HerokuError>;
}

/// Heroku API client.
#[derive(Clone)]
pub struct HerokuClient {
    inner: Arc<HerokuClientInner>,
}

struct HerokuClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for HerokuClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HerokuClient").finish_non_exhaustive()
    }
}

impl HerokuClient {
    /// Create a new Heroku API client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &HerokuConfig) -> Result<Self, HerokuError> {
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token.expose_secret()))
            .map_err(|e| HerokuError::Parse(format!("Invalid token format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("Authorization", auth);
        headers.insert(
            "Accept",
            HeaderValue::from_static("application/vnd.heroku+json; version=3"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let base_url = Url::parse(BASE_URL)
            .map_err(|e| HerokuError::Parse(format!("Invalid base URL: {e}")))?;

        Ok(Self {
            inner: Arc::new(HerokuClientInner { client, base_url }),
        })
    }

    /// `apps/{app}/config-vars`, with `app` kept to a single path segment.
    fn config_vars_url(&self, app: &str) -> Result<Url, HerokuError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| HerokuError::Parse("Base URL cannot take a path".into()))?
            .pop_if_empty()
            .extend(["apps", app, "config-vars"]);
        Ok(url)
    }
}

#[async_trait]
impl ConfigVarSource for HerokuClient {
    #[instrument(skip(self))]
    async fn deployed_git_hash(&self, app: &str) -> Result<Option<String>, HerokuError> {
        let response = self
            .inner
            .client
            .get(self.config_vars_url(app)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Unable to read Heroku config vars");
            return Err(HerokuError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let vars: HashMap<String, Option<String>> = response
            .json()
            .await
            .map_err(|e| HerokuError::Parse(format!("Failed to parse config vars: {e}")))?;

        let hash = git_hash_from_vars(&vars);
        debug!(hash = ?hash, "Read deployed git hash");
        Ok(hash)
    }
}

/// `GIT_HASH`, falling back to `HEROKU_SLUG_COMMIT`. Empty values count as unset.
fn git_hash_from_vars(vars: &HashMap<String, Option<String>>) -> Option<String> {
    [GIT_HASH_VAR, SLUG_COMMIT_VAR].into_iter().find_map(|key| {
        vars.get(key)
            .and_then(Option::as_deref)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    })
}
