//! Bot configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SLACK_BOT_TOKEN` - Slack bot token (xoxb-...)
//! - `SLACK_SIGNING_SECRET` - Slack app signing secret
//! - `CIRCLE_CI_TOKEN` - CircleCI personal API token
//!
//! ## Optional
//! - `BOT_HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 3000)
//! - `CIRCLECI_API_BASE` - API base URL (default: <https://circleci.com/api/v2>)
//! - `CIRCLECI_PROJECT_SLUG` - Project slug (default: gh/StatesTitle/underwriter)
//! - `REMINDER_TIMEZONE` - IANA zone for `/deploy-reminder at` (default: America/Los_Angeles)
//! - `DEPLOY_DEDUPE_RESOLUTIONS` - Act on only the first click per prompt (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sample rates (default: 1.0)
//!
//! ## Optional (release notes - enables `/commit-list` and `/latest-deploy`)
//! - `GITHUB_TOKEN` - GitHub token with read access to the repository
//! - `GITHUB_REPOSITORY` - `owner/repo` (default: StatesTitle/underwriter)
//! - `GITHUB_STABLE_BRANCH` - Branch compared against deploys (default: stable)
//! - `HEROKU_TOKEN` - Heroku API token (`heroku auth:token`)
//! - `SAMPLE_HEROKU_GIT_HASH` - Deployed hash override for local testing

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use chrono_tz::Tz;
use secrecy::SecretString;
use thiserror::Error;

/// Default CircleCI v2 API base.
pub const DEFAULT_CIRCLECI_API_BASE: &str = "https://circleci.com/api/v2";
/// Default CircleCI project slug.
pub const DEFAULT_CIRCLECI_PROJECT_SLUG: &str = "gh/StatesTitle/underwriter";
/// Default GitHub repository.
pub const DEFAULT_GITHUB_REPOSITORY: &str = "StatesTitle/underwriter";

const DEFAULT_STABLE_BRANCH: &str = "stable";
const DEFAULT_REMINDER_TIMEZONE: Tz = chrono_tz::America::Los_Angeles;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Slack credentials
    pub slack: SlackConfig,
    /// CircleCI project access
    pub circleci: CircleCiConfig,
    /// GitHub access for release notes (optional)
    pub github: Option<GitHubConfig>,
    /// Heroku access for deployed hashes (optional)
    pub heroku: Option<HerokuConfig>,
    /// Deployed hash to report instead of asking Heroku
    pub sample_git_hash: Option<String>,
    /// Zone `/deploy-reminder at` times are read in
    pub reminder_timezone: Tz,
    /// Whether repeated clicks on a prompt are dropped
    pub dedupe_resolutions: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Slack app credentials.
///
/// Implements `Debug` manually to redact secrets.
#[derive(Clone)]
pub struct SlackConfig {
    /// Slack bot token (xoxb-...).
    pub bot_token: SecretString,
    /// Slack app signing secret for webhook verification.
    pub signing_secret: SecretString,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .finish()
    }
}

/// CircleCI API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct CircleCiConfig {
    /// Personal API token sent as `Circle-Token`
    pub token: SecretString,
    /// API base URL
    pub api_base: String,
    /// Project slug (`gh/<owner>/<repo>`)
    pub project_slug: String,
}

impl std::fmt::Debug for CircleCiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircleCiConfig")
            .field("token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("project_slug", &self.project_slug)
            .finish()
    }
}

/// GitHub API configuration.
#[derive(Clone)]
pub struct GitHubConfig {
    /// Token with read access to `repository`
    pub token: SecretString,
    /// `owner/repo`
    pub repository: String,
    /// Branch deploys are compared against
    pub stable_branch: String,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"[REDACTED]")
            .field("repository", &self.repository)
            .field("stable_branch", &self.stable_branch)
            .finish()
    }
}

/// Heroku Platform API configuration.
#[derive(Clone)]
pub struct HerokuConfig {
    /// API token
    pub token: SecretString,
}

impl std::fmt::Debug for HerokuConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HerokuConfig")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl BotConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        let host = get_env_or_default(env, "BOT_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BOT_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default(env, "PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        let reminder_timezone = match get_optional_env(env, "REMINDER_TIMEZONE") {
            Some(name) => name.parse::<Tz>().map_err(|_| {
                ConfigError::InvalidEnvVar(
                    "REMINDER_TIMEZONE".to_string(),
                    format!("unknown timezone `{name}`"),
                )
            })?,
            None => DEFAULT_REMINDER_TIMEZONE,
        };

        let dedupe_resolutions = get_optional_env(env, "DEPLOY_DEDUPE_RESOLUTIONS")
            .is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"));

        Ok(Self {
            host,
            port,
            slack: SlackConfig::from_lookup(env)?,
            circleci: CircleCiConfig::from_lookup(env)?,
            github: GitHubConfig::from_lookup(env),
            heroku: HerokuConfig::from_lookup(env),
            sample_git_hash: get_optional_env(env, "SAMPLE_HEROKU_GIT_HASH"),
            reminder_timezone,
            dedupe_resolutions,
            sentry_dsn: get_optional_env(env, "SENTRY_DSN"),
            sentry_environment: get_optional_env(env, "SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_optional_env(env, "SENTRY_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            sentry_traces_sample_rate: get_optional_env(env, "SENTRY_TRACES_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SlackConfig {
    fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            bot_token: get_checked_secret(env, "SLACK_BOT_TOKEN")?,
            signing_secret: get_checked_secret(env, "SLACK_SIGNING_SECRET")?,
        })
    }
}

impl CircleCiConfig {
    /// Load CircleCI configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `CIRCLE_CI_TOKEN` is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            token: get_checked_secret(env, "CIRCLE_CI_TOKEN")?,
            api_base: get_env_or_default(env, "CIRCLECI_API_BASE", DEFAULT_CIRCLECI_API_BASE),
            project_slug: get_env_or_default(
                env,
                "CIRCLECI_PROJECT_SLUG",
                DEFAULT_CIRCLECI_PROJECT_SLUG,
            ),
        })
    }
}

impl GitHubConfig {
    /// Returns `None` if `GITHUB_TOKEN` is not set (release notes disabled).
    fn from_lookup(env: &Lookup<'_>) -> Option<Self> {
        let token = get_optional_env(env, "GITHUB_TOKEN")?;
        warn_if_weak(&token, "GITHUB_TOKEN");

        Some(Self {
            token: SecretString::from(token),
            repository: get_env_or_default(env, "GITHUB_REPOSITORY", DEFAULT_GITHUB_REPOSITORY),
            stable_branch: get_env_or_default(env, "GITHUB_STABLE_BRANCH", DEFAULT_STABLE_BRANCH),
        })
    }
}

impl HerokuConfig {
    fn from_lookup(env: &Lookup<'_>) -> Option<Self> {
        let token = get_optional_env(env, "HEROKU_TOKEN")?;
        warn_if_weak(&token, "HEROKU_TOKEN");

        Some(Self {
            token: SecretString::from(token),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Source of configuration values, keyed by variable name.
pub type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// Get a required environment variable.
fn get_required_env(env: &Lookup<'_>, key: &str) -> Result<String, ConfigError> {
    get_optional_env(env, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(env: &Lookup<'_>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &Lookup<'_>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

/// Load a required secret, warning (not failing) if it looks weak.
///
/// Tokens are issued by Slack and CircleCI, so a weak-looking value is more
/// likely a copy/paste mistake than a real choice.
fn get_checked_secret(env: &Lookup<'_>, key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(env, key)?;
    warn_if_weak(&value, key);
    Ok(SecretString::from(value))
}

fn warn_if_weak(secret: &str, var_name: &str) {
    if let Err(e) = validate_secret_strength(secret, var_name) {
        tracing::warn!("{var_name} validation warning: {e}");
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
