//! Deploy Bot - Slack front end for CircleCI approval-gated deploys.
//!
//! Serves the Slack webhooks on `PORT` (default 3000).
//!
//! # Architecture
//!
//! - Axum web framework
//! - CircleCI v2 API for pipelines, workflows and approval jobs
//! - Slack Web API for prompts, updates and scheduled reminders
//! - GitHub and Heroku APIs for release notes (optional)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::Router;
use deploy_bot::circleci::CircleCiClient;
use deploy_bot::commands::{Commands, ReleaseSources};
use deploy_bot::config::BotConfig;
use deploy_bot::deploy::{DeployWorkflow, ResolutionGuard};
use deploy_bot::github::GitHubClient;
use deploy_bot::heroku::{ConfigVarSource, HerokuClient};
use deploy_bot::routes;
use deploy_bot::slack::SlackClient;
use deploy_bot::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &BotConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "deploy_bot=info,tower_http=debug".into());

    // Use JSON format on Heroku for structured log parsing, text format locally
    let is_heroku = std::env::var("DYNO").is_ok();
    let json_layer =
        is_heroku.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_heroku).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

/// Wire the API clients into the command handlers.
fn build_state(config: &BotConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let slack = SlackClient::new(
        config.slack.bot_token.clone(),
        config.slack.signing_secret.clone(),
    );
    let chat = Arc::new(slack.clone());
    let ci = Arc::new(CircleCiClient::new(&config.circleci)?);
    let deploy = DeployWorkflow::new(ci, chat.clone());

    let heroku = match &config.heroku {
        Some(heroku) => Some(Arc::new(HerokuClient::new(heroku)?) as Arc<dyn ConfigVarSource>),
        None => {
            tracing::warn!("HEROKU_TOKEN not set; deployed hashes unavailable");
            None
        }
    };

    let release = match &config.github {
        Some(github) => Some(ReleaseSources {
            github: Arc::new(GitHubClient::new(github)?),
            heroku,
            stable_branch: github.stable_branch.clone(),
            hash_override: config.sample_git_hash.clone(),
        }),
        None => {
            tracing::warn!("GITHUB_TOKEN not set; /commit-list and /latest-deploy disabled");
            None
        }
    };

    let mut commands = Commands::new(chat, deploy, release, config.reminder_timezone);
    if config.dedupe_resolutions {
        tracing::info!("Repeated prompt resolutions will be ignored");
        commands = commands.with_guard(ResolutionGuard::default());
    }

    Ok(AppState::new(slack, commands))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (needed for Sentry init)
    let config = BotConfig::from_env()?;

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    init_tracing();

    let state = build_state(&config)?;

    let app = Router::new()
        .merge(routes::routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("deploy-bot listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
