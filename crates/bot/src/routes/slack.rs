//! Slack webhook handlers for slash commands and button clicks.
//!
//! Both endpoints verify the request signature, acknowledge with `200 OK`
//! and hand the work to a spawned task. Slack gives up on a webhook after
//! three seconds, so replies always go out asynchronously.

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use deploy_bot_core::DeployAction;
use tracing::{debug, info, instrument, warn};

use crate::commands::CommandKind;
use crate::error::AppError;
use crate::slack::{InteractionPayload, SlashCommand};
use crate::state::AppState;

/// Create Slack webhook routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/slack/commands", post(handle_command))
        .route("/slack/interactions", post(handle_interaction))
}

/// Check the `X-Slack-*` headers against the raw body.
fn verify_request(state: &AppState, headers: &HeaderMap, body: &str) -> Result<(), AppError> {
    let timestamp = headers
        .get("X-Slack-Request-Timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing timestamp header".into()))?;

    let signature = headers
        .get("X-Slack-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    state
        .slack()
        .verify_signature(timestamp, body, signature)
        .map_err(|e| AppError::Unauthorized(e.to_string()))
}

/// Handle a slash command webhook.
#[instrument(skip(state, headers, body))]
async fn handle_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    verify_request(&state, &headers, &body)?;

    let command = SlashCommand::from_form(url::form_urlencoded::parse(body.as_bytes()));

    let kind = CommandKind::parse(&command.command).ok_or_else(|| {
        warn!(command = %command.command, "Unknown slash command");
        AppError::BadRequest(format!("Unknown command `{}`", command.command))
    })?;

    info!(
        command = %command.command,
        user = %command.user_id,
        channel = %command.channel_id,
        "Received slash command"
    );

    tokio::spawn(async move {
        state.commands().dispatch(kind, &command).await;
    });

    Ok(StatusCode::OK)
}

/// Handle a Slack interaction webhook.
///
/// Receives Approve and Cancel clicks on deploy prompts.
#[instrument(skip(state, headers, body))]
async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    verify_request(&state, &headers, &body)?;

    let payload_json = url::form_urlencoded::parse(body.as_bytes())
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| AppError::BadRequest("Invalid payload format".into()))?;

    let payload: InteractionPayload = serde_json::from_str(&payload_json)
        .map_err(|e| AppError::BadRequest(format!("Failed to parse payload: {e}")))?;

    let action = payload
        .actions
        .first()
        .ok_or_else(|| AppError::BadRequest("No actions in payload".into()))?;

    let deploy_action: DeployAction = action.action_id.parse().map_err(|e: String| {
        warn!(action_id = %action.action_id, "Unknown action type");
        AppError::BadRequest(e)
    })?;

    let channel_id = payload
        .channel_id()
        .ok_or_else(|| AppError::BadRequest("Missing channel".into()))?
        .to_string();
    let message_ts = payload
        .message_ts()
        .ok_or_else(|| AppError::BadRequest("Missing message timestamp".into()))?
        .to_string();
    let value = action.value.clone().unwrap_or_default();
    let user_id = payload.user.id.clone();

    debug!(
        interaction_type = %payload.interaction_type,
        action = %deploy_action,
        "Received interaction"
    );

    tokio::spawn(async move {
        state
            .commands()
            .resolve_prompt(deploy_action, &user_id, &channel_id, &message_ts, &value)
            .await;
    });

    Ok(StatusCode::OK)
}
