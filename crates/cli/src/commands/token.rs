//! Deploy prompt token commands.

use deploy_bot_core::{DeployPromptToken, TokenError};
use thiserror::Error;

/// Errors that can occur while decoding a token.
#[derive(Debug, Error)]
pub enum TokenCommandError {
    #[error(transparent)]
    Malformed(#[from] TokenError),

    #[error("Failed to render token: {0}")]
    Render(#[from] serde_json::Error),
}

/// Validate a button value and log it field by field.
pub fn decode(value: &str) -> Result<(), TokenCommandError> {
    let pretty = pretty_token(value)?;

    tracing::info!("Token is valid:");
    for line in pretty.lines() {
        tracing::info!("  {}", line);
    }

    Ok(())
}

fn pretty_token(value: &str) -> Result<String, TokenCommandError> {
    let token = DeployPromptToken::decode(value.trim())?;
    Ok(serde_json::to_string_pretty(&token)?)
}
