//! Slack message builders for deploy prompts and command replies.
//!
//! Pure functions only: nothing here performs I/O or validates its input.
//! The mrkdwn produced for mentions (`<@U123>`) and dates
//! (`<!date^...|fallback>`) follows Slack's markup grammar exactly, since
//! Slack renders it client-side.

use deploy_bot_core::{DeployAction, DeployPromptToken};

use super::types::{ActionElement, Block, ButtonStyle, ConfirmationDialog, PlainText};
use crate::github::PullRequest;

/// Date format for merged PRs in summaries.
const PR_DATE_FORMAT: &str = "%m/%d";

/// Preamble naming the branch and, optionally, who should look at it.
#[must_use]
pub fn deploy_preamble_block(branch_name: &str, recipient: Option<&str>) -> Block {
    let mut prompt = format!("Approval requested for branch {branch_name}");
    if let Some(recipient) = recipient {
        prompt.push_str(", ");
        prompt.push_str(recipient);
    }
    Block::mrkdwn_section(prompt)
}

/// Summary of the commit the approval job would release.
#[must_use]
pub fn deploy_commit_block(commit_sha: &str, commit_subject: &str) -> Block {
    Block::mrkdwn_section(format!(
        "Commit to be deployed:\n*SHA:* {commit_sha}\n*Subject:* {commit_subject}"
    ))
}

/// Approve and Cancel buttons, both carrying the encoded token.
#[must_use]
pub fn deploy_actions_block(token: &DeployPromptToken) -> Block {
    let value = token.encode();

    let approve = ActionElement::Button {
        text: PlainText::with_emoji(":white_check_mark: Approve and Deploy"),
        action_id: DeployAction::Approve.action_id().to_string(),
        value: Some(value.clone()),
        style: Some(ButtonStyle::Primary),
        confirm: Some(ConfirmationDialog {
            title: PlainText::new("Are you sure?"),
            text: PlainText::new(format!("Deploy `{}`?", token.branch_name)),
            confirm: PlainText::new("Deploy"),
            deny: PlainText::new("Stop, I changed my mind!"),
        }),
    };

    let cancel = ActionElement::Button {
        text: PlainText::with_emoji(":negative_squared_cross_mark: Cancel"),
        action_id: DeployAction::Cancel.action_id().to_string(),
        value: Some(value),
        style: Some(ButtonStyle::Danger),
        confirm: None,
    };

    Block::Actions {
        elements: vec![approve, cancel],
    }
}

/// Terminal line for an approved prompt.
#[must_use]
pub fn deploy_approved_block(message_ts: &str, user_id: &str) -> Block {
    Block::mrkdwn_section(format!(
        "DEPLOY APPROVED {}",
        user_interaction_timestamp(message_ts, user_id)
    ))
}

/// Terminal line for a cancelled prompt.
#[must_use]
pub fn deploy_cancelled_block(message_ts: &str, user_id: &str) -> Block {
    Block::mrkdwn_section(format!(
        "Removing button to deploy after prompt cancellation {}",
        user_interaction_timestamp(message_ts, user_id)
    ))
}

/// `by <@user> at <!date^...>` using the whole-second part of a Slack ts.
#[must_use]
pub fn user_interaction_timestamp(message_ts: &str, user_id: &str) -> String {
    let seconds = message_ts.split('.').next().unwrap_or(message_ts);
    format!("by <@{user_id}> at <!date^{seconds}^{{date_num}} {{time}}|unknown datetime>")
}

/// Build the interactive deploy prompt.
///
/// Layout: preamble, commit summary, divider, Approve/Cancel buttons.
#[must_use]
pub fn build_deploy_prompt_message(
    token: &DeployPromptToken,
    recipient: Option<&str>,
) -> Vec<Block> {
    vec![
        deploy_preamble_block(&token.branch_name, recipient),
        deploy_commit_block(&token.commit_sha, &token.commit_subject),
        Block::Divider,
        deploy_actions_block(token),
    ]
}

/// Build the terminal rendering that replaces a resolved prompt.
///
/// Same preamble and commit summary as the prompt, with the buttons replaced
/// by a line naming who resolved it and when.
#[must_use]
pub fn build_deploy_resolved_message(
    token: &DeployPromptToken,
    action: DeployAction,
    message_ts: &str,
    user_id: &str,
) -> Vec<Block> {
    let status = match action {
        DeployAction::Approve => deploy_approved_block(message_ts, user_id),
        DeployAction::Cancel => deploy_cancelled_block(message_ts, user_id),
    };

    vec![
        deploy_preamble_block(&token.branch_name, None),
        deploy_commit_block(&token.commit_sha, &token.commit_subject),
        Block::Divider,
        status,
    ]
}

/// Notification text for clients that cannot render blocks.
#[must_use]
pub fn deploy_fallback_text(token: &DeployPromptToken, action: Option<DeployAction>) -> String {
    match action {
        None => format!("Approval requested for branch {}", token.branch_name),
        Some(DeployAction::Approve) => format!("Deploy of {} approved", token.branch_name),
        Some(DeployAction::Cancel) => format!("Deploy of {} cancelled", token.branch_name),
    }
}

/// One-line summary of a merged pull request.
#[must_use]
pub fn pr_summary_block(pr: &PullRequest) -> Block {
    let merged = pr.merged_at.map_or_else(
        || "--/--".to_string(),
        |merged_at| merged_at.date_naive().format(PR_DATE_FORMAT).to_string(),
    );

    Block::mrkdwn_section(format!(
        "• {merged}: *{}* (<{}|#{}>)",
        pr.title.trim(),
        pr.html_url,
        pr.number
    ))
}

/// Reply for a commit list with no matching merges.
#[must_use]
pub fn no_commits_block(app_name: &str, item_filter: &str) -> Block {
    Block::mrkdwn_section(format!(
        "No commits were merged matching `{item_filter}` since `{app_name}` was last deployed"
    ))
}
