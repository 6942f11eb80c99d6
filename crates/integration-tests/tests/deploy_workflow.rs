//! End-to-end tests for `/deploy-by-branch` and prompt resolution.
//!
//! Drives the command handlers against recording fakes: a prompt is posted,
//! its button value is taken from the posted blocks, and the click is fed
//! back in exactly as the interaction webhook would.

use std::sync::Arc;

use deploy_bot::commands::CommandKind;
use deploy_bot::deploy::ResolutionGuard;
use deploy_bot::slack::{ActionElement, Block};
use deploy_bot_core::DeployAction;
use deploy_bot_integration_tests::{FakeCi, POSTED_TS, RecordingChat, commands, slash};

/// Button value of the posted prompt's Approve button.
fn button_value(blocks: &[Block], action: DeployAction) -> String {
    blocks
        .iter()
        .find_map(|block| match block {
            Block::Actions { elements } => elements.iter().find_map(|element| match element {
                ActionElement::Button {
                    action_id, value, ..
                } if action_id == action.action_id() => value.clone(),
                ActionElement::Button { .. } => None,
            }),
            _ => None,
        })
        .expect("prompt has the button")
}

fn status_line(blocks: &[Block]) -> &str {
    blocks
        .last()
        .and_then(Block::section_text)
        .expect("status section")
}

#[tokio::test]
async fn test_prompt_then_approve() {
    let ci = Arc::new(FakeCi::default());
    let chat = Arc::new(RecordingChat::default());
    let commands = commands(&ci, &chat);

    commands
        .dispatch(
            CommandKind::DeployByBranch,
            &slash("/deploy-by-branch", "release/fee_collab <@U99>"),
        )
        .await;

    assert_eq!(ci.calls(), ["pipeline:release/fee_collab", "workflow:p1", "jobs:w1"]);
    let posted = chat.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].channel, "C123");
    assert_eq!(posted[0].text, "Approval requested for branch release/fee_collab");

    let value = button_value(&posted[0].blocks, DeployAction::Approve);
    commands
        .resolve_prompt(DeployAction::Approve, "U7", "C123", POSTED_TS, &value)
        .await;

    assert_eq!(ci.calls().last().map(String::as_str), Some("approve:w1:j1"));
    let updated = chat.updated();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].ts.as_deref(), Some(POSTED_TS));
    assert!(status_line(&updated[0].blocks).starts_with("DEPLOY APPROVED by <@U7>"));
    assert_eq!(chat.posted().len(), 1);
}

#[tokio::test]
async fn test_prompt_then_cancel_never_approves() {
    let ci = Arc::new(FakeCi::default());
    let chat = Arc::new(RecordingChat::default());
    let commands = commands(&ci, &chat);

    commands
        .dispatch(
            CommandKind::DeployByBranch,
            &slash("/deploy-by-branch-test", "release/fee_collab"),
        )
        .await;

    let value = button_value(&chat.posted()[0].blocks, DeployAction::Cancel);
    commands
        .resolve_prompt(DeployAction::Cancel, "U7", "C123", POSTED_TS, &value)
        .await;

    assert_eq!(ci.approvals(), 0);
    let updated = chat.updated();
    assert_eq!(updated.len(), 1);
    assert!(
        status_line(&updated[0].blocks)
            .starts_with("Removing button to deploy after prompt cancellation by <@U7>")
    );
}

#[tokio::test]
async fn test_missing_approval_gate_posts_help() {
    let ci = Arc::new(FakeCi::without_gate());
    let chat = Arc::new(RecordingChat::default());

    commands(&ci, &chat)
        .dispatch(
            CommandKind::DeployByBranch,
            &slash("/deploy-by-branch", "release/fee_collab"),
        )
        .await;

    let posted = chat.posted();
    assert_eq!(posted.len(), 1);
    assert!(posted[0].blocks.is_empty());
    assert!(
        posted[0]
            .text
            .starts_with("Unable to deploy with parameters: `release/fee_collab`")
    );
    assert!(posted[0].text.ends_with(
        "Error: no approval job found in workflow `w1` of pipeline `p1`"
    ));
}

#[tokio::test]
async fn test_pipeline_lookup_failure_stops_chain() {
    let ci = Arc::new(FakeCi::without_pipeline());
    let chat = Arc::new(RecordingChat::default());

    commands(&ci, &chat)
        .dispatch(
            CommandKind::DeployByBranch,
            &slash("/deploy-by-branch", "no-such-branch"),
        )
        .await;

    assert_eq!(ci.calls(), ["pipeline:no-such-branch"]);
    let posted = chat.posted();
    assert_eq!(posted.len(), 1);
    assert!(posted[0].text.contains("no pipeline found for branch `no-such-branch`"));
}

#[tokio::test]
async fn test_rejected_approval_keeps_prompt() {
    let ci = Arc::new(FakeCi::rejecting_approval(400));
    let chat = Arc::new(RecordingChat::default());
    let commands = commands(&ci, &chat);

    commands
        .dispatch(
            CommandKind::DeployByBranch,
            &slash("/deploy-by-branch", "release/fee_collab"),
        )
        .await;
    let value = button_value(&chat.posted()[0].blocks, DeployAction::Approve);

    commands
        .resolve_prompt(DeployAction::Approve, "U7", "C123", POSTED_TS, &value)
        .await;

    assert!(chat.updated().is_empty());
    let posted = chat.posted();
    assert_eq!(posted.len(), 2);
    assert!(
        posted[1]
            .text
            .starts_with("Unable to deploy: approval of job `j1` failed (status 400)")
    );
}

#[tokio::test]
async fn test_guard_approves_once() {
    let ci = Arc::new(FakeCi::default());
    let chat = Arc::new(RecordingChat::default());
    let commands = commands(&ci, &chat).with_guard(ResolutionGuard::default());

    commands
        .dispatch(
            CommandKind::DeployByBranch,
            &slash("/deploy-by-branch", "release/fee_collab"),
        )
        .await;
    let value = button_value(&chat.posted()[0].blocks, DeployAction::Approve);

    commands
        .resolve_prompt(DeployAction::Approve, "U7", "C123", POSTED_TS, &value)
        .await;
    commands
        .resolve_prompt(DeployAction::Approve, "U8", "C123", POSTED_TS, &value)
        .await;

    assert_eq!(ci.approvals(), 1);
    assert_eq!(chat.updated().len(), 1);
}

#[tokio::test]
async fn test_reminder_is_announced_and_scheduled() {
    let ci = Arc::new(FakeCi::default());
    let chat = Arc::new(RecordingChat::default());

    commands(&ci, &chat)
        .dispatch(
            CommandKind::DeployReminder,
            &slash("/deploy-reminder", "in 30 <@U99>"),
        )
        .await;

    assert!(ci.calls().is_empty());
    assert_eq!(chat.posted().len(), 1);
    let scheduled = chat.scheduled();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].0, "C123");
}
