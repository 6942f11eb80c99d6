//! `/deploy-reminder`: schedule a "TIME TO DEPLOY" ping.
//!
//! Accepted forms:
//!
//! - `/deploy-reminder 30 [@recipient]` (minutes, legacy)
//! - `/deploy-reminder in 30 [@recipient]`
//! - `/deploy-reminder at 12:34 [@recipient]`
//!
//! `at` times are read in the configured timezone. Reminders are scheduled on
//! whole minutes and at most three days ahead.

use std::fmt::Display;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike};
use chrono_tz::Tz;
use deploy_bot_core::ReminderVerb;
use thiserror::Error;
use tracing::{error, info};

use super::{Commands, parse_argument};
use crate::slack::SlashCommand;

/// Furthest ahead a reminder can be scheduled.
pub const MAX_REMINDER_MINUTES: i64 = 3 * 24 * 60;

/// Time of day shown in the confirmation.
const HUMAN_TIMESTAMP_FORMAT: &str = "%H:%M %Z";

/// Errors raised while planning a reminder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReminderError {
    #[error("Cannot set reminders in the past")]
    InPast,

    #[error(
        "Cannot set reminders for over {} minutes ({} hours) from now",
        MAX_REMINDER_MINUTES,
        MAX_REMINDER_MINUTES / 60
    )]
    TooFarAhead,

    #[error("Missing reminder time")]
    MissingTime,

    #[error("Unable to schedule deploy, invalid verb `{0}`")]
    InvalidVerb(String),

    #[error("Invalid number of minutes `{0}`")]
    InvalidMinutes(String),

    #[error("Unable to parse time `{0}`")]
    InvalidTime(String),
}

/// A validated reminder, ready to announce and schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPlan {
    /// Who to mention in the announcement.
    pub recipient: Option<String>,
    /// Whole minutes between now and `post_at`.
    pub minutes: i64,
    /// When the reminder fires, truncated to the minute.
    pub post_at: DateTime<Tz>,
}

impl ReminderPlan {
    /// Confirmation posted to the channel when the reminder is scheduled.
    #[must_use]
    pub fn announcement(&self, user_id: &str) -> String {
        let preamble = self
            .recipient
            .as_deref()
            .map(|r| format!("{r}: "))
            .unwrap_or_default();

        format!(
            "{preamble}Deployment reminder scheduled by <@{user_id}> in {} minute(s) at {}",
            self.minutes,
            self.post_at.format(HUMAN_TIMESTAMP_FORMAT)
        )
    }

    /// The scheduled message itself.
    #[must_use]
    pub fn reminder_text(user_id: &str) -> String {
        format!("<@{user_id}> TIME TO DEPLOY")
    }
}

/// Help text posted when a reminder could not be scheduled.
#[must_use]
pub fn reminder_help_message(text: &str, error: &dyn Display) -> String {
    format!(
        "Unable to schedule deployment reminder with parameters: `{text}`, example usages:\n\
         `/deploy-reminder in 30 @task-automation-devs`\n\
         `/deploy-reminder at 12:34`\n\
         Error: {error}"
    )
}

/// Parse and validate reminder command text relative to `now`.
///
/// # Errors
///
/// Returns a [`ReminderError`] describing the first problem found.
pub fn plan_reminder(text: &str, now: DateTime<Tz>) -> Result<ReminderPlan, ReminderError> {
    let text = text.trim();
    let first = parse_argument(text, 0).ok_or(ReminderError::MissingTime)?;

    let (verb, time, recipient) = if first.parse::<i64>().is_ok() {
        (ReminderVerb::In, first, parse_argument(text, 1))
    } else {
        let verb = first
            .parse::<ReminderVerb>()
            .map_err(|_| ReminderError::InvalidVerb(first.to_string()))?;
        let time = parse_argument(text, 1).ok_or(ReminderError::MissingTime)?;
        (verb, time, parse_argument(text, 2))
    };

    let now = truncate_to_minute(now);
    let post_at = match verb {
        ReminderVerb::In => in_minutes(time, now)?,
        ReminderVerb::At => at_time(time, now)?,
    };

    Ok(ReminderPlan {
        recipient: recipient.map(ToString::to_string),
        minutes: (post_at - now).num_minutes(),
        post_at,
    })
}

fn in_minutes(raw: &str, now: DateTime<Tz>) -> Result<DateTime<Tz>, ReminderError> {
    let minutes: i64 = raw
        .parse()
        .map_err(|_| ReminderError::InvalidMinutes(raw.to_string()))?;

    if minutes < 1 {
        return Err(ReminderError::InPast);
    }
    if minutes > MAX_REMINDER_MINUTES {
        return Err(ReminderError::TooFarAhead);
    }

    Ok(now + TimeDelta::minutes(minutes))
}

fn at_time(raw: &str, now: DateTime<Tz>) -> Result<DateTime<Tz>, ReminderError> {
    let tz = now.timezone();
    let invalid = || ReminderError::InvalidTime(raw.to_string());

    let scheduled = if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        dt.with_timezone(&tz)
    } else {
        let naive = parse_local(raw, now.date_naive()).ok_or_else(invalid)?;
        tz.from_local_datetime(&naive).earliest().ok_or_else(invalid)?
    };
    let scheduled = truncate_to_minute(scheduled);

    if scheduled <= now {
        return Err(ReminderError::InPast);
    }
    if (scheduled - now).num_minutes() > MAX_REMINDER_MINUTES {
        return Err(ReminderError::TooFarAhead);
    }

    Ok(scheduled)
}

/// `HH:MM`, `HH:MM:SS` (today), or a `YYYY-MM-DDTHH:MM[:SS]` local date-time.
fn parse_local(raw: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    ["%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .map(|time| today.and_time(time))
        .or_else(|| {
            ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        })
}

fn truncate_to_minute(dt: DateTime<Tz>) -> DateTime<Tz> {
    dt.with_nanosecond(0)
        .and_then(|d| d.with_second(0))
        .unwrap_or(dt)
}

impl Commands {
    pub(super) async fn deploy_reminder(&self, command: &SlashCommand) {
        let now = chrono::Utc::now().with_timezone(&self.timezone);

        let plan = match plan_reminder(&command.text, now) {
            Ok(plan) => plan,
            Err(e) => {
                error!(error = %e, "Unable to plan deploy reminder");
                self.say(
                    &command.channel_id,
                    &reminder_help_message(&command.text, &e),
                )
                .await;
                return;
            }
        };

        self.say(&command.channel_id, &plan.announcement(&command.user_id))
            .await;

        match self
            .chat
            .schedule_message(
                &command.channel_id,
                &ReminderPlan::reminder_text(&command.user_id),
                plan.post_at.timestamp(),
            )
            .await
        {
            Ok(result) => info!(
                scheduled_message_id = ?result.scheduled_message_id,
                post_at = %plan.post_at,
                "Deploy reminder scheduled"
            ),
            Err(e) => {
                error!(error = %e, "Unable to schedule deploy reminder");
                self.say(
                    &command.channel_id,
                    &reminder_help_message(&command.text, &e),
                )
                .await;
            }
        }
    }
}
