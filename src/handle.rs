use crate::error::{ReportError, StoreError};
use crate::models::{StandupField, StandupRecord, StandupUpdate};
use crate::store::StatusStore;
use crate::{BlockAction, SlackActionPayload};
use chrono::NaiveDate;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub user_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Reply to `/standup`: the form, prefilled with whatever was already sent today.
pub fn standup(user_id: &str, store: &StatusStore) -> Result<Value, StoreError> {
    let todays = store.get_today_record(user_id)?;
    Ok(get_prompt_copy(todays.as_ref()))
}

/// Stores every recognised action of an interaction payload in one write.
/// Returns `None` when the payload carried nothing to store.
pub fn action(
    payload: &SlackActionPayload,
    store: &StatusStore,
) -> Result<Option<StandupRecord>, StoreError> {
    let update = collect_update(&payload.actions);
    if update.is_empty() {
        return Ok(None);
    }
    store.upsert(&payload.user.id, &update).map(Some)
}

pub fn collect_update(actions: &[BlockAction]) -> StandupUpdate {
    let mut update = StandupUpdate::new();

    for action in actions {
        let field = match StandupField::from_action_id(&action.action_id) {
            Some(field) => field,
            None => continue,
        };
        let value = match field {
            StandupField::Channel => action
                .selected_channel
                .as_ref()
                .or(action.selected_conversation.as_ref()),
            _ => action.value.as_ref(),
        };
        if let Some(value) = value {
            update.set(field, value.trim());
        }
    }

    update
}

/// Parses `/generate-report [<@USER>] START [END]`.
pub fn parse_report_command(text: &str, caller: &str) -> Result<ReportRequest, String> {
    let mut words = text.split_whitespace().peekable();

    let user_id = match words.peek().and_then(|w| parse_mention(w)) {
        Some(user) => {
            words.next();
            user
        }
        None => caller.to_string(),
    };

    let dates = words
        .map(|w| NaiveDate::parse_from_str(w, "%Y-%m-%d").map_err(|_| w))
        .collect::<Result<Vec<_>, _>>()
        .map_err(get_bad_date_copy)?;

    let (start, end) = match dates.as_slice() {
        [day] => (*day, *day),
        [start, end] => (*start, *end),
        _ => return Err(get_report_usage_copy()),
    };

    if start > end {
        return Err(format!(":warning: {}", ReportError::InvalidRange { start, end }));
    }

    Ok(ReportRequest {
        user_id,
        start,
        end,
    })
}

fn parse_mention(word: &str) -> Option<String> {
    let inner = word.strip_prefix("<@")?.strip_suffix('>')?;
    let id = inner.split('|').next()?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Channel, fallback text and blocks for the "standup done" post, once the
/// record is complete.
pub fn announcement(record: &StandupRecord) -> Option<(String, String, Value)> {
    if !record.is_complete() {
        return None;
    }
    let channel = record.channel.clone()?;
    let text = format!(
        "<@{}> submitted standup status for {} :tada:",
        record.user_id, record.date
    );
    let blocks = get_completion_copy(record, &text);
    Some((channel, text, blocks))
}

// copy fns

pub fn get_prompt_copy(todays: Option<&StandupRecord>) -> Value {
    let value = |field: StandupField| todays.and_then(|r| r.get(field));

    let mut channel_select = json!({
        "type": "channels_select",
        "action_id": StandupField::Channel.action_id(),
        "placeholder": { "type": "plain_text", "text": "Select a channel" }
    });
    if let Some(channel) = value(StandupField::Channel) {
        channel_select["initial_channel"] = json!(channel);
    }

    let blocks = json!([
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": "*Hello! :wave: Time for your standup.* Press enter after each answer to save it."
            }
        },
        get_input_copy(StandupField::Yesterday, ":one: How did *yesterday* go?", value(StandupField::Yesterday)),
        get_input_copy(StandupField::Today, ":two: What are you focusing on *today*?", value(StandupField::Today)),
        get_input_copy(StandupField::Blocker, ":three: Any blockers impacting your work?", value(StandupField::Blocker)),
        {
            "type": "section",
            "block_id": "channel",
            "text": { "type": "mrkdwn", "text": "Where should I share it?" },
            "accessory": channel_select
        }
    ]);

    json!({
        "response_type": "ephemeral",
        "text": "Time for your standup",
        "blocks": blocks
    })
}

fn get_input_copy(field: StandupField, label: &str, initial: Option<&str>) -> Value {
    let mut element = json!({
        "type": "plain_text_input",
        "action_id": field.action_id(),
        "multiline": false
    });
    if let Some(initial) = initial {
        element["initial_value"] = json!(initial);
    }

    json!({
        "type": "input",
        "block_id": field.action_id(),
        "dispatch_action": true,
        "label": { "type": "plain_text", "text": label, "emoji": true },
        "element": element
    })
}

fn get_completion_copy(record: &StandupRecord, headline: &str) -> Value {
    let section = |text: &str| json!({ "type": "section", "text": { "type": "mrkdwn", "text": text } });
    let header = |text: &str| json!({ "type": "header", "text": { "type": "plain_text", "text": text, "emoji": true } });
    let divider = json!({ "type": "divider" });

    json!([
        section(headline),
        divider.clone(),
        header("Yesterday's standup status:"),
        section(record.yesterday.as_deref().unwrap_or_default()),
        header("Today's standup status:"),
        section(record.today.as_deref().unwrap_or_default()),
        header("Any blocker?"),
        section(record.blocker.as_deref().unwrap_or_default()),
        divider
    ])
}

pub fn get_report_usage_copy() -> String {
    ":warning: Usage: `/generate-report [@user] YYYY-MM-DD [YYYY-MM-DD]`".to_string()
}

fn get_bad_date_copy(word: &str) -> String {
    format!(
        ":warning: `{}` is not a date I understand, please use YYYY-MM-DD.",
        word
    )
}

pub fn get_report_started_copy(request: &ReportRequest) -> String {
    format!(
        ":hourglass_flowing_sand: Putting together the standup report for <@{}> from {} to {}...",
        request.user_id, request.start, request.end
    )
}

pub fn get_error_copy(err: impl std::fmt::Display) -> String {
    format!(":x: Sorry, something went wrong: {}", err)
}
