use std::collections::HashMap;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use inbox_types::{Message, MessageKind};

/// Label used when a CTA message carries no button text of its own.
pub const DEFAULT_BUTTON_LABEL: &str = "View details";

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// The sender's remark if one is set and non-empty, else the sender name.
pub fn display_name<'a>(message: &'a Message, remarks: &'a HashMap<String, String>) -> &'a str {
    remarks
        .get(&message.user_name)
        .map(String::as_str)
        .filter(|r| !r.is_empty())
        .unwrap_or(&message.user_name)
}

/// Button caption for CTA messages; `None` for every other kind.
pub fn button_label(message: &Message) -> Option<&str> {
    match message.kind {
        MessageKind::Cta => Some(message.button_text.as_deref().unwrap_or(DEFAULT_BUTTON_LABEL)),
        _ => None,
    }
}

/// Best-effort wall-clock time of a message, in local time.
///
/// Millisecond timestamps win. Otherwise the display string is parsed; a
/// time without a date is taken to be on `today`.
pub fn message_time(message: &Message, today: NaiveDate) -> Option<NaiveDateTime> {
    match message.timestamp_millis {
        Some(ms) => from_epoch_millis(ms),
        None => parse_timestamp(&message.timestamp, today),
    }
}

pub fn parse_timestamp(raw: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        return raw.parse().ok().and_then(from_epoch_millis);
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| {
            TIME_FORMATS
                .iter()
                .find_map(|f| NaiveTime::parse_from_str(raw, f).ok())
                .map(|t| today.and_time(t))
        })
}

/// Human-friendly age of `ts` relative to `now`. `None` for future times.
pub fn relative_label(ts: NaiveDateTime, now: NaiveDateTime) -> Option<String> {
    let age = now - ts;
    if age < Duration::zero() {
        return None;
    }

    let label = if age < Duration::minutes(1) {
        "just now".to_string()
    } else if age < Duration::hours(1) {
        format!("{} min ago", age.num_minutes())
    } else if ts.date() == now.date() {
        ts.format("%H:%M").to_string()
    } else if now.date().pred_opt() == Some(ts.date()) {
        format!("Yesterday {}", ts.format("%H:%M"))
    } else if age < Duration::days(7) {
        format!("{} days ago", age.num_days())
    } else {
        ts.format("%m-%d").to_string()
    };
    Some(label)
}

/// Timestamp text for a row, falling back to the raw display string.
pub fn timestamp_label(message: &Message, now: NaiveDateTime) -> String {
    message_time(message, now.date())
        .and_then(|ts| relative_label(ts, now))
        .unwrap_or_else(|| message.timestamp.clone())
}

fn from_epoch_millis(ms: i64) -> Option<NaiveDateTime> {
    Local.timestamp_millis_opt(ms).single().map(|dt| dt.naive_local())
}
