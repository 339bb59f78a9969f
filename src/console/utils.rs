use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::{
    db::predictions::PredictionRow,
    domain::{
        ClassificationResult, Label,
        message::{MAX_MESSAGE_CHARS, trimmed_len},
    },
    tasks::SubmissionState,
};

const DEFAULT_HISTORY: u32 = 5;
const MAX_HISTORY: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Submit(String),
    SetThreshold(f64),
    BadThreshold(String),
    Reset,
    Status,
    History(u32),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub const HELP_TEXT: &str = "Type a message (10-500 characters) to check it.\n\
     /threshold <0.0-1.0>  set the spam threshold\n\
     /reset                clear the current result\n\
     /status               show the current state\n\
     /history [n]          show the latest logged predictions\n\
     /help                 show this help\n\
     /quit                 exit";

pub fn parse_input(line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ConsoleInput::Empty;
    }
    if !trimmed.starts_with('/') {
        return ConsoleInput::Submit(line.trim_end_matches(['\r', '\n']).to_string());
    }

    let mut parts = trimmed.split_whitespace();
    let command = parts.next().unwrap_or("");
    let argument = parts.next();
    match command {
        "/threshold" => match argument.map(parse_threshold) {
            Some(Ok(value)) => ConsoleInput::SetThreshold(value),
            Some(Err(reason)) => ConsoleInput::BadThreshold(reason),
            None => ConsoleInput::BadThreshold("usage: /threshold 0.6".to_string()),
        },
        "/reset" => ConsoleInput::Reset,
        "/status" => ConsoleInput::Status,
        "/history" => ConsoleInput::History(
            argument
                .and_then(|raw| raw.parse::<u32>().ok())
                .map(|n| n.clamp(1, MAX_HISTORY))
                .unwrap_or(DEFAULT_HISTORY),
        ),
        "/help" | "/start" => ConsoleInput::Help,
        "/quit" | "/exit" => ConsoleInput::Quit,
        other => ConsoleInput::Unknown(other.to_string()),
    }
}

pub fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("threshold must be between 0.0 and 1.0, got {value}"));
    }
    Ok(value)
}

pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}%", confidence * 100.0)
}

pub fn format_result(result: &ClassificationResult) -> String {
    let headline = match result.label {
        Label::Spam => "Spam Detected! This message has been classified as spam.",
        Label::Ham => "Ham (Not Spam). This message appears to be legitimate.",
    };
    let mut out = format!(
        "{headline}\nConfidence Score: {}",
        format_confidence(result.confidence)
    );
    if let Some(threshold) = result.threshold_used {
        out.push_str(&format!(" (threshold {threshold:.2})"));
    }
    out
}

pub fn format_state(state: &SubmissionState) -> String {
    match state {
        SubmissionState::Idle => "Idle. Type a message to check it.".to_string(),
        SubmissionState::Validating | SubmissionState::AwaitingClassification => {
            "Checking...".to_string()
        }
        SubmissionState::Classified(result) => format_result(result),
        SubmissionState::Failed(err) => format!("Error: {}", err.user_message()),
    }
}

pub fn format_counter(message: &str) -> String {
    format!("{}/{}", trimmed_len(message), MAX_MESSAGE_CHARS)
}

pub fn format_history(rows: &[PredictionRow], tz: Tz) -> String {
    if rows.is_empty() {
        return "No predictions logged yet.".to_string();
    }
    let mut out = String::from("Latest predictions:\n");
    for row in rows {
        out.push_str(&format!(
            "#{} [{}] {} {} (threshold {:.2}): {}\n",
            row.id,
            format_timestamp(row.created_at, tz),
            row.prediction,
            format_confidence(row.confidence),
            row.threshold_used,
            preview(&row.content, 60),
        ));
    }
    out.trim_end().to_string()
}

fn format_timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn preview(text: &str, limit: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= limit {
        return flat;
    }
    let mut cut: String = flat.chars().take(limit).collect();
    cut.push('…');
    cut
}
