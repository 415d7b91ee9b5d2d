//! Text formatting for messages. Content is always sent raw, the
//! `**emphasis**` markup is only resolved here when displaying.
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::gateway::{Message, PlayerKind};

static EMPHASIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("Invalid emphasis pattern"));

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `**text**` becomes `<strong>text</strong>`, everything else is
/// escaped.
pub fn format_message_html(text: &str) -> String {
    EMPHASIS_RE
        .replace_all(&escape_html(text), "<strong>$1</strong>")
        .to_string()
}

/// `**text**` becomes bold for a terminal.
pub fn format_message_ansi(text: &str) -> String {
    EMPHASIS_RE
        .replace_all(text, format!("{}$1{}", BOLD, RESET).as_str())
        .to_string()
}

/// `HH:MM` from the server's `YYYY-MM-DD HH:MM:SS` timestamps, or
/// the raw value if it doesn't parse.
pub fn format_timestamp(timestamp: &str) -> String {
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S")
        .map(|ts| ts.format("%H:%M").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

/// Lines for one message in the terminal transcript.
pub fn message_lines(msg: &Message) -> Vec<String> {
    let marker = match msg.speaker_kind {
        PlayerKind::Human => "",
        PlayerKind::Ai => " (ai)",
    };
    let mut lines = vec![format!(
        "[{}] {}{}:",
        format_timestamp(&msg.timestamp),
        msg.speaker_name,
        marker
    )];
    lines.extend(
        format_message_ansi(&msg.content)
            .lines()
            .map(|line| format!("  {}", line)),
    );
    lines
}
