//! Chat export parsing.
//!
//! Turns an exported chat log into an ordered list of [`Message`]s. Each line is
//! tried against the configured [`LineGrammar`]s in priority order; the first
//! match wins. Lines with no timestamp prefix continue the previous message.
//! Lines that carry a timestamp but no `Sender:` part are system notices and
//! are skipped.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SaharaError};

static BRACKETED_12H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[(\d{1,2}/\d{1,2}/\d{2,4}),\s*(\d{1,2}:\d{2}:\d{2}\s*(?:[AaPp][Mm]))\]\s*(.*?):\s*(.*)$",
    )
    .expect("valid regex")
});

static DASHED_12H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{1,2}/\d{1,2}/\d{2,4}),\s*(\d{1,2}:\d{2}(?::\d{2})?\s*(?:[AaPp][Mm]))\s*-\s*(.*?):\s*(.*)$",
    )
    .expect("valid regex")
});

static DASHED_24H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}/\d{1,2}/\d{2,4}),\s*(\d{1,2}:\d{2})\s*-\s*(.*?):\s*(.*)$")
        .expect("valid regex")
});

/// Any line that opens with a date and a time, with or without brackets.
static TIMESTAMP_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[?\d{1,2}/\d{1,2}/\d{2,4},\s*\d{1,2}:\d{2}").expect("valid regex")
});

/// Supported export line shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineGrammar {
    /// `[D/M/Y, H:MM:SS AM] Sender: text`
    BracketedTwelveHour,
    /// `D/M/Y, H:MM AM - Sender: text`
    DashedTwelveHour,
    /// `D/M/Y, H:MM - Sender: text`
    DashedTwentyFourHour,
}

impl LineGrammar {
    pub const ALL: [LineGrammar; 3] = [
        LineGrammar::BracketedTwelveHour,
        LineGrammar::DashedTwelveHour,
        LineGrammar::DashedTwentyFourHour,
    ];

    fn regex(self) -> &'static Regex {
        match self {
            Self::BracketedTwelveHour => &BRACKETED_12H,
            Self::DashedTwelveHour => &DASHED_12H,
            Self::DashedTwentyFourHour => &DASHED_24H,
        }
    }

    /// Split a line into `(date, time, sender, text)` if it has this shape.
    pub fn captures<'a>(self, line: &'a str) -> Option<(&'a str, &'a str, &'a str, &'a str)> {
        let caps = self.regex().captures(line)?;
        Some((
            caps.get(1)?.as_str(),
            caps.get(2)?.as_str(),
            caps.get(3)?.as_str(),
            caps.get(4)?.as_str(),
        ))
    }
}

/// When a message was sent, as written in the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub date: String,
    pub time: String,
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.date, self.time)
    }
}

/// One chat message. Immutable once parsing finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: Timestamp,
    pub sender: String,
    pub body: String,
    pub session_id: String,
}

impl Message {
    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Grammars tried per line, first match wins.
    pub grammars: Vec<LineGrammar>,
    /// Bodies shorter than this many characters are dropped.
    pub min_body_chars: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            grammars: LineGrammar::ALL.to_vec(),
            min_body_chars: 4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatExportParser {
    options: ParseOptions,
}

impl ChatExportParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    /// Parse `text` into messages tagged with `session_id`.
    ///
    /// Fails with [`SaharaError::Parse`] only when nothing survives filtering.
    pub fn parse(&self, text: &str, session_id: &str) -> Result<Vec<Message>> {
        let mut raw: Vec<Message> = Vec::new();

        for line in text.lines() {
            let line = strip_direction_marks(line);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((date, time, sender, body)) = self.match_line(line) {
                raw.push(Message {
                    timestamp: Timestamp {
                        date: date.to_string(),
                        time: time.trim().to_string(),
                    },
                    sender: sender.trim().to_string(),
                    body: body.trim().to_string(),
                    session_id: session_id.to_string(),
                });
            } else if TIMESTAMP_PREFIX.is_match(line) {
                tracing::trace!("skipping timestamped line without sender");
            } else if let Some(prev) = raw.last_mut() {
                prev.body.push('\n');
                prev.body.push_str(line);
            }
        }

        let total = raw.len();
        let messages: Vec<Message> = raw
            .into_iter()
            .filter(|m| keep_body(&m.body, self.options.min_body_chars))
            .collect();

        tracing::debug!(parsed = total, kept = messages.len(), "chat export parsed");

        if messages.is_empty() {
            return Err(SaharaError::Parse);
        }
        Ok(messages)
    }

    fn match_line<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str, &'a str, &'a str)> {
        self.options
            .grammars
            .iter()
            .find_map(|g| g.captures(line))
            .filter(|(_, _, sender, _)| !sender.trim().is_empty())
    }
}

/// Exports sprinkle bidi control characters around timestamps and names.
fn strip_direction_marks(line: &str) -> String {
    line.chars()
        .filter(|c| !matches!(c, '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{FEFF}'))
        .collect()
}

fn keep_body(body: &str, min_chars: usize) -> bool {
    let body = body.trim();
    !body.is_empty()
        && body.chars().count() >= min_chars
        && !body.to_lowercase().contains("omitted")
        && !is_bare_url(body)
}

fn is_bare_url(body: &str) -> bool {
    (body.starts_with("http://") || body.starts_with("https://"))
        && !body.contains(char::is_whitespace)
}
