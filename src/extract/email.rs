//! Email header, urgency and issue extraction.
//!
//! Pure string parsing over the raw message text. Nothing here needs a
//! well-formed RFC 5322 message: headers are matched line by line.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static FROM_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^From:[ \t]*(.*)$").unwrap());

static EMAIL_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.\-]+@[\w.\-]+").unwrap());

static URGENCY_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)urgent|asap|immediately|priority|demand immediate action").unwrap()
});

static SUBJECT_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^Subject:").unwrap());

static COMPLAINT_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)complain|issue|problem|dissatisfied|not acceptable").unwrap()
});

/// Whether an email needs escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Routine,
    Escalate,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::Escalate => "escalate",
        }
    }
}

/// Structured fields pulled from an email body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailFields {
    pub sender: Option<String>,
    pub urgency: Urgency,
    pub issue: Option<String>,
}

/// Extract sender, urgency and issue from raw email text.
pub fn extract_email_fields(text: &str) -> EmailFields {
    EmailFields {
        sender: extract_sender(text),
        urgency: detect_urgency(text),
        issue: extract_issue(text),
    }
}

/// First `From:` header value, else the first address-shaped substring.
fn extract_sender(text: &str) -> Option<String> {
    let from_header = FROM_HEADER
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    from_header.or_else(|| EMAIL_ADDRESS.find(text).map(|m| m.as_str().to_string()))
}

fn detect_urgency(text: &str) -> Urgency {
    if URGENCY_KEYWORDS.is_match(text) {
        Urgency::Escalate
    } else {
        Urgency::Routine
    }
}

/// First non-blank line after a `Subject:` line, else the first line that
/// mentions a complaint keyword.
fn extract_issue(text: &str) -> Option<String> {
    let mut found_subject = false;
    for line in text.lines() {
        if found_subject && !line.trim().is_empty() {
            return Some(line.trim().to_string());
        }
        if SUBJECT_LINE.is_match(line) {
            found_subject = true;
        }
    }

    text.lines()
        .find(|line| COMPLAINT_KEYWORDS.is_match(line))
        .map(|line| line.trim().to_string())
}
