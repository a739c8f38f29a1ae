//! Communication tone and recommended follow-up for emails.
//!
//! Tone checks run in a fixed order: escalation keywords, then politeness,
//! then urgency keywords. A polite email that is also urgent is therefore
//! `Polite`, while its urgency field still escalates the action.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::{EmailFields, Urgency};

static ESCALATION_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)not acceptable|legal action|threat|lawsuit|escalate|demand immediate action|extremely dissatisfied|angry",
    )
    .unwrap()
});

static POLITE_KEYWORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)please|kindly|thank you|appreciate").unwrap());

static URGENT_KEYWORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)urgent|immediately|asap|priority").unwrap());

/// Marker the router looks for in escalated action text.
pub const ESCALATED_MARKER: &str = "Escalated";
/// Marker for action text that needs no external call.
pub const ROUTINE_MARKER: &str = "Routine";

/// Rendering of an absent sender or issue in action text.
const ABSENT: &str = "(none)";

/// Communication tone of an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Escalation,
    Polite,
    Neutral,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Escalation => "escalation",
            Self::Polite => "polite",
            Self::Neutral => "neutral",
        }
    }

    pub fn is_escalation(&self) -> bool {
        matches!(self, Self::Escalation)
    }
}

/// Infer tone from raw email text.
pub fn detect_tone(text: &str) -> Tone {
    if ESCALATION_KEYWORDS.is_match(text) {
        return Tone::Escalation;
    }
    if POLITE_KEYWORDS.is_match(text) {
        return Tone::Polite;
    }
    if URGENT_KEYWORDS.is_match(text) {
        return Tone::Escalation;
    }
    Tone::Neutral
}

/// Recommended action text for an email.
///
/// Escalates when urgency says so or the tone is escalation-flavored.
pub fn recommend_action(fields: &EmailFields, tone: Tone) -> String {
    let sender = fields.sender.as_deref().unwrap_or(ABSENT);
    let issue = fields.issue.as_deref().unwrap_or(ABSENT);
    if fields.urgency == Urgency::Escalate || tone.is_escalation() {
        format!("[ACTION] {ESCALATED_MARKER}: Notified CRM for sender {sender} (issue: {issue})")
    } else {
        format!("[ACTION] {ROUTINE_MARKER}: Logged and closed for sender {sender} (issue: {issue})")
    }
}
