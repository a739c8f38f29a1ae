//! Format-aware action router.
//!
//! Maps routing metadata plus candidate action strings to the list of
//! external endpoints to call. Routing is a pure function of its inputs:
//! the only side effect is one log event per trigger.
//!
//! Default rules:
//! - Email: "Escalated", or an angry complaint → `POST /crm/escalate`;
//!   "Routine" → log only
//! - JSON: "Alert:" → `POST /json_alert`
//! - PDF: "exceeds 10,000" → `POST /risk_alert`;
//!   "Policy mentions" → `POST /compliance_flag` (both may fire)

use tracing::{debug, info};

use crate::pipeline::tone::{ESCALATED_MARKER, ROUTINE_MARKER};
use crate::pipeline::types::{Format, Intent, RoutingMetadata, TriggeredAction};

/// Predicate over one candidate action string and its metadata.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Case-sensitive substring.
    Contains(String),
    /// Case-insensitive substring. The needle is stored lower-cased.
    ContainsIgnoreCase(String),
    /// The document's classified intent.
    IntentIs(Intent),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn contains(needle: &str) -> Self {
        Self::Contains(needle.to_string())
    }

    pub fn contains_ignore_case(needle: &str) -> Self {
        Self::ContainsIgnoreCase(needle.to_lowercase())
    }

    fn matches(&self, candidate: &str, metadata: &RoutingMetadata) -> bool {
        match self {
            Self::Contains(needle) => candidate.contains(needle.as_str()),
            Self::ContainsIgnoreCase(needle) => candidate.to_lowercase().contains(needle.as_str()),
            Self::IntentIs(intent) => metadata.intent == *intent,
            Self::All(conds) => conds.iter().all(|c| c.matches(candidate, metadata)),
            Self::Any(conds) => conds.iter().any(|c| c.matches(candidate, metadata)),
        }
    }
}

/// What a matching rule does.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// Call an external endpoint.
    Trigger(TriggeredAction),
    /// Record that no external call is needed.
    LogOnly { reason: String },
}

/// A single routing rule, scoped to one format.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub format: Format,
    pub condition: Condition,
    pub outcome: RouteOutcome,
}

/// Ordered routing rule table.
#[derive(Debug, Clone)]
pub struct ActionRouter {
    rules: Vec<RouteRule>,
}

impl ActionRouter {
    /// Router with the built-in rule table.
    pub fn default_rules() -> Self {
        let rules = vec![
            RouteRule {
                format: Format::Email,
                condition: Condition::Any(vec![
                    Condition::contains(ESCALATED_MARKER),
                    Condition::All(vec![
                        Condition::IntentIs(Intent::Complaint),
                        Condition::contains_ignore_case("angry"),
                    ]),
                ]),
                outcome: RouteOutcome::Trigger(TriggeredAction::CrmEscalate),
            },
            RouteRule {
                format: Format::Email,
                condition: Condition::contains(ROUTINE_MARKER),
                outcome: RouteOutcome::LogOnly {
                    reason: "routine".into(),
                },
            },
            RouteRule {
                format: Format::Json,
                condition: Condition::contains("Alert:"),
                outcome: RouteOutcome::Trigger(TriggeredAction::JsonAlert),
            },
            RouteRule {
                format: Format::Pdf,
                condition: Condition::contains("exceeds 10,000"),
                outcome: RouteOutcome::Trigger(TriggeredAction::RiskAlert),
            },
            RouteRule {
                format: Format::Pdf,
                condition: Condition::contains("Policy mentions"),
                outcome: RouteOutcome::Trigger(TriggeredAction::ComplianceFlag),
            },
        ];
        Self { rules }
    }

    /// A router with no rules (never triggers).
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule after the existing ones.
    pub fn add_rule(&mut self, rule: RouteRule) {
        self.rules.push(rule);
    }

    /// Route candidate actions for one document.
    ///
    /// Candidates are visited in order; for each, every rule of the
    /// document's format is evaluated in table order and every match fires.
    pub fn route(
        &self,
        metadata: &RoutingMetadata,
        candidates: &[String],
    ) -> Vec<TriggeredAction> {
        let mut triggered = Vec::new();

        for candidate in candidates {
            for rule in self.rules.iter().filter(|r| r.format == metadata.format) {
                if !rule.condition.matches(candidate, metadata) {
                    continue;
                }
                match &rule.outcome {
                    RouteOutcome::Trigger(action) => {
                        info!(
                            endpoint = %action,
                            file = %metadata.file_identifier,
                            format = %metadata.format,
                            "Routing action (simulated)"
                        );
                        triggered.push(*action);
                    }
                    RouteOutcome::LogOnly { reason } => {
                        debug!(
                            file = %metadata.file_identifier,
                            reason = %reason,
                            "No external action needed"
                        );
                    }
                }
            }
        }

        triggered
    }
}

impl Default for ActionRouter {
    fn default() -> Self {
        Self::default_rules()
    }
}
