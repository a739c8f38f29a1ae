//! Rule-based intent classifier.
//!
//! Greedy first match, not a scored ranking:
//! 1. Rules are tried in table order; within a rule, patterns in order.
//!    The first pattern found anywhere in the lower-cased text decides.
//! 2. Otherwise, an exemplar sentence contained literally in the text decides.
//! 3. Otherwise `Unknown`.
//!
//! Table order is part of the behavior: Complaint, Invoice, Regulation,
//! Fraud Risk, RFQ.

use regex::Regex;
use tracing::debug;

use crate::pipeline::types::{ClassificationResult, Intent};

/// Confidence for a pattern match.
pub const PATTERN_CONFIDENCE: f64 = 0.95;
/// Confidence for an exemplar match.
pub const EXEMPLAR_CONFIDENCE: f64 = 0.90;
/// Confidence when nothing matched.
pub const UNKNOWN_CONFIDENCE: f64 = 0.5;

/// An intent label with its ordered patterns.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: Intent,
    pub patterns: Vec<Regex>,
}

/// A canonical example sentence for an intent.
#[derive(Debug, Clone)]
pub struct Exemplar {
    /// Stored lower-cased.
    pub text: String,
    pub intent: Intent,
}

/// Ordered rule table plus exemplar fallback.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
    exemplars: Vec<Exemplar>,
}

impl IntentClassifier {
    /// Classifier with the built-in business rules.
    pub fn default_rules() -> Self {
        let table: &[(Intent, &[&str])] = &[
            (
                Intent::Complaint,
                &["not satisfied", "complain", "issue", "problem", "unsatisfactory"],
            ),
            (
                Intent::Invoice,
                &["invoice", "payment due", "bill", "amount due"],
            ),
            (
                Intent::Regulation,
                &["compliance", "regulation", "policy", "legal"],
            ),
            (
                Intent::FraudRisk,
                &["fraud", "scam", "suspicious", "unauthorized", "risk"],
            ),
            (
                Intent::Rfq,
                &["request for quotation", "rfq", "quote", "quotation"],
            ),
        ];

        let mut classifier = Self::empty();
        for (intent, patterns) in table {
            // Built-in patterns are plain literals and always compile.
            classifier.add_rule(*intent, patterns).unwrap();
        }

        let exemplars = [
            (
                "We are not satisfied with the product and want to complain.",
                Intent::Complaint,
            ),
            (
                "Please find attached the invoice for your recent purchase.",
                Intent::Invoice,
            ),
            (
                "As per the new regulation, you must update your policy.",
                Intent::Regulation,
            ),
            (
                "This is a request for quotation (RFQ) for your services.",
                Intent::Rfq,
            ),
            (
                "We detected a suspicious transaction that may indicate fraud.",
                Intent::FraudRisk,
            ),
        ];
        for (text, intent) in exemplars {
            classifier.add_exemplar(text, intent);
        }

        classifier
    }

    /// A classifier with no rules (everything is `Unknown`).
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            exemplars: Vec::new(),
        }
    }

    /// Append a rule. Patterns are regexes matched against lower-cased text.
    pub fn add_rule(&mut self, intent: Intent, patterns: &[&str]) -> Result<(), regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        self.rules.push(IntentRule { intent, patterns });
        Ok(())
    }

    /// Append an exemplar sentence.
    pub fn add_exemplar(&mut self, text: &str, intent: Intent) {
        self.exemplars.push(Exemplar {
            text: text.to_lowercase(),
            intent,
        });
    }

    /// Classify text. Deterministic for a given rule table.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let lowered = text.to_lowercase();

        for rule in &self.rules {
            if let Some(pattern) = rule.patterns.iter().find(|p| p.is_match(&lowered)) {
                debug!(
                    intent = %rule.intent,
                    pattern = %pattern.as_str(),
                    "Intent matched by pattern"
                );
                return ClassificationResult {
                    intent: rule.intent,
                    confidence: PATTERN_CONFIDENCE,
                };
            }
        }

        if let Some(exemplar) = self.exemplars.iter().find(|e| lowered.contains(&e.text)) {
            debug!(intent = %exemplar.intent, "Intent matched by exemplar");
            return ClassificationResult {
                intent: exemplar.intent,
                confidence: EXEMPLAR_CONFIDENCE,
            };
        }

        ClassificationResult {
            intent: Intent::Unknown,
            confidence: UNKNOWN_CONFIDENCE,
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::default_rules()
    }
}
