//! Invoice field extraction from PDF text.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

/// Regulatory keywords scanned for, in reporting order.
pub const POLICY_KEYWORDS: &[&str] = &["GDPR", "FDA", "HIPAA", "SOX", "PCI"];

/// Invoice totals above this amount raise a risk alert.
pub const RISK_TOTAL_THRESHOLD: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

static TOTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Total\s*[:\-]?\s*\$?([\d,]+\.?\d*)").unwrap());

static LINE_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)[ \t]+([\w \t]+?)[ \t]+\$?([\d,]+\.?\d*)$").unwrap()
});

static POLICY_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    POLICY_KEYWORDS
        .iter()
        .map(|kw| (*kw, Regex::new(&format!(r"(?i)\b{kw}\b")).unwrap()))
        .collect()
});

/// One `<qty> <description> <price>` invoice line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub qty: u64,
    pub desc: String,
    pub price: Decimal,
}

/// Fields extracted from invoice text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfFields {
    pub total: Option<Decimal>,
    pub line_items: Vec<LineItem>,
    pub policy_mentions: Vec<String>,
}

impl PdfFields {
    /// Candidate action descriptions for the router.
    ///
    /// Each candidate also raises a warning-level alert event.
    pub fn candidate_actions(&self) -> Vec<String> {
        let mut actions = Vec::new();
        if let Some(total) = self.total.filter(|t| *t > RISK_TOTAL_THRESHOLD) {
            warn!(total = %total, "Invoice total exceeds 10,000");
            actions.push(format!("Invoice total exceeds 10,000: {total}"));
        }
        if !self.policy_mentions.is_empty() {
            warn!(mentions = ?self.policy_mentions, "Policy mentions detected");
            actions.push(format!("Policy mentions: {:?}", self.policy_mentions));
        }
        actions
    }
}

/// Extract totals, line items and policy keywords from invoice text.
pub fn extract_pdf_fields(text: &str) -> PdfFields {
    let fields = PdfFields {
        total: extract_total(text),
        line_items: extract_line_items(text),
        policy_mentions: extract_policy_mentions(text),
    };
    debug!(
        total = ?fields.total,
        line_items = fields.line_items.len(),
        policy_mentions = fields.policy_mentions.len(),
        "Extracted invoice fields"
    );
    fields
}

/// First "Total" amount, commas stripped. A malformed amount yields `None`.
fn extract_total(text: &str) -> Option<Decimal> {
    let raw = TOTAL.captures(text)?.get(1)?.as_str();
    parse_amount(raw)
}

fn extract_line_items(text: &str) -> Vec<LineItem> {
    text.lines()
        .filter_map(|line| {
            let caps = LINE_ITEM.captures(line.trim_end_matches('\r'))?;
            let (Ok(qty), Some(price)) = (caps[1].parse::<u64>(), parse_amount(&caps[3])) else {
                debug!(line, "Dropping line item with unparseable quantity or price");
                return None;
            };
            Some(LineItem {
                qty,
                desc: caps[2].trim().to_string(),
                price,
            })
        })
        .collect()
}

fn extract_policy_mentions(text: &str) -> Vec<String> {
    POLICY_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(kw, _)| kw.to_string())
        .collect()
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned = raw.replace(',', "");
    let cleaned = cleaned.trim_end_matches('.');
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(cleaned).ok()
}
