//! Shared types for the document processing pipeline.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::ExtractedFields;
use crate::pipeline::tone::Tone;

/// Identifier used for inputs that arrive as raw text rather than a file.
pub const RAW_TEXT_INPUT_ID: &str = "user_input_email";

// ── Format ──────────────────────────────────────────────────────────

/// Document format. Decides which extractor and router rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    Email,
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "PDF")]
    Pdf,
    Unknown,
}

impl Format {
    /// Display label, as written to the result log.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Json => "JSON",
            Self::Pdf => "PDF",
            Self::Unknown => "Unknown",
        }
    }

    /// Map a file extension to a format hint.
    ///
    /// Returns `None` for unrecognized extensions so the caller can fall
    /// through to content sniffing.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "pdf" => Some(Self::Pdf),
            "txt" | "eml" => Some(Self::Email),
            _ => None,
        }
    }

    /// Name of the agent that handles this format.
    pub fn agent_name(&self) -> &'static str {
        match self {
            Self::Email => "EmailAgent",
            Self::Json => "JSONAgent",
            Self::Pdf => "PDFAgent",
            Self::Unknown => "TextAgent",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Intent ──────────────────────────────────────────────────────────

/// Coarse business classification of document content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Complaint,
    Invoice,
    Regulation,
    #[serde(rename = "Fraud Risk")]
    FraudRisk,
    #[serde(rename = "RFQ")]
    Rfq,
    Unknown,
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Complaint => "Complaint",
            Self::Invoice => "Invoice",
            Self::Regulation => "Regulation",
            Self::FraudRisk => "Fraud Risk",
            Self::Rfq => "RFQ",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse a display label back into an intent.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Complaint" => Some(Self::Complaint),
            "Invoice" => Some(Self::Invoice),
            "Regulation" => Some(Self::Regulation),
            "Fraud Risk" => Some(Self::FraudRisk),
            "RFQ" => Some(Self::Rfq),
            "Unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Business description shown in run summaries.
    pub fn description(&self) -> Option<&'static str> {
        match self {
            Self::Rfq => Some("Request for Quotation: A request for pricing or proposal."),
            Self::Complaint => Some("Complaint: Expression of dissatisfaction or issue."),
            Self::Invoice => Some("Invoice: A request for payment for goods/services."),
            Self::Regulation => {
                Some("Regulation: Reference to compliance or legal requirements.")
            }
            Self::FraudRisk => Some("Fraud Risk: Potentially suspicious or risky content."),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Output of the intent classifier. Produced once per document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intent: Intent,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

// ── Routing ─────────────────────────────────────────────────────────

/// The minimal tuple the action router consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingMetadata {
    pub format: Format,
    pub intent: Intent,
    pub confidence: f64,
    /// Source file name, or [`RAW_TEXT_INPUT_ID`] for raw text.
    pub file_identifier: String,
}

/// A simulated external system call selected by the router.
///
/// Serializes to the stable endpoint string downstream integrations expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggeredAction {
    #[serde(rename = "POST /crm/escalate")]
    CrmEscalate,
    #[serde(rename = "POST /risk_alert")]
    RiskAlert,
    #[serde(rename = "POST /compliance_flag")]
    ComplianceFlag,
    #[serde(rename = "POST /json_alert")]
    JsonAlert,
}

impl TriggeredAction {
    /// Stable endpoint identifier.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::CrmEscalate => "POST /crm/escalate",
            Self::RiskAlert => "POST /risk_alert",
            Self::ComplianceFlag => "POST /compliance_flag",
            Self::JsonAlert => "POST /json_alert",
        }
    }
}

impl fmt::Display for TriggeredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

// ── Processed document ──────────────────────────────────────────────

/// Metadata about where an input came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMeta {
    /// File path, or `None` for raw text input.
    pub source: Option<String>,
    /// Timestamp carried by the input itself (JSON payloads only).
    pub timestamp: Option<String>,
    pub format: Format,
}

impl InputMeta {
    /// Identifier used to look up this input's result log entries.
    pub fn input_id(&self) -> &str {
        self.source.as_deref().unwrap_or(RAW_TEXT_INPUT_ID)
    }
}

/// Result of running one document through the pipeline.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub agent: &'static str,
    pub meta: InputMeta,
    pub classification: ClassificationResult,
    pub fields: ExtractedFields,
    /// Email tone; `None` for other formats.
    pub tone: Option<Tone>,
    /// Action descriptions produced by the extractors, in order.
    pub candidate_actions: Vec<String>,
    pub routing: RoutingMetadata,
    /// Endpoints the router selected, in order.
    pub triggered: Vec<TriggeredAction>,
    pub trace: String,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedDocument {
    pub fn format(&self) -> Format {
        self.meta.format
    }
}
