//! Format-specific structured field extraction.
//!
//! Each format has its own explicit record type. Single-field failures
//! degrade to `None` or an anomaly entry; extraction never aborts a document.

pub mod email;
pub mod json;
pub mod pdf;

use serde::Serialize;

pub use email::{EmailFields, Urgency, extract_email_fields};
pub use json::{JsonFields, validate_json_schema};
pub use pdf::{LineItem, PdfFields, extract_pdf_fields};

/// Fields extracted from one document, keyed by its format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractedFields {
    Email(EmailFields),
    Json(JsonFields),
    Pdf(PdfFields),
    /// Unknown formats are classified but not field-extracted.
    Text,
}

impl ExtractedFields {
    pub fn as_email(&self) -> Option<&EmailFields> {
        match self {
            Self::Email(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&JsonFields> {
        match self {
            Self::Json(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_pdf(&self) -> Option<&PdfFields> {
        match self {
            Self::Pdf(fields) => Some(fields),
            _ => None,
        }
    }
}
