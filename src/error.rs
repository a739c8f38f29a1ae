//! Error types for docflow.

/// Top-level error type for document processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Result log error: {0}")]
    LogWrite(#[from] LogWriteError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures reading or decoding an input document.
///
/// Only `Io` aborts processing. The others are degraded to a best-effort
/// text fallback by the processor.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF parsing failed: {0}")]
    Pdf(String),
}

/// Failures invoking a (simulated) downstream action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Dispatch to {endpoint} failed: {reason}")]
    DispatchFailed { endpoint: String, reason: String },

    #[error("Unrecoverable action failure after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<ActionError>,
    },
}

/// Result log persistence errors. These always propagate.
#[derive(Debug, thiserror::Error)]
pub enum LogWriteError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for docflow.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_reports_attempts_and_cause() {
        let err = ActionError::Exhausted {
            attempts: 3,
            source: Box::new(ActionError::DispatchFailed {
                endpoint: "POST /crm/escalate".into(),
                reason: "connection refused".into(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 attempt(s)"));
        assert!(msg.contains("POST /crm/escalate"));
    }

    #[test]
    fn top_level_wraps_extraction() {
        let err: Error = ExtractionError::Pdf("no xref table".into()).into();
        assert_eq!(
            err.to_string(),
            "Extraction error: PDF parsing failed: no xref table"
        );
    }
}
