//! Document processor: one input in, one result log entry out.
//!
//! Flow:
//! 1. Extract text for the detected format (degrading to lossy text)
//! 2. Format-specific field extraction and candidate actions
//! 3. Intent classification
//! 4. Route candidates and dispatch triggered actions
//! 5. Append a result log entry
//!
//! Only the Email path retries route-and-dispatch. A dispatch that never
//! succeeds still leaves a log entry behind before the error is returned.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::error::{ActionError, Error, LogWriteError};
use crate::extract::{ExtractedFields, JsonFields, extract_email_fields, extract_pdf_fields};
use crate::pipeline::classifier::IntentClassifier;
use crate::pipeline::format::Document;
use crate::pipeline::retry::{RetryExhausted, RetryPolicy};
use crate::pipeline::router::ActionRouter;
use crate::pipeline::tone::{Tone, detect_tone, recommend_action};
use crate::pipeline::types::{
    ClassificationResult, Format, InputMeta, ProcessedDocument, RAW_TEXT_INPUT_ID,
    RoutingMetadata, TriggeredAction,
};
use crate::store::{ResultLog, ResultLogEntry};

/// Performs the external call behind a triggered action.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        action: TriggeredAction,
        metadata: &RoutingMetadata,
    ) -> Result<(), ActionError>;
}

/// Dispatcher that only logs the call it would make.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedDispatcher;

#[async_trait]
impl ActionDispatcher for SimulatedDispatcher {
    async fn dispatch(
        &self,
        action: TriggeredAction,
        metadata: &RoutingMetadata,
    ) -> Result<(), ActionError> {
        info!(
            file = %metadata.file_identifier,
            intent = %metadata.intent,
            "{action} (simulated)"
        );
        Ok(())
    }
}

/// Everything computed from a document before routing.
struct Analysis {
    meta: InputMeta,
    classification: ClassificationResult,
    fields: ExtractedFields,
    tone: Option<Tone>,
    candidates: Vec<String>,
    trace: String,
}

/// Runs documents through extraction, classification, routing and logging.
pub struct DocumentProcessor {
    classifier: IntentClassifier,
    router: ActionRouter,
    retry: RetryPolicy,
    dispatcher: Arc<dyn ActionDispatcher>,
    log: Arc<dyn ResultLog>,
}

impl DocumentProcessor {
    /// Processor with the built-in rules, default retry policy and
    /// simulated dispatch.
    pub fn new(log: Arc<dyn ResultLog>) -> Self {
        Self {
            classifier: IntentClassifier::default_rules(),
            router: ActionRouter::default_rules(),
            retry: RetryPolicy::default(),
            dispatcher: Arc::new(SimulatedDispatcher),
            log,
        }
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_router(mut self, router: ActionRouter) -> Self {
        self.router = router;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn ActionDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Load a file from disk and process it.
    pub async fn process_path(
        &self,
        path: &Path,
        sniff_bytes: usize,
    ) -> Result<ProcessedDocument, Error> {
        let document = Document::load(path, sniff_bytes)?;
        self.process(&document).await
    }

    /// Process raw email text.
    pub async fn process_text(&self, text: &str) -> Result<ProcessedDocument, Error> {
        self.process(&Document::from_text(text)).await
    }

    /// Process a single document through the full pipeline.
    pub async fn process(&self, document: &Document) -> Result<ProcessedDocument, Error> {
        let format = document.format();
        let agent = format.agent_name();
        let source = document
            .source()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| RAW_TEXT_INPUT_ID.to_string());
        info!(
            source = %source,
            format = %format,
            agent,
            "Processing document"
        );

        let mut analysis = self.analyze(document);

        let routing = RoutingMetadata {
            format,
            intent: analysis.classification.intent,
            confidence: analysis.classification.confidence,
            file_identifier: document
                .file_name()
                .unwrap_or_else(|| RAW_TEXT_INPUT_ID.to_string()),
        };

        let outcome = match format {
            Format::Email => {
                self.retry
                    .run("route_action", || {
                        self.route_and_dispatch(&routing, &analysis.candidates)
                    })
                    .await
            }
            _ => self
                .route_and_dispatch(&routing, &analysis.candidates)
                .await
                .map_err(|e| RetryExhausted {
                    attempts: 1,
                    last_error: e,
                }),
        };

        let (triggered, failure) = match outcome {
            Ok(triggered) => {
                let _ = write!(analysis.trace, "; triggered={}", endpoint_list(&triggered));
                (triggered, None)
            }
            Err(exhausted) => {
                let _ = write!(
                    analysis.trace,
                    "; dispatch failed after {} attempt(s): {}",
                    exhausted.attempts, exhausted.last_error
                );
                (Vec::new(), Some(exhausted))
            }
        };

        let processed_at = Utc::now();
        let entry = ResultLogEntry {
            timestamp: processed_at,
            agent: agent.to_string(),
            input_meta: analysis.meta.clone(),
            extracted: extracted_value(
                &analysis.fields,
                analysis.tone,
                &analysis.classification,
            )
            .map_err(LogWriteError::from)?,
            actions: analysis.candidates.clone(),
            trace: analysis.trace.clone(),
        };
        self.log.append(&entry).await?;

        if let Some(exhausted) = failure {
            error!(
                input_id = entry.input_id(),
                attempts = exhausted.attempts,
                "Action dispatch failed, result logged"
            );
            return Err(ActionError::Exhausted {
                attempts: exhausted.attempts,
                source: Box::new(exhausted.last_error),
            }
            .into());
        }

        info!(
            input_id = entry.input_id(),
            intent = %analysis.classification.intent,
            confidence = analysis.classification.confidence,
            triggered = triggered.len(),
            "Document processed"
        );

        Ok(ProcessedDocument {
            agent,
            meta: analysis.meta,
            classification: analysis.classification,
            fields: analysis.fields,
            tone: analysis.tone,
            candidate_actions: analysis.candidates,
            routing,
            triggered,
            trace: analysis.trace,
            processed_at,
        })
    }

    fn analyze(&self, document: &Document) -> Analysis {
        let format = document.format();
        let text = text_or_fallback(document);
        let mut meta = InputMeta {
            source: document.source().map(|p| p.display().to_string()),
            timestamp: None,
            format,
        };

        match format {
            Format::Email => {
                let fields = extract_email_fields(&text);
                let tone = detect_tone(&text);
                let classification = self.classifier.classify(text.trim());
                let action = recommend_action(&fields, tone);
                let trace = format!(
                    "{}: sender={}, urgency={}, issue={}, tone={}, intent={}, confidence={:.2}, action={}",
                    format.agent_name(),
                    fields.sender.as_deref().unwrap_or("-"),
                    fields.urgency.as_str(),
                    fields.issue.as_deref().unwrap_or("-"),
                    tone.as_str(),
                    classification.intent,
                    classification.confidence,
                    action,
                );
                Analysis {
                    meta,
                    classification,
                    fields: ExtractedFields::Email(fields),
                    tone: Some(tone),
                    candidates: vec![action],
                    trace,
                }
            }
            Format::Json => {
                let fields = JsonFields::from_bytes(document.bytes());
                meta.timestamp = fields.timestamp();
                let classification = self.classifier.classify(&text);
                let candidates = fields.candidate_actions();
                let trace = format!(
                    "{}: schema_valid={}, anomalies={:?}, intent={}, confidence={:.2}",
                    format.agent_name(),
                    fields.schema_valid,
                    fields.anomalies,
                    classification.intent,
                    classification.confidence,
                );
                Analysis {
                    meta,
                    classification,
                    fields: ExtractedFields::Json(fields),
                    tone: None,
                    candidates,
                    trace,
                }
            }
            Format::Pdf => {
                let fields = extract_pdf_fields(&text);
                let classification = self.classifier.classify(&text);
                let candidates = fields.candidate_actions();
                let trace = format!(
                    "{}: total={}, line_items={}, policy_mentions={:?}, intent={}, confidence={:.2}",
                    format.agent_name(),
                    fields
                        .total
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    fields.line_items.len(),
                    fields.policy_mentions,
                    classification.intent,
                    classification.confidence,
                );
                Analysis {
                    meta,
                    classification,
                    fields: ExtractedFields::Pdf(fields),
                    tone: None,
                    candidates,
                    trace,
                }
            }
            Format::Unknown => {
                let classification = self.classifier.classify(&text);
                let trace = format!(
                    "{}: intent={}, confidence={:.2}",
                    format.agent_name(),
                    classification.intent,
                    classification.confidence,
                );
                Analysis {
                    meta,
                    classification,
                    fields: ExtractedFields::Text,
                    tone: None,
                    candidates: Vec::new(),
                    trace,
                }
            }
        }
    }

    async fn route_and_dispatch(
        &self,
        routing: &RoutingMetadata,
        candidates: &[String],
    ) -> Result<Vec<TriggeredAction>, ActionError> {
        let triggered = self.router.route(routing, candidates);
        for action in &triggered {
            self.dispatcher.dispatch(*action, routing).await?;
        }
        Ok(triggered)
    }
}

/// Format-specific text, or the raw bytes decoded lossily when that fails.
fn text_or_fallback(document: &Document) -> String {
    document.extract_text().unwrap_or_else(|e| {
        warn!(format = %document.format(), error = %e, "Falling back to raw text");
        document.lossy_text()
    })
}

/// Extracted fields as a JSON object, annotated with tone and intent.
fn extracted_value(
    fields: &ExtractedFields,
    tone: Option<Tone>,
    classification: &ClassificationResult,
) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(fields)?;
    if !value.is_object() {
        value = json!({});
    }
    if let Value::Object(map) = &mut value {
        if let Some(tone) = tone {
            map.insert("tone".into(), json!(tone));
        }
        map.insert("intent".into(), json!(classification.intent));
        map.insert("confidence".into(), json!(classification.confidence));
    }
    Ok(value)
}

fn endpoint_list(triggered: &[TriggeredAction]) -> String {
    let endpoints: Vec<&str> = triggered.iter().map(TriggeredAction::endpoint).collect();
    format!("[{}]", endpoints.join(", "))
}
