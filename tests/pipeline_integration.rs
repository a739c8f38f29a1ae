//! End-to-end tests: files on disk through the processor into a libSQL
//! result log, then back out as summaries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lopdf::dictionary;
use rust_decimal_macros::dec;
use lopdf::{Document as PdfDocument, Object, Stream};
use tokio::task::JoinSet;

use docflow::error::{Error, ExtractionError};
use docflow::pipeline::DocumentProcessor;
use docflow::pipeline::retry::RetryPolicy;
use docflow::pipeline::types::{Format, TriggeredAction};
use docflow::store::{LibSqlResultLog, ResultLog};
use docflow::summary::render_summary;

/// Single-page PDF with one text line per entry.
fn invoice_pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.4");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut content = String::from("BT /F1 12 Tf 14 TL 72 720 Td ");
    for line in lines {
        content.push_str(&format!("({line}) Tj T* "));
    }
    content.push_str("ET");

    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn processor(log: Arc<dyn ResultLog>) -> Arc<DocumentProcessor> {
    Arc::new(DocumentProcessor::new(log).with_retry(RetryPolicy::new(2, Duration::ZERO)))
}

#[tokio::test]
async fn mixed_inputs_processed_concurrently() {
    let tmp = tempfile::tempdir().unwrap();
    let email = write(
        tmp.path(),
        "complaint.txt",
        b"From: Jane <jane@acme.io>\nSubject: Broken order\n\
          This is not acceptable. The order arrived damaged.",
    );
    let event = write(
        tmp.path(),
        "event.json",
        br#"{"event": "refund", "timestamp": "2024-06-01T09:00:00Z", "payload": "oops"}"#,
    );
    let invoice = write(
        tmp.path(),
        "invoice.pdf",
        &invoice_pdf(&["Invoice 2024-17", "Total: 12,500.00", "Data handled per GDPR"]),
    );

    let log: Arc<dyn ResultLog> = Arc::new(
        LibSqlResultLog::new_local(&tmp.path().join("results.db"))
            .await
            .unwrap(),
    );
    let processor = processor(Arc::clone(&log));

    let mut tasks = JoinSet::new();
    for path in [email.clone(), event.clone(), invoice.clone()] {
        let processor = Arc::clone(&processor);
        tasks.spawn(async move { processor.process_path(&path, 2048).await });
    }
    let mut processed = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        processed.push(joined.unwrap().unwrap());
    }
    processed.sort_by_key(|p| p.format().label());
    let formats: Vec<Format> = processed.iter().map(|p| p.format()).collect();
    assert_eq!(formats, vec![Format::Email, Format::Json, Format::Pdf]);
    assert_eq!(processed[0].triggered, vec![TriggeredAction::CrmEscalate]);
    assert_eq!(processed[1].triggered, vec![TriggeredAction::JsonAlert]);
    assert_eq!(
        processed[2].triggered,
        vec![TriggeredAction::RiskAlert, TriggeredAction::ComplianceFlag]
    );

    assert_eq!(log.load_all().await.unwrap().results.len(), 3);

    let email_entry = log
        .latest_for(&email.display().to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(email_entry.agent, "EmailAgent");
    assert_eq!(email_entry.extracted["tone"], "escalation");
    assert!(email_entry.actions[0].starts_with("[ACTION] Escalated"));
    assert!(
        email_entry
            .trace
            .contains(TriggeredAction::CrmEscalate.endpoint())
    );

    let event_entry = log
        .latest_for(&event.display().to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event_entry.input_meta.timestamp.as_deref(),
        Some("2024-06-01T09:00:00Z")
    );
    assert!(event_entry.actions[0].contains("payload should be object"));

    let invoice_entry = log
        .latest_for(&invoice.display().to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice_entry.agent, "PDFAgent");
    assert_eq!(invoice_entry.extracted["intent"], "Invoice");
    assert!(
        invoice_entry
            .trace
            .contains("triggered=[POST /risk_alert, POST /compliance_flag]")
    );
    let summary = render_summary(Some(&invoice_entry));
    assert!(summary.contains("Invoice: A request for payment for goods/services."));
    assert!(summary.contains("Format: PDF"));
}

#[tokio::test]
async fn large_invoice_total_posts_risk_alert() {
    let tmp = tempfile::tempdir().unwrap();
    let invoice = write(
        tmp.path(),
        "invoice-0042.pdf",
        &invoice_pdf(&["Invoice 0042", "Total: $15,000.00"]),
    );
    let log: Arc<dyn ResultLog> = Arc::new(LibSqlResultLog::new_memory().await.unwrap());

    let processed = processor(Arc::clone(&log))
        .process_path(&invoice, 2048)
        .await
        .unwrap();
    let fields = processed.fields.as_pdf().unwrap();
    assert_eq!(fields.total, Some(dec!(15000.00)));
    assert!(fields.policy_mentions.is_empty());
    assert_eq!(processed.triggered, vec![TriggeredAction::RiskAlert]);
    assert_eq!(processed.triggered[0].endpoint(), "POST /risk_alert");
    assert_eq!(
        processed.candidate_actions,
        vec!["Invoice total exceeds 10,000: 15000.00"]
    );

    let entry = log
        .latest_for(&invoice.display().to_string())
        .await
        .unwrap()
        .unwrap();
    assert!(entry.trace.ends_with("triggered=[POST /risk_alert]"));
}

#[tokio::test]
async fn raw_text_is_summarized_under_fixed_id() {
    let log: Arc<dyn ResultLog> = Arc::new(LibSqlResultLog::new_memory().await.unwrap());
    let processed = processor(Arc::clone(&log))
        .process_text("Hi team, could you send a quote for 200 units? Thanks")
        .await
        .unwrap();
    assert_eq!(processed.routing.file_identifier, "user_input_email");
    assert!(processed.triggered.is_empty());

    let entry = log.latest_for("user_input_email").await.unwrap();
    let summary = render_summary(entry.as_ref());
    assert!(summary.contains("intent: RFQ (Request for Quotation"));
    assert!(summary.contains("Source: user_input_email"));
}

#[tokio::test]
async fn missing_file_fails_without_logging() {
    let tmp = tempfile::tempdir().unwrap();
    let log: Arc<dyn ResultLog> = Arc::new(LibSqlResultLog::new_memory().await.unwrap());
    let missing = tmp.path().join("nope.pdf");

    let err = processor(Arc::clone(&log))
        .process_path(&missing, 2048)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Extraction(ExtractionError::Io(_))));
    assert!(log.load_all().await.unwrap().results.is_empty());
    assert_eq!(
        render_summary(log.latest_for(&missing.display().to_string()).await.unwrap().as_ref()),
        "No summary found for this input."
    );
}

#[tokio::test]
async fn results_survive_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let db = tmp.path().join("results.db");
    {
        let log: Arc<dyn ResultLog> = Arc::new(LibSqlResultLog::new_local(&db).await.unwrap());
        processor(log)
            .process_text("Please review the attached invoice")
            .await
            .unwrap();
    }
    let log = LibSqlResultLog::new_local(&db).await.unwrap();
    let snapshot = log.load_all().await.unwrap();
    assert_eq!(snapshot.results.len(), 1);
    assert_eq!(snapshot.results[0].extracted["intent"], "Invoice");
}
