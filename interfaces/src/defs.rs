use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// One email as handed over by a mail-source collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub body: String,
    #[serde(default)]
    pub message_id: Option<String>,
}

impl Email {
    pub fn new(
        subject: impl Into<String>,
        sender: impl Into<String>,
        date: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            sender: sender.into(),
            date: date.into(),
            body: body.into(),
            message_id: None,
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}

/// A plain field mapping of one exported record.
pub type RecordFields = Map<String, Value>;

/// Fields every exported record carries, either populated or explicitly null.
pub const COMMON_EXPORT_FIELDS: &[&str] = &[
    "amount",
    "currency",
    "total_spent",
    "item_name",
    "vendor",
    "purchase_date",
];

// Object style note:
// Sources and sinks sit at the edge of the pipeline. The core never asks
// where emails came from or where records go; it only sees these traits.

/// Anything that can produce a sequence of emails (mbox files, .eml folders,
/// remote mailboxes).
#[async_trait]
pub trait EmailSource: Send + Sync {
    /// Human-readable name for logs
    fn source_name(&self) -> String;

    /// Fetch every email the source currently holds.
    /// A source that does not exist yields an empty list rather than an error.
    async fn fetch_emails(&self) -> anyhow::Result<Vec<Email>>;
}

/// Exporter interface: receives records as plain field mappings plus a destination.
pub trait RecordSink: Send + Sync {
    fn sink_name(&self) -> String;

    fn write_records(&self, records: &[RecordFields], destination: &Path) -> anyhow::Result<usize>;
}
