use crate::defs::{Email, EmailSource};
use async_trait::async_trait;

/// A source with nothing in it. Stands in for a mailbox that could not be found.
pub struct EmptySource {
    pub name: String,
}

impl EmptySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl EmailSource for EmptySource {
    fn source_name(&self) -> String {
        format!("empty ({})", self.name)
    }

    async fn fetch_emails(&self) -> anyhow::Result<Vec<Email>> {
        // Nothing to read, the ideal batch is empty.
        Ok(vec![])
    }
}

/// A fixed, in-memory list of emails. Handy for tests and for piping
/// already-parsed messages through the pipeline.
pub struct StaticSource {
    emails: Vec<Email>,
}

impl StaticSource {
    pub fn new(emails: Vec<Email>) -> Self {
        Self { emails }
    }
}

#[async_trait]
impl EmailSource for StaticSource {
    fn source_name(&self) -> String {
        format!("static ({} emails)", self.emails.len())
    }

    async fn fetch_emails(&self) -> anyhow::Result<Vec<Email>> {
        Ok(self.emails.clone())
    }
}
