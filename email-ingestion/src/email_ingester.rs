use crate::{IngestionError, Result};
use async_trait::async_trait;
use interfaces::defs::{Email, EmailSource};
use mail_parser::mailbox::mbox::MessageIterator;
use mail_parser::MessageParser;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Parse one RFC 5322 message into the pipeline's `Email` shape.
pub fn parse_message(raw: &[u8]) -> Option<Email> {
    let parsed = MessageParser::default().parse(raw)?;

    let sender = parsed
        .from()
        .and_then(|addrs| addrs.first())
        .map(|addr| match (addr.name.as_ref(), addr.address.as_ref()) {
            (Some(name), Some(address)) => format!("{} <{}>", name, address),
            (None, Some(address)) => address.to_string(),
            (Some(name), None) => name.to_string(),
            (None, None) => String::new(),
        })
        .unwrap_or_default();

    let subject = parsed.subject().unwrap_or("").to_string();
    let date = parsed.date().map(|d| d.to_rfc822()).unwrap_or_default();

    let body = parsed
        .body_text(0)
        .or_else(|| parsed.body_html(0))
        .map(|text| text.into_owned())
        .unwrap_or_default();

    Some(Email {
        subject,
        sender,
        date,
        body,
        message_id: parsed.message_id().map(|id| id.to_string()),
    })
}

/// Read every message from an mbox file.
pub fn read_mbox(path: &Path) -> Result<Vec<Email>> {
    if !path.is_file() {
        return Err(IngestionError::SourceNotFound(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let mut emails = Vec::new();
    let mut skipped = 0usize;

    for message in MessageIterator::new(BufReader::new(file)) {
        match message {
            Ok(message) => match parse_message(message.contents()) {
                Some(email) => emails.push(email),
                None => skipped += 1,
            },
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Skipped {} unparseable messages in {}", skipped, path.display());
    }
    debug!("Read {} messages from mbox {}", emails.len(), path.display());
    Ok(emails)
}

/// Read every `.eml` file below a directory, in path order.
pub fn read_eml_dir(dir: &Path) -> Result<Vec<Email>> {
    if !dir.is_dir() {
        return Err(IngestionError::SourceNotFound(dir.to_path_buf()));
    }

    let mut paths = Vec::new();
    collect_eml_files(dir, &mut paths)?;
    paths.sort();

    let mut emails = Vec::new();
    for path in paths {
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                continue;
            }
        };
        match parse_message(&raw) {
            Some(email) => emails.push(email),
            None => warn!("Skipping unparseable message {}", path.display()),
        }
    }

    debug!("Read {} messages from {}", emails.len(), dir.display());
    Ok(emails)
}

fn collect_eml_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_eml_files(&path, out)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// What kind of file-backed mailbox a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxKind {
    Mbox,
    EmlDirectory,
}

/// File-backed mail source. A missing path yields no emails instead of failing.
pub struct FileMailSource {
    path: PathBuf,
    kind: MailboxKind,
}

impl FileMailSource {
    pub fn mbox(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: MailboxKind::Mbox }
    }

    pub fn eml_dir(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: MailboxKind::EmlDirectory }
    }

    /// Directories are treated as .eml folders, anything else as an mbox file.
    pub fn detect(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::eml_dir(path)
        } else {
            Self::mbox(path)
        }
    }

    pub fn kind(&self) -> MailboxKind {
        self.kind
    }

    fn read(&self) -> Result<Vec<Email>> {
        match self.kind {
            MailboxKind::Mbox => read_mbox(&self.path),
            MailboxKind::EmlDirectory => read_eml_dir(&self.path),
        }
    }
}

#[async_trait]
impl EmailSource for FileMailSource {
    fn source_name(&self) -> String {
        match self.kind {
            MailboxKind::Mbox => format!("mbox:{}", self.path.display()),
            MailboxKind::EmlDirectory => format!("eml:{}", self.path.display()),
        }
    }

    async fn fetch_emails(&self) -> anyhow::Result<Vec<Email>> {
        match self.read() {
            Ok(emails) => {
                info!("Loaded {} emails from {}", emails.len(), self.source_name());
                Ok(emails)
            }
            Err(IngestionError::SourceNotFound(path)) => {
                warn!("Mail source {} not found, continuing with no emails", path.display());
                Ok(vec![])
            }
            Err(e) => Err(e.into()),
        }
    }
}
