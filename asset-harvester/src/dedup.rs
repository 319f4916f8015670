use crate::types::PurchaseRecord;
use crate::utils::{sha256_hex, write_atomic};
use interfaces::Email;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Fingerprint of a record: the trimmed transaction id when there is one, otherwise
/// vendor, item, amount and date with case and surrounding whitespace ignored.
pub fn record_hash(record: &PurchaseRecord) -> String {
    if let Some(id) = record.transaction_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        return sha256_hex(id);
    }

    let amount = record.amount.map(|a| a.to_string()).unwrap_or_default();
    let components = format!(
        "{}|{}|{}|{}",
        record.vendor.trim().to_lowercase(),
        record.item_name.trim().to_lowercase(),
        amount.trim(),
        record.purchase_date.trim()
    );
    sha256_hex(&components)
}

/// Fingerprint of an email: its message id, otherwise the headers and body verbatim.
pub fn email_hash(email: &Email) -> String {
    if let Some(id) = email.message_id.as_deref().filter(|id| !id.trim().is_empty()) {
        return sha256_hex(id);
    }
    sha256_hex(&format!("{}|{}|{}|{}", email.subject, email.sender, email.date, email.body))
}

/// Seen-set of record and email hashes, optionally persisted as a JSON array.
pub struct DedupIndex {
    path: Option<PathBuf>,
    dry_run: bool,
    seen: Mutex<HashSet<String>>,
}

impl DedupIndex {
    /// Load the history at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl AsRef<Path>, dry_run: bool) -> Self {
        let path = path.as_ref().to_path_buf();
        let seen: HashSet<String> = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<Vec<String>>(&content)
                .map(|hashes| hashes.into_iter().collect())
                .unwrap_or_else(|e| {
                    warn!("Failed to load dedup history from {}: {}", path.display(), e);
                    HashSet::new()
                }),
            Err(_) => HashSet::new(),
        };
        info!("Loaded {} dedup hashes from {}", seen.len(), path.display());
        Self {
            path: Some(path),
            dry_run,
            seen: Mutex::new(seen),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            dry_run: false,
            seen: Mutex::new(HashSet::new()),
        }
    }

    fn seen(&self) -> MutexGuard<'_, HashSet<String>> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.seen().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen().is_empty()
    }

    /// True if `record` was seen before; otherwise marks it (unless dry-run).
    pub fn is_duplicate(&self, record: &PurchaseRecord) -> bool {
        self.check_and_mark(record_hash(record))
    }

    /// True if `email` was seen before; otherwise marks it (unless dry-run).
    pub fn is_duplicate_email(&self, email: &Email) -> bool {
        self.check_and_mark(email_hash(email))
    }

    /// True if `email` was fully handled by an earlier run. Does not mark it.
    pub fn has_seen_email(&self, email: &Email) -> bool {
        self.seen().contains(&email_hash(email))
    }

    /// Record `email` as handled (unless dry-run).
    pub fn mark_email(&self, email: &Email) {
        if self.dry_run {
            return;
        }
        let mut seen = self.seen();
        if seen.insert(email_hash(email)) {
            self.persist(&seen);
        }
    }

    fn check_and_mark(&self, hash: String) -> bool {
        let mut seen = self.seen();
        if seen.contains(&hash) {
            debug!("Duplicate hash {}", &hash[..12.min(hash.len())]);
            return true;
        }
        if self.dry_run {
            return false;
        }
        seen.insert(hash);
        self.persist(&seen);
        false
    }

    /// Forget everything, including the file on disk.
    pub fn reset(&self) {
        let mut seen = self.seen();
        seen.clear();
        if let Some(path) = &self.path {
            if self.dry_run {
                return;
            }
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove dedup history {}: {}", path.display(), e);
                }
            }
        }
    }

    // Runs under the lock so concurrent markers never write an older set over a newer one.
    fn persist(&self, seen: &HashSet<String>) {
        let Some(path) = &self.path else {
            return;
        };
        let sorted: BTreeSet<&String> = seen.iter().collect();
        let result = serde_json::to_vec(&sorted)
            .map_err(std::io::Error::other)
            .and_then(|bytes| write_atomic(path, &bytes));
        if let Err(e) = result {
            warn!("Failed to save dedup history to {}: {}", path.display(), e);
        }
    }
}
