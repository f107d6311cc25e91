//! Recent-export history: a newest-first, capped list of generated permits
//! persisted as JSON through a narrow storage adapter. Storage failures never
//! interrupt an export and corrupt data never takes the app down.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::AppError;

/// The history keeps at most this many records; the oldest is evicted.
pub const HISTORY_CAP: usize = 20;

/// One generated permit. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub filename: String,
    /// Echo of the MAWB field at export time (or "unnamed").
    pub mawb: String,
    /// Station tag of the variant that produced the document.
    pub variant: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Base64 of the PDF bytes; self-contained for redownload.
    pub payload: String,
}

impl HistoryRecord {
    pub fn new(filename: String, mawb: String, variant: String, pdf_bytes: &[u8]) -> Self {
        HistoryRecord {
            id: new_record_id(),
            filename,
            mawb,
            variant,
            created_at: Utc::now().to_rfc3339(),
            payload: BASE64.encode(pdf_bytes),
        }
    }
}

/// Opaque unique token: the first 8 hex chars of a v4 UUID, uppercased.
fn new_record_id() -> String {
    let uuid = Uuid::new_v4();
    let hex = uuid.simple().to_string();
    hex[..8].to_uppercase()
}

/// Narrow persistence seam so the store is testable without a real backend.
pub trait HistoryStorage: Send {
    /// Raw persisted payload, `None` when nothing has been stored yet.
    fn load(&self) -> Option<String>;
    fn save(&self, raw: &str) -> std::io::Result<()>;
}

/// Production adapter: one JSON file under the user's config directory.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        JsonFileStorage { path }
    }

    /// `$HOME/.config/permit-pdf/history.json`
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var("HOME").ok()?;
        Some(PathBuf::from(home).join(".config/permit-pdf/history.json"))
    }
}

impl HistoryStorage for JsonFileStorage {
    fn load(&self) -> Option<String> {
        std::fs::read_to_string(&self.path).ok()
    }

    fn save(&self, raw: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, raw)
    }
}

/// In-memory copy of the history plus its storage adapter. The persisted
/// collection is read once at startup; afterwards the in-memory copy is
/// authoritative for the session.
pub struct HistoryStore {
    records: Vec<HistoryRecord>,
    storage: Box<dyn HistoryStorage>,
}

impl HistoryStore {
    /// Loads the persisted collection; absent or corrupt data starts empty.
    pub fn load(storage: Box<dyn HistoryStorage>) -> Self {
        let records = match storage.load() {
            Some(raw) => match serde_json::from_str::<Vec<HistoryRecord>>(&raw) {
                Ok(records) => records,
                Err(e) => {
                    log::warn!("Discarding unreadable history: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        HistoryStore { records, storage }
    }

    /// Newest first.
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Prepends, truncates to the cap and persists. Persistence errors are
    /// logged and swallowed; the in-memory state keeps the record either way.
    pub fn append(&mut self, record: HistoryRecord) {
        self.records.insert(0, record);
        self.records.truncate(HISTORY_CAP);
        match serde_json::to_string(&self.records) {
            Ok(raw) => {
                if let Err(e) = self.storage.save(&raw) {
                    log::warn!("Could not persist history: {}", e);
                }
            }
            Err(e) => log::warn!("Could not encode history: {}", e),
        }
    }

    /// Re-writes a stored document to disk from its payload; no regeneration.
    pub fn redownload(&self, record: &HistoryRecord, out_dir: &Path) -> Result<PathBuf, AppError> {
        let bytes = BASE64
            .decode(&record.payload)
            .map_err(|e| AppError::Storage(format!("undecodable payload: {}", e)))?;
        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join(&record.filename);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fake adapter: a mutex'd string, optionally failing every save.
    struct MemoryStorage {
        raw: Mutex<Option<String>>,
        fail_saves: bool,
    }

    impl MemoryStorage {
        fn new(initial: Option<&str>) -> Self {
            MemoryStorage { raw: Mutex::new(initial.map(str::to_string)), fail_saves: false }
        }
    }

    impl HistoryStorage for MemoryStorage {
        fn load(&self) -> Option<String> {
            self.raw.lock().unwrap().clone()
        }

        fn save(&self, raw: &str) -> std::io::Result<()> {
            if self.fail_saves {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "quota"));
            }
            *self.raw.lock().unwrap() = Some(raw.to_string());
            Ok(())
        }
    }

    fn record(n: usize) -> HistoryRecord {
        HistoryRecord::new(
            format!("{}_GEMINI_PTT.pdf", n),
            format!("{}", n),
            "GEMINI".to_string(),
            b"%PDF-1.3 test",
        )
    }

    #[test]
    fn cap_keeps_the_twenty_most_recent_newest_first() {
        let mut store = HistoryStore::load(Box::new(MemoryStorage::new(None)));
        for n in 0..25 {
            store.append(record(n));
        }
        assert_eq!(store.records().len(), HISTORY_CAP);
        assert_eq!(store.records()[0].mawb, "24");
        assert_eq!(store.records()[HISTORY_CAP - 1].mawb, "5");
    }

    #[test]
    fn corrupt_persisted_history_loads_as_empty() {
        let store = HistoryStore::load(Box::new(MemoryStorage::new(Some("not json at all"))));
        assert!(store.records().is_empty());
    }

    #[test]
    fn persisted_history_round_trips() {
        let storage = MemoryStorage::new(None);
        let mut store = HistoryStore::load(Box::new(storage));
        store.append(record(1));
        store.append(record(2));
        let raw = store.storage.load().expect("history was persisted");

        let reloaded = HistoryStore::load(Box::new(MemoryStorage::new(Some(&raw))));
        assert_eq!(reloaded.records(), store.records());
    }

    #[test]
    fn save_failures_keep_the_in_memory_state() {
        let storage = MemoryStorage { raw: Mutex::new(None), fail_saves: true };
        let mut store = HistoryStore::load(Box::new(storage));
        store.append(record(1));
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn record_ids_are_short_opaque_tokens() {
        let a = record(1);
        let b = record(2);
        assert_eq!(a.id.len(), 8);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn redownload_writes_the_stored_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(Box::new(MemoryStorage::new(None)));
        let rec = record(7);
        let path = store.redownload(&rec, dir.path()).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.3 test");
    }
}
