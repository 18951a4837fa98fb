use crate::parser::ErrorRecord;
use crate::report::Report;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("report not found: {0}")]
    NotFound(String),
    #[error("report id already exists: {0}")]
    Duplicate(String),
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed report storage. Every change pushes the full current set to all
/// subscribers.
pub trait ReportStore: Send + Sync {
    fn create(&self, report: Report) -> Result<String, StoreError>;
    fn update_errors(&self, id: &str, errors: Vec<ErrorRecord>) -> Result<(), StoreError>;
    fn delete(&self, id: &str) -> Result<(), StoreError>;
    fn get(&self, id: &str) -> Result<Report, StoreError>;
    fn list(&self) -> Result<Vec<Report>, StoreError>;
    /// The receiver gets the current set immediately, then one set per change.
    fn subscribe(&self) -> Receiver<Vec<Report>>;
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Subscribers {
    senders: Mutex<Vec<Sender<Vec<Report>>>>,
}

impl Subscribers {
    fn add(&self, current: Vec<Report>) -> Receiver<Vec<Report>> {
        let (tx, rx) = channel();
        let _ = tx.send(current);
        lock(&self.senders).push(tx);
        rx
    }

    fn broadcast(&self, reports: &[Report]) {
        let mut senders = lock(&self.senders);
        senders.retain(|tx| tx.send(reports.to_vec()).is_ok());
        debug!(subscribers = senders.len(), reports = reports.len(), "report set pushed");
    }
}

#[derive(Default)]
pub struct MemoryStore {
    reports: Mutex<Vec<Report>>,
    subscribers: Subscribers,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reports(reports: Vec<Report>) -> Self {
        Self { reports: Mutex::new(reports), subscribers: Subscribers::default() }
    }

    /// Runs `f` against the report set, then `persist`. A failed persist
    /// rolls the set back and nothing is broadcast.
    fn apply<T>(
        &self,
        f: impl FnOnce(&mut Vec<Report>) -> Result<T, StoreError>,
        persist: impl FnOnce(&[Report]) -> Result<(), StoreError>,
    ) -> Result<T, StoreError> {
        let snapshot = {
            let mut reports = lock(&self.reports);
            let before = reports.clone();
            let out = f(&mut reports)?;
            if let Err(e) = persist(&reports) {
                *reports = before;
                return Err(e);
            }
            (out, reports.clone())
        };
        self.subscribers.broadcast(&snapshot.1);
        Ok(snapshot.0)
    }

    fn replace_all(&self, reports: Vec<Report>) {
        *lock(&self.reports) = reports.clone();
        self.subscribers.broadcast(&reports);
    }

    fn create_with(
        &self,
        report: Report,
        persist: impl FnOnce(&[Report]) -> Result<(), StoreError>,
    ) -> Result<String, StoreError> {
        self.apply(
            |reports| {
                if reports.iter().any(|r| r.id == report.id) {
                    return Err(StoreError::Duplicate(report.id.clone()));
                }
                let id = report.id.clone();
                reports.push(report);
                Ok(id)
            },
            persist,
        )
    }

    fn update_errors_with(
        &self,
        id: &str,
        errors: Vec<ErrorRecord>,
        persist: impl FnOnce(&[Report]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        self.apply(
            |reports| {
                let r = reports
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
                r.errors = errors;
                Ok(())
            },
            persist,
        )
    }

    fn delete_with(
        &self,
        id: &str,
        persist: impl FnOnce(&[Report]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        self.apply(
            |reports| {
                let pos = reports
                    .iter()
                    .position(|r| r.id == id)
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
                reports.remove(pos);
                Ok(())
            },
            persist,
        )
    }
}

fn no_persist(_: &[Report]) -> Result<(), StoreError> {
    Ok(())
}

impl ReportStore for MemoryStore {
    fn create(&self, report: Report) -> Result<String, StoreError> {
        self.create_with(report, no_persist)
    }

    fn update_errors(&self, id: &str, errors: Vec<ErrorRecord>) -> Result<(), StoreError> {
        self.update_errors_with(id, errors, no_persist)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.delete_with(id, no_persist)
    }

    fn get(&self, id: &str) -> Result<Report, StoreError> {
        lock(&self.reports)
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<Report>, StoreError> {
        Ok(lock(&self.reports).clone())
    }

    fn subscribe(&self) -> Receiver<Vec<Report>> {
        let current = lock(&self.reports).clone();
        self.subscribers.add(current)
    }
}

/// Report set kept as a JSON array on disk, rewritten on every change.
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let reports = read_reports(path)?;
        info!(path = %path.display(), reports = reports.len(), "opened report store");
        Ok(Self { path: path.to_path_buf(), inner: MemoryStore::with_reports(reports) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file and pushes the set to subscribers if it changed.
    pub fn reload(&self) -> Result<bool, StoreError> {
        let on_disk = read_reports(&self.path)?;
        if on_disk == self.inner.list()? {
            return Ok(false);
        }
        self.inner.replace_all(on_disk);
        Ok(true)
    }

    fn save(&self, reports: &[Report]) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(reports)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn read_reports(path: &Path) -> Result<Vec<Report>, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.iter().all(|b| b.is_ascii_whitespace()) => Ok(Vec::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

impl ReportStore for JsonFileStore {
    fn create(&self, report: Report) -> Result<String, StoreError> {
        self.inner.create_with(report, |r| self.save(r))
    }

    fn update_errors(&self, id: &str, errors: Vec<ErrorRecord>) -> Result<(), StoreError> {
        self.inner.update_errors_with(id, errors, |r| self.save(r))
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete_with(id, |r| self.save(r))
    }

    fn get(&self, id: &str) -> Result<Report, StoreError> {
        self.inner.get(id)
    }

    fn list(&self) -> Result<Vec<Report>, StoreError> {
        self.inner.list()
    }

    fn subscribe(&self) -> Receiver<Vec<Report>> {
        self.inner.subscribe()
    }
}
