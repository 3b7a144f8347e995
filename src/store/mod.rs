//! Local persistence for boards, one JSON file per date.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::board::{find_overlaps, BoardState, Driver};

/// Where a board for a date is read from and written to
pub trait BoardStore: Send + Sync {
    /// `Ok(None)` when nothing was ever saved for this date
    fn load(&self, date: NaiveDate) -> Result<Option<BoardState>>;
    fn save(&self, date: NaiveDate, state: &BoardState) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("board-{}.json", date.format("%Y-%m-%d")))
    }
}

impl BoardStore for JsonFileStore {
    fn load(&self, date: NaiveDate) -> Result<Option<BoardState>> {
        let path = self.path_for(date);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let state: BoardState = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        debug!(%date, jobs = state.jobs.len(), pending = state.pending_jobs.len(), "board loaded");
        Ok(Some(state))
    }

    fn save(&self, date: NaiveDate, state: &BoardState) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        // Write then rename so a crash never leaves a half-written board
        let path = self.path_for(date);
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(state)?;
        fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!(%date, path = %path.display(), "board saved");
        Ok(())
    }
}

/// Load the board for `date`, or start an empty one on the static roster.
///
/// Loaded boards are not re-validated beyond a warning for overlapping jobs.
pub fn load_or_init(store: &dyn BoardStore, date: NaiveDate, roster: &[Driver]) -> Result<BoardState> {
    match store.load(date)? {
        Some(state) => {
            for (a, b) in find_overlaps(&state.jobs) {
                warn!(%date, first = %a, second = %b, "loaded board has overlapping jobs");
            }
            Ok(state)
        }
        None => {
            info!(%date, drivers = roster.len(), "no saved board, starting from roster");
            Ok(BoardState::with_roster(roster.to_vec()))
        }
    }
}

/// Work for the background store worker
#[derive(Debug)]
pub enum StoreRequest {
    Save(NaiveDate, BoardState),
    Load(NaiveDate, Vec<Driver>),
}

/// Reply from the background store worker, one per request
#[derive(Debug, PartialEq)]
pub enum StoreEvent {
    Saved(NaiveDate),
    SaveFailed(NaiveDate, String),
    Loaded(NaiveDate, BoardState),
    LoadFailed(NaiveDate, String),
}

/// Run store requests on one blocking thread, strictly in the order sent.
///
/// A load therefore always reads every save queued ahead of it. After a
/// failed save, loads are refused until a save succeeds again, so a reload
/// can never replace edits that only exist in memory.
pub fn spawn_worker(
    runtime: &tokio::runtime::Handle,
    store: Arc<dyn BoardStore>,
    events: Sender<StoreEvent>,
) -> Sender<StoreRequest> {
    let (tx, rx) = channel();
    runtime.spawn_blocking(move || run_worker(store.as_ref(), rx, events));
    tx
}

fn run_worker(store: &dyn BoardStore, requests: Receiver<StoreRequest>, events: Sender<StoreEvent>) {
    let mut failed_save: Option<NaiveDate> = None;

    // Ends once the app drops its sender
    while let Ok(request) = requests.recv() {
        let event = match request {
            StoreRequest::Save(date, state) => match store.save(date, &state) {
                Ok(()) => {
                    failed_save = None;
                    StoreEvent::Saved(date)
                }
                Err(e) => {
                    error!(%date, "board save failed: {:#}", e);
                    failed_save = Some(date);
                    StoreEvent::SaveFailed(date, format!("Could not save {}: {:#}", date, e))
                }
            },
            StoreRequest::Load(date, roster) => match failed_save {
                Some(unsaved) => {
                    warn!(%date, %unsaved, "load refused while edits are unsaved");
                    StoreEvent::LoadFailed(date, format!("Not loading {}: changes to {} are not saved yet", date, unsaved))
                }
                None => match load_or_init(store, date, &roster) {
                    Ok(state) => StoreEvent::Loaded(date, state),
                    Err(e) => {
                        error!(%date, "board load failed: {:#}", e);
                        StoreEvent::LoadFailed(date, format!("Could not load {}: {:#}", date, e))
                    }
                },
            },
        };
        if events.send(event).is_err() {
            break;
        }
    }
    debug!("store worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Job;
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
    }

    #[test]
    fn file_name_carries_the_date() {
        let store = JsonFileStore::new("/data");
        assert_eq!(store.path_for(date()), PathBuf::from("/data/board-2025-04-01.json"));
    }

    #[test]
    fn save_then_load_returns_the_same_board() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("boards"));
        let state = BoardState {
            drivers: vec![Driver::new("D1", "Sato", "2025PK")],
            jobs: vec![Job::pending("J1", "Bins", 30).scheduled("D1", "09:00")],
            pending_jobs: vec![Job::pending("J2", "Glass", 45)],
            splits: vec![],
        };

        store.save(date(), &state).unwrap();
        assert_eq!(store.load(date()).unwrap(), Some(state));
        assert!(!store.path_for(date()).with_extension("json.tmp").exists());
    }

    #[test]
    fn missing_date_falls_back_to_the_roster() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let roster = vec![Driver::new("D1", "Sato", "2025PK")];

        assert_eq!(store.load(date()).unwrap(), None);
        let state = load_or_init(&store, date(), &roster).unwrap();
        assert_eq!(state, BoardState::with_roster(roster));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        fs::write(store.path_for(date()), "{ not json").unwrap();

        let err = load_or_init(&store, date(), &[]).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    /// Store whose writes fail until `healthy` is set
    struct FlakyStore {
        inner: JsonFileStore,
        healthy: std::sync::atomic::AtomicBool,
    }

    impl BoardStore for FlakyStore {
        fn load(&self, date: NaiveDate) -> Result<Option<BoardState>> {
            self.inner.load(date)
        }

        fn save(&self, date: NaiveDate, state: &BoardState) -> Result<()> {
            if !self.healthy.load(std::sync::atomic::Ordering::SeqCst) {
                anyhow::bail!("disk full");
            }
            self.inner.save(date, state)
        }
    }

    fn recv(events: &Receiver<StoreEvent>) -> StoreEvent {
        events.recv_timeout(std::time::Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn reload_reads_the_save_queued_before_it() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path()));
        let roster = vec![Driver::new("D1", "Sato", "2025PK")];
        store.save(date(), &BoardState::with_roster(roster.clone())).unwrap();

        let (events_tx, events) = channel();
        let requests = spawn_worker(runtime.handle(), store, events_tx);

        let mut edited = BoardState::with_roster(roster.clone());
        edited.jobs.push(Job::pending("J1", "Bins", 30).scheduled("D1", "09:00"));
        requests.send(StoreRequest::Save(date(), edited.clone())).unwrap();
        requests.send(StoreRequest::Load(date(), roster)).unwrap();

        assert_eq!(recv(&events), StoreEvent::Saved(date()));
        assert_eq!(recv(&events), StoreEvent::Loaded(date(), edited));
    }

    #[test]
    fn failed_save_blocks_loads_until_a_save_succeeds() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FlakyStore {
            inner: JsonFileStore::new(dir.path()),
            healthy: std::sync::atomic::AtomicBool::new(false),
        });
        let roster = vec![Driver::new("D1", "Sato", "2025PK")];
        let state = BoardState::with_roster(roster.clone());

        let (events_tx, events) = channel();
        let requests = spawn_worker(runtime.handle(), store.clone(), events_tx);

        requests.send(StoreRequest::Save(date(), state.clone())).unwrap();
        requests.send(StoreRequest::Load(date(), roster.clone())).unwrap();
        assert!(matches!(recv(&events), StoreEvent::SaveFailed(d, _) if d == date()));
        assert!(matches!(recv(&events), StoreEvent::LoadFailed(d, _) if d == date()));

        store.healthy.store(true, std::sync::atomic::Ordering::SeqCst);
        requests.send(StoreRequest::Save(date(), state.clone())).unwrap();
        requests.send(StoreRequest::Load(date(), roster)).unwrap();
        assert_eq!(recv(&events), StoreEvent::Saved(date()));
        assert_eq!(recv(&events), StoreEvent::Loaded(date(), state));
    }
}
