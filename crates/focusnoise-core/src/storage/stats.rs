//! Stats persistence.
//!
//! Stats live in `stats.json` next to the config. Writes go to a sibling
//! temp file which is synced and then renamed over the real one, so an
//! interrupt mid-write leaves either the old or the new file, never half of
//! one.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::data_dir;
use crate::error::{ConfigError, PersistenceError};
use crate::gamification::UserStats;

/// Where [`UserStats`] are kept between runs.
pub trait StatsStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<UserStats>, PersistenceError>;

    fn save(&self, stats: &UserStats) -> Result<(), PersistenceError>;

    /// Save, but only commit if `ticket` has not been abandoned by the time
    /// the new stats would become visible.
    fn save_with(&self, stats: &UserStats, ticket: &WriteTicket) -> Result<(), PersistenceError> {
        if !ticket.begin_commit() {
            return Err(PersistenceError::WriterAborted("write abandoned".into()));
        }
        self.save(stats)
    }

    /// Move unreadable stored stats out of the way. `Ok(None)` when the
    /// store has nothing to move.
    fn set_aside(&self) -> Result<Option<PathBuf>, PersistenceError> {
        Ok(None)
    }
}

const PENDING: u8 = 0;
const COMMITTING: u8 = 1;
const ABANDONED: u8 = 2;

/// Decides a race between a writer that is about to commit and a caller
/// that stops waiting for it. Exactly one side wins.
#[derive(Debug, Default)]
pub struct WriteTicket {
    state: AtomicU8,
}

impl WriteTicket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer side. `false` once the caller has abandoned the write.
    pub fn begin_commit(&self) -> bool {
        self.state
            .compare_exchange(PENDING, COMMITTING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Caller side. `false` when the writer is already committing; the
    /// caller must then wait for it.
    pub fn abandon(&self) -> bool {
        self.state
            .compare_exchange(PENDING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_abandoned(&self) -> bool {
        self.state.load(Ordering::SeqCst) == ABANDONED
    }
}

#[derive(Debug, Clone)]
pub struct FileStatsStore {
    path: PathBuf,
}

impl FileStatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/focusnoise/stats.json`
    pub fn open_default() -> Result<Self, ConfigError> {
        Ok(Self::new(data_dir()?.join("stats.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move an unreadable stats file to `stats.json.corrupt` so the next
    /// write does not replace it. Returns the new location.
    pub fn quarantine(&self) -> std::io::Result<PathBuf> {
        let target = self.path.with_extension("json.corrupt");
        fs::rename(&self.path, &target)?;
        Ok(target)
    }

    fn write_failed(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::WriteFailed {
            path: self.path.clone(),
            source,
        }
    }
}

impl StatsStore for FileStatsStore {
    fn load(&self) -> Result<Option<UserStats>, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::ReadFailed {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, stats: &UserStats) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(stats)?;
        write_atomic(&self.path, &bytes).map_err(|e| self.write_failed(e))
    }

    fn save_with(&self, stats: &UserStats, ticket: &WriteTicket) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(stats)?;
        let committed = write_atomic_if(&self.path, &bytes, || ticket.begin_commit())
            .map_err(|e| self.write_failed(e))?;
        if committed {
            Ok(())
        } else {
            Err(PersistenceError::WriterAborted("write abandoned".into()))
        }
    }

    fn set_aside(&self) -> Result<Option<PathBuf>, PersistenceError> {
        match self.quarantine() {
            Ok(target) => Ok(Some(target)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.write_failed(e)),
        }
    }
}

/// Write bytes to a file atomically: temp file in the same directory,
/// fsync, rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    write_atomic_if(path, bytes, || true).map(|_| ())
}

/// Like [`write_atomic`], but asks `commit` right before the rename. When it
/// says no, the temp file is removed, the target is left alone and
/// `Ok(false)` is returned.
pub fn write_atomic_if(
    path: &Path,
    bytes: &[u8],
    commit: impl FnOnce() -> bool,
) -> std::io::Result<bool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if !commit() {
        let _ = fs::remove_file(&temp_path);
        return Ok(false);
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(true)
}

/// In-memory store for tests and `--no-save` runs.
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    saved: Mutex<Option<UserStats>>,
    fail_writes: AtomicBool,
    write_delay: Option<Duration>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every write fails.
    pub fn failing() -> Self {
        Self {
            fail_writes: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// A store whose writes block for `delay` first.
    pub fn slow(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn saved(&self) -> Option<UserStats> {
        self.saved.lock().ok().and_then(|s| s.clone())
    }
}

impl StatsStore for MemoryStatsStore {
    fn load(&self) -> Result<Option<UserStats>, PersistenceError> {
        Ok(self.saved())
    }

    fn save(&self, stats: &UserStats) -> Result<(), PersistenceError> {
        self.save_with(stats, &WriteTicket::new())
    }

    fn save_with(&self, stats: &UserStats, ticket: &WriteTicket) -> Result<(), PersistenceError> {
        if let Some(delay) = self.write_delay {
            std::thread::sleep(delay);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("store is read-only".into()));
        }
        let mut saved = self
            .saved
            .lock()
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        if !ticket.begin_commit() {
            return Err(PersistenceError::WriterAborted("write abandoned".into()));
        }
        *saved = Some(stats.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStatsStore::new(dir.path().join("stats.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStatsStore::new(dir.path().join("nested").join("stats.json"));
        let stats = UserStats {
            total_focus_seconds: 4200,
            current_streak_days: 2,
            longest_streak_days: 5,
            last_session_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 1),
            ..Default::default()
        };
        store.save(&stats).unwrap();
        assert_eq!(store.load().unwrap(), Some(stats));
        assert!(!dir.path().join("nested").join("stats.json.tmp").exists());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, r#"{"total_focus_seconds": 90}"#).unwrap();
        let stats = FileStatsStore::new(&path).load().unwrap().unwrap();
        assert_eq!(stats.total_focus_seconds, 90);
        assert_eq!(stats.current_streak_days, 0);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            FileStatsStore::new(&path).load(),
            Err(PersistenceError::Encoding(_))
        ));
    }

    #[test]
    fn write_into_missing_parent_that_is_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = FileStatsStore::new(blocker.join("stats.json"));
        assert!(matches!(
            store.save(&UserStats::default()),
            Err(PersistenceError::WriteFailed { .. })
        ));
    }

    #[test]
    fn abandoned_write_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStatsStore::new(dir.path().join("stats.json"));
        let old = UserStats {
            total_focus_seconds: 60,
            ..Default::default()
        };
        store.save(&old).unwrap();

        let ticket = WriteTicket::new();
        assert!(ticket.abandon());
        let new = UserStats {
            total_focus_seconds: 1860,
            ..Default::default()
        };
        assert!(matches!(
            store.save_with(&new, &ticket),
            Err(PersistenceError::WriterAborted(_))
        ));
        assert_eq!(store.load().unwrap(), Some(old));
        assert!(!dir.path().join("stats.json.tmp").exists());
    }

    #[test]
    fn ticket_has_one_winner() {
        let writer_first = WriteTicket::new();
        assert!(writer_first.begin_commit());
        assert!(!writer_first.abandon());

        let caller_first = WriteTicket::new();
        assert!(caller_first.abandon());
        assert!(!caller_first.begin_commit());
        assert!(caller_first.is_abandoned());
    }

    #[test]
    fn quarantine_moves_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, "{ truncated").unwrap();
        let store = FileStatsStore::new(&path);

        let moved = store.quarantine().unwrap();
        assert_eq!(moved, dir.path().join("stats.json.corrupt"));
        assert_eq!(fs::read_to_string(moved).unwrap(), "{ truncated");
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn memory_store_can_fail() {
        let store = MemoryStatsStore::new();
        store.set_failing(true);
        assert!(store.save(&UserStats::default()).is_err());
        store.set_failing(false);
        assert!(store.save(&UserStats::default()).is_ok());
        assert!(store.saved().is_some());
    }
}
