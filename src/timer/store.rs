use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use super::TimerState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("timer state I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt timer state: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("timer state store unavailable")]
    Unavailable,
}

/// Where the timer keeps its state between runs.
pub trait TimerStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved.
    fn load(&self) -> Result<Option<TimerState>, StoreError>;
    fn save(&self, state: &TimerState) -> Result<(), StoreError>;
    /// Removing absent state is not an error.
    fn clear(&self) -> Result<(), StoreError>;
}

/// JSON file store. Writes go to a sibling temp file that is renamed over
/// the target, so readers see either the old or the new state.
pub struct FileTimerStore {
    path: PathBuf,
}

impl FileTimerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "timerState.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TimerStore for FileTimerStore {
    fn load(&self) -> Result<Option<TimerState>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, state: &TimerState) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(state)?;
        let temp = self.temp_path();

        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&temp)?;
            file.write_all(&json)?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&temp);
            self.io_error(e)
        })?;

        debug!("timer state written to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// In-process store, used by tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct MemoryTimerStore {
    state: Mutex<Option<TimerState>>,
    read_only: Mutex<bool>,
}

impl MemoryTimerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: TimerState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            read_only: Mutex::new(false),
        }
    }

    /// Makes every later `save` and `clear` fail.
    pub fn set_read_only(&self, read_only: bool) {
        if let Ok(mut flag) = self.read_only.lock() {
            *flag = read_only;
        }
    }

    fn writable(&self) -> Result<(), StoreError> {
        match self.read_only.lock() {
            Ok(flag) if !*flag => Ok(()),
            _ => Err(StoreError::Unavailable),
        }
    }
}

impl TimerStore for MemoryTimerStore {
    fn load(&self) -> Result<Option<TimerState>, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::Unavailable)?;
        Ok(state.clone())
    }

    fn save(&self, state: &TimerState) -> Result<(), StoreError> {
        self.writable()?;
        let mut slot = self.state.lock().map_err(|_| StoreError::Unavailable)?;
        *slot = Some(state.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.writable()?;
        let mut slot = self.state.lock().map_err(|_| StoreError::Unavailable)?;
        *slot = None;
        Ok(())
    }
}
