//! Local persistence for auto-save and document files

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::document::Document;
use crate::error::DocumentError;

const AUTOSAVE_FILE: &str = "autosave.json";

/// Auto-save location on disk
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data dir>/arbor-studio`
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("arbor-studio")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn autosave_path(&self) -> PathBuf {
        self.dir.join(AUTOSAVE_FILE)
    }

    /// Write the auto-save slot; a crash mid-write leaves the previous copy
    pub fn save_autosave(&self, document: &Document) -> Result<(), DocumentError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.autosave_path();
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, document.to_json_pretty()?)?;
        std::fs::rename(&tmp, &path)?;
        log::debug!("Auto-saved to {}", path.display());
        Ok(())
    }

    /// The stored auto-save, if any
    pub fn load_autosave(&self) -> Result<Option<Document>, DocumentError> {
        let path = self.autosave_path();
        if !path.exists() {
            return Ok(None);
        }
        read_document(&path).map(Some)
    }

    pub fn clear_autosave(&self) -> Result<(), DocumentError> {
        let path = self.autosave_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Write a document as pretty JSON
pub fn write_document(path: &Path, document: &Document) -> Result<(), DocumentError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, document.to_json_pretty()?)?;
    Ok(())
}

/// Read and validate a document file
pub fn read_document(path: &Path) -> Result<Document, DocumentError> {
    let content = std::fs::read_to_string(path)?;
    Document::from_json(&content)
}

/// Interval timer for periodic auto-save
#[derive(Debug, Clone)]
pub struct AutoSave {
    interval: Duration,
    last: Instant,
    enabled: bool,
}

impl AutoSave {
    pub fn new(interval: Duration, enabled: bool) -> Self {
        Self {
            interval,
            last: Instant::now(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a save should happen now
    pub fn due(&self, dirty: bool) -> bool {
        self.enabled && dirty && self.last.elapsed() >= self.interval
    }

    pub fn mark(&mut self) {
        self.last = Instant::now();
    }

    /// Time until the next check matters
    pub fn remaining(&self) -> Duration {
        self.interval.saturating_sub(self.last.elapsed())
    }
}
