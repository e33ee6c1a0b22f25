//! JSON snapshots of games and levels, and the per-level scrape cache.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::game::Game;
use crate::level::Level;
use crate::{Error, Result};

pub(crate) fn save<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|source| Error::Snapshot {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, json)?;
    Ok(())
}

pub(crate) fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|source| Error::Snapshot {
        path: path.to_path_buf(),
        source,
    })
}

impl Game {
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        save(self, path)?;
        debug!("Saved game {} to {}", self.game_id(), path.display());
        Ok(())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        load(path.as_ref())
    }
}

impl Level {
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        save(self, path.as_ref())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        load(path.as_ref())
    }
}

/// One snapshot file per scraped level, so an interrupted scrape can resume.
///
/// Paths come from a template with a `{lvl_id}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelCache {
    template: String,
}

impl LevelCache {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Cache next to a game snapshot: `games/spring.json` caches level 3 in
    /// `games/spring_temp_lvl3.json`.
    pub fn for_destination(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = match path.extension() {
            Some(ext) => format!("{stem}_temp_lvl{{lvl_id}}.{}", ext.to_string_lossy()),
            None => format!("{stem}_temp_lvl{{lvl_id}}"),
        };
        let full = match path.parent().filter(|d| !d.as_os_str().is_empty()) {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        };
        Self::new(full.to_string_lossy())
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn path(&self, level_id: u32) -> PathBuf {
        PathBuf::from(self.template.replace("{lvl_id}", &level_id.to_string()))
    }

    /// The cached level, or `None` if it was never stored.
    pub fn load(&self, level_id: u32) -> Result<Option<Level>> {
        match Level::from_file(self.path(level_id)) {
            Ok(level) => Ok(Some(level)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn store(&self, level: &Level) -> Result<()> {
        let path = self.path(level.level_id);
        level.to_file(&path)?;
        debug!("Cached level {} in {}", level.level_id, path.display());
        Ok(())
    }
}
