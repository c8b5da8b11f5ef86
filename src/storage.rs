//! Durable session artifacts: model checkpoints and the per-episode text log.

use std::fs;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::model::QModel;

pub const MAIN_NAMESPACE: &str = "main";
pub const TARGET_NAMESPACE: &str = "target";

/// Checkpoint directory with one independent file per namespace: the online
/// model lives under [MAIN_NAMESPACE], the stabilized copy under
/// [TARGET_NAMESPACE]. Either one is reloadable on its own to resume training.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(
        &self,
        namespace: &str,
    ) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }

    pub fn save<M: QModel>(
        &self,
        namespace: &str,
        model: &M,
    ) -> Result<(), PersistenceError> {
        model.save(&self.path(namespace))
    }

    /// Loads the namespace into `model` if a checkpoint exists.
    /// Returns whether one was found.
    pub fn load<M: QModel>(
        &self,
        namespace: &str,
        model: &mut M,
    ) -> Result<bool, PersistenceError> {
        let path = self.path(namespace);
        if !path.exists() {
            return Ok(false);
        }
        model.load(&path)?;
        Ok(true)
    }
}

/// Append-only training log with one line per finished episode.
pub struct EpisodeLog {
    file: File,
}

impl EpisodeLog {
    /// Opens (creating if necessary) the log file and appends the session
    /// separator line.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "----------------------------------------")?;
        Ok(Self { file })
    }

    pub fn append(
        &mut self,
        episode: usize,
        epsilon: f64,
        total_reward: f32,
    ) -> Result<(), PersistenceError> {
        writeln!(self.file, "Episode: {episode}, Epsilon: {epsilon}, Total Reward: {total_reward}")?;
        Ok(())
    }
}
