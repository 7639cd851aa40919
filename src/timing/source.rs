use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::VerseTiming;
use crate::error::{ReelError, Result};

/// Verse timings for a whole sura as recited by one reciter.
#[derive(Debug, Clone, Default)]
pub struct SuraTimings {
    pub verses: Vec<VerseTiming>,
}

impl SuraTimings {
    /// Timing for a 1-based ayah number.
    pub fn verse(&self, ayah: u32) -> Option<&VerseTiming> {
        (ayah as usize)
            .checked_sub(1)
            .and_then(|i| self.verses.get(i))
    }
}

/// Source of recitation audio and its per-word timings.
pub trait AudioTimingSource: Send + Sync {
    fn load_verse_timings(&self, reciter: u32, sura: u32) -> Result<SuraTimings>;
    fn audio_path(&self, reciter: u32, sura: u32) -> PathBuf;
}

#[derive(Deserialize)]
struct TimingFile {
    audio_files: Vec<AudioFile>,
}

#[derive(Deserialize)]
struct AudioFile {
    verse_timings: Vec<VerseTiming>,
}

/// Reads `{audio_dir}/{reciter}/{sura}.json` next to `{sura}.mp3`.
#[derive(Debug, Clone)]
pub struct JsonTimingSource {
    audio_dir: PathBuf,
}

impl JsonTimingSource {
    pub fn new(audio_dir: impl Into<PathBuf>) -> Self {
        Self {
            audio_dir: audio_dir.into(),
        }
    }

    pub fn timing_path(&self, reciter: u32, sura: u32) -> PathBuf {
        self.audio_dir
            .join(reciter.to_string())
            .join(format!("{sura}.json"))
    }

    fn parse(path: &Path) -> Result<SuraTimings> {
        let contents = std::fs::read_to_string(path)?;
        let file: TimingFile = serde_json::from_str(&contents)?;
        let verses = file
            .audio_files
            .into_iter()
            .next()
            .map(|f| f.verse_timings)
            .unwrap_or_default();
        Ok(SuraTimings { verses })
    }
}

impl AudioTimingSource for JsonTimingSource {
    fn load_verse_timings(&self, reciter: u32, sura: u32) -> Result<SuraTimings> {
        let path = self.timing_path(reciter, sura);
        if !path.exists() {
            return Err(ReelError::FileNotFound(path.display().to_string()));
        }

        let timings = Self::parse(&path)?;
        debug!(
            "Loaded timings for {} verses from {}",
            timings.verses.len(),
            path.display()
        );
        Ok(timings)
    }

    fn audio_path(&self, reciter: u32, sura: u32) -> PathBuf {
        self.audio_dir
            .join(reciter.to_string())
            .join(format!("{sura}.mp3"))
    }
}
