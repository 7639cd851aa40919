pub mod svg;

pub use svg::SvgRenderer;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::layout::FontFace;

/// A rendered file on disk, exclusively owned by whoever holds it.
///
/// The file is deleted when the artifact is dropped, so an aborted run
/// does not leak temporary images. Call [`Artifact::release`] to delete it
/// explicitly and observe the result.
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
    released: bool,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            debug!("Released {}", self.path.display());
        }
        Ok(())
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        if self.released || !self.path.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove {}: {e}", self.path.display());
        }
    }
}

/// One verse line over the padded background band.
#[derive(Debug, Clone)]
pub struct LineBand<'a> {
    /// File stem for the artifact, unique within a run.
    pub name: String,
    pub text: &'a str,
    pub font: &'a FontFace,
}

/// A translation paragraph, already wrapped into lines.
#[derive(Debug, Clone)]
pub struct Paragraph<'a> {
    pub name: String,
    pub lines: &'a [String],
    pub font: &'a FontFace,
}

/// The chapter-name overlay shown for the whole video.
#[derive(Debug, Clone)]
pub struct Watermark<'a> {
    pub sura: u32,
    /// Latin caption, e.g. `"Al-Fatihah  1-7"`.
    pub caption: String,
    pub glyph_font: &'a FontFace,
    pub caption_font: &'a FontFace,
}

#[async_trait]
pub trait ImageRenderer: Send + Sync {
    async fn render_line(&self, band: &LineBand<'_>) -> Result<Artifact>;
    async fn render_paragraph(&self, paragraph: &Paragraph<'_>) -> Result<Artifact>;
    async fn render_watermark(&self, watermark: &Watermark<'_>) -> Result<Artifact>;
    fn name(&self) -> &'static str;
}
