use std::path::{Path, PathBuf};
use std::sync::Arc;

use fontdue::{Font, FontSettings};
use tracing::{debug, warn};

use super::GlyphMetrics;
use crate::error::{ReelError, Result};

/// Latin font used for the translation paragraph and watermark caption.
pub const LATIN_FONT_FILE: &str = "Fondamento-Regular.ttf";
pub const LATIN_FONT_FAMILY: &str = "Fondamento";

/// Chapter-name glyph font used by the watermark.
pub const SURA_NAMES_FONT_FILE: &str = "sura_names.ttf";
pub const SURA_NAMES_FONT_FAMILY: &str = "sura_names";

/// Advance widths from a parsed TrueType font at a fixed pixel size.
pub struct FontMetrics {
    font: Font,
    size: f32,
}

impl FontMetrics {
    pub fn from_bytes(bytes: &[u8], size: f32) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| ReelError::FontUnavailable(format!("Failed to parse font: {e}")))?;
        Ok(Self { font, size })
    }
}

impl GlyphMetrics for FontMetrics {
    fn measure(&self, text: &str) -> f32 {
        let mut width = 0.0;
        let mut prev: Option<char> = None;

        for c in text.chars() {
            if let Some(p) = prev {
                width += self.font.horizontal_kern(p, c, self.size).unwrap_or(0.0);
            }
            width += self.font.metrics(c, self.size).advance_width;
            prev = Some(c);
        }

        width
    }
}

/// Every character advances by the same amount. Used when a font file is
/// missing so that layout can still proceed.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvanceMetrics {
    pub advance: f32,
}

impl FixedAdvanceMetrics {
    pub fn for_size(size: f32) -> Self {
        Self {
            advance: size * 0.5,
        }
    }
}

impl GlyphMetrics for FixedAdvanceMetrics {
    fn measure(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.advance
    }
}

/// A font family as referenced from rendered artifacts. `data` is `None`
/// when the font file could not be read; renderers then fall back to
/// whatever the rasterizer resolves for the family name.
#[derive(Debug, Clone)]
pub struct FontFace {
    pub family: String,
    pub data: Option<Arc<[u8]>>,
}

/// A font face together with metrics for one pixel size.
#[derive(Clone)]
pub struct LoadedFont {
    pub face: FontFace,
    pub metrics: Arc<dyn GlyphMetrics + Send + Sync>,
}

/// Locates fonts under the configured font directory.
#[derive(Debug, Clone)]
pub struct FontBook {
    font_dir: PathBuf,
}

impl FontBook {
    pub fn new(font_dir: impl Into<PathBuf>) -> Self {
        Self {
            font_dir: font_dir.into(),
        }
    }

    /// Manuscript page fonts: one glyph set per mushaf page.
    pub fn page_font_path(&self, page: u32) -> PathBuf {
        self.font_dir.join(format!("QCF_P{page:03}.TTF"))
    }

    pub fn page_family(page: u32) -> String {
        format!("QuranFont_{page}")
    }

    /// Load the font for a mushaf page at `size` pixels.
    pub fn page_font(&self, page: u32, size: f32) -> Result<LoadedFont> {
        load(&self.page_font_path(page), &Self::page_family(page), size)
    }

    /// Like [`FontBook::page_font`], but a missing or broken font file is
    /// logged and replaced by fixed-advance metrics. Glyphs will render
    /// incorrectly in that case.
    pub fn page_font_or_fallback(&self, page: u32, size: f32) -> LoadedFont {
        self.page_font(page, size)
            .unwrap_or_else(|e| fallback(&Self::page_family(page), size, &e))
    }

    pub fn latin_font(&self, size: f32) -> LoadedFont {
        load(&self.font_dir.join(LATIN_FONT_FILE), LATIN_FONT_FAMILY, size)
            .unwrap_or_else(|e| fallback(LATIN_FONT_FAMILY, size, &e))
    }

    pub fn sura_names_font(&self, size: f32) -> LoadedFont {
        load(
            &self.font_dir.join(SURA_NAMES_FONT_FILE),
            SURA_NAMES_FONT_FAMILY,
            size,
        )
        .unwrap_or_else(|e| fallback(SURA_NAMES_FONT_FAMILY, size, &e))
    }
}

fn load(path: &Path, family: &str, size: f32) -> Result<LoadedFont> {
    if !path.exists() {
        return Err(ReelError::FontUnavailable(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    let metrics = FontMetrics::from_bytes(&bytes, size).map_err(|_| {
        ReelError::FontUnavailable(format!("{} is not a readable font", path.display()))
    })?;
    debug!("Loaded font {} as '{}'", path.display(), family);

    Ok(LoadedFont {
        face: FontFace {
            family: family.to_string(),
            data: Some(Arc::from(bytes)),
        },
        metrics: Arc::new(metrics),
    })
}

fn fallback(family: &str, size: f32, err: &ReelError) -> LoadedFont {
    warn!("{err}; rendering '{family}' without its font file");
    LoadedFont {
        face: FontFace {
            family: family.to_string(),
            data: None,
        },
        metrics: Arc::new(FixedAdvanceMetrics::for_size(size)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_font_path() {
        let book = FontBook::new("/data/fonts");
        assert_eq!(
            book.page_font_path(7),
            PathBuf::from("/data/fonts/QCF_P007.TTF")
        );
        assert_eq!(
            book.page_font_path(604),
            PathBuf::from("/data/fonts/QCF_P604.TTF")
        );
        assert_eq!(FontBook::page_family(12), "QuranFont_12");
    }

    #[test]
    fn test_missing_page_font_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let book = FontBook::new(dir.path());
        match book.page_font(1, 90.0) {
            Err(ReelError::FontUnavailable(path)) => assert!(path.contains("QCF_P001.TTF")),
            Err(other) => panic!("Expected FontUnavailable, got: {other}"),
            Ok(_) => panic!("Expected error but got Ok"),
        }
    }

    #[test]
    fn test_missing_font_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let book = FontBook::new(dir.path());
        let font = book.page_font_or_fallback(3, 90.0);
        assert_eq!(font.face.family, "QuranFont_3");
        assert!(font.face.data.is_none());
        assert_eq!(font.metrics.measure("abc"), 135.0);
    }

    #[test]
    fn test_corrupt_font_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LATIN_FONT_FILE), b"not a font").unwrap();
        let book = FontBook::new(dir.path());
        let font = book.latin_font(40.0);
        assert!(font.face.data.is_none());
    }

    #[test]
    fn test_fixed_advance_metrics() {
        let metrics = FixedAdvanceMetrics { advance: 10.0 };
        assert_eq!(metrics.measure(""), 0.0);
        assert_eq!(metrics.measure("ab c"), 40.0);
    }
}
