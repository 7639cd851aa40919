use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ReelError, Result};

/// Static per-sura lookups: verse translations and chapter names.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    translations: HashMap<u32, HashMap<u32, String>>,
    chapters: HashMap<u32, String>,
}

impl Catalog {
    pub fn new(
        translations: HashMap<u32, HashMap<u32, String>>,
        chapters: HashMap<u32, String>,
    ) -> Self {
        Self {
            translations,
            chapters,
        }
    }

    /// Load `translation.json` (`{"sura": {"ayah": "text"}}`) and
    /// `chapters.json` (`{"sura": "name"}`).
    pub fn load(translation_path: &Path, chapters_path: &Path) -> Result<Self> {
        let translations = read_json(translation_path)?;
        let chapters = read_json(chapters_path)?;
        let catalog = Self::new(translations, chapters);
        debug!(
            "Loaded translations for {} suras and {} chapter names",
            catalog.translations.len(),
            catalog.chapters.len()
        );
        Ok(catalog)
    }

    pub fn translation(&self, sura: u32, ayah: u32) -> Option<&str> {
        self.translations
            .get(&sura)
            .and_then(|verses| verses.get(&ayah))
            .map(String::as_str)
    }

    /// Translation text, or an empty paragraph when none is available.
    pub fn translation_or_blank(&self, sura: u32, ayah: u32) -> String {
        match self.translation(sura, ayah) {
            Some(text) => text.to_string(),
            None => {
                warn!("No translation for {sura}:{ayah}, rendering an empty caption");
                String::new()
            }
        }
    }

    pub fn chapter_name(&self, sura: u32) -> String {
        match self.chapters.get(&sura) {
            Some(name) => name.clone(),
            None => {
                warn!("No chapter name for sura {sura}");
                format!("Sura {sura}")
            }
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(ReelError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
