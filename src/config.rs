use crate::error::{ReelError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

/// An sRGB color with alpha, written in config as `rgba(r, g, b, a)`,
/// `rgb(r, g, b)` or `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Color = Color::rgba(255, 255, 255, 1.0);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 1.0);

    /// The `rgb(..)` part, for SVG `fill` attributes.
    pub fn rgb_string(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

fn css_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*([0-9]*\.?[0-9]+)\s*)?\)$",
        )
        .expect("Invalid regex")
    })
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(format!("Unknown color: {s}. Use #rrggbb"));
            }
            let channel = |i: usize| {
                u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("Bad color {s}: {e}"))
            };
            return Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, 1.0));
        }

        let caps = css_color_regex()
            .captures(s)
            .ok_or_else(|| format!("Unknown color: {s}. Use rgba(r, g, b, a) or #rrggbb"))?;
        let channel = |i: usize| {
            caps[i]
                .parse::<u8>()
                .map_err(|e| format!("Bad color channel in {s}: {e}"))
        };
        let a = match caps.get(4) {
            Some(m) => m
                .as_str()
                .parse::<f32>()
                .map_err(|e| format!("Bad alpha in {s}: {e}"))?,
            None => 1.0,
        };
        if !(0.0..=1.0).contains(&a) {
            return Err(format!("Alpha out of range in {s}"));
        }

        Ok(Color::rgba(channel(1)?, channel(2)?, channel(3)?, a))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Canvas, typography and layout constants for rendered artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Verse text size in pixels.
    pub font_size: f32,
    pub text_fg_color: Color,
    pub text_bg_color: Color,
    /// Height of the background band behind each verse line.
    pub text_height: u32,
    pub max_text_width: f32,
    /// Glyphs narrower than this attach to the preceding glyph and end lines.
    pub small_glyph_max_size: f32,
    pub translation_font_size: f32,
    pub translation_line_height: f32,
    pub translation_max_width: f32,
    pub watermark_color: Color,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            font_size: 90.0,
            text_fg_color: Color::BLACK,
            text_bg_color: Color::rgba(255, 255, 255, 0.75),
            text_height: 150,
            max_text_width: 1000.0,
            small_glyph_max_size: 5.0,
            translation_font_size: 40.0,
            translation_line_height: 40.0,
            translation_max_width: 1000.0,
            watermark_color: Color::WHITE,
        }
    }
}

/// Encoder settings handed to the compositing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    pub video_codec: String,
    pub crf: u32,
    pub preset: String,
    /// Crossfade duration in seconds for each overlay.
    pub fade_secs: f64,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 18,
            preset: "slow".to_string(),
            fade_secs: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the text database, fonts, audio and translation files.
    pub data_dir: PathBuf,
    pub concurrency: usize,
    pub render: RenderConfig,
    pub encode: EncodeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            concurrency: 4,
            render: RenderConfig::default(),
            encode: EncodeConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str::<Config>(&contents).map_err(|e| {
                    ReelError::Config(format!("{}: {e}", config_path.display()))
                })?;
            }
        }

        if let Ok(dir) = std::env::var("AYAH_REEL_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(concurrency) = std::env::var("AYAH_REEL_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                config.concurrency = c;
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ReelError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        if self.render.width == 0 || self.render.height == 0 {
            return Err(ReelError::Config(format!(
                "Canvas size must be positive, got {}x{}",
                self.render.width, self.render.height
            )));
        }

        if self.render.font_size <= 0.0 || self.render.max_text_width <= 0.0 {
            return Err(ReelError::Config(
                "Font size and max text width must be positive".to_string(),
            ));
        }

        if self.encode.fade_secs < 0.0 {
            return Err(ReelError::Config(
                "Fade duration cannot be negative".to_string(),
            ));
        }

        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("text.sqlite3.db")
    }

    pub fn font_dir(&self) -> PathBuf {
        self.data_dir.join("fonts")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir.join("audio")
    }

    pub fn translation_path(&self) -> PathBuf {
        self.data_dir.join("translation.json")
    }

    pub fn chapters_path(&self) -> PathBuf {
        self.data_dir.join("chapters.json")
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ayah-reel").join("config.toml"))
    }
}
