use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;
use quick_xml::escape::escape;
use tracing::debug;

use super::{Artifact, ImageRenderer, LineBand, Paragraph, Watermark};
use crate::config::{Color, RenderConfig};
use crate::error::Result;
use crate::layout::FontFace;

pub const WATERMARK_GLYPH_SIZE: f32 = 100.0;
pub const WATERMARK_CAPTION_SIZE: f32 = 36.0;

/// Writes each artifact as a full-canvas SVG with its fonts embedded.
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    output_dir: PathBuf,
    config: RenderConfig,
}

impl SvgRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, config: RenderConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            config,
        }
    }

    async fn write(&self, name: &str, svg: String) -> Result<Artifact> {
        let path = self.output_dir.join(format!("{name}.svg"));
        tokio::fs::write(&path, svg).await?;
        debug!("Rendered {}", path.display());
        Ok(Artifact::new(path))
    }
}

#[async_trait]
impl ImageRenderer for SvgRenderer {
    async fn render_line(&self, band: &LineBand<'_>) -> Result<Artifact> {
        self.write(&band.name, line_band_svg(&self.config, band))
            .await
    }

    async fn render_paragraph(&self, paragraph: &Paragraph<'_>) -> Result<Artifact> {
        self.write(&paragraph.name, paragraph_svg(&self.config, paragraph))
            .await
    }

    async fn render_watermark(&self, watermark: &Watermark<'_>) -> Result<Artifact> {
        self.write("watermark", watermark_svg(&self.config, watermark))
            .await
    }

    fn name(&self) -> &'static str {
        "SVG"
    }
}

/// Private-use glyph naming a sura in the chapter-name font: the sura
/// number is read as hex digits after `E`, followed by the shared `U+E000`
/// suffix glyph.
pub fn sura_name_glyphs(sura: u32) -> String {
    let code = u32::from_str_radix(&format!("E{sura:03}"), 16).unwrap_or(0xE000);
    [code, 0xE000]
        .into_iter()
        .filter_map(char::from_u32)
        .collect()
}

pub fn line_band_svg(config: &RenderConfig, band: &LineBand<'_>) -> String {
    let band_y = (config.height as f32 - config.text_height as f32) / 2.0;
    let mut svg = open_svg(config, &[band.font]);
    svg.push_str(&format!(
        "<rect x=\"0\" y=\"{band_y}\" width=\"{}\" height=\"{}\" {}/>\n",
        config.width,
        config.text_height,
        fill(config.text_bg_color)
    ));
    svg.push_str(&text_element(
        config.width as f32 / 2.0,
        config.height as f32 / 2.0,
        &band.font.family,
        config.font_size,
        config.text_fg_color,
        band.text,
    ));
    svg.push_str("</svg>\n");
    svg
}

pub fn paragraph_svg(config: &RenderConfig, paragraph: &Paragraph<'_>) -> String {
    let line_height = config.translation_line_height;
    let count = paragraph.lines.len().max(1) as f32;
    let start_y = config.height as f32 / 2.0 + 360.0 - (count - 1.0) * line_height / 2.0;

    let mut svg = open_svg(config, &[paragraph.font]);
    for (i, line) in paragraph.lines.iter().enumerate() {
        svg.push_str(&text_element(
            config.width as f32 / 2.0,
            start_y + i as f32 * line_height,
            &paragraph.font.family,
            config.translation_font_size,
            config.text_fg_color,
            line,
        ));
    }
    svg.push_str("</svg>\n");
    svg
}

pub fn watermark_svg(config: &RenderConfig, watermark: &Watermark<'_>) -> String {
    let center_x = config.width as f32 / 2.0;
    let glyph_y = config.height as f32 / 5.0;

    let mut svg = open_svg(config, &[watermark.glyph_font, watermark.caption_font]);
    svg.push_str(&text_element(
        center_x - 14.0,
        glyph_y,
        &watermark.glyph_font.family,
        WATERMARK_GLYPH_SIZE,
        config.watermark_color,
        &sura_name_glyphs(watermark.sura),
    ));
    svg.push_str(&text_element(
        center_x,
        glyph_y + 120.0,
        &watermark.caption_font.family,
        WATERMARK_CAPTION_SIZE,
        config.watermark_color,
        &watermark.caption,
    ));
    svg.push_str("</svg>\n");
    svg
}

fn open_svg(config: &RenderConfig, fonts: &[&FontFace]) -> String {
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
        w = config.width,
        h = config.height
    );

    let faces: Vec<String> = fonts
        .iter()
        .filter_map(|face| {
            face.data.as_ref().map(|data| {
                format!(
                    "@font-face {{ font-family: '{}'; src: url(data:font/ttf;base64,{}); }}",
                    face.family,
                    base64::engine::general_purpose::STANDARD.encode(data)
                )
            })
        })
        .collect();
    if !faces.is_empty() {
        svg.push_str(&format!("<defs><style>{}</style></defs>\n", faces.join(" ")));
    }

    svg
}

fn text_element(x: f32, y: f32, family: &str, size: f32, color: Color, text: &str) -> String {
    format!(
        "<text x=\"{x}\" y=\"{y}\" font-family=\"{}\" font-size=\"{size}\" text-anchor=\"middle\" dominant-baseline=\"middle\" xml:space=\"preserve\" {}>{}</text>\n",
        escape(family),
        fill(color),
        escape(text)
    )
}

fn fill(color: Color) -> String {
    format!("fill=\"{}\" fill-opacity=\"{}\"", color.rgb_string(), color.a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn face(data: Option<&[u8]>) -> FontFace {
        FontFace {
            family: "QuranFont_1".to_string(),
            data: data.map(Arc::from),
        }
    }

    #[test]
    fn test_sura_name_glyphs() {
        assert_eq!(sura_name_glyphs(1), "\u{E001}\u{E000}");
        assert_eq!(sura_name_glyphs(114), "\u{E114}\u{E000}");
    }

    #[test]
    fn test_line_band_layout() {
        let config = RenderConfig::default();
        let font = face(None);
        let svg = line_band_svg(
            &config,
            &LineBand {
                name: "line".to_string(),
                text: "a  b",
                font: &font,
            },
        );

        assert!(svg.contains("<rect x=\"0\" y=\"885\" width=\"1080\" height=\"150\""));
        assert!(svg.contains("fill=\"rgb(255, 255, 255)\" fill-opacity=\"0.75\""));
        assert!(svg.contains("x=\"540\" y=\"960\""));
        assert!(svg.contains(">a  b</text>"));
        assert!(!svg.contains("@font-face"));
    }

    #[test]
    fn test_embeds_font_data() {
        let config = RenderConfig::default();
        let font = face(Some(&b"font"[..]));
        let svg = line_band_svg(
            &config,
            &LineBand {
                name: "line".to_string(),
                text: "x",
                font: &font,
            },
        );
        assert!(svg.contains("font-family: 'QuranFont_1'; src: url(data:font/ttf;base64,Zm9udA==)"));
    }

    #[test]
    fn test_paragraph_is_vertically_centered() {
        let config = RenderConfig::default();
        let font = face(None);
        let lines = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let svg = paragraph_svg(
            &config,
            &Paragraph {
                name: "t".to_string(),
                lines: &lines,
                font: &font,
            },
        );
        // 960 + 360 - 40 = 1280
        assert!(svg.contains("y=\"1280\""));
        assert!(svg.contains("y=\"1320\""));
        assert!(svg.contains("y=\"1360\""));
        assert_eq!(svg.matches("<text").count(), 3);
    }

    #[test]
    fn test_watermark_content() {
        let config = RenderConfig::default();
        let glyphs = face(None);
        let caption = face(None);
        let svg = watermark_svg(
            &config,
            &Watermark {
                sura: 2,
                caption: "Al-Baqarah  255".to_string(),
                glyph_font: &glyphs,
                caption_font: &caption,
            },
        );
        assert!(svg.contains("x=\"526\" y=\"384\""));
        assert!(svg.contains("\u{E002}\u{E000}"));
        assert!(svg.contains("x=\"540\" y=\"504\""));
        assert!(svg.contains("Al-Baqarah  255"));
    }

    #[test]
    fn test_text_is_escaped() {
        let config = RenderConfig::default();
        let font = face(None);
        let svg = line_band_svg(
            &config,
            &LineBand {
                name: "line".to_string(),
                text: "a < b & \"c\"",
                font: &font,
            },
        );
        assert!(svg.contains(">a &lt; b &amp; &quot;c&quot;</text>"));
    }

    #[tokio::test]
    async fn test_renderer_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgRenderer::new(dir.path(), RenderConfig::default());
        let font = face(None);
        let artifact = renderer
            .render_line(&LineBand {
                name: "sura_1_ayah_1_from_0_to_100".to_string(),
                text: "abc",
                font: &font,
            })
            .await
            .unwrap();

        assert_eq!(
            artifact.path(),
            dir.path().join("sura_1_ayah_1_from_0_to_100.svg")
        );
        let contents = std::fs::read_to_string(artifact.path()).unwrap();
        assert!(contents.starts_with("<svg"));
    }
}
