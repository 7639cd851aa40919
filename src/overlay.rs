use crate::config::RenderConfig;
use crate::error::{ReelError, Result};
use crate::layout::{layout, wrap_paragraph, FontBook, LoadedFont};
use crate::render::{Artifact, ImageRenderer, LineBand, Paragraph};
use crate::timing::{merge_segments, verse_window_for, TimeWindow, VerseTiming};
use crate::verse::VerseText;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// One laid-out line of verse text.
    Line,
    /// The translation paragraph for a whole verse.
    Translation,
}

/// A rendered overlay and the absolute window during which it is shown.
#[derive(Debug)]
pub struct Chunk {
    pub artifact: Artifact,
    pub window: TimeWindow,
    pub kind: ChunkKind,
}

impl Chunk {
    pub fn time_start(&self) -> u64 {
        self.window.start_ms
    }

    pub fn time_end(&self) -> u64 {
        self.window.end_ms
    }

    pub fn is_translation(&self) -> bool {
        self.kind == ChunkKind::Translation
    }

    pub fn release(self) -> Result<()> {
        self.artifact.release()
    }
}

/// Everything needed to build one verse's chunks, gathered before rendering.
#[derive(Debug, Clone)]
pub struct VerseInput {
    pub verse: VerseText,
    pub translation: String,
    pub timing: VerseTiming,
}

/// Turns one verse into its timed line chunks plus a translation chunk.
#[derive(Clone)]
pub struct OverlayChunkBuilder {
    config: RenderConfig,
    fonts: FontBook,
    translation_font: LoadedFont,
}

impl OverlayChunkBuilder {
    pub fn new(config: RenderConfig, fonts: FontBook) -> Self {
        let translation_font = fonts.latin_font(config.translation_font_size);
        Self {
            config,
            fonts,
            translation_font,
        }
    }

    /// Use a specific font for translation paragraphs.
    pub fn with_translation_font(mut self, font: LoadedFont) -> Self {
        self.translation_font = font;
        self
    }

    pub async fn build(
        &self,
        input: &VerseInput,
        renderer: &dyn ImageRenderer,
    ) -> Result<Vec<Chunk>> {
        let font = self
            .fonts
            .page_font_or_fallback(input.verse.page, self.config.font_size);
        self.build_with_font(input, &font, renderer).await
    }

    /// Build with an already loaded page font.
    pub async fn build_with_font(
        &self,
        input: &VerseInput,
        font: &LoadedFont,
        renderer: &dyn ImageRenderer,
    ) -> Result<Vec<Chunk>> {
        let VerseText { sura, ayah, .. } = input.verse;

        let lines = layout(
            &input.verse.text,
            font.metrics.as_ref(),
            self.config.max_text_width,
            self.config.small_glyph_max_size,
        );
        let merged = merge_segments(&input.timing.segments);
        debug!(
            "Verse {}:{}: {} lines, {} merged segments from {} raw",
            sura,
            ayah,
            lines.len(),
            merged.len(),
            input.timing.segments.len()
        );

        let mut chunks = Vec::with_capacity(lines.len() + 1);

        for (index, line) in lines.iter().enumerate() {
            let window = verse_window_for(line, &merged, sura, ayah)?;
            let artifact = renderer
                .render_line(&LineBand {
                    name: format!(
                        "sura_{sura}_ayah_{ayah}_line_{index}_from_{}_to_{}",
                        window.start_ms, window.end_ms
                    ),
                    text: &line.text,
                    font: &font.face,
                })
                .await?;

            chunks.push(Chunk {
                artifact,
                window,
                kind: ChunkKind::Line,
            });
        }

        let paragraph = wrap_paragraph(
            &input.translation,
            self.translation_font.metrics.as_ref(),
            self.config.translation_max_width,
        );
        let artifact = renderer
            .render_paragraph(&Paragraph {
                name: format!("sura_{sura}_ayah_{ayah}_translation"),
                lines: &paragraph,
                font: &self.translation_font.face,
            })
            .await?;

        chunks.push(Chunk {
            artifact,
            window: TimeWindow::new(input.timing.timestamp_from, input.timing.timestamp_to),
            kind: ChunkKind::Translation,
        });

        Ok(chunks)
    }
}

/// Build chunks for consecutive verses with at most `concurrency` verses in
/// flight, concatenated in verse order. The first failure aborts the range;
/// chunks already rendered are dropped along with their files.
pub async fn build_range(
    builder: &OverlayChunkBuilder,
    renderer: &dyn ImageRenderer,
    verses: &[VerseInput],
    concurrency: usize,
    show_progress: bool,
) -> Result<Vec<Chunk>> {
    if verses.is_empty() {
        return Ok(Vec::new());
    }

    info!(
        "Rendering {} verses with {} concurrent workers using {}",
        verses.len(),
        concurrency,
        renderer.name()
    );

    let progress_bar = if show_progress {
        let pb = ProgressBar::new(verses.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} verses")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut futures = FuturesUnordered::new();

    for (index, input) in verses.iter().enumerate() {
        let sem = semaphore.clone();
        let pb = progress_bar.clone();

        futures.push(async move {
            let result = match sem.acquire().await {
                Ok(_permit) => builder.build(input, renderer).await,
                Err(e) => Err(ReelError::ExternalEngine(format!(
                    "Render queue closed: {e}"
                ))),
            };
            if let Some(ref pb) = pb {
                pb.inc(1);
            }
            (index, result)
        });
    }

    let mut results: Vec<(usize, Vec<Chunk>)> = Vec::with_capacity(verses.len());
    while let Some((index, result)) = futures.next().await {
        match result {
            Ok(chunks) => results.push((index, chunks)),
            Err(e) => {
                if let Some(pb) = progress_bar {
                    pb.abandon_with_message("Rendering failed");
                }
                let input = &verses[index];
                return Err(match e {
                    ReelError::ExternalEngine(msg) => ReelError::ExternalEngine(format!(
                        "verse {}:{}: {msg}",
                        input.verse.sura, input.verse.ayah
                    )),
                    other => other,
                });
            }
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Rendering complete");
    }

    results.sort_by_key(|(index, _)| *index);
    let chunks: Vec<Chunk> = results.into_iter().flat_map(|(_, chunks)| chunks).collect();
    info!("Rendered {} chunks", chunks.len());

    Ok(chunks)
}
