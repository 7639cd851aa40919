use crate::compose::{
    check_ffmpeg, layer_order, trim_audio, AudioSource, CompositionGraphBuilder, FfmpegEngine,
    VideoCompositingEngine,
};
use crate::config::Config;
use crate::error::{ReelError, Result};
use crate::layout::FontBook;
use crate::overlay::{build_range, OverlayChunkBuilder, VerseInput};
use crate::range::AyahRange;
use crate::render::svg::{WATERMARK_CAPTION_SIZE, WATERMARK_GLYPH_SIZE};
use crate::render::{ImageRenderer, SvgRenderer, Watermark};
use crate::timing::source::{AudioTimingSource, JsonTimingSource};
use crate::verse::catalog::Catalog;
use crate::verse::{SqliteVerseRepository, VerseDataRepository};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What to render: a verse range by one reciter over one background clip.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub reciter: u32,
    pub range: AyahRange,
    pub background: PathBuf,
    pub output: PathBuf,
}

/// Runtime options for the video generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of verses rendered concurrently.
    pub concurrency: usize,
    /// Show progress bars.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            show_progress: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.concurrency,
            ..Self::default()
        }
    }
}

/// Statistics from one video generation run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_time: Duration,
    /// Time spent rendering chunk and watermark artifacts.
    pub render_time: Duration,
    pub encode_time: Duration,
    pub verses: usize,
    pub chunks: usize,
    pub video_duration: Duration,
    /// Whether the recitation was muxed in or replaced by silence.
    pub with_audio: bool,
    pub engine: String,
}

#[derive(Debug)]
pub struct PipelineResult {
    pub output_path: PathBuf,
    pub stats: PipelineStats,
}

/// The external collaborators a run depends on.
pub struct Collaborators<'a> {
    pub verses: &'a dyn VerseDataRepository,
    pub timings: &'a dyn AudioTimingSource,
    pub catalog: &'a Catalog,
    pub engine: &'a dyn VideoCompositingEngine,
}

/// Generate a video with the default data sources under `config.data_dir`
/// and FFmpeg as the compositing engine.
pub async fn generate_video(
    request: &VideoRequest,
    config: &Config,
    pipeline_config: PipelineConfig,
) -> Result<PipelineResult> {
    check_ffmpeg().map_err(|_| {
        ReelError::ExternalEngine(
            "FFmpeg not found. Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux)".to_string()
        )
    })?;

    let verses = SqliteVerseRepository::open(&config.db_path())?;
    let timings = JsonTimingSource::new(config.audio_dir());
    let catalog = Catalog::load(&config.translation_path(), &config.chapters_path())?;
    let engine = FfmpegEngine;

    let collaborators = Collaborators {
        verses: &verses,
        timings: &timings,
        catalog: &catalog,
        engine: &engine,
    };
    generate_video_with(request, config, pipeline_config, &collaborators).await
}

/// Gather verse data for every ayah in the range, in order.
pub fn gather_verses(
    reciter: u32,
    range: &AyahRange,
    collaborators: &Collaborators<'_>,
) -> Result<Vec<VerseInput>> {
    let sura_timings = collaborators
        .timings
        .load_verse_timings(reciter, range.sura)?;

    range
        .ayahs()
        .map(|ayah| {
            let verse = collaborators.verses.verse_text(range.sura, ayah)?;
            let timing = sura_timings.verse(ayah).cloned().ok_or(
                ReelError::TimingDataMissing {
                    sura: range.sura,
                    ayah,
                },
            )?;
            Ok(VerseInput {
                verse,
                translation: collaborators.catalog.translation_or_blank(range.sura, ayah),
                timing,
            })
        })
        .collect()
}

fn spinner(show: bool, message: &str) -> Option<ProgressBar> {
    show.then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    })
}

/// Generate a video using the given collaborators.
///
/// Stages:
/// 1. Look up verse text, timings and translations
/// 2. Render line and translation chunks plus the watermark
/// 3. Trim the recitation to the rendered span
/// 4. Build the composition graph and encode
///
/// All intermediate files live in a per-run temp directory. On failure they
/// are removed as the artifacts and directory are dropped.
pub async fn generate_video_with(
    request: &VideoRequest,
    config: &Config,
    pipeline_config: PipelineConfig,
    collaborators: &Collaborators<'_>,
) -> Result<PipelineResult> {
    let start_time = Instant::now();
    let range = request.range;

    if !request.background.exists() {
        return Err(ReelError::FileNotFound(
            request.background.display().to_string(),
        ));
    }

    let temp_dir = tempfile::Builder::new().prefix("ayah-reel-").tempdir()?;
    debug!("Using temp directory: {:?}", temp_dir.path());

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 1: Verse data
    // ═══════════════════════════════════════════════════════════════════════
    info!("Stage 1/4: Loading verses {}", range);
    let inputs = gather_verses(request.reciter, &range, collaborators)?;

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 2: Rendering
    // ═══════════════════════════════════════════════════════════════════════
    info!(
        "Stage 2/4: Rendering {} verses (concurrency: {})",
        inputs.len(),
        pipeline_config.concurrency
    );
    let render_start = Instant::now();

    let fonts = FontBook::new(config.font_dir());
    let renderer = SvgRenderer::new(temp_dir.path(), config.render.clone());
    let builder = OverlayChunkBuilder::new(config.render.clone(), fonts.clone());

    let chunks = build_range(
        &builder,
        &renderer,
        &inputs,
        pipeline_config.concurrency,
        pipeline_config.show_progress,
    )
    .await?;

    let glyph_font = fonts.sura_names_font(WATERMARK_GLYPH_SIZE);
    let caption_font = fonts.latin_font(WATERMARK_CAPTION_SIZE);
    let watermark = renderer
        .render_watermark(&Watermark {
            sura: range.sura,
            caption: format!(
                "{}  {}",
                collaborators.catalog.chapter_name(range.sura),
                range.label()
            ),
            glyph_font: &glyph_font.face,
            caption_font: &caption_font.face,
        })
        .await?;

    let render_time = render_start.elapsed();
    info!(
        "Rendered {} chunks in {:.2}s",
        chunks.len(),
        render_time.as_secs_f64()
    );

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 3: Audio
    // ═══════════════════════════════════════════════════════════════════════
    let ordered = layer_order(&chunks);
    let (span_start, span_end) = match (ordered.first(), ordered.last()) {
        (Some(first), Some(last)) => (first.time_start(), last.time_end()),
        _ => {
            return Err(ReelError::CompositionBuild(
                "No chunks were rendered".to_string(),
            ))
        }
    };

    let source_audio = collaborators.timings.audio_path(request.reciter, range.sura);
    let audio = if source_audio.exists() {
        info!("Stage 3/4: Trimming audio to {}ms..{}ms", span_start, span_end);
        let trimmed = trimmed_audio_path(temp_dir.path(), &source_audio);
        trim_audio(&source_audio, &trimmed, span_start, span_end).await?;
        AudioSource::File(trimmed)
    } else {
        warn!(
            "Stage 3/4: No audio at {}, encoding with silence",
            source_audio.display()
        );
        AudioSource::Silence
    };

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 4: Composition
    // ═══════════════════════════════════════════════════════════════════════
    info!("Stage 4/4: Encoding with {}", collaborators.engine.name());
    let graph = CompositionGraphBuilder::new(&config.render, &config.encode).build(
        &chunks,
        &request.background,
        &watermark,
        &audio,
    )?;

    let encode_start = Instant::now();
    let encode_pb = spinner(pipeline_config.show_progress, "Encoding video...");

    let encoded = collaborators
        .engine
        .encode(&graph, &config.encode, &request.output)
        .await;
    if let Err(e) = encoded {
        if let Some(pb) = encode_pb {
            pb.abandon_with_message("✗ Encoding failed");
        }
        return Err(e);
    }

    if let Some(pb) = encode_pb {
        pb.finish_with_message(format!("✓ Encoded {}s of video", graph.duration_secs));
    }
    let encode_time = encode_start.elapsed();

    let chunk_count = chunks.len();
    for chunk in chunks {
        chunk.release()?;
    }
    watermark.release()?;

    let stats = PipelineStats {
        total_time: start_time.elapsed(),
        render_time,
        encode_time,
        verses: inputs.len(),
        chunks: chunk_count,
        video_duration: Duration::from_secs(graph.duration_secs),
        with_audio: matches!(audio, AudioSource::File(_)),
        engine: collaborators.engine.name().to_string(),
    };

    Ok(PipelineResult {
        output_path: request.output.clone(),
        stats,
    })
}

fn trimmed_audio_path(dir: &Path, source: &Path) -> PathBuf {
    let extension = source
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp3".to_string());
    dir.join(format!("audio.{extension}"))
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult) {
    let rule = style("═══════════════════════════════════════════════════════════════").cyan();
    println!();
    println!("{rule}");
    println!("                      {}", style("Video Generation Complete").bold());
    println!("{rule}");
    println!();
    println!("  Output:     {}", style(result.output_path.display()).green());
    println!("  Verses:     {}", result.stats.verses);
    println!("  Chunks:     {}", result.stats.chunks);
    println!(
        "  Duration:   {}s{}",
        result.stats.video_duration.as_secs(),
        if result.stats.with_audio {
            ""
        } else {
            " (silent)"
        }
    );
    println!("  Engine:     {}", result.stats.engine);
    println!();
    println!("  Timing:");
    println!(
        "    Render:      {:.2}s",
        result.stats.render_time.as_secs_f64()
    );
    println!(
        "    Encode:      {:.2}s",
        result.stats.encode_time.as_secs_f64()
    );
    println!(
        "    Total:       {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    println!();
    println!("{rule}");
}
