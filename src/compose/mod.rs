pub mod encode;

pub use encode::{check_ffmpeg, encode_args, trim_audio, FfmpegEngine, VideoCompositingEngine};

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{EncodeConfig, RenderConfig};
use crate::error::{ReelError, Result};
use crate::overlay::Chunk;
use crate::render::Artifact;

/// Input slots fixed by the graph layout; chunk artifacts follow from
/// [`FIRST_CHUNK_INPUT`].
pub const AUDIO_INPUT: usize = 0;
pub const BACKGROUND_INPUT: usize = 1;
pub const WATERMARK_INPUT: usize = 2;
pub const FIRST_CHUNK_INPUT: usize = 3;

/// Silent stand-in used when the program has no audio.
const SILENCE_SOURCE: &str = "anullsrc=channel_layout=stereo:sample_rate=44100";

/// A stream endpoint in the filter graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pad {
    /// The video stream of input `n`.
    Input(usize),
    Label(String),
}

impl Pad {
    fn label(name: impl Into<String>) -> Self {
        Pad::Label(name.into())
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pad::Input(index) => write!(f, "[{index}:v]"),
            Pad::Label(label) => write!(f, "[{label}]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Scale {
        width: u32,
        height: u32,
    },
    /// Alpha fade; times in seconds relative to the range start.
    Fade {
        direction: FadeDirection,
        start: f64,
        duration: f64,
    },
    /// Overlay the second input on the first, optionally only inside
    /// `[from, to]` seconds.
    Overlay {
        x: i32,
        y: i32,
        enable: Option<(f64, f64)>,
    },
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Scale { width, height } => write!(f, "scale={width}:{height}"),
            Filter::Fade {
                direction,
                start,
                duration,
            } => {
                let t = match direction {
                    FadeDirection::In => "in",
                    FadeDirection::Out => "out",
                };
                write!(f, "fade=t={t}:st={start}:d={duration}:alpha=1")
            }
            Filter::Overlay { x, y, enable } => {
                write!(f, "overlay={x}:{y}")?;
                if let Some((from, to)) = enable {
                    write!(f, ":enable='between(t,{from},{to})'")?;
                }
                Ok(())
            }
        }
    }
}

/// One filter chain: `inputs -> filters -> output`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOp {
    pub inputs: Vec<Pad>,
    pub filters: Vec<Filter>,
    pub output: Pad,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pad in &self.inputs {
            write!(f, "{pad}")?;
        }
        let filters: Vec<String> = self.filters.iter().map(Filter::to_string).collect();
        write!(f, "{}{}", filters.join(","), self.output)
    }
}

/// An input to the compositing engine with the options that precede it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub options: Vec<String>,
    pub location: String,
}

impl InputSpec {
    fn file(path: &Path, options: Vec<String>) -> Self {
        Self {
            options,
            location: path.display().to_string(),
        }
    }
}

/// Where the program's audio track comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    File(PathBuf),
    Silence,
}

/// Everything the compositing engine needs besides encoder settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionGraph {
    pub inputs: Vec<InputSpec>,
    pub ops: Vec<FilterOp>,
    /// Final composite video stream.
    pub video_output: Pad,
    /// Audio stream selector; optional so a file without audio still maps.
    pub audio_map: String,
    /// `copy` for file audio, re-encoded for generated silence.
    pub audio_codec: String,
    pub duration_secs: u64,
}

impl CompositionGraph {
    pub fn filter_complex(&self) -> String {
        self.ops
            .iter()
            .map(FilterOp::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Line chunks first, then translation chunks, each group in its original
/// order. Later overlays draw on top, so translations end up topmost.
pub fn layer_order(chunks: &[Chunk]) -> Vec<&Chunk> {
    let (translations, lines): (Vec<&Chunk>, Vec<&Chunk>) =
        chunks.iter().partition(|c| c.is_translation());
    lines.into_iter().chain(translations).collect()
}

fn secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

fn loop_options(flag: &str, value: &str, duration_secs: u64) -> Vec<String> {
    vec![
        flag.to_string(),
        value.to_string(),
        "-t".to_string(),
        duration_secs.to_string(),
    ]
}

fn ensure_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        return Err(ReelError::CompositionBuild(format!(
            "{what} {} does not exist",
            path.display()
        )));
    }
    Ok(())
}

/// Builds the compositing instructions for a chunk sequence.
#[derive(Debug, Clone)]
pub struct CompositionGraphBuilder<'a> {
    render: &'a RenderConfig,
    encode: &'a EncodeConfig,
}

impl<'a> CompositionGraphBuilder<'a> {
    pub fn new(render: &'a RenderConfig, encode: &'a EncodeConfig) -> Self {
        Self { render, encode }
    }

    fn scale(&self) -> Filter {
        Filter::Scale {
            width: self.render.width,
            height: self.render.height,
        }
    }

    /// Build the graph. Fails without side effects if any referenced file
    /// is missing or the chunks span no time.
    pub fn build(
        &self,
        chunks: &[Chunk],
        background: &Path,
        watermark: &Artifact,
        audio: &AudioSource,
    ) -> Result<CompositionGraph> {
        let ordered = layer_order(chunks);
        let (Some(first), Some(last)) = (ordered.first(), ordered.last()) else {
            return Err(ReelError::CompositionBuild("No chunks to compose".to_string()));
        };

        let range_start = first.time_start();
        let range_end = last.time_end();
        if range_end <= range_start {
            return Err(ReelError::CompositionBuild(format!(
                "Non-positive duration: {range_start}ms to {range_end}ms"
            )));
        }
        let duration_secs = (range_end - range_start).div_ceil(1000);

        ensure_exists(background, "Background")?;
        ensure_exists(watermark.path(), "Watermark")?;
        for chunk in &ordered {
            ensure_exists(chunk.artifact.path(), "Chunk artifact")?;
        }

        let (audio_input, audio_codec) = match audio {
            AudioSource::File(path) => {
                ensure_exists(path, "Audio")?;
                (InputSpec::file(path, Vec::new()), "copy")
            }
            AudioSource::Silence => (
                InputSpec {
                    options: vec![
                        "-f".to_string(),
                        "lavfi".to_string(),
                        "-t".to_string(),
                        duration_secs.to_string(),
                    ],
                    location: SILENCE_SOURCE.to_string(),
                },
                "aac",
            ),
        };

        let mut inputs = vec![
            audio_input,
            InputSpec::file(background, loop_options("-stream_loop", "-1", duration_secs)),
            InputSpec::file(watermark.path(), loop_options("-loop", "1", duration_secs)),
        ];

        // Each overlay's scale/fade chain must be declared before the
        // overlay that consumes it, so chains go in two groups.
        let mut prepare = vec![FilterOp {
            inputs: vec![Pad::Input(WATERMARK_INPUT)],
            filters: vec![self.scale()],
            output: Pad::label("watermark"),
        }];
        let mut compose = vec![FilterOp {
            inputs: vec![Pad::label("tmp0"), Pad::label("watermark")],
            filters: vec![Filter::Overlay { x: 0, y: 0, enable: None }],
            output: Pad::label("tmp1"),
        }];

        let fade_ms = (self.encode.fade_secs * 1000.0).round() as u64;
        let mut video = Pad::label("tmp1");

        for (offset, chunk) in ordered.iter().enumerate() {
            let index = FIRST_CHUNK_INPUT + offset;
            inputs.push(InputSpec::file(
                chunk.artifact.path(),
                loop_options("-loop", "1", duration_secs),
            ));

            let start_ms = chunk.time_start().saturating_sub(range_start);
            let end_ms = chunk.time_end().saturating_sub(range_start);
            let overlay = Pad::label(format!("ov{}", index - 1));
            let composite = Pad::label(format!("tmp{}", index - 1));

            prepare.push(FilterOp {
                inputs: vec![Pad::Input(index)],
                filters: vec![
                    self.scale(),
                    Filter::Fade {
                        direction: FadeDirection::In,
                        start: secs(start_ms),
                        duration: self.encode.fade_secs,
                    },
                    Filter::Fade {
                        direction: FadeDirection::Out,
                        start: secs(end_ms.saturating_sub(fade_ms)),
                        duration: self.encode.fade_secs,
                    },
                ],
                output: overlay.clone(),
            });
            compose.push(FilterOp {
                inputs: vec![video, overlay],
                filters: vec![Filter::Overlay {
                    x: 0,
                    y: 0,
                    enable: Some((secs(start_ms), secs(end_ms))),
                }],
                output: composite.clone(),
            });
            video = composite;
        }

        let mut ops = Vec::with_capacity(1 + prepare.len() + compose.len());
        ops.push(FilterOp {
            inputs: vec![Pad::Input(BACKGROUND_INPUT)],
            filters: vec![self.scale()],
            output: Pad::label("tmp0"),
        });
        ops.extend(prepare);
        ops.extend(compose);

        debug!(
            "Built composition: {} inputs, {} filter chains, {}s",
            inputs.len(),
            ops.len(),
            duration_secs
        );

        Ok(CompositionGraph {
            inputs,
            ops,
            video_output: video,
            audio_map: format!("{AUDIO_INPUT}:a?"),
            audio_codec: audio_codec.to_string(),
            duration_secs,
        })
    }
}
