pub mod compose;
pub mod config;
pub mod error;
pub mod layout;
pub mod overlay;
pub mod pipeline;
pub mod range;
pub mod render;
pub mod timing;
pub mod verse;

pub use config::Config;
pub use error::{ReelError, Result};
pub use pipeline::{
    generate_video, generate_video_with, print_summary, Collaborators, PipelineConfig,
    PipelineResult, PipelineStats, VideoRequest,
};
pub use range::AyahRange;
