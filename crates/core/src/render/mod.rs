//! Turning an ordered list of clips into one video.
//!
//! The [`Renderer`] trait is the narrow seam the dispatcher talks to.
//! [`FfmpegRenderer`] implements it by probing each clip, building a
//! [`RenderPlan`] and driving `ffmpeg` as a child process.

pub mod ffmpeg;
pub mod plan;

use std::path::Path;

use async_trait::async_trait;

pub use ffmpeg::FfmpegRenderer;
pub use plan::{ClipInput, ClipPlan, MediaInfo, RenderPlan, caption_duration};

use crate::{error::RenderError, types::Segment};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub clips: usize,
    pub duration_secs: f64,
}

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Writes the concatenation of `segments`, in order, to `destination`.
    async fn render(
        &self,
        segments: &[Segment],
        destination: &Path,
    ) -> Result<RenderSummary, RenderError>;
}
