use std::path::PathBuf;

use crate::{config::RenderSettings, error::RenderError};

/// Tolerance when comparing durations reported by ffprobe.
const DURATION_EPSILON: f64 = 0.01;

/// Seconds needed to read `caption` at `reading_speed` characters per second.
pub fn caption_duration(caption: &str, reading_speed: f64) -> f64 {
    caption.chars().count() as f64 / reading_speed
}

/// What ffprobe reports about a staged clip.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration: f64,
    pub has_audio: bool,
    /// Demuxer names, e.g. `mov,mp4,m4a,3gp,3g2,mj2` or `matroska,webm`.
    pub format_name: String,
}

impl MediaInfo {
    /// The file can be delivered as `.mp4` without remuxing.
    pub fn is_mp4(&self) -> bool {
        self.format_name.split(',').any(|name| name == "mp4")
    }
}

/// A clip together with its probed properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInput {
    pub source: PathBuf,
    pub caption: Option<String>,
    pub media: MediaInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlan {
    pub source: PathBuf,
    pub caption: Option<String>,
    pub natural_duration: f64,
    /// Length of the clip in the output; the caption stays up the whole time.
    pub output_duration: f64,
    /// The source is repeated to fill `output_duration`.
    pub looped: bool,
    /// Clips without sound get a silent track so all parts match.
    pub has_audio: bool,
    pub is_mp4: bool,
}

impl ClipPlan {
    fn new(input: ClipInput, reading_speed: f64) -> Self {
        let caption = input.caption.filter(|c| !c.trim().is_empty());
        let natural_duration = input.media.duration;
        let output_duration = match &caption {
            Some(text) => caption_duration(text, reading_speed).max(natural_duration),
            None => natural_duration,
        };

        Self {
            looped: output_duration > natural_duration + DURATION_EPSILON,
            has_audio: input.media.has_audio,
            is_mp4: input.media.is_mp4(),
            source: input.source,
            caption,
            natural_duration,
            output_duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub clips: Vec<ClipPlan>,
}

impl RenderPlan {
    pub fn build(inputs: Vec<ClipInput>, settings: &RenderSettings) -> Result<Self, RenderError> {
        if inputs.is_empty() {
            return Err(RenderError::NoSegments);
        }
        if inputs.len() > settings.max_clips {
            return Err(RenderError::TooManyClips {
                count: inputs.len(),
                max: settings.max_clips,
            });
        }

        let clips = inputs
            .into_iter()
            .map(|input| ClipPlan::new(input, settings.reading_speed))
            .collect();
        Ok(Self { clips })
    }

    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.output_duration).sum()
    }

    /// A lone uncaptioned mp4 is delivered as is.
    pub fn is_direct_copy(&self) -> bool {
        matches!(self.clips.as_slice(), [only] if only.caption.is_none() && only.is_mp4)
    }

    pub fn needs_concat(&self) -> bool {
        self.clips.len() > 1
    }
}
