use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::{debug, info};

use crate::{
    config::RenderSettings,
    error::RenderError,
    format::wrap_caption,
    render::{
        RenderSummary, Renderer,
        plan::{ClipInput, ClipPlan, MediaInfo, RenderPlan},
    },
    types::Segment,
};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const SILENCE: &str = "anullsrc=channel_layout=stereo:sample_rate=48000";

/// Renders reels with the `ffmpeg` and `ffprobe` binaries found on `PATH`.
pub struct FfmpegRenderer {
    settings: RenderSettings,
}

impl FfmpegRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Fails unless both `ffmpeg` and `ffprobe` run.
    pub async fn check_available() -> Result<(), RenderError> {
        for bin in ["ffmpeg", "ffprobe"] {
            let output = Command::new(bin)
                .arg("-version")
                .output()
                .await
                .map_err(|e| RenderError::Ffmpeg {
                    stage: "startup check",
                    reason: format!("{bin}: {e}"),
                })?;
            if !output.status.success() {
                return Err(RenderError::Ffmpeg {
                    stage: "startup check",
                    reason: format!("{bin} exited with {}", output.status),
                });
            }
        }
        Ok(())
    }

    /// Duration, container and audio presence of a media file.
    pub async fn probe(path: &Path) -> Result<MediaInfo, RenderError> {
        let probe = Command::new("ffprobe")
            .kill_on_drop(true)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration,format_name:stream=codec_type",
                "-of",
                "default=noprint_wrappers=1",
            ])
            .arg(path)
            .output();

        let output = tokio::time::timeout(PROBE_TIMEOUT, probe)
            .await
            .map_err(|_| RenderError::Probe {
                path: path.to_path_buf(),
                reason: "ffprobe timed out".to_string(),
            })??;

        if !output.status.success() {
            return Err(RenderError::Probe {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout)).map_err(|reason| {
            RenderError::Probe {
                path: path.to_path_buf(),
                reason,
            }
        })
    }

    /// Arguments that encode one planned clip into the common output format:
    /// H.264 video plus a 48 kHz stereo AAC track, silent if the source has none.
    pub fn clip_args(
        &self,
        clip: &ClipPlan,
        caption_file: Option<&Path>,
        output: &Path,
    ) -> Vec<OsString> {
        let s = &self.settings;
        let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(OsString::from)
            .collect();

        if clip.looped {
            args.extend(["-stream_loop", "-1"].map(OsString::from));
        }
        args.push("-i".into());
        args.push(clip.source.as_os_str().to_owned());
        if !clip.has_audio {
            args.extend(["-f", "lavfi", "-i", SILENCE].map(OsString::from));
        }

        let mut filters = vec![
            format!(
                "scale={w}:{h}:force_original_aspect_ratio=decrease",
                w = s.width,
                h = s.height
            ),
            format!(
                "pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
                w = s.width,
                h = s.height
            ),
            "setsar=1".to_string(),
            format!("fps={}", s.fps),
        ];
        if let Some(text_file) = caption_file {
            filters.push(self.drawtext_filter(text_file));
        }
        args.push("-vf".into());
        args.push(filters.join(",").into());

        let audio_map = if clip.has_audio { "0:a:0" } else { "1:a:0" };
        args.extend(["-map", "0:v:0", "-map", audio_map].map(OsString::from));
        // Silence is endless; the clip decides where the part ends.
        args.push("-t".into());
        args.push(format!("{:.3}", clip.output_duration).into());

        args.extend(
            [
                "-c:v",
                "libx264",
                "-preset",
                "veryfast",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-ar",
                "48000",
                "-ac",
                "2",
                "-movflags",
                "+faststart",
            ]
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }

    fn drawtext_filter(&self, text_file: &Path) -> String {
        let s = &self.settings;
        let mut filter = format!(
            "drawtext=textfile='{}':fontsize={}:fontcolor=white:borderw=3:bordercolor=black:line_spacing=6:x=(w-text_w)/2:y=h-text_h-{}",
            escape_filter_value(&text_file.to_string_lossy()),
            s.font_size,
            s.font_size / 2,
        );
        if let Some(font) = &s.font_file {
            filter.push_str(&format!(
                ":fontfile='{}'",
                escape_filter_value(&font.to_string_lossy())
            ));
        }
        filter
    }

    async fn encode_clip(
        &self,
        clip: &ClipPlan,
        workdir: &Path,
        index: usize,
        output: &Path,
    ) -> Result<(), RenderError> {
        let caption_file = match &clip.caption {
            Some(text) => {
                let path = workdir.join(format!("caption_{index:03}.txt"));
                fs::write(&path, wrap_caption(text, self.settings.wrap_width)).await?;
                Some(path)
            }
            None => None,
        };

        debug!(
            source = %clip.source.display(),
            looped = clip.looped,
            seconds = clip.output_duration,
            "encoding clip"
        );
        run_ffmpeg(
            "encoding a clip",
            self.clip_args(clip, caption_file.as_deref(), output),
        )
        .await
    }

    async fn concat(
        &self,
        parts: &[PathBuf],
        workdir: &Path,
        output: &Path,
    ) -> Result<(), RenderError> {
        let manifest_path = workdir.join("concat.txt");
        fs::write(&manifest_path, create_concat_manifest(parts)).await?;

        let mut args: Vec<OsString> = [
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(manifest_path.into_os_string());
        args.extend(["-c", "copy", "-movflags", "+faststart"].map(OsString::from));
        args.push(output.as_os_str().to_owned());

        run_ffmpeg("joining clips", args).await
    }
}

#[async_trait]
impl Renderer for FfmpegRenderer {
    async fn render(
        &self,
        segments: &[Segment],
        destination: &Path,
    ) -> Result<RenderSummary, RenderError> {
        if segments.is_empty() {
            return Err(RenderError::NoSegments);
        }

        let mut inputs = Vec::with_capacity(segments.len());
        for segment in segments {
            inputs.push(ClipInput {
                source: segment.file.clone(),
                caption: segment.caption.clone(),
                media: Self::probe(&segment.file).await?,
            });
        }
        let plan = RenderPlan::build(inputs, &self.settings)?;
        let summary = RenderSummary {
            clips: plan.clips.len(),
            duration_secs: plan.total_duration(),
        };

        if plan.is_direct_copy() {
            fs::copy(&plan.clips[0].source, destination).await?;
            info!(output = %destination.display(), "single clip copied");
            return Ok(summary);
        }

        // Removed on drop, whichever way this returns.
        let workdir = tempfile::Builder::new()
            .prefix("clipreel-render-")
            .tempdir_in(destination.parent().unwrap_or(Path::new(".")))?;

        if !plan.needs_concat() {
            self.encode_clip(&plan.clips[0], workdir.path(), 0, destination)
                .await?;
        } else {
            let mut parts = Vec::with_capacity(plan.clips.len());
            for (index, clip) in plan.clips.iter().enumerate() {
                let part = workdir.path().join(format!("part_{index:03}.mp4"));
                self.encode_clip(clip, workdir.path(), index, &part).await?;
                parts.push(part);
            }
            self.concat(&parts, workdir.path(), destination).await?;
        }

        info!(
            clips = summary.clips,
            seconds = summary.duration_secs,
            output = %destination.display(),
            "reel rendered"
        );
        Ok(summary)
    }
}

async fn run_ffmpeg(stage: &'static str, args: Vec<OsString>) -> Result<(), RenderError> {
    let output = Command::new("ffmpeg")
        .kill_on_drop(true)
        .args(&args)
        .output()
        .await?;

    if !output.status.success() {
        return Err(RenderError::Ffmpeg {
            stage,
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Reads `key=value` lines from `ffprobe -of default=noprint_wrappers=1`.
pub fn parse_probe_output(output: &str) -> Result<MediaInfo, String> {
    let mut duration = None;
    let mut format_name = None;
    let mut has_audio = false;

    for line in output.lines() {
        match line.trim().split_once('=') {
            Some(("duration", value)) => duration = value.parse::<f64>().ok(),
            Some(("format_name", value)) => format_name = Some(value.to_string()),
            Some(("codec_type", "audio")) => has_audio = true,
            _ => {}
        }
    }

    let duration = duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| format!("no usable duration in {:?}", output.trim()))?;
    Ok(MediaInfo {
        duration,
        has_audio,
        format_name: format_name.unwrap_or_default(),
    })
}

/// Concat demuxer manifest, one `file '<path>'` line per part.
pub fn create_concat_manifest(parts: &[PathBuf]) -> String {
    parts
        .iter()
        .map(|p| format!("file '{}'", p.to_string_lossy().replace('\'', r"'\''")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escapes a value placed inside single quotes of a filtergraph option.
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | ':' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\'' => escaped.push_str(r"'\\''"),
            _ => escaped.push(c),
        }
    }
    escaped
}
