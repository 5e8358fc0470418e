use std::path::PathBuf;

use crate::{error::ConfigError, staging::default_staging_dir};

pub const TOKEN_ENV_VAR: &str = "TELEGRAM_BOT_TOKEN";

/// Largest file the Bot API lets a bot download.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;
pub const DEFAULT_MAX_CLIPS: usize = 10;
pub const DEFAULT_READING_SPEED: f64 = 12.0;

/// Limits applied while collecting clips.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLimits {
    pub max_clips: usize,
    pub max_file_size: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_clips: DEFAULT_MAX_CLIPS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Tunables of the render pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Characters per second used to size caption display time.
    pub reading_speed: f64,
    pub max_clips: usize,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub font_size: u32,
    /// Characters per caption line before wrapping.
    pub wrap_width: usize,
    pub font_file: Option<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            reading_speed: DEFAULT_READING_SPEED,
            max_clips: DEFAULT_MAX_CLIPS,
            width: 720,
            height: 720,
            fps: 30,
            font_size: 48,
            wrap_width: 24,
            font_file: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub limits: SessionLimits,
    pub render: RenderSettings,
    pub staging_dir: PathBuf,
}

impl BotConfig {
    pub fn new(token: Option<String>) -> Result<Self, ConfigError> {
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken {
                env_var: TOKEN_ENV_VAR,
            })?;

        Ok(Self {
            token,
            limits: SessionLimits::default(),
            render: RenderSettings::default(),
            staging_dir: default_staging_dir(),
        })
    }

    pub fn with_max_clips(mut self, max_clips: usize) -> Self {
        self.limits.max_clips = max_clips;
        self.render.max_clips = max_clips;
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.limits.max_file_size = max_file_size;
        self
    }

    pub fn with_reading_speed(mut self, reading_speed: f64) -> Self {
        self.render.reading_speed = reading_speed;
        self
    }

    pub fn with_font_file(mut self, font_file: Option<PathBuf>) -> Self {
        self.render.font_file = font_file;
        self
    }

    pub fn with_staging_dir(mut self, staging_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = staging_dir {
            self.staging_dir = dir;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_clips == 0 {
            return Err(ConfigError::InvalidLimit {
                name: "max clips",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.limits.max_file_size == 0 {
            return Err(ConfigError::InvalidLimit {
                name: "max file size",
                reason: "must be at least 1 byte".to_string(),
            });
        }
        let speed = self.render.reading_speed;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ConfigError::InvalidLimit {
                name: "reading speed",
                reason: format!("{speed} is not a positive number of characters per second"),
            });
        }
        Ok(())
    }
}
