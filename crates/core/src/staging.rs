use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::fs;

pub fn default_staging_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("clipreel")
        .join("staging")
}

/// Directory holding downloaded clips and rendered reels.
///
/// Every path handed out is a [`TempPath`]: it is deleted when dropped unless
/// the caller calls `keep()`.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Reserves a path for an incoming clip.
    pub fn clip_path(&self) -> std::io::Result<TempPath> {
        self.temp_path("clip-", ".mp4")
    }

    /// Reserves a path for a rendered reel.
    pub fn output_path(&self) -> std::io::Result<TempPath> {
        self.temp_path("reel-", ".mp4")
    }

    fn temp_path(&self, prefix: &str, suffix: &str) -> std::io::Result<TempPath> {
        Ok(tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(&self.root)?
            .into_temp_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropped_paths_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path().join("nested"));
        staging.ensure().await.unwrap();

        let dropped = staging.clip_path().unwrap();
        let dropped_path = dropped.to_path_buf();
        assert!(dropped_path.exists());
        drop(dropped);
        assert!(!dropped_path.exists());

        let kept = staging.output_path().unwrap().keep().unwrap();
        assert!(kept.exists());
        assert!(kept.starts_with(staging.root()));
        assert_eq!(kept.extension().and_then(|e| e.to_str()), Some("mp4"));
    }
}
