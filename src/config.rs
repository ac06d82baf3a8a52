//! Configuration for the media board screen.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

pub const CONFIG_ENV: &str = "MEDIA_BOARD_CONFIG";
pub const AUDIO_URL_ENV: &str = "MEDIA_BOARD_AUDIO_URL";
pub const VIDEO_URL_ENV: &str = "MEDIA_BOARD_VIDEO_URL";

const DEFAULT_AUDIO_URL: &str = "https://www.example.com/audio_largo.mp3";
const DEFAULT_VIDEO_URL: &str = "https://www.example.com/video_demo.mp4";
const DEFAULT_CLICK_SOUND: &str = "assets/click_sound.wav";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub audio_url: String,
    pub video_url: String,
    pub click_sound: PathBuf,
    /// Where captured photos go. Falls back to the platform's private data dir.
    pub photo_dir: Option<PathBuf>,
    /// Decoded audio required before a stream reports ready.
    pub prebuffer_ms: u64,
    /// Decoded audio held ahead of playback before the download stalls.
    pub max_buffer_ms: u64,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            audio_url: DEFAULT_AUDIO_URL.to_string(),
            video_url: DEFAULT_VIDEO_URL.to_string(),
            click_sound: PathBuf::from(DEFAULT_CLICK_SOUND),
            photo_dir: None,
            prebuffer_ms: 500,
            max_buffer_ms: 4000,
        }
    }
}

impl ScreenConfig {
    /// Reads the JSON file named by `MEDIA_BOARD_CONFIG` (if any), then applies
    /// the URL overrides from the environment.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(AUDIO_URL_ENV) {
            config.audio_url = url;
        }
        if let Ok(url) = std::env::var(VIDEO_URL_ENV) {
            config.video_url = url;
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded screen config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn prebuffer(&self) -> Duration {
        Duration::from_millis(self.prebuffer_ms)
    }

    pub fn max_buffer(&self) -> Duration {
        Duration::from_millis(self.max_buffer_ms.max(self.prebuffer_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ScreenConfig::from_json(r#"{ "audio_url": "https://media.test/a.ogg" }"#).unwrap();

        assert_eq!(config.audio_url, "https://media.test/a.ogg");
        assert_eq!(config.video_url, DEFAULT_VIDEO_URL);
        assert_eq!(config.click_sound, PathBuf::from(DEFAULT_CLICK_SOUND));
        assert_eq!(config.prebuffer(), Duration::from_millis(500));
    }

    #[test]
    fn test_max_buffer_never_below_prebuffer() {
        let config = ScreenConfig {
            prebuffer_ms: 3000,
            max_buffer_ms: 1000,
            ..Default::default()
        };
        assert_eq!(config.max_buffer(), Duration::from_millis(3000));
    }

    #[test]
    fn test_from_file_reports_missing_path() {
        let err = ScreenConfig::from_file(Path::new("/nonexistent/media-board.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
