//! Photo persistence in the app's private storage.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ScreenConfig;

use super::CapturedImage;

pub const JPEG_QUALITY: u8 = 100;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to write photo: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode photo: {0}")]
    Encode(#[from] image::ImageError),
}

pub trait PhotoStorage {
    /// Encodes `image` as JPEG under `name` and returns the final path.
    fn save_jpeg(&mut self, name: &str, image: &CapturedImage) -> Result<PathBuf, SaveError>;
}

/// A directory only this app writes to.
///
/// Files are written under a `.part` name and renamed once complete, so a
/// failed save never leaves a file with the final name behind. Neither the
/// partial nor the final file is ever overwritten.
pub struct PrivateStorage {
    dir: PathBuf,
}

impl PrivateStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_config(config: &ScreenConfig) -> Result<Self> {
        let dir = match &config.photo_dir {
            Some(dir) => dir.clone(),
            None => private_dir()?,
        };
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn encode(file: File, image: &CapturedImage) -> Result<(), SaveError> {
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(&image.to_rgb())?;
        writer.flush()?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        Ok(())
    }

    fn publish(partial: &Path, path: &Path) -> Result<(), SaveError> {
        // rename(2) replaces an existing target
        if path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            )
            .into());
        }
        fs::rename(partial, path)?;
        Ok(())
    }
}

fn discard(partial: &Path) {
    if let Err(e) = fs::remove_file(partial) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", partial.display(), e);
        }
    }
}

impl PhotoStorage for PrivateStorage {
    fn save_jpeg(&mut self, name: &str, image: &CapturedImage) -> Result<PathBuf, SaveError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(name);
        let partial = self.dir.join(format!("{name}.part"));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&partial)?;

        if let Err(e) = Self::encode(file, image).and_then(|()| Self::publish(&partial, &path)) {
            discard(&partial);
            return Err(e);
        }

        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(target_os = "android")]
fn private_dir() -> Result<PathBuf> {
    use crate::platform_support::android_utils::{files_dir, with_activity};

    let dir = with_activity(|env, activity| files_dir(env, activity))
        .map_err(|e| anyhow::anyhow!("Failed to query files dir: {:?}", e))?;
    Ok(PathBuf::from(dir))
}

#[cfg(not(target_os = "android"))]
fn private_dir() -> Result<PathBuf> {
    use anyhow::Context;

    let base = dirs::data_local_dir().context("No local data directory on this platform")?;
    Ok(base.join("media-board").join("photos"))
}
