//! Low-latency sound effects.
//!
//! - [`SoundPool`] - Preloads short clips and fires them on demand
//! - [`ShortSoundPlayer`] - Guards playback behind a completed load
//! - [`pool::CpalSoundPool`] - The pool backed by symphonia decoding and cpal output

pub mod pool;

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::MediaError;
use crate::notice::Notice;

pub use pool::CpalSoundPool;

/// Opaque handle to a sample held by a [`SoundPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleId(pub u32);

pub const FULL_VOLUME: f32 = 1.0;

pub trait SoundPool {
    /// Starts loading `asset`. Completion arrives later as
    /// [`ScreenEvent::SoundLoaded`](crate::event::ScreenEvent::SoundLoaded)
    /// carrying the returned id.
    fn load(&mut self, asset: &Path) -> SampleId;

    /// Plays a loaded sample once. Starting a new sample cuts off the one
    /// still playing.
    fn play(&mut self, sample: SampleId, volume: f32) -> Result<(), MediaError>;

    /// Frees the decoded samples and the output device.
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoundHandle {
    pub loaded: bool,
    pub id: Option<SampleId>,
}

/// Plays a single bundled sound effect once it has finished loading.
///
/// The pool is released when the player is dropped.
pub struct ShortSoundPlayer {
    pool: Box<dyn SoundPool>,
    handle: SoundHandle,
}

impl ShortSoundPlayer {
    pub fn new(pool: Box<dyn SoundPool>) -> Self {
        Self {
            pool,
            handle: SoundHandle::default(),
        }
    }

    pub fn load(&mut self, asset: &Path) {
        let id = self.pool.load(asset);
        debug!("Loading sound {} as {:?}", asset.display(), id);
        self.handle = SoundHandle {
            loaded: false,
            id: Some(id),
        };
    }

    /// Applies a load completion. Completions for other samples are ignored.
    pub fn on_load_complete(
        &mut self,
        sample_id: SampleId,
        result: Result<(), MediaError>,
    ) -> Option<Notice> {
        if self.handle.id != Some(sample_id) {
            debug!("Ignoring load completion for unknown sample {:?}", sample_id);
            return None;
        }

        match result {
            Ok(()) => {
                if !self.handle.loaded {
                    info!("Sound {:?} loaded", sample_id);
                    self.handle.loaded = true;
                }
                None
            }
            Err(e) => {
                warn!("Failed to load sound {:?}: {}", sample_id, e);
                self.handle.loaded = false;
                Some(Notice::SoundLoadFailed)
            }
        }
    }

    pub fn play(&mut self) -> Option<Notice> {
        let id = match self.handle {
            SoundHandle {
                loaded: true,
                id: Some(id),
            } => id,
            _ => return Some(Notice::SoundNotReady),
        };

        match self.pool.play(id, FULL_VOLUME) {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to play sound {:?}: {}", id, e);
                Some(Notice::SoundUnavailable)
            }
        }
    }

    pub fn handle(&self) -> SoundHandle {
        self.handle
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.loaded
    }
}

impl Drop for ShortSoundPlayer {
    fn drop(&mut self) {
        self.pool.release();
        debug!("Sound pool released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSoundPool;
    use std::path::PathBuf;

    fn player() -> (ShortSoundPlayer, FakeSoundPool) {
        let pool = FakeSoundPool::new();
        let mut player = ShortSoundPlayer::new(Box::new(pool.clone()));
        player.load(&PathBuf::from("assets/click_sound.wav"));
        (player, pool)
    }

    #[test]
    fn test_play_before_load_is_refused_every_time() {
        let (mut player, pool) = player();

        assert_eq!(player.play(), Some(Notice::SoundNotReady));
        assert_eq!(player.play(), Some(Notice::SoundNotReady));
        assert_eq!(pool.plays(), 0);
    }

    #[test]
    fn test_play_after_matching_load() {
        let (mut player, pool) = player();
        let id = player.handle().id.unwrap();

        assert_eq!(player.on_load_complete(id, Ok(())), None);
        assert!(player.is_loaded());

        for _ in 0..3 {
            assert_eq!(player.play(), None);
        }
        assert_eq!(pool.plays(), 3);
        assert_eq!(pool.last_volume(), Some(FULL_VOLUME));
    }

    #[test]
    fn test_completion_for_other_sample_is_ignored() {
        let (mut player, pool) = player();
        let id = player.handle().id.unwrap();

        assert_eq!(player.on_load_complete(SampleId(id.0 + 7), Ok(())), None);
        assert!(!player.is_loaded());
        assert_eq!(player.play(), Some(Notice::SoundNotReady));
        assert_eq!(pool.plays(), 0);
    }

    #[test]
    fn test_load_failure_is_surfaced() {
        let (mut player, _pool) = player();
        let id = player.handle().id.unwrap();

        let notice = player.on_load_complete(id, Err(MediaError::Asset("missing".into())));
        assert_eq!(notice, Some(Notice::SoundLoadFailed));
        assert_eq!(player.play(), Some(Notice::SoundNotReady));
    }

    #[test]
    fn test_playback_error_reports_unavailable() {
        let (mut player, pool) = player();
        let id = player.handle().id.unwrap();
        player.on_load_complete(id, Ok(()));

        pool.fail_playback(true);
        assert_eq!(player.play(), Some(Notice::SoundUnavailable));
    }

    #[test]
    fn test_drop_releases_pool_once() {
        let (player, pool) = player();
        drop(player);
        assert_eq!(pool.releases(), 1);
    }
}
