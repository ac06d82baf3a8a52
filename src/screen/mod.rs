//! The single screen's composition root.
//!
//! [`ScreenController`] owns the sound player, both streaming sessions and the
//! capture workflow for as long as the screen is visible. UI presses and
//! [`ScreenEvent`]s come in; [`Notice`]s and a [`ScreenView`] snapshot go out.
//! Every native handle is released exactly once, by [`ScreenController::release`]
//! or on drop, whichever comes first. Events that arrive after that are dropped.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::capture::{
    CameraApi, CaptureState, CaptureWorkflow, PermissionApi, PhotoStorage, PlatformCamera,
    PlatformPermissions, PrivateStorage,
};
use crate::config::ScreenConfig;
use crate::event::{EventSender, ScreenEvent, StreamKind};
use crate::media::{
    HttpStreamEngine, PlaybackEngine, PlaybackState, StreamingMediaSession, VIDEO_ELEMENT_ID,
    WebVideoEngine,
};
use crate::notice::Notice;
use crate::sound::{CpalSoundPool, ShortSoundPlayer, SoundPool};

/// The platform collaborators a screen is built from.
pub struct ScreenParts {
    pub sound_pool: Box<dyn SoundPool>,
    pub audio_engine: Box<dyn PlaybackEngine>,
    pub video_engine: Box<dyn PlaybackEngine>,
    pub permissions: Box<dyn PermissionApi>,
    pub camera: Box<dyn CameraApi>,
    pub storage: Box<dyn PhotoStorage>,
}

impl ScreenParts {
    pub fn platform(config: &ScreenConfig, events: EventSender) -> Result<Self> {
        let storage = PrivateStorage::for_config(config)?;
        info!("Photos will be saved to {}", storage.dir().display());

        Ok(Self {
            sound_pool: Box::new(CpalSoundPool::new(events.clone())),
            audio_engine: Box::new(HttpStreamEngine::new(
                StreamKind::Audio,
                events.clone(),
                config.prebuffer(),
                config.max_buffer(),
            )),
            video_engine: Box::new(WebVideoEngine::new(VIDEO_ELEMENT_ID)),
            permissions: Box::new(PlatformPermissions::new(events.clone())),
            camera: Box::new(PlatformCamera::new(events)),
            storage: Box::new(storage),
        })
    }
}

/// What the UI renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenView {
    pub live: bool,
    pub sound_loaded: bool,
    pub audio: PlaybackState,
    pub video: PlaybackState,
    /// What the video element should load.
    pub video_source: String,
    pub capture: CaptureState,
}

pub struct ScreenController {
    live: bool,
    sound: Option<ShortSoundPlayer>,
    audio: Option<StreamingMediaSession>,
    video: Option<StreamingMediaSession>,
    capture: CaptureWorkflow,
    permissions: Box<dyn PermissionApi>,
    camera: Box<dyn CameraApi>,
    storage: Box<dyn PhotoStorage>,
    notices: Vec<Notice>,
}

impl ScreenController {
    /// Builds the components, starts loading the sound effect and prepares
    /// both streams.
    pub fn start(config: &ScreenConfig, parts: ScreenParts) -> Self {
        let ScreenParts {
            sound_pool,
            audio_engine,
            video_engine,
            permissions,
            camera,
            storage,
        } = parts;

        let mut controller = Self {
            live: true,
            sound: Some(ShortSoundPlayer::new(sound_pool)),
            audio: Some(StreamingMediaSession::new(
                StreamKind::Audio,
                config.audio_url.clone(),
                audio_engine,
            )),
            video: Some(StreamingMediaSession::new(
                StreamKind::Video,
                config.video_url.clone(),
                video_engine,
            )),
            capture: CaptureWorkflow::new(),
            permissions,
            camera,
            storage,
            notices: Vec::new(),
        };

        if let Some(sound) = controller.sound.as_mut() {
            sound.load(&config.click_sound);
        }
        for kind in [StreamKind::Audio, StreamKind::Video] {
            let notice = controller.session(kind).and_then(|s| s.prepare());
            controller.notify(notice);
        }

        info!("Screen started");
        controller
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn play_sound(&mut self) {
        let notice = self.sound.as_mut().and_then(|s| s.play());
        self.notify(notice);
    }

    pub fn play(&mut self, kind: StreamKind) {
        let notice = self.session(kind).and_then(|s| s.play());
        self.notify(notice);
    }

    pub fn pause(&mut self, kind: StreamKind) {
        let notice = self.session(kind).and_then(|s| s.pause());
        self.notify(notice);
    }

    pub fn capture_photo(&mut self) {
        if !self.live {
            return;
        }
        let notice = self
            .capture
            .start(self.permissions.as_mut(), self.camera.as_mut());
        self.notify(notice);
    }

    /// Applies an asynchronous completion on the UI thread.
    pub fn dispatch(&mut self, event: ScreenEvent) {
        if !self.live {
            debug!("Screen released, dropping {:?}", event);
            return;
        }

        let notice = match event {
            ScreenEvent::SoundLoaded { sample_id, result } => self
                .sound
                .as_mut()
                .and_then(|s| s.on_load_complete(sample_id, result)),
            ScreenEvent::StreamPrepared { stream, result } => {
                self.session(stream).and_then(|s| s.on_prepared(result))
            }
            ScreenEvent::StreamFailed { stream, error } => {
                self.session(stream).and_then(|s| s.on_error(error))
            }
            ScreenEvent::StreamEnded { stream } => self.session(stream).and_then(|s| s.on_ended()),
            ScreenEvent::PermissionResult {
                permission,
                granted,
            } => self
                .capture
                .on_permission_result(permission, granted, self.camera.as_mut()),
            ScreenEvent::CaptureResult(image) => self
                .capture
                .on_capture_result(image, self.storage.as_mut()),
        };
        self.notify(notice);
    }

    /// Notices raised since the last call, oldest first.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn snapshot(&self) -> ScreenView {
        let state = |session: &Option<StreamingMediaSession>| {
            session
                .as_ref()
                .map(|s| s.state().clone())
                .unwrap_or(PlaybackState::Idle)
        };

        ScreenView {
            live: self.live,
            sound_loaded: self.sound.as_ref().is_some_and(|s| s.is_loaded()),
            audio: state(&self.audio),
            video: state(&self.video),
            video_source: self
                .video
                .as_ref()
                .map(|s| s.source().to_string())
                .unwrap_or_default(),
            capture: self.capture.state().clone(),
        }
    }

    /// Releases the sound pool and both engines and abandons any capture
    /// still waiting on the OS. Later calls do nothing.
    pub fn release(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;

        if self.capture.state().is_pending() {
            debug!("Releasing with capture still pending: {:?}", self.capture.state());
        }
        self.permissions.cancel();
        self.camera.cancel();
        drop(self.sound.take());
        drop(self.audio.take());
        drop(self.video.take());
        info!("Screen released");
    }

    fn session(&mut self, kind: StreamKind) -> Option<&mut StreamingMediaSession> {
        match kind {
            StreamKind::Audio => self.audio.as_mut(),
            StreamKind::Video => self.video.as_mut(),
        }
    }

    fn notify(&mut self, notice: Option<Notice>) {
        let Some(notice) = notice else {
            return;
        };
        if notice.is_error() {
            warn!("Notice: {}", notice);
        } else {
            info!("Notice: {}", notice);
        }
        self.notices.push(notice);
    }
}

impl Drop for ScreenController {
    fn drop(&mut self) {
        self.release();
    }
}
