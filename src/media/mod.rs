//! Remote streaming playback.
//!
//! A [`StreamingMediaSession`] binds one [`PlaybackEngine`] to a fixed source
//! URI and enforces the transport state machine:
//!
//! ```text
//! Idle --prepared--> Ready --play--> Playing --pause--> Paused
//!  ^                                  |  ^               |
//!  +-------------ended----------------+  +-----play------+
//! ```
//!
//! Commands that do not match the current state are dropped here, before they
//! reach the engine. Reaching the end of the stream prepares the source again.
//! Any failure moves the session to `Failed`, which is final.

pub mod http;
pub mod queue;
pub mod web_video;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::MediaError;
use crate::event::StreamKind;
use crate::notice::Notice;

pub use http::HttpStreamEngine;
pub use web_video::{ElementEvent, VIDEO_ELEMENT_ID, WebVideoEngine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Ready,
    Playing,
    Paused,
    Failed(String),
}

impl PlaybackState {
    pub fn can_play(&self) -> bool {
        matches!(self, PlaybackState::Ready | PlaybackState::Paused)
    }

    pub fn can_pause(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

/// A playback engine for one remote source.
///
/// `prepare` returns once the work has been scheduled; the outcome arrives as
/// [`ScreenEvent::StreamPrepared`](crate::event::ScreenEvent::StreamPrepared).
pub trait PlaybackEngine {
    fn prepare(&mut self, source: &Url) -> Result<(), MediaError>;
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self) -> Result<(), MediaError>;
    fn release(&mut self);
}

pub struct StreamingMediaSession {
    kind: StreamKind,
    source: String,
    state: PlaybackState,
    preparing: bool,
    engine: Box<dyn PlaybackEngine>,
}

impl StreamingMediaSession {
    pub fn new(kind: StreamKind, source: impl Into<String>, engine: Box<dyn PlaybackEngine>) -> Self {
        Self {
            kind,
            source: source.into(),
            state: PlaybackState::Idle,
            preparing: false,
            engine,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_preparing(&self) -> bool {
        self.preparing
    }

    pub fn prepare(&mut self) -> Option<Notice> {
        if self.state != PlaybackState::Idle || self.preparing {
            debug!("{} already prepared or preparing", self.kind);
            return None;
        }

        let url = match Url::parse(&self.source) {
            Ok(url) => url,
            Err(e) => {
                return self.fail(MediaError::InvalidSource {
                    uri: self.source.clone(),
                    reason: e.to_string(),
                });
            }
        };

        match self.engine.prepare(&url) {
            Ok(()) => {
                info!("Preparing {} from {}", self.kind, url);
                self.preparing = true;
                None
            }
            Err(e) => self.fail(e),
        }
    }

    pub fn on_prepared(&mut self, result: Result<(), MediaError>) -> Option<Notice> {
        if !self.preparing {
            debug!("Ignoring unexpected prepare completion for {}", self.kind);
            return None;
        }
        self.preparing = false;

        match result {
            Ok(()) => {
                info!("{} ready", self.kind);
                self.state = PlaybackState::Ready;
                None
            }
            Err(e) => self.fail(e),
        }
    }

    pub fn play(&mut self) -> Option<Notice> {
        if !self.state.can_play() {
            debug!("Ignoring play for {} in state {:?}", self.kind, self.state);
            return None;
        }

        match self.engine.play() {
            Ok(()) => {
                self.state = PlaybackState::Playing;
                None
            }
            Err(e) => self.fail(e),
        }
    }

    pub fn pause(&mut self) -> Option<Notice> {
        if !self.state.can_pause() {
            debug!("Ignoring pause for {} in state {:?}", self.kind, self.state);
            return None;
        }

        match self.engine.pause() {
            Ok(()) => {
                self.state = PlaybackState::Paused;
                None
            }
            Err(e) => self.fail(e),
        }
    }

    pub fn on_ended(&mut self) -> Option<Notice> {
        if self.state != PlaybackState::Playing {
            return None;
        }

        info!("{} reached the end, buffering again", self.kind);
        self.state = PlaybackState::Idle;
        self.prepare()
    }

    pub fn on_error(&mut self, error: MediaError) -> Option<Notice> {
        if matches!(self.state, PlaybackState::Failed(_)) {
            return None;
        }
        self.preparing = false;
        self.fail(error)
    }

    fn fail(&mut self, error: MediaError) -> Option<Notice> {
        warn!("{} failed: {}", self.kind, error);
        let reason = error.to_string();
        self.state = PlaybackState::Failed(reason.clone());
        Some(Notice::StreamFailed {
            stream: self.kind,
            reason,
        })
    }
}

impl Drop for StreamingMediaSession {
    fn drop(&mut self) {
        self.engine.release();
        debug!("{} engine released", self.kind);
    }
}
