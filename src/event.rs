//! Completion events marshalled back onto the UI loop.
//!
//! Every asynchronous collaborator (sound loading, stream preparation,
//! permission prompts, the capture UI) reports through an [`EventSender`].
//! The screen drains the matching receiver on the UI thread and hands each
//! event to [`ScreenController::dispatch`](crate::screen::ScreenController::dispatch).

use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;

use crate::capture::{CapturedImage, Permission};
use crate::error::MediaError;
use crate::sound::SampleId;

/// Which of the two streaming sessions an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Audio,
    Video,
}

impl StreamKind {
    pub fn label(&self) -> &'static str {
        match self {
            StreamKind::Audio => "remote audio",
            StreamKind::Video => "remote video",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
pub enum ScreenEvent {
    SoundLoaded {
        sample_id: SampleId,
        result: Result<(), MediaError>,
    },
    StreamPrepared {
        stream: StreamKind,
        result: Result<(), MediaError>,
    },
    /// A failure after the stream was already prepared.
    StreamFailed {
        stream: StreamKind,
        error: MediaError,
    },
    StreamEnded {
        stream: StreamKind,
    },
    PermissionResult {
        permission: Permission,
        granted: bool,
    },
    /// `None` means the user backed out of the capture UI.
    CaptureResult(Option<CapturedImage>),
}

pub type EventSender = mpsc::UnboundedSender<ScreenEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ScreenEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Sends an event, tolerating a screen that has already gone away.
pub fn post(events: &EventSender, event: ScreenEvent) {
    if let Err(e) = events.send(event) {
        debug!("Screen gone, dropping late event: {:?}", e.0);
    }
}
