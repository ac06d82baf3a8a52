//! Transient user-facing notices.
//!
//! Components report outcomes as [`Notice`] values; the UI shows them in a
//! [`NoticeBoard`] that expires each entry after its [`NoticeDuration`].

use std::fmt;
use std::time::{Duration, Instant};

use crate::event::StreamKind;

const SHORT_NOTICE: Duration = Duration::from_millis(2000);
const LONG_NOTICE: Duration = Duration::from_millis(3500);
const MAX_VISIBLE: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SoundNotReady,
    SoundLoadFailed,
    SoundUnavailable,
    StreamFailed { stream: StreamKind, reason: String },
    PermissionDenied,
    CameraUnavailable,
    NoPhotoTaken,
    PhotoSaved { name: String },
    SaveFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeDuration {
    Short,
    Long,
}

impl NoticeDuration {
    pub fn as_duration(&self) -> Duration {
        match self {
            NoticeDuration::Short => SHORT_NOTICE,
            NoticeDuration::Long => LONG_NOTICE,
        }
    }
}

impl Notice {
    pub fn duration(&self) -> NoticeDuration {
        match self {
            Notice::PhotoSaved { .. } => NoticeDuration::Long,
            _ => NoticeDuration::Short,
        }
    }

    /// Whether the notice reports a failure rather than an outcome.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::SoundLoadFailed
                | Notice::SoundUnavailable
                | Notice::StreamFailed { .. }
                | Notice::CameraUnavailable
                | Notice::SaveFailed
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::SoundNotReady => write!(f, "Sound not loaded yet"),
            Notice::SoundLoadFailed => write!(f, "Could not load the sound effect"),
            Notice::SoundUnavailable => write!(f, "Sound output is unavailable"),
            Notice::StreamFailed { stream, reason } => {
                write!(f, "Playback of {stream} failed: {reason}")
            }
            Notice::PermissionDenied => write!(f, "Camera permission denied"),
            Notice::CameraUnavailable => write!(f, "Could not open the camera"),
            Notice::NoPhotoTaken => write!(f, "No photo was taken"),
            Notice::PhotoSaved { name } => write!(f, "Photo saved as {name}"),
            Notice::SaveFailed => write!(f, "Error saving the photo"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShownNotice {
    pub id: u64,
    pub notice: Notice,
    pub expires_at: Instant,
}

/// The notices currently on screen, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoticeBoard {
    next_id: u64,
    visible: Vec<ShownNotice>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notice: Notice, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let expires_at = now + notice.duration().as_duration();
        self.visible.push(ShownNotice {
            id,
            notice,
            expires_at,
        });

        if self.visible.len() > MAX_VISIBLE {
            let overflow = self.visible.len() - MAX_VISIBLE;
            self.visible.drain(..overflow);
        }

        id
    }

    /// Drops expired notices. Returns true if anything was removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.visible.len();
        self.visible.retain(|n| n.expires_at > now);
        self.visible.len() != before
    }

    pub fn dismiss(&mut self, id: u64) {
        self.visible.retain(|n| n.id != id);
    }

    pub fn visible(&self) -> &[ShownNotice] {
        &self.visible
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_notice_names_the_file() {
        let notice = Notice::PhotoSaved {
            name: "photo_1.jpg".to_string(),
        };
        assert_eq!(notice.to_string(), "Photo saved as photo_1.jpg");
        assert_eq!(notice.duration(), NoticeDuration::Long);
        assert!(!notice.is_error());
    }

    #[test]
    fn test_stream_failure_mentions_stream() {
        let notice = Notice::StreamFailed {
            stream: StreamKind::Video,
            reason: "timeout".to_string(),
        };
        assert_eq!(notice.to_string(), "Playback of remote video failed: timeout");
        assert!(notice.is_error());
    }

    #[test]
    fn test_board_expires_by_duration() {
        let start = Instant::now();
        let mut board = NoticeBoard::new();
        board.push(Notice::SoundNotReady, start);
        board.push(
            Notice::PhotoSaved {
                name: "a.jpg".to_string(),
            },
            start,
        );

        assert!(!board.expire(start + Duration::from_millis(1000)));
        assert_eq!(board.visible().len(), 2);

        assert!(board.expire(start + Duration::from_millis(2500)));
        assert_eq!(board.visible().len(), 1);
        assert!(matches!(board.visible()[0].notice, Notice::PhotoSaved { .. }));

        assert!(board.expire(start + Duration::from_secs(4)));
        assert!(board.is_empty());
    }

    #[test]
    fn test_board_keeps_newest_when_full() {
        let now = Instant::now();
        let mut board = NoticeBoard::new();
        for _ in 0..5 {
            board.push(Notice::SoundNotReady, now);
        }
        let ids: Vec<u64> = board.visible().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);

        board.dismiss(3);
        let ids: Vec<u64> = board.visible().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 4]);
    }
}
