//! Application root and the media screen.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use dioxus::prelude::*;
use tracing::error;

use crate::capture::CaptureState;
use crate::config::ScreenConfig;
use crate::event::{self, EventReceiver, StreamKind};
use crate::media::{ElementEvent, PlaybackState, VIDEO_ELEMENT_ID};
use crate::notice::NoticeBoard;
use crate::screen::{ScreenController, ScreenParts, ScreenView};

use super::components::{ActionButton, NoticeStack, RowButtons};

const NOTICE_TICK: Duration = Duration::from_millis(250);

/// The controller plus the receiving end of its event channel, which the
/// screen takes once to start its dispatch loop.
#[derive(Clone)]
struct ScreenHandle {
    controller: Rc<RefCell<ScreenController>>,
    events: Rc<RefCell<Option<EventReceiver>>>,
}

impl PartialEq for ScreenHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.controller, &other.controller)
    }
}

fn open_screen(config: &ScreenConfig) -> Result<ScreenHandle, String> {
    let (sender, receiver) = event::channel();
    let parts = ScreenParts::platform(config, sender).map_err(|e| {
        error!("Failed to set up the screen: {:#}", e);
        format!("{e:#}")
    })?;

    Ok(ScreenHandle {
        controller: Rc::new(RefCell::new(ScreenController::start(config, parts))),
        events: Rc::new(RefCell::new(Some(receiver))),
    })
}

/// Moves pending notices onto the board and refreshes the view.
fn publish(
    controller: &mut ScreenController,
    mut view: Signal<ScreenView>,
    mut board: Signal<NoticeBoard>,
) {
    let notices = controller.drain_notices();
    if !notices.is_empty() {
        let now = Instant::now();
        let mut board = board.write();
        for notice in notices {
            board.push(notice, now);
        }
    }
    view.set(controller.snapshot());
}

fn run(
    handle: &ScreenHandle,
    view: Signal<ScreenView>,
    board: Signal<NoticeBoard>,
    action: impl FnOnce(&mut ScreenController),
) {
    let mut controller = handle.controller.borrow_mut();
    action(&mut controller);
    publish(&mut controller, view, board);
}

fn playback_label(state: &PlaybackState) -> String {
    match state {
        PlaybackState::Idle => "Buffering...".to_string(),
        PlaybackState::Ready => "Ready".to_string(),
        PlaybackState::Playing => "Playing".to_string(),
        PlaybackState::Paused => "Paused".to_string(),
        PlaybackState::Failed(reason) => format!("Unavailable: {reason}"),
    }
}

fn capture_label(state: &CaptureState) -> String {
    match state {
        CaptureState::Idle => "No photo yet".to_string(),
        CaptureState::AwaitingPermission => "Waiting for camera permission".to_string(),
        CaptureState::Capturing => "Camera open".to_string(),
        CaptureState::Saved { name } => format!("Last photo: {name}"),
        CaptureState::NoPhotoTaken => "No photo taken".to_string(),
        CaptureState::PermissionDenied => "Permission denied".to_string(),
        CaptureState::CameraUnavailable => "Camera unavailable".to_string(),
        CaptureState::SaveFailed => "Last photo could not be saved".to_string(),
    }
}

#[allow(non_snake_case)]
pub fn App() -> Element {
    let config = use_context::<ScreenConfig>();
    let screen = use_hook(|| open_screen(&config));

    let body = match screen {
        Ok(handle) => rsx! {
            MainScreen { handle }
        },
        Err(message) => rsx! {
            div {
                class: "screen-error",
                h1 { "Media Board" }
                p { "Could not start: {message}" }
            }
        },
    };

    rsx! {
        document::Stylesheet { href: asset!("/assets/main.css") }
        {body}
    }
}

#[allow(non_snake_case)]
#[component]
fn MainScreen(handle: ScreenHandle) -> Element {
    let mut board = use_signal(|| {
        let mut board = NoticeBoard::new();
        let now = Instant::now();
        for notice in handle.controller.borrow_mut().drain_notices() {
            board.push(notice, now);
        }
        board
    });
    let view = use_signal(|| handle.controller.borrow().snapshot());

    use_hook({
        let handle = handle.clone();
        move || {
            if let Some(mut events) = handle.events.borrow_mut().take() {
                let controller = handle.controller.clone();
                spawn(async move {
                    while let Some(event) = events.recv().await {
                        let mut controller = controller.borrow_mut();
                        controller.dispatch(event);
                        publish(&mut controller, view, board);
                    }
                });
            }

            spawn(async move {
                loop {
                    tokio::time::sleep(NOTICE_TICK).await;
                    let mut next = board.peek().clone();
                    if next.expire(Instant::now()) {
                        board.set(next);
                    }
                }
            });
        }
    });

    use_drop({
        let controller = handle.controller.clone();
        move || {
            if let Ok(mut controller) = controller.try_borrow_mut() {
                controller.release();
            }
        }
    });

    let current = view.read().clone();
    let sound_status = if current.sound_loaded { "Loaded" } else { "Loading..." };

    let on_sound = {
        let handle = handle.clone();
        move |_| run(&handle, view, board, |c| c.play_sound())
    };
    let on_play_audio = {
        let handle = handle.clone();
        move |_| run(&handle, view, board, |c| c.play(StreamKind::Audio))
    };
    let on_pause_audio = {
        let handle = handle.clone();
        move |_| run(&handle, view, board, |c| c.pause(StreamKind::Audio))
    };
    let on_play_video = {
        let handle = handle.clone();
        move |_| run(&handle, view, board, |c| c.play(StreamKind::Video))
    };
    let on_pause_video = {
        let handle = handle.clone();
        move |_| run(&handle, view, board, |c| c.pause(StreamKind::Video))
    };
    let video_event = {
        let handle = handle.clone();
        move |event: ElementEvent| run(&handle, view, board, |c| c.dispatch(event.into_screen_event()))
    };
    let on_video_can_play = video_event.clone();
    let on_video_ended = video_event.clone();
    let on_video_error = video_event;
    let on_capture = {
        let handle = handle.clone();
        move |_| run(&handle, view, board, |c| c.capture_photo())
    };

    rsx! {
        div {
            class: "screen",

            h1 { class: "screen-title", "Media Board" }

            RowButtons {
                title: "Sound effect",
                status: sound_status,
                ActionButton { label: "Play sound", enabled: true, onpress: on_sound }
            }

            RowButtons {
                title: "Remote audio",
                status: playback_label(&current.audio),
                ActionButton { label: "Play", enabled: current.audio.can_play(), onpress: on_play_audio }
                ActionButton { label: "Pause", enabled: current.audio.can_pause(), onpress: on_pause_audio }
            }

            video {
                id: VIDEO_ELEMENT_ID,
                class: "video-surface",
                src: "{current.video_source}",
                preload: "auto",
                oncanplay: move |_| on_video_can_play(ElementEvent::CanPlay),
                onended: move |_| on_video_ended(ElementEvent::Ended),
                onerror: move |_| on_video_error(ElementEvent::Error),
            }

            RowButtons {
                title: "Remote video",
                status: playback_label(&current.video),
                ActionButton { label: "Play", enabled: current.video.can_play(), onpress: on_play_video }
                ActionButton { label: "Pause", enabled: current.video.can_pause(), onpress: on_pause_video }
            }

            RowButtons {
                title: "Camera",
                status: capture_label(&current.capture),
                ActionButton { label: "Take photo", enabled: true, onpress: on_capture }
            }

            NoticeStack {
                notices: board.read().visible().to_vec(),
                on_dismiss: move |id| board.write().dismiss(id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(playback_label(&PlaybackState::Idle), "Buffering...");
        assert_eq!(
            playback_label(&PlaybackState::Failed("404".into())),
            "Unavailable: 404"
        );
        assert_eq!(
            capture_label(&CaptureState::Saved {
                name: "photo_1.jpg".into()
            }),
            "Last photo: photo_1.jpg"
        );
    }
}
