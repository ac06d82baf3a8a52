//! Video playback through a `<video>` element in the webview.
//!
//! The screen renders the element with id [`VIDEO_ELEMENT_ID`]; this engine
//! drives it with small scripts. The element's own `canplay`, `ended` and
//! `error` events come back through [`ElementEvent`].

use tracing::{debug, info};
use url::Url;

use crate::error::MediaError;
use crate::event::{ScreenEvent, StreamKind};

use super::PlaybackEngine;

pub const VIDEO_ELEMENT_ID: &str = "remote-video";

/// Runs a script in the page that hosts the element.
pub type ScriptRunner = Box<dyn FnMut(String)>;

/// Media events raised by the video element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementEvent {
    CanPlay,
    Ended,
    Error,
}

impl ElementEvent {
    pub fn into_screen_event(self) -> ScreenEvent {
        let stream = StreamKind::Video;
        match self {
            ElementEvent::CanPlay => ScreenEvent::StreamPrepared {
                stream,
                result: Ok(()),
            },
            ElementEvent::Ended => ScreenEvent::StreamEnded { stream },
            ElementEvent::Error => ScreenEvent::StreamFailed {
                stream,
                error: MediaError::Format("the video could not be loaded".into()),
            },
        }
    }
}

pub struct WebVideoEngine {
    element_id: String,
    source: Option<Url>,
    run: ScriptRunner,
}

impl WebVideoEngine {
    pub fn new(element_id: impl Into<String>) -> Self {
        Self::with_runner(
            element_id,
            Box::new(|script| {
                let _ = dioxus::document::eval(&script);
            }),
        )
    }

    pub fn with_runner(element_id: impl Into<String>, run: ScriptRunner) -> Self {
        Self {
            element_id: element_id.into(),
            source: None,
            run,
        }
    }

    /// Runs `body` with `v` bound to the element, if it is mounted.
    fn on_element(&mut self, body: &str) {
        // JSON string literals are valid JS string literals
        let id = serde_json::Value::from(self.element_id.as_str());
        (self.run)(format!(
            "const v = document.getElementById({id}); if (v) {{ {body} }}"
        ));
    }
}

impl PlaybackEngine for WebVideoEngine {
    fn prepare(&mut self, source: &Url) -> Result<(), MediaError> {
        let src = serde_json::Value::from(source.as_str());
        self.on_element(&format!("v.pause(); v.src = {src}; v.load();"));
        self.source = Some(source.clone());
        debug!("Loading video element from {}", source);
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if self.source.is_none() {
            return Err(MediaError::Released);
        }
        self.on_element("v.play().catch((e) => console.warn('video play failed', e));");
        Ok(())
    }

    fn pause(&mut self) -> Result<(), MediaError> {
        if self.source.is_none() {
            return Err(MediaError::Released);
        }
        self.on_element("v.pause();");
        Ok(())
    }

    fn release(&mut self) {
        // the element goes away with the screen
        if self.source.take().is_some() {
            info!("Video engine released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine() -> (WebVideoEngine, Rc<RefCell<Vec<String>>>) {
        let scripts = Rc::new(RefCell::new(Vec::new()));
        let sink = scripts.clone();
        let engine = WebVideoEngine::with_runner(
            VIDEO_ELEMENT_ID,
            Box::new(move |script| sink.borrow_mut().push(script)),
        );
        (engine, scripts)
    }

    #[test]
    fn test_prepare_loads_source_into_element() {
        let (mut engine, scripts) = engine();
        let url = Url::parse("https://www.example.com/video_demo.mp4").unwrap();

        engine.prepare(&url).unwrap();

        let scripts = scripts.borrow();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("getElementById(\"remote-video\")"));
        assert!(scripts[0].contains("v.src = \"https://www.example.com/video_demo.mp4\""));
        assert!(scripts[0].contains("v.load()"));
    }

    #[test]
    fn test_transport_drives_element() {
        let (mut engine, scripts) = engine();
        engine
            .prepare(&Url::parse("https://www.example.com/v.mp4").unwrap())
            .unwrap();

        engine.play().unwrap();
        engine.pause().unwrap();

        let scripts = scripts.borrow();
        assert!(scripts[1].contains("v.play()"));
        assert!(scripts[2].contains("v.pause()"));
    }

    #[test]
    fn test_released_engine_rejects_transport() {
        let (mut engine, scripts) = engine();
        assert!(matches!(engine.play(), Err(MediaError::Released)));

        engine
            .prepare(&Url::parse("https://www.example.com/v.mp4").unwrap())
            .unwrap();
        engine.release();

        assert!(matches!(engine.pause(), Err(MediaError::Released)));
        assert_eq!(scripts.borrow().len(), 1);
    }

    #[test]
    fn test_element_events_map_to_video_stream() {
        assert!(matches!(
            ElementEvent::CanPlay.into_screen_event(),
            ScreenEvent::StreamPrepared {
                stream: StreamKind::Video,
                result: Ok(()),
            }
        ));
        assert!(matches!(
            ElementEvent::Ended.into_screen_event(),
            ScreenEvent::StreamEnded {
                stream: StreamKind::Video
            }
        ));
        assert!(matches!(
            ElementEvent::Error.into_screen_event(),
            ScreenEvent::StreamFailed {
                stream: StreamKind::Video,
                error: MediaError::Format(_),
            }
        ));
    }
}
