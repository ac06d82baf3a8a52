//! Bounded sample queue between a download worker and the audio thread.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::audio::PcmSource;

const PUSH_WAIT: Duration = Duration::from_millis(100);

type EndHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct QueueState {
    samples: VecDeque<f32>,
    playing: bool,
    input_done: bool,
    closed: bool,
}

/// Decoded samples waiting for playback.
///
/// The producer blocks in [`push`](Self::push) while `capacity` samples are
/// buffered. The audio thread drains it only while playing. Once the input is
/// finished and the queue runs dry during playback, the end hook fires once.
/// After [`close`](Self::close) the queue yields nothing and accepts nothing.
pub struct StreamQueue {
    state: Mutex<QueueState>,
    space: Condvar,
    capacity: usize,
    on_end: EndHook,
}

impl StreamQueue {
    pub fn new<F>(capacity: usize, on_end: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(QueueState::default()),
            space: Condvar::new(),
            capacity: capacity.max(1),
            on_end: Box::new(on_end),
        }
    }

    /// Appends samples, waiting for room. Returns false once the queue is closed.
    pub fn push(&self, samples: &[f32]) -> bool {
        let mut state = self.state.lock().unwrap();
        while !state.closed && state.samples.len() >= self.capacity {
            state = self.space.wait_timeout(state, PUSH_WAIT).unwrap().0;
        }
        if state.closed {
            return false;
        }
        state.samples.extend(samples.iter().copied());
        true
    }

    pub fn finish_input(&self) {
        self.state.lock().unwrap().input_done = true;
    }

    pub fn buffered(&self) -> usize {
        self.state.lock().unwrap().samples.len()
    }

    pub fn set_playing(&self, playing: bool) {
        self.state.lock().unwrap().playing = playing;
    }

    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.playing = false;
        state.samples.clear();
        drop(state);
        self.space.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl PcmSource for StreamQueue {
    fn fill(&self, out: &mut [f32]) -> usize {
        let mut state = self.state.lock().unwrap();
        if state.closed || !state.playing {
            return 0;
        }

        let written = state.samples.len().min(out.len());
        for (dst, src) in out.iter_mut().zip(state.samples.drain(..written)) {
            *dst = src;
        }

        let ended = state.input_done && state.samples.is_empty();
        if ended {
            state.playing = false;
        }
        drop(state);

        self.space.notify_all();
        if ended {
            (self.on_end)();
        }
        written
    }
}
