//! Progressive HTTP playback.
//!
//! Each prepare spawns a download thread that feeds the response body through
//! symphonia and the resampler into a [`StreamQueue`]. The cpal stream pulls
//! from the queue once playing. Dropping the active stream closes its queue,
//! which stops the worker at its next push and silences any callback still in
//! flight.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::audio::decode::extension_hint;
use crate::audio::{AudioOutput, OutputFormat, StreamResampler, TrackDecoder};
use crate::error::MediaError;
use crate::event::{self, EventSender, ScreenEvent, StreamKind};

use super::PlaybackEngine;
use super::queue::StreamQueue;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

struct ActiveStream {
    queue: Arc<StreamQueue>,
    _output: AudioOutput,
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.queue.close();
    }
}

pub struct HttpStreamEngine {
    kind: StreamKind,
    events: EventSender,
    prebuffer: Duration,
    max_buffer: Duration,
    active: Option<ActiveStream>,
}

impl HttpStreamEngine {
    pub fn new(kind: StreamKind, events: EventSender, prebuffer: Duration, max_buffer: Duration) -> Self {
        Self {
            kind,
            events,
            prebuffer,
            max_buffer: max_buffer.max(prebuffer),
            active: None,
        }
    }

    fn queue(&self) -> Result<&Arc<StreamQueue>, MediaError> {
        self.active
            .as_ref()
            .map(|active| &active.queue)
            .ok_or(MediaError::Released)
    }
}

impl PlaybackEngine for HttpStreamEngine {
    fn prepare(&mut self, source: &Url) -> Result<(), MediaError> {
        self.active = None;

        let format = AudioOutput::default_format().map_err(|e| MediaError::Output(format!("{e:#}")))?;
        let kind = self.kind;

        let queue = {
            let events = self.events.clone();
            Arc::new(StreamQueue::new(format.samples_for(self.max_buffer), move || {
                event::post(&events, ScreenEvent::StreamEnded { stream: kind });
            }))
        };

        let output = {
            let events = self.events.clone();
            AudioOutput::open(queue.clone(), move |err| {
                error!("An error occurred on the {} stream: {}", kind, err);
                event::post(
                    &events,
                    ScreenEvent::StreamFailed {
                        stream: kind,
                        error: MediaError::Output(err),
                    },
                );
            })
            .map_err(|e| MediaError::Output(format!("{e:#}")))?
        };

        let download = Download {
            kind,
            url: source.clone(),
            queue: queue.clone(),
            format,
            prebuffer: format.samples_for(self.prebuffer),
            events: self.events.clone(),
        };
        thread::Builder::new()
            .name(format!("{} download", kind))
            .spawn(move || download.run())
            .map_err(|e| MediaError::Network(format!("Failed to spawn download thread: {e}")))?;

        self.active = Some(ActiveStream {
            queue,
            _output: output,
        });
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        self.queue()?.set_playing(true);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), MediaError> {
        self.queue()?.set_playing(false);
        Ok(())
    }

    fn release(&mut self) {
        if self.active.take().is_some() {
            info!("{} engine released", self.kind);
        }
    }
}

impl Drop for HttpStreamEngine {
    fn drop(&mut self) {
        self.release();
    }
}

struct Download {
    kind: StreamKind,
    url: Url,
    queue: Arc<StreamQueue>,
    format: OutputFormat,
    prebuffer: usize,
    events: EventSender,
}

impl Download {
    fn run(self) {
        let mut ready = false;
        let result = self.stream(&mut ready);

        if self.queue.is_closed() {
            debug!("{} download stopped after release", self.kind);
            return;
        }

        let event = match (result, ready) {
            (Ok(()), true) => return,
            (Ok(()), false) => {
                self.queue.finish_input();
                ScreenEvent::StreamPrepared {
                    stream: self.kind,
                    result: Ok(()),
                }
            }
            (Err(e), false) => ScreenEvent::StreamPrepared {
                stream: self.kind,
                result: Err(e),
            },
            (Err(e), true) => ScreenEvent::StreamFailed {
                stream: self.kind,
                error: e,
            },
        };
        event::post(&self.events, event);
    }

    fn stream(&self, ready: &mut bool) -> Result<(), MediaError> {
        let response = self.connect().map_err(|e| MediaError::Network(format!("{e:#}")))?;
        let mut decoder = TrackDecoder::open_stream(response, extension_hint(&self.url))
            .map_err(|e| MediaError::Format(format!("{e:#}")))?;
        info!(
            "{}: {} Hz, {} channels",
            self.kind,
            decoder.sample_rate(),
            decoder.channels()
        );

        let mut resampler =
            StreamResampler::new(decoder.sample_rate(), self.format).map_err(MediaError::decode)?;

        while let Some(chunk) = decoder.next_chunk().map_err(MediaError::decode)? {
            let samples = resampler.push(&chunk).map_err(MediaError::decode)?;
            if !self.queue.push(&samples) {
                return Ok(());
            }
            self.mark_ready(ready);
        }

        let tail = resampler.finish().map_err(MediaError::decode)?;
        if !self.queue.push(&tail) {
            return Ok(());
        }

        if *ready {
            self.queue.finish_input();
        }
        debug!("{} download complete", self.kind);
        Ok(())
    }

    fn mark_ready(&self, ready: &mut bool) {
        if *ready || self.queue.buffered() < self.prebuffer {
            return;
        }
        *ready = true;
        event::post(
            &self.events,
            ScreenEvent::StreamPrepared {
                stream: self.kind,
                result: Ok(()),
            },
        );
    }

    fn connect(&self) -> Result<reqwest::blocking::Response> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .get(self.url.clone())
            .send()
            .with_context(|| format!("Request to {} failed", self.url))?
            .error_for_status()
            .context("Server rejected the request")?;

        if let Some(length) = response.content_length() {
            debug!("{}: {} bytes to download", self.kind, length);
        } else {
            warn!("{}: server did not report a content length", self.kind);
        }
        Ok(response)
    }
}
