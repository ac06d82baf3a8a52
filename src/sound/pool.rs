//! Sound pool backed by symphonia decoding and a single cpal voice.
//!
//! Clips are decoded in full on a worker thread and converted to the output
//! device's format up front, so triggering one is a pointer swap on the audio
//! thread. Only one voice exists: a new trigger replaces the clip in flight.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::audio::resample::convert_all;
use crate::audio::{AudioOutput, OutputFormat, PcmSource, TrackDecoder};
use crate::error::MediaError;
use crate::event::{self, EventSender, ScreenEvent};

use super::{SampleId, SoundPool};

struct Playing {
    samples: Arc<Vec<f32>>,
    position: usize,
    volume: f32,
}

/// The single voice the pool plays through.
#[derive(Default)]
struct Voice {
    current: Mutex<Option<Playing>>,
}

impl Voice {
    fn start(&self, samples: Arc<Vec<f32>>, volume: f32) {
        *self.current.lock().unwrap() = Some(Playing {
            samples,
            position: 0,
            volume,
        });
    }

    fn stop(&self) {
        *self.current.lock().unwrap() = None;
    }
}

impl PcmSource for Voice {
    fn fill(&self, out: &mut [f32]) -> usize {
        let Ok(mut current) = self.current.try_lock() else {
            return 0;
        };
        let Some(playing) = current.as_mut() else {
            return 0;
        };

        let remaining = &playing.samples[playing.position..];
        let written = remaining.len().min(out.len());
        for (dst, &src) in out.iter_mut().zip(&remaining[..written]) {
            *dst = src * playing.volume;
        }
        playing.position += written;

        if playing.position >= playing.samples.len() {
            *current = None;
        }
        written
    }
}

pub struct CpalSoundPool {
    events: EventSender,
    voice: Arc<Voice>,
    output: Option<AudioOutput>,
    samples: Arc<Mutex<HashMap<SampleId, Arc<Vec<f32>>>>>,
    next_id: u32,
    live: Arc<AtomicBool>,
}

impl CpalSoundPool {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            voice: Arc::new(Voice::default()),
            output: None,
            samples: Arc::new(Mutex::new(HashMap::new())),
            next_id: 1,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    fn output_format(&mut self) -> Result<OutputFormat, MediaError> {
        if let Some(output) = &self.output {
            return Ok(output.format());
        }

        let output = AudioOutput::open(self.voice.clone(), |err| {
            error!("An error occurred on the sound effect stream: {}", err)
        })
        .map_err(|e| MediaError::Output(format!("{e:#}")))?;
        let format = output.format();
        self.output = Some(output);
        Ok(format)
    }
}

impl SoundPool for CpalSoundPool {
    fn load(&mut self, asset: &Path) -> SampleId {
        let id = SampleId(self.next_id);
        self.next_id += 1;

        let format = match self.output_format() {
            Ok(format) => format,
            Err(e) => {
                event::post(
                    &self.events,
                    ScreenEvent::SoundLoaded {
                        sample_id: id,
                        result: Err(e),
                    },
                );
                return id;
            }
        };

        let path = asset.to_path_buf();
        let events = self.events.clone();
        let samples = self.samples.clone();
        let live = self.live.clone();

        thread::spawn(move || {
            let result = decode_asset(&path, format);

            if !live.load(Ordering::Acquire) {
                debug!("Sound pool released before {} finished loading", path.display());
                return;
            }

            let result = match result {
                Ok(decoded) => {
                    info!(
                        "Decoded {} ({} samples)",
                        path.display(),
                        decoded.len()
                    );
                    samples.lock().unwrap().insert(id, Arc::new(decoded));
                    Ok(())
                }
                Err(e) => Err(MediaError::Asset(format!("{}: {e:#}", path.display()))),
            };

            event::post(
                &events,
                ScreenEvent::SoundLoaded {
                    sample_id: id,
                    result,
                },
            );
        });

        id
    }

    fn play(&mut self, sample: SampleId, volume: f32) -> Result<(), MediaError> {
        if !self.live.load(Ordering::Acquire) {
            return Err(MediaError::Released);
        }

        let clip = self
            .samples
            .lock()
            .unwrap()
            .get(&sample)
            .cloned()
            .ok_or_else(|| MediaError::Asset(format!("sample {} is not loaded", sample.0)))?;

        self.voice.start(clip, volume.clamp(0.0, 1.0));
        Ok(())
    }

    fn release(&mut self) {
        if !self.live.swap(false, Ordering::AcqRel) {
            return;
        }
        self.voice.stop();
        self.output = None;
        self.samples.lock().unwrap().clear();
        info!("Sound pool released");
    }
}

fn decode_asset(path: &Path, format: OutputFormat) -> Result<Vec<f32>> {
    let decoder = TrackDecoder::open_file(path)?;
    let source_rate = decoder.sample_rate();
    let planar = decoder.decode_to_end()?;
    convert_all(&planar, source_rate, format)
}
