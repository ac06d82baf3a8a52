//! Speaker playback using cpal.
//!
//! An [`AudioOutput`] owns one cpal output stream on the default device and
//! pulls interleaved `f32` samples from a [`PcmSource`] on the audio thread.
//! Dropping the output stops the stream.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig, SupportedStreamConfig};
use dasp_sample::{FromSample, Sample as DaspSample};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub sample_rate: u32,
    pub channels: usize,
}

impl OutputFormat {
    pub fn samples_for(&self, duration: std::time::Duration) -> usize {
        (duration.as_secs_f64() * self.sample_rate as f64) as usize * self.channels
    }
}

/// Supplies interleaved samples to the audio thread.
pub trait PcmSource: Send + Sync {
    /// Writes up to `out.len()` samples and returns how many were written.
    /// The rest of the buffer is played as silence.
    fn fill(&self, out: &mut [f32]) -> usize;
}

pub struct AudioOutput {
    format: OutputFormat,
    _stream: Stream,
}

fn default_output() -> Result<(Device, SupportedStreamConfig)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("No default output device available")?;
    let supported = device
        .default_output_config()
        .context("Failed to query default output config")?;
    Ok((device, supported))
}

fn format_of(config: &StreamConfig) -> OutputFormat {
    OutputFormat {
        sample_rate: config.sample_rate,
        channels: config.channels as usize,
    }
}

impl AudioOutput {
    /// The format [`open`](Self::open) would use, without starting a stream.
    pub fn default_format() -> Result<OutputFormat> {
        let (_, supported) = default_output()?;
        Ok(format_of(&supported.config()))
    }

    /// Opens the default output device and starts pulling from `source`.
    ///
    /// `on_error` runs on the audio thread when the stream fails after start.
    pub fn open<E>(source: Arc<dyn PcmSource>, on_error: E) -> Result<Self>
    where
        E: Fn(String) + Send + 'static,
    {
        let (device, supported) = default_output()?;
        debug!("Output config: {supported:#?}");

        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let format = format_of(&config);

        let stream = match sample_format {
            SampleFormat::F32 => build_output_stream::<f32, E>(&device, &config, source, on_error)?,
            SampleFormat::I16 => build_output_stream::<i16, E>(&device, &config, source, on_error)?,
            SampleFormat::U16 => build_output_stream::<u16, E>(&device, &config, source, on_error)?,
            other => return Err(anyhow!("Unsupported sample format: {other:?}")),
        };
        stream.play().context("Failed to start output stream")?;

        info!(
            "Audio output started ({} Hz, {} channels)",
            format.sample_rate, format.channels
        );

        Ok(Self {
            format,
            _stream: stream,
        })
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

fn build_output_stream<T, E>(
    device: &Device,
    config: &StreamConfig,
    source: Arc<dyn PcmSource>,
    on_error: E,
) -> Result<Stream>
where
    T: cpal::SizedSample + FromSample<f32>,
    E: Fn(String) + Send + 'static,
{
    let mut scratch: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.clear();
            scratch.resize(data.len(), 0.0);
            let written = source.fill(&mut scratch).min(data.len());

            for (slot, &sample) in data.iter_mut().zip(&scratch[..written]) {
                *slot = T::from_sample(sample);
            }
            for slot in &mut data[written..] {
                *slot = T::from_sample(0.0f32);
            }
        },
        move |err| on_error(err.to_string()),
        None,
    )?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_samples_for_duration() {
        let format = OutputFormat {
            sample_rate: 48000,
            channels: 2,
        };
        assert_eq!(format.samples_for(Duration::from_millis(500)), 48000);
        assert_eq!(format.samples_for(Duration::ZERO), 0);
    }
}
