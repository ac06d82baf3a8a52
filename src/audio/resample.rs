//! Conversion from decoded tracks to the output device's format.

use anyhow::Result;
use rubato::{FftFixedIn, Resampler};

use super::output::OutputFormat;

const CHUNK_SIZE: usize = 1024;

/// Converts planar chunks at the source rate into interleaved samples in the
/// output format. Input may arrive in pieces of any size; call
/// [`finish`](Self::finish) once to flush the tail.
pub struct StreamResampler {
    resampler: Option<FftFixedIn<f64>>,
    chunk_size: usize,
    pending: Vec<Vec<f64>>,
    frames_in: u64,
    frames_out: u64,
    source_rate: u32,
    target: OutputFormat,
}

impl StreamResampler {
    pub fn new(source_rate: u32, target: OutputFormat) -> Result<Self> {
        let resampler = if source_rate == target.sample_rate {
            None
        } else {
            Some(FftFixedIn::<f64>::new(
                source_rate as usize,
                target.sample_rate as usize,
                CHUNK_SIZE,
                2,
                target.channels,
            )?)
        };

        let chunk_size = resampler
            .as_ref()
            .map(|r| r.input_frames_next())
            .unwrap_or(CHUNK_SIZE);

        Ok(Self {
            resampler,
            chunk_size,
            pending: vec![Vec::new(); target.channels],
            frames_in: 0,
            frames_out: 0,
            source_rate,
            target,
        })
    }

    pub fn push(&mut self, input: &[Vec<f32>]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        for (ch, pending) in self.pending.iter_mut().enumerate() {
            let src = &input[ch % input.len()];
            pending.extend(src.iter().map(|&s| s as f64));
        }
        self.frames_in += input[0].len() as u64;

        let mut output = Vec::new();
        match self.resampler.as_mut() {
            None => {
                interleave(&self.pending, &mut output);
                for pending in &mut self.pending {
                    pending.clear();
                }
            }
            Some(resampler) => {
                while self.pending[0].len() >= self.chunk_size {
                    let chunk_size = self.chunk_size;
                    let chunk: Vec<Vec<f64>> = self
                        .pending
                        .iter_mut()
                        .map(|p| p.drain(..chunk_size).collect())
                        .collect();
                    let resampled = resampler.process(&chunk, None)?;
                    interleave(&resampled, &mut output);
                }
            }
        }

        self.frames_out += (output.len() / self.target.channels.max(1)) as u64;
        Ok(output)
    }

    /// Flushes buffered input, padding with silence, and trims the output so
    /// the total length matches the rate ratio exactly.
    pub fn finish(&mut self) -> Result<Vec<f32>> {
        let mut output = Vec::new();
        let channels = self.target.channels.max(1);

        match self.resampler.as_mut() {
            None => interleave(&self.pending, &mut output),
            Some(resampler) => {
                let expected_total = (self.frames_in * self.target.sample_rate as u64)
                    .div_ceil(self.source_rate as u64);
                let chunk_size = self.chunk_size;

                // The FFT stages hold back part of the signal, so feed silence
                // until everything has come out.
                let mut rounds = 0;
                while self.frames_out + ((output.len() / channels) as u64) < expected_total
                    && rounds < 4
                {
                    let chunk: Vec<Vec<f64>> = self
                        .pending
                        .iter_mut()
                        .map(|p| {
                            let mut data: Vec<f64> = p.drain(..).collect();
                            data.resize(chunk_size, 0.0);
                            data
                        })
                        .collect();
                    let resampled = resampler.process(&chunk, None)?;
                    interleave(&resampled, &mut output);
                    rounds += 1;
                }

                let allowed = expected_total.saturating_sub(self.frames_out) as usize;
                output.truncate(allowed * channels);
            }
        }

        for pending in &mut self.pending {
            pending.clear();
        }
        self.frames_out += (output.len() / channels) as u64;
        Ok(output)
    }
}

fn interleave(planar: &[Vec<f64>], output: &mut Vec<f32>) {
    let frames = planar.first().map(|c| c.len()).unwrap_or(0);
    output.reserve(frames * planar.len());
    for frame_idx in 0..frames {
        for channel in planar {
            output.push(channel[frame_idx] as f32);
        }
    }
}

/// Converts a whole decoded track in one go.
pub fn convert_all(planar: &[Vec<f32>], source_rate: u32, target: OutputFormat) -> Result<Vec<f32>> {
    let mut resampler = StreamResampler::new(source_rate, target)?;
    let mut output = resampler.push(planar)?;
    output.extend(resampler.finish()?);
    Ok(output)
}
