//! Audio track decoding using symphonia.
//!
//! [`TrackDecoder`] opens the first decodable track of any source symphonia can
//! probe (mp3, flac, wav, ogg, aac, mp4 soundtracks) and yields planar `f32`
//! chunks. Sources do not need to be seekable, so an HTTP body can be decoded
//! while it downloads.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// One `Vec` of samples per channel.
pub type Planar = Vec<Vec<f32>>;

fn extract_samples(decoded: &AudioBufferRef, channels: usize, output: &mut Planar) {
    let mut converted = decoded.make_equivalent::<f32>();
    decoded.convert(&mut converted);

    let source_channels = converted.spec().channels.count();
    if source_channels == 0 {
        return;
    }

    for (ch, out) in output.iter_mut().enumerate().take(channels) {
        out.extend_from_slice(converted.chan(ch % source_channels));
    }
}

/// Adapts a blocking reader that is only `Send` into something symphonia can share.
struct BlockingBody<R>(Mutex<R>);

impl<R: Read> Read for BlockingBody<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.0.get_mut() {
            Ok(reader) => reader.read(buf),
            Err(poisoned) => poisoned.into_inner().read(buf),
        }
    }
}

pub struct TrackDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
}

impl TrackDecoder {
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open audio file {}", path.display()))?;
        let extension = path.extension().and_then(|e| e.to_str());
        Self::open(Box::new(file), extension)
    }

    /// Decodes from a forward-only reader such as an HTTP response body.
    pub fn open_stream<R: Read + Send + 'static>(reader: R, extension: Option<&str>) -> Result<Self> {
        let source = ReadOnlySource::new(BlockingBody(Mutex::new(reader)));
        Self::open(Box::new(source), extension)
    }

    pub fn open(source: Box<dyn MediaSource>, extension: Option<&str>) -> Result<Self> {
        let mss = MediaSourceStream::new(source, Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("Failed to probe media format")?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| anyhow!("No supported audio track found"))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| anyhow!("Unknown sample rate"))?;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .unwrap_or(2);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Failed to create decoder")?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Decodes the next packet of the selected track.
    ///
    /// Returns `Ok(None)` once the source is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<Planar>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(e.into()),
            };

            let mut chunk: Planar = vec![Vec::new(); self.channels];
            extract_samples(&decoded, self.channels, &mut chunk);
            if chunk.first().is_some_and(|c| !c.is_empty()) {
                return Ok(Some(chunk));
            }
        }
    }

    pub fn decode_to_end(mut self) -> Result<Planar> {
        let mut all: Planar = vec![Vec::new(); self.channels];
        while let Some(chunk) = self.next_chunk()? {
            for (dst, src) in all.iter_mut().zip(chunk) {
                dst.extend(src);
            }
        }
        Ok(all)
    }
}

/// Guesses a format hint from the last path segment of a URL.
pub fn extension_hint(url: &url::Url) -> Option<&str> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}
