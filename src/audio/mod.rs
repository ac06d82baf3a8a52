//! Audio decoding, resampling and device output.
//!
//! - [`decode`] - Track decoding with symphonia, from files or network bodies
//! - [`resample`] - Sample rate and channel layout conversion with rubato
//! - [`output`] - Speaker playback via cpal, fed by a [`PcmSource`]

pub mod decode;
pub mod output;
pub mod resample;

pub use decode::TrackDecoder;
pub use output::{AudioOutput, OutputFormat, PcmSource};
pub use resample::StreamResampler;
