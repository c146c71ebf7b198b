//! Decoder for the Interplay MVE interleaved audio/video container.
//!
//! The container is a packet stream of length-prefixed opcodes: tags are
//! big-endian, every other multi-byte field little-endian. Video frames
//! are 8-bit paletted surfaces rebuilt block by block against two
//! reference planes; audio is unsigned 8-bit mono PCM handed to the host
//! through a thread-safe queued stream. Decoding is strictly forward:
//! [`MveDecoder::load`] validates the header and drains the configuration
//! packets, then each [`MveDecoder::advance_frame`] call decodes up to the
//! next presented frame.

mod audio;
mod codec;
mod decoder;
mod error;
mod palette;
mod reader;
mod skip;
mod surface;

pub use audio::AudioStream;
pub use decoder::{AudioConfig, FrameRate, MveDecoder, VideoConfig};
pub use error::MveError;
pub use surface::SurfaceView;
