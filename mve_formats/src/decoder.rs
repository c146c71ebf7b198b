use std::io::{Read, Seek};

use serde::Serialize;

use crate::audio::{AudioQueue, AudioStream};
use crate::codec;
use crate::error::MveError;
use crate::palette::Palette;
use crate::reader::ChunkReader;
use crate::surface::{FrameBuffers, Plane, SurfaceView};

/// ASCII signature opening every MVE container.
const SIGNATURE: &[u8; 19] = b"Interplay MVE File\x1a";
/// The three 16-bit magic words following the signature.
const MAGIC: [u16; 3] = [0x001a, 0x0100, 0x1133];

/// Packets of this kind and above carry frame data; everything below is
/// configuration drained during `load`.
const FIRST_VIDEO_PACKET_KIND: u16 = 3;

const OP_END: u16 = 0x0000;
const OP_END_PACKET: u16 = 0x0100;
const OP_CREATE_TIMER: u16 = 0x0200;
const OP_INIT_AUDIO: u16 = 0x0300;
const OP_START_AUDIO: u16 = 0x0400;
const OP_INIT_VIDEO: u16 = 0x0502;
const OP_FRAME_FORMAT6: u16 = 0x0600;
const OP_SEND_VIDEO: u16 = 0x0701;
const OP_AUDIO_FRAME: u16 = 0x0800;
const OP_AUDIO_SILENCE: u16 = 0x0900;
const OP_SET_MODE: u16 = 0x0a00;
const OP_SET_PALETTE: u16 = 0x0c00;
const OP_SKIP_MAP: u16 = 0x0e00;
const OP_DECODING_MAP: u16 = 0x0f00;
const OP_FRAME_FORMAT10: u16 = 0x1000;

/// Frame cadence declared by the timer opcode, as the rational
/// `1e6 / (rate * subdivision)` frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameRate {
    pub numerator: u64,
    pub denominator: u64,
}

impl FrameRate {
    fn from_timer(rate: u32, subdivision: u16) -> Self {
        Self {
            numerator: 1_000_000,
            denominator: u64::from(rate) * u64::from(subdivision),
        }
    }

    pub fn frames_per_second(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

/// Geometry from the video-init opcode, in 8x8 blocks, along with the two
/// fields the opcode carries that decoding never consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoConfig {
    pub width_blocks: u16,
    pub height_blocks: u16,
    pub buffer_count: u16,
    pub true_color: u16,
}

/// Parameters from the audio-init opcode. `flags` is kept for inspection;
/// anything other than mono unsigned 8-bit is rejected at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioConfig {
    pub flags: u16,
    pub sample_rate: u16,
    pub buffer_len: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameFormat {
    None,
    Format6,
    Format10,
}

/// Outcome of handling a single opcode.
enum Step {
    /// Opcode handled; the current packet continues.
    Handled,
    /// End-packet marker; the next packet header has been read.
    PacketEnd,
    /// A send-video opcode executed; the front surface is presentable.
    FramePresented,
    /// Stream terminator.
    Finished,
}

/// Streaming decoder for Interplay MVE containers.
///
/// [`MveDecoder::load`] validates the header and drains the configuration
/// packets, leaving geometry, palette, timer and audio initialized. Each
/// [`MveDecoder::advance_frame`] call then consumes opcodes until the next
/// frame has been presented, queueing any audio encountered on the way.
/// Decoding is strictly forward; the source is read once, in order.
pub struct MveDecoder<R> {
    reader: ChunkReader<R>,
    done: bool,
    packet_kind: u16,
    frame_rate: Option<FrameRate>,
    video_config: Option<VideoConfig>,
    audio_config: Option<AudioConfig>,
    buffers: Option<FrameBuffers>,
    palette: Palette,
    audio: Option<AudioQueue>,
    frame_number: i32,
    frame_format: FrameFormat,
    frame_data: Vec<u8>,
    skip_map: Vec<u8>,
    decoding_map: Vec<u8>,
}

impl<R: Read + Seek> MveDecoder<R> {
    /// Validate the container header and drain the configuration packets,
    /// stopping at the first video packet.
    pub fn load(source: R) -> Result<Self, MveError> {
        let mut reader = ChunkReader::new(source);

        let mut prologue = [0u8; 25];
        match reader.read_exact(&mut prologue, "container prologue") {
            Ok(()) => {}
            Err(MveError::Truncated(_)) => return Err(MveError::InvalidSignature),
            Err(err) => return Err(err),
        }
        if &prologue[..SIGNATURE.len()] != SIGNATURE {
            return Err(MveError::InvalidSignature);
        }
        for (i, expected) in MAGIC.iter().enumerate() {
            let at = SIGNATURE.len() + i * 2;
            if u16::from_le_bytes([prologue[at], prologue[at + 1]]) != *expected {
                return Err(MveError::InvalidSignature);
            }
        }

        let mut decoder = Self {
            reader,
            done: false,
            packet_kind: 0,
            frame_rate: None,
            video_config: None,
            audio_config: None,
            buffers: None,
            palette: Palette::new(),
            audio: None,
            frame_number: -1,
            frame_format: FrameFormat::None,
            frame_data: Vec::new(),
            skip_map: Vec::new(),
            decoding_map: Vec::new(),
        };

        decoder.read_packet_header()?;
        while !decoder.done && decoder.packet_kind < FIRST_VIDEO_PACKET_KIND {
            if matches!(decoder.step()?, Step::Finished) {
                break;
            }
        }

        Ok(decoder)
    }

    /// Decode up to the next presented frame. `Ok(true)` means the front
    /// surface and palette are coherent for presentation; `Ok(false)`
    /// means the stream terminator was reached.
    pub fn advance_frame(&mut self) -> Result<bool, MveError> {
        if self.done {
            return Ok(false);
        }
        loop {
            match self.step()? {
                Step::FramePresented => return Ok(true),
                Step::Finished => return Ok(false),
                Step::Handled | Step::PacketEnd => {}
            }
        }
    }

    /// Read-only view of the frame presented by the last `advance_frame`.
    pub fn current_surface(&self) -> Option<SurfaceView<'_>> {
        self.buffers.as_ref().map(|buffers| buffers.view(Plane::Front))
    }

    /// Packed RGB triples for all 256 palette entries.
    pub fn palette(&self) -> &[u8; 768] {
        self.palette.data()
    }

    /// Expanded RGB color of one palette entry.
    pub fn palette_rgb(&self, index: u8) -> [u8; 3] {
        self.palette.rgb(index)
    }

    /// Whether the palette changed since the host last acknowledged it.
    pub fn palette_dirty(&self) -> bool {
        self.palette.is_dirty()
    }

    pub fn clear_palette_dirty(&mut self) {
        self.palette.mark_clean();
    }

    pub fn frame_rate(&self) -> Option<FrameRate> {
        self.frame_rate
    }

    /// Index of the last presented frame; -1 until the first send-video.
    pub fn frame_index(&self) -> i32 {
        self.frame_number
    }

    /// Surface dimensions in pixels.
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.buffers
            .as_ref()
            .map(|buffers| (buffers.width(), buffers.height()))
    }

    pub fn video_config(&self) -> Option<VideoConfig> {
        self.video_config
    }

    pub fn audio_config(&self) -> Option<AudioConfig> {
        self.audio_config
    }

    /// Handle to the queued PCM stream, present once audio is initialized.
    pub fn audio_stream(&self) -> Option<AudioStream> {
        self.audio.as_ref().map(AudioQueue::stream)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn read_packet_header(&mut self) -> Result<(), MveError> {
        let _packet_len = self.reader.read_u16_le("packet length")?;
        self.packet_kind = self.reader.read_u16_le("packet kind")?;
        if self.packet_kind > 5 {
            eprintln!(
                "[mve_formats] warning: packet kind {} outside the documented range",
                self.packet_kind
            );
        }
        Ok(())
    }

    /// Read and execute one opcode.
    fn step(&mut self) -> Result<Step, MveError> {
        let op_len = self.reader.read_u16_le("opcode length")?;
        let op_tag = self.reader.read_u16_be("opcode tag")?;

        match op_tag {
            OP_END => {
                expect_len(op_tag, op_len, 0)?;
                self.done = true;
                Ok(Step::Finished)
            }
            OP_END_PACKET => {
                expect_len(op_tag, op_len, 0)?;
                self.read_packet_header()?;
                Ok(Step::PacketEnd)
            }
            OP_CREATE_TIMER => {
                expect_len(op_tag, op_len, 6)?;
                let rate = self.reader.read_u32_le("timer rate")?;
                let subdivision = self.reader.read_u16_le("timer subdivision")?;
                if rate == 0 || subdivision == 0 {
                    return Err(MveError::BadConfiguration(format!(
                        "timer rate {rate} with subdivision {subdivision}"
                    )));
                }
                self.frame_rate = Some(FrameRate::from_timer(rate, subdivision));
                Ok(Step::Handled)
            }
            OP_INIT_AUDIO => {
                expect_len(op_tag, op_len, 8)?;
                let _unknown = self.reader.read_u16_le("audio init")?;
                let flags = self.reader.read_u16_le("audio flags")?;
                let sample_rate = self.reader.read_u16_le("audio sample rate")?;
                let buffer_len = self.reader.read_u16_le("audio buffer length")?;
                if flags & 0x0003 != 0 {
                    return Err(MveError::BadConfiguration(format!(
                        "audio flags {flags:#06x} request {}, {} samples",
                        if flags & 1 != 0 { "stereo" } else { "mono" },
                        if flags & 2 != 0 { "16-bit" } else { "8-bit" },
                    )));
                }
                self.audio_config = Some(AudioConfig {
                    flags,
                    sample_rate,
                    buffer_len,
                });
                self.audio = Some(AudioQueue::new(sample_rate));
                Ok(Step::Handled)
            }
            OP_START_AUDIO => {
                expect_len(op_tag, op_len, 0)?;
                Ok(Step::Handled)
            }
            OP_INIT_VIDEO => {
                expect_len(op_tag, op_len, 8)?;
                let width_blocks = self.reader.read_u16_le("video width")?;
                let height_blocks = self.reader.read_u16_le("video height")?;
                let buffer_count = self.reader.read_u16_le("video buffer count")?;
                let true_color = self.reader.read_u16_le("video color depth")?;
                if width_blocks == 0 || height_blocks == 0 {
                    return Err(MveError::BadConfiguration(format!(
                        "video geometry {width_blocks}x{height_blocks} blocks"
                    )));
                }
                self.video_config = Some(VideoConfig {
                    width_blocks,
                    height_blocks,
                    buffer_count,
                    true_color,
                });
                self.buffers = Some(FrameBuffers::new(
                    usize::from(width_blocks),
                    usize::from(height_blocks),
                ));
                Ok(Step::Handled)
            }
            OP_FRAME_FORMAT6 => {
                self.reader.read_replace(
                    &mut self.frame_data,
                    usize::from(op_len),
                    "format 6 frame data",
                )?;
                self.frame_format = FrameFormat::Format6;
                Ok(Step::Handled)
            }
            OP_SEND_VIDEO => {
                expect_len(op_tag, op_len, 6)?;
                // The palette range travels in the palette opcode; these
                // fields duplicate it for hosts that page palettes in.
                let _pal_start = self.reader.read_u16_le("frame palette start")?;
                let _pal_count = self.reader.read_u16_le("frame palette count")?;
                let _unknown = self.reader.read_u16_le("frame flags")?;
                self.frame_number += 1;
                match self.frame_format {
                    FrameFormat::Format6 => {
                        let buffers = self.buffers.as_mut().ok_or_else(|| {
                            MveError::BadConfiguration("frame data before video init".into())
                        })?;
                        codec::decode_format6(buffers, self.frame_number, &self.frame_data)?;
                    }
                    FrameFormat::Format10 => {
                        let buffers = self.buffers.as_mut().ok_or_else(|| {
                            MveError::BadConfiguration("frame data before video init".into())
                        })?;
                        codec::decode_format10(
                            buffers,
                            &self.skip_map,
                            &self.decoding_map,
                            &self.frame_data,
                        )?;
                    }
                    FrameFormat::None => {}
                }
                Ok(Step::FramePresented)
            }
            OP_AUDIO_FRAME => {
                let _seq = self.reader.read_u16_le("audio frame sequence")?;
                let _mask = self.reader.read_u16_le("audio frame mask")?;
                let len = self.reader.read_u16_le("audio frame length")?;
                if usize::from(op_len) != usize::from(len) + 6 {
                    return Err(MveError::BadConfiguration(format!(
                        "audio frame declares {len} sample bytes in a {op_len}-byte payload"
                    )));
                }
                let audio = self.audio.as_ref().ok_or_else(|| {
                    MveError::BadConfiguration("audio frame before audio init".into())
                })?;
                let mut samples = vec![0u8; usize::from(len)];
                self.reader.read_exact(&mut samples, "audio samples")?;
                audio.queue_buffer(samples);
                Ok(Step::Handled)
            }
            OP_AUDIO_SILENCE => {
                expect_len(op_tag, op_len, 6)?;
                let _seq = self.reader.read_u16_le("silent frame sequence")?;
                let _mask = self.reader.read_u16_le("silent frame mask")?;
                let len = self.reader.read_u16_le("silent frame length")?;
                // Materialized so hosts that schedule by queued sample
                // count keep audio and video in step.
                if let Some(audio) = &self.audio {
                    audio.queue_silence(usize::from(len));
                }
                Ok(Step::Handled)
            }
            OP_SET_MODE => {
                expect_len(op_tag, op_len, 6)?;
                let _width = self.reader.read_u16_le("mode width")?;
                let _height = self.reader.read_u16_le("mode height")?;
                let _flags = self.reader.read_u16_le("mode flags")?;
                Ok(Step::Handled)
            }
            OP_SET_PALETTE => {
                let pal_start = self.reader.read_u16_le("palette start")?;
                let pal_count = self.reader.read_u16_le("palette count")?;
                if usize::from(op_len) < usize::from(pal_count) * 3 + 2 {
                    return Err(MveError::BadConfiguration(format!(
                        "palette payload of {op_len} bytes for {pal_count} entries"
                    )));
                }
                if usize::from(pal_start) + usize::from(pal_count) > 256 {
                    return Err(MveError::BadConfiguration(format!(
                        "palette range {pal_start}+{pal_count} beyond 256 entries"
                    )));
                }
                let mut triples = vec![0u8; usize::from(pal_count) * 3];
                self.reader.read_exact(&mut triples, "palette entries")?;
                self.palette.set_range(usize::from(pal_start), &triples);
                if pal_count & 1 != 0 {
                    self.reader.skip(1, "palette padding")?;
                }
                Ok(Step::Handled)
            }
            OP_SKIP_MAP => {
                self.reader
                    .read_replace(&mut self.skip_map, usize::from(op_len), "skip map")?;
                Ok(Step::Handled)
            }
            OP_DECODING_MAP => {
                self.reader.read_replace(
                    &mut self.decoding_map,
                    usize::from(op_len),
                    "decoding map",
                )?;
                Ok(Step::Handled)
            }
            OP_FRAME_FORMAT10 => {
                self.reader.read_replace(
                    &mut self.frame_data,
                    usize::from(op_len),
                    "format 10 frame data",
                )?;
                self.frame_format = FrameFormat::Format10;
                Ok(Step::Handled)
            }
            other => Err(MveError::UnknownOpcode(other)),
        }
    }
}

fn expect_len(tag: u16, actual: u16, expected: u16) -> Result<(), MveError> {
    if actual != expected {
        return Err(MveError::BadConfiguration(format!(
            "opcode {tag:#06x} carries {actual} payload bytes, expected {expected}"
        )));
    }
    Ok(())
}
