//! Block-wise frame reconstruction for the two MVE frame encodings.
//!
//! Both formats describe each 8x8 block with a 16-bit map word: zero calls
//! for a literal block from the frame payload, a non-zero word encodes a
//! signed displacement into one of the reference planes (or, for format 6,
//! the frame under construction itself). Format 6 rebuilds the front plane
//! directly in two passes; format 10 assembles the frame in the near
//! reference across three passes gated by a skip map, then swaps the
//! references.

use crate::error::MveError;
use crate::skip::SkipStream;
use crate::surface::{FrameBuffers, Plane};

/// Frame payloads open with a 14-byte header the reconstruction never
/// inspects.
const FRAME_HEADER_LEN: usize = 14;

/// Decode the 15-bit biased block displacement carried by a map word.
#[inline]
pub(crate) fn block_offset(op: u16) -> i32 {
    i32::from(op & 0x7fff) - 0x4000
}

fn read_map_word(map: &mut &[u8]) -> Result<u16, MveError> {
    if map.len() < 2 {
        return Err(MveError::MapExhausted("decoding map"));
    }
    let value = u16::from_le_bytes([map[0], map[1]]);
    *map = &map[2..];
    Ok(value)
}

/// Format 6: the decoding map is embedded in the frame payload at offset
/// 14, one word per block, followed by the literal block stream.
pub(crate) fn decode_format6(
    buffers: &mut FrameBuffers,
    frame_number: i32,
    frame_data: &[u8],
) -> Result<(), MveError> {
    let map_len = buffers.block_count() * 2;
    if frame_data.len() < FRAME_HEADER_LEN + map_len {
        return Err(MveError::MapExhausted("decoding map"));
    }
    let map_bytes = &frame_data[FRAME_HEADER_LEN..FRAME_HEADER_LEN + map_len];
    let mut literals = &frame_data[FRAME_HEADER_LEN + map_len..];

    buffers.rotate_for_delta_frame(frame_number);

    // Pass 1: literal blocks land now; delta blocks pull from the far
    // reference once two frames exist.
    let mut map = map_bytes;
    for block in 0..buffers.block_count() {
        let op = read_map_word(&mut map)?;
        if op == 0 {
            buffers.copy_literal_block(Plane::Front, block, &mut literals)?;
        } else if frame_number > 1 {
            buffers.copy_block(Plane::Front, Plane::Ref1, block, 0);
        }
    }

    // Pass 2: displaced copies. A set high bit selects the near reference;
    // clear means the front plane itself, which relies on the strict
    // row-major order of this pass.
    let mut map = map_bytes;
    for block in 0..buffers.block_count() {
        let op = read_map_word(&mut map)?;
        if op & 0x8000 != 0 {
            if frame_number > 0 {
                buffers.copy_block(Plane::Front, Plane::Ref0, block, block_offset(op));
            }
        } else if op != 0 {
            buffers.copy_block(Plane::Front, Plane::Front, block, block_offset(op));
        }
    }

    Ok(())
}

/// Format 10: a skip map gates each block, the decoding map travels in its
/// own opcode, and the frame is assembled in the near reference before a
/// final blit to the front plane. References swap afterwards, so skipped
/// blocks keep whatever the previous frame presented.
pub(crate) fn decode_format10(
    buffers: &mut FrameBuffers,
    skip_map: &[u8],
    decoding_map: &[u8],
    frame_data: &[u8],
) -> Result<(), MveError> {
    if frame_data.len() < FRAME_HEADER_LEN {
        return Err(MveError::Truncated("frame data header"));
    }
    let mut literals = &frame_data[FRAME_HEADER_LEN..];
    let mut skip = SkipStream::new(skip_map);

    // Pass 1: literal blocks into the near reference.
    let mut map = decoding_map;
    for block in 0..buffers.block_count() {
        if skip.skip()? {
            continue;
        }
        if read_map_word(&mut map)? == 0 {
            buffers.copy_literal_block(Plane::Ref0, block, &mut literals)?;
        }
    }

    // Pass 2: displaced copies; a set high bit picks the far reference,
    // otherwise the partially updated near reference is its own source.
    skip.reset();
    let mut map = decoding_map;
    for block in 0..buffers.block_count() {
        if skip.skip()? {
            continue;
        }
        let op = read_map_word(&mut map)?;
        if op != 0 {
            let src = if op & 0x8000 != 0 {
                Plane::Ref1
            } else {
                Plane::Ref0
            };
            buffers.copy_block(Plane::Ref0, src, block, block_offset(op));
        }
    }

    // Pass 3: present the touched blocks.
    skip.reset();
    for block in 0..buffers.block_count() {
        if skip.skip()? {
            continue;
        }
        buffers.copy_block(Plane::Front, Plane::Ref0, block, 0);
    }

    buffers.swap_references();
    Ok(())
}
