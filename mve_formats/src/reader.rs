use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::error::MveError;

/// Forward-only view over the host-supplied byte source.
///
/// Every multi-byte field in an MVE container is little-endian except the
/// opcode tag, which is big-endian; both flavours live here so the mixed
/// endianness stays an explicit contract at the call sites.
pub(crate) struct ChunkReader<R> {
    inner: R,
}

impl<R: Read + Seek> ChunkReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn read_u16_le(&mut self, what: &'static str) -> Result<u16, MveError> {
        self.inner
            .read_u16::<LittleEndian>()
            .map_err(|err| truncated(err, what))
    }

    pub fn read_u16_be(&mut self, what: &'static str) -> Result<u16, MveError> {
        self.inner
            .read_u16::<BigEndian>()
            .map_err(|err| truncated(err, what))
    }

    pub fn read_u32_le(&mut self, what: &'static str) -> Result<u32, MveError> {
        self.inner
            .read_u32::<LittleEndian>()
            .map_err(|err| truncated(err, what))
    }

    pub fn read_exact(&mut self, buf: &mut [u8], what: &'static str) -> Result<(), MveError> {
        self.inner
            .read_exact(buf)
            .map_err(|err| truncated(err, what))
    }

    /// Read exactly `len` bytes, replacing the previous contents of `buf`.
    /// Buffers owned by the decoder are refilled in place across opcodes
    /// rather than reallocated.
    pub fn read_replace(
        &mut self,
        buf: &mut Vec<u8>,
        len: usize,
        what: &'static str,
    ) -> Result<(), MveError> {
        buf.clear();
        buf.resize(len, 0);
        self.inner
            .read_exact(buf)
            .map_err(|err| truncated(err, what))
    }

    pub fn skip(&mut self, len: u64, what: &'static str) -> Result<(), MveError> {
        self.inner
            .seek(SeekFrom::Current(len as i64))
            .map_err(|err| truncated(err, what))?;
        Ok(())
    }
}

fn truncated(err: std::io::Error, what: &'static str) -> MveError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        MveError::Truncated(what)
    } else {
        MveError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn reads_mixed_endianness() {
        let mut reader = ChunkReader::new(Cursor::new(vec![0x34, 0x12, 0x12, 0x34]));
        assert_eq!(reader.read_u16_le("le word").expect("le read"), 0x1234);
        assert_eq!(reader.read_u16_be("be word").expect("be read"), 0x1234);
    }

    #[test]
    fn maps_eof_to_truncated() {
        let mut reader = ChunkReader::new(Cursor::new(vec![0x00]));
        match reader.read_u32_le("dword") {
            Err(MveError::Truncated(what)) => assert_eq!(what, "dword"),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn read_replace_reuses_the_buffer() {
        let mut reader = ChunkReader::new(Cursor::new(vec![1, 2, 3, 4, 5]));
        let mut buf = vec![9; 16];
        reader
            .read_replace(&mut buf, 3, "payload")
            .expect("first fill");
        assert_eq!(buf, vec![1, 2, 3]);
        reader
            .read_replace(&mut buf, 2, "payload")
            .expect("second fill");
        assert_eq!(buf, vec![4, 5]);
    }
}
