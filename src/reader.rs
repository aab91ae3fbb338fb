//! Big-endian scalar reads over a seekable byte stream.

use std::io::{Read, Seek, SeekFrom};

use crate::error::FontError;

/// Any seekable byte source a font can be decoded from.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Reads TrueType scalar types (all big-endian) from a stream.
///
/// Every read can fail; a short read surfaces as `FontError::Io` with
/// `UnexpectedEof` and is never retried.
pub struct BinaryReader<R> {
    inner: R,
}

impl<R: Read + Seek> BinaryReader<R> {
    pub fn new(inner: R) -> Self {
        BinaryReader { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], FontError> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8, FontError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, FontError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, FontError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, FontError> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, FontError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, FontError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// 16.16 fixed point, returned raw.
    pub fn read_fixed(&mut self) -> Result<i32, FontError> {
        self.read_i32()
    }

    /// 2.14 fixed point as used by composite glyph scales (0x4000 = 1.0).
    pub fn read_f2dot14(&mut self) -> Result<f64, FontError> {
        Ok(f64::from(self.read_i16()?) / f64::from(0x4000))
    }

    pub fn read_tag(&mut self) -> Result<[u8; 4], FontError> {
        self.read_array()
    }

    pub fn seek(&mut self, pos: u64) -> Result<(), FontError> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn skip(&mut self, n: i64) -> Result<(), FontError> {
        self.inner.seek(SeekFrom::Current(n))?;
        Ok(())
    }

    pub fn position(&mut self) -> Result<u64, FontError> {
        Ok(self.inner.stream_position()?)
    }
}
