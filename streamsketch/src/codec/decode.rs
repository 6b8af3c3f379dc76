use std::io::Cursor;
use std::io::Read;

use byteorder::ReadBytesExt;
use byteorder::LE;

use crate::error::Error;
use crate::error::Result;

/// A wrapper around a byte slice that provides methods for reading the
/// little-endian fields of the sketch container format.
///
/// Every reader maps a short read to [`ErrorKind::MalformedData`] naming the
/// field that was being decoded.
///
/// [`ErrorKind::MalformedData`]: crate::error::ErrorKind::MalformedData
pub(crate) struct SketchSlice<'a> {
    slice: Cursor<&'a [u8]>,
}

impl<'a> SketchSlice<'a> {
    /// Creates a new `SketchSlice` from the given byte slice.
    pub fn new(slice: &'a [u8]) -> SketchSlice<'a> {
        SketchSlice {
            slice: Cursor::new(slice),
        }
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        let len = self.slice.get_ref().len() as u64;
        len.saturating_sub(self.slice.position()) as usize
    }

    /// Reads exactly `buf.len()` bytes from the slice into `buf`.
    pub fn read_exact(&mut self, buf: &mut [u8], field: &'static str) -> Result<()> {
        self.slice
            .read_exact(buf)
            .map_err(|_| Error::insufficient_data(field))
    }

    /// Reads a single byte from the slice and returns it as a `u8`.
    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        self.slice
            .read_u8()
            .map_err(|_| Error::insufficient_data(field))
    }

    /// Reads a 16-bit unsigned integer in little-endian byte order.
    pub fn read_u16_le(&mut self, field: &'static str) -> Result<u16> {
        self.slice
            .read_u16::<LE>()
            .map_err(|_| Error::insufficient_data(field))
    }

    /// Reads a 32-bit unsigned integer in little-endian byte order.
    pub fn read_u32_le(&mut self, field: &'static str) -> Result<u32> {
        self.slice
            .read_u32::<LE>()
            .map_err(|_| Error::insufficient_data(field))
    }

    /// Reads a 64-bit unsigned integer in little-endian byte order.
    pub fn read_u64_le(&mut self, field: &'static str) -> Result<u64> {
        self.slice
            .read_u64::<LE>()
            .map_err(|_| Error::insufficient_data(field))
    }

    /// Reads a 64-bit floating-point number in little-endian byte order.
    pub fn read_f64_le(&mut self, field: &'static str) -> Result<f64> {
        self.slice
            .read_f64::<LE>()
            .map_err(|_| Error::insufficient_data(field))
    }
}
