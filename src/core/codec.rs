//! Canonical Byte Codec
//!
//! Little-endian fixed-width integers and Bitcoin-style compact sizes.
//! The reader only accepts the encoding the writer produces, so every
//! value has exactly one byte representation.

use thiserror::Error;

/// Errors raised while reading canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended before a field was complete.
    #[error("unexpected end of input reading {field}")]
    Truncated {
        /// Field being read.
        field: &'static str,
    },
    /// Bytes remain after the last field.
    #[error("{0} trailing bytes")]
    TrailingBytes(usize),
    /// Compact size used a wider form than required.
    #[error("non-canonical compact size")]
    NonCanonicalSize,
    /// Length prefix exceeds the allowed maximum.
    #[error("{field} count {got} exceeds maximum {max}")]
    TooLarge {
        /// Field being read.
        field: &'static str,
        /// Decoded count.
        got: u64,
        /// Allowed maximum.
        max: u64,
    },
    /// Unknown format version.
    #[error("unsupported version {0}")]
    UnsupportedVersion(u8),
}

/// Append-only canonical writer.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    /// Write a u8 value.
    #[inline]
    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write a u32 value (little-endian).
    #[inline]
    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a u64 value (little-endian).
    #[inline]
    pub fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write an i64 value (little-endian).
    #[inline]
    pub fn put_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write raw bytes with no length prefix.
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a compact size length prefix.
    pub fn put_compact_size(&mut self, value: u64) {
        match value {
            0..=0xfc => self.put_u8(value as u8),
            0xfd..=0xffff => {
                self.put_u8(0xfd);
                self.buf.extend_from_slice(&(value as u16).to_le_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.put_u8(0xfe);
                self.put_u32(value as u32);
            }
            _ => {
                self.put_u8(0xff);
                self.put_u64(value);
            }
        }
    }

    /// Bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over canonical bytes.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Take the next `len` bytes.
    pub fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::Truncated { field })?;
        let slice = self.data.get(self.pos..end).ok_or(DecodeError::Truncated { field })?;
        self.pos = end;
        Ok(slice)
    }

    /// Read a fixed-size array.
    pub fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    /// Read a u8 value.
    pub fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.array::<1>(field)?[0])
    }

    /// Read a u32 value (little-endian).
    pub fn u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array(field)?))
    }

    /// Read a u64 value (little-endian).
    pub fn u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.array(field)?))
    }

    /// Read an i64 value (little-endian).
    pub fn i64(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.array(field)?))
    }

    /// Read a compact size and bound it by `max`.
    pub fn compact_size(&mut self, field: &'static str, max: u64) -> Result<u64, DecodeError> {
        let value = match self.u8(field)? {
            0xfd => {
                let v = u16::from_le_bytes(self.array(field)?) as u64;
                if v < 0xfd {
                    return Err(DecodeError::NonCanonicalSize);
                }
                v
            }
            0xfe => {
                let v = self.u32(field)? as u64;
                if v <= 0xffff {
                    return Err(DecodeError::NonCanonicalSize);
                }
                v
            }
            0xff => {
                let v = self.u64(field)?;
                if v <= 0xffff_ffff {
                    return Err(DecodeError::NonCanonicalSize);
                }
                v
            }
            small => small as u64,
        };

        if value > max {
            return Err(DecodeError::TooLarge { field, got: value, max });
        }
        Ok(value)
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Fail if any bytes remain.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compact(value: u64) -> Vec<u8> {
        let mut w = Writer::new();
        w.put_compact_size(value);
        w.into_bytes()
    }

    #[test]
    fn test_compact_size_widths() {
        assert_eq!(compact(0), vec![0]);
        assert_eq!(compact(0xfc), vec![0xfc]);
        assert_eq!(compact(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(compact(0x1_0000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(compact(0x1_0000_0000).len(), 9);
    }

    #[test]
    fn test_compact_size_reads_back() {
        for value in [0u64, 1, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000] {
            let bytes = compact(value);
            let mut r = Reader::new(&bytes);
            assert_eq!(r.compact_size("n", u64::MAX).unwrap(), value);
            r.finish().unwrap();
        }
    }

    #[test]
    fn test_non_canonical_compact_size_rejected() {
        // 5 encoded in the 3-byte form
        let mut r = Reader::new(&[0xfd, 0x05, 0x00]);
        assert_eq!(r.compact_size("n", 1000), Err(DecodeError::NonCanonicalSize));
    }

    #[test]
    fn test_compact_size_bound() {
        let bytes = compact(1001);
        let mut r = Reader::new(&bytes);
        assert!(matches!(
            r.compact_size("stakes", 1000),
            Err(DecodeError::TooLarge { got: 1001, max: 1000, .. })
        ));
    }

    #[test]
    fn test_truncated_and_trailing() {
        let mut r = Reader::new(&[1, 2, 3]);
        assert_eq!(r.u32("vout"), Err(DecodeError::Truncated { field: "vout" }));

        let mut r = Reader::new(&[1, 2, 3]);
        r.u8("version").unwrap();
        assert_eq!(r.finish(), Err(DecodeError::TrailingBytes(2)));
    }

    #[test]
    fn test_integers_little_endian() {
        let mut w = Writer::new();
        w.put_u32(1);
        w.put_i64(-1);
        assert_eq!(&w.as_slice()[..4], &[1, 0, 0, 0]);
        assert_eq!(&w.as_slice()[4..], &[0xff; 8]);

        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.u32("a").unwrap(), 1);
        assert_eq!(r.i64("b").unwrap(), -1);
    }
}
