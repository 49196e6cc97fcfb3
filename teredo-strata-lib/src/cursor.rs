//! Bounds-checked sequential reader over an immutable byte buffer
//!
//! [`Cursor`] tracks an offset in `[0, len]` and exposes typed big-endian
//! reads. Every read either consumes exactly the requested number of bytes
//! or fails with [`TeredoError::OutOfBounds`] leaving the offset untouched,
//! so a reader can never step past the end of the buffer.
//!
//! # Examples
//!
//! ```
//! use teredo_strata::cursor::Cursor;
//!
//! let buf = [0x00, 0x01, 0x02, 0x03, 0x04];
//! let mut cursor = Cursor::new(&buf);
//!
//! assert_eq!(cursor.peek_u16_be().unwrap(), 0x0001);
//! assert_eq!(cursor.read_u16_be().unwrap(), 0x0001);
//! assert_eq!(cursor.read_u8().unwrap(), 0x02);
//! assert_eq!(cursor.remaining(), 2);
//! assert!(cursor.read_bytes(3).is_err());
//! assert_eq!(cursor.offset(), 3);
//! ```

use zerocopy::{FromBytes, Immutable, KnownLayout, Ref, Unaligned};

use crate::packet::TeredoError;

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, offset: 0 }
    }

    /// Current position, always `<= len()`
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of unread bytes
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Unread part of the buffer, without advancing
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.offset..]
    }

    #[inline]
    fn ensure(&self, needed: usize) -> Result<(), TeredoError> {
        if self.remaining() < needed {
            return Err(TeredoError::OutOfBounds {
                offset: self.offset,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn peek_u8(&self) -> Result<u8, TeredoError> {
        self.ensure(1)?;
        Ok(self.buf[self.offset])
    }

    /// Reads a big-endian u16 without advancing
    #[inline]
    pub fn peek_u16_be(&self) -> Result<u16, TeredoError> {
        self.ensure(2)?;
        Ok(u16::from_be_bytes([
            self.buf[self.offset],
            self.buf[self.offset + 1],
        ]))
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, TeredoError> {
        let value = self.peek_u8()?;
        self.offset += 1;
        Ok(value)
    }

    #[inline]
    pub fn read_u16_be(&mut self) -> Result<u16, TeredoError> {
        let value = self.peek_u16_be()?;
        self.offset += 2;
        Ok(value)
    }

    /// Borrows the next `n` bytes and advances past them
    #[inline]
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], TeredoError> {
        self.ensure(n)?;
        let bytes = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    #[inline]
    pub fn skip(&mut self, n: usize) -> Result<(), TeredoError> {
        self.ensure(n)?;
        self.offset += n;
        Ok(())
    }

    /// Maps the next `size_of::<T>()` bytes onto a zero-copy header view
    #[inline]
    pub fn read_struct<T>(&mut self) -> Result<&'a T, TeredoError>
    where
        T: FromBytes + KnownLayout + Immutable + Unaligned,
    {
        let needed = std::mem::size_of::<T>();
        let (header_ref, _) = Ref::<_, T>::from_prefix(self.rest()).map_err(|_| {
            TeredoError::OutOfBounds {
                offset: self.offset,
                needed,
                available: self.remaining(),
            }
        })?;
        self.offset += needed;
        Ok(Ref::into_ref(header_ref))
    }
}
