//! Bounds-checked access to the loaded container.

use std::fmt;
use std::io::Cursor;

use binrw::{BinRead, Endian};
use byteorder::{ByteOrder, LittleEndian};

use crate::error::{FormatError, Result};
use crate::types::Record;

/// Read-only view over a byte buffer
///
/// Every accessor validates the requested range first and fails with
/// [`FormatError::Truncated`] instead of reading past the end.
#[derive(Clone, Copy)]
pub struct ByteView<'a> {
    data: &'a [u8],
}

impl fmt::Debug for ByteView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ByteView({} bytes)", self.data.len())
    }
}

impl<'a> ByteView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole underlying buffer
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Borrow `len` bytes starting at `offset`
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                FormatError::Truncated {
                    offset,
                    needed: len,
                    available: self.data.len(),
                }
                .into()
            })
    }

    /// Borrow everything from `offset` to the end of the buffer
    pub fn tail(&self, offset: usize) -> Result<&'a [u8]> {
        self.slice(offset, self.data.len().saturating_sub(offset))
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.slice(offset, 4)?))
    }

    /// Decode a fixed-size record at `offset`
    pub fn read_record<T>(&self, offset: usize) -> Result<T>
    where
        T: Record + for<'b> BinRead<Args<'b> = ()>,
    {
        let bytes = self.slice(offset, T::SIZE)?;
        Ok(T::read_options(&mut Cursor::new(bytes), Endian::Little, ())?)
    }

    /// Read a null terminated string starting at `offset`
    ///
    /// Returns `None` when no terminator exists before the end of the buffer.
    pub fn c_str_at(&self, offset: usize) -> Option<&'a [u8]> {
        let rest = self.data.get(offset..)?;
        let end = rest.iter().position(|b| *b == 0)?;
        Some(&rest[..end])
    }
}
