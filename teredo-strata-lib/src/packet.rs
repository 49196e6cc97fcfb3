use std::fmt;
use std::mem;

use serde::Serialize;
use thiserror::Error;
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

use crate::cursor::Cursor;

pub mod ipv6;
pub mod protocol;
pub mod teredo;

/// Part of a Teredo frame a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    /// The 16-bit indicator/next-header selector
    Discriminator,
    /// Authentication header (type 0x0001)
    Authentication,
    /// Origin Indication header (type 0x0000)
    OriginIndication,
    /// Encapsulated payload and its handler
    Payload,
}

impl Section {
    pub fn name(&self) -> &'static str {
        match self {
            Section::Discriminator => "discriminator",
            Section::Authentication => "authentication",
            Section::OriginIndication => "origin indication",
            Section::Payload => "payload",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeredoError {
    #[error("read of {needed} bytes at offset {offset} exceeds buffer ({available} available)")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("{section} header at offset {offset} declares {declared} bytes, {available} available")]
    Truncated {
        section: Section,
        offset: usize,
        declared: usize,
        available: usize,
    },
    #[error("invalid {section} header at offset {offset}")]
    Invalid { section: Section, offset: usize },
    #[error("{handler} rejected payload at offset {offset}: {reason}")]
    InvalidPayload {
        handler: &'static str,
        offset: usize,
        reason: &'static str,
    },
}

impl TeredoError {
    /// Absolute offset the error was detected at
    pub fn offset(&self) -> usize {
        match self {
            TeredoError::OutOfBounds { offset, .. }
            | TeredoError::Truncated { offset, .. }
            | TeredoError::Invalid { offset, .. }
            | TeredoError::InvalidPayload { offset, .. } => *offset,
        }
    }
}

/// A frame that could not be decoded
///
/// Decoding stops at the first failure; nothing of the frame is reported
/// besides the section and the cursor position where it went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed Teredo frame at offset {offset} ({section}): {source}")]
pub struct MalformedFrame {
    pub section: Section,
    pub offset: usize,
    #[source]
    pub source: TeredoError,
}

impl MalformedFrame {
    pub fn new(section: Section, source: TeredoError) -> Self {
        MalformedFrame {
            section,
            offset: source.offset(),
            source,
        }
    }

    #[inline]
    pub fn kind(&self) -> &TeredoError {
        &self.source
    }
}

pub trait PacketHeader: Sized {
    const FIXED_LEN: usize = mem::size_of::<Self>();
    const SECTION: Section;

    /// Smallest number of bytes a complete header can occupy
    const MIN_LEN: usize = Self::FIXED_LEN;

    /// Returns the length of the header including its variable part
    fn total_len(&self) -> usize {
        Self::FIXED_LEN
    }

    /// check whether the fixed part is valid
    #[inline]
    fn is_valid(&self) -> bool {
        true
    }
}

pub trait HeaderParser: PacketHeader + FromBytes + KnownLayout + Immutable + Unaligned {
    /// The high-level view returned to the user.
    /// Can be `&'a Self` for fixed headers or a custom wrapper<'a> for variable ones.
    type Output<'a>
    where
        Self: 'a;

    /// Transform the raw struct and its variable-length tail into the Output type.
    ///
    /// `tail` is exactly `total_len() - FIXED_LEN` bytes long.
    fn into_view<'a>(header: &'a Self, tail: &'a [u8]) -> Self::Output<'a>;

    /// Parse the header at the cursor position, ensuring validity and length.
    ///
    /// On failure the cursor is left where it was.
    #[inline]
    fn parse<'a>(cursor: &mut Cursor<'a>) -> Result<Self::Output<'a>, TeredoError> {
        let offset = cursor.offset();
        let available = cursor.remaining();

        if available < Self::FIXED_LEN {
            return Err(TeredoError::Truncated {
                section: Self::SECTION,
                offset,
                declared: Self::MIN_LEN,
                available,
            });
        }

        let mut ahead = cursor.clone();
        let header = ahead.read_struct::<Self>()?;

        if !header.is_valid() {
            return Err(TeredoError::Invalid {
                section: Self::SECTION,
                offset,
            });
        }

        // the header itself says how big it is
        let total_len = header.total_len();
        if available < total_len {
            return Err(TeredoError::Truncated {
                section: Self::SECTION,
                offset,
                declared: total_len,
                available,
            });
        }

        let tail = ahead.read_bytes(total_len - Self::FIXED_LEN)?;
        *cursor = ahead;

        Ok(Self::into_view(header, tail))
    }

    /// Parse from the start of a slice, returning the view and the rest
    #[inline]
    fn from_bytes<'a>(buf: &'a [u8]) -> Result<(Self::Output<'a>, &'a [u8]), TeredoError> {
        let mut cursor = Cursor::new(buf);
        let view = Self::parse(&mut cursor)?;
        Ok((view, cursor.rest()))
    }
}
