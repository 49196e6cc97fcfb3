//! Teredo Authentication header
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Type (0x0001)         |   ID-len      |  AU-len       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Client Identifier                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   Authentication Value                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         Nonce                                 |
//! |                       (8 bytes)                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  Confirmation |
//! +-+-+-+-+-+-+-+-+
//! ```
//!
//! Nothing here is verified: the nonce and confirmation byte are extracted
//! as they appear on the wire.
//!
//! # Examples
//!
//! ```
//! use teredo_strata::cursor::Cursor;
//! use teredo_strata::packet::teredo::TeredoAuthHeader;
//! use teredo_strata::packet::HeaderParser;
//!
//! let mut packet = vec![0x00, 0x01, 0x00, 0x00];   // type, ID-len 0, AU-len 0
//! packet.extend_from_slice(&[0xAA; 8]);            // nonce
//! packet.push(0x00);                               // confirmation
//! packet.extend_from_slice(&[0x60, 0x00]);         // start of payload
//!
//! let mut cursor = Cursor::new(&packet);
//! let auth = TeredoAuthHeader::parse(&mut cursor).unwrap();
//! assert_eq!(cursor.offset(), 13);
//! assert_eq!(auth.nonce, [0xAA; 8]);
//! assert!(auth.is_confirmed());
//! ```

use std::fmt::{self, Formatter};

use zerocopy::byteorder::{BigEndian, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::TEREDO_TYPE_AUTH;
use crate::packet::{HeaderParser, PacketHeader, Section};

/// Teredo Authentication header (fixed part, 4 bytes)
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Unaligned, Debug, Clone, Copy, KnownLayout, Immutable)]
pub struct TeredoAuthHeader {
    indicator_type: U16<BigEndian>,
    id_len: u8,
    auth_len: u8,
}

impl TeredoAuthHeader {
    /// Size of the nonce field in bytes
    pub const NONCE_SIZE: usize = 8;

    /// Size of the confirmation byte
    pub const CONFIRMATION_SIZE: usize = 1;

    #[inline]
    pub fn indicator_type(&self) -> u16 {
        self.indicator_type.get()
    }

    /// Returns the client identifier length
    #[inline]
    pub fn id_len(&self) -> u8 {
        self.id_len
    }

    /// Returns the authentication value length
    #[inline]
    pub fn auth_len(&self) -> u8 {
        self.auth_len
    }
}

impl PacketHeader for TeredoAuthHeader {
    const SECTION: Section = Section::Authentication;
    const MIN_LEN: usize = Self::FIXED_LEN + Self::NONCE_SIZE + Self::CONFIRMATION_SIZE;

    /// `4 + ID-len + AU-len + 8 + 1`
    #[inline]
    fn total_len(&self) -> usize {
        Self::MIN_LEN + self.id_len as usize + self.auth_len as usize
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.indicator_type() == TEREDO_TYPE_AUTH
    }
}

/// Teredo Authentication with parsed fields
#[derive(Debug, Clone)]
pub struct Authentication<'a> {
    /// Fixed header part
    pub header: &'a TeredoAuthHeader,
    /// Client identifier, empty when ID-len is zero
    pub client_id: &'a [u8],
    /// Authentication value, empty when AU-len is zero
    pub auth_value: &'a [u8],
    pub nonce: [u8; TeredoAuthHeader::NONCE_SIZE],
    /// Zero when the server confirmed the client
    pub confirmation: u8,
}

impl Authentication<'_> {
    #[inline]
    pub fn total_len(&self) -> usize {
        self.header.total_len()
    }

    #[inline]
    pub fn is_confirmed(&self) -> bool {
        self.confirmation == 0
    }
}

impl std::ops::Deref for Authentication<'_> {
    type Target = TeredoAuthHeader;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.header
    }
}

impl HeaderParser for TeredoAuthHeader {
    type Output<'a> = Authentication<'a>;

    fn into_view<'a>(header: &'a Self, tail: &'a [u8]) -> Self::Output<'a> {
        let (client_id, rest) = tail.split_at(header.id_len() as usize);
        let (auth_value, rest) = rest.split_at(header.auth_len() as usize);
        let (nonce, rest) = rest.split_at(TeredoAuthHeader::NONCE_SIZE);

        let mut nonce_bytes = [0u8; TeredoAuthHeader::NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce);

        Authentication {
            header,
            client_id,
            auth_value,
            nonce: nonce_bytes,
            confirmation: rest[0],
        }
    }
}

impl fmt::Display for Authentication<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TeredoAuth id_len={} auth_len={} confirmation={}",
            self.id_len(),
            self.auth_len(),
            self.confirmation
        )
    }
}
