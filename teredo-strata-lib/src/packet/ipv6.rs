//! IPv6 fixed header (RFC 8200)
//!
//! Only the 40-byte fixed header is decoded: enough for the default payload
//! handler to describe what a Teredo frame carries. Extension headers and
//! upper layers are left to whoever consumes the payload next.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |Version| Traffic Class |           Flow Label                  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Payload Length        |  Next Header  |   Hop Limit   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         Source Address                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      Destination Address                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! # Examples
//!
//! ```
//! use teredo_strata::packet::ipv6::Ipv6Header;
//! use teredo_strata::packet::HeaderParser;
//! use std::net::Ipv6Addr;
//!
//! let packet = vec![
//!     0x60, 0x00, 0x00, 0x00,  // Version=6, TC=0, Flow Label=0
//!     0x00, 0x08,              // Payload Length: 8 bytes
//!     0x3A,                    // Next Header: ICMPv6 (58)
//!     0x40,                    // Hop Limit: 64
//!     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
//!     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
//! ];
//!
//! let (header, payload) = Ipv6Header::from_bytes(&packet).unwrap();
//! assert_eq!(header.version(), 6);
//! assert_eq!(header.next_header(), 58);
//! assert_eq!(header.src_ip(), Ipv6Addr::LOCALHOST);
//! assert!(payload.is_empty());
//! ```

use std::fmt::{self, Formatter};
use std::net::Ipv6Addr;

use zerocopy::byteorder::{BigEndian, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::packet::{HeaderParser, PacketHeader, Section};

/// IPv6 Header structure as defined in RFC 8200
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout, Debug, Clone, Copy)]
pub struct Ipv6Header {
    /// Version (4 bits), Traffic Class (8 bits), Flow Label (20 bits)
    ver_tc_flow: [u8; 4],
    /// Payload length (excludes the header itself)
    payload_length: U16<BigEndian>,
    next_header: u8,
    hop_limit: u8,
    src_ip: [u8; 16],
    dst_ip: [u8; 16],
}

impl Ipv6Header {
    #[inline]
    pub fn version(&self) -> u8 {
        self.ver_tc_flow[0] >> 4
    }

    #[inline]
    pub fn traffic_class(&self) -> u8 {
        ((self.ver_tc_flow[0] & 0x0F) << 4) | (self.ver_tc_flow[1] >> 4)
    }

    /// Returns the Flow Label (20 bits)
    #[inline]
    pub fn flow_label(&self) -> u32 {
        let b1 = (self.ver_tc_flow[1] & 0x0F) as u32;
        let b2 = self.ver_tc_flow[2] as u32;
        let b3 = self.ver_tc_flow[3] as u32;
        (b1 << 16) | (b2 << 8) | b3
    }

    /// Returns the payload length in bytes, not including this header
    #[inline]
    pub fn payload_length(&self) -> u16 {
        self.payload_length.get()
    }

    #[inline]
    pub fn next_header(&self) -> u8 {
        self.next_header
    }

    #[inline]
    pub fn hop_limit(&self) -> u8 {
        self.hop_limit
    }

    #[inline]
    pub fn src_ip(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.src_ip)
    }

    #[inline]
    pub fn dst_ip(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.dst_ip)
    }
}

impl PacketHeader for Ipv6Header {
    const SECTION: Section = Section::Payload;

    #[inline]
    fn is_valid(&self) -> bool {
        self.version() == 6
    }
}

impl HeaderParser for Ipv6Header {
    type Output<'a> = &'a Ipv6Header;

    #[inline]
    fn into_view<'a>(header: &'a Self, _tail: &'a [u8]) -> Self::Output<'a> {
        header
    }
}

impl fmt::Display for Ipv6Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IPv6 {} -> {} next={} hop={} len={}",
            self.src_ip(),
            self.dst_ip(),
            self.next_header(),
            self.hop_limit(),
            self.payload_length()
        )
    }
}
