//! Teredo Origin Indication header (8 bytes)
//!
//! Carries the original UDP source port and IPv4 address of the client, each
//! transmitted as its one's complement so that NATs rewriting addresses in
//! the payload leave them alone.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Type (0x0000)         |      Obfuscated Port          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   Obfuscated IPv4 Address                     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! # Examples
//!
//! ```
//! use teredo_strata::packet::teredo::TeredoOriginHeader;
//! use teredo_strata::packet::HeaderParser;
//! use std::net::Ipv4Addr;
//!
//! let mut packet = Vec::new();
//! packet.extend_from_slice(&0x0000u16.to_be_bytes());
//! packet.extend_from_slice(&(!0x1234u16).to_be_bytes());
//! packet.extend_from_slice(&(!0xC0A80164u32).to_be_bytes());
//! packet.push(0x60);
//!
//! let (origin, rest) = TeredoOriginHeader::from_bytes(&packet).unwrap();
//! assert_eq!(origin.port(), 0x1234);
//! assert_eq!(origin.ipv4_addr(), Ipv4Addr::new(192, 168, 1, 100));
//! assert_eq!(rest, &[0x60]);
//! ```

use std::fmt::{self, Formatter};
use std::net::Ipv4Addr;

use zerocopy::byteorder::{BigEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::TEREDO_TYPE_ORIGIN;
use crate::packet::{HeaderParser, PacketHeader, Section};

#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Unaligned, Debug, Clone, Copy, KnownLayout, Immutable)]
pub struct TeredoOriginHeader {
    indicator_type: U16<BigEndian>,
    obfuscated_port: U16<BigEndian>,
    obfuscated_ipv4: U32<BigEndian>,
}

impl TeredoOriginHeader {
    /// Builds the wire form of an origin indication for `port` and `addr`
    pub fn new(port: u16, addr: Ipv4Addr) -> Self {
        TeredoOriginHeader {
            indicator_type: U16::new(TEREDO_TYPE_ORIGIN),
            obfuscated_port: U16::new(!port),
            obfuscated_ipv4: U32::new(!u32::from(addr)),
        }
    }

    #[inline]
    pub fn indicator_type(&self) -> u16 {
        self.indicator_type.get()
    }

    /// Port exactly as transmitted
    #[inline]
    pub fn obfuscated_port(&self) -> u16 {
        self.obfuscated_port.get()
    }

    /// Original UDP port (bitwise NOT of the wire value)
    #[inline]
    pub fn port(&self) -> u16 {
        !self.obfuscated_port.get()
    }

    /// Address exactly as transmitted
    #[inline]
    pub fn obfuscated_ipv4(&self) -> u32 {
        self.obfuscated_ipv4.get()
    }

    /// Original IPv4 address (bitwise NOT of the wire value)
    #[inline]
    pub fn ipv4_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(!self.obfuscated_ipv4.get())
    }
}

impl PacketHeader for TeredoOriginHeader {
    const SECTION: Section = Section::OriginIndication;

    #[inline]
    fn is_valid(&self) -> bool {
        self.indicator_type() == TEREDO_TYPE_ORIGIN
    }
}

impl HeaderParser for TeredoOriginHeader {
    type Output<'a> = &'a TeredoOriginHeader;

    #[inline]
    fn into_view<'a>(header: &'a Self, _tail: &'a [u8]) -> Self::Output<'a> {
        header
    }
}

impl fmt::Display for TeredoOriginHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Teredo origin port={} ipv4={}",
            self.port(),
            self.ipv4_addr()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;
    use crate::packet::TeredoError;

    #[test]
    fn test_origin_header_size() {
        assert_eq!(std::mem::size_of::<TeredoOriginHeader>(), 8);
        assert_eq!(TeredoOriginHeader::FIXED_LEN, 8);
    }

    #[test]
    fn test_complement_is_not_byte_swap() {
        let header = TeredoOriginHeader::new(80, Ipv4Addr::new(10, 0, 0, 1));

        assert_eq!(header.obfuscated_port(), 0xFFAF);
        assert_eq!(header.obfuscated_ipv4(), 0xF5FF_FFFE);
        assert_eq!(header.port(), 80);
        assert_eq!(header.ipv4_addr(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(
            header.as_bytes(),
            &[0x00, 0x00, 0xFF, 0xAF, 0xF5, 0xFF, 0xFF, 0xFE]
        );
    }

    #[test]
    fn test_parse_advances_eight_bytes() {
        let header = TeredoOriginHeader::new(3544, Ipv4Addr::new(8, 8, 8, 8));
        let mut packet = header.as_bytes().to_vec();
        packet.extend_from_slice(&[0x60, 0x00]);

        let mut cursor = Cursor::new(&packet);
        let origin = TeredoOriginHeader::parse(&mut cursor).unwrap();
        assert_eq!(cursor.offset(), 8);
        assert_eq!(origin.port(), 3544);
        assert_eq!(origin.ipv4_addr(), Ipv4Addr::new(8, 8, 8, 8));
    }

    #[test]
    fn test_too_short_is_truncated() {
        let packet = [0x00, 0x00, 0xFF, 0xFF];
        let err = TeredoOriginHeader::from_bytes(&packet).unwrap_err();
        assert_eq!(
            err,
            TeredoError::Truncated {
                section: Section::OriginIndication,
                offset: 0,
                declared: 8,
                available: 4,
            }
        );
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        let mut packet = TeredoOriginHeader::new(1, Ipv4Addr::LOCALHOST)
            .as_bytes()
            .to_vec();
        packet[1] = 0x01;
        assert!(matches!(
            TeredoOriginHeader::from_bytes(&packet),
            Err(TeredoError::Invalid { .. })
        ));
    }

    #[test]
    fn test_display() {
        let header = TeredoOriginHeader::new(1234, Ipv4Addr::new(10, 0, 0, 1));
        let display = format!("{}", header);
        assert!(display.contains("Teredo"));
        assert!(display.contains("port=1234"));
        assert!(display.contains("10.0.0.1"));
    }
}
