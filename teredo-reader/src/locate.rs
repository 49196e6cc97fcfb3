//! Finding the UDP payload inside a captured link-layer frame
//!
//! Teredo only runs over IPv4, so the walk is short: optional Ethernet (with
//! any number of VLAN tags) or Linux cooked header, an IPv4 header, and a UDP
//! header. Anything else is reported as [`Skip`].

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use pcap_parser::Linktype;
use teredo_strata::cursor::Cursor;
use teredo_strata::sink::Endpoints;
use zerocopy::{BigEndian, FromBytes, Immutable, KnownLayout, Unaligned, U16};

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_QINQ: u16 = 0x88A8;
const IPPROTO_UDP: u8 = 17;

#[repr(C, packed)]
#[derive(FromBytes, Unaligned, Immutable, KnownLayout, Debug, Clone, Copy)]
#[allow(dead_code)]
struct EthernetHeader {
    dst: [u8; 6],
    src: [u8; 6],
    ether_type: U16<BigEndian>,
}

#[repr(C, packed)]
#[derive(FromBytes, Unaligned, Immutable, KnownLayout, Debug, Clone, Copy)]
#[allow(dead_code)]
struct VlanTag {
    tci: U16<BigEndian>,
    ether_type: U16<BigEndian>,
}

#[repr(C, packed)]
#[derive(FromBytes, Unaligned, Immutable, KnownLayout, Debug, Clone, Copy)]
#[allow(dead_code)]
struct SllHeader {
    packet_type: U16<BigEndian>,
    arphrd_type: U16<BigEndian>,
    addr_len: U16<BigEndian>,
    addr: [u8; 8],
    protocol: U16<BigEndian>,
}

#[repr(C, packed)]
#[derive(FromBytes, Unaligned, Immutable, KnownLayout, Debug, Clone, Copy)]
#[allow(dead_code)]
struct Ipv4Header {
    ver_ihl: u8,
    dscp_ecn: u8,
    total_length: U16<BigEndian>,
    identification: U16<BigEndian>,
    flags_frag_offset: U16<BigEndian>,
    ttl: u8,
    protocol: u8,
    checksum: U16<BigEndian>,
    src: [u8; 4],
    dst: [u8; 4],
}

impl Ipv4Header {
    #[inline]
    fn version(&self) -> u8 {
        self.ver_ihl >> 4
    }

    #[inline]
    fn header_len(&self) -> usize {
        ((self.ver_ihl & 0x0F) as usize) * 4
    }

    /// More-fragments set or non-zero fragment offset
    #[inline]
    fn is_fragment(&self) -> bool {
        self.flags_frag_offset.get() & 0x3FFF != 0
    }
}

#[repr(C, packed)]
#[derive(FromBytes, Unaligned, Immutable, KnownLayout, Debug, Clone, Copy)]
#[allow(dead_code)]
struct UdpHeader {
    src_port: U16<BigEndian>,
    dst_port: U16<BigEndian>,
    length: U16<BigEndian>,
    checksum: U16<BigEndian>,
}

/// Why a captured frame carries no UDP payload we can look at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    UnsupportedLinktype,
    NotIpv4,
    NotUdp,
    Fragment,
    Truncated,
}

/// A UDP datagram found in a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram<'a> {
    pub endpoints: Endpoints,
    pub payload: &'a [u8],
}

impl Datagram<'_> {
    #[inline]
    pub fn src_port(&self) -> u16 {
        self.endpoints.src.port()
    }

    #[inline]
    pub fn dst_port(&self) -> u16 {
        self.endpoints.dst.port()
    }
}

pub fn udp_datagram(data: &[u8], linktype: Linktype) -> Result<Datagram<'_>, Skip> {
    let mut cursor = Cursor::new(data);

    let ether_type = match linktype {
        Linktype::ETHERNET => {
            let eth = cursor
                .read_struct::<EthernetHeader>()
                .map_err(|_| Skip::Truncated)?;
            let mut ether_type = eth.ether_type.get();
            while ether_type == ETHERTYPE_VLAN || ether_type == ETHERTYPE_QINQ {
                let tag = cursor.read_struct::<VlanTag>().map_err(|_| Skip::Truncated)?;
                ether_type = tag.ether_type.get();
            }
            ether_type
        }
        Linktype::LINUX_SLL => {
            let sll = cursor
                .read_struct::<SllHeader>()
                .map_err(|_| Skip::Truncated)?;
            sll.protocol.get()
        }
        Linktype::RAW | Linktype::IPV4 => ETHERTYPE_IPV4,
        _ => return Err(Skip::UnsupportedLinktype),
    };

    if ether_type != ETHERTYPE_IPV4 {
        return Err(Skip::NotIpv4);
    }
    udp_in_ipv4(cursor)
}

fn udp_in_ipv4(mut cursor: Cursor<'_>) -> Result<Datagram<'_>, Skip> {
    let ip = cursor
        .read_struct::<Ipv4Header>()
        .map_err(|_| Skip::Truncated)?;
    if ip.version() != 4 || ip.header_len() < 20 {
        return Err(Skip::NotIpv4);
    }
    if ip.protocol != IPPROTO_UDP {
        return Err(Skip::NotUdp);
    }
    if ip.is_fragment() {
        return Err(Skip::Fragment);
    }
    cursor
        .skip(ip.header_len() - 20)
        .map_err(|_| Skip::Truncated)?;

    let udp = cursor.read_struct::<UdpHeader>().map_err(|_| Skip::Truncated)?;

    // Trailing link-layer padding is not part of the datagram
    let declared = (udp.length.get() as usize).saturating_sub(8);
    let payload = cursor
        .read_bytes(declared.min(cursor.remaining()))
        .map_err(|_| Skip::Truncated)?;

    let src = SocketAddr::V4(SocketAddrV4::new(
        Ipv4Addr::from(ip.src),
        udp.src_port.get(),
    ));
    let dst = SocketAddr::V4(SocketAddrV4::new(
        Ipv4Addr::from(ip.dst),
        udp.dst_port.get(),
    ));

    Ok(Datagram {
        endpoints: Endpoints::new(src, dst),
        payload,
    })
}
