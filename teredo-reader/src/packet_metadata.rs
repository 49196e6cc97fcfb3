use std::fmt::{self, Display};

use chrono::DateTime;
use pcap_parser::{EnhancedPacketBlock, LegacyPcapBlock, SimplePacketBlock};

const NSEC_PER_SEC: u64 = 1_000_000_000;

/// Capture timestamp in nanoseconds since the epoch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimestampNsec(pub u64);

impl TimestampNsec {
    #[inline]
    pub fn from_sec_usec(sec: u32, usec: u32) -> Self {
        TimestampNsec(sec as u64 * NSEC_PER_SEC + usec as u64 * 1000)
    }
}

impl Display for TimestampNsec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = (self.0 / NSEC_PER_SEC) as i64;
        let nsecs = (self.0 % NSEC_PER_SEC) as u32;
        match DateTime::from_timestamp(secs, nsecs) {
            Some(date_time) if !f.alternate() => {
                write!(f, "{}", date_time.format("%Y-%m-%d %H:%M:%S%.6f UTC"))
            }
            _ => write!(f, "{}.{:09}", secs, nsecs),
        }
    }
}

/// The parts of a captured packet the reader cares about
pub trait PacketMetadata {
    fn data(&self) -> &[u8];
    fn timestamp(&self) -> TimestampNsec;

    #[inline]
    fn caplen(&self) -> u32 {
        self.data().len() as u32
    }
}

impl PacketMetadata for LegacyPcapBlock<'_> {
    #[inline]
    fn data(&self) -> &[u8] {
        self.data
    }

    #[inline]
    fn timestamp(&self) -> TimestampNsec {
        TimestampNsec::from_sec_usec(self.ts_sec, self.ts_usec)
    }

    #[inline]
    fn caplen(&self) -> u32 {
        self.caplen
    }
}

impl PacketMetadata for EnhancedPacketBlock<'_> {
    #[inline]
    fn data(&self) -> &[u8] {
        // data is padded to 32 bits
        let len = (self.caplen as usize).min(self.data.len());
        &self.data[..len]
    }

    /// Assumes the interface resolution is either microseconds (the default)
    /// or nanoseconds, telling them apart by magnitude
    #[inline]
    fn timestamp(&self) -> TimestampNsec {
        let raw = ((self.ts_high as u64) << 32) | self.ts_low as u64;
        let as_nsec_secs = raw / NSEC_PER_SEC;
        // 1973 ..= 2096 when read as nanoseconds
        if (100_000_000..=4_000_000_000).contains(&as_nsec_secs) {
            TimestampNsec(raw)
        } else {
            TimestampNsec(raw.saturating_mul(1000))
        }
    }

    #[inline]
    fn caplen(&self) -> u32 {
        self.caplen
    }
}

impl PacketMetadata for SimplePacketBlock<'_> {
    #[inline]
    fn data(&self) -> &[u8] {
        let len = (self.origlen as usize).min(self.data.len());
        &self.data[..len]
    }

    /// Simple packet blocks carry no timestamp
    #[inline]
    fn timestamp(&self) -> TimestampNsec {
        TimestampNsec::default()
    }
}
