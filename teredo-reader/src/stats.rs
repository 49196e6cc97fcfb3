use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};

use teredo_strata::frame::ParsedFrame;
use teredo_strata::packet::{MalformedFrame, Section};
use teredo_strata::sink::{Endpoints, ObservationSink};

/// Per-capture counters kept by the reading loop
///
/// Counted without atomics and flushed into [`Stats`] every
/// [`FLUSH_INTERVAL`] packets and once at the end.
#[derive(Default, Debug, Clone)]
pub struct LocalStats {
    pub total_packets: u64,
    pub total_bytes: u64,

    // Why a packet never reached the decoder
    pub unsupported_link: u64,
    pub not_ipv4: u64,
    pub not_udp: u64,
    pub fragments: u64,
    pub truncated: u64,
    pub other_port: u64,

    pub teredo_bytes: u64,
    /// Frames whose payload handler refused the payload
    pub payload_rejected: u64,
}

impl LocalStats {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves every non-zero counter into `stats`
    #[inline]
    pub fn flush(&mut self, stats: &Stats) {
        macro_rules! flush_counter {
            ($($field:ident),+ $(,)?) => {
                $(
                    if self.$field > 0 {
                        stats.$field.fetch_add(self.$field, Ordering::Relaxed);
                        self.$field = 0;
                    }
                )+
            };
        }

        flush_counter!(
            total_packets,
            total_bytes,
            unsupported_link,
            not_ipv4,
            not_udp,
            fragments,
            truncated,
            other_port,
            teredo_bytes,
            payload_rejected,
        );
    }

    /// True every `interval` packets, `interval` being a power of two
    #[inline]
    pub fn should_flush(&self, interval: u64) -> bool {
        self.total_packets & (interval - 1) == 0
    }
}

/// Flush interval for local stats (must be power of 2)
pub const FLUSH_INTERVAL: u64 = 1024;

/// Shared counters
///
/// The frame counters are fed by the decoder through [`ObservationSink`],
/// the capture counters by [`LocalStats::flush`].
#[derive(Default, Debug)]
pub struct Stats {
    // Capture
    pub total_packets: AtomicU64,
    pub total_bytes: AtomicU64,
    pub unsupported_link: AtomicU64,
    pub not_ipv4: AtomicU64,
    pub not_udp: AtomicU64,
    pub fragments: AtomicU64,
    pub truncated: AtomicU64,
    pub other_port: AtomicU64,
    pub teredo_bytes: AtomicU64,

    // Decoded frames
    pub frames: AtomicU64,
    pub authentication: AtomicU64,
    pub confirmed: AtomicU64,
    pub origin: AtomicU64,
    pub bare: AtomicU64,
    pub payload_rejected: AtomicU64,

    // Rejected frames, by the section that failed
    pub malformed_discriminator: AtomicU64,
    pub malformed_authentication: AtomicU64,
    pub malformed_origin: AtomicU64,
    pub malformed_payload: AtomicU64,
}

impl Stats {
    #[inline]
    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    pub fn total_malformed(&self) -> u64 {
        Self::get(&self.malformed_discriminator)
            + Self::get(&self.malformed_authentication)
            + Self::get(&self.malformed_origin)
            + Self::get(&self.malformed_payload)
    }

    pub fn total_skipped(&self) -> u64 {
        Self::get(&self.unsupported_link)
            + Self::get(&self.not_ipv4)
            + Self::get(&self.not_udp)
            + Self::get(&self.fragments)
            + Self::get(&self.truncated)
    }
}

impl ObservationSink for Stats {
    fn observe(&self, _endpoints: &Endpoints, frame: &ParsedFrame) {
        Self::inc(&self.frames);
        if frame.has_authentication() {
            Self::inc(&self.authentication);
            if frame.is_confirmed() {
                Self::inc(&self.confirmed);
            }
        }
        if frame.has_origin() {
            Self::inc(&self.origin);
        }
        if frame.header_len == 0 {
            Self::inc(&self.bare);
        }
    }

    fn malformed(&self, _endpoints: &Endpoints, error: &MalformedFrame) {
        let counter = match error.section {
            Section::Discriminator => &self.malformed_discriminator,
            Section::Authentication => &self.malformed_authentication,
            Section::OriginIndication => &self.malformed_origin,
            Section::Payload => &self.malformed_payload,
        };
        Self::inc(counter);
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        macro_rules! row {
            ($label:expr, $value:expr) => {
                writeln!(f, "  {:<28} {:>12}", $label, $value)?
            };
        }

        writeln!(f, "Capture")?;
        row!("packets", Self::get(&self.total_packets));
        row!("bytes", Self::get(&self.total_bytes));
        row!("skipped", self.total_skipped());
        row!("  unsupported link type", Self::get(&self.unsupported_link));
        row!("  not IPv4", Self::get(&self.not_ipv4));
        row!("  not UDP", Self::get(&self.not_udp));
        row!("  IPv4 fragments", Self::get(&self.fragments));
        row!("  truncated", Self::get(&self.truncated));
        row!("UDP on other ports", Self::get(&self.other_port));
        row!("Teredo payload bytes", Self::get(&self.teredo_bytes));

        writeln!(f, "Teredo")?;
        row!("frames", Self::get(&self.frames));
        row!("  with authentication", Self::get(&self.authentication));
        row!("    confirmed", Self::get(&self.confirmed));
        row!("  with origin indication", Self::get(&self.origin));
        row!("  without headers", Self::get(&self.bare));
        row!("  payload refused", Self::get(&self.payload_rejected));
        row!("malformed", self.total_malformed());
        row!("  discriminator", Self::get(&self.malformed_discriminator));
        row!("  authentication", Self::get(&self.malformed_authentication));
        row!("  origin indication", Self::get(&self.malformed_origin));
        row!("  payload", Self::get(&self.malformed_payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use teredo_strata::frame::OriginIndication;
    use teredo_strata::packet::TeredoError;

    #[test]
    fn test_local_flush() {
        let stats = Stats::default();
        let mut local = LocalStats::new();
        local.total_packets = 3;
        local.not_udp = 2;

        local.flush(&stats);
        assert_eq!(Stats::get(&stats.total_packets), 3);
        assert_eq!(Stats::get(&stats.not_udp), 2);
        assert_eq!(local.total_packets, 0);

        local.total_packets = 1024;
        assert!(local.should_flush(FLUSH_INTERVAL));
        local.total_packets = 1025;
        assert!(!local.should_flush(FLUSH_INTERVAL));
    }

    #[test]
    fn test_sink_counts() {
        let stats = Stats::default();
        let endpoints = Endpoints::default();

        let mut frame = ParsedFrame::default();
        stats.observe(&endpoints, &frame);

        frame.header_len = 8;
        frame.origin = Some(OriginIndication {
            port: 3544,
            addr: Ipv4Addr::new(192, 0, 2, 45),
        });
        stats.observe(&endpoints, &frame);

        let err = MalformedFrame::new(
            Section::OriginIndication,
            TeredoError::OutOfBounds {
                offset: 0,
                needed: 8,
                available: 3,
            },
        );
        stats.malformed(&endpoints, &err);

        assert_eq!(Stats::get(&stats.frames), 2);
        assert_eq!(Stats::get(&stats.bare), 1);
        assert_eq!(Stats::get(&stats.origin), 1);
        assert_eq!(Stats::get(&stats.malformed_origin), 1);
        assert_eq!(stats.total_malformed(), 1);
        assert!(stats.to_string().contains("with origin indication"));
    }
}
