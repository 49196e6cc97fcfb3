//! Observation of decoded frames
//!
//! Sinks receive every decoded header together with the endpoints of the
//! datagram it arrived in. They exist for statistics and taps; rendering is
//! somebody else's job. Decoders may run on several threads at once, so a
//! sink must tolerate concurrent calls.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use serde::Serialize;

use crate::frame::ParsedFrame;
use crate::packet::MalformedFrame;

/// Addressing of the UDP datagram carrying a frame, supplied by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoints {
    pub src: SocketAddr,
    pub dst: SocketAddr,
}

impl Endpoints {
    #[inline]
    pub fn new(src: SocketAddr, dst: SocketAddr) -> Self {
        Endpoints { src, dst }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        let unspecified = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));
        Endpoints {
            src: unspecified,
            dst: unspecified,
        }
    }
}

pub trait ObservationSink: Send + Sync {
    /// Called once per successfully decoded frame
    fn observe(&self, endpoints: &Endpoints, frame: &ParsedFrame);

    /// Called once per rejected frame
    fn malformed(&self, endpoints: &Endpoints, error: &MalformedFrame) {
        let _ = (endpoints, error);
    }
}

impl<F> ObservationSink for F
where
    F: Fn(&Endpoints, &ParsedFrame) + Send + Sync,
{
    #[inline]
    fn observe(&self, endpoints: &Endpoints, frame: &ParsedFrame) {
        self(endpoints, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_closure_sink() {
        let seen = AtomicUsize::new(0);
        let sink = |_: &Endpoints, frame: &ParsedFrame| {
            assert!(!frame.has_authentication());
            seen.fetch_add(1, Ordering::Relaxed);
        };

        sink.observe(&Endpoints::default(), &ParsedFrame::default());
        sink.observe(&Endpoints::default(), &ParsedFrame::default());
        assert_eq!(seen.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_endpoints_default() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.src.port(), 0);
        assert!(endpoints.dst.ip().is_unspecified());
    }
}
