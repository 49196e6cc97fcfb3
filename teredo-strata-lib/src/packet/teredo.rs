//! Teredo tunneling protocol headers
//!
//! Teredo (draft-huitema-v6ops-teredo, later RFC 4380) gives IPv6
//! connectivity to nodes behind IPv4 NAT devices by carrying IPv6 packets in
//! UDP datagrams, typically on port 3544.
//!
//! # Teredo Packet Format
//!
//! Two optional headers may precede the encapsulated packet, always in this
//! order:
//!
//! ```text
//! +------------------+
//! |   UDP Header     |
//! +------------------+
//! | Authentication   |  (optional, type 0x0001)
//! +------------------+
//! | Origin Indication|  (optional, type 0x0000)
//! +------------------+
//! |   Payload        |
//! +------------------+
//! ```
//!
//! Neither header carries a length prefix of its own: the 16-bit value at the
//! current position is the only thing that tells them apart from the
//! payload. See [`Indicator::classify`].
//!
//! The wire layouts live in [`auth`] and [`origin`].

use std::fmt;

use serde::Serialize;

use crate::packet::protocol::PayloadKey;

pub mod auth;
pub mod origin;

pub use auth::{Authentication, TeredoAuthHeader};
pub use origin::TeredoOriginHeader;

/// Teredo UDP port (server/relay)
pub const TEREDO_PORT: u16 = 3544;

/// Teredo indicator type: Origin Indication
pub const TEREDO_TYPE_ORIGIN: u16 = 0x0000;

/// Teredo indicator type: Authentication
pub const TEREDO_TYPE_AUTH: u16 = 0x0001;

/// Meaning of a 16-bit discriminator read from the stream
///
/// The same field selects the optional header type and, when it matches
/// neither, serves as the payload dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Indicator {
    /// Authentication header follows (type 0x0001)
    Authentication,
    /// Origin Indication header follows (type 0x0000)
    OriginIndication,
    /// No further Teredo header; the value keys the payload handler
    Payload(PayloadKey),
}

impl Indicator {
    #[inline]
    pub fn classify(discriminator: u16) -> Self {
        match discriminator {
            TEREDO_TYPE_AUTH => Indicator::Authentication,
            TEREDO_TYPE_ORIGIN => Indicator::OriginIndication,
            key => Indicator::Payload(PayloadKey::from(key)),
        }
    }

    /// Raw wire value this indicator was classified from
    #[inline]
    pub fn discriminator(&self) -> u16 {
        match self {
            Indicator::Authentication => TEREDO_TYPE_AUTH,
            Indicator::OriginIndication => TEREDO_TYPE_ORIGIN,
            Indicator::Payload(key) => key.get(),
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indicator::Authentication => f.write_str("Authentication header"),
            Indicator::OriginIndication => f.write_str("Origin indication"),
            Indicator::Payload(key) => write!(f, "payload {}", key),
        }
    }
}
