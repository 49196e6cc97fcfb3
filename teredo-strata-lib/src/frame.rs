//! Decoded Teredo header
//!
//! A [`ParsedFrame`] is built fresh by every decode call and handed out by
//! value; nothing about it is shared between frames.

use std::fmt::{self, Formatter};
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::packet::teredo::{Authentication, Indicator, TeredoOriginHeader};

/// Opaque authentication sub-fields are usually empty, rarely longer than a hash
pub type OpaqueBytes = SmallVec<[u8; 20]>;

/// Whether the frame started with an Authentication header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndicationType {
    #[default]
    None,
    Authentication,
}

/// Origin Indication with the complement encoding already undone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginIndication {
    pub port: u16,
    pub addr: Ipv4Addr,
}

impl From<&TeredoOriginHeader> for OriginIndication {
    #[inline]
    fn from(header: &TeredoOriginHeader) -> Self {
        OriginIndication {
            port: header.port(),
            addr: header.ipv4_addr(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedFrame {
    pub indication_type: IndicationType,
    pub client_id_len: u8,
    pub auth_value_len: u8,
    /// Client identifier, captured only when `client_id_len > 0`
    pub client_id: OpaqueBytes,
    /// Authentication value, captured only when `auth_value_len > 0`
    pub auth_value: OpaqueBytes,
    pub nonce: [u8; 8],
    /// Zero means the server confirmed the authentication
    pub confirmation_byte: u8,
    pub origin: Option<OriginIndication>,
    /// Last discriminator read: header selector and payload dispatch key
    pub next_header_discriminator: u16,
    /// First payload byte, previewed without consuming it
    pub ip_version_and_hlen: u8,
    /// Bytes of Teredo headers before the payload
    pub header_len: usize,
}

impl ParsedFrame {
    pub(crate) fn set_authentication(&mut self, auth: &Authentication<'_>) {
        self.indication_type = IndicationType::Authentication;
        self.client_id_len = auth.id_len();
        self.auth_value_len = auth.auth_len();
        if !auth.client_id.is_empty() {
            self.client_id = OpaqueBytes::from_slice(auth.client_id);
        }
        if !auth.auth_value.is_empty() {
            self.auth_value = OpaqueBytes::from_slice(auth.auth_value);
        }
        self.nonce = auth.nonce;
        self.confirmation_byte = auth.confirmation;
    }

    #[inline]
    pub fn has_authentication(&self) -> bool {
        self.indication_type == IndicationType::Authentication
    }

    #[inline]
    pub fn has_origin(&self) -> bool {
        self.origin.is_some()
    }

    /// True when an Authentication header is present with a zero confirmation byte
    #[inline]
    pub fn is_confirmed(&self) -> bool {
        self.has_authentication() && self.confirmation_byte == 0
    }

    #[inline]
    pub fn origin_port(&self) -> Option<u16> {
        self.origin.map(|o| o.port)
    }

    #[inline]
    pub fn origin_addr(&self) -> Option<Ipv4Addr> {
        self.origin.map(|o| o.addr)
    }

    /// Classification of the final discriminator
    #[inline]
    pub fn indicator(&self) -> Indicator {
        Indicator::classify(self.next_header_discriminator)
    }

    #[inline]
    pub fn ip_version(&self) -> u8 {
        self.ip_version_and_hlen >> 4
    }
}

impl fmt::Display for ParsedFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Teredo")?;

        let mut sep = " ";
        if self.has_authentication() {
            write!(
                f,
                "{}Authentication header (id_len={} au_len={} conf={})",
                sep, self.client_id_len, self.auth_value_len, self.confirmation_byte
            )?;
            sep = ", ";
        }

        if let Some(origin) = self.origin {
            write!(f, "{}Origin indication {}:{}", sep, origin.addr, origin.port)?;
        }

        write!(
            f,
            " next=0x{:04x} offset={}",
            self.next_header_discriminator, self.header_len
        )
    }
}
