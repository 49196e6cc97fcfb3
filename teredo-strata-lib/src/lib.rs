//! Teredo tunnel header decoding
//!
//! Decodes the optional Authentication and Origin Indication headers that may
//! precede the encapsulated packet in a Teredo UDP payload, locates the
//! payload, and routes it to a handler chosen by the 16-bit discriminator
//! found in the stream.
//!
//! - [`cursor`]: bounds-checked reader every parser goes through
//! - [`packet`]: wire layouts and errors
//! - [`dispatch`]: handler registry and built-in handlers
//! - [`decoder`]: the per-frame state machine
//! - [`sink`]: observation of decoded frames
//! - [`config`]: transport binding and fallback selection
//!
//! # Examples
//!
//! ```
//! use std::net::Ipv4Addr;
//! use teredo_strata::decoder::parse_headers;
//!
//! let mut packet = vec![0x00, 0x00];                              // Origin Indication
//! packet.extend_from_slice(&(!3544u16).to_be_bytes());
//! packet.extend_from_slice(&(!u32::from(Ipv4Addr::new(192, 0, 2, 45))).to_be_bytes());
//! packet.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);             // start of IPv6
//!
//! let (frame, offset) = parse_headers(&packet).unwrap();
//! assert_eq!(offset, 8);
//! assert_eq!(frame.origin_port(), Some(3544));
//! assert_eq!(frame.origin_addr(), Some(Ipv4Addr::new(192, 0, 2, 45)));
//! assert_eq!(frame.ip_version(), 6);
//! ```

pub mod config;
pub mod cursor;
pub mod decoder;
pub mod dispatch;
pub mod frame;
pub mod macros;
pub mod packet;
pub mod sink;

pub use config::DecoderConfig;
pub use decoder::{parse_headers, Dissection, TeredoDecoder};
pub use frame::ParsedFrame;
pub use packet::{MalformedFrame, Section, TeredoError};
