//! Property-based tests for Teredo frame decoding.
//!
//! - Origin Indication complement encoding recovers port and address
//! - Authentication headers consume exactly 4 + ID-len + AU-len + 9 bytes
//! - Frames without optional headers start their payload at offset 0
//! - Arbitrary input never panics and failures stay inside the buffer
//! - Decoding is deterministic

use std::net::Ipv4Addr;
use std::sync::Arc;

use proptest::prelude::*;
use teredo_strata::decoder::{parse_headers, TeredoDecoder};
use teredo_strata::dispatch::{PayloadRegistry, RawHandler};
use teredo_strata::packet::{Section, TeredoError};
use teredo_strata::sink::Endpoints;

fn origin_bytes(port: u16, addr: Ipv4Addr) -> Vec<u8> {
    let mut packet = vec![0x00, 0x00];
    packet.extend_from_slice(&(!port).to_be_bytes());
    packet.extend_from_slice(&(!u32::from(addr)).to_be_bytes());
    packet
}

// Strategy for payloads that cannot be mistaken for a Teredo header
fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    (0x02u8..=0xFF, prop::collection::vec(any::<u8>(), 1..64)).prop_map(|(first, mut rest)| {
        rest.insert(0, first);
        rest
    })
}

fn raw_decoder() -> TeredoDecoder {
    TeredoDecoder::new(Arc::new(PayloadRegistry::with_fallback(Arc::new(RawHandler))))
}

#[test]
fn prop_origin_complement_round_trip() {
    proptest!(|(port in any::<u16>(), addr in any::<u32>(), payload in payload_strategy())| {
        let addr = Ipv4Addr::from(addr);
        let mut packet = origin_bytes(port, addr);
        packet.extend_from_slice(&payload);

        let (frame, offset) = parse_headers(&packet).unwrap();
        prop_assert_eq!(offset, 8);
        prop_assert_eq!(frame.origin_port(), Some(port));
        prop_assert_eq!(frame.origin_addr(), Some(addr));
    });
}

#[test]
fn prop_auth_length_arithmetic() {
    proptest!(|(
        client_id in prop::collection::vec(any::<u8>(), 0..32),
        auth_value in prop::collection::vec(any::<u8>(), 0..32),
        nonce in any::<[u8; 8]>(),
        confirmation in any::<u8>(),
        payload in payload_strategy()
    )| {
        let mut packet = vec![0x00, 0x01, client_id.len() as u8, auth_value.len() as u8];
        packet.extend_from_slice(&client_id);
        packet.extend_from_slice(&auth_value);
        packet.extend_from_slice(&nonce);
        packet.push(confirmation);
        packet.extend_from_slice(&payload);

        let (frame, offset) = parse_headers(&packet).unwrap();
        prop_assert_eq!(offset, 4 + client_id.len() + auth_value.len() + 9);
        prop_assert_eq!(frame.client_id.as_slice(), client_id.as_slice());
        prop_assert_eq!(frame.auth_value.as_slice(), auth_value.as_slice());
        prop_assert_eq!(frame.nonce, nonce);
        prop_assert_eq!(frame.confirmation_byte, confirmation);
        prop_assert_eq!(frame.is_confirmed(), confirmation == 0);
    });
}

#[test]
fn prop_bare_payload_starts_at_zero() {
    proptest!(|(payload in payload_strategy())| {
        let (frame, offset) = parse_headers(&payload).unwrap();
        prop_assert_eq!(offset, 0);
        prop_assert!(!frame.has_authentication());
        prop_assert!(!frame.has_origin());
        prop_assert_eq!(
            frame.next_header_discriminator,
            u16::from_be_bytes([payload[0], payload[1]])
        );
        prop_assert_eq!(frame.ip_version_and_hlen, payload[0]);
    });
}

#[test]
fn prop_arbitrary_input_never_reads_past_end() {
    proptest!(|(packet in prop::collection::vec(any::<u8>(), 0..96))| {
        match raw_decoder().decode(&packet, &Endpoints::default()) {
            Ok(out) => {
                prop_assert!(out.payload_offset < packet.len());
                prop_assert_eq!(out.payload.len(), packet.len() - out.payload_offset);
            }
            Err(err) => {
                prop_assert!(err.offset <= packet.len());
                if let TeredoError::OutOfBounds { offset, needed, available } = err.source {
                    prop_assert_eq!(offset + available, packet.len());
                    prop_assert!(needed > available);
                }
            }
        }
    });
}

#[test]
fn prop_truncated_auth_rejected() {
    proptest!(|(id_len in any::<u8>(), au_len in any::<u8>(), extra in 0usize..9)| {
        // always one byte short of the declared length, or worse
        let declared = 4 + id_len as usize + au_len as usize + 9;
        let mut packet = vec![0x00, 0x01, id_len, au_len];
        packet.resize(declared - 1 - extra.min(declared - 5), 0x00);

        let err = parse_headers(&packet).unwrap_err();
        prop_assert_eq!(err.section, Section::Authentication);
        let is_truncated = matches!(
            err.source,
            TeredoError::Truncated { declared: d, .. } if d == declared
        );
        prop_assert!(is_truncated);
    });
}

#[test]
fn prop_decode_is_deterministic() {
    proptest!(|(packet in prop::collection::vec(any::<u8>(), 0..96))| {
        let decoder = raw_decoder();
        let first = decoder.decode(&packet, &Endpoints::default());
        let second = decoder.decode(&packet, &Endpoints::default());
        prop_assert_eq!(first, second);
    });
}
