//! Teredo frame decoding
//!
//! A frame is decoded in one forward pass:
//!
//! 1. peek the discriminator at offset 0;
//! 2. if it is `0x0001`, parse the Authentication header and peek again;
//! 3. if the discriminator is now `0x0000`, parse the Origin Indication;
//! 4. preview the first payload byte without consuming it;
//! 5. hand the rest of the buffer to the payload handler keyed by the last
//!    discriminator read;
//! 6. report the frame to the observation sink.
//!
//! A failure in steps 1 to 4 aborts the frame with a [`MalformedFrame`];
//! there is no resynchronisation inside a datagram. Once the headers are
//! parsed the frame stands: a handler refusing the payload is recorded in
//! [`Dissection::info`] and the frame still reaches the sink.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use teredo_strata::decoder::TeredoDecoder;
//! use teredo_strata::dispatch::{PayloadRegistry, RawHandler};
//! use teredo_strata::packet::protocol::PayloadKey;
//! use teredo_strata::sink::Endpoints;
//!
//! let mut registry = PayloadRegistry::new();
//! registry.register(PayloadKey::IPV6, Arc::new(RawHandler));
//! let decoder = TeredoDecoder::new(Arc::new(registry));
//!
//! let mut packet = vec![0x00, 0x01, 0x00, 0x00];   // Authentication, no id/value
//! packet.extend_from_slice(&[0x11; 8]);            // nonce
//! packet.push(0x00);                               // confirmation
//! packet.extend_from_slice(&[0x86, 0xDD, 0x60]);   // payload
//!
//! let out = decoder.decode(&packet, &Endpoints::default()).unwrap();
//! assert_eq!(out.payload_offset, 13);
//! assert_eq!(out.frame.next_header_discriminator, 0x86DD);
//! assert!(out.frame.is_confirmed());
//! assert_eq!(out.handler, "data");
//! ```

use std::sync::Arc;

use tracing::{debug, trace};

use crate::cursor::Cursor;
use crate::dispatch::{PayloadContext, PayloadInfo, PayloadRegistry};
use crate::frame::{OriginIndication, ParsedFrame};
use crate::packet::protocol::PayloadKey;
use crate::packet::teredo::{Indicator, TeredoAuthHeader, TeredoOriginHeader};
use crate::packet::{HeaderParser, MalformedFrame, Section, TeredoError};
use crate::sink::{Endpoints, ObservationSink};

/// Parse the Teredo headers of `buf`
///
/// Returns the frame and the offset where the payload starts. The payload
/// itself is not looked at beyond its first byte.
pub fn parse_headers(buf: &[u8]) -> Result<(ParsedFrame, usize), MalformedFrame> {
    let mut cursor = Cursor::new(buf);
    let mut frame = ParsedFrame::default();

    let mut indicator = peek_indicator(&cursor)?;

    if indicator == Indicator::Authentication {
        let auth = TeredoAuthHeader::parse(&mut cursor)
            .map_err(|e| MalformedFrame::new(Section::Authentication, e))?;
        trace!(
            id_len = auth.id_len(),
            au_len = auth.auth_len(),
            confirmation = auth.confirmation,
            "Teredo authentication header"
        );
        frame.set_authentication(&auth);
        indicator = peek_indicator(&cursor)?;
    }

    if indicator == Indicator::OriginIndication {
        let origin = TeredoOriginHeader::parse(&mut cursor)
            .map_err(|e| MalformedFrame::new(Section::OriginIndication, e))?;
        trace!(port = origin.port(), addr = %origin.ipv4_addr(), "Teredo origin indication");
        frame.origin = Some(OriginIndication::from(origin));
    }

    frame.next_header_discriminator = indicator.discriminator();
    frame.ip_version_and_hlen = cursor
        .peek_u8()
        .map_err(|e| MalformedFrame::new(Section::Payload, e))?;
    frame.header_len = cursor.offset();

    Ok((frame, cursor.offset()))
}

#[inline]
fn peek_indicator(cursor: &Cursor<'_>) -> Result<Indicator, MalformedFrame> {
    cursor
        .peek_u16_be()
        .map(Indicator::classify)
        .map_err(|e| MalformedFrame::new(Section::Discriminator, e))
}

/// A frame whose Teredo headers decoded, and what its payload handler said
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dissection<'a> {
    pub frame: ParsedFrame,
    pub payload_offset: usize,
    pub payload: &'a [u8],
    /// Name of the handler the payload was given to
    pub handler: &'static str,
    /// False when no handler was registered for the key and the fallback ran
    pub registered: bool,
    /// `Err` when the handler refused the payload
    pub info: Result<PayloadInfo, TeredoError>,
}

/// Decodes Teredo frames and dispatches their payloads
///
/// Holds no per-frame state: a single decoder can be shared by reference
/// across threads.
#[derive(Clone)]
pub struct TeredoDecoder {
    registry: Arc<PayloadRegistry>,
    sink: Option<Arc<dyn ObservationSink>>,
}

impl TeredoDecoder {
    pub fn new(registry: Arc<PayloadRegistry>) -> Self {
        TeredoDecoder {
            registry,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ObservationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[inline]
    pub fn registry(&self) -> &PayloadRegistry {
        &self.registry
    }

    /// Decode one UDP payload
    ///
    /// Fails only when the Teredo headers are malformed. The payload
    /// handler's verdict is part of the returned [`Dissection`].
    pub fn decode<'a>(
        &self,
        buf: &'a [u8],
        endpoints: &Endpoints,
    ) -> Result<Dissection<'a>, MalformedFrame> {
        let (frame, payload_offset) = match parse_headers(buf) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(
                    src = %endpoints.src,
                    dst = %endpoints.dst,
                    section = %err.section,
                    offset = err.offset,
                    "{}",
                    err
                );
                if let Some(sink) = &self.sink {
                    sink.malformed(endpoints, &err);
                }
                return Err(err);
            }
        };

        let dissection = self.dispatch(buf, frame, payload_offset, endpoints);
        if let Err(err) = &dissection.info {
            debug!(
                src = %endpoints.src,
                dst = %endpoints.dst,
                handler = dissection.handler,
                "{}",
                err
            );
        }
        if let Some(sink) = &self.sink {
            sink.observe(endpoints, &dissection.frame);
        }
        Ok(dissection)
    }

    fn dispatch<'a>(
        &self,
        buf: &'a [u8],
        frame: ParsedFrame,
        payload_offset: usize,
        endpoints: &Endpoints,
    ) -> Dissection<'a> {
        let payload = &buf[payload_offset..];

        let ctx = PayloadContext {
            data: payload,
            offset: payload_offset,
            key: PayloadKey::from(frame.next_header_discriminator),
            frame: &frame,
            endpoints,
        };
        let dispatched = self.registry.dispatch(&ctx);

        Dissection {
            frame,
            payload_offset,
            payload,
            handler: dispatched.handler,
            registered: dispatched.registered,
            info: dispatched.info,
        }
    }
}

impl Default for TeredoDecoder {
    fn default() -> Self {
        Self::new(Arc::new(PayloadRegistry::new()))
    }
}

impl std::fmt::Debug for TeredoDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeredoDecoder")
            .field("registry", &self.registry)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
