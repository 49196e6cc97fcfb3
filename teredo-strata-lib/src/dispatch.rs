//! Payload dispatch
//!
//! After the optional headers, the last discriminator read from the frame
//! selects a [`PayloadHandler`] from a [`PayloadRegistry`]. Keys with no
//! registered handler go to the registry's fallback, which by default treats
//! the payload as an IPv6 packet.
//!
//! Registries are filled before decoding starts and are read-only afterwards,
//! so one `Arc<PayloadRegistry>` can serve any number of decoding threads.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use teredo_strata::dispatch::{PayloadContext, PayloadHandler, PayloadInfo, PayloadRegistry};
//! use teredo_strata::packet::protocol::PayloadKey;
//! use teredo_strata::packet::TeredoError;
//!
//! struct Socks;
//!
//! impl PayloadHandler for Socks {
//!     fn name(&self) -> &'static str {
//!         "socks"
//!     }
//!
//!     fn dissect(&self, ctx: &PayloadContext<'_>) -> Result<PayloadInfo, TeredoError> {
//!         Ok(PayloadInfo::Opaque { len: ctx.data.len() })
//!     }
//! }
//!
//! let mut registry = PayloadRegistry::new();
//! registry.register(PayloadKey::from(0x0800), Arc::new(Socks));
//!
//! assert_eq!(registry.lookup(PayloadKey::from(0x0800)).name(), "socks");
//! assert_eq!(registry.lookup(PayloadKey::from(0x6000)).name(), "ipv6");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv6Addr;
use std::sync::Arc;

use ahash::RandomState;
use serde::Serialize;
use tracing::trace;

use crate::frame::ParsedFrame;
use crate::packet::ipv6::Ipv6Header;
use crate::packet::protocol::PayloadKey;
use crate::packet::{HeaderParser, TeredoError};
use crate::sink::Endpoints;

/// Everything a handler gets to see about the payload it is asked to decode
#[derive(Debug, Clone, Copy)]
pub struct PayloadContext<'a> {
    /// Bytes from the payload offset to the end of the datagram
    pub data: &'a [u8],
    /// Absolute offset of `data` in the UDP payload
    pub offset: usize,
    pub key: PayloadKey,
    pub frame: &'a ParsedFrame,
    pub endpoints: &'a Endpoints,
}

/// What a handler made of the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PayloadInfo {
    Ipv6 {
        src: Ipv6Addr,
        dst: Ipv6Addr,
        next_header: u8,
        hop_limit: u8,
        payload_len: u16,
    },
    Opaque {
        len: usize,
    },
}

impl fmt::Display for PayloadInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadInfo::Ipv6 {
                src,
                dst,
                next_header,
                hop_limit,
                payload_len,
            } => write!(
                f,
                "IPv6 {} -> {} next={} hop={} len={}",
                src, dst, next_header, hop_limit, payload_len
            ),
            PayloadInfo::Opaque { len } => write!(f, "data ({} bytes)", len),
        }
    }
}

pub trait PayloadHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn dissect(&self, ctx: &PayloadContext<'_>) -> Result<PayloadInfo, TeredoError>;
}

/// Generic IPv6 decoder, the default fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct Ipv6Handler;

impl PayloadHandler for Ipv6Handler {
    fn name(&self) -> &'static str {
        "ipv6"
    }

    fn dissect(&self, ctx: &PayloadContext<'_>) -> Result<PayloadInfo, TeredoError> {
        let (ip, _) = Ipv6Header::from_bytes(ctx.data).map_err(|err| {
            let reason = match err {
                TeredoError::Invalid { .. } => "not an IPv6 packet",
                _ => "truncated IPv6 header",
            };
            TeredoError::InvalidPayload {
                handler: self.name(),
                offset: ctx.offset + err.offset(),
                reason,
            }
        })?;

        Ok(PayloadInfo::Ipv6 {
            src: ip.src_ip(),
            dst: ip.dst_ip(),
            next_header: ip.next_header(),
            hop_limit: ip.hop_limit(),
            payload_len: ip.payload_length(),
        })
    }
}

/// Accepts anything as opaque data
#[derive(Debug, Clone, Copy, Default)]
pub struct RawHandler;

impl PayloadHandler for RawHandler {
    fn name(&self) -> &'static str {
        "data"
    }

    fn dissect(&self, ctx: &PayloadContext<'_>) -> Result<PayloadInfo, TeredoError> {
        Ok(PayloadInfo::Opaque {
            len: ctx.data.len(),
        })
    }
}

/// Result of routing a payload through the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub handler: &'static str,
    /// False when the fallback handled it
    pub registered: bool,
    /// The handler's verdict on the payload
    pub info: Result<PayloadInfo, TeredoError>,
}

pub struct PayloadRegistry {
    handlers: HashMap<u16, Arc<dyn PayloadHandler>, RandomState>,
    fallback: Arc<dyn PayloadHandler>,
}

impl PayloadRegistry {
    /// Empty registry falling back to [`Ipv6Handler`]
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(Ipv6Handler))
    }

    pub fn with_fallback(fallback: Arc<dyn PayloadHandler>) -> Self {
        PayloadRegistry {
            handlers: HashMap::with_hasher(RandomState::new()),
            fallback,
        }
    }

    /// Adds a handler for `key`, returning the one it replaces
    pub fn register(
        &mut self,
        key: PayloadKey,
        handler: Arc<dyn PayloadHandler>,
    ) -> Option<Arc<dyn PayloadHandler>> {
        self.handlers.insert(key.get(), handler)
    }

    #[inline]
    pub fn contains(&self, key: PayloadKey) -> bool {
        self.handlers.contains_key(&key.get())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    #[inline]
    pub fn fallback(&self) -> &dyn PayloadHandler {
        self.fallback.as_ref()
    }

    /// Handler for `key` and whether it was registered, or the fallback
    #[inline]
    fn select(&self, key: PayloadKey) -> (&dyn PayloadHandler, bool) {
        match self.handlers.get(&key.get()) {
            Some(h) => (h.as_ref(), true),
            None => (self.fallback.as_ref(), false),
        }
    }

    /// Handler for `key`, or the fallback
    #[inline]
    pub fn lookup(&self, key: PayloadKey) -> &dyn PayloadHandler {
        self.select(key).0
    }

    /// Runs the handler selected by `ctx.key`
    ///
    /// A handler refusing its payload does not stop the dispatch; the refusal
    /// is returned in [`Dispatched::info`].
    pub fn dispatch(&self, ctx: &PayloadContext<'_>) -> Dispatched {
        let (handler, registered) = self.select(ctx.key);

        trace!(
            key = %ctx.key,
            handler = handler.name(),
            registered,
            offset = ctx.offset,
            "dispatching Teredo payload"
        );

        Dispatched {
            handler: handler.name(),
            registered,
            info: handler.dissect(ctx),
        }
    }
}

impl Default for PayloadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PayloadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().copied().collect();
        keys.sort_unstable();
        f.debug_struct("PayloadRegistry")
            .field("keys", &keys)
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl PayloadHandler for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn dissect(&self, ctx: &PayloadContext<'_>) -> Result<PayloadInfo, TeredoError> {
            Ok(PayloadInfo::Opaque {
                len: ctx.data.len(),
            })
        }
    }

    fn minimal_ipv6() -> Vec<u8> {
        let mut packet = vec![0x60, 0x00, 0x00, 0x00, 0x00, 0x00, 0x3a, 0x40];
        packet.extend_from_slice(&Ipv6Addr::LOCALHOST.octets());
        packet.extend_from_slice(&Ipv6Addr::LOCALHOST.octets());
        packet
    }

    fn ctx<'a>(
        data: &'a [u8],
        key: u16,
        frame: &'a ParsedFrame,
        endpoints: &'a Endpoints,
    ) -> PayloadContext<'a> {
        PayloadContext {
            data,
            offset: 8,
            key: PayloadKey::from(key),
            frame,
            endpoints,
        }
    }

    #[test]
    fn test_unregistered_key_uses_fallback() {
        let registry = PayloadRegistry::new();
        let frame = ParsedFrame::default();
        let endpoints = Endpoints::default();
        let data = minimal_ipv6();

        let out = registry.dispatch(&ctx(&data, 0x6000, &frame, &endpoints));
        assert_eq!(out.handler, "ipv6");
        assert!(!out.registered);
        assert!(matches!(out.info, Ok(PayloadInfo::Ipv6 { next_header: 0x3a, .. })));
    }

    #[test]
    fn test_registered_key_wins() {
        let mut registry = PayloadRegistry::new();
        assert!(registry
            .register(PayloadKey::IPV6, Arc::new(Fixed("custom")))
            .is_none());

        let frame = ParsedFrame::default();
        let endpoints = Endpoints::default();
        let data = [0x86, 0xDD, 0x00];

        let out = registry.dispatch(&ctx(&data, 0x86DD, &frame, &endpoints));
        assert_eq!(out.handler, "custom");
        assert!(out.registered);
        assert_eq!(out.info, Ok(PayloadInfo::Opaque { len: 3 }));

        // unregistered key: the IPv6 fallback runs and refuses the bytes
        let out = registry.dispatch(&ctx(&data, 0x86DE, &frame, &endpoints));
        assert_eq!(out.handler, "ipv6");
        assert!(!out.registered);
        assert!(matches!(
            out.info,
            Err(TeredoError::InvalidPayload { handler: "ipv6", offset: 8, .. })
        ));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = PayloadRegistry::with_fallback(Arc::new(RawHandler));
        registry.register(PayloadKey::from(7), Arc::new(Fixed("first")));
        let old = registry.register(PayloadKey::from(7), Arc::new(Fixed("second")));

        assert_eq!(old.map(|h| h.name()), Some("first"));
        assert_eq!(registry.lookup(PayloadKey::from(7)).name(), "second");
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(PayloadKey::from(7)));
        assert_eq!(registry.fallback().name(), "data");
    }

    #[test]
    fn test_lookup_agrees_with_dispatch() {
        let mut registry = PayloadRegistry::with_fallback(Arc::new(RawHandler));
        registry.register(PayloadKey::IPV6, Arc::new(Fixed("custom")));

        let frame = ParsedFrame::default();
        let endpoints = Endpoints::default();
        for key in [0x0000, 0x6000, 0x86DD, 0xFFFF] {
            let out = registry.dispatch(&ctx(&[0x00], key, &frame, &endpoints));
            assert_eq!(out.handler, registry.lookup(PayloadKey::from(key)).name());
            assert_eq!(out.registered, registry.contains(PayloadKey::from(key)));
        }
    }

    #[test]
    fn test_ipv6_handler_rejects_non_ipv6() {
        let frame = ParsedFrame::default();
        let endpoints = Endpoints::default();
        let mut data = minimal_ipv6();
        data[0] = 0x45;

        let err = Ipv6Handler
            .dissect(&ctx(&data, 0, &frame, &endpoints))
            .unwrap_err();
        assert_eq!(
            err,
            TeredoError::InvalidPayload {
                handler: "ipv6",
                offset: 8,
                reason: "not an IPv6 packet",
            }
        );

        let err = Ipv6Handler
            .dissect(&ctx(&data[..10], 0, &frame, &endpoints))
            .unwrap_err();
        assert!(matches!(
            err,
            TeredoError::InvalidPayload { reason: "truncated IPv6 header", .. }
        ));
    }

    #[test]
    fn test_raw_handler_accepts_anything() {
        let frame = ParsedFrame::default();
        let endpoints = Endpoints::default();
        let out = RawHandler
            .dissect(&ctx(&[0xFF], 0, &frame, &endpoints))
            .unwrap();
        assert_eq!(out, PayloadInfo::Opaque { len: 1 });
        assert_eq!(out.to_string(), "data (1 bytes)");
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PayloadRegistry>();
    }
}
