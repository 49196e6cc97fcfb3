//! Decoder configuration
//!
//! Which UDP port counts as Teredo and what to do with payloads nobody
//! registered a handler for.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dispatch::{Ipv6Handler, PayloadHandler, PayloadRegistry, RawHandler};
use crate::packet::teredo::TEREDO_PORT;

/// Handler used for payload keys without a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackKind {
    #[default]
    Ipv6,
    Raw,
}

impl FallbackKind {
    pub fn handler(&self) -> Arc<dyn PayloadHandler> {
        match self {
            FallbackKind::Ipv6 => Arc::new(Ipv6Handler),
            FallbackKind::Raw => Arc::new(RawHandler),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub udp_port: u16,
    pub fallback: FallbackKind,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            udp_port: TEREDO_PORT,
            fallback: FallbackKind::default(),
        }
    }
}

impl DecoderConfig {
    /// True if either side of the datagram uses the configured port
    #[inline]
    pub fn matches_ports(&self, src_port: u16, dst_port: u16) -> bool {
        src_port == self.udp_port || dst_port == self.udp_port
    }

    /// Empty registry with the configured fallback
    pub fn registry(&self) -> PayloadRegistry {
        PayloadRegistry::with_fallback(self.fallback.handler())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::default();
        assert_eq!(config.udp_port, 3544);
        assert_eq!(config.fallback, FallbackKind::Ipv6);
        assert!(config.matches_ports(3544, 50000));
        assert!(config.matches_ports(50000, 3544));
        assert!(!config.matches_ports(53, 50000));
        assert_eq!(config.registry().fallback().name(), "ipv6");
    }

    #[test]
    fn test_custom_port_and_raw_fallback() {
        let config = DecoderConfig {
            udp_port: 13544,
            fallback: FallbackKind::Raw,
        };
        assert!(config.matches_ports(13544, 1));
        assert!(!config.matches_ports(3544, 1));

        let registry = config.registry();
        assert!(registry.is_empty());
        assert_eq!(registry.fallback().name(), "data");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: DecoderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DecoderConfig::default());

        let config: DecoderConfig = serde_json::from_str(r#"{"fallback":"raw"}"#).unwrap();
        assert_eq!(config.udp_port, 3544);
        assert_eq!(config.fallback, FallbackKind::Raw);

        let config: DecoderConfig = serde_json::from_str(r#"{"udp_port":13544}"#).unwrap();
        assert_eq!(config.udp_port, 13544);
        assert_eq!(config.fallback, FallbackKind::Ipv6);

        assert!(serde_json::from_str::<DecoderConfig>(r#"{"fallback":"ipv4"}"#).is_err());
    }

    #[test]
    fn test_config_serializes() {
        let json = serde_json::to_value(DecoderConfig::default()).unwrap();
        assert_eq!(json, serde_json::json!({"udp_port": 3544, "fallback": "ipv6"}));
    }
}
