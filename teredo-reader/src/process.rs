use pcap_parser::Linktype;
use teredo_strata::{DecoderConfig, TeredoDecoder};
use tracing::trace;

use crate::locate::{udp_datagram, Skip};
use crate::packet_metadata::PacketMetadata;
use crate::stats::{LocalStats, Stats, FLUSH_INTERVAL};

/// What the reading loop needs to hand a packet to the decoder
pub struct Pipeline<'a> {
    pub config: &'a DecoderConfig,
    pub decoder: &'a TeredoDecoder,
    pub stats: &'a Stats,
    pub dump_frames: bool,
}

/// Locate the UDP payload of one captured packet and decode it as Teredo
/// if either port matches
#[inline]
pub fn process_packet<Pkt: PacketMetadata>(
    pkt_count: u64,
    linktype: Linktype,
    pkt: &Pkt,
    local_stats: &mut LocalStats,
    pipeline: &Pipeline<'_>,
) {
    local_stats.total_packets += 1;
    local_stats.total_bytes += pkt.caplen() as u64;

    match udp_datagram(pkt.data(), linktype) {
        Ok(datagram) => {
            if pipeline
                .config
                .matches_ports(datagram.src_port(), datagram.dst_port())
            {
                local_stats.teredo_bytes += datagram.payload.len() as u64;
                let result = pipeline
                    .decoder
                    .decode(datagram.payload, &datagram.endpoints);
                if matches!(&result, Ok(dissection) if dissection.info.is_err()) {
                    local_stats.payload_rejected += 1;
                }

                if pipeline.dump_frames {
                    println!(
                        "{:>5}   {}   {} -> {} ({} bytes)",
                        pkt_count,
                        pkt.timestamp(),
                        datagram.endpoints.src,
                        datagram.endpoints.dst,
                        datagram.payload.len()
                    );
                    match result {
                        Ok(dissection) => {
                            println!("        {}", dissection.frame);
                            match &dissection.info {
                                Ok(info) => println!("        [{}] {}", dissection.handler, info),
                                Err(err) => println!("        [{}] {}", dissection.handler, err),
                            }
                        }
                        Err(err) => println!("        {err}"),
                    }
                }
            } else {
                local_stats.other_port += 1;
            }
        }
        Err(skip) => {
            trace!(packet = pkt_count, ?skip, "no UDP payload");
            match skip {
                Skip::UnsupportedLinktype => local_stats.unsupported_link += 1,
                Skip::NotIpv4 => local_stats.not_ipv4 += 1,
                Skip::NotUdp => local_stats.not_udp += 1,
                Skip::Fragment => local_stats.fragments += 1,
                Skip::Truncated => local_stats.truncated += 1,
            }
        }
    }

    if local_stats.should_flush(FLUSH_INTERVAL) {
        local_stats.flush(pipeline.stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use crate::packet_metadata::TimestampNsec;

    struct Captured(Vec<u8>);

    impl PacketMetadata for Captured {
        fn data(&self) -> &[u8] {
            &self.0
        }

        fn timestamp(&self) -> TimestampNsec {
            TimestampNsec::default()
        }
    }

    fn raw_udp(src_port: u16, dst_port: u16, payload: &[u8]) -> Captured {
        let mut packet = vec![0x45, 0x00];
        packet.extend_from_slice(&((28 + payload.len()) as u16).to_be_bytes());
        packet.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 64, 17, 0x00, 0x00]);
        packet.extend_from_slice(&[192, 0, 2, 1, 192, 0, 2, 2]);
        packet.extend_from_slice(&src_port.to_be_bytes());
        packet.extend_from_slice(&dst_port.to_be_bytes());
        packet.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
        packet.extend_from_slice(&[0x00, 0x00]);
        packet.extend_from_slice(payload);
        Captured(packet)
    }

    #[test]
    fn test_pipeline_counts() {
        let config = DecoderConfig::default();
        let stats = Arc::new(Stats::default());
        let decoder =
            TeredoDecoder::new(Arc::new(config.registry())).with_sink(stats.clone());
        let pipeline = Pipeline {
            config: &config,
            decoder: &decoder,
            stats: &stats,
            dump_frames: false,
        };
        let mut local = LocalStats::new();

        // Origin Indication followed by a truncated IPv6 header: the frame
        // stands, the IPv6 handler refuses the payload
        let mut teredo = vec![0x00, 0x00, 0xF2, 0x27, 0x3F, 0xFF, 0xFD, 0xD2];
        teredo.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);
        let pkt = raw_udp(3544, 40000, &teredo);
        process_packet(1, Linktype::RAW, &pkt, &mut local, &pipeline);

        // Truncated Authentication header
        let pkt = raw_udp(40000, 3544, &[0x00, 0x01, 0x05]);
        process_packet(2, Linktype::RAW, &pkt, &mut local, &pipeline);

        let pkt = raw_udp(53, 40000, &[0x00]);
        process_packet(3, Linktype::RAW, &pkt, &mut local, &pipeline);

        let pkt = Captured(vec![0x00; 4]);
        process_packet(4, Linktype::ETHERNET, &pkt, &mut local, &pipeline);
        local.flush(&stats);

        assert_eq!(stats.total_packets.load(Ordering::Relaxed), 4);
        assert_eq!(stats.other_port.load(Ordering::Relaxed), 1);
        assert_eq!(stats.truncated.load(Ordering::Relaxed), 1);
        assert_eq!(stats.frames.load(Ordering::Relaxed), 1);
        assert_eq!(stats.origin.load(Ordering::Relaxed), 1);
        assert_eq!(stats.payload_rejected.load(Ordering::Relaxed), 1);
        assert_eq!(stats.malformed_payload.load(Ordering::Relaxed), 0);
        assert_eq!(stats.malformed_authentication.load(Ordering::Relaxed), 1);
    }
}
