use clap::Parser;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teredo_strata::config::FallbackKind;
use teredo_strata::{DecoderConfig, TeredoDecoder};
use tracing::{debug, error, info};

mod locate;
mod packet_metadata;
mod process;
mod stats;

use process::Pipeline;

#[derive(Parser, Debug)]
#[command(name = "teredo-reader")]
#[command(about = "Decode Teredo frames from a pcap/pcapng capture", long_about = None)]
struct Args {
    /// Path to the PCAP file to read
    #[arg(short, long, value_name = "FILE")]
    pcap: PathBuf,

    /// UDP port carrying Teredo
    #[arg(long, default_value_t = teredo_strata::packet::teredo::TEREDO_PORT)]
    port: u16,

    /// treat payloads without a registered handler as opaque data instead of IPv6
    #[arg(short, long)]
    raw_fallback: bool,

    /// print every decoded frame
    #[arg(short, long)]
    dump_frames: bool,

    /// print statistics at the end
    #[arg(short, long)]
    stats: bool,
}

impl Args {
    fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            udp_port: self.port,
            fallback: if self.raw_fallback {
                FallbackKind::Raw
            } else {
                FallbackKind::Ipv6
            },
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.decoder_config();
    let stats = Arc::new(stats::Stats::default());
    let decoder = TeredoDecoder::new(Arc::new(config.registry())).with_sink(stats.clone());

    let pipeline = Pipeline {
        config: &config,
        decoder: &decoder,
        stats: &stats,
        dump_frames: args.dump_frames,
    };

    info!("Reading PCAP file: {:?}", args.pcap);
    if let Err(e) = process_pcap(&args.pcap, &pipeline) {
        error!("Failed to process PCAP file: {}", e);
        std::process::exit(1);
    }
    if args.stats {
        println!("{stats}");
    }
}

fn process_pcap(pcap_path: &Path, pipeline: &Pipeline<'_>) -> Result<(), String> {
    let mut local_stats = stats::LocalStats::new();
    let mut packet_count = 0u64;
    let start = std::time::Instant::now();

    let open =
        || File::open(pcap_path).map_err(|e| format!("cannot open {:?}: {}", pcap_path, e));

    match PcapNGReader::new(65536, open()?) {
        Ok(mut reader) => {
            info!("Detected PCAPNG format");
            // Interfaces in the order their description blocks appear
            let mut linktypes: Vec<Linktype> = Vec::new();
            loop {
                match reader.next() {
                    Ok((offset, block)) => {
                        match block {
                            PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                                linktypes.clear();
                            }
                            PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                                debug!(linktype = ?idb.linktype, "interface description");
                                linktypes.push(idb.linktype);
                            }
                            PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                                packet_count += 1;
                                let linktype = linktypes
                                    .get(epb.if_id as usize)
                                    .copied()
                                    .unwrap_or(Linktype::ETHERNET);
                                process::process_packet(
                                    packet_count,
                                    linktype,
                                    &epb,
                                    &mut local_stats,
                                    pipeline,
                                );
                            }
                            PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                                packet_count += 1;
                                let linktype =
                                    linktypes.first().copied().unwrap_or(Linktype::ETHERNET);
                                process::process_packet(
                                    packet_count,
                                    linktype,
                                    &spb,
                                    &mut local_stats,
                                    pipeline,
                                );
                            }
                            _ => {}
                        }
                        reader.consume(offset);
                    }
                    Err(PcapError::Eof) => break,
                    Err(PcapError::Incomplete(_)) => {
                        reader
                            .refill()
                            .map_err(|e| format!("Error reading PCAPNG: {:?}", e))?;
                    }
                    Err(e) => {
                        return Err(format!("Error reading PCAPNG: {:?}", e));
                    }
                }
            }
        }
        Err(_) => {
            let mut reader = LegacyPcapReader::new(65536, open()?)
                .map_err(|e| format!("Failed to create PCAP reader: {:?}", e))?;
            let mut linktype = Linktype::ETHERNET;

            loop {
                match reader.next() {
                    Ok((offset, block)) => {
                        match block {
                            PcapBlockOwned::LegacyHeader(header) => {
                                info!(linktype = ?header.network, "Legacy PCAP header found");
                                linktype = header.network;
                            }
                            PcapBlockOwned::Legacy(packet) => {
                                packet_count += 1;
                                process::process_packet(
                                    packet_count,
                                    linktype,
                                    &packet,
                                    &mut local_stats,
                                    pipeline,
                                );
                            }
                            _ => {}
                        }
                        reader.consume(offset);
                    }
                    Err(PcapError::Eof) => break,
                    Err(PcapError::Incomplete(_)) => {
                        reader
                            .refill()
                            .map_err(|e| format!("Error reading PCAP: {:?}", e))?;
                    }
                    Err(e) => {
                        return Err(format!("Error reading PCAP: {:?}", e));
                    }
                }
            }
        }
    }

    local_stats.flush(pipeline.stats);

    info!(
        "Total packets processed: {}, {:.3}M pkt/sec, {} Teredo frames, {} malformed",
        packet_count,
        (packet_count as f64 / start.elapsed().as_secs_f64()) / 1_000_000.0,
        pipeline.stats.frames.load(std::sync::atomic::Ordering::Relaxed),
        pipeline.stats.total_malformed()
    );
    Ok(())
}
