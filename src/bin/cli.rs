//! hidwire CLI
//!
//! Encode messages into chunk captures and decode captures back into frames.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use hidwire::device::KNOWN_DEVICES;
use hidwire::protocol::{v1, v2, Chunk, CodecV1, CodecV2, WireCodec};
use hidwire::transport::{write_capture, CaptureRecord, CaptureTransport, ChunkLink};
use hidwire::{Config, OpaqueRegistry, ProtocolCoordinator, Result, WireError};
use tracing_subscriber::{fmt, EnvFilter};

/// hidwire CLI
#[derive(Parser, Debug)]
#[command(name = "hidwire-cli")]
#[command(about = "Encode and decode 64-byte chunk framed messages")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode one message and print its chunks as a capture
    Encode {
        /// Wire format
        #[arg(short, long, value_enum, default_value = "v1")]
        protocol: ProtocolArg,

        /// Session id (required for v2)
        #[arg(short, long)]
        session: Option<u32>,

        /// Message type id
        #[arg(short = 't', long)]
        message_type: u32,

        /// Payload as hex
        #[arg(long, default_value = "")]
        payload: String,
    },

    /// Decode every device-to-host frame of a capture file
    Decode {
        /// Wire format
        #[arg(short, long, value_enum, default_value = "v1")]
        protocol: ProtocolArg,

        /// Session id the capture was recorded under (v2; defaults to the
        /// id in the capture's session open ack)
        #[arg(short, long)]
        session: Option<u32>,

        /// Capture file
        file: PathBuf,
    },

    /// List known devices and their wire format
    Devices,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ProtocolArg {
    V1,
    V2,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hidwire=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Encode {
            protocol,
            session,
            message_type,
            payload,
        } => encode(protocol, session, message_type, &payload),
        Commands::Decode {
            protocol,
            session,
            file,
        } => decode(protocol, session, file),
        Commands::Devices => {
            devices();
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn require_session(session: Option<u32>) -> Result<u32> {
    session.ok_or_else(|| WireError::ProtocolState("--session is required for v2".into()))
}

fn encode(protocol: ProtocolArg, session: Option<u32>, message_type: u32, payload: &str) -> Result<()> {
    let payload = hex::decode(payload.trim())
        .map_err(|e| WireError::Serialization(format!("payload is not hex: {}", e)))?;

    let chunks: Vec<Chunk> = match protocol {
        ProtocolArg::V1 => v1::encode_frame(message_type, &payload)?,
        ProtocolArg::V2 => v2::encode_frame(require_session(session)?, message_type, &payload)?,
    };
    tracing::info!("Encoded {} bytes into {} chunks", payload.len(), chunks.len());

    let records: Vec<CaptureRecord> = chunks.iter().map(CaptureRecord::to_device).collect();
    write_capture(&mut io::stdout().lock(), &records)
}

fn decode(protocol: ProtocolArg, session: Option<u32>, file: PathBuf) -> Result<()> {
    let config = Config::default();
    let mut transport = CaptureTransport::open_file(&file)?;

    let codec: Box<dyn WireCodec> = match protocol {
        ProtocolArg::V1 => Box::new(CodecV1::new(config.max_message_size)),
        ProtocolArg::V2 => {
            let opened = transport.strip_session_control()?;
            Box::new(CodecV2::with_session(
                config.max_message_size,
                require_session(session.or(opened))?,
            ))
        }
    };
    tracing::info!("Replaying {} chunks from {}", transport.remaining(), file.display());

    let link = ChunkLink::new(Box::new(transport), &config);
    let mut coordinator = ProtocolCoordinator::new(link, codec, OpaqueRegistry)?;

    let mut frames = 0;
    while let Some(message) = coordinator.read()? {
        frames += 1;
        println!(
            "type={} len={} payload={}",
            message.message_type,
            message.payload.len(),
            hex::encode(&message.payload)
        );
    }
    tracing::info!("Decoded {} frames", frames);

    coordinator.close()
}

fn devices() {
    for device in KNOWN_DEVICES {
        println!(
            "{:04x}:{:04x}  {:<20} {}",
            device.id.vendor_id, device.id.product_id, device.name, device.version
        );
    }
}
