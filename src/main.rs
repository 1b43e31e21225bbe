//! PadGrid runtime binary
//!
//! Wires the MIDI transport, device session, and surface runtime together
//! and runs the interactive console alongside the event loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use once_cell::sync::OnceCell;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use padgrid::color::ColorTranslator;
use padgrid::config::AppConfig;
use padgrid::host::NullHost;
use padgrid::modes::builtin::{DrumView, VolumeMode};
use padgrid::modes::{ModeId, ViewId};
use padgrid::probe;
use padgrid::protocol::{decode, Decoded};
use padgrid::session::{AckHandle, DeviceSession};
use padgrid::transport::MidiTransport;
use padgrid::{cli, SurfaceRuntime};

/// PadGrid Runtime - bridge PadGrid controllers with a music production host
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Run in probe mode (no host; monitor traffic, sweep lights)
    #[arg(long)]
    probe: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting PadGrid runtime...");

    if args.list_ports {
        probe::list_ports_formatted();
        return Ok(());
    }

    let config = AppConfig::load(&args.config).await?;
    info!("Configuration loaded from {}", args.config);

    if args.probe {
        return probe::run_probe(&config.device.input_port, &config.device.output_port).await;
    }

    run_app(config).await?;

    info!("PadGrid runtime shutdown complete");
    Ok(())
}

async fn run_app(config: AppConfig) -> Result<()> {
    let (frame_tx, frame_rx) = mpsc::channel::<Vec<u8>>(256);

    // The handshake acknowledgment is applied directly on the MIDI callback
    // thread through the session's ack handle, so the cache is guaranteed
    // clear before the event loop's next flush. The handle only exists once
    // the session does; until then acks fall through to the event loop.
    let ack_cell: Arc<OnceCell<AckHandle>> = Arc::new(OnceCell::new());
    let ack_for_callback = ack_cell.clone();

    let midi = MidiTransport::connect(
        &config.device.input_port,
        &config.device.output_port,
        move |frame| {
            if let Some(Decoded::HandshakeAck { version }) = decode(&frame) {
                if let Some(handle) = ack_for_callback.get() {
                    handle.handshake_acknowledged(version);
                    return;
                }
            }
            if frame_tx.try_send(frame).is_err() {
                warn!("event queue full, frame dropped");
            }
        },
    )?;

    let session = DeviceSession::new(
        Box::new(midi),
        config.velocity_curve(),
        config.pads.fixed_accent,
    );
    if ack_cell.set(session.ack_handle()).is_err() {
        unreachable!("ack handle set once");
    }

    // Host integration glue attaches here; the stub host keeps the surface
    // alive for bench use without a DAW.
    let mut runtime = SurfaceRuntime::new(
        session,
        ColorTranslator::factory(),
        Box::new(NullHost::default()),
    );
    runtime.register_mode(Box::new(VolumeMode));
    runtime.register_view(Box::new(DrumView));
    runtime.activate_mode(ModeId::Volume)?;
    runtime.activate_view(ViewId::Drum)?;

    runtime.connect()?;

    let (command_tx, command_rx) = mpsc::channel(32);
    std::thread::spawn(move || {
        if let Err(e) = cli::run_repl(command_tx) {
            warn!("console stopped: {:#}", e);
        }
    });

    runtime
        .run(
            frame_rx,
            command_rx,
            Duration::from_millis(config.flush_interval_ms),
            shutdown_signal(),
        )
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
