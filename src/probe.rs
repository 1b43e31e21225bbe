//! Device probe for debugging and development
//!
//! Connects to a PadGrid unit with no host attached, prints every decoded
//! inbound frame, and runs a lighting sweep once the handshake completes so
//! a unit fresh out of the box can be exercised end to end.

use anyhow::Result;
use colored::*;
use tokio::sync::mpsc;
use tracing::warn;

use crate::controls::PAD_COUNT;
use crate::protocol::velocity::VelocityCurve;
use crate::protocol::{decode, Decoded};
use crate::session::{ConnectionState, DeviceSession};
use crate::transport::{self, MidiTransport};

/// Print discovered MIDI ports.
pub fn list_ports_formatted() {
    println!("\n{}", "=== MIDI Input Ports ===".bold());
    match transport::list_input_ports() {
        Ok(ports) => {
            for (i, name) in ports.iter().enumerate() {
                println!("  {}: {}", i, name);
            }
        }
        Err(e) => println!("  {} {}", "error:".red(), e),
    }

    println!("\n{}", "=== MIDI Output Ports ===".bold());
    match transport::list_output_ports() {
        Ok(ports) => {
            for (i, name) in ports.iter().enumerate() {
                println!("  {}: {}", i, name);
            }
        }
        Err(e) => println!("  {} {}", "error:".red(), e),
    }
    println!();
}

fn print_frame(frame: &[u8]) {
    let tag = "IN ".green();
    let hex = hex::encode(frame);
    match decode(frame) {
        Some(decoded) => println!("{} {} => {:?}", tag, hex, decoded),
        None => println!("{} {} => {}", tag, hex, "(unmapped)".dimmed()),
    }
}

/// Run the probe until Ctrl+C.
pub async fn run_probe(input_pattern: &str, output_pattern: &str) -> Result<()> {
    println!("{}", "=== PadGrid Probe ===".bold().cyan());
    println!("Press Ctrl+C to exit\n");

    let (frame_tx, mut frame_rx) = mpsc::channel::<Vec<u8>>(256);
    let midi = MidiTransport::connect(input_pattern, output_pattern, move |frame| {
        let _ = frame_tx.try_send(frame);
    })?;

    let mut session = DeviceSession::new(Box::new(midi), VelocityCurve::factory(), false);
    session.initiate_handshake()?;
    println!("{}", "Handshake sent, waiting for device...".dimmed());

    let mut swept = false;
    loop {
        tokio::select! {
            maybe_frame = frame_rx.recv() => {
                let Some(frame) = maybe_frame else { break };
                print_frame(&frame);

                if let Some(Decoded::HandshakeAck { version }) = decode(&frame) {
                    println!(
                        "{} device answered with v{}",
                        "Connected:".green().bold(),
                        version
                    );
                }

                if let Some(event) = session.handle_frame(&frame) {
                    println!("    {} {:?}", "event".yellow(), event);
                }

                // One sweep across the grid palette proves the output path.
                if !swept && session.connection_state() == ConnectionState::Connected {
                    swept = true;
                    let pads: Vec<(u8, u8)> =
                        (0..PAD_COUNT as u8).map(|i| (i, i + 1)).collect();
                    if let Err(e) = session.flush_lighting(&[], &pads) {
                        warn!("lighting sweep failed: {:#}", e);
                    } else {
                        println!("{}", "Lighting sweep sent".dimmed());
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n{}", "Probe stopped".dimmed());
                break;
            }
        }
    }

    session.shutdown();
    Ok(())
}
