use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use m17_gateway::logging::{init_logger, log_error, log_info};
use m17_gateway::m17::network::NetworkFrameSink;
use m17_gateway::m17::{controller, lsf};
use m17_gateway::{ControllerConfig, M17Controller, M17NetworkEndpoint};

#[derive(Parser)]
#[command(name = "m17-gatewayd")]
#[command(about = "M17 protocol engine and mode arbiter host process")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decodes a hex-encoded Link Setup Frame and prints its fields.
    DecodeLsf { hex: String },
    /// Decodes a hex-encoded 48-byte Stream Frame and prints its fields.
    DecodeFrame { hex: String },
    /// Runs the M17 controller against a UDP gateway, reading modem RF
    /// bytes from stdin (hex, one frame per line) until EOF.
    Serve {
        #[arg(long)]
        callsign: String,
        #[arg(long, default_value_t = 1)]
        can: u16,
        #[arg(long, default_value = "0.0.0.0:17000")]
        local: SocketAddr,
        #[arg(long)]
        gateway: SocketAddr,
        #[arg(long, default_value_t = 5)]
        tx_hang_seconds: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::DecodeLsf { hex } => {
            let bytes = hex::decode(hex.trim())?;
            match lsf::decode(&bytes) {
                Ok(lsf) => log_info(&format!("{lsf:?}")),
                Err(err) => {
                    log_error(&format!("decode failed: {err}"));
                    std::process::exit(1);
                }
            }
        }
        Commands::DecodeFrame { hex } => {
            let bytes = hex::decode(hex.trim())?;
            match m17_gateway::m17::frame::decode(&bytes) {
                Ok(frame) => log_info(&format!("{frame:?}")),
                Err(err) => {
                    log_error(&format!("decode failed: {err}"));
                    std::process::exit(1);
                }
            }
        }
        Commands::Serve {
            callsign,
            can,
            local,
            gateway,
            tx_hang_seconds,
        } => {
            run_serve(callsign, can, local, gateway, tx_hang_seconds).await?;
        }
    }

    Ok(())
}

/// Wires the M17 controller to a live UDP gateway and drains stdin as a
/// stand-in for the modem's RF byte stream. The real modem serial/UDP
/// transport and INI configuration loading are external collaborators
/// (out of scope per this crate's spec) left for the host binary that
/// embeds this engine.
async fn run_serve(
    callsign: String,
    can: u16,
    local: SocketAddr,
    gateway: SocketAddr,
    tx_hang_seconds: u16,
) -> anyhow::Result<()> {
    let network = M17NetworkEndpoint::bind(local, gateway).await.map_err(|e| {
        log_error(&format!("failed to bind m17 network endpoint: {e}"));
        e
    })?;
    log_info(&format!("m17 network endpoint bound to {local}, peer {gateway}"));

    let network_sink = Arc::new(NetworkFrameSink::new(network.clone()));
    let modem_sink: Arc<dyn controller::FrameSink> = Arc::new(controller::NullSink);

    let config = ControllerConfig {
        local_callsign: callsign,
        self_only: false,
        allow_encryption: false,
        can_filter: Some(can),
        tx_hang_ms: tx_hang_seconds as u64 * 1_000,
        global_watchdog_ms: Some(tx_hang_seconds as u64 * 2_000),
    };
    let mut controller = M17Controller::new(config, network_sink, modem_sink);

    let mut ticker = tokio::time::interval(Duration::from_millis(20));
    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());

    loop {
        let mut line = String::new();

        tokio::select! {
            _ = ticker.tick() => {
                controller.clock(20);
                network.clock(20).await;
                controller.process_rf();
                controller.process_net();
                if let Some(bytes) = network.read().await {
                    controller.write_net(&bytes);
                }
            }
            n = stdin.read_line(&mut line) => {
                let n = n?;
                if n == 0 {
                    log_info("stdin closed, shutting down");
                    break;
                }
                if let Ok(bytes) = hex::decode(line.trim()) {
                    if !controller.write_rf(&bytes) {
                        log_error("rf queue full, dropping frame");
                    }
                }
            }
        }
    }

    network.close().await;
    Ok(())
}
