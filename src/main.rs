//! Entry point for `gbn-ftp`.
//!
//! Parses CLI arguments and dispatches into either **send** or **recv** mode.
//! All actual protocol work is delegated to library modules; `main.rs` owns only
//! process setup (logging, signal handling, argument parsing).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use gbn_ftp::{config, socket, ReceiverConfig, SenderConfig};

/// Simple FTP over UDP with Go-Back-N ARQ.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Send a file to a listening receiver.
    Send {
        /// Receiver host name or address.
        host: String,
        /// Receiver UDP port.
        port: u16,
        /// File to transfer.
        file: PathBuf,
        /// Go-Back-N window size N.
        window_size: usize,
        /// Maximum segment size in bytes.
        mss: usize,
        /// Retransmission timeout in milliseconds.
        #[arg(long, default_value_t = config::DEFAULT_RTO.as_millis() as u64)]
        timeout_ms: u64,
        /// Abandon the transfer after this many timeouts without progress.
        #[arg(long)]
        max_timeouts: Option<u32>,
    },
    /// Receive a file, simulating packet loss, until interrupted.
    Recv {
        /// UDP port to listen on.
        port: u16,
        /// Where to write the received bytes.
        output: PathBuf,
        /// Probability in [0, 1) of dropping each inbound datagram.
        loss_probability: f64,
        /// Seed for the loss simulator, for reproducible runs.
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Send {
            host,
            port,
            file,
            window_size,
            mss,
            timeout_ms,
            max_timeouts,
        } => {
            let config = SenderConfig {
                window_size,
                mss,
                rto: Duration::from_millis(timeout_ms),
                max_timeouts,
            };
            let peer = socket::resolve(&host, port).await?;
            let report = gbn_ftp::send_file(&file, peer, &config)
                .await
                .with_context(|| format!("sending '{}' to {peer}", file.display()))?;
            println!(
                "Done! Time: {:.3}s, Retransmissions: {}",
                report.elapsed.as_secs_f64(),
                report.retransmissions
            );
        }
        Mode::Recv {
            port,
            output,
            loss_probability,
            seed,
        } => {
            let config = ReceiverConfig {
                loss_probability,
                seed,
            };
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("cannot listen for Ctrl-C: {e}");
                    std::future::pending::<()>().await;
                }
            };
            gbn_ftp::receive_file(port, &output, &config, shutdown)
                .await
                .with_context(|| format!("receiving into '{}'", output.display()))?;
        }
    }

    Ok(())
}
