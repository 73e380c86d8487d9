// emu817d -- FT-817 CAT emulator daemon.
//
// Presents a Yaesu FT-817 on a serial port (usually one end of a socat
// pty pair) and drives an SDR receiver chain from the CAT commands it
// receives, so that logging and digimode software tune a dongle as if it
// were a real radio.
//
// Usage:
//   socat -d -d pty,raw,echo=0,link=/tmp/ttyv0 pty,raw,echo=0,link=/tmp/ttyv1 &
//   emu817d --port /tmp/ttyv1 \
//       --rx-command 'rtl_sdr -f %FREQ% -s 250000 - | csdr ...' \
//       --ready-marker 'Tuned to'
//   wsjtx  # rig: FT-817, device: /tmp/ttyv0

mod backend;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use emu817_cat::{CatResponder, CommandDispatcher};
use emu817_core::{
    BackendController, Mode, RadioConfig, TransceiverState, DEFAULT_BAUD_RATE, DEFAULT_FREQUENCY,
};
use emu817_transport::SerialTransport;

use backend::{NullBackend, ProcessBackend};

/// FT-817 CAT emulator fronting an SDR receiver chain.
#[derive(Parser)]
#[command(name = "emu817d", version, about)]
struct Cli {
    /// Serial device to listen on (one end of a pty pair).
    #[arg(short, long, default_value = "/tmp/ttyv1")]
    port: String,

    /// Serial baud rate.
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Initial frequency in Hz, loaded into both VFOs.
    #[arg(short, long, default_value_t = DEFAULT_FREQUENCY)]
    frequency: u64,

    /// Initial mode: lsb, usb, cw, cwr, am, fm, dig, pkt.
    #[arg(short, long, default_value = "usb")]
    mode: Mode,

    /// Boot with the front panel locked.
    #[arg(long)]
    lock: bool,

    /// Boot with split operation on.
    #[arg(long)]
    split: bool,

    /// Boot with the clarifier on.
    #[arg(long)]
    clarifier: bool,

    /// Receiver chain command, run under `sh -c`. `%FREQ%` expands to the
    /// active frequency in Hz and `%MODE%` to the mode name. Restarted on
    /// every retune. Without this flag the CAT side runs standalone.
    #[arg(short = 'c', long)]
    rx_command: Option<String>,

    /// Wait for a stdout line containing this marker before treating the
    /// receiver chain as started.
    #[arg(long, requires = "rx_command")]
    ready_marker: Option<String>,

    /// Seconds to wait for the ready marker.
    #[arg(long, default_value_t = 10)]
    ready_timeout: u64,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn radio_config(&self) -> RadioConfig {
        RadioConfig {
            port: self.port.clone(),
            baud_rate: self.baud,
            frequency: self.frequency,
            mode: self.mode,
            lock: self.lock,
            split: self.split,
            clarifier: self.clarifier,
        }
    }

    fn backend(&self) -> Box<dyn BackendController> {
        match &self.rx_command {
            Some(template) => {
                let mut backend = ProcessBackend::new(template.clone())
                    .with_ready_timeout(Duration::from_secs(self.ready_timeout));
                if let Some(marker) = &self.ready_marker {
                    backend = backend.with_ready_marker(marker.clone());
                }
                Box::new(backend)
            }
            None => Box::new(NullBackend),
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("emu817={default},emu817d={default}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.radio_config();
    let state = TransceiverState::from_config(&config);
    info!(port = %config.port, baud = config.baud_rate, status = %state, "starting emulator");

    let mut dispatcher = CommandDispatcher::new(state, cli.backend());
    dispatcher
        .start_backend()
        .await
        .context("starting the receiver chain")?;

    let transport = SerialTransport::open(&config.port, config.baud_rate)
        .await
        .with_context(|| format!("opening serial port {}", config.port))?;

    let mut responder = CatResponder::new(Box::new(transport), dispatcher);

    let session = tokio::select! {
        result = responder.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    match session {
        // run() stops the backend on its own exit paths.
        Some(result) => result.context("CAT session failed")?,
        None => {
            info!("shutdown signal received");
            responder.shutdown().await.context("shutting down")?;
        }
    }

    info!("emulator stopped");
    Ok(())
}
