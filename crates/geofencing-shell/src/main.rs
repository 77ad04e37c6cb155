// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geofencing shell host.
//
// Entry point. Initialises logging, loads the adapter config, builds the
// location-services backend and serves invocations read from stdin until it
// closes. Results and notifications are written to stdout; logs go to stderr.
//
// Usage: geofencing-shell [--simulate] [config.json]

mod protocol;

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use geofencing_adapter::{ChannelShell, GeofencingAdapter, Outbound};
use geofencing_bridge::sim::SimulatedLocationServices;
use geofencing_core::AdapterConfig;
use geofencing_core::error::Result;

use protocol::InboundLine;

const DEFAULT_CONFIG_FILE: &str = "geofencing.json";

struct Options {
    config: PathBuf,
    /// Use the in-memory platform instead of the native one.
    simulate: bool,
}

fn parse_options() -> Options {
    let mut options = Options {
        config: PathBuf::from(DEFAULT_CONFIG_FILE),
        simulate: false,
    };
    for arg in std::env::args().skip(1) {
        if arg == "--simulate" {
            options.simulate = true;
        } else {
            options.config = PathBuf::from(arg);
        }
    }
    options
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let options = parse_options();

    // Config decides the default log filter, so it is read before logging
    // exists and reported right after.
    let loaded = AdapterConfig::load(&options.config);
    let config = loaded.as_ref().ok().cloned().unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &loaded {
        Ok(_) => info!(path = %options.config.display(), "adapter config loaded"),
        Err(e) => warn!(path = %options.config.display(), "using default adapter config: {e}"),
    }
    info!(simulate = options.simulate, "geofencing shell starting");

    let (shell, outbound) = ChannelShell::new();
    let (adapter, sim) = if options.simulate {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let sim = SimulatedLocationServices::new(events_tx);
        let adapter =
            GeofencingAdapter::new(Box::new(sim.clone()), Box::new(shell), events_rx, config);
        (adapter, Some(sim))
    } else {
        (GeofencingAdapter::with_platform(Box::new(shell), config)?, None)
    };

    // Invocations and simulation lines share one channel so each line takes
    // effect after the ones read before it.
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let reader = tokio::spawn(read_stdin(inbound_tx));
    let writer = tokio::spawn(write_stdout(outbound));

    // Returns once stdin is exhausted; dropping the adapter closes `outbound`.
    adapter
        .run_with(inbound_rx, move |adapter, line| {
            protocol::apply(adapter, sim.as_ref(), line)
        })
        .await;

    if let Err(e) = reader.await {
        warn!("stdin reader aborted: {e}");
    }
    match writer.await {
        Ok(written) => written?,
        Err(e) => warn!("stdout writer aborted: {e}"),
    }

    info!("geofencing shell stopped");
    Ok(())
}

async fn read_stdin(inbound: mpsc::UnboundedSender<InboundLine>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("stdin read failed: {e}");
                break;
            }
        };

        match protocol::parse_line(&line) {
            Ok(None) => {}
            Ok(Some(parsed)) => {
                if inbound.send(parsed).is_err() {
                    break;
                }
            }
            Err(e) => warn!("malformed input line: {e}"),
        }
    }
    debug!("stdin closed");
}

async fn write_stdout(mut outbound: mpsc::UnboundedReceiver<Outbound>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = outbound.recv().await {
        let mut line = protocol::encode(&message)?;
        line.push('\n');
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}
