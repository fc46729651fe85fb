#![deny(unsafe_code)]

//! twinwatch-sentinel — the companion process spawned by an application's
//! `begin()` call. Watches the application, revives it on silence, and is in
//! turn watched and revived by the application.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "twinwatch-sentinel",
    author,
    version,
    about = "Mutual-liveness sentinel for a twinwatch-monitored application"
)]
struct Cli {
    /// Heartbeat period, in whole seconds.
    #[arg(long, default_value_t = 5)]
    interval: u64,
    /// Consecutive missed heartbeats before the application is presumed dead.
    #[arg(long, default_value_t = 3)]
    threshold: u64,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = twinwatch::protocol::bootstrap::run_sentinel(cli.interval, cli.threshold) {
        eprintln!("twinwatch-sentinel: {e}");
        std::process::exit(1);
    }
}
