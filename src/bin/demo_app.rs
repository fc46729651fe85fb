#![deny(unsafe_code)]

//! twinwatch-demo — a minimal stand-in application showing the mechanical
//! glue a real application needs: call `begin()` once at startup, do its own
//! work, call `end()` once at shutdown.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "twinwatch-demo",
    author,
    version,
    about = "Sample application wired up with twinwatch mutual-liveness monitoring"
)]
struct Cli {
    /// Heartbeat period, in whole seconds.
    #[arg(long, default_value_t = 5)]
    interval: u64,
    /// Consecutive missed heartbeats before the sentinel is presumed dead.
    #[arg(long, default_value_t = 3)]
    threshold: u64,
    /// How long to run before exiting, in whole seconds.
    #[arg(long, default_value_t = 60)]
    run_for: u64,
}

fn main() {
    let cli = Cli::parse();
    let argv: Vec<String> = std::env::args().collect();

    if let Err(e) = twinwatch::begin(cli.interval, cli.threshold, &argv) {
        eprintln!("twinwatch-demo: begin() failed: {e}");
        std::process::exit(1);
    }

    eprintln!("twinwatch-demo: monitoring active, running for {}s", cli.run_for);
    std::thread::sleep(std::time::Duration::from_secs(cli.run_for));

    if let Err(e) = twinwatch::end() {
        eprintln!("twinwatch-demo: end() failed: {e}");
        std::process::exit(1);
    }
    eprintln!("twinwatch-demo: shut down cleanly");
}
