#![deny(unsafe_code)]

//! agent — aegis-agent CLI entry point.

use std::path::PathBuf;

use clap::Parser;

use aegis_agent::agent::Agent;
use aegis_agent::core::config::Config;
use aegis_agent::daemon::signals::SignalHandler;

/// Host-resident telemetry agent that baselines machine behavior and
/// detects ransomware-like encryption/write/rename/delete bursts.
#[derive(Parser, Debug)]
#[command(name = "agent", version, about)]
struct Cli {
    /// Path to the agent configuration file.
    #[arg(default_value = "aegis-agent.conf")]
    config_path: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        eprintln!("agent: {err}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> aegis_agent::core::errors::Result<()> {
    let config = Config::load(Some(&cli.config_path))?;
    let signals = SignalHandler::new();
    let mut agent = Agent::init(config, signals.flag())?;
    agent.run()
}
