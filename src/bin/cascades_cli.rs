//! Cascades harness CLI binary.
//!
//! Plays back a command script against a target, or records the commands a
//! target emits into a new script.
//!
//! # Exit codes
//!
//! - `0` - script exhausted without an unaccepted failure
//! - `1` - session failed (confirmed failure, dropped connection, I/O error)
//! - `2` - could not connect to the target

use std::path::PathBuf;
use std::process::ExitCode;

use cascades::{Config, Harness, Mode, Outcome, VERSION};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "cascades-cli")]
#[command(version = VERSION)]
#[command(about = "Scriptable TCP test-harness client", long_about = None)]
struct Cli {
    /// Script to play back (created and truncated with --record)
    script: PathBuf,

    /// Target host
    #[arg(long)]
    host: Option<String>,

    /// Target port
    #[arg(short, long)]
    port: Option<u16>,

    /// Result log path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Record the target's commands into SCRIPT
    #[arg(short, long)]
    record: bool,

    /// Seconds to wait for the connection
    #[arg(long, value_name = "SECS")]
    connect_timeout: Option<u64>,

    /// Config file (default: <config_dir>/cascades-cli/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.record {
            Mode::Record
        } else {
            Mode::Playback
        }
    }

    /// Layer command line flags over the loaded config
    fn apply(&self, mut config: Config) -> Config {
        if let Some(host) = &self.host {
            config.connection.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(secs) = self.connect_timeout {
            config.connection.connect_timeout_secs = secs;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
        if self.log_json {
            config.logging.json = true;
        }
        config
    }
}

fn init_logging(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.apply(Config::load(cli.config.as_deref())?);
    init_logging(&config.logging.level, config.logging.json);

    let mut harness = match cli.mode() {
        Mode::Playback => Harness::playback(config, &cli.script),
        Mode::Record => Harness::record(config, &cli.script),
    };
    if let Some(output) = &cli.output {
        harness = harness.with_output(output);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match runtime.block_on(harness.run()) {
        Ok(Outcome::Success) => Ok(ExitCode::SUCCESS),
        Ok(Outcome::Failure) => Ok(ExitCode::from(Outcome::Failure.exit_code())),
        Err(e) if e.is_setup_failure() => {
            tracing::error!("{}", e);
            Ok(ExitCode::from(2))
        },
        Err(e) => {
            tracing::error!("{}", e);
            Ok(ExitCode::FAILURE)
        },
    }
}
