mod logging;

use std::path::PathBuf;

use clap::Parser;
use odot_host::channel::Channel;
use odot_host::config::{ChannelConfig, Overrides};
use odot_host::host::NmError;
use odot_host::install::Registration;
use odot_host::{exit, FileSink};

use crate::logging::{init_logging, LogFormat, LogLevel};

/// Launched by the browser; never run interactively.
#[derive(Parser, Debug)]
#[command(
    name = "odot-host",
    version,
    about = "Native messaging host bridging the Odot extension to the Odot app"
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "FILE", env = "ODOT_HOST_CONFIG")]
    config: Option<PathBuf>,

    /// Where the host manifest is registered.
    #[arg(long, value_name = "FILE", env = "ODOT_HOST_MANIFEST_PATH")]
    manifest_path: Option<PathBuf>,

    /// File the received message is written to for the desktop app.
    #[arg(long, value_name = "FILE", env = "ODOT_HOST_DOWNSTREAM_PATH")]
    downstream_path: Option<PathBuf>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr). Without it, `ODOT_HOST_LOG` directives apply.
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Native window handle Chrome passes on Windows.
    #[arg(long, value_name = "HANDLE", hide = true)]
    parent_window: Option<String>,

    /// Caller origin (Chromium) or manifest path and extension id (Firefox).
    #[arg(value_name = "CALLER", hide = true)]
    caller: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match run(cli) {
        Ok(()) => std::process::exit(exit::SUCCESS),
        Err(err) => {
            let code = err.exit_code();
            tracing::error!(error = %err, code, "native messaging exchange failed");
            std::process::exit(code);
        }
    }
}

fn run(cli: Cli) -> Result<(), NmError> {
    let overrides = Overrides {
        manifest_path: cli.manifest_path,
        downstream_path: cli.downstream_path,
    };
    let config = ChannelConfig::load(cli.config.as_deref(), overrides)?;

    tracing::info!(
        caller = ?cli.caller,
        manifest = %config.manifest_path.display(),
        downstream = %config.downstream_path.display(),
        "host started"
    );

    let sink = FileSink::new(config.downstream_path.clone());
    match Channel::stdio(config).run(sink)? {
        Registration::Created => tracing::info!("registered host manifest"),
        Registration::AlreadyPresent => tracing::debug!("host manifest was already registered"),
    }
    Ok(())
}
