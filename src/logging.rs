use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Read when `--log-level` is not given. Takes `EnvFilter` directives.
pub const LOG_ENV: &str = "ODOT_HOST_LOG";

/// A host runs unattended under the browser; keep stderr quiet by default.
const DEFAULT_DIRECTIVE: &str = "odot_host=info,warn";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// The flag wins, then [`LOG_ENV`], then the built-in default. An unparsable
/// environment value falls back to the default.
fn build_filter(level: Option<LogLevel>, env_value: Option<&str>) -> EnvFilter {
    match (level, env_value) {
        (Some(level), _) => EnvFilter::new(level.as_directive()),
        (None, Some(value)) => {
            EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
        }
        (None, None) => EnvFilter::new(DEFAULT_DIRECTIVE),
    }
}

/// Logs go to stderr. stdout carries protocol frames and must stay clean.
pub fn init_logging(format: LogFormat, level: Option<LogLevel>) {
    let env_value = std::env::var(LOG_ENV).ok();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(level, env_value.as_deref()))
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
