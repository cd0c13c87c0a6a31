use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, instrument, warn};

use crate::config::SystemConfig;
use crate::types::Result;

#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(about = "A minimal HTTP service bootstrap")]
#[command(long_about = "
A single-binary HTTP service exposing a build tag and a health check behind
a standard middleware stack: request ids, panic recovery, CORS, cache
suppression, timeouts and optional rate limiting.
")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path; built-in defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Run the HTTP server (default if no subcommand given)
    Run(RunArgs),
    /// Validate the configuration file
    Validate,
    /// Show detailed version and build information
    Version,
}

#[derive(Args, Clone, Debug, Default)]
pub struct RunArgs {
    /// Override listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Override bind host (e.g. "127.0.0.1")
    #[arg(long)]
    pub bind: Option<String>,

    /// Set log format
    #[arg(long)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Get effective log level considering verbose/quiet flags
    pub fn effective_log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else if self.quiet {
            LogLevel::Error
        } else {
            self.log_level.clone().unwrap_or(LogLevel::Info)
        }
    }

    /// Convert LogLevel enum to string for logging module
    pub fn log_level_to_str(&self) -> &'static str {
        match self.effective_log_level() {
            LogLevel::Trace => crate::logging::level::TRACE,
            LogLevel::Debug => crate::logging::level::DEBUG,
            LogLevel::Info => crate::logging::level::INFO,
            LogLevel::Warn => crate::logging::level::WARN,
            LogLevel::Error => crate::logging::level::ERROR,
        }
    }

    /// Log level requested on the command line, if any
    pub fn log_level_override(&self) -> Option<&'static str> {
        if self.log_level.is_some() || self.verbose || self.quiet {
            Some(self.log_level_to_str())
        } else {
            None
        }
    }

    /// Get log format override from CLI arguments
    pub fn log_format_override(&self) -> Option<&'static str> {
        match &self.command {
            Some(Commands::Run(args)) => args.log_format.as_ref().map(|fmt| match fmt {
                LogFormat::Json => crate::logging::format::JSON,
                LogFormat::Pretty => crate::logging::format::PRETTY,
            }),
            _ => None,
        }
    }

    fn config_source(&self) -> String {
        self.config
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<defaults>".to_string())
    }
}

/// Apply `run` flags on top of the loaded configuration
pub fn apply_overrides(mut config: SystemConfig, args: &RunArgs) -> SystemConfig {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = &args.bind {
        config.server.host = bind.clone();
    }
    if let Some(format) = &args.log_format {
        config.logging.format = match format {
            LogFormat::Json => crate::logging::format::JSON,
            LogFormat::Pretty => crate::logging::format::PRETTY,
        }
        .to_string();
    }
    config
}

/// Run the HTTP server
#[instrument(skip(cli, args, system_config))]
pub async fn run_server(
    cli: Cli,
    args: RunArgs,
    system_config: Option<SystemConfig>,
) -> Result<()> {
    let system_config = match system_config {
        Some(config) => config,
        None => {
            info!("Loading system configuration...");
            SystemConfig::load_or_default(cli.config.as_ref())?
        }
    };

    let system_config = apply_overrides(system_config, &args);
    system_config.validate()?;

    info!(
        config = %cli.config_source(),
        listen = %system_config.server.listen_address(),
        "Configuration loaded successfully"
    );

    let shutdown_signal = setup_shutdown_signal();
    crate::http::start_server(system_config, shutdown_signal).await
}

/// Validate the configuration file
#[instrument(skip(cli, system_config))]
pub async fn validate_config(cli: Cli, system_config: Option<SystemConfig>) -> Result<()> {
    info!("Validating configuration...");

    let config = match system_config {
        Some(config) => config,
        None => SystemConfig::load_or_default(cli.config.as_ref()).map_err(|e| {
            error!(
                config = %cli.config_source(),
                error = %e,
                "Failed to load configuration"
            );
            e
        })?,
    };

    match config.validate() {
        Ok(()) => {
            info!(
                config = %cli.config_source(),
                listen = %config.server.listen_address(),
                rate_limiting = config.rate_limit.is_active(),
                "Configuration is valid"
            );
            Ok(())
        }
        Err(e) => {
            error!(
                config = %cli.config_source(),
                error = %e,
                "Configuration validation failed"
            );
            Err(e)
        }
    }
}

/// Show version and build information
#[instrument]
pub async fn show_version() -> Result<()> {
    println!("Gatehouse {}", crate::version::build_tag());
    println!("Description: {}", env!("CARGO_PKG_DESCRIPTION"));
    println!("License: {}", env!("CARGO_PKG_LICENSE"));
    println!();

    println!("Build Information:");
    println!("  Version: {}", crate::build::PKG_VERSION);
    println!("  Commit: {}", crate::build::COMMIT_HASH);
    println!("  Branch: {}", crate::build::BRANCH);
    println!("  Build Time: {}", crate::build::BUILD_TIME);
    println!("  Rust Version: {}", crate::build::RUST_VERSION);
    println!(
        "  Build Profile: {}",
        if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        }
    );
    println!();

    println!("Runtime Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Architecture: {}", std::env::consts::ARCH);

    Ok(())
}

/// Resolve on Ctrl+C, or SIGTERM on Unix
pub async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_and_flags() {
        let cli = Cli::try_parse_from(["gatehouse"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
        assert_eq!(cli.effective_log_level(), LogLevel::Info);
        assert_eq!(cli.log_level_override(), None);
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from([
            "gatehouse",
            "--config",
            "/tmp/gatehouse.toml",
            "run",
            "--port",
            "9090",
            "--bind",
            "127.0.0.1",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/gatehouse.toml")));
        assert_eq!(cli.log_format_override(), Some("json"));
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.port, Some(9090));
                assert_eq!(args.bind.as_deref(), Some("127.0.0.1"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(Cli::try_parse_from(["gatehouse", "run", "--port", "70000"]).is_err());
    }

    #[test]
    fn test_verbose_and_quiet() {
        let cli = Cli::try_parse_from(["gatehouse", "-v"]).unwrap();
        assert_eq!(cli.log_level_override(), Some("debug"));

        let cli = Cli::try_parse_from(["gatehouse", "-q"]).unwrap();
        assert_eq!(cli.log_level_override(), Some("error"));

        assert!(Cli::try_parse_from(["gatehouse", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_explicit_log_level() {
        let cli = Cli::try_parse_from(["gatehouse", "--log-level", "warn", "validate"]).unwrap();
        assert_eq!(cli.log_level_override(), Some("warn"));
        assert!(matches!(cli.command, Some(Commands::Validate)));
    }

    #[test]
    fn test_apply_overrides() {
        let args = RunArgs {
            port: Some(9000),
            bind: Some("::1".to_string()),
            log_format: Some(LogFormat::Json),
        };
        let config = apply_overrides(SystemConfig::default(), &args);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "::1");
        assert_eq!(config.server.listen_address(), "[::1]:9000");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_apply_no_overrides() {
        let defaults = SystemConfig::default();
        let config = apply_overrides(defaults.clone(), &RunArgs::default());
        assert_eq!(config.server.port, defaults.server.port);
        assert_eq!(config.server.host, defaults.server.host);
    }

    #[tokio::test]
    async fn test_validate_config_from_file() {
        use std::io::Write as _;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 0").unwrap();
        let cli = Cli::try_parse_from([
            "gatehouse",
            "--config",
            file.path().to_str().unwrap(),
            "validate",
        ])
        .unwrap();

        assert!(validate_config(cli, None).await.is_err());
    }
}
