// # fleetctl - Workshop Fleet CLI
//
// Thin integration layer over fleet-core:
// 1. Reading configuration from the environment and the command line
// 2. Loading the user list and resolving each user's keys
// 3. Wiring the DigitalOcean provider, the GitHub key source and the
//    cloud-config renderer into a `FleetEngine`
// 4. Running one setup or teardown pass and mapping its report to an exit code
//
// No reconciliation logic lives here.
//
// ## Example
//
// ```bash
// export DO_TOKEN=your_token
//
// fleetctl --dry setup          # show what would be created
// fleetctl setup --users attendees.list --userdata userdata.yaml
// fleetctl teardown
// ```

mod config;
mod userdata;
mod users;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fleet_core::report::RunReport;
use fleet_core::{FleetEngine, KeyResolver};
use fleet_keys_github::GithubKeySource;
use fleet_provider_digitalocean::DigitalOceanProvider;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use config::Config;
use userdata::CloudConfigRenderer;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FleetExitCode {
    /// Every unit of work succeeded or was skipped
    Success = 0,
    /// Configuration error, bad invocation or unreadable input
    ConfigError = 1,
    /// The run completed but at least one unit failed
    UnitFailures = 2,
}

impl From<FleetExitCode> for ExitCode {
    fn from(code: FleetExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Provision per-attendee workshop instances and their DNS records
#[derive(Parser, Debug)]
#[command(name = "fleetctl", version, about, long_about = None)]
struct Cli {
    /// Verbose output, including rendered payloads
    #[arg(long, global = true)]
    debug: bool,

    /// Show what would change without changing anything
    #[arg(long, global = true)]
    dry: bool,

    /// User list (`name;ssh-key` per line)
    #[arg(long, global = true, default_value = "users.list")]
    users: PathBuf,

    /// Base cloud-config document merged into every payload
    #[arg(long, global = true)]
    userdata: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Create missing instances and publish their addresses
    Setup,
    /// Delete every instance carrying the workshop tag
    Teardown,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        eprintln!("No command given. Use `fleetctl setup` or `fleetctl teardown`.");
        return FleetExitCode::ConfigError.into();
    };

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return FleetExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return FleetExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = if cli.debug {
        Level::DEBUG
    } else {
        match config.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FleetExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FleetExitCode::ConfigError.into();
        }
    };

    rt.block_on(async {
        match run(&cli, command, config).await {
            Ok(report) => exit_code_for(&report),
            Err(e) => {
                error!("{:#}", e);
                FleetExitCode::ConfigError
            }
        }
    })
    .into()
}

/// Build the engine and run one pass
///
/// Errors returned here happen before any remote mutation.
async fn run(cli: &Cli, command: Commands, config: Config) -> Result<RunReport> {
    let renderer = match &cli.userdata {
        Some(path) => CloudConfigRenderer::from_file(path)?,
        None => CloudConfigRenderer::new(),
    };

    // Read the user list before touching the provider
    let raw_users = match command {
        Commands::Setup => users::load_users(&cli.users)?,
        Commands::Teardown => Vec::new(),
    };

    let provider = DigitalOceanProvider::with_base_url(&config.api_token, &config.api_url)?;

    let domain = config.fleet.dns.domain.clone();
    let fallback_key = config.fleet.keys.fallback_key.clone();

    let engine = FleetEngine::new(
        Box::new(provider.clone()),
        Box::new(provider),
        Box::new(renderer),
        config.fleet,
        cli.dry,
    )?;

    if cli.dry {
        info!("Dry run: no instance or record will be changed");
    }

    let report = match command {
        Commands::Setup => {
            info!("Resolving keys for {} user(s)", raw_users.len());
            let resolver = KeyResolver::new(
                Box::new(GithubKeySource::with_base_url(&config.keys_url)?),
                fallback_key,
            );
            let users = resolver.build_users(&raw_users, &domain).await;
            engine.setup(&users).await
        }
        Commands::Teardown => engine.teardown().await,
    };

    log_report(&report);
    Ok(report)
}

fn log_report(report: &RunReport) {
    for unit in report.failures() {
        error!("{} {}: {:?}", unit.stage, unit.subject, unit.outcome);
    }

    let summary = report.summary();
    info!(
        "Run finished: {} succeeded, {} skipped, {} failed",
        summary.succeeded, summary.skipped, summary.failed
    );

    match serde_json::to_string_pretty(report) {
        Ok(json) => tracing::debug!("Run report:\n{}", json),
        Err(e) => tracing::debug!("Run report not serializable: {}", e),
    }
}

fn exit_code_for(report: &RunReport) -> FleetExitCode {
    if report.is_success() {
        FleetExitCode::Success
    } else {
        FleetExitCode::UnitFailures
    }
}
