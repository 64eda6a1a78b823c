//! Param Fetcher CLI application
//!
//! Command-line interface for fetching and verifying proof parameter files.

use std::process;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use param_fetcher::cli::{handle_fetch, handle_verify, Cli, CommandContext, Commands};
use param_fetcher::config::AppConfig;
use param_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        let report = e.report();
        error!("{} error: {}", e.category(), report);
        eprintln!("Error: {}", report);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config);
    info!("Param Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let runtime = config
        .to_runtime_config_with_env()
        .with_overrides(cli.global.cache_dir.clone(), cli.global.gateway.clone());
    let ctx = CommandContext {
        runtime,
        show_progress: cli.show_progress(),
        quiet: cli.global.quiet,
    };

    match cli.command {
        Commands::Fetch(args) => {
            info!("Executing fetch command");
            handle_fetch(args, ctx).await
        }
        Commands::Verify(args) => {
            info!("Executing verify command");
            handle_verify(args, ctx).await
        }
    }
}

/// Initialize logging based on CLI verbosity and the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let log_level = cli.log_level(&config.logging.level);

    let mut filter = EnvFilter::from_default_env();
    match format!("param_fetcher={}", log_level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring invalid log level '{}': {}", log_level, e),
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
