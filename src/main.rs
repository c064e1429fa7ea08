use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use trustlens::cli::{self, Commands};
use trustlens::config;
use trustlens::errors::TrustLensError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    debug!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = option_env!("GIT_HASH").unwrap_or("dev"),
        built = option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        "trustlens starting"
    );

    let result = match cli.command {
        Commands::Check(args) => cli::check::handle_check(args).await,
        Commands::Assess(args) => cli::assess::handle_assess(args).await,
        Commands::Validate(args) => handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            TrustLensError::Config(_) | TrustLensError::Yaml(_) => 2,
            TrustLensError::Persistence { .. } | TrustLensError::Database(_) => 3,
            TrustLensError::InvalidUrl(_) => 4,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), TrustLensError> {
    let path = std::path::PathBuf::from(&args.config);
    let _config = config::parse_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    Ok(())
}
