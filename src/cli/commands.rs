use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "trustlens", version, about = "Evaluate whether a URL is safe to visit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a URL: domain probes, reputation scan and fused verdict
    Check(CheckArgs),
    /// Run only the domain probe battery against a domain
    Assess(AssessArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct CheckArgs {
    /// URL to evaluate
    pub url: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print the verdict as JSON
    #[arg(long)]
    pub json: bool,

    /// Override the number of evaluation attempts
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Override the overall deadline in seconds
    #[arg(long)]
    pub deadline: Option<u64>,

    /// User recorded with block registry entries
    #[arg(long)]
    pub user_id: Option<String>,

    /// Keep verdicts in memory instead of the configured database
    #[arg(long)]
    pub in_memory: bool,
}

#[derive(Args, Clone)]
pub struct AssessArgs {
    /// Domain to probe
    pub domain: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print the assessment as JSON
    #[arg(long)]
    pub json: bool,

    /// Per-probe timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Path to YAML config file
    pub config: String,
}
