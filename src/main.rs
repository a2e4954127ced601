use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use finsight::cli::setup::setup;
use finsight::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Owner to report on, overrides the configured one
    #[arg(short, long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for finsight::AppCommand {
    fn from(cmd: Commands) -> finsight::AppCommand {
        match cmd {
            Commands::Balance { months } => finsight::AppCommand::Balance { months },
            Commands::Categories { months, totals } => {
                finsight::AppCommand::Categories { months, totals }
            }
            Commands::Budgets => finsight::AppCommand::Budgets,
            Commands::Portfolio => finsight::AppCommand::Portfolio,
            Commands::Metals { code } => finsight::AppCommand::Metals { code },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display income, expenses and balance KPIs
    Balance {
        /// Number of calendar months to cover, ending with the current one
        #[arg(short, long, default_value_t = 1)]
        months: u32,
    },
    /// Display balances grouped by month and category
    Categories {
        #[arg(short, long, default_value_t = 3)]
        months: u32,
        /// One row per category over the whole range instead of per month
        #[arg(long)]
        totals: bool,
    },
    /// Display budget utilization and the estimated free amount
    Budgets,
    /// Display stock positions valued at current prices
    Portfolio,
    /// Display precious metal prices
    Metals {
        /// Only fetch this metal, e.g. XAU
        #[arg(long)]
        code: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => {
            finsight::run_command(cmd.into(), cli.config_path.as_deref(), cli.owner.as_deref())
                .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
