mod error;
mod models;
mod manifest;
mod api;
mod resolver;
mod aggregator;

use std::path::Path;
use clap::{Parser, Subcommand};

use crate::aggregator::AggregatorConfig;
use crate::error::AppError;
use crate::manifest::FieldRules;

#[derive(Parser, Debug)]
#[command(name = "pluginmaster")]
#[command(about = "Aggregate plugin release metadata into a combined pluginmaster.json")]
struct Args {
    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the latest stable and testing releases of each listed repository
    Resolve {
        /// Newline-delimited list of owner/repo identifiers
        #[arg(short = 'r', long, default_value = "repos.txt")]
        repos: String,

        /// Output pluginmaster path
        #[arg(short = 'o', long, default_value = "pluginmaster.json")]
        output: String,
    },
    /// Aggregate the local per-plugin manifest tree
    Aggregate {
        /// Plugin source tree, one <name>/<name>.json per plugin
        #[arg(short = 'p', long, default_value = "plugins")]
        plugins_dir: String,

        /// GitHub account hosting the per-plugin release repositories
        #[arg(long, default_value = "c98cmka")]
        owner: String,

        /// Output pluginmaster path, also read as the previous run's state
        #[arg(short = 'o', long, default_value = "pluginmaster.json")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();
    let client = api::build_client(args.timeout)?;

    match args.command {
        Command::Resolve { repos, output } => {
            resolver::run(&client, Path::new(&repos), Path::new(&output)).await
        }
        Command::Aggregate {
            plugins_dir,
            owner,
            output,
        } => {
            let config = AggregatorConfig {
                plugins_dir: plugins_dir.into(),
                output: output.into(),
                owner,
                rules: FieldRules::default(),
            };
            aggregator::run(&client, &config).await
        }
    }
}
