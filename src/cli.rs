use clap::{Parser, Subcommand};

use crate::commands;
use crate::services::UPDATE_TRIGGER;

#[derive(Parser)]
#[command(name = "cryptostats")]
#[command(about = "Crypto market stats collector and API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP server and background workers (default)
    Serve,
    /// Fetch and store stats once, then exit
    Fetch,
    /// Publish a trigger message on the update channel
    Publish {
        /// Trigger value to send
        #[arg(short, long, default_value = UPDATE_TRIGGER)]
        trigger: String,
    },
    /// Show latest price and deviation for each configured coin
    Status,
}

pub async fn run() {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            commands::serve::run().await;
        }
        Commands::Fetch => {
            commands::fetch::run().await;
        }
        Commands::Publish { trigger } => {
            commands::publish::run(trigger).await;
        }
        Commands::Status => {
            commands::status::run().await;
        }
    }
}
