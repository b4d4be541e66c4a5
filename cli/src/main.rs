//! kafkacli - Kafka 命令行客户端

mod cmd;
mod shutdown;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

#[derive(Parser)]
#[command(name = "kafkacli")]
#[command(author, version, about = "Simple Kafka command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume a topic through a consumer group
    #[command(visible_alias = "cs")]
    Consume(cmd::consume::ConsumeArgs),
    /// Publish a message to a topic
    #[command(visible_alias = "p")]
    Publish(cmd::publish::PublishArgs),
    /// Show topic info
    #[command(visible_alias = "s")]
    Show(cmd::topic::ShowArgs),
    /// Create a topic
    #[command(visible_alias = "c")]
    Create(cmd::topic::CreateArgs),
    /// Delete a topic
    Delete(cmd::topic::DeleteArgs),
    /// Expire topic records by altering retention
    Purge(cmd::topic::PurgeArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    kafkacli_telemetry::init_tracing("info");

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Consume(args) => cmd::consume::run(args).await,
        Commands::Publish(args) => cmd::publish::run(args).await,
        Commands::Show(args) => cmd::topic::show(args).await,
        Commands::Create(args) => cmd::topic::create(args).await,
        Commands::Delete(args) => cmd::topic::delete(args).await,
        Commands::Purge(args) => cmd::topic::purge(args).await,
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
