use anyhow::Context;
use clap::Parser;
use pulsewire::cli::output::{self, OutputConfig};
use pulsewire::cli::{check, watch, CheckCommand, Cli, Commands};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // rustls needs an explicit provider when more than one backend is linked
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    let result: anyhow::Result<()> = match cli.command {
        Commands::Watch(args) => watch::execute(args).await.context("watch failed"),
        Commands::Check(CheckCommand::Config(arg)) => check::execute_config(&arg.config)
            .with_context(|| format!("invalid configuration in {}", arg.config.display())),
        Commands::Check(CheckCommand::Connection(arg)) => check::execute_connection(&arg.config)
            .await
            .context("connection check failed"),
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
