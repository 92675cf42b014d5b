use clap::Parser;
use kmarket_cli::Cli;
use kmarket_cli::init_tracing;
use kmarket_cli::run_main;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run_main(cli).await?;
    Ok(())
}
