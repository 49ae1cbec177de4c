use anyhow::Result;
use circle_builder::cli::Cli;
use circle_builder::output;
use clap::Parser;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting circle-builder");
    cli.execute().await?;

    Ok(())
}
