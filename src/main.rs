use anyhow::Result;
use clap::Parser;

use hookrunner::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "hookrunner=debug"
    } else {
        "hookrunner=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let exit_code = cli.run().await?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
