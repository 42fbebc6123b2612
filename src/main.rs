use clap::Parser;
use tracing::error;

use medalscan::{browser, utils, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);

    utils::validate_args(&args)?;

    if let Err(e) = browser::run(&args).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
