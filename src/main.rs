mod cli;
mod engine;
mod logstream;
mod model;
mod monitor;
mod orchestrator;
mod status;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_scripted = args.json || args.text;

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success for scripted modes
            if is_scripted {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}
