//! Entry point for the `cifuzz` command-line tool.

use clap::Parser;
use cifuzz_cli::{init_tracing, run, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "cifuzz failed");
            1
        }
    };
    std::process::exit(code);
}
