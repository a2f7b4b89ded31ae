mod app;
mod cli;
mod config;
mod effects;
mod logging;
mod persistence;
mod render;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    // A missing .env file is fine; the environment may already carry the key.
    let _ = dotenvy::dotenv();
    logging::initialize(cli.log, cli.verbose);

    app::run(cli).inspect_err(|err| engine_logging::engine_error!("Command failed: {:#}", err))
}
