use clap::Parser;
use cold_mail::{logging::init_logging, run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.into())?;
    run(cli)?;
    Ok(())
}
