use anyhow::Result;
use clap::Parser;

use repo_mirror::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    if matches!(args.command, cli::Command::Version) {
        commands::version::run();
        return Ok(());
    }

    let command = args.command.log_name();
    logging::init_subscriber(args.verbose, command);
    let log = logging::Logger::new(command);

    match args.command {
        cli::Command::Sync => commands::sync::run(&args.global, &log),
        cli::Command::Mirror => commands::mirror::run(&args.global, &log),
        cli::Command::Version => Ok(()),
    }
}
