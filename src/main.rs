// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process::ExitCode;

use clap::Parser;

use signverse::cli::args::{Cli, Commands};
use signverse::cli::{extract::run_extract, transform::run_transform};
use signverse::logging::set_verbose;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Extract(args) => {
            set_verbose(args.verbose);
            run_extract(args).map(drop)
        }
        Commands::Transform(args) => {
            set_verbose(args.verbose);
            run_transform(args).map(drop)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            signverse::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
