use std::process::ExitCode;

use clap::Parser;

use maskoverlay::cli;

fn main() -> ExitCode {
    // Session log first so argument errors and panics are captured too
    maskoverlay::logger::init();

    let args = cli::CliArgs::parse();
    cli::run(args)
}
