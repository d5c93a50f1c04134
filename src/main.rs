use clap::Parser;
use stockanalyzer::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
