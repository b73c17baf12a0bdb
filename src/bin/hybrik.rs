//! Hybrik CLI binary.

use clap::Parser;
use hybrik::cli::{run, Cli};

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
