//! authkeys: inspect and manage SSH authorized keys

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::io::IsTerminal;

use clap::Parser;
use colored::Colorize;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
    if let Err(e) = logging::init(cli.log_level) {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }

    match commands::run(&cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}
