//! Main entry point for the mkimage_jtag CLI tool

use clap::{CommandFactory, Parser};
use colored::Colorize;
use env_logger::Target;
use mkimage_jtag::cli::{Args, run_cli};

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .format_timestamp(None)
        .format_target(false)
        .target(Target::Stderr)
        .init();

    if let Err(e) = run_cli(args) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if e.is_usage() {
            eprintln!("\n{}", Args::command().render_help());
        }
        std::process::exit(1);
    }
}
