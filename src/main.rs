//! # Character substitution tool
#![warn(missing_docs)]

mod cli;

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use log::LevelFilter;

use cli::utf16le::Utf16leOpts;

/// Replace characters in text files according to a mapping table
#[derive(Parser, Debug)]
#[clap(name = "mojihe", version)]
struct Options {
    /// Print debug messages
    #[clap(short, long, global = true)]
    debug: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a UTF-16LE file using a mapping file
    Utf16le(Utf16leOpts),
}

impl cli::LogLevel for Options {
    fn log_level(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

fn main() -> eyre::Result<()> {
    let opt: Options = cli::init()?;
    match opt.command {
        Command::Utf16le(opts) => cli::utf16le::run(opts),
    }
}
