use env_logger::Env;
use log::LevelFilter;

pub mod utf16le;

/// Options that select how much is logged
pub trait LogLevel {
    /// The level to use when `MOJIHE_LOG` is not set
    fn log_level(&self) -> LevelFilter;
}

/// Set up CLI
pub fn init<T: clap::Parser + LogLevel>() -> color_eyre::Result<T> {
    color_eyre::install()?;
    let args = T::parse();
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .format_timestamp(None)
        .parse_env(Env::new().filter("MOJIHE_LOG"))
        .init();
    Ok(args)
}
