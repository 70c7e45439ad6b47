// Logging setup shared by every binary in the workspace, in the style of
// `tos_ai_miner`'s `CliConfig` + fern dispatch: colored level-prefixed
// console output, with an optional rolling file sink.

use std::path::Path;

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

#[cfg(feature = "clap")]
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[cfg(feature = "clap")]
impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Configure `fern` + `log` for the calling binary.
///
/// `file_path` is `None` when file logging is disabled. `use_colors`
/// controls the console sink only; file output is never colored.
pub fn init_logger(
    level: LevelFilter,
    use_colors: bool,
    file_path: Option<&Path>,
) -> Result<(), fern::InitError> {
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let mut dispatch = fern::Dispatch::new().level(level);

    let stdout = fern::Dispatch::new()
        .format(move |out, message, record| {
            if use_colors {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    colors.color(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            }
        })
        .chain(std::io::stdout());
    dispatch = dispatch.chain(stdout);

    if let Some(path) = file_path {
        let file_line = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .chain(fern::log_file(path)?);
        dispatch = dispatch.chain(file_line);
    }

    dispatch.apply()?;
    log_panics::init();
    Ok(())
}
