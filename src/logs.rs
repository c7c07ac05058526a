use std::io::{self, IsTerminal};

use anyhow::{bail, Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

pub fn parse_level(level: &str) -> Result<LevelFilter> {
    Ok(match level {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => bail!("unknown log level '{}'", level),
    })
}

pub fn init(level: &str) -> Result<()> {
    let level = parse_level(level)?;

    let is_terminal = io::stdout().is_terminal();

    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .debug(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let now = humantime::format_rfc3339_millis(std::time::SystemTime::now());
            if is_terminal {
                out.finish(format_args!(
                    "{} [{}] {}",
                    now,
                    colors.color(record.level()),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "{} [{}] [{}] {}",
                    now,
                    record.level(),
                    record.target(),
                    message
                ))
            }
        })
        .level(level)
        // The http client is chatty at debug level.
        .level_for("hyper_util", LevelFilter::Info)
        .level_for("reqwest", LevelFilter::Info)
        .chain(io::stdout())
        .apply()
        .context("init logger")?;

    Ok(())
}
