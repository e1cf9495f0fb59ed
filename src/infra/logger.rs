use crossterm::{
    ExecutableCommand,
    style::{Color, ResetColor, SetForegroundColor},
};
use env_logger::Builder;
use log::{Level, debug, info};
use std::io::{self, Write};

pub const LOG_LEVEL_ENV: &str = "CPB_LOG_LEVEL";
pub const NO_COLOR_ENV: &str = "CPB_NO_COLOR";

/// Default filter for a `-v` count; `CPB_LOG_LEVEL` takes precedence.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn color_enabled() -> bool {
    !std::env::var(NO_COLOR_ENV).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Error => "31", // Red
        Level::Warn => "33",  // Yellow
        Level::Info => "32",  // Green
        Level::Debug => "36", // Cyan
        Level::Trace => "35", // Magenta
    }
}

pub fn setup_logger(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let env = env_logger::Env::default().filter_or(LOG_LEVEL_ENV, level_for(verbosity));
    let colored = color_enabled();

    Builder::from_env(env)
        .format(move |buf, record| {
            if colored {
                writeln!(
                    buf,
                    "\x1B[{}m[{}]\x1B[0m [{}] {}",
                    level_color(record.level()),
                    record.level(),
                    buf.timestamp_millis(),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "[{}] [{}] {}",
                    record.level(),
                    buf.timestamp_millis(),
                    record.args()
                )
            }
        })
        .try_init()
}

pub fn print_welcome_message() -> io::Result<()> {
    let mut stderr = io::stderr();

    if color_enabled() {
        stderr.execute(SetForegroundColor(Color::Cyan))?;
    }
    writeln!(stderr, "📦 cpb v{}", env!("CARGO_PKG_VERSION"))?;
    if color_enabled() {
        stderr.execute(ResetColor)?;
    }

    debug!("Debug logging enabled");
    info!("Starting project bundler...");
    Ok(())
}
