use std::fs;

use time::UtcOffset;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOGGING_ENV_FILE: &str = "logging.env";

/// Keeps the background log writer alive; logs are flushed when this is dropped.
pub struct LoggingHandle {
    _non_blocking_guard: WorkerGuard,
}

pub fn init_logging(verbose: bool) -> Result<LoggingHandle, String> {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };

    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        UtcOffset::current_local_offset().unwrap_or_else(|err| {
            eprintln!("Failed to get timezone: {}", err);
            UtcOffset::UTC
        }),
        time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second] +[offset_hour]"
        ),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());

    let env_filter = read_env_filter(default_level).unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy()
    });

    let subscriber = tracing_subscriber::fmt()
        .with_timer(timer)
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| format!("failed to initialize logger: {}", err))?;
    tracing_log::LogTracer::init()
        .map_err(|err| format!("failed to forward log records: {}", err))?;

    Ok(LoggingHandle {
        _non_blocking_guard: guard,
    })
}

/// Reads a filter directive such as `power_pusher=trace` from the first line of `logging.env`.
fn read_env_filter(default_level: Level) -> Result<EnvFilter, String> {
    let s = fs::read_to_string(LOGGING_ENV_FILE)
        .map_err(|err| format!("Failed to read file {}: {}", LOGGING_ENV_FILE, err))?;
    parse_env_filter(&s, default_level)
}

fn parse_env_filter(s: &str, default_level: Level) -> Result<EnvFilter, String> {
    let first_line = s.lines().next().ok_or_else(|| format!("{} is empty", LOGGING_ENV_FILE))?;
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .parse(first_line)
        .map_err(|err| format!("Failed to parse env filter: {}", err))
}
