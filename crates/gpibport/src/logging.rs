use clap::ValueEnum;
use tracing::level_filters::LevelFilter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Level actually installed; quiet silences everything.
pub fn effective_filter(level: LogLevel, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::OFF
    } else {
        level.as_filter()
    }
}

/// Log to stderr. Stdout carries the protocol and must stay clean.
pub fn init_logging(format: LogFormat, level: LogLevel, quiet: bool) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(effective_filter(level, quiet))
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_turns_logging_off() {
        assert_eq!(effective_filter(LogLevel::Trace, true), LevelFilter::OFF);
        assert_eq!(effective_filter(LogLevel::Warn, false), LevelFilter::WARN);
    }
}
