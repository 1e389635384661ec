//! `log` backend that writes coloured lines to the console
//!
//! The level is fixed at build time by the `LOG` environment variable
//! (`ERROR`, `WARN`, `INFO`, `DEBUG`, `TRACE`); anything else means `INFO`.

use log::{Level, LevelFilter, Log, Metadata, Record};

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        println!(
            "\u{1B}[{}m[{:>5}] {}\u{1B}[0m",
            level_to_color_code(record.level()),
            record.level(),
            record.args(),
        );
    }

    fn flush(&self) {}
}

fn level_to_color_code(level: Level) -> u8 {
    match level {
        Level::Error => 31, // red
        Level::Warn => 93,  // bright yellow
        Level::Info => 34,  // blue
        Level::Debug => 32, // green
        Level::Trace => 90, // bright black
    }
}

pub fn level_from_env(value: Option<&str>) -> LevelFilter {
    match value {
        Some("ERROR") => LevelFilter::Error,
        Some("WARN") => LevelFilter::Warn,
        Some("DEBUG") => LevelFilter::Debug,
        Some("TRACE") => LevelFilter::Trace,
        Some("OFF") => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

pub fn init() {
    static LOGGER: ConsoleLogger = ConsoleLogger;
    // A second call leaves the first logger in place
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level_from_env(option_env!("LOG")));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_env() {
        assert_eq!(level_from_env(None), LevelFilter::Info);
        assert_eq!(level_from_env(Some("TRACE")), LevelFilter::Trace);
        assert_eq!(level_from_env(Some("WARN")), LevelFilter::Warn);
        assert_eq!(level_from_env(Some("verbose")), LevelFilter::Info);
    }

    #[test]
    fn test_logger_writes_to_console() {
        crate::arch::take_output();
        ConsoleLogger.log(
            &Record::builder()
                .args(format_args!("frames ready"))
                .level(Level::Warn)
                .build(),
        );
        let out = String::from_utf8(crate::arch::take_output()).unwrap();
        assert!(out.contains("[ WARN] frames ready"));
    }
}
