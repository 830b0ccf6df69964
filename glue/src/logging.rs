use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, set_logger, set_max_level};

use crate::console::{Console, set_console};

pub struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let color = match record.level() {
            Level::Error => 31, // Red
            Level::Warn => 93,  // BrightYellow
            Level::Info => 20,  // White
            Level::Debug => 32, // Green
            Level::Trace => 90, // BrightBlack
        };
        console_println!(
            "\u{1B}[{}m[{:}] {}\u{1B}[0m",
            color,
            record.level(),
            record.args(),
        );
    }

    fn flush(&self) {}
}

/// Route `log` output to `console`.
///
/// Fails if another logger is already installed; the console is still registered in that case.
pub fn init(console: &'static dyn Console, level: LevelFilter) -> Result<(), SetLoggerError> {
    static LOGGER: Logger = Logger;
    set_console(console);
    set_logger(&LOGGER)?;
    set_max_level(level);
    Ok(())
}

/// Improved debug macro,
/// only compiled in debug mode.
#[macro_export]
macro_rules! debug_ex {
    // debug!(target: "my_target", key1 = 42, key2 = true; "a {} event", "log")
    // debug!(target: "my_target", "a {} event", "log")
    (target: $target:expr, $($arg:tt)+) => {
        #[cfg(debug_assertions)]
        {
            use log::{log,Level};
            log!(target: $target, Level::Debug, $($arg)+)
        }
    };

    // debug!("a {} event", "log")
    ($($arg:tt)+) => {
        #[cfg(debug_assertions)]
        {
            use log::{log,Level};
            log!(Level::Debug, $($arg)+)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use spin::Mutex;

    struct Capture(Mutex<String>);

    impl Console for Capture {
        fn put_str(&self, s: &str) {
            self.0.lock().push_str(s);
        }
    }

    static CAPTURE: Capture = Capture(Mutex::new(String::new()));

    #[test]
    fn test_logger_writes_colored_lines_to_console() {
        init(&CAPTURE, LevelFilter::Debug).unwrap();
        log::error!("Couldn't retrieve our bus clock");
        debug_ex!("mapped {} bytes", 0x10000);
        let out = CAPTURE.0.lock().clone();
        assert!(out.contains("\u{1B}[31m[ERROR] Couldn't retrieve our bus clock\u{1B}[0m\n"));
        #[cfg(debug_assertions)]
        assert!(out.contains("[DEBUG] mapped 65536 bytes"));
        // a second logger is refused
        assert!(init(&CAPTURE, LevelFilter::Info).is_err());
    }
}
