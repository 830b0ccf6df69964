//! Console sink for diagnostic output.
//!
//! The owning kernel registers a [Console] once; until then everything printed is dropped.

use core::fmt::{Arguments, Write};
use spin::Once;

/// Something that can take text, e.g. a UART or the kernel's message buffer.
pub trait Console: Sync {
    fn put_str(&self, s: &str);
}

static CONSOLE: Once<&'static dyn Console> = Once::new();

/// Install the console. Only the first call wins; returns whether this call installed it.
pub fn set_console(console: &'static dyn Console) -> bool {
    let mut installed = false;
    CONSOLE.call_once(|| {
        installed = true;
        console
    });
    installed
}

struct ConsoleOut;

impl Write for ConsoleOut {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        if let Some(console) = CONSOLE.get() {
            console.put_str(s);
        }
        Ok(())
    }
}

pub fn console_print(args: Arguments) {
    // ConsoleOut never fails
    let _ = ConsoleOut.write_fmt(args);
}

#[macro_export]
/// print string macro
macro_rules! console_print {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::console_print(format_args!($fmt $(, $($arg)+)?));
    }
}

#[macro_export]
macro_rules! console_println {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::console_print(format_args!(concat!($fmt, "\n") $(, $($arg)+)?));   // Use LF instead of CR-LF
    }
}
