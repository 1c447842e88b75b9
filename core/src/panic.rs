use crate::error;
use std::{panic, process, thread};

/// Installs a panic hook that logs the panic and exits the process.
///
/// A panic in a pipeline worker leaves the engine without its only mutator,
/// so continuing would only serve stale state.
pub fn configure_panic() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let (file, line) = panic_info.location().map(|l| (l.file(), l.line())).unwrap_or(("unknown", 0));
        let payload = panic_info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("Box<dyn Any>");
        let current = thread::current();
        error!("thread '{}' panicked at {}:{}: {}", current.name().unwrap_or("<unnamed>"), file, line, message);
        default_hook(panic_info);
        process::exit(1);
    }));
}
