//! Logger and logging macros
//!
//! Components log through the macros re-exported here so the backing
//! implementation stays a single concern of this crate.

mod appender;
mod consts;
mod logger;

use appender::AppenderSpec;
use consts::{DEFAULT_LOGGER_ENV, ERR_LOG_FILE_NAME, LOG_FILE_NAME};
use log4rs::config::{Config, Root};
use std::sync::atomic::{AtomicBool, Ordering};

pub use log::{Level, LevelFilter};
pub use logger::{Filters, LogError};

#[macro_export]
macro_rules! trace {
    ($($t:tt)+) => ( $crate::log::__private_log::trace!($($t)+) )
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)+) => ( $crate::log::__private_log::debug!($($t)+) )
}

#[macro_export]
macro_rules! info {
    ($($t:tt)+) => ( $crate::log::__private_log::info!($($t)+) )
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)+) => ( $crate::log::__private_log::warn!($($t)+) )
}

#[macro_export]
macro_rules! error {
    ($($t:tt)+) => ( $crate::log::__private_log::error!($($t)+) )
}

#[doc(hidden)]
pub use log as __private_log;

const CONSOLE_APPENDER: &str = "stdout";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Installs the global logger.
///
/// Filters are read from `RUST_LOG` first and then from `filters`, so that the
/// explicit expression wins. When `log_dir` is set, a rolling log file and an
/// error-only log file are written there as well.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    if LOGGER_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(LogError::AlreadyInitialized);
    }
    let result = install(log_dir, filters);
    if result.is_err() {
        LOGGER_INITIALIZED.store(false, Ordering::SeqCst);
    }
    result
}

/// Installs the global logger unless one was already installed. Meant for tests.
pub fn try_init_logger(filters: &str) {
    match init_logger(None, filters) {
        Ok(()) | Err(LogError::AlreadyInitialized) => {}
        Err(err) => eprintln!("logger setup failed: {}", err),
    }
}

fn install(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let filters = Filters::new().with_root_level(LevelFilter::Info).parse_env(DEFAULT_LOGGER_ENV).parse_expression(filters);

    let mut specs = vec![AppenderSpec::console(CONSOLE_APPENDER, None)];
    if let Some(dir) = log_dir {
        specs.push(AppenderSpec::roller(LOG_FILE_APPENDER, None, dir, LOG_FILE_NAME)?);
        specs.push(AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), dir, ERR_LOG_FILE_NAME)?);
    }
    let names = specs.iter().map(|spec| spec.name).collect::<Vec<_>>();

    let config = Config::builder()
        .appenders(specs.into_iter().map(AppenderSpec::appender))
        .loggers(filters.loggers(&names))
        .build(Root::builder().appenders(names.iter().map(|x| x.to_string())).build(filters.root_level()))
        .map_err(|err| LogError::Config(err.to_string()))?;

    log4rs::init_config(config).map(|_| ()).map_err(|_| LogError::AlreadyInitialized)
}
