//! Log verbosity handle
//!
//! Output goes through the `log` facade to an `env_logger` backend on stdout.
//! Whether debug records are shown is owned by a [`LogHandle`] that is passed
//! to whoever needs to change it, rather than by a package-level switch.
//!
//! ```ignore
//! let log = logging::init_logger();
//! log.set_debug(group.debug);
//! ```

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared switch between info and debug output
#[derive(Debug, Clone, Default)]
pub struct LogHandle {
    debug: Arc<AtomicBool>,
}

impl LogHandle {
    /// A handle that is not connected to the global logger
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Level records must not exceed to be written
    pub fn level(&self) -> LevelFilter {
        if self.is_debug() {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// env_logger wrapper whose debug output follows a [`LogHandle`]
pub struct SwitchableLogger {
    inner: env_logger::Logger,
    handle: LogHandle,
    /// `RUST_LOG` was set, so its filter is authoritative
    env_override: bool,
}

impl SwitchableLogger {
    pub fn new(handle: LogHandle) -> Self {
        let env_override = std::env::var_os(env_logger::DEFAULT_FILTER_ENV).is_some();
        let inner = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .parse_default_env()
            .target(env_logger::Target::Stdout)
            .format_timestamp_secs()
            .build();
        Self {
            inner,
            handle,
            env_override,
        }
    }
}

impl Log for SwitchableLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if !self.env_override && metadata.level() > Level::Info && !self.handle.is_debug() {
            return false;
        }
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the stdout logger and return the handle controlling it
///
/// Safe to call more than once; later calls get a handle that only affects
/// their own logger if one could be installed.
pub fn init_logger() -> LogHandle {
    let handle = LogHandle::default();
    let logger = SwitchableLogger::new(handle.clone());
    let max_level = logger.inner.filter();
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }
    handle
}
