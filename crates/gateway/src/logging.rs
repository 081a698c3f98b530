//! Injected log sink for the gateway
//!
//! The gateway writes its records to an `Arc<dyn log::Log>` handed to it at
//! construction instead of reaching for the global logger directly. The
//! default sink forwards to whatever the process installed (env_logger etc).

use log::{Level, Log, Metadata, Record};
use std::fmt;
use std::sync::Arc;

const TARGET: &str = "hermes_gateway";

/// Log handle carried by gateway components
#[derive(Clone)]
pub struct GatewayLog {
    sink: Arc<dyn Log>,
}

impl GatewayLog {
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Self { sink }
    }

    /// Log handle forwarding to the global `log` facade
    pub fn facade() -> Self {
        Self::new(Arc::new(FacadeLog))
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Error, args);
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(TARGET).build();
        if !self.sink.enabled(&metadata) {
            return;
        }
        self.sink.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }
}

impl Default for GatewayLog {
    fn default() -> Self {
        Self::facade()
    }
}

impl fmt::Debug for GatewayLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayLog").finish_non_exhaustive()
    }
}

/// Forwards to the logger installed through the `log` crate
struct FacadeLog;

impl Log for FacadeLog {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        log::logger().log(record);
    }

    fn flush(&self) {
        log::logger().flush();
    }
}
