use chrono::Local;
use log::{set_logger, set_max_level, LevelFilter, Metadata, Record};
use std::sync::atomic::Ordering;

use crate::parser::iter_options;
use crate::types::code;

/// Форматированный лог с временной меткой
pub fn log_line(msg: &str) {
    let now = Local::now().format("%H:%M:%S");
    println!("{} {}", now, msg);
}

/// `log` backend writing every record through `log_line` as
/// `[LEVEL] target: message`.
pub struct LineLogger;

impl LineLogger {
    /// Install as the global logger. If another logger is already installed
    /// it stays, only the level is changed.
    pub fn init(filter: LevelFilter) {
        let _ = set_logger(&LineLogger);
        set_max_level(filter);
    }
}

impl log::Log for LineLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            log_line(&format!("[{}] {}: {}", record.level(), record.target(), record.args()));
        }
    }

    fn flush(&self) {}
}

/// Dump every option TLV of a control packet body, one line per option.
/// Only active while `TRACE_OPTIONS` is set.
pub fn log_options(proto: &str, direction: &str, packet_code: u8, options: &[u8]) {
    if !crate::TRACE_OPTIONS.load(Ordering::Relaxed) {
        return;
    }
    log_line(&format!("{} {} {} ({} bytes)", direction, proto, code::name(packet_code), options.len()));
    for (option_type, data) in iter_options(options) {
        log_line(&format!(
            "  {} {} Option={} Data={}",
            direction,
            proto,
            option_type,
            hex::encode_upper(data)
        ));
    }
}
