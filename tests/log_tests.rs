use log::{Level, LevelFilter};
use ppp_ipcp::log::LineLogger;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_line_logger_applies_the_configured_level() {
        LineLogger::init(LevelFilter::Warn);

        assert_eq!(log::max_level(), LevelFilter::Warn);
        assert!(log::log_enabled!(target: "net.ppp.ipcp", Level::Error));
        assert!(log::log_enabled!(target: "net.ppp.ipcp", Level::Warn));
        assert!(!log::log_enabled!(target: "net.ppp.ipcp", Level::Info), "info must be filtered at warn");

        // A second init keeps the installed logger and only moves the level
        LineLogger::init(LevelFilter::Trace);
        assert_eq!(log::max_level(), LevelFilter::Trace);
        assert!(log::log_enabled!(target: "net.ppp.pcb", Level::Trace));
        log::trace!(target: "net.ppp.pcb", "logger reachable at trace");
    }
}
