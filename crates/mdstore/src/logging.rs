//! Tracing output for processes that embed mdstore.
//!
//! The library only emits events: lock acquire and release plus each atomic
//! replace at `debug`, stale-marker reclaim and ignored config overrides at
//! `warn`. Binaries and tests opt into printing them with [`init`].

use tracing_subscriber::filter::LevelFilter;

/// Environment variable holding the max log level (`off` disables output).
pub const LOG_ENV: &str = "MDSTORE_LOG";

/// Level requested by `raw`; unset or unrecognized values mean `info`.
fn level_from(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(LevelFilter::INFO)
}

/// Print store events to stderr at the level named by `MDSTORE_LOG`.
///
/// Safe to call repeatedly. Does nothing if the process already installed a
/// global subscriber.
pub fn init() {
    init_with(level_from(std::env::var(LOG_ENV).ok().as_deref()));
}

/// Install a stderr fmt subscriber capped at `level`.
///
/// Returns `false` when a global subscriber was already installed, in which
/// case that one keeps receiving events.
pub fn init_with(level: LevelFilter) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_from_known_values() {
        assert_eq!(level_from(Some("trace")), LevelFilter::TRACE);
        assert_eq!(level_from(Some("DEBUG")), LevelFilter::DEBUG);
        assert_eq!(level_from(Some(" warn ")), LevelFilter::WARN);
        assert_eq!(level_from(Some("off")), LevelFilter::OFF);
    }

    #[test]
    fn level_from_defaults_to_info() {
        assert_eq!(level_from(None), LevelFilter::INFO);
        assert_eq!(level_from(Some("loud")), LevelFilter::INFO);
    }

    #[test]
    fn second_init_keeps_first_subscriber() {
        init();
        assert!(!init_with(LevelFilter::TRACE));
        tracing::debug!("logging initialized twice without panicking");
    }
}
