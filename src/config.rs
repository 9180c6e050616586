use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;
use crate::scrape::ScrapeSettings;

/// Upper bound for either side of the window.
const MAX_WINDOW_SECS: u64 = 86_400;

/// Command-line and environment configuration.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Windowed request-status gauges over a Redis event store")]
pub struct Config {
    /// Address the HTTP server binds to
    #[arg(long, env = "REQS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP server binds to
    #[arg(long, env = "REQS_PORT", default_value_t = 8300)]
    pub port: u16,

    /// Redis host holding the events
    #[arg(long, env = "REQS_STORE_HOST", default_value = "127.0.0.1")]
    pub store_host: String,

    /// Redis port
    #[arg(long, env = "REQS_STORE_PORT", default_value_t = 6379)]
    pub store_port: u16,

    /// Key prefix every event key lives under
    #[arg(long, env = "REQS_COLLECTION", default_value = "metrics")]
    pub collection: String,

    /// Seconds before "now" a scrape looks at
    #[arg(long, env = "REQS_LOOK_BACK_SECS", default_value_t = 10)]
    pub look_back_secs: u64,

    /// Seconds after "now" a scrape looks at
    #[arg(long, env = "REQS_LOOK_AHEAD_SECS", default_value_t = 10)]
    pub look_ahead_secs: u64,

    /// Budget for each store call, in milliseconds
    #[arg(long, env = "REQS_STORE_TIMEOUT_MS", default_value_t = 2_000)]
    pub store_timeout_ms: u64,

    /// How many distinct destinations one scrape discovers
    #[arg(long, env = "REQS_MAX_DESTINATIONS", default_value_t = 100)]
    pub max_destinations: usize,

    /// Log filter, e.g. "info" or "reqs_window_exporter=debug"
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Connect to the store, make sure the collection exists, then exit
    #[arg(long)]
    pub check_store: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.look_back_secs == 0 && self.look_ahead_secs == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        for (name, got) in [
            ("look-back", self.look_back_secs),
            ("look-ahead", self.look_ahead_secs),
        ] {
            if got > MAX_WINDOW_SECS {
                return Err(ConfigError::WindowTooLarge {
                    name,
                    max: MAX_WINDOW_SECS,
                    got,
                });
            }
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_destinations == 0 {
            return Err(ConfigError::ZeroDestinations);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn store_url(&self) -> String {
        format!("redis://{}:{}/", self.store_host, self.store_port)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn scrape_settings(&self) -> ScrapeSettings {
        // Both bounded by MAX_WINDOW_SECS after validate()
        ScrapeSettings {
            look_back: chrono::Duration::seconds(self.look_back_secs as i64),
            look_ahead: chrono::Duration::seconds(self.look_ahead_secs as i64),
            store_timeout: self.store_timeout(),
            max_destinations: self.max_destinations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["reqs-window-exporter"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = parse(&[]);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8300");
        assert_eq!(cfg.store_url(), "redis://127.0.0.1:6379/");
        assert_eq!(cfg.collection, "metrics");
        let settings = cfg.scrape_settings();
        assert_eq!(settings.look_back, chrono::Duration::seconds(10));
        assert_eq!(settings.look_ahead, chrono::Duration::seconds(10));
        assert_eq!(settings.store_timeout, Duration::from_secs(2));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = parse(&["--port", "9000", "--store-host", "redis.internal", "--look-back-secs", "30"]);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9000");
        assert_eq!(cfg.store_url(), "redis://redis.internal:6379/");
        assert_eq!(cfg.look_back_secs, 30);
    }

    #[test]
    fn zero_width_window_is_rejected() {
        let cfg = parse(&["--look-back-secs", "0", "--look-ahead-secs", "0"]);
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyWindow));
    }

    #[test]
    fn oversized_window_is_rejected() {
        let cfg = parse(&["--look-ahead-secs", "100000"]);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::WindowTooLarge { name: "look-ahead", .. })
        ));
    }
}
