//! Runtime settings, from the command line or the environment.

use anyhow::{Result, bail};
use clap::Args;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::detect::DEFAULT_THRESHOLD_KM;

/// Transport for NSW bus vehicle positions.
pub const DEFAULT_FEED_URL: &str = "https://api.transport.nsw.gov.au/v1/gtfs/vehiclepos/buses";

/// Longest refresh interval or fetch timeout accepted, one day.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Settings for the long-running `serve` mode.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Feed URL or path to a protobuf snapshot file
    #[arg(long, env = "FEED_URL", default_value = DEFAULT_FEED_URL)]
    pub feed_url: String,

    /// API key sent as `Authorization: apikey <key>`
    #[arg(long, env = "TFN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Seconds between refresh ticks
    #[arg(short = 'i', long, env = "REFRESH_INTERVAL_SECS", default_value_t = 10)]
    pub interval_secs: u64,

    /// Pairs on the same route closer than this are bunched
    #[arg(short, long, env = "BUNCHING_THRESHOLD_KM", default_value_t = DEFAULT_THRESHOLD_KM)]
    pub threshold_km: f64,

    /// Give up on a snapshot fetch after this many seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 8)]
    pub fetch_timeout_secs: u64,

    /// Address the HTTP API binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port the HTTP API listens on
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    pub port: u16,
}

impl Settings {
    /// Rejects values the refresh loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_INTERVAL_SECS).contains(&self.interval_secs) {
            bail!(
                "refresh interval must be between 1 and {MAX_INTERVAL_SECS} seconds, got {}",
                self.interval_secs
            );
        }
        if !(1..=MAX_INTERVAL_SECS).contains(&self.fetch_timeout_secs) {
            bail!(
                "fetch timeout must be between 1 and {MAX_INTERVAL_SECS} seconds, got {}",
                self.fetch_timeout_secs
            );
        }
        if !self.threshold_km.is_finite() || self.threshold_km < 0.0 {
            bail!(
                "bunching threshold must be a non-negative number of km, got {}",
                self.threshold_km
            );
        }
        if self.feed_url.trim().is_empty() {
            bail!("feed URL must not be empty");
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// The API key, ignoring blank values left in `.env` files.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}
