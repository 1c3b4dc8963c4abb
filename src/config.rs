//! Configuration data structures for the tracker.
//!
//! Each option has a default value, so an empty configuration file (or none
//! at all) yields a working public tracker. Values can be overridden with a
//! TOML file passed on the command line or injected whole through the
//! `VORTEX_TRACKER_CONFIG_TOML` environment variable.
//!
//! A sample configuration:
//!
//! ```toml
//! [core]
//! announce_interval = 1800
//! min_announce_interval = 900
//! default_num_want = 50
//! max_num_want = 100
//! peer_ttl = 2100
//!
//! [http_tracker]
//! enabled = true
//! bind_address = "0.0.0.0:6969"
//! ssl_cert_path = "./storage/tls/tracker.crt"
//! ssl_key_path = "./storage/tls/tracker.key"
//!
//! [udp_tracker]
//! enabled = true
//! bind_address = "0.0.0.0:6969"
//! ```
use std::sync::Arc;

use camino::Utf8PathBuf;
use derive_more::Constructor;
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::bit_torrent::info_hash::InfoHash;

/// The whole configuration in TOML format. It has priority over the config
/// file, even if the file is present.
pub const ENV_VAR_CONFIG_TOML: &str = "VORTEX_TRACKER_CONFIG_TOML";

/// Announce policy: the intervals returned to peers in every announce
/// response.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Constructor)]
pub struct AnnouncePolicy {
    /// Interval in seconds that the client should wait between sending
    /// regular announce requests to the tracker.
    ///
    /// It's a **recommended** wait time between announcements.
    #[serde(default = "AnnouncePolicy::default_interval")]
    pub interval: u32,

    /// Minimum announce interval. Clients must not reannounce more frequently
    /// than this. It establishes the shortest allowed wait time.
    #[serde(default = "AnnouncePolicy::default_interval_min")]
    pub interval_min: u32,
}

impl Default for AnnouncePolicy {
    fn default() -> Self {
        Self {
            interval: Self::default_interval(),
            interval_min: Self::default_interval_min(),
        }
    }
}

impl AnnouncePolicy {
    fn default_interval() -> u32 {
        120
    }

    fn default_interval_min() -> u32 {
        120
    }
}

/// Core tracker configuration.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Core {
    /// Canonical interval in seconds returned to peers in announce
    /// responses.
    #[serde(default = "Core::default_announce_interval")]
    pub announce_interval: u32,

    /// Floor on the announce rate, also returned to peers.
    #[serde(default = "Core::default_min_announce_interval")]
    pub min_announce_interval: u32,

    /// Peers returned when the request does not carry a `numwant` param.
    #[serde(default = "Core::default_default_num_want")]
    pub default_num_want: u32,

    /// Upper clamp on the `numwant` param.
    #[serde(default = "Core::default_max_num_want")]
    pub max_num_want: u32,

    /// Maximum time in seconds that a peer can be inactive before being
    /// considered expired. Expired peers are never returned in responses and
    /// are eventually removed by the reaper.
    #[serde(default = "Core::default_peer_ttl")]
    pub peer_ttl: u64,

    /// Interval in seconds between reaper sweeps. `0` means half of
    /// `peer_ttl`.
    #[serde(default = "Core::default_reap_interval")]
    pub reap_interval: u64,

    /// Whether to trust the `ip` parameter of announce requests. When false
    /// the observed source address is always used.
    #[serde(default = "Core::default_allow_ip_spoofing")]
    pub allow_ip_spoofing: bool,

    /// When `true` only whitelisted torrents can be announced in the tracker.
    #[serde(default = "Core::default_listed")]
    pub listed: bool,

    /// The torrent whitelist, used only when `listed` is enabled. Infohashes
    /// are 40-character hex strings.
    #[serde(default = "Core::default_whitelist")]
    pub whitelist: Vec<InfoHash>,

    /// The threshold for the logs shown on the standard output. `Info` when
    /// not set.
    #[serde(default = "Core::default_log_level")]
    pub log_level: Option<LogLevel>,
}

/// The log threshold for the application.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for Core {
    fn default() -> Self {
        Self {
            announce_interval: Self::default_announce_interval(),
            min_announce_interval: Self::default_min_announce_interval(),
            default_num_want: Self::default_default_num_want(),
            max_num_want: Self::default_max_num_want(),
            peer_ttl: Self::default_peer_ttl(),
            reap_interval: Self::default_reap_interval(),
            allow_ip_spoofing: Self::default_allow_ip_spoofing(),
            listed: Self::default_listed(),
            whitelist: Self::default_whitelist(),
            log_level: Self::default_log_level(),
        }
    }
}

impl Core {
    fn default_announce_interval() -> u32 {
        AnnouncePolicy::default_interval()
    }

    fn default_min_announce_interval() -> u32 {
        AnnouncePolicy::default_interval_min()
    }

    /// The announce policy derived from the configured intervals.
    #[must_use]
    pub fn announce_policy(&self) -> AnnouncePolicy {
        AnnouncePolicy::new(self.announce_interval, self.min_announce_interval)
    }

    fn default_default_num_want() -> u32 {
        50
    }

    fn default_max_num_want() -> u32 {
        100
    }

    fn default_peer_ttl() -> u64 {
        2100
    }

    fn default_reap_interval() -> u64 {
        0
    }

    fn default_allow_ip_spoofing() -> bool {
        false
    }

    fn default_listed() -> bool {
        false
    }

    fn default_whitelist() -> Vec<InfoHash> {
        Vec::new()
    }

    fn default_log_level() -> Option<LogLevel> {
        None
    }

    /// The effective reaper period: the configured one, or half the peer TTL.
    #[must_use]
    pub fn effective_reap_interval(&self) -> u64 {
        if self.reap_interval > 0 {
            self.reap_interval
        } else {
            (self.peer_ttl / 2).max(1)
        }
    }
}

/// HTTP tracker configuration.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct HttpTracker {
    #[serde(default = "HttpTracker::default_enabled")]
    pub enabled: bool,

    /// The address the HTTP tracker binds to. The same port serves plain
    /// HTTP and, when the TLS paths are set, HTTPS.
    #[serde(default = "HttpTracker::default_bind_address")]
    pub bind_address: String,

    /// Path to the TLS certificate file (PEM). TLS is enabled when both the
    /// certificate and the key paths are set.
    #[serde(default = "HttpTracker::default_ssl_cert_path")]
    pub ssl_cert_path: Utf8PathBuf,

    /// Path to the TLS key file (PEM).
    #[serde(default = "HttpTracker::default_ssl_key_path")]
    pub ssl_key_path: Utf8PathBuf,

    /// Maximum duration in seconds for reading the request headers.
    #[serde(default = "HttpTracker::default_read_timeout")]
    pub read_timeout: u64,

    /// Maximum duration in seconds for writing the response.
    #[serde(default = "HttpTracker::default_write_timeout")]
    pub write_timeout: u64,

    /// Maximum duration in seconds for handling a whole request.
    #[serde(default = "HttpTracker::default_request_timeout")]
    pub request_timeout: u64,

    /// Maximum number of concurrently served connections. `0` means no
    /// limit.
    #[serde(default = "HttpTracker::default_listen_limit")]
    pub listen_limit: usize,
}

impl Default for HttpTracker {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            bind_address: Self::default_bind_address(),
            ssl_cert_path: Self::default_ssl_cert_path(),
            ssl_key_path: Self::default_ssl_key_path(),
            read_timeout: Self::default_read_timeout(),
            write_timeout: Self::default_write_timeout(),
            request_timeout: Self::default_request_timeout(),
            listen_limit: Self::default_listen_limit(),
        }
    }
}

impl HttpTracker {
    fn default_enabled() -> bool {
        true
    }

    fn default_bind_address() -> String {
        "0.0.0.0:6969".to_owned()
    }

    fn default_ssl_cert_path() -> Utf8PathBuf {
        Utf8PathBuf::new()
    }

    fn default_ssl_key_path() -> Utf8PathBuf {
        Utf8PathBuf::new()
    }

    fn default_read_timeout() -> u64 {
        5
    }

    fn default_write_timeout() -> u64 {
        5
    }

    fn default_request_timeout() -> u64 {
        10
    }

    fn default_listen_limit() -> usize {
        0
    }

    /// TLS is enabled when both the certificate and the key paths are set.
    #[must_use]
    pub fn tls_enabled(&self) -> bool {
        !self.ssl_cert_path.as_str().is_empty() && !self.ssl_key_path.as_str().is_empty()
    }
}

/// UDP tracker configuration.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct UdpTracker {
    #[serde(default = "UdpTracker::default_enabled")]
    pub enabled: bool,

    /// The address the UDP tracker binds to.
    #[serde(default = "UdpTracker::default_bind_address")]
    pub bind_address: String,

    /// The socket receive buffer size in bytes. `0` keeps the OS default.
    #[serde(default = "UdpTracker::default_read_buffer_size")]
    pub read_buffer_size: usize,
}

impl Default for UdpTracker {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            bind_address: Self::default_bind_address(),
            read_buffer_size: Self::default_read_buffer_size(),
        }
    }
}

impl UdpTracker {
    fn default_enabled() -> bool {
        true
    }

    fn default_bind_address() -> String {
        "0.0.0.0:6969".to_owned()
    }

    fn default_read_buffer_size() -> usize {
        0
    }
}

/// The whole tracker configuration.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct Configuration {
    #[serde(default)]
    pub core: Core,

    #[serde(default)]
    pub http_tracker: HttpTracker,

    #[serde(default)]
    pub udp_tracker: UdpTracker,
}

/// Errors that can occur when loading the configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed processing the configuration: {source}")]
    ConfigError { source: Arc<figment::Error> },
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigError { source: Arc::new(err) }
    }
}

impl Configuration {
    /// Loads the configuration.
    ///
    /// Defaults are used as the base layer; the TOML file at `config_path`
    /// (when given) and the `VORTEX_TRACKER_CONFIG_TOML` environment variable
    /// (when set) are merged on top, in that order.
    ///
    /// # Errors
    ///
    /// Will return an error if the TOML cannot be parsed or has values of
    /// the wrong type.
    pub fn load(config_path: Option<&str>) -> Result<Configuration, Error> {
        let mut figment = Figment::from(Serialized::defaults(Configuration::default()));

        if let Some(config_path) = config_path {
            figment = figment.merge(Toml::file(config_path));
        }

        if let Ok(config_toml) = std::env::var(ENV_VAR_CONFIG_TOML) {
            figment = figment.merge(Toml::string(&config_toml));
        }

        let config: Configuration = figment.extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Configuration;

    #[cfg(test)]
    fn default_config_toml() -> String {
        let config = r#"
            [core]
            announce_interval = 1800
            min_announce_interval = 900
            peer_ttl = 900

            [http_tracker]
            bind_address = "127.0.0.1:7070"

            [udp_tracker]
            bind_address = "127.0.0.1:6969"
        "#;

        config.to_string()
    }

    #[test]
    fn configuration_should_have_default_values() {
        let configuration = Configuration::default();

        assert_eq!(configuration.core.announce_interval, 120);
        assert_eq!(configuration.core.default_num_want, 50);
        assert_eq!(configuration.core.max_num_want, 100);
        assert!(!configuration.core.allow_ip_spoofing);
        assert!(!configuration.core.listed);
        assert!(configuration.http_tracker.enabled);
        assert!(!configuration.http_tracker.tls_enabled());
        assert!(configuration.udp_tracker.enabled);
    }

    #[test]
    fn configuration_should_be_loaded_from_the_environment() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("VORTEX_TRACKER_CONFIG_TOML", default_config_toml());

            let configuration = Configuration::load(None).expect("the env var config should load");

            assert_eq!(configuration.core.announce_interval, 1800);
            assert_eq!(configuration.core.min_announce_interval, 900);
            assert_eq!(configuration.core.peer_ttl, 900);
            assert_eq!(configuration.http_tracker.bind_address, "127.0.0.1:7070");
            assert_eq!(configuration.udp_tracker.bind_address, "127.0.0.1:6969");

            Ok(())
        });
    }

    #[test]
    fn the_reap_interval_should_default_to_half_the_peer_ttl() {
        let mut configuration = Configuration::default();

        configuration.core.peer_ttl = 1000;
        configuration.core.reap_interval = 0;
        assert_eq!(configuration.core.effective_reap_interval(), 500);

        configuration.core.reap_interval = 60;
        assert_eq!(configuration.core.effective_reap_interval(), 60);
    }
}
