use rig_stats::{AnchorSource, EngineOptions, PercentGuard, WindowPolicy};
use serde::Deserialize;
use std::{env, fs};

#[derive(Debug, Clone)]
pub struct Config {
    pub upstream_address: String,
    pub http_address: String,
    pub rig_id: String,
    pub rig_ip: String,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub staleness_threshold_secs: u64,
    pub engine: EngineOptions,
}

#[derive(Debug, Default, Deserialize)]
struct StatsRigConfig {
    #[serde(default)]
    upstream: UpstreamConfig,
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    rig: RigConfig,
    #[serde(default)]
    polling: PollingConfig,
    #[serde(default)]
    snapshot_storage: SnapshotStorageConfig,
    #[serde(default)]
    short_window: WindowPolicyConfig,
    #[serde(default)]
    long_window: WindowPolicyConfig,
}

#[derive(Debug, Deserialize)]
struct UpstreamConfig {
    address: Option<String>,
    request_timeout_secs: Option<u64>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: Some("127.0.0.1:1633".to_string()),
            request_timeout_secs: Some(60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
    http_listen_address: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_listen_address: Some("127.0.0.1:9085".to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RigConfig {
    id: Option<String>,
    ip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PollingConfig {
    interval_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: Some(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotStorageConfig {
    staleness_threshold_secs: Option<u64>,
}

impl Default for SnapshotStorageConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_secs: Some(180),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WindowPolicyConfig {
    anchor_source: Option<AnchorSource>,
    percent_guard: Option<PercentGuard>,
}

impl WindowPolicyConfig {
    fn apply(&self, defaults: WindowPolicy) -> WindowPolicy {
        WindowPolicy {
            anchor_source: self.anchor_source.unwrap_or(defaults.anchor_source),
            percent_guard: self.percent_guard.unwrap_or(defaults.percent_guard),
        }
    }
}

/// Value following `flags` on the command line.
fn arg_value(args: &[String], flags: &[&str]) -> Option<String> {
    args.iter()
        .position(|arg| flags.contains(&arg.as_str()))
        .and_then(|i| args.get(i + 1))
        .cloned()
}

impl Config {
    pub fn from_args() -> Result<Self, Box<dyn std::error::Error>> {
        let args: Vec<String> = env::args().collect();

        let config_path = arg_value(&args, &["--config", "-c"])
            .ok_or("Missing required argument: --config")?;
        let config_str = fs::read_to_string(&config_path).unwrap_or_default();

        Self::from_parts(&args, &config_str)
    }

    /// Build from a command line and the contents of the config file. CLI
    /// flags override file values.
    fn from_parts(args: &[String], config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let file_config: StatsRigConfig = if config_str.trim().is_empty() {
            StatsRigConfig::default()
        } else {
            toml::from_str(config_str)?
        };

        let upstream_address = arg_value(args, &["--upstream-address", "-u"])
            .or(file_config.upstream.address)
            .ok_or("Missing required config: upstream.address")?;

        let http_address = arg_value(args, &["--http-address", "-h"])
            .or(file_config.server.http_listen_address)
            .ok_or("Missing required config: server.http_listen_address")?;

        let rig_id = arg_value(args, &["--rig-id"])
            .or(file_config.rig.id)
            .ok_or("Missing required config: rig.id")?;

        let rig_ip = arg_value(args, &["--rig-ip"])
            .or(file_config.rig.ip)
            .unwrap_or_default();

        let poll_interval_secs = file_config.polling.interval_secs.unwrap_or(30);
        if poll_interval_secs == 0 {
            return Err("polling.interval_secs must be greater than 0".into());
        }

        Ok(Config {
            upstream_address,
            http_address,
            rig_id,
            rig_ip,
            poll_interval_secs,
            request_timeout_secs: file_config.upstream.request_timeout_secs.unwrap_or(60),
            staleness_threshold_secs: file_config
                .snapshot_storage
                .staleness_threshold_secs
                .unwrap_or(180),
            engine: EngineOptions {
                short: file_config.short_window.apply(WindowPolicy::short()),
                long: file_config.long_window.apply(WindowPolicy::long()),
            },
        })
    }
}
