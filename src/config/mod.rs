//! Configuration management

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Run against the simulated device transport (no native discovery)
    #[serde(default = "default_demo")]
    pub demo: bool,

    /// Upper bound on a single discovery pass, in seconds
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,

    #[serde(default)]
    pub autoconnect: AutoConnectConfig,

    #[serde(default)]
    pub store: Option<StoreConfig>,

    #[serde(default)]
    pub speech: Option<SpeechConfig>,
}

fn default_port() -> u16 {
    8088
}

fn default_demo() -> bool {
    true
}

fn default_scan_timeout() -> u64 {
    10
}

/// Auto-reconnect loop tuning
#[derive(Debug, Clone, Deserialize)]
pub struct AutoConnectConfig {
    /// Seconds between reconnect evaluation passes
    #[serde(default = "default_reconnect_interval")]
    pub interval_secs: u64,

    /// Signal strength (0-100) required by the proximity predicate
    #[serde(default = "default_signal_threshold")]
    pub signal_threshold: u8,
}

impl Default for AutoConnectConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconnect_interval(),
            signal_threshold: default_signal_threshold(),
        }
    }
}

fn default_reconnect_interval() -> u64 {
    5
}

fn default_signal_threshold() -> u8 {
    60
}

/// Hosted row-store connection (tables: device_connections, automation_rules,
/// voice_commands, audio_library)
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: String,
}

/// Remote speech-synthesis endpoint; absent means local fallback only
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
}

fn default_voice_id() -> String {
    "aria".to_string()
}

/// Get config directory (HUB_CONFIG_DIR, XDG_CONFIG_HOME or platform default)
pub fn get_config_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("HUB_CONFIG_DIR") {
        return std::path::PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home)
                .join("Library/Application Support/smart-hub-control");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return std::path::PathBuf::from(xdg).join("smart-hub-control");
        }
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home).join(".config/smart-hub-control");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return std::path::PathBuf::from(appdata).join("smart-hub-control");
        }
    }

    // Fallback to current directory
    std::path::PathBuf::from(".")
}

pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir();

    let mut builder = ::config::Config::builder()
        // Start with defaults
        .set_default("port", 8088)?
        // Load from config file if it exists
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // Override with environment variables (HUB_PORT, HUB_STORE__URL, etc.)
        .add_source(
            ::config::Environment::with_prefix("HUB")
                .separator("__")
                .try_parsing(true),
        );

    // Support PORT env vars with explicit precedence: HUB_PORT > PORT > config > default
    if let Ok(port) = std::env::var("HUB_PORT") {
        if let Ok(port_num) = port.parse::<u16>() {
            builder = builder.set_override("port", port_num as i64)?;
        }
    } else if let Ok(port) = std::env::var("PORT") {
        // Legacy PORT fallback (Docker, hosting platforms)
        if let Ok(port_num) = port.parse::<u16>() {
            builder = builder.set_override("port", port_num as i64)?;
        }
    }

    let config = builder.build()?;

    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_defaults() {
        env::remove_var("HUB_PORT");
        env::remove_var("PORT");
        env::set_var("HUB_CONFIG_DIR", "/tmp/hub-test-nonexistent");

        let config = load_config().expect("config should load");

        env::remove_var("HUB_CONFIG_DIR");

        assert_eq!(config.port, 8088);
        assert!(config.demo);
        assert_eq!(config.scan_timeout_secs, 10);
        assert_eq!(config.autoconnect.interval_secs, 5);
        assert_eq!(config.autoconnect.signal_threshold, 60);
        assert!(config.store.is_none());
        assert!(config.speech.is_none());
    }

    #[test]
    #[serial]
    fn test_config_file_is_loaded() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(
            temp_dir.path().join("config.toml"),
            "port = 9091\ndemo = false\n\n[autoconnect]\ninterval_secs = 9\nsignal_threshold = 40\n",
        )
        .expect("write config file");

        env::remove_var("HUB_PORT");
        env::remove_var("PORT");
        env::set_var("HUB_CONFIG_DIR", temp_dir.path());

        let config = load_config().expect("config should load");

        env::remove_var("HUB_CONFIG_DIR");

        assert_eq!(config.port, 9091);
        assert!(!config.demo);
        assert_eq!(config.autoconnect.interval_secs, 9);
        assert_eq!(config.autoconnect.signal_threshold, 40);
    }

    #[test]
    #[serial]
    fn test_port_env_fallback() {
        // PORT env var should work as fallback when HUB_PORT is not set
        env::remove_var("HUB_PORT");
        env::remove_var("PORT");
        env::set_var("HUB_CONFIG_DIR", "/tmp/hub-test-nonexistent");

        env::set_var("PORT", "3000");

        let config = load_config().expect("config should load");

        env::remove_var("PORT");
        env::remove_var("HUB_CONFIG_DIR");

        assert_eq!(config.port, 3000, "PORT env var should set config.port");
    }

    #[test]
    #[serial]
    fn test_hub_port_takes_precedence_over_port() {
        env::remove_var("HUB_PORT");
        env::remove_var("PORT");
        env::set_var("HUB_CONFIG_DIR", "/tmp/hub-test-nonexistent");

        // Set both - HUB_PORT should win
        env::set_var("HUB_PORT", "5000");
        env::set_var("PORT", "3000");

        let config = load_config().expect("config should load");

        env::remove_var("HUB_PORT");
        env::remove_var("PORT");
        env::remove_var("HUB_CONFIG_DIR");

        assert_eq!(
            config.port, 5000,
            "HUB_PORT should take precedence over PORT"
        );
    }

    #[test]
    #[serial]
    fn test_invalid_port_uses_default() {
        env::remove_var("HUB_PORT");
        env::remove_var("PORT");
        env::set_var("HUB_CONFIG_DIR", "/tmp/hub-test-nonexistent");

        env::set_var("PORT", "not-a-number");

        let config = load_config().expect("config should load");

        env::remove_var("PORT");
        env::remove_var("HUB_CONFIG_DIR");

        assert_eq!(config.port, 8088, "Invalid PORT should fall back to default");
    }
}
