use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::host;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub terminal: TerminalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Preferred terminal command line, e.g. "alacritty" or "kitty --single-instance".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    /// How long a sandboxed availability probe may take, in humantime notation.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: String,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self { application: None, probe_timeout: default_probe_timeout() }
    }
}

impl TerminalConfig {
    pub fn probe_timeout(&self) -> Duration {
        match humantime::parse_duration(&self.probe_timeout) {
            Ok(d) => d,
            Err(err) => {
                log::warn!("invalid probe_timeout {:?}: {}", self.probe_timeout, err);
                DEFAULT_PROBE_TIMEOUT
            }
        }
    }
}

fn default_probe_timeout() -> String {
    humantime::format_duration(DEFAULT_PROBE_TIMEOUT).to_string()
}

pub fn config_dir() -> PathBuf {
    host::xdg_dir("XDG_CONFIG_HOME", &host::home_dir(), ".config").join("kontainer")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn load_config() -> Config {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Config {
    match fs::read_to_string(path) {
        Ok(s) => toml::from_str(&s).unwrap_or_else(|err| {
            log::warn!("ignoring malformed {}: {}", path.display(), err);
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

pub fn save_config(cfg: &Config) -> Result<()> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let s = toml::to_string_pretty(cfg).context("serializing config")?;
    fs::write(path, s).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_malformed_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = load_config_from(&path);
        assert!(cfg.terminal.application.is_none());
        assert_eq!(cfg.terminal.probe_timeout(), Duration::from_secs(3));

        fs::write(&path, "terminal = [").unwrap();
        assert!(load_config_from(&path).terminal.application.is_none());
    }

    #[test]
    fn saved_config_is_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut cfg = Config::default();
        cfg.terminal.application = Some("kitty --single-instance".into());
        cfg.terminal.probe_timeout = "500ms".into();
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path);
        assert_eq!(loaded.terminal.application.as_deref(), Some("kitty --single-instance"));
        assert_eq!(loaded.terminal.probe_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn bad_probe_timeout_uses_default() {
        let cfg: Config = toml::from_str("[terminal]\nprobe_timeout = \"soon\"\n").unwrap();
        assert_eq!(cfg.terminal.probe_timeout(), Duration::from_secs(3));
    }
}
