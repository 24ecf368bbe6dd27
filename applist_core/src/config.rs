/*============================================================
  Synavera Project: AppList-Core
  Module: applist_core::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load operator configuration for AppList-Core from TOML,
    falling back to defaults when no file is present.

  Security / Safety Notes:
    The shell prefix is executed verbatim; it is read only
    from operator-owned configuration, never from callers.

  Dependencies:
    serde + toml for parsing, dirs for default locations.

  Operational Scope:
    Read once at start-up by the binary entry point.

  Revision History:
    2026-10-19 COD  Authored configuration loader.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Missing configuration is not an error
    - Malformed configuration fails loudly with its path
============================================================*/

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppListError, Result};
use crate::icon::DEFAULT_ICON_SIZE;

const CONFIG_DIR: &str = "applist";
const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppListConfig {
    pub core: CoreConfig,
    pub device: DeviceConfig,
    pub icons: IconConfig,
}

/// Output and log locations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_dir: Option<PathBuf>,
    pub inventory_path: Option<PathBuf>,
}

/// How platform commands are executed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Wrapper such as `["su", "-c"]`; the command line is passed as
    /// a single trailing argument.
    pub shell_prefix: Vec<String>,
    pub dumpsys_command: String,
    pub cmd_command: String,
    pub am_command: String,
    /// Android user whose installed packages are listed.
    pub user_id: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            shell_prefix: Vec::new(),
            dumpsys_command: "dumpsys".into(),
            cmd_command: "cmd".into(),
            am_command: "am".into(),
            user_id: 0,
        }
    }
}

/// Icon normalisation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    pub placeholder_size: u32,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            placeholder_size: DEFAULT_ICON_SIZE,
        }
    }
}

impl AppListConfig {
    /// Load from `path` if given, else from the default location if it
    /// exists, else defaults.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(explicit) => Self::load(explicit),
            None => match default_config_path() {
                Some(candidate) if candidate.is_file() => Self::load(&candidate),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AppListError::Config(format!("Failed to read {}: {err}", path.display()))
        })?;
        let config: Self = toml::from_str(&raw).map_err(|err| {
            AppListError::Config(format!("Failed to parse {}: {err}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.icons.placeholder_size == 0 {
            return Err(AppListError::Config(
                "icons.placeholder_size must be positive".into(),
            ));
        }
        if self.device.dumpsys_command.trim().is_empty() {
            return Err(AppListError::Config(
                "device.dumpsys_command must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Directory for session logs.
    pub fn log_dir(&self) -> PathBuf {
        self.core
            .log_dir
            .clone()
            .unwrap_or_else(|| state_dir().join("logs"))
    }

    /// Where `list --output` writes when no path is given.
    pub fn inventory_path(&self) -> PathBuf {
        self.core
            .inventory_path
            .clone()
            .unwrap_or_else(|| state_dir().join("inventory.json"))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

fn state_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CONFIG_DIR)
}
