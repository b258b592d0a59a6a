// Firewalld Converge - Configuration
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Tool settings loaded from a local JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::firewall::{OFFLINE_CMD, ONLINE_CMD};

/// Convergence settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Control binary for the running daemon.
    #[serde(default = "default_firewall_cmd")]
    pub firewall_cmd: String,
    /// Control binary used when the daemon is not running.
    #[serde(default = "default_offline_cmd")]
    pub offline_cmd: String,
    /// Per-command timeout in seconds; 0 disables it.
    #[serde(default = "default_timeout")]
    pub command_timeout_secs: u64,
    /// Compute and report changes without applying them.
    #[serde(default)]
    pub dry_run: bool,
    /// Reload the daemon after a resource changed.
    #[serde(default = "default_reload")]
    pub reload_after_change: bool,
}

fn default_firewall_cmd() -> String { ONLINE_CMD.to_string() }
fn default_offline_cmd() -> String { OFFLINE_CMD.to_string() }
fn default_timeout() -> u64 { 60 }
fn default_reload() -> bool { true }

impl Default for Settings {
    fn default() -> Self {
        Self {
            firewall_cmd: default_firewall_cmd(),
            offline_cmd: default_offline_cmd(),
            command_timeout_secs: default_timeout(),
            dry_run: false,
            reload_after_change: default_reload(),
        }
    }
}

impl Settings {
    /// `$XDG_CONFIG_HOME/firewalld-converge/settings.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("firewalld-converge")
            .join("settings.json")
    }

    /// Load settings from `path` (or the default location). A missing or
    /// unreadable file yields defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Failed to parse settings {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        match self.command_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
