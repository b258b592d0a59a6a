// Firewalld Converge - Daemon Availability
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Tri-state reachability of the firewalld daemon.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::runner::CommandRunner;
use crate::error::Error;

/// Whether the daemon can be reached, decided once per convergence pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonAvailability {
    /// `--state` succeeded: the live daemon answers.
    Online,
    /// The control binary exists but the daemon is not running.
    Offline,
    /// The control binary could not be run at all.
    Unknown,
}

impl DaemonAvailability {
    /// Probe the daemon with `<program> --state`.
    pub fn probe(runner: &dyn CommandRunner, program: &str) -> Self {
        match runner.run(program, &["--state".to_string()]) {
            Ok(out) if out.success() => {
                info!("firewalld is {}", out.stdout.trim());
                Self::Online
            }
            Ok(out) => {
                debug!(
                    "{} --state exited with {:?}: {}",
                    program,
                    out.status,
                    out.diagnostic()
                );
                info!("firewalld is not running, using offline configuration");
                Self::Offline
            }
            Err(Error::CommandNotFound { .. }) => {
                warn!("{} not found, firewalld availability unknown", program);
                Self::Unknown
            }
            Err(e) => {
                warn!("Failed to probe firewalld state: {}", e);
                Self::Unknown
            }
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    /// Whether commands can be dispatched at all (online or offline).
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Online => "running",
            Self::Offline => "not running",
            Self::Unknown => "unknown",
        }
    }
}
