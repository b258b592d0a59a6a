// Firewalld Converge - Firewall Module
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Command adapter over `firewall-cmd` / `firewall-offline-cmd`.

mod availability;
mod client;
mod runner;

#[cfg(test)]
pub mod testing;

use std::fmt;

use serde::Serialize;

pub use availability::DaemonAvailability;
pub use client::FirewallCmd;
pub use runner::{display_command, CommandOutput, CommandRunner, SystemRunner};

/// Control binary that talks to the running daemon.
pub const ONLINE_CMD: &str = "firewall-cmd";

/// Control binary that edits persisted configuration without the daemon.
pub const OFFLINE_CMD: &str = "firewall-offline-cmd";

/// Oldest firewalld release that understands policies.
pub const POLICY_MIN_VERSION: &str = "0.9.0";

/// Configuration plane a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    /// Persisted configuration, survives restarts.
    Permanent,
    /// Live configuration held by the daemon.
    Runtime,
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permanent => f.write_str("permanent"),
            Self::Runtime => f.write_str("runtime"),
        }
    }
}

/// The zone or policy a command is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum Scope {
    Zone(String),
    Policy(String),
}

impl Scope {
    /// The command-line flag selecting this scope.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Zone(_) => "--zone",
            Self::Policy(_) => "--policy",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Zone(name) | Self::Policy(name) => name,
        }
    }

    pub fn is_policy(&self) -> bool {
        matches!(self, Self::Policy(_))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zone(name) => write!(f, "zone '{}'", name),
            Self::Policy(name) => write!(f, "policy '{}'", name),
        }
    }
}
