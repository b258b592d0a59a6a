// Firewalld Converge - Port Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! A port opened in a zone or policy.

use serde::Deserialize;

use super::{resolve_scope, string_or_number, validate_one_of, Canonical, Ensure};
use crate::error::{Error, Result};
use crate::firewall::Scope;

/// Protocols firewalld accepts for `--add-port`.
pub const PROTOCOLS: &[&str] = &["tcp", "udp", "sctp", "dccp"];

/// A port rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Port {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub policy: Option<String>,
    /// A single port (`"8080"`) or a range (`"1000-2000"`).
    #[serde(deserialize_with = "string_or_number")]
    pub port: String,
    pub protocol: String,
}

impl Port {
    /// Create a port rule in a zone.
    pub fn with_zone(port: &str, protocol: &str, zone: &str) -> Self {
        Self {
            name: None,
            ensure: Ensure::Present,
            zone: Some(zone.to_string()),
            policy: None,
            port: port.to_string(),
            protocol: protocol.to_string(),
        }
    }

    pub fn title(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.canonical())
    }

    pub fn scope(&self, id: &str) -> Result<Scope> {
        resolve_scope(id, &self.zone, &self.policy)
    }

    pub fn validate(&self, id: &str) -> Result<()> {
        self.scope(id)?;
        validate_one_of(id, "protocol", &self.protocol, PROTOCOLS)?;
        parse_port_range(&self.port).ok_or_else(|| {
            Error::validation(
                id,
                "port",
                format!("'{}' is not a port (1-65535) or a range like 1000-2000", self.port),
            )
        })?;
        Ok(())
    }

    /// Parse a list entry like `8080/tcp` into (port, protocol).
    pub fn parse_entry(entry: &str) -> Option<(String, String)> {
        let (port, protocol) = entry.split_once('/')?;
        if port.is_empty() || protocol.is_empty() {
            return None;
        }
        Some((port.to_string(), protocol.to_lowercase()))
    }
}

impl Canonical for Port {
    fn canonical(&self) -> String {
        format!("{}/{}", self.port, self.protocol)
    }
}

/// Parse `N` or `A-B` with `1 <= A <= B <= 65535`.
fn parse_port_range(s: &str) -> Option<(u16, u16)> {
    let (start, end) = match s.split_once('-') {
        Some((a, b)) => (a.parse::<u16>().ok()?, b.parse::<u16>().ok()?),
        None => {
            let p = s.parse::<u16>().ok()?;
            (p, p)
        }
    };
    if start == 0 || start > end {
        return None;
    }
    Some((start, end))
}
