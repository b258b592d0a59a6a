// Firewalld Converge - Zone Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Zone definitions.

use serde::Deserialize;

use super::{one_or_many, validate_one_of, validate_word, Ensure};
use crate::error::Result;
use crate::firewall::Scope;

/// Targets a zone may carry, compared without `%%` delimiters.
pub const ZONE_TARGETS: &[&str] = &["default", "ACCEPT", "DROP", "REJECT"];

/// A firewalld zone and the properties this tool manages on it.
///
/// Optional properties that are not declared are left untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Zone {
    pub name: String,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub interfaces: Option<Vec<String>>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub masquerade: Option<bool>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub icmp_blocks: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short: Option<String>,
    #[serde(default)]
    pub purge_rich_rules: bool,
    #[serde(default)]
    pub purge_services: bool,
    #[serde(default)]
    pub purge_ports: bool,
}

impl Zone {
    /// A zone with only a name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ensure: Ensure::Present,
            target: None,
            interfaces: None,
            sources: None,
            masquerade: None,
            icmp_blocks: None,
            description: None,
            short: None,
            purge_rich_rules: false,
            purge_services: false,
            purge_ports: false,
        }
    }

    pub fn scope(&self) -> Scope {
        Scope::Zone(self.name.clone())
    }

    pub fn validate(&self, id: &str) -> Result<()> {
        validate_word(id, "name", &self.name)?;
        if let Some(target) = &self.target {
            validate_one_of(id, "target", &normalize_target(target), ZONE_TARGETS)?;
        }
        for interface in self.interfaces.iter().flatten() {
            validate_word(id, "interfaces", interface)?;
        }
        for source in self.sources.iter().flatten() {
            validate_word(id, "sources", source)?;
        }
        for block in self.icmp_blocks.iter().flatten() {
            validate_word(id, "icmp_blocks", block)?;
        }
        Ok(())
    }
}

/// Strip `%` delimiters; firewalld reports `%%REJECT%%` as `REJECT` on
/// some versions and verbatim on others.
pub fn normalize_target(target: &str) -> String {
    target.trim().replace('%', "")
}
