// Firewalld Converge - Policy Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Inter-zone policy definitions (firewalld 0.9.0 and later).

use serde::Deserialize;

use super::{normalize_target, one_or_many, validate_one_of, validate_word, Ensure};
use crate::error::{Error, Result};
use crate::firewall::Scope;

/// Targets a policy may carry, compared without `%%` delimiters.
pub const POLICY_TARGETS: &[&str] = &["CONTINUE", "ACCEPT", "DROP", "REJECT"];

/// Zones that stand for "any zone" or "the host" and cannot be mixed.
pub const SYMBOLIC_ZONES: &[&str] = &["ANY", "HOST"];

/// Longest name firewalld accepts for a policy.
pub const MAX_NAME_LEN: usize = 17;

fn default_priority() -> i32 { -1 }

/// A firewalld policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Policy {
    pub name: String,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub ingress_zones: Vec<String>,
    #[serde(default)]
    pub egress_zones: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
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

impl Policy {
    /// A policy from `ingress` to `egress` with default properties.
    pub fn between(name: &str, ingress: &[&str], egress: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            ensure: Ensure::Present,
            target: None,
            ingress_zones: ingress.iter().map(|z| z.to_string()).collect(),
            egress_zones: egress.iter().map(|z| z.to_string()).collect(),
            priority: default_priority(),
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
        Scope::Policy(self.name.clone())
    }

    pub fn validate(&self, id: &str) -> Result<()> {
        validate_word(id, "name", &self.name)?;
        if self.name.len() > MAX_NAME_LEN {
            return Err(Error::validation(
                id,
                "name",
                format!("policy name must be at most {} characters long", MAX_NAME_LEN),
            ));
        }
        if let Some(target) = &self.target {
            validate_one_of(id, "target", &normalize_target(target), POLICY_TARGETS)?;
        }
        if self.priority == 0 {
            return Err(Error::validation(id, "priority", "priority must be a non zero integer"));
        }
        if !(-32768..=32767).contains(&self.priority) {
            return Err(Error::validation(id, "priority", "priority must be between -32768 and 32767"));
        }
        if self.ensure == Ensure::Present {
            validate_zone_list(id, "ingress_zones", &self.ingress_zones)?;
            validate_zone_list(id, "egress_zones", &self.egress_zones)?;
        }
        for block in self.icmp_blocks.iter().flatten() {
            validate_word(id, "icmp_blocks", block)?;
        }
        Ok(())
    }
}

fn validate_zone_list(id: &str, field: &str, zones: &[String]) -> Result<()> {
    if zones.is_empty() {
        return Err(Error::validation(id, field, "must contain at least one zone"));
    }
    for zone in zones {
        validate_word(id, field, zone)?;
    }
    if zones.len() > 1 && zones.iter().any(|z| SYMBOLIC_ZONES.contains(&z.as_str())) {
        return Err(Error::validation(
            id,
            field,
            "must contain a single symbolic zone or one or more regular zones",
        ));
    }
    Ok(())
}
