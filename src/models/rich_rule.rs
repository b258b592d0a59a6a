// Firewalld Converge - Rich Rule Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Rich rules and their canonical string form.
//!
//! firewalld identifies a rich rule only by its text, so [`RichRule::canonical`]
//! must produce exactly what `--list-rich-rules` prints for the same rule.

use serde::Deserialize;

use super::port::PROTOCOLS;
use super::{resolve_scope, string_or_number, validate_one_of, Canonical, Ensure};
use crate::error::{Error, Result};
use crate::firewall::Scope;

pub const FAMILIES: &[&str] = &["ipv4", "ipv6", "eb"];
pub const ACTIONS: &[&str] = &["accept", "reject", "drop", "mark"];
pub const LOG_LEVELS: &[&str] = &[
    "emerg", "alert", "crit", "error", "warning", "notice", "info", "debug",
];

fn default_family() -> String { "ipv4".to_string() }

/// A source or destination match.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Plain(String),
    Detailed {
        #[serde(default)]
        address: Option<String>,
        #[serde(default)]
        ipset: Option<String>,
        #[serde(default)]
        invert: bool,
    },
}

impl Address {
    fn validate(&self, id: &str, field: &str) -> Result<()> {
        match self {
            Self::Plain(address) if address.is_empty() => {
                Err(Error::validation(id, field, "address must not be empty"))
            }
            Self::Plain(_) => Ok(()),
            Self::Detailed { address: Some(_), ipset: Some(_), .. } => Err(Error::validation(
                id,
                field,
                "only one of address or ipset may be specified",
            )),
            Self::Detailed { address: None, ipset: None, .. } => {
                Err(Error::validation(id, field, "one of address or ipset must be specified"))
            }
            Self::Detailed { .. } => Ok(()),
        }
    }

    fn encode(&self, keyword: &str, out: &mut Vec<String>) {
        match self {
            Self::Plain(address) => {
                out.push(keyword.to_string());
                out.push(keyval("address", address));
            }
            Self::Detailed { address, ipset, invert } => {
                if *invert {
                    out.push(format!("{} NOT", keyword));
                } else {
                    out.push(keyword.to_string());
                }
                if let Some(address) = address {
                    out.push(keyval("address", address));
                }
                if let Some(ipset) = ipset {
                    out.push(keyval("ipset", ipset));
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PortProtocol {
    #[serde(deserialize_with = "string_or_number")]
    pub port: String,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForwardPort {
    #[serde(deserialize_with = "string_or_number")]
    pub port: String,
    pub protocol: String,
    #[serde(default)]
    pub to_port: Option<String>,
    #[serde(default)]
    pub to_addr: Option<String>,
}

/// `true` logs with firewalld defaults; a map sets prefix, level and limit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Log {
    Enabled(bool),
    Detailed {
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        level: Option<String>,
        #[serde(default)]
        limit: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Audit {
    Enabled(bool),
    Detailed {
        #[serde(default)]
        limit: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypedAction {
    pub action: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// `accept`, or `{ "action": "reject", "type": "icmp-host-prohibited" }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Simple(String),
    Typed(TypedAction),
}

impl Action {
    fn verb(&self) -> &str {
        match self {
            Self::Simple(action) => action,
            Self::Typed(typed) => &typed.action,
        }
    }
}

/// A rich rule in a zone or policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RichRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default = "default_family")]
    pub family: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub source: Option<Address>,
    #[serde(default)]
    pub dest: Option<Address>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub port: Option<PortProtocol>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub icmp_block: Option<String>,
    #[serde(default)]
    pub icmp_type: Option<String>,
    #[serde(default)]
    pub masquerade: Option<bool>,
    #[serde(default)]
    pub forward_port: Option<ForwardPort>,
    #[serde(default)]
    pub log: Option<Log>,
    #[serde(default)]
    pub audit: Option<Audit>,
    #[serde(default)]
    pub action: Option<Action>,
    /// Verbatim rule text; overrides every structured field.
    #[serde(default)]
    pub raw_rule: Option<String>,
}

impl RichRule {
    /// An empty ipv4 rule in `zone`.
    pub fn in_zone(zone: &str) -> Self {
        Self {
            name: None,
            ensure: Ensure::Present,
            zone: Some(zone.to_string()),
            policy: None,
            family: default_family(),
            priority: None,
            source: None,
            dest: None,
            service: None,
            port: None,
            protocol: None,
            icmp_block: None,
            icmp_type: None,
            masquerade: None,
            forward_port: None,
            log: None,
            audit: None,
            action: None,
            raw_rule: None,
        }
    }

    pub fn title(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.canonical())
    }

    pub fn scope(&self, id: &str) -> Result<Scope> {
        resolve_scope(id, &self.zone, &self.policy)
    }

    fn element_count(&self) -> usize {
        [
            self.service.is_some(),
            self.port.is_some(),
            self.protocol.is_some(),
            self.icmp_block.is_some(),
            self.icmp_type.is_some(),
            self.masquerade.unwrap_or(false),
            self.forward_port.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    pub fn validate(&self, id: &str) -> Result<()> {
        self.scope(id)?;
        if let Some(raw) = &self.raw_rule {
            if raw.trim().is_empty() {
                return Err(Error::validation(id, "raw_rule", "must not be empty"));
            }
            return Ok(());
        }

        validate_one_of(id, "family", &self.family, FAMILIES)?;
        if let Some(priority) = self.priority {
            if !(-32768..=32767).contains(&priority) {
                return Err(Error::validation(id, "priority", "priority must be between -32768 and 32767"));
            }
        }
        if let Some(source) = &self.source {
            source.validate(id, "source")?;
        }
        if let Some(dest) = &self.dest {
            dest.validate(id, "dest")?;
        }
        if self.element_count() > 1 {
            return Err(Error::validation(
                id,
                "element",
                "only one element (service, port, protocol, icmp_block, icmp_type, masquerade, forward_port) may be specified",
            ));
        }
        if let Some(port) = &self.port {
            validate_one_of(id, "port.protocol", &port.protocol, PROTOCOLS)?;
        }
        if let Some(forward) = &self.forward_port {
            validate_one_of(id, "forward_port.protocol", &forward.protocol, PROTOCOLS)?;
        }
        if let Some(Log::Detailed { level: Some(level), .. }) = &self.log {
            validate_one_of(id, "log.level", level, LOG_LEVELS)?;
        }
        if let Some(action) = &self.action {
            validate_one_of(id, "action", action.verb(), ACTIONS)?;
        }
        Ok(())
    }

    fn encode_element(&self, out: &mut Vec<String>) {
        if let Some(service) = &self.service {
            out.push("service".into());
            out.push(keyval("name", service));
        } else if let Some(port) = &self.port {
            out.push("port".into());
            out.push(keyval("port", &port.port));
            out.push(keyval("protocol", &port.protocol));
        } else if let Some(protocol) = &self.protocol {
            out.push("protocol".into());
            out.push(keyval("value", protocol));
        } else if let Some(block) = &self.icmp_block {
            out.push("icmp-block".into());
            out.push(keyval("name", block));
        } else if let Some(icmp_type) = &self.icmp_type {
            out.push("icmp-type".into());
            out.push(keyval("name", icmp_type));
        } else if self.masquerade.unwrap_or(false) {
            out.push("masquerade".into());
        } else if let Some(forward) = &self.forward_port {
            out.push("forward-port".into());
            out.push(keyval("port", &forward.port));
            out.push(keyval("protocol", &forward.protocol));
            if let Some(to_port) = &forward.to_port {
                out.push(keyval("to-port", to_port));
            }
            if let Some(to_addr) = &forward.to_addr {
                out.push(keyval("to-addr", to_addr));
            }
        }
    }
}

impl Canonical for RichRule {
    fn canonical(&self) -> String {
        if let Some(raw) = &self.raw_rule {
            return raw.clone();
        }

        let mut out = vec!["rule".to_string(), keyval("family", &self.family)];
        if let Some(priority) = self.priority {
            out.push(keyval("priority", &priority.to_string()));
        }
        if let Some(source) = &self.source {
            source.encode("source", &mut out);
        }
        if let Some(dest) = &self.dest {
            dest.encode("destination", &mut out);
        }
        self.encode_element(&mut out);

        match &self.log {
            Some(Log::Enabled(true)) => out.push("log".into()),
            Some(Log::Detailed { prefix, level, limit }) => {
                out.push("log".into());
                if let Some(prefix) = prefix {
                    out.push(keyval("prefix", prefix));
                }
                if let Some(level) = level {
                    out.push(keyval("level", level));
                }
                if let Some(limit) = limit {
                    out.push(keyval("limit value", limit));
                }
            }
            _ => {}
        }
        match &self.audit {
            Some(Audit::Enabled(true)) => out.push("audit".into()),
            Some(Audit::Detailed { limit }) => {
                out.push("audit".into());
                if let Some(limit) = limit {
                    out.push(keyval("limit value", limit));
                }
            }
            _ => {}
        }
        match &self.action {
            Some(Action::Simple(action)) => out.push(action.clone()),
            Some(Action::Typed(typed)) => {
                out.push(typed.action.clone());
                out.push(keyval("type", &typed.kind));
            }
            None => {}
        }

        out.join(" ")
    }
}

fn keyval(key: &str, value: &str) -> String {
    format!("{}=\"{}\"", key, value)
}
