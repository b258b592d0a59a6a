// Firewalld Converge - Direct Interface Models
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Direct rules, chains and passthroughs.
//!
//! These are handed to the packet filter largely unvalidated. Their identity
//! is the space-joined argument tuple as `--direct --get-all-*` prints it.

use std::fmt;

use serde::Deserialize;

use super::{one_or_many, validate_one_of, validate_word, Canonical, Ensure};
use crate::error::{Error, Result};

pub const INET_PROTOCOLS: &[&str] = &["ipv4", "ipv6", "eb"];

fn default_inet() -> String { "ipv4".to_string() }
fn default_purge() -> bool { true }

/// Split packet-filter arguments on spaces, keeping single-quoted runs
/// (quotes included) as one token.
pub fn parse_args(args: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in args.chars() {
        match c {
            '\'' => {
                current.push(c);
                quoted = !quoted;
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn joined_args(args: &Option<Vec<String>>) -> Vec<String> {
    args.as_ref()
        .map(|parts| parse_args(&parts.join(" ")))
        .unwrap_or_default()
}

/// Which direct-interface object a command or purge addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectKind {
    Rule,
    Chain,
    Passthrough,
}

impl DirectKind {
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Chain => "chain",
            Self::Passthrough => "passthrough",
        }
    }

    pub fn list_flag(&self) -> String {
        format!("--get-all-{}s", self.noun())
    }

    pub fn query_flag(&self) -> String {
        format!("--query-{}", self.noun())
    }

    pub fn add_flag(&self) -> String {
        format!("--add-{}", self.noun())
    }

    pub fn remove_flag(&self) -> String {
        format!("--remove-{}", self.noun())
    }
}

impl fmt::Display for DirectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

/// A rule in a table chain: `<inet> <table> <chain> <priority> <args...>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default = "default_inet")]
    pub inet_protocol: String,
    pub table: String,
    pub chain: String,
    pub priority: i32,
    #[serde(default, deserialize_with = "one_or_many")]
    pub args: Option<Vec<String>>,
}

impl DirectRule {
    pub fn title(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.canonical())
    }

    pub fn validate(&self, id: &str) -> Result<()> {
        validate_one_of(id, "inet_protocol", &self.inet_protocol, INET_PROTOCOLS)?;
        validate_word(id, "table", &self.table)?;
        validate_word(id, "chain", &self.chain)?;
        if joined_args(&self.args).is_empty() {
            return Err(Error::validation(id, "args", "must not be empty"));
        }
        Ok(())
    }

    /// The argument tuple passed after `--add-rule` and friends.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = vec![
            self.inet_protocol.clone(),
            self.table.clone(),
            self.chain.clone(),
            self.priority.to_string(),
        ];
        tokens.extend(joined_args(&self.args));
        tokens
    }
}

impl Canonical for DirectRule {
    fn canonical(&self) -> String {
        self.tokens().join(" ")
    }
}

/// A custom chain: `<inet> <table> <chain>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectChain {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default = "default_inet")]
    pub inet_protocol: String,
    pub table: String,
    pub custom_chain: String,
}

impl DirectChain {
    pub fn title(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.canonical())
    }

    pub fn validate(&self, id: &str) -> Result<()> {
        validate_one_of(id, "inet_protocol", &self.inet_protocol, INET_PROTOCOLS)?;
        validate_word(id, "table", &self.table)?;
        validate_word(id, "custom_chain", &self.custom_chain)
    }

    pub fn tokens(&self) -> Vec<String> {
        vec![
            self.inet_protocol.clone(),
            self.table.clone(),
            self.custom_chain.clone(),
        ]
    }
}

impl Canonical for DirectChain {
    fn canonical(&self) -> String {
        self.tokens().join(" ")
    }
}

/// Raw packet-filter arguments: `<inet> <args...>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectPassthrough {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default = "default_inet")]
    pub inet_protocol: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub args: Option<Vec<String>>,
}

impl DirectPassthrough {
    pub fn title(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.canonical())
    }

    pub fn validate(&self, id: &str) -> Result<()> {
        validate_one_of(id, "inet_protocol", &self.inet_protocol, INET_PROTOCOLS)?;
        if joined_args(&self.args).is_empty() {
            return Err(Error::validation(id, "args", "must not be empty"));
        }
        Ok(())
    }

    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = vec![self.inet_protocol.clone()];
        tokens.extend(joined_args(&self.args));
        tokens
    }
}

impl Canonical for DirectPassthrough {
    fn canonical(&self) -> String {
        self.tokens().join(" ")
    }
}

/// Remove every direct object of `target` kind that is not declared.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectPurge {
    pub target: DirectKind,
    #[serde(default = "default_purge")]
    pub purge: bool,
}
