// Firewalld Converge - IP Set Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Named, typed address sets.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{validate_one_of, Ensure};
use crate::error::{Error, Result};

pub const IPSET_TYPES: &[&str] = &[
    "bitmap:ip",
    "bitmap:ip,mac",
    "bitmap:port",
    "hash:ip",
    "hash:ip,mark",
    "hash:ip,port",
    "hash:ip,port,ip",
    "hash:ip,port,net",
    "hash:mac",
    "hash:net",
    "hash:net,iface",
    "hash:net,net",
    "hash:net,port",
    "hash:net,port,net",
    "list:set",
];

pub const IPSET_FAMILIES: &[&str] = &["inet", "inet6"];

fn default_type() -> String { "hash:ip".to_string() }
fn default_manage_entries() -> bool { true }

/// An ipset definition. Type and options cannot be changed in place;
/// a mismatch means delete and recreate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ipset {
    pub name: String,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default = "default_type", rename = "type")]
    pub set_type: String,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub hashsize: Option<u64>,
    #[serde(default)]
    pub maxelem: Option<u64>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default)]
    pub entries: Vec<String>,
    #[serde(default = "default_manage_entries")]
    pub manage_entries: bool,
}

impl Ipset {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ensure: Ensure::Present,
            set_type: default_type(),
            family: None,
            hashsize: None,
            maxelem: None,
            timeout: None,
            options: BTreeMap::new(),
            entries: Vec::new(),
            manage_entries: default_manage_entries(),
        }
    }

    pub fn validate(&self, id: &str) -> Result<()> {
        if self.name.is_empty() || !self.name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(Error::validation(id, "name", "ipset name must be a word with no spaces"));
        }
        validate_one_of(id, "type", &self.set_type, IPSET_TYPES)?;
        if let Some(family) = &self.family {
            validate_one_of(id, "family", family, IPSET_FAMILIES)?;
        }
        for (field, value) in [
            ("hashsize", self.hashsize),
            ("maxelem", self.maxelem),
            ("timeout", self.timeout),
        ] {
            if value == Some(0) {
                return Err(Error::validation(id, field, "must be a positive integer"));
            }
        }
        for entry in &self.entries {
            if entry.trim().is_empty() {
                return Err(Error::validation(id, "entries", "entries must not be empty"));
            }
        }
        Ok(())
    }

    /// Declared creation options, dedicated fields taking precedence over
    /// the free-form map.
    pub fn desired_options(&self) -> BTreeMap<String, String> {
        let mut options = self.options.clone();
        if let Some(family) = &self.family {
            options.insert("family".into(), family.clone());
        }
        for (key, value) in [
            ("hashsize", self.hashsize),
            ("maxelem", self.maxelem),
            ("timeout", self.timeout),
        ] {
            if let Some(value) = value {
                options.insert(key.into(), value.to_string());
            }
        }
        options
    }

    /// Arguments for `--new-ipset`.
    pub fn create_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--new-ipset={}", self.name),
            format!("--type={}", self.set_type),
        ];
        args.extend(
            self.desired_options()
                .iter()
                .map(|(key, value)| format!("--option={}={}", key, value)),
        );
        args
    }
}
