// Firewalld Converge - Service Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! A service enabled in a zone or policy.

use serde::Deserialize;

use super::{resolve_scope, validate_word, Canonical, Ensure};
use crate::error::{Error, Result};
use crate::firewall::Scope;

/// A service assignment. `service` defaults to `name`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub policy: Option<String>,
}

impl Service {
    /// Create a service assignment in a zone.
    pub fn with_zone(service: &str, zone: &str) -> Self {
        Self {
            name: None,
            service: Some(service.to_string()),
            ensure: Ensure::Present,
            zone: Some(zone.to_string()),
            policy: None,
        }
    }

    /// The firewalld service name.
    pub fn service_name(&self) -> &str {
        self.service
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    pub fn title(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.service_name().to_string())
    }

    pub fn scope(&self, id: &str) -> Result<Scope> {
        resolve_scope(id, &self.zone, &self.policy)
    }

    pub fn validate(&self, id: &str) -> Result<()> {
        self.scope(id)?;
        if self.service.is_none() && self.name.is_none() {
            return Err(Error::validation(id, "service", "one of service or name must be supplied"));
        }
        validate_word(id, "service", self.service_name())
    }
}

impl Canonical for Service {
    fn canonical(&self) -> String {
        self.service_name().to_string()
    }
}
