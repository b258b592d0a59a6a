// Firewalld Converge - Manifest
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Loading of the desired-state document.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Resource;

/// Declared resources, converged in the order they appear.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Manifest {
    /// Read and parse a JSON manifest.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let manifest = Self::parse(&content)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))?;
        debug!(
            "Loaded {} resources from {}",
            manifest.resources.len(),
            path.display()
        );
        Ok(manifest)
    }

    pub fn parse(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Validate every resource. All failures are reported together and no
    /// firewalld command has to run for this.
    pub fn validate(&self) -> Result<()> {
        let failures = self
            .resources
            .iter()
            .filter_map(|resource| resource.validate().err())
            .collect();
        Error::from_failures(failures)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
