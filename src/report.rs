// Firewalld Converge - Pass Report
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Outcome of a convergence pass.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::firewall::DaemonAvailability;

/// What happened to one declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Already converged; nothing issued.
    InSync,
    /// Commands were issued (or planned, in a dry run).
    Changed,
    /// Daemon state could not be determined; nothing attempted.
    Deferred,
    Failed,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::InSync => "in sync",
            Self::Changed => "changed",
            Self::Deferred => "deferred",
            Self::Failed => "failed",
        }
    }
}

/// Plane drift that a reload would resolve but could not be run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftNote {
    pub resource: String,
    pub message: String,
}

/// Per-resource entry of a [`Report`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReport {
    pub id: String,
    pub outcome: Outcome,
    pub commands: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResourceReport {
    pub fn new(id: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            id: id.into(),
            outcome,
            commands: Vec::new(),
            error: None,
        }
    }
}

/// Result of converging a manifest.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub availability: DaemonAvailability,
    pub dry_run: bool,
    pub resources: Vec<ResourceReport>,
    pub drift: Vec<DriftNote>,
}

/// Counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub in_sync: usize,
    pub changed: usize,
    pub deferred: usize,
    pub failed: usize,
}

impl Report {
    pub fn new(availability: DaemonAvailability, dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            availability,
            dry_run,
            resources: Vec::new(),
            drift: Vec::new(),
        }
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for resource in &self.resources {
            match resource.outcome {
                Outcome::InSync => summary.in_sync += 1,
                Outcome::Changed => summary.changed += 1,
                Outcome::Deferred => summary.deferred += 1,
                Outcome::Failed => summary.failed += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.resources.iter().any(|r| r.outcome == Outcome::Failed)
    }

    pub fn changed(&self) -> bool {
        self.resources.iter().any(|r| r.outcome == Outcome::Changed)
    }

    /// Human-readable rendering for the terminal.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Pass at {} (firewalld {}{})",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.availability.label(),
            if self.dry_run { ", dry run" } else { "" }
        );

        for resource in &self.resources {
            let _ = writeln!(out, "  [{}] {}", resource.outcome.label(), resource.id);
            for command in &resource.commands {
                let _ = writeln!(out, "      {}", command);
            }
            if let Some(error) = &resource.error {
                let _ = writeln!(out, "      error: {}", error);
            }
        }

        for note in &self.drift {
            let _ = writeln!(out, "  drift: {}: {}", note.resource, note.message);
        }

        let s = self.summary();
        let _ = write!(
            out,
            "{} changed, {} in sync, {} deferred, {} failed",
            s.changed, s.in_sync, s.deferred, s.failed
        );
        out
    }
}
