// Firewalld Converge - Changeset
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Mutating commands issued (or planned) for one resource.

use tracing::info;

use crate::error::{Error, Result};
use crate::firewall::{FirewallCmd, Plane, Scope};

/// Records every mutating command for a resource and runs it unless this is
/// a dry run.
pub struct Changeset<'a> {
    fw: &'a FirewallCmd,
    dry_run: bool,
    commands: Vec<String>,
    needs_reload: bool,
}

impl<'a> Changeset<'a> {
    pub fn new(fw: &'a FirewallCmd, dry_run: bool) -> Self {
        Self {
            fw,
            dry_run,
            commands: Vec::new(),
            needs_reload: false,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Issue one mutating command against the permanent plane.
    pub fn run<A: AsRef<str>>(&mut self, args: &[A], scope: Option<&Scope>) -> Result<()> {
        let line = self.fw.render(args, scope, Plane::Permanent);
        self.commands.push(line.clone());
        self.needs_reload = true;

        if self.dry_run {
            info!("Would run: {}", line);
            return Ok(());
        }
        self.fw.mutate(args, scope).map(|_| ())
    }

    /// Issue every command, then report all failures together.
    pub fn run_all(&mut self, batch: Vec<Vec<String>>, scope: Option<&Scope>) -> Result<()> {
        let mut failures = Vec::new();
        for args in batch {
            if let Err(e) = self.run(&args, scope) {
                failures.push(e);
            }
        }
        Error::from_failures(failures)
    }

    /// The planes disagree and only a reload can fix it.
    pub fn mark_drift(&mut self) {
        self.needs_reload = true;
    }

    pub fn changed(&self) -> bool {
        self.needs_reload
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<String> {
        self.commands
    }
}
