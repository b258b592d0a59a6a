// Firewalld Converge - Command Adapter
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! `firewall-cmd` command adapter.

use semver::Version;
use tracing::{debug, info, warn};

use super::runner::{display_command, CommandOutput, CommandRunner, SystemRunner};
use super::{DaemonAvailability, Plane, Scope};
use crate::config::Settings;
use crate::error::{Error, Result};

/// Executes firewall control commands against the permanent or runtime plane.
pub struct FirewallCmd {
    runner: Box<dyn CommandRunner>,
    online_cmd: String,
    offline_cmd: String,
    availability: DaemonAvailability,
}

impl FirewallCmd {
    /// Create an adapter with an already-known availability.
    pub fn new(
        runner: Box<dyn CommandRunner>,
        settings: &Settings,
        availability: DaemonAvailability,
    ) -> Self {
        Self {
            runner,
            online_cmd: settings.firewall_cmd.clone(),
            offline_cmd: settings.offline_cmd.clone(),
            availability,
        }
    }

    /// Create an adapter over the system runner and probe the daemon.
    pub fn connect(settings: &Settings) -> Self {
        let runner = SystemRunner::with_timeout(settings.command_timeout());
        Self::probed(Box::new(runner), settings)
    }

    /// Create an adapter over `runner` and probe the daemon.
    pub fn probed(runner: Box<dyn CommandRunner>, settings: &Settings) -> Self {
        info!("Connecting to firewalld...");
        let availability = DaemonAvailability::probe(runner.as_ref(), &settings.firewall_cmd);
        Self::new(runner, settings, availability)
    }

    pub fn availability(&self) -> DaemonAvailability {
        self.availability
    }

    fn is_offline(&self) -> bool {
        self.availability == DaemonAvailability::Offline
    }

    /// The binary commands are dispatched to.
    pub fn program(&self) -> &str {
        if self.is_offline() {
            &self.offline_cmd
        } else {
            &self.online_cmd
        }
    }

    /// Assemble `[--permanent] [--zone X | --policy X] args...`.
    ///
    /// The offline tool has a single plane, so `--permanent` is dropped when
    /// the daemon is offline.
    pub fn build_args<A: AsRef<str>>(
        &self,
        args: &[A],
        scope: Option<&Scope>,
        plane: Plane,
    ) -> Vec<String> {
        let mut argv = Vec::with_capacity(args.len() + 3);
        if plane == Plane::Permanent && !self.is_offline() {
            argv.push("--permanent".to_string());
        }
        if let Some(scope) = scope {
            argv.push(scope.flag().to_string());
            argv.push(scope.name().to_string());
        }
        argv.extend(args.iter().map(|a| a.as_ref().to_string()));
        argv
    }

    /// The full command line as it would be run.
    pub fn render<A: AsRef<str>>(&self, args: &[A], scope: Option<&Scope>, plane: Plane) -> String {
        display_command(self.program(), &self.build_args(args, scope, plane))
    }

    /// Run a command. With `fail_on_error`, a non-zero exit becomes
    /// [`Error::ExecutionFailure`]; otherwise the status is returned.
    pub fn execute<A: AsRef<str>>(
        &self,
        args: &[A],
        scope: Option<&Scope>,
        plane: Plane,
        fail_on_error: bool,
    ) -> Result<CommandOutput> {
        let program = self.program();
        let argv = self.build_args(args, scope, plane);
        let output = self.runner.run(program, &argv)?;

        if fail_on_error && !output.success() {
            return Err(Error::ExecutionFailure {
                command: display_command(program, &argv),
                status: output.status.unwrap_or(-1),
                output: output.diagnostic(),
            });
        }
        Ok(output)
    }

    /// Read-only command. Failures of any kind come back as an output the
    /// caller reads as empty or false.
    pub fn query<A: AsRef<str>>(&self, args: &[A], scope: Option<&Scope>, plane: Plane) -> CommandOutput {
        match self.execute(args, scope, plane, false) {
            Ok(output) => output,
            Err(e) => {
                warn!("Query `{}` failed: {}", self.render(args, scope, plane), e);
                CommandOutput::default()
            }
        }
    }

    /// State-changing command against the permanent plane.
    pub fn mutate<A: AsRef<str>>(&self, args: &[A], scope: Option<&Scope>) -> Result<CommandOutput> {
        info!("Applying: {}", self.render(args, scope, Plane::Permanent));
        self.execute(args, scope, Plane::Permanent, true)
    }

    /// Re-read persisted configuration into the runtime plane. Returns
    /// `false` without running anything unless the daemon is online.
    pub fn reload(&self) -> Result<bool> {
        if !self.availability.is_online() {
            debug!("Skipping reload, firewalld is {}", self.availability.label());
            return Ok(false);
        }
        self.execute(&["--reload"], None, Plane::Runtime, true)?;
        info!("Firewalld configuration reloaded");
        Ok(true)
    }

    /// Flag removing a service from a zone; the offline tool spells it differently.
    pub fn remove_service_flag(&self) -> &'static str {
        if self.is_offline() {
            "--remove-service-from-zone"
        } else {
            "--remove-service"
        }
    }

    /// Installed firewalld version, if it can be determined.
    pub fn version(&self) -> Option<Version> {
        let output = self.query(&["--version"], None, Plane::Runtime);
        if !output.success() {
            return None;
        }
        parse_version(&output.stdout)
    }
}

/// Parse `firewall-cmd --version` output, tolerating two-part versions.
pub(crate) fn parse_version(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() == 2 {
        return Version::parse(&format!("{}.0", raw)).ok();
    }
    None
}
