// Firewalld Converge - Reconciler
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Per-kind convergence of declared resources.

use std::cell::OnceCell;
use std::collections::BTreeSet;

use semver::Version;
use tracing::{debug, info, warn};

use super::diff::{string_set, Diff};
use super::presence::{ExistencePolicy, PlaneState};
use super::purge::{purge, PurgeTarget};
use super::Changeset;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::firewall::{FirewallCmd, Plane, Scope, POLICY_MIN_VERSION};
use crate::models::{
    normalize_target, Canonical, CustomService, DirectKind, DirectPurge, Ensure, Ipset, Policy,
    Resource, Zone,
};
use crate::report::{DriftNote, Outcome, Report, ResourceReport};
use crate::state::{IpsetInfo, StateReader};

/// How a membership query answers.
#[derive(Debug, Clone, Copy)]
enum QueryStyle {
    /// Exit status 0 means present.
    ExitStatus,
    /// Stdout `yes` means present.
    Yes,
}

/// A single item whose presence is tracked per plane.
struct Member {
    scope: Option<Scope>,
    query: Vec<String>,
    add: Vec<String>,
    remove: Vec<String>,
    style: QueryStyle,
}

impl Member {
    fn scoped(scope: Scope, noun: &str, remove_flag: &str, item: String) -> Self {
        Self {
            scope: Some(scope),
            query: vec![format!("--query-{}", noun), item.clone()],
            add: vec![format!("--add-{}", noun), item.clone()],
            remove: vec![remove_flag.to_string(), item],
            style: QueryStyle::ExitStatus,
        }
    }

    fn direct(kind: DirectKind, tokens: Vec<String>) -> Self {
        let with = |flag: String| {
            let mut args = vec!["--direct".to_string(), flag];
            args.extend(tokens.iter().cloned());
            args
        };
        Self {
            scope: None,
            query: with(kind.query_flag()),
            add: with(kind.add_flag()),
            remove: with(kind.remove_flag()),
            style: QueryStyle::Yes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    AddFirst,
    /// Needed where a symbolic value cannot coexist with regular ones.
    RemoveFirst,
}

/// Canonical strings declared in one zone or policy.
#[derive(Debug, Default)]
struct Declared {
    rich_rules: BTreeSet<String>,
    services: BTreeSet<String>,
    ports: BTreeSet<String>,
}

impl Declared {
    fn for_scope(manifest: &[Resource], scope: &Scope) -> Self {
        let mut declared = Self::default();
        for resource in manifest {
            let id = resource.id();
            match resource {
                Resource::RichRule(rule) if rule.scope(&id).ok().as_ref() == Some(scope) => {
                    declared.rich_rules.insert(rule.canonical());
                }
                Resource::Service(service) if service.scope(&id).ok().as_ref() == Some(scope) => {
                    declared.services.insert(service.canonical());
                }
                Resource::Port(port) if port.scope(&id).ok().as_ref() == Some(scope) => {
                    declared.ports.insert(port.canonical());
                }
                _ => {}
            }
        }
        declared
    }
}

/// Converges resources one at a time, in declaration order.
pub struct Reconciler<'a> {
    fw: &'a FirewallCmd,
    dry_run: bool,
    reload_after_change: bool,
    version: OnceCell<Option<Version>>,
}

impl<'a> Reconciler<'a> {
    pub fn new(fw: &'a FirewallCmd, settings: &Settings) -> Self {
        Self {
            fw,
            dry_run: settings.dry_run,
            reload_after_change: settings.reload_after_change,
            version: OnceCell::new(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Converge every resource. A failing resource does not stop the pass;
    /// all failures come back together after the report is complete.
    pub fn apply(&self, resources: &[Resource]) -> (Report, Result<()>) {
        let availability = self.fw.availability();
        let mut report = Report::new(availability, self.dry_run);
        let mut failures = Vec::new();

        for resource in resources {
            let id = resource.id();
            if !availability.is_known() {
                warn!("Deferring {}: firewalld availability unknown", id);
                report.resources.push(ResourceReport::new(id, Outcome::Deferred));
                continue;
            }

            debug!("Converging {}", id);
            let mut changes = Changeset::new(self.fw, self.dry_run);
            let result = self.converge(resource, resources, &mut changes);
            let changed = changes.changed();
            let result = result.and_then(|()| {
                if changed {
                    self.reload(&id, &mut report.drift)
                } else {
                    Ok(())
                }
            });

            let outcome = if changed { Outcome::Changed } else { Outcome::InSync };
            let mut entry = ResourceReport::new(id.as_str(), outcome);
            entry.commands = changes.into_commands();
            if let Err(e) = result {
                warn!("Failed to converge {}: {}", id, e);
                entry.outcome = Outcome::Failed;
                entry.error = Some(e.to_string());
                failures.push(e);
            }
            report.resources.push(entry);
        }

        (report, Error::from_failures(failures))
    }

    fn reload(&self, id: &str, drift: &mut Vec<DriftNote>) -> Result<()> {
        if self.dry_run || !self.reload_after_change {
            return Ok(());
        }
        if !self.fw.reload()? {
            let message = format!(
                "runtime plane not reloaded, firewalld is {}",
                self.fw.availability().label()
            );
            warn!("{}: {}", id, message);
            drift.push(DriftNote {
                resource: id.to_string(),
                message,
            });
        }
        Ok(())
    }

    /// Converge one resource, recording commands in `changes`. `manifest`
    /// supplies the declared siblings purges must keep.
    pub fn converge(
        &self,
        resource: &Resource,
        manifest: &[Resource],
        changes: &mut Changeset<'_>,
    ) -> Result<()> {
        let id = resource.id();
        match resource {
            Resource::Zone(zone) => self.converge_zone(&id, zone, manifest, changes),
            Resource::Policy(policy) => {
                self.require_policy_support()?;
                self.converge_policy(&id, policy, manifest, changes)
            }
            Resource::Service(service) => {
                let scope = self.scope_checked(service.scope(&id)?)?;
                let remove_flag = match scope {
                    Scope::Zone(_) => self.fw.remove_service_flag(),
                    Scope::Policy(_) => "--remove-service",
                };
                let member = Member::scoped(scope, "service", remove_flag, service.canonical());
                self.converge_member(service.ensure, &member, changes)
            }
            Resource::Port(port) => {
                let scope = self.scope_checked(port.scope(&id)?)?;
                let member = Member::scoped(scope, "port", "--remove-port", port.canonical());
                self.converge_member(port.ensure, &member, changes)
            }
            Resource::RichRule(rule) => {
                let scope = self.scope_checked(rule.scope(&id)?)?;
                let member = Member::scoped(scope, "rich-rule", "--remove-rich-rule", rule.canonical());
                self.converge_member(rule.ensure, &member, changes)
            }
            Resource::DirectRule(rule) => {
                let member = Member::direct(DirectKind::Rule, rule.tokens());
                self.converge_member(rule.ensure, &member, changes)
            }
            Resource::DirectChain(chain) => {
                let member = Member::direct(DirectKind::Chain, chain.tokens());
                self.converge_member(chain.ensure, &member, changes)
            }
            Resource::DirectPassthrough(passthrough) => {
                let member = Member::direct(DirectKind::Passthrough, passthrough.tokens());
                self.converge_member(passthrough.ensure, &member, changes)
            }
            Resource::DirectPurge(direct_purge) => {
                self.converge_direct_purge(direct_purge, manifest, changes)
            }
            Resource::Ipset(ipset) => self.converge_ipset(ipset, changes),
            Resource::CustomService(service) => self.converge_custom_service(service, changes),
        }
    }

    fn require_policy_support(&self) -> Result<()> {
        let Some(found) = self.version.get_or_init(|| self.fw.version()) else {
            debug!("firewalld version unknown, assuming policy support");
            return Ok(());
        };
        let Ok(required) = Version::parse(POLICY_MIN_VERSION) else {
            return Ok(());
        };
        if *found < required {
            return Err(Error::Unsupported {
                feature: "policies".to_string(),
                required: POLICY_MIN_VERSION.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    fn scope_checked(&self, scope: Scope) -> Result<Scope> {
        if scope.is_policy() {
            self.require_policy_support()?;
        }
        Ok(scope)
    }

    // Singleton membership

    fn converge_member(&self, ensure: Ensure, member: &Member, changes: &mut Changeset<'_>) -> Result<()> {
        let reader = StateReader::new(self.fw);
        let scope = member.scope.as_ref();
        let present_in = |plane| match member.style {
            QueryStyle::ExitStatus => reader.query_status(&member.query, scope, plane),
            QueryStyle::Yes => reader.query_yes(&member.query, scope, plane),
        };
        let state = PlaneState::from_planes(present_in(Plane::Permanent), present_in(Plane::Runtime));

        if ExistencePolicy::PlaneAgreement.converged(state, ensure) {
            debug!("{:?} already satisfied ({:?})", ensure, state);
            return Ok(());
        }

        match ensure {
            Ensure::Present if !state.in_permanent() => changes.run(&member.add, scope),
            Ensure::Absent if state.in_permanent() => changes.run(&member.remove, scope),
            _ => {
                debug!("Planes disagree ({:?}), reload required", state);
                changes.mark_drift();
                Ok(())
            }
        }
    }

    // Object definitions

    fn converge_zone(
        &self,
        id: &str,
        zone: &Zone,
        manifest: &[Resource],
        changes: &mut Changeset<'_>,
    ) -> Result<()> {
        let reader = StateReader::new(self.fw);
        let scope = zone.scope();
        let state = object_state(|plane| reader.zones(plane), &zone.name);
        let exists = state.in_permanent();

        if zone.ensure == Ensure::Absent {
            if !ExistencePolicy::PermanentOnly.converged(state, Ensure::Absent) {
                info!("Deleting zone {}", zone.name);
                changes.run(&["--delete-zone", zone.name.as_str()], None)?;
            }
            return Ok(());
        }

        self.check_icmp_blocks(id, zone.icmp_blocks.as_deref())?;
        if !ExistencePolicy::PermanentOnly.converged(state, Ensure::Present) {
            info!("Creating zone {}", zone.name);
            changes.run(&["--new-zone", zone.name.as_str()], None)?;
        }

        self.converge_target(&scope, zone.target.as_deref(), changes)?;
        self.converge_masquerade(&scope, zone.masquerade, changes)?;
        self.converge_text(&scope, "description", zone.description.as_deref(), changes)?;
        self.converge_text(&scope, "short", zone.short.as_deref(), changes)?;

        let mut failures = Vec::new();
        if let Some(interfaces) = &zone.interfaces {
            let diff = Diff::between(
                &string_set(interfaces.iter().map(String::as_str)),
                &reader.interfaces(&scope, Plane::Permanent),
            );
            collect(&mut failures, sync_collection(changes, Some(&scope), &diff, Order::AddFirst, "interface"));
        }
        if let Some(sources) = &zone.sources {
            let diff = Diff::between(
                &string_set(sources.iter().map(String::as_str)),
                &reader.sources(&scope, Plane::Permanent),
            );
            collect(&mut failures, sync_collection(changes, Some(&scope), &diff, Order::AddFirst, "source"));
        }
        collect(&mut failures, self.converge_icmp_blocks(&scope, zone.icmp_blocks.as_deref(), changes));

        if exists {
            let flags = [zone.purge_rich_rules, zone.purge_services, zone.purge_ports];
            collect(&mut failures, self.purge_scope(&scope, flags, manifest, changes));
        }
        Error::from_failures(failures)
    }

    fn converge_policy(
        &self,
        id: &str,
        policy: &Policy,
        manifest: &[Resource],
        changes: &mut Changeset<'_>,
    ) -> Result<()> {
        let reader = StateReader::new(self.fw);
        let scope = policy.scope();
        let state = object_state(|plane| reader.policies(plane), &policy.name);
        let exists = state.in_permanent();

        if policy.ensure == Ensure::Absent {
            if !ExistencePolicy::PermanentOnly.converged(state, Ensure::Absent) {
                info!("Deleting policy {}", policy.name);
                changes.run(&["--delete-policy", policy.name.as_str()], None)?;
            }
            return Ok(());
        }

        self.check_icmp_blocks(id, policy.icmp_blocks.as_deref())?;
        if !ExistencePolicy::PermanentOnly.converged(state, Ensure::Present) {
            info!("Creating policy {}", policy.name);
            changes.run(&["--new-policy", policy.name.as_str()], None)?;
        }

        self.converge_target(&scope, policy.target.as_deref(), changes)?;

        let mut failures = Vec::new();
        let ingress = Diff::between(
            &string_set(policy.ingress_zones.iter().map(String::as_str)),
            &reader.ingress_zones(&scope, Plane::Permanent),
        );
        collect(&mut failures, sync_collection(changes, Some(&scope), &ingress, Order::RemoveFirst, "ingress-zone"));
        let egress = Diff::between(
            &string_set(policy.egress_zones.iter().map(String::as_str)),
            &reader.egress_zones(&scope, Plane::Permanent),
        );
        collect(&mut failures, sync_collection(changes, Some(&scope), &egress, Order::RemoveFirst, "egress-zone"));
        Error::from_failures(std::mem::take(&mut failures))?;

        if reader.priority(&scope) != Some(policy.priority) {
            let priority = policy.priority.to_string();
            changes.run(&["--set-priority", priority.as_str()], Some(&scope))?;
        }
        self.converge_masquerade(&scope, policy.masquerade, changes)?;
        self.converge_text(&scope, "description", policy.description.as_deref(), changes)?;
        self.converge_text(&scope, "short", policy.short.as_deref(), changes)?;

        collect(&mut failures, self.converge_icmp_blocks(&scope, policy.icmp_blocks.as_deref(), changes));
        if exists {
            let flags = [policy.purge_rich_rules, policy.purge_services, policy.purge_ports];
            collect(&mut failures, self.purge_scope(&scope, flags, manifest, changes));
        }
        Error::from_failures(failures)
    }

    fn converge_ipset(&self, ipset: &Ipset, changes: &mut Changeset<'_>) -> Result<()> {
        let reader = StateReader::new(self.fw);
        let state = object_state(|plane| reader.ipsets(plane), &ipset.name);
        let delete = [format!("--delete-ipset={}", ipset.name)];

        if ipset.ensure == Ensure::Absent {
            if !ExistencePolicy::PermanentOnly.converged(state, Ensure::Absent) {
                info!("Deleting ipset {}", ipset.name);
                changes.run(&delete, None)?;
            }
            return Ok(());
        }

        if !ExistencePolicy::PermanentOnly.converged(state, Ensure::Present) {
            info!("Creating ipset {}", ipset.name);
            return create_ipset(ipset, changes);
        }

        if let Some(info) = reader.ipset_info(&ipset.name) {
            if needs_recreate(ipset, &info) {
                info!("Destroying and creating ipset {}", ipset.name);
                changes.run(&delete, None)?;
                return create_ipset(ipset, changes);
            }
        }

        if !ipset.manage_entries {
            debug!("Not managing entries for ipset {}", ipset.name);
            return Ok(());
        }
        let diff = Diff::between(
            &string_set(ipset.entries.iter().map(String::as_str)),
            &reader.ipset_entries(&ipset.name, Plane::Permanent),
        );
        changes.run_all(ipset_entry_batch(&ipset.name, &diff), None)
    }

    fn converge_custom_service(&self, service: &CustomService, changes: &mut Changeset<'_>) -> Result<()> {
        let reader = StateReader::new(self.fw);
        let name = service.name.as_str();
        let state = object_state(|plane| reader.service_definitions(plane), name);

        if service.ensure == Ensure::Absent {
            if !ExistencePolicy::PermanentOnly.converged(state, Ensure::Absent) {
                info!("Deleting service definition {}", name);
                changes.run(&["--delete-service", name], None)?;
            }
            return Ok(());
        }

        if !ExistencePolicy::PermanentOnly.converged(state, Ensure::Present) {
            info!("Creating service definition {}", name);
            changes.run(&["--new-service", name], None)?;
        }

        let selector = format!("--service={}", name);
        if let Some(description) = service.description.as_deref() {
            if reader.service_description(name).as_deref() != Some(description) {
                changes.run(&[selector.as_str(), "--set-description", description], None)?;
            }
        }
        if let Some(short) = service.short.as_deref() {
            if reader.service_short(name).as_deref() != Some(short) {
                changes.run(&[selector.as_str(), "--set-short", short], None)?;
            }
        }

        let mut failures = Vec::new();
        if let Some(ports) = &service.ports {
            let diff = Diff::between(&string_set(ports.iter().map(String::as_str)), &reader.service_ports(name));
            collect(&mut failures, changes.run_all(selector_batch(&selector, &diff, "port"), None));
        }
        if let Some(protocols) = &service.protocols {
            let diff = Diff::between(&string_set(protocols.iter().map(String::as_str)), &reader.service_protocols(name));
            collect(&mut failures, changes.run_all(selector_batch(&selector, &diff, "protocol"), None));
        }
        Error::from_failures(failures)
    }

    // Properties

    fn converge_target(&self, scope: &Scope, desired: Option<&str>, changes: &mut Changeset<'_>) -> Result<()> {
        let Some(desired) = desired else {
            return Ok(());
        };
        let current = StateReader::new(self.fw).target(scope, Plane::Permanent);
        if current.as_deref() == Some(normalize_target(desired).as_str()) {
            return Ok(());
        }
        debug!("Target of {} is {:?}, want {}", scope, current, desired);
        changes.run(&["--set-target", desired], Some(scope))
    }

    fn converge_masquerade(&self, scope: &Scope, desired: Option<bool>, changes: &mut Changeset<'_>) -> Result<()> {
        let Some(desired) = desired else {
            return Ok(());
        };
        if StateReader::new(self.fw).masquerade(scope, Plane::Permanent) == desired {
            return Ok(());
        }
        let flag = if desired { "--add-masquerade" } else { "--remove-masquerade" };
        changes.run(&[flag], Some(scope))
    }

    fn converge_text(
        &self,
        scope: &Scope,
        property: &str,
        desired: Option<&str>,
        changes: &mut Changeset<'_>,
    ) -> Result<()> {
        let Some(desired) = desired else {
            return Ok(());
        };
        let reader = StateReader::new(self.fw);
        let current = match property {
            "short" => reader.short(scope),
            _ => reader.description(scope),
        };
        if current.as_deref() == Some(desired) {
            return Ok(());
        }
        let flag = format!("--set-{}", property);
        changes.run(&[flag.as_str(), desired], Some(scope))
    }

    /// Declared icmp blocks must be types the daemon knows. Checked before
    /// anything on the object is changed.
    fn check_icmp_blocks(&self, id: &str, desired: Option<&[String]>) -> Result<()> {
        let Some(desired) = desired else {
            return Ok(());
        };
        let known = StateReader::new(self.fw).icmp_types();
        if known.is_empty() {
            return Ok(());
        }
        match desired.iter().find(|block| !known.contains(*block)) {
            Some(unknown) => {
                let valid: Vec<&str> = known.iter().map(String::as_str).collect();
                Err(Error::validation(
                    id,
                    "icmp_blocks",
                    format!(
                        "{} is not a valid icmp type on this system, valid types are: {}",
                        unknown,
                        valid.join(", ")
                    ),
                ))
            }
            None => Ok(()),
        }
    }

    fn converge_icmp_blocks(
        &self,
        scope: &Scope,
        desired: Option<&[String]>,
        changes: &mut Changeset<'_>,
    ) -> Result<()> {
        let Some(desired) = desired else {
            return Ok(());
        };
        let diff = Diff::between(
            &string_set(desired.iter().map(String::as_str)),
            &StateReader::new(self.fw).icmp_blocks(scope, Plane::Permanent),
        );
        sync_collection(changes, Some(scope), &diff, Order::RemoveFirst, "icmp-block")
    }

    // Purges

    fn run_purge(
        &self,
        changes: &mut Changeset<'_>,
        target: &PurgeTarget,
        declared: &BTreeSet<String>,
    ) -> Result<()> {
        let outcome = purge(self.fw, changes, target, declared)?;
        if !outcome.removed.is_empty() {
            info!("Purged from {}: {}", target, outcome.removed.join(", "));
        }
        Ok(())
    }

    fn purge_scope(
        &self,
        scope: &Scope,
        [rich_rules, services, ports]: [bool; 3],
        manifest: &[Resource],
        changes: &mut Changeset<'_>,
    ) -> Result<()> {
        let declared = Declared::for_scope(manifest, scope);
        let mut failures = Vec::new();
        if rich_rules {
            let target = PurgeTarget::RichRules(scope.clone());
            collect(&mut failures, self.run_purge(changes, &target, &declared.rich_rules));
        }
        if services {
            let target = PurgeTarget::Services(scope.clone());
            collect(&mut failures, self.run_purge(changes, &target, &declared.services));
        }
        if ports {
            let target = PurgeTarget::Ports(scope.clone());
            collect(&mut failures, self.run_purge(changes, &target, &declared.ports));
        }
        Error::from_failures(failures)
    }

    fn converge_direct_purge(
        &self,
        direct_purge: &DirectPurge,
        manifest: &[Resource],
        changes: &mut Changeset<'_>,
    ) -> Result<()> {
        if !direct_purge.purge {
            debug!("Purging of direct {}s disabled", direct_purge.target);
            return Ok(());
        }
        let declared: BTreeSet<String> = manifest
            .iter()
            .filter_map(|resource| match (direct_purge.target, resource) {
                (DirectKind::Rule, Resource::DirectRule(rule)) => Some(rule.canonical()),
                (DirectKind::Chain, Resource::DirectChain(chain)) => Some(chain.canonical()),
                (DirectKind::Passthrough, Resource::DirectPassthrough(p)) => Some(p.canonical()),
                _ => None,
            })
            .collect();
        self.run_purge(changes, &PurgeTarget::Direct(direct_purge.target), &declared)
    }
}

/// Presence of a named object in both planes. Runtime is read for logging
/// only; these objects reach it through a reload.
fn object_state(list: impl Fn(Plane) -> BTreeSet<String>, name: &str) -> PlaneState {
    let state = PlaneState::from_planes(list(Plane::Permanent).contains(name), list(Plane::Runtime).contains(name));
    if state.is_drifted() {
        debug!("'{}' is {:?}", name, state);
    }
    state
}

fn collect(failures: &mut Vec<Error>, result: Result<()>) {
    if let Err(e) = result {
        failures.push(e);
    }
}

/// One `--add-<noun>` / `--remove-<noun>` command per differing element.
fn sync_collection(
    changes: &mut Changeset<'_>,
    scope: Option<&Scope>,
    diff: &Diff,
    order: Order,
    noun: &str,
) -> Result<()> {
    let adds = diff
        .to_add
        .iter()
        .map(|item| vec![format!("--add-{}", noun), item.clone()]);
    let removes = diff
        .to_remove
        .iter()
        .map(|item| vec![format!("--remove-{}", noun), item.clone()]);
    let batch: Vec<Vec<String>> = match order {
        Order::AddFirst => adds.chain(removes).collect(),
        Order::RemoveFirst => removes.chain(adds).collect(),
    };
    changes.run_all(batch, scope)
}

/// Commands on a service definition, removals first.
fn selector_batch(selector: &str, diff: &Diff, noun: &str) -> Vec<Vec<String>> {
    let removes = diff
        .to_remove
        .iter()
        .map(|item| vec![selector.to_string(), format!("--remove-{}", noun), item.clone()]);
    let adds = diff
        .to_add
        .iter()
        .map(|item| vec![selector.to_string(), format!("--add-{}", noun), item.clone()]);
    removes.chain(adds).collect()
}

fn ipset_entry_batch(name: &str, diff: &Diff) -> Vec<Vec<String>> {
    let selector = format!("--ipset={}", name);
    let removes = diff
        .to_remove
        .iter()
        .map(|entry| vec![selector.clone(), format!("--remove-entry={}", entry)]);
    let adds = diff
        .to_add
        .iter()
        .map(|entry| vec![selector.clone(), format!("--add-entry={}", entry)]);
    removes.chain(adds).collect()
}

fn create_ipset(ipset: &Ipset, changes: &mut Changeset<'_>) -> Result<()> {
    changes.run(&ipset.create_args(), None)?;
    if ipset.manage_entries && !ipset.entries.is_empty() {
        let diff = Diff::between(
            &string_set(ipset.entries.iter().map(String::as_str)),
            &BTreeSet::new(),
        );
        changes.run_all(ipset_entry_batch(&ipset.name, &diff), None)?;
    }
    Ok(())
}

/// Type or a declared option differs from what the daemon reports.
fn needs_recreate(ipset: &Ipset, info: &IpsetInfo) -> bool {
    if info.set_type != ipset.set_type {
        return true;
    }
    ipset
        .desired_options()
        .iter()
        .any(|(key, value)| info.options.get(key) != Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firewall::testing::FakeRunner;
    use crate::firewall::{CommandOutput, DaemonAvailability};
    use crate::models::{Port, RichRule, Service};
    use pretty_assertions::assert_eq;

    fn fw(availability: DaemonAvailability) -> (FirewallCmd, FakeRunner) {
        let runner = FakeRunner::new();
        let fw = FirewallCmd::new(Box::new(runner.clone()), &Settings::default(), availability);
        (fw, runner)
    }

    fn resources(json: &str) -> Vec<Resource> {
        serde_json::from_str(json).unwrap()
    }

    const SSH_RULE: &str =
        r#"rule family="ipv4" source address="10.0.1.2/24" service name="ssh" log level="debug" accept"#;

    fn ssh_rule() -> Resource {
        let rule: RichRule = serde_json::from_str(
            r#"{
                "zone": "restricted",
                "source": { "address": "10.0.1.2/24" },
                "service": "ssh",
                "log": { "level": "debug" },
                "action": "accept"
            }"#,
        )
        .unwrap();
        Resource::RichRule(rule)
    }

    #[test]
    fn test_rich_rule_absent_everywhere_adds_once_and_reloads() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        let manifest = vec![ssh_rule()];

        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();

        assert_eq!(
            runner.mutations(),
            vec![
                format!("firewall-cmd --permanent --zone restricted --add-rich-rule '{}'", SSH_RULE),
                "firewall-cmd --reload".to_string(),
            ]
        );
        assert_eq!(report.resources[0].outcome, Outcome::Changed);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        let query = format!("--zone restricted --query-rich-rule '{}'", SSH_RULE);
        runner.yes(&format!("firewall-cmd --permanent {}", query));
        runner.yes(&format!("firewall-cmd {}", query));

        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&[ssh_rule()]);
        result.unwrap();

        assert!(runner.mutations().is_empty());
        assert_eq!(report.resources[0].outcome, Outcome::InSync);
    }

    #[test]
    fn test_port_permanent_only_reloads_without_add() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.yes("firewall-cmd --permanent --zone public --query-port 8080/tcp");
        let manifest = vec![Resource::Port(Port::with_zone("8080", "tcp", "public"))];

        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();

        assert_eq!(runner.mutations(), vec!["firewall-cmd --reload"]);
        assert_eq!(report.resources[0].outcome, Outcome::Changed);
        assert!(report.resources[0].commands.is_empty());
    }

    #[test]
    fn test_absent_removes_only_from_permanent() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.yes("firewall-cmd --permanent --zone public --query-service telnet");
        runner.yes("firewall-cmd --zone public --query-service telnet");
        let mut service = Service::with_zone("telnet", "public");
        service.ensure = Ensure::Absent;

        let (_, result) = Reconciler::new(&fw, &Settings::default()).apply(&[Resource::Service(service)]);
        result.unwrap();

        assert_eq!(
            runner.mutations(),
            vec![
                "firewall-cmd --permanent --zone public --remove-service telnet",
                "firewall-cmd --reload",
            ]
        );
    }

    #[test]
    fn test_offline_changes_note_drift_instead_of_reloading() {
        let (fw, runner) = fw(DaemonAvailability::Offline);
        let manifest = vec![Resource::Port(Port::with_zone("8080", "tcp", "public"))];

        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();

        assert_eq!(
            runner.mutations(),
            vec!["firewall-offline-cmd --zone public --add-port 8080/tcp"]
        );
        assert_eq!(report.drift.len(), 1);
        assert!(report.drift[0].message.contains("not running"));
    }

    #[test]
    fn test_unknown_availability_defers_everything() {
        let (fw, runner) = fw(DaemonAvailability::Unknown);
        let manifest = vec![ssh_rule(), Resource::Port(Port::with_zone("22", "tcp", "public"))];

        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();

        assert!(runner.calls().is_empty());
        assert!(report.resources.iter().all(|r| r.outcome == Outcome::Deferred));
    }

    #[test]
    fn test_dry_run_plans_without_mutating() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        let (report, result) = Reconciler::new(&fw, &Settings::default())
            .with_dry_run(true)
            .apply(&[ssh_rule()]);
        result.unwrap();

        assert!(runner.mutations().is_empty());
        assert_eq!(report.resources[0].outcome, Outcome::Changed);
        assert_eq!(report.resources[0].commands.len(), 1);
        assert!(report.dry_run);
    }

    #[test]
    fn test_failed_resource_does_not_stop_pass() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.fail(
            "firewall-cmd --permanent --zone public --add-service nope",
            "Error: INVALID_SERVICE: nope",
        );
        let manifest = vec![
            Resource::Service(Service::with_zone("nope", "public")),
            Resource::Port(Port::with_zone("443", "tcp", "public")),
        ];

        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);

        assert!(matches!(result, Err(Error::ExecutionFailure { .. })));
        assert_eq!(report.resources[0].outcome, Outcome::Failed);
        assert_eq!(report.resources[1].outcome, Outcome::Changed);
        assert!(runner
            .mutations()
            .contains(&"firewall-cmd --permanent --zone public --add-port 443/tcp".to_string()));
    }

    #[test]
    fn test_direct_rule_exists_by_yes() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        let tuple = "ipv4 filter INPUT 0 -p tcp --dport=22 -j ACCEPT";
        runner.yes(&format!("firewall-cmd --permanent --direct --query-rule {}", tuple));
        runner.yes(&format!("firewall-cmd --direct --query-rule {}", tuple));
        let manifest = resources(
            r#"[{ "kind": "direct_rule", "table": "filter", "chain": "INPUT", "priority": 0, "args": "-p tcp --dport=22 -j ACCEPT" }]"#,
        );

        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();
        assert_eq!(report.resources[0].outcome, Outcome::InSync);
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_direct_purge_keeps_declared() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        let listing = "ipv4 filter INPUT 0 -j A\nipv4 filter INPUT 0 -j B\nipv4 filter INPUT 0 -j C\n";
        runner.stdout("firewall-cmd --permanent --direct --get-all-rules", listing);
        runner.stdout("firewall-cmd --direct --get-all-rules", listing);
        for tuple in ["ipv4 filter INPUT 0 -j A", "ipv4 filter INPUT 0 -j B"] {
            runner.yes(&format!("firewall-cmd --permanent --direct --query-rule {}", tuple));
            runner.yes(&format!("firewall-cmd --direct --query-rule {}", tuple));
        }
        let manifest = resources(
            r#"[
                { "kind": "direct_rule", "table": "filter", "chain": "INPUT", "priority": 0, "args": "-j A" },
                { "kind": "direct_rule", "table": "filter", "chain": "INPUT", "priority": 0, "args": "-j B" },
                { "kind": "direct_purge", "target": "rule" }
            ]"#,
        );

        let (_, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();

        assert_eq!(
            runner.mutations(),
            vec![
                "firewall-cmd --permanent --direct --remove-rule ipv4 filter INPUT 0 -j C",
                "firewall-cmd --reload",
            ]
        );
    }

    #[test]
    fn test_zone_created_with_properties() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.stdout("firewall-cmd --permanent --get-zones", "public trusted\n");
        runner.stdout("firewall-cmd --permanent --zone restricted --get-target", "default\n");
        let manifest = resources(
            r#"[{ "kind": "zone", "name": "restricted", "target": "%%REJECT%%", "sources": ["10.0.0.0/8"] }]"#,
        );

        let (_, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();

        assert_eq!(
            runner.mutations(),
            vec![
                "firewall-cmd --permanent --new-zone restricted",
                "firewall-cmd --permanent --zone restricted --set-target %%REJECT%%",
                "firewall-cmd --permanent --zone restricted --add-source 10.0.0.0/8",
                "firewall-cmd --reload",
            ]
        );
    }

    #[test]
    fn test_zone_in_sync_when_target_matches_without_delimiters() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.stdout("firewall-cmd --permanent --get-zones", "restricted\n");
        runner.stdout("firewall-cmd --permanent --zone restricted --get-target", "REJECT\n");
        runner.stdout("firewall-cmd --permanent --zone restricted --list-interfaces", "eth1\n");
        let manifest = resources(
            r#"[{ "kind": "zone", "name": "restricted", "target": "%%REJECT%%", "interfaces": ["eth1"] }]"#,
        );

        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();
        assert_eq!(report.resources[0].outcome, Outcome::InSync);
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_zone_purges_undeclared_services() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.stdout("firewall-cmd --permanent --get-zones", "public\n");
        runner.stdout("firewall-cmd --permanent --zone public --list-services", "ssh cockpit\n");
        runner.stdout("firewall-cmd --zone public --list-services", "ssh cockpit\n");
        runner.yes("firewall-cmd --permanent --zone public --query-service ssh");
        runner.yes("firewall-cmd --zone public --query-service ssh");
        let manifest = resources(
            r#"[
                { "kind": "zone", "name": "public", "purge_services": true },
                { "kind": "service", "zone": "public", "service": "ssh" }
            ]"#,
        );

        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();

        assert_eq!(
            runner.mutations(),
            vec![
                "firewall-cmd --permanent --zone public --remove-service cockpit",
                "firewall-cmd --reload",
            ]
        );
        assert_eq!(report.resources[1].outcome, Outcome::InSync);
    }

    #[test]
    fn test_zone_icmp_block_must_be_known_type() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.stdout("firewall-cmd --permanent --get-zones", "public\n");
        runner.stdout("firewall-cmd --permanent --get-icmptypes", "echo-request echo-reply\n");
        let manifest = resources(r#"[{ "kind": "zone", "name": "public", "icmp_blocks": "bogus" }]"#);

        let (_, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        let err = result.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("echo-reply, echo-request"));
    }

    #[test]
    fn test_unknown_icmp_block_leaves_new_zone_untouched() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.stdout("firewall-cmd --permanent --get-zones", "public\n");
        runner.stdout("firewall-cmd --permanent --get-icmptypes", "echo-request echo-reply\n");
        let manifest = resources(
            r#"[{
                "kind": "zone",
                "name": "restricted",
                "target": "DROP",
                "sources": ["10.0.0.0/8"],
                "icmp_blocks": "bogus"
            }]"#,
        );

        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);

        assert!(result.unwrap_err().is_validation());
        assert!(runner.mutations().is_empty());
        assert!(report.resources[0].commands.is_empty());
        assert_eq!(report.resources[0].outcome, Outcome::Failed);
    }

    #[test]
    fn test_runtime_only_present_is_persisted() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.yes("firewall-cmd --zone public --query-service https");

        let manifest = vec![Resource::Service(Service::with_zone("https", "public"))];
        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();

        assert_eq!(
            runner.mutations(),
            vec![
                "firewall-cmd --permanent --zone public --add-service https",
                "firewall-cmd --reload",
            ]
        );
        assert_eq!(report.resources[0].outcome, Outcome::Changed);
    }

    #[test]
    fn test_runtime_only_absent_is_left_to_reload() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.yes("firewall-cmd --zone public --query-port 9999/udp");
        let mut port = Port::with_zone("9999", "udp", "public");
        port.ensure = Ensure::Absent;

        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&[Resource::Port(port)]);
        result.unwrap();

        assert_eq!(runner.mutations(), vec!["firewall-cmd --reload"]);
        assert!(report.resources[0].commands.is_empty());
        assert_eq!(report.resources[0].outcome, Outcome::Changed);
    }

    #[test]
    fn test_policy_zone_lists_remove_before_add() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.stdout("firewall-cmd --version", "1.2.0\n");
        runner.stdout("firewall-cmd --permanent --get-policies", "anytorestricted\n");
        runner.stdout("firewall-cmd --permanent --policy anytorestricted --list-ingress-zones", "ANY\n");
        runner.stdout("firewall-cmd --permanent --policy anytorestricted --list-egress-zones", "restricted\n");
        runner.stdout("firewall-cmd --permanent --policy anytorestricted --get-priority", "-1\n");
        let manifest = resources(
            r#"[{ "kind": "policy", "name": "anytorestricted", "ingress_zones": ["public"], "egress_zones": ["restricted"] }]"#,
        );

        let (_, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();

        assert_eq!(
            runner.mutations(),
            vec![
                "firewall-cmd --permanent --policy anytorestricted --remove-ingress-zone ANY",
                "firewall-cmd --permanent --policy anytorestricted --add-ingress-zone public",
                "firewall-cmd --reload",
            ]
        );
    }

    #[test]
    fn test_policy_requires_recent_firewalld() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.stdout("firewall-cmd --version", "0.8.2\n");
        let manifest = resources(
            r#"[{ "kind": "port", "policy": "anytorestricted", "port": 22, "protocol": "tcp" }]"#,
        );

        let (report, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        assert!(matches!(result, Err(Error::Unsupported { .. })));
        assert_eq!(report.resources[0].outcome, Outcome::Failed);
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_ipset_recreated_when_type_differs() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.stdout("firewall-cmd --permanent --get-ipsets", "blocklist\n");
        runner.respond(
            "firewall-cmd --permanent --info-ipset=blocklist",
            CommandOutput::new("blocklist\n  type: hash:ip\n  options: \n  entries: \n", 0),
        );
        let manifest = resources(
            r#"[{ "kind": "ipset", "name": "blocklist", "type": "hash:net", "entries": ["10.0.0.0/8"] }]"#,
        );

        let (_, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();

        assert_eq!(
            runner.mutations(),
            vec![
                "firewall-cmd --permanent --delete-ipset=blocklist",
                "firewall-cmd --permanent --new-ipset=blocklist --type=hash:net",
                "firewall-cmd --permanent --ipset=blocklist --add-entry=10.0.0.0/8",
                "firewall-cmd --reload",
            ]
        );
    }

    #[test]
    fn test_ipset_entries_diffed_on_permanent_plane() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.stdout("firewall-cmd --permanent --get-ipsets", "white\n");
        runner.stdout(
            "firewall-cmd --permanent --info-ipset=white",
            "white\n  type: hash:ip\n  options: family=inet\n",
        );
        runner.stdout("firewall-cmd --permanent --ipset=white --get-entries", "1.1.1.1\n2.2.2.2\n");
        let manifest = resources(
            r#"[{ "kind": "ipset", "name": "white", "family": "inet", "entries": ["2.2.2.2", "3.3.3.3"] }]"#,
        );

        let (_, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();

        assert_eq!(
            runner.mutations(),
            vec![
                "firewall-cmd --permanent --ipset=white --remove-entry=1.1.1.1",
                "firewall-cmd --permanent --ipset=white --add-entry=3.3.3.3",
                "firewall-cmd --reload",
            ]
        );
    }

    #[test]
    fn test_custom_service_created() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        runner.stdout("firewall-cmd --permanent --get-services", "ssh http\n");
        let manifest = resources(r#"[{ "kind": "custom_service", "name": "myapp", "ports": ["8080/tcp"] }]"#);

        let (_, result) = Reconciler::new(&fw, &Settings::default()).apply(&manifest);
        result.unwrap();

        assert_eq!(
            runner.mutations(),
            vec![
                "firewall-cmd --permanent --new-service myapp",
                "firewall-cmd --permanent --service=myapp --add-port 8080/tcp",
                "firewall-cmd --reload",
            ]
        );
    }

    #[test]
    fn test_reload_disabled_by_settings() {
        let (fw, runner) = fw(DaemonAvailability::Online);
        let settings = Settings {
            reload_after_change: false,
            ..Settings::default()
        };
        let manifest = vec![Resource::Port(Port::with_zone("8080", "tcp", "public"))];

        let (report, result) = Reconciler::new(&fw, &settings).apply(&manifest);
        result.unwrap();

        assert_eq!(
            runner.mutations(),
            vec!["firewall-cmd --permanent --zone public --add-port 8080/tcp"]
        );
        assert!(report.drift.is_empty());
    }
}
