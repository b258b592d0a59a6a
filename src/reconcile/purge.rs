// Firewalld Converge - Purge
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Remove everything of a kind that is not declared.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info};

use super::Changeset;
use crate::error::{Error, Result};
use crate::firewall::{FirewallCmd, Plane, Scope};
use crate::models::{parse_args, DirectKind};
use crate::state::StateReader;

/// What a purge enumerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeTarget {
    RichRules(Scope),
    Services(Scope),
    Ports(Scope),
    Direct(DirectKind),
}

impl PurgeTarget {
    fn scope(&self) -> Option<&Scope> {
        match self {
            Self::RichRules(scope) | Self::Services(scope) | Self::Ports(scope) => Some(scope),
            Self::Direct(_) => None,
        }
    }

    fn list(&self, reader: &StateReader<'_>, plane: Plane) -> BTreeSet<String> {
        match self {
            Self::RichRules(scope) => reader.rich_rules(scope, plane),
            Self::Services(scope) => reader.services(scope, plane),
            Self::Ports(scope) => reader.ports(scope, plane),
            Self::Direct(kind) => reader.direct(*kind, plane),
        }
    }

    fn remove_args(&self, fw: &FirewallCmd, item: &str) -> Vec<String> {
        match self {
            Self::RichRules(_) => vec!["--remove-rich-rule".into(), item.to_string()],
            Self::Services(Scope::Zone(_)) => vec![fw.remove_service_flag().into(), item.to_string()],
            Self::Services(Scope::Policy(_)) => vec!["--remove-service".into(), item.to_string()],
            Self::Ports(_) => vec!["--remove-port".into(), item.to_string()],
            Self::Direct(kind) => {
                let mut args = vec!["--direct".to_string(), kind.remove_flag()];
                args.extend(parse_args(item));
                args
            }
        }
    }
}

impl fmt::Display for PurgeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RichRules(scope) => write!(f, "rich rules of {}", scope),
            Self::Services(scope) => write!(f, "services of {}", scope),
            Self::Ports(scope) => write!(f, "ports of {}", scope),
            Self::Direct(kind) => write!(f, "direct {}s", kind),
        }
    }
}

/// Result of one purge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeOutcome {
    /// Leftovers a remove command was issued (or planned) for.
    pub removed: Vec<String>,
    /// Any undeclared item was found in either plane, so a reload is due.
    pub changed: bool,
}

/// Enumerate `target` in both planes, subtract `declared`, and remove the
/// remainder from the permanent plane. Runtime-only leftovers are left to
/// the reload.
pub fn purge(
    fw: &FirewallCmd,
    changes: &mut Changeset<'_>,
    target: &PurgeTarget,
    declared: &BTreeSet<String>,
) -> Result<PurgeOutcome> {
    let reader = StateReader::new(fw);
    let permanent = target.list(&reader, Plane::Permanent);
    let runtime = target.list(&reader, Plane::Runtime);

    let leftovers: BTreeSet<&String> = permanent
        .union(&runtime)
        .filter(|item| !declared.contains(*item))
        .collect();

    let mut outcome = PurgeOutcome {
        removed: Vec::new(),
        changed: !leftovers.is_empty(),
    };
    if !outcome.changed {
        debug!("Nothing to purge among {}", target);
        return Ok(outcome);
    }

    info!("Purging {} undeclared {}", leftovers.len(), target);
    changes.mark_drift();

    let mut failures = Vec::new();
    for item in leftovers {
        if !permanent.contains(item) {
            debug!("'{}' is runtime-only, leaving it to the reload", item);
            continue;
        }
        match changes.run(&target.remove_args(fw, item), target.scope()) {
            Ok(()) => outcome.removed.push(item.clone()),
            Err(e) => failures.push(e),
        }
    }

    Error::from_failures(failures)?;
    Ok(outcome)
}
