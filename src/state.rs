// Firewalld Converge - State Readers
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Read current firewall state from the permanent and runtime planes.
//!
//! Readers never fail: a query that errors or exits non-zero reads as an
//! empty set, `false` or `None`.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::firewall::{FirewallCmd, Plane, Scope};
use crate::models::{normalize_target, DirectKind};

/// Parsed `--info-ipset` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpsetInfo {
    pub set_type: String,
    pub options: BTreeMap<String, String>,
}

/// Typed read access over the command adapter.
pub struct StateReader<'a> {
    fw: &'a FirewallCmd,
}

impl<'a> StateReader<'a> {
    pub fn new(fw: &'a FirewallCmd) -> Self {
        Self { fw }
    }

    fn read(&self, args: &[String], scope: Option<&Scope>, plane: Plane) -> Option<String> {
        let output = self.fw.query(args, scope, plane);
        if output.success() {
            Some(output.stdout)
        } else {
            debug!(
                "Read `{}` returned {:?}",
                self.fw.render(args, scope, plane),
                output.status
            );
            None
        }
    }

    fn words(&self, args: &[String], scope: Option<&Scope>, plane: Plane) -> BTreeSet<String> {
        self.read(args, scope, plane)
            .map(|out| split_words(&out))
            .unwrap_or_default()
    }

    fn lines(&self, args: &[String], scope: Option<&Scope>, plane: Plane) -> BTreeSet<String> {
        self.read(args, scope, plane)
            .map(|out| split_lines(&out))
            .unwrap_or_default()
    }

    fn scalar(&self, args: &[String], scope: Option<&Scope>, plane: Plane) -> Option<String> {
        self.read(args, scope, plane)
            .map(|out| out.trim_end_matches('\n').to_string())
    }

    // Scoped collections

    pub fn services(&self, scope: &Scope, plane: Plane) -> BTreeSet<String> {
        self.words(&args(&["--list-services"]), Some(scope), plane)
    }

    pub fn ports(&self, scope: &Scope, plane: Plane) -> BTreeSet<String> {
        self.words(&args(&["--list-ports"]), Some(scope), plane)
    }

    pub fn rich_rules(&self, scope: &Scope, plane: Plane) -> BTreeSet<String> {
        self.lines(&args(&["--list-rich-rules"]), Some(scope), plane)
    }

    pub fn interfaces(&self, scope: &Scope, plane: Plane) -> BTreeSet<String> {
        self.words(&args(&["--list-interfaces"]), Some(scope), plane)
    }

    pub fn sources(&self, scope: &Scope, plane: Plane) -> BTreeSet<String> {
        self.words(&args(&["--list-sources"]), Some(scope), plane)
    }

    pub fn icmp_blocks(&self, scope: &Scope, plane: Plane) -> BTreeSet<String> {
        self.words(&args(&["--list-icmp-blocks"]), Some(scope), plane)
    }

    pub fn ingress_zones(&self, scope: &Scope, plane: Plane) -> BTreeSet<String> {
        self.words(&args(&["--list-ingress-zones"]), Some(scope), plane)
    }

    pub fn egress_zones(&self, scope: &Scope, plane: Plane) -> BTreeSet<String> {
        self.words(&args(&["--list-egress-zones"]), Some(scope), plane)
    }

    // Global collections

    pub fn zones(&self, plane: Plane) -> BTreeSet<String> {
        self.words(&args(&["--get-zones"]), None, plane)
    }

    pub fn policies(&self, plane: Plane) -> BTreeSet<String> {
        self.words(&args(&["--get-policies"]), None, plane)
    }

    pub fn ipsets(&self, plane: Plane) -> BTreeSet<String> {
        self.words(&args(&["--get-ipsets"]), None, plane)
    }

    /// Every service definition the daemon knows, built-in or custom.
    pub fn service_definitions(&self, plane: Plane) -> BTreeSet<String> {
        self.words(&args(&["--get-services"]), None, plane)
    }

    pub fn icmp_types(&self) -> BTreeSet<String> {
        self.words(&args(&["--get-icmptypes"]), None, Plane::Permanent)
    }

    pub fn direct(&self, kind: DirectKind, plane: Plane) -> BTreeSet<String> {
        self.lines(&["--direct".to_string(), kind.list_flag()], None, plane)
    }

    pub fn ipset_entries(&self, name: &str, plane: Plane) -> BTreeSet<String> {
        let argv = vec![format!("--ipset={}", name), "--get-entries".to_string()];
        self.lines(&argv, None, plane)
    }

    // Scalars

    /// Target with `%%` delimiters stripped.
    pub fn target(&self, scope: &Scope, plane: Plane) -> Option<String> {
        self.scalar(&args(&["--get-target"]), Some(scope), plane)
            .map(|t| normalize_target(&t))
    }

    pub fn description(&self, scope: &Scope) -> Option<String> {
        self.scalar(&args(&["--get-description"]), Some(scope), Plane::Permanent)
    }

    pub fn short(&self, scope: &Scope) -> Option<String> {
        self.scalar(&args(&["--get-short"]), Some(scope), Plane::Permanent)
    }

    pub fn priority(&self, scope: &Scope) -> Option<i32> {
        self.scalar(&args(&["--get-priority"]), Some(scope), Plane::Permanent)
            .and_then(|p| p.trim().parse().ok())
    }

    /// True only when the daemon answers literally `yes`.
    pub fn masquerade(&self, scope: &Scope, plane: Plane) -> bool {
        let output = self.fw.query(&["--query-masquerade"], Some(scope), plane);
        output.stdout.trim() == "yes"
    }

    pub fn ipset_info(&self, name: &str) -> Option<IpsetInfo> {
        self.read(&[format!("--info-ipset={}", name)], None, Plane::Permanent)
            .map(|out| parse_ipset_info(&out))
    }

    // Service definitions

    fn service_scalar(&self, name: &str, flag: &str) -> Option<String> {
        self.scalar(&[format!("--service={}", name), flag.to_string()], None, Plane::Permanent)
    }

    pub fn service_description(&self, name: &str) -> Option<String> {
        self.service_scalar(name, "--get-description")
    }

    pub fn service_short(&self, name: &str) -> Option<String> {
        self.service_scalar(name, "--get-short")
    }

    pub fn service_ports(&self, name: &str) -> BTreeSet<String> {
        let argv = vec![format!("--service={}", name), "--get-ports".to_string()];
        self.words(&argv, None, Plane::Permanent)
    }

    pub fn service_protocols(&self, name: &str) -> BTreeSet<String> {
        let argv = vec![format!("--service={}", name), "--get-protocols".to_string()];
        self.words(&argv, None, Plane::Permanent)
    }

    // Existence queries

    /// Existence decided by exit status (rich rules, ports, services).
    pub fn query_status(&self, args: &[String], scope: Option<&Scope>, plane: Plane) -> bool {
        self.fw.query(args, scope, plane).success()
    }

    /// Existence decided by `yes` in stdout (direct interface).
    pub fn query_yes(&self, args: &[String], scope: Option<&Scope>, plane: Plane) -> bool {
        self.fw.query(args, scope, plane).stdout.trim() == "yes"
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// Whitespace-delimited list output.
pub fn split_words(output: &str) -> BTreeSet<String> {
    output.split_whitespace().map(str::to_string).collect()
}

/// Newline-delimited list output; blank lines are dropped.
pub fn split_lines(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the `type:` and `options:` lines of `--info-ipset`.
pub fn parse_ipset_info(output: &str) -> IpsetInfo {
    let mut info = IpsetInfo::default();
    for line in output.lines().map(str::trim) {
        if let Some(set_type) = line.strip_prefix("type:") {
            info.set_type = set_type.trim().to_string();
        } else if let Some(options) = line.strip_prefix("options:") {
            for option in options.split_whitespace() {
                match option.split_once('=') {
                    Some((key, value)) => info.options.insert(key.to_string(), value.to_string()),
                    None => info.options.insert(option.to_string(), String::new()),
                };
            }
        }
    }
    info
}
