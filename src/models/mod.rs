// Firewalld Converge - Models
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Declared firewall resources.

mod custom_service;
mod direct;
mod ipset;
mod policy;
mod port;
mod rich_rule;
mod service;
mod zone;

use serde::{Deserialize, Deserializer, Serialize};

pub use custom_service::CustomService;
pub use direct::{parse_args, DirectChain, DirectKind, DirectPassthrough, DirectPurge, DirectRule};
pub use ipset::Ipset;
pub use policy::Policy;
pub use port::Port;
pub use rich_rule::{Action, Address, Audit, ForwardPort, Log, PortProtocol, RichRule, TypedAction};
pub use service::Service;
pub use zone::{normalize_target, Zone};

use crate::error::{Error, Result};
use crate::firewall::Scope;

/// Desired terminal state of a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

/// The string form the daemon reports an item as. String equality on this
/// encoding is the only identity rules have.
pub trait Canonical {
    fn canonical(&self) -> String;
}

/// One declared resource, tagged by `kind` in the manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Zone(Zone),
    Policy(Policy),
    Service(Service),
    Port(Port),
    RichRule(RichRule),
    DirectRule(DirectRule),
    DirectChain(DirectChain),
    DirectPassthrough(DirectPassthrough),
    DirectPurge(DirectPurge),
    Ipset(Ipset),
    CustomService(CustomService),
}

impl Resource {
    /// Human-readable identifier used in logs and reports.
    pub fn id(&self) -> String {
        match self {
            Self::Zone(z) => format!("zone '{}'", z.name),
            Self::Policy(p) => format!("policy '{}'", p.name),
            Self::Service(s) => format!("service '{}'", s.title()),
            Self::Port(p) => format!("port '{}'", p.title()),
            Self::RichRule(r) => format!("rich_rule '{}'", r.title()),
            Self::DirectRule(r) => format!("direct_rule '{}'", r.title()),
            Self::DirectChain(c) => format!("direct_chain '{}'", c.title()),
            Self::DirectPassthrough(p) => format!("direct_passthrough '{}'", p.title()),
            Self::DirectPurge(p) => format!("direct_purge '{}'", p.target),
            Self::Ipset(i) => format!("ipset '{}'", i.name),
            Self::CustomService(s) => format!("custom_service '{}'", s.name),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let id = self.id();
        match self {
            Self::Zone(z) => z.validate(&id),
            Self::Policy(p) => p.validate(&id),
            Self::Service(s) => s.validate(&id),
            Self::Port(p) => p.validate(&id),
            Self::RichRule(r) => r.validate(&id),
            Self::DirectRule(r) => r.validate(&id),
            Self::DirectChain(c) => c.validate(&id),
            Self::DirectPassthrough(p) => p.validate(&id),
            Self::DirectPurge(_) => Ok(()),
            Self::Ipset(i) => i.validate(&id),
            Self::CustomService(s) => s.validate(&id),
        }
    }
}

/// Resolve the mutually exclusive `zone` / `policy` fields.
pub(crate) fn resolve_scope(id: &str, zone: &Option<String>, policy: &Option<String>) -> Result<Scope> {
    match (zone, policy) {
        (Some(_), Some(_)) => Err(Error::validation(
            id,
            "zone",
            "only one of the parameters zone and policy may be supplied",
        )),
        (None, None) => Err(Error::validation(
            id,
            "zone",
            "one of the parameters zone and policy must be supplied",
        )),
        (Some(zone), None) => Ok(Scope::Zone(zone.clone())),
        (None, Some(policy)) => Ok(Scope::Policy(policy.clone())),
    }
}

/// Reject empty names and names containing whitespace.
pub(crate) fn validate_word(id: &str, field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(id, field, "must not be empty"));
    }
    if value.contains(char::is_whitespace) {
        return Err(Error::validation(id, field, format!("'{}' must not contain whitespace", value)));
    }
    Ok(())
}

/// Check `value` against a fixed list, naming the allowed values on failure.
pub(crate) fn validate_one_of(id: &str, field: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(Error::validation(
            id,
            field,
            format!("got '{}', allowed values are: {}", value, allowed.join(", ")),
        ))
    }
}

/// Accept either a single string or a list of strings.
pub(crate) fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => None,
        Some(OneOrMany::One(s)) => Some(vec![s]),
        Some(OneOrMany::Many(v)) => Some(v),
    })
}

/// Accept a JSON string or number, stored as a trimmed string.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.trim().to_string(),
        StringOrNumber::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_scope_requires_exactly_one() {
        let zone = Some("public".to_string());
        let policy = Some("anytorestricted".to_string());

        assert_eq!(resolve_scope("r", &zone, &None).unwrap(), Scope::Zone("public".into()));
        assert_eq!(
            resolve_scope("r", &None, &policy).unwrap(),
            Scope::Policy("anytorestricted".into())
        );
        assert!(resolve_scope("r", &zone, &policy).unwrap_err().is_validation());
        assert!(resolve_scope("r", &None, &None).unwrap_err().is_validation());
    }

    #[test]
    fn test_resource_tagged_by_kind() {
        let json = r#"[
            { "kind": "zone", "name": "restricted", "target": "%%REJECT%%" },
            { "kind": "port", "zone": "public", "port": 8080, "protocol": "tcp" },
            { "kind": "service", "zone": "public", "service": "ssh" },
            { "kind": "direct_purge", "target": "rule" }
        ]"#;
        let resources: Vec<Resource> = serde_json::from_str(json).unwrap();
        assert_eq!(resources.len(), 4);
        assert_eq!(resources[0].id(), "zone 'restricted'");
        assert_eq!(resources[1].id(), "port '8080/tcp'");
        assert_eq!(resources[2].id(), "service 'ssh'");
        assert_eq!(resources[3].id(), "direct_purge 'rule'");
        for resource in &resources {
            resource.validate().unwrap();
        }
    }

    #[test]
    fn test_validate_one_of_names_allowed_values() {
        let err = validate_one_of("port 'x'", "protocol", "icmp", &["tcp", "udp"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("protocol"));
        assert!(msg.contains("tcp, udp"));
    }
}
