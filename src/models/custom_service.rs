// Firewalld Converge - Custom Service Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Custom service definitions managed through `firewall-cmd`.

use serde::Deserialize;

use super::port::{Port, PROTOCOLS};
use super::{validate_word, Ensure};
use crate::error::{Error, Result};

/// A service definition. Declared ports and protocols are converged as
/// collections; undeclared properties are left alone.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomService {
    pub name: String,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short: Option<String>,
    /// Entries like `8080/tcp`.
    #[serde(default)]
    pub ports: Option<Vec<String>>,
    #[serde(default)]
    pub protocols: Option<Vec<String>>,
}

impl CustomService {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ensure: Ensure::Present,
            description: None,
            short: None,
            ports: None,
            protocols: None,
        }
    }

    pub fn validate(&self, id: &str) -> Result<()> {
        validate_word(id, "name", &self.name)?;
        for entry in self.ports.iter().flatten() {
            match Port::parse_entry(entry) {
                Some((_, protocol)) if PROTOCOLS.contains(&protocol.as_str()) => {}
                _ => {
                    return Err(Error::validation(
                        id,
                        "ports",
                        format!("'{}' must look like <port>/<{}>", entry, PROTOCOLS.join("|")),
                    ))
                }
            }
        }
        for protocol in self.protocols.iter().flatten() {
            validate_word(id, "protocols", protocol)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_definition() {
        let svc: CustomService = serde_json::from_str(r#"{ "name": "myapp" }"#).unwrap();
        svc.validate("c").unwrap();
        assert_eq!(svc.ports, None);
    }

    #[test]
    fn test_port_entries_validated() {
        let mut svc = CustomService::named("myapp");
        svc.ports = Some(vec!["8080/tcp".into(), "9000".into()]);
        assert!(svc.validate("c").unwrap_err().to_string().contains("'9000'"));

        svc.ports = Some(vec!["8080/tcp".into(), "5353/udp".into()]);
        svc.validate("c").unwrap();
    }
}
