// Firewalld Converge - Set Difference
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Add/remove sets between desired and existing canonical strings.

use std::collections::BTreeSet;

/// Minimal change set. Computed fresh on every pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
}

impl Diff {
    /// `to_add = desired - existing`, `to_remove = existing - desired`.
    pub fn between(desired: &BTreeSet<String>, existing: &BTreeSet<String>) -> Self {
        Self {
            to_add: desired.difference(existing).cloned().collect(),
            to_remove: existing.difference(desired).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Collect strings into a set.
pub fn string_set<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between() {
        let desired = string_set(["eth0", "eth1"]);
        let existing = string_set(["eth1", "eth2"]);
        let diff = Diff::between(&desired, &existing);
        assert_eq!(diff.to_add, string_set(["eth0"]));
        assert_eq!(diff.to_remove, string_set(["eth2"]));
    }

    #[test]
    fn test_equal_sets_are_empty_diff() {
        let set = string_set(["ssh", "https"]);
        assert!(Diff::between(&set, &set).is_empty());
    }

    #[test]
    fn test_applying_diff_reaches_desired() {
        let desired = string_set(["a", "b", "c"]);
        let existing = string_set(["c", "d", "e"]);
        let diff = Diff::between(&desired, &existing);

        let mut converged = existing.clone();
        converged.retain(|item| !diff.to_remove.contains(item));
        converged.extend(diff.to_add.iter().cloned());
        assert_eq!(converged, desired);
        assert!(diff.to_add.is_disjoint(&diff.to_remove));
        assert!(Diff::between(&desired, &converged).is_empty());
    }
}
