// Firewalld Converge - Plane Presence
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Presence of a single item across the permanent and runtime planes.

use serde::Serialize;

use crate::models::Ensure;

/// Where an item currently exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneState {
    /// Not both planes have been read yet.
    #[default]
    Unknown,
    AbsentBoth,
    /// Persisted but not live; a reload resolves it.
    PresentPermanentOnly,
    /// Live but not persisted; a reload drops it.
    PresentRuntimeOnly,
    PresentBoth,
}

impl PlaneState {
    pub fn from_planes(in_permanent: bool, in_runtime: bool) -> Self {
        match (in_permanent, in_runtime) {
            (true, true) => Self::PresentBoth,
            (true, false) => Self::PresentPermanentOnly,
            (false, true) => Self::PresentRuntimeOnly,
            (false, false) => Self::AbsentBoth,
        }
    }

    pub fn in_permanent(&self) -> bool {
        matches!(self, Self::PresentBoth | Self::PresentPermanentOnly)
    }

    pub fn in_runtime(&self) -> bool {
        matches!(self, Self::PresentBoth | Self::PresentRuntimeOnly)
    }

    /// The planes disagree.
    pub fn is_drifted(&self) -> bool {
        matches!(self, Self::PresentPermanentOnly | Self::PresentRuntimeOnly)
    }
}

/// How "exists" is decided for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistencePolicy {
    /// Rules, ports, services and direct objects: present means present in
    /// both planes, absent means absent from both.
    PlaneAgreement,
    /// Zones, policies, ipsets and service definitions: only the permanent
    /// plane counts; they reach runtime through a reload.
    PermanentOnly,
}

impl ExistencePolicy {
    /// Whether `state` already satisfies `ensure`.
    pub fn converged(&self, state: PlaneState, ensure: Ensure) -> bool {
        if state == PlaneState::Unknown {
            return false;
        }
        match (self, ensure) {
            (Self::PlaneAgreement, Ensure::Present) => state == PlaneState::PresentBoth,
            (Self::PlaneAgreement, Ensure::Absent) => state == PlaneState::AbsentBoth,
            (Self::PermanentOnly, Ensure::Present) => state.in_permanent(),
            (Self::PermanentOnly, Ensure::Absent) => !state.in_permanent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PlaneState; 4] = [
        PlaneState::AbsentBoth,
        PlaneState::PresentPermanentOnly,
        PlaneState::PresentRuntimeOnly,
        PlaneState::PresentBoth,
    ];

    #[test]
    fn test_from_planes() {
        assert_eq!(PlaneState::from_planes(true, false), PlaneState::PresentPermanentOnly);
        assert_eq!(PlaneState::from_planes(false, true), PlaneState::PresentRuntimeOnly);
        assert!(PlaneState::from_planes(true, false).is_drifted());
        assert!(!PlaneState::from_planes(true, true).is_drifted());
    }

    #[test]
    fn test_plane_agreement_present_requires_both() {
        let policy = ExistencePolicy::PlaneAgreement;
        for state in ALL {
            assert_eq!(
                policy.converged(state, Ensure::Present),
                state == PlaneState::PresentBoth,
                "{:?}",
                state
            );
        }
    }

    #[test]
    fn test_plane_agreement_absent_requires_neither() {
        let policy = ExistencePolicy::PlaneAgreement;
        for state in ALL {
            assert_eq!(
                policy.converged(state, Ensure::Absent),
                !state.in_permanent() && !state.in_runtime(),
                "{:?}",
                state
            );
        }
    }

    #[test]
    fn test_permanent_only_ignores_runtime() {
        let policy = ExistencePolicy::PermanentOnly;
        assert!(policy.converged(PlaneState::PresentPermanentOnly, Ensure::Present));
        assert!(!policy.converged(PlaneState::PresentRuntimeOnly, Ensure::Present));
        assert!(policy.converged(PlaneState::PresentRuntimeOnly, Ensure::Absent));
    }

    #[test]
    fn test_unknown_never_converged() {
        for policy in [ExistencePolicy::PlaneAgreement, ExistencePolicy::PermanentOnly] {
            assert!(!policy.converged(PlaneState::Unknown, Ensure::Present));
            assert!(!policy.converged(PlaneState::Unknown, Ensure::Absent));
        }
    }
}
