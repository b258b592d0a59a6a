// Firewalld Converge - Reconciliation
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Converge declared resources against firewalld.

mod changeset;
pub mod diff;
mod engine;
mod presence;
mod purge;

pub use changeset::Changeset;
pub use diff::Diff;
pub use engine::Reconciler;
pub use presence::{ExistencePolicy, PlaneState};
pub use purge::{purge, PurgeOutcome, PurgeTarget};
