// Firewalld Converge - Library
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Converge firewalld onto a declared desired state.
//!
//! Desired state is read from a [`manifest::Manifest`], current state through
//! [`state::StateReader`], and every resource is driven to its declared state
//! by a [`reconcile::Reconciler`] issuing `firewall-cmd` commands through
//! [`firewall::FirewallCmd`].

pub mod config;
pub mod error;
pub mod firewall;
pub mod manifest;
pub mod models;
pub mod reconcile;
pub mod report;
pub mod state;

pub use error::{Error, Result};
