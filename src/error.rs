// Firewalld Converge - Errors
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Error taxonomy for convergence passes.

use thiserror::Error;

/// Errors raised while validating or converging declared firewall state.
#[derive(Debug, Error)]
pub enum Error {
    /// The control binary could not be spawned.
    #[error("command not found: {program}")]
    CommandNotFound { program: String },

    /// A mutating command exited non-zero.
    #[error("`{command}` failed with exit status {status}: {output}")]
    ExecutionFailure {
        command: String,
        status: i32,
        output: String,
    },

    #[error("`{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    /// A declared resource is self-contradictory. Raised before any
    /// command is issued.
    #[error("{resource}: invalid `{field}`: {message}")]
    Validation {
        resource: String,
        field: String,
        message: String,
    },

    #[error("{feature} requires firewalld >= {required} (found {found})")]
    Unsupported {
        feature: String,
        required: String,
        found: String,
    },

    /// Several independent operations failed; every one was attempted.
    #[error("{} operation(s) failed: {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<Error>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(
        resource: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            resource: resource.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Collapse a list of failures: `Ok` when empty, the error itself when
    /// there is exactly one, `Aggregate` otherwise.
    pub fn from_failures(mut failures: Vec<Error>) -> Result<()> {
        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(Self::Aggregate(failures)),
        }
    }

    /// Whether this error is (or only contains) validation failures.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation { .. } => true,
            Self::Aggregate(inner) => !inner.is_empty() && inner.iter().all(Error::is_validation),
            _ => false,
        }
    }
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
