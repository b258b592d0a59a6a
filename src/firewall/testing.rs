// Firewalld Converge - Test Doubles
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Scripted command runner for unit tests.
//!
//! Responses are keyed by the rendered command line (see
//! [`display_command`]). Unscripted `--query-*` commands answer `no` with
//! exit status 1; every other unscripted command succeeds with empty output.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::runner::{display_command, CommandOutput, CommandRunner};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Script {
    responses: HashMap<String, CommandOutput>,
    missing: HashSet<String>,
    calls: Vec<String>,
}

/// Cloneable handle; clones share the same script and call log.
#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    script: Rc<RefCell<Script>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, line: &str, output: CommandOutput) {
        self.script
            .borrow_mut()
            .responses
            .insert(line.to_string(), output);
    }

    /// Shorthand for a successful command printing `stdout`.
    pub fn stdout(&self, line: &str, stdout: &str) {
        self.respond(line, CommandOutput::new(stdout, 0));
    }

    /// Shorthand for a `--query-*` command answering `yes`.
    pub fn yes(&self, line: &str) {
        self.respond(line, CommandOutput::new("yes\n", 0));
    }

    pub fn fail(&self, line: &str, stderr: &str) {
        self.respond(
            line,
            CommandOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                status: Some(1),
            },
        );
    }

    pub fn missing_program(&self, program: &str) {
        self.script.borrow_mut().missing.insert(program.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.borrow().calls.clone()
    }

    /// Calls that change firewall state (anything that is not a read).
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|line| !is_read(line))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.script.borrow_mut().calls.clear();
    }
}

fn is_read(line: &str) -> bool {
    line.split_whitespace().any(|token| {
        token.starts_with("--list-")
            || token.starts_with("--get-")
            || token.starts_with("--query-")
            || token.starts_with("--info-")
            || token == "--state"
            || token == "--version"
    })
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let line = display_command(program, args);
        let mut script = self.script.borrow_mut();
        script.calls.push(line.clone());

        if script.missing.contains(program) {
            return Err(Error::CommandNotFound {
                program: program.to_string(),
            });
        }

        if let Some(output) = script.responses.get(&line) {
            return Ok(output.clone());
        }

        if args.iter().any(|a| a.starts_with("--query-")) {
            Ok(CommandOutput::new("no\n", 1))
        } else {
            Ok(CommandOutput::new("", 0))
        }
    }
}
