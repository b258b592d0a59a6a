// Firewalld Converge - Process Runner
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Blocking subprocess execution with an optional deadline.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when the process never ran or was killed by a signal.
    pub status: Option<i32>,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            status: Some(status),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Diagnostic text: stderr when present, stdout otherwise.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Seam between the command adapter and the operating system.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs commands with `std::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill commands that run longer than `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!("Running: {}", display_command(program, args));

        let mut child = match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::CommandNotFound {
                    program: program.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        // Drain both pipes while waiting so a chatty command cannot block on a full pipe.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = thread::spawn(move || drain(stdout));
        let stderr_reader = thread::spawn(move || drain(stderr));

        let status = match self.timeout {
            Some(limit) => wait_with_deadline(&mut child, limit)?,
            None => Some(child.wait()?),
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        match status {
            Some(status) => Ok(CommandOutput {
                stdout,
                stderr,
                status: status.code(),
            }),
            None => Err(Error::Timeout {
                command: display_command(program, args),
                secs: self.timeout.map(|t| t.as_secs()).unwrap_or_default(),
            }),
        }
    }
}

fn wait_with_deadline(child: &mut Child, limit: Duration) -> io::Result<Option<ExitStatus>> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= limit {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Render a command line for logs and reports. Arguments containing
/// whitespace are single-quoted.
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push('\'');
            line.push_str(arg);
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_display_command_quotes_whitespace() {
        let args = strings(&["--zone", "public", "--add-rich-rule", "rule family=\"ipv4\" accept"]);
        assert_eq!(
            display_command("firewall-cmd", &args),
            "firewall-cmd --zone public --add-rich-rule 'rule family=\"ipv4\" accept'"
        );
    }

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let mut out = CommandOutput::new("no", 1);
        assert_eq!(out.diagnostic(), "no");
        out.stderr = "Error: INVALID_ZONE: nope\n".into();
        assert_eq!(out.diagnostic(), "Error: INVALID_ZONE: nope");
    }

    #[test]
    fn test_missing_program_is_command_not_found() {
        let runner = SystemRunner::new();
        let result = runner.run("firewalld-converge-definitely-missing-binary", &[]);
        assert!(matches!(result, Err(Error::CommandNotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout_and_status() {
        let runner = SystemRunner::with_timeout(Some(Duration::from_secs(10)));
        let out = runner
            .run("sh", &strings(&["-c", "echo running; exit 3"]))
            .expect("sh should run");
        assert_eq!(out.stdout.trim(), "running");
        assert_eq!(out.status, Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let runner = SystemRunner::with_timeout(Some(Duration::from_millis(50)));
        let result = runner.run("sleep", &strings(&["5"]));
        assert!(matches!(result, Err(Error::Timeout { .. })));
    }
}
