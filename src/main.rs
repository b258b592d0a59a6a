// Firewalld Converge - Main Entry Point
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Firewalld Converge - declarative firewalld state convergence.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use firewalld_converge::config::Settings;
use firewalld_converge::firewall::FirewallCmd;
use firewalld_converge::manifest::Manifest;
use firewalld_converge::reconcile::Reconciler;
use firewalld_converge::report::Report;

#[derive(Debug, Parser)]
#[command(name = "firewalld-converge", version, about = "Converge firewalld onto a declared state")]
struct Cli {
    /// Settings file (defaults to the user config directory).
    #[arg(long, global = true, env = "FIREWALLD_CONVERGE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Converge the host onto a manifest.
    Apply {
        manifest: PathBuf,
        /// Report what would change without changing anything.
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show the commands a pass would issue.
    Plan {
        manifest: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Check a manifest without contacting firewalld.
    Validate { manifest: PathBuf },
    /// Print daemon availability and version.
    State {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns whether every resource converged.
fn run(cli: Cli) -> Result<bool> {
    let settings = Settings::load(cli.settings.as_deref());
    debug!("Settings: {:?}", settings);

    match cli.command {
        Command::Apply { manifest, dry_run, json } => {
            converge(&settings, &manifest, dry_run || settings.dry_run, json)
        }
        Command::Plan { manifest, json } => converge(&settings, &manifest, true, json),
        Command::Validate { manifest } => {
            let manifest = Manifest::load(&manifest)?;
            manifest.validate()?;
            println!("{} resources valid", manifest.resources.len());
            Ok(true)
        }
        Command::State { json } => {
            let fw = FirewallCmd::connect(&settings);
            let version = fw.version().map(|v| v.to_string());
            if json {
                let state = serde_json::json!({
                    "availability": fw.availability(),
                    "program": fw.program(),
                    "version": version,
                });
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                println!("firewalld {} ({})", fw.availability().label(), fw.program());
                println!("version {}", version.as_deref().unwrap_or("unknown"));
            }
            Ok(true)
        }
    }
}

fn converge(settings: &Settings, path: &Path, dry_run: bool, json: bool) -> Result<bool> {
    let manifest = Manifest::load(path)?;
    manifest.validate()?;

    let fw = FirewallCmd::connect(settings);
    info!(
        "Converging {} resources, firewalld {}",
        manifest.resources.len(),
        fw.availability().label()
    );
    let (report, result) = Reconciler::new(&fw, settings)
        .with_dry_run(dry_run)
        .apply(&manifest.resources);

    print_report(&report, json)?;
    if let Err(e) = &result {
        debug!("Pass failed: {}", e);
    }
    Ok(result.is_ok())
}

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report.render_text());
    }
    Ok(())
}
