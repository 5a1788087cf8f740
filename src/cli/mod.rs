//! CLI subcommands — init, validate, run.

use crate::batch::{parser, runner, types::BatchConfig, types::BatchOutcome};
use crate::core::ExecuteReport;
use crate::transport::{self, ExecOutput};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter batch.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate batch.yaml without running anything
    Validate {
        /// Path to batch.yaml
        #[arg(short, long, default_value = "batch.yaml")]
        file: PathBuf,
    },

    /// Run every script in the batch against its target
    Run {
        /// Path to batch.yaml
        #[arg(short, long, default_value = "batch.yaml")]
        file: PathBuf,

        /// Print each prepared script instead of running it
        #[arg(long)]
        dry_run: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Run {
            file,
            dry_run,
            json,
        } => cmd_run(&file, dry_run, json),
    }
}

const STARTER: &str = r#"version: "1.0"
name: my-batch
description: "Managed by snug"

# target:
#   addr: 10.0.0.1
#   user: root
#   ssh_key: ~/.ssh/id_ed25519

pipe:
  prelude:
    - set -euo pipefail
  trim: true

policy:
  stop_on_failure: true

requests:
  - id: hostname
    script: hostname
  - id: uptime
    script: uptime
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("batch.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }

    std::fs::create_dir_all(path)
        .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    std::fs::write(&config_path, STARTER)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized snug batch at {}", path.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parse_and_validate(file)?;
    println!(
        "OK: {} ({} requests, target: {})",
        config.name,
        config.requests.len(),
        target_label(&config)
    );
    Ok(())
}

fn cmd_run(file: &Path, dry_run: bool, json: bool) -> Result<(), String> {
    let config = parse_and_validate(file)?;

    let report = if dry_run {
        let mut sender = |script: String| -> Result<ExecOutput, String> {
            println!("--- would run on {} ---", target_label(&config));
            println!("{}", script);
            Ok(ExecOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        };
        runner::run_batch(&config, &mut sender).map_err(|e| e.to_string())?
    } else {
        let mut sender = transport::sender_for(config.target.as_ref());
        runner::run_batch(&config, &mut sender).map_err(|e| e.to_string())?
    };

    if json {
        let out = serde_json::to_string_pretty(&report.output)
            .map_err(|e| format!("JSON serialize error: {}", e))?;
        println!("{}", out);
    } else {
        print_report(&config, &report);
    }

    let failed = report.output.failed();
    if failed > 0 {
        return Err(format!("{} request(s) failed", failed));
    }
    Ok(())
}

fn print_report(config: &BatchConfig, report: &ExecuteReport<BatchOutcome>) {
    println!(
        "Batch: {} ({} rounds, {:.2}s)",
        config.name,
        report.rounds,
        report.duration.as_secs_f64()
    );
    for (id, outcome) in &report.output.results {
        let mark = if outcome.success() { "ok" } else { "FAIL" };
        println!("  [{}] {} (exit {})", mark, id, outcome.exit_code);
        for line in outcome.stdout.lines() {
            println!("      {}", line);
        }
        if !outcome.success() {
            for line in outcome.stderr.lines() {
                eprintln!("      {}", line);
            }
        }
    }
    for id in &report.output.skipped {
        println!("  [skip] {}", id);
    }
}

fn target_label(config: &BatchConfig) -> String {
    match config.target {
        Some(ref t) if !t.is_local() => format!("{}@{}", t.user, t.addr),
        _ => "local".to_string(),
    }
}

fn parse_and_validate(file: &Path) -> Result<BatchConfig, String> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        return Err(format!("{} validation error(s)", errors.len()));
    }
    Ok(config)
}
