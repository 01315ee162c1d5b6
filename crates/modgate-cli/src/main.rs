// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use modgate_core::TenantId;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "modgate", version, about = "modgate policy and configuration tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the token stream of a policy file.
    Lex {
        /// Policy source file.
        file: PathBuf,

        /// Print JSON instead of one token per line.
        #[arg(long)]
        json: bool,
    },

    /// Parse a policy file and report the first syntax error.
    Check {
        /// Policy source file.
        file: PathBuf,

        /// Print the report (and AST on success) as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compile a policy file into permission-level entries.
    Compile {
        /// Policy source file.
        file: PathBuf,

        /// TOML label binding table.
        #[arg(long)]
        bindings: PathBuf,

        /// Tenant the entries belong to.
        #[arg(long)]
        tenant: u64,
    },

    /// Load and validate a configuration file.
    Config {
        /// Configuration file; defaults plus environment overrides when omitted.
        file: Option<PathBuf>,
    },

    /// Print the configuration JSON schema.
    Schema,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("modgate=debug")
    } else {
        EnvFilter::new("modgate=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Lex { file, json } => {
            println!("{}", commands::lex_file(&file, json)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { file, json } => {
            let report = commands::check_file(&file)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("serialize report")?
                );
            } else if report.is_ok() {
                println!("{}", report.to_text());
            } else {
                eprintln!("{}", report.to_text());
            }
            Ok(exit_code(report.is_ok()))
        }
        Commands::Compile {
            file,
            bindings,
            tenant,
        } => {
            println!(
                "{}",
                commands::compile_file(&file, &bindings, TenantId(tenant))?
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { file } => {
            let (ok, lines) = commands::config_check(file.as_deref());
            for line in &lines {
                println!("{line}");
            }
            Ok(exit_code(ok))
        }
        Commands::Schema => {
            println!("{}", commands::schema_json()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
