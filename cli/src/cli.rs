//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::commands;

/// Ephemeral zones for test runs on a shared control host
#[derive(Parser)]
#[command(
    name = "zonekit",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Config file (default: ~/.zonekit/config.yaml)
    #[arg(long, global = true, env = "ZONEKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// State file (default: ~/.zonekit/state.json)
    #[arg(long, global = true, env = "ZONEKIT_STATE")]
    pub state: Option<PathBuf>,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision a fresh disposable zone and record it
    Create,

    /// Remove the recorded zone
    Destroy,

    /// Show the recorded zone
    Status(commands::status::StatusArgs),

    /// Run a command on the control host
    Exec(commands::exec::ExecArgs),

    /// Generate the key pair injected into zones
    Keygen,
}

impl Cli {
    /// Default log filter for the verbosity flag, used when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            config,
            state,
            quiet,
            no_color,
            command,
            ..
        } = self;
        let app = AppContext::new(AppFlags {
            output: OutputFlags { no_color, quiet },
            config,
            state,
        })?;
        match command {
            Command::Create => commands::create::run(&app).await?,
            Command::Destroy => commands::destroy::run(&app).await?,
            Command::Status(args) => commands::status::run(&args, &app).await?,
            Command::Exec(args) => return commands::exec::run(&args, &app).await,
            Command::Keygen => commands::keygen::run(&app).await?,
        }
        Ok(ExitCode::SUCCESS)
    }
}
