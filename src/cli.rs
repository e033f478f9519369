//! Command-line interface built on clap.
//!
//! Defines [`Cli`] with the [`Command`] subcommands (validate, compile,
//! simulate, run, status, demo) and global flags (--config, --max-volume,
//! --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// labflow: compile liquid-handling jobs into worklists, with preflight and dry run.
#[derive(Debug, Parser)]
#[command(name = "labflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the configuration file (default: ./labflow.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the per-transfer volume limit in µL.
    #[arg(long, global = true)]
    pub max_volume: Option<f64>,

    /// Labware present on the deck, added to the configured deck.
    #[arg(long = "labware", global = true, value_delimiter = ',')]
    pub labware: Vec<String>,

    /// Enable debug logging on stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run preflight checks on a job file and list every violation.
    Validate {
        /// Path to a JSON job file.
        job: PathBuf,
    },

    /// Validate and compile a job into worklist records.
    Compile {
        /// Path to a JSON job file.
        job: PathBuf,

        /// Write the worklist to this `.gwl` file instead of stdout.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Dry-run a job and report the resulting volumes.
    Simulate {
        /// Path to a JSON job file.
        job: PathBuf,

        /// JSON file mapping labware labels to 96 starting volumes.
        #[arg(long)]
        initial: Option<PathBuf>,
    },

    /// Submit jobs to the queue and run them in order.
    Run {
        /// Paths to JSON job files, submitted in the given order.
        #[arg(required = true)]
        jobs: Vec<PathBuf>,

        /// JSON file mapping labware labels to 96 starting volumes.
        #[arg(long)]
        initial: Option<PathBuf>,
    },

    /// Show the effective configuration: deck, limits and recovery policy.
    Status,

    /// Run the built-in transfer, wash and decontaminate demonstration.
    Demo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_compile_subcommand() {
        let cli = Cli::parse_from(["labflow", "compile", "job.json", "--out", "job.gwl"]);
        match cli.command {
            Command::Compile { job, out } => {
                assert_eq!(job, PathBuf::from("job.json"));
                assert_eq!(out, Some(PathBuf::from("job.gwl")));
            }
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "labflow",
            "--max-volume",
            "250",
            "--labware",
            "S1,D1",
            "--verbose",
            "demo",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.max_volume, Some(250.0));
        assert_eq!(cli.labware, vec!["S1", "D1"]);
        assert!(matches!(cli.command, Command::Demo));
    }

    #[test]
    fn cli_parses_run_with_many_jobs() {
        let cli = Cli::parse_from(["labflow", "run", "a.json", "b.json"]);
        match cli.command {
            Command::Run { jobs, initial } => {
                assert_eq!(jobs.len(), 2);
                assert!(initial.is_none());
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_run_requires_a_job() {
        assert!(Cli::try_parse_from(["labflow", "run"]).is_err());
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
