// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

mod app;
mod config;
mod error;
mod export;
mod filter;
mod logging;
mod models;
mod slurm;
mod ui;
mod watch;

use filter::{JobSort, NodeStateFilter, ViewLevel};
use ui::theme::Palette;

#[derive(Parser, Debug)]
#[command(name = "cmon")]
#[command(about = "Cluster monitor - Slurm node, job and partition overview")]
#[command(version)]
pub struct Args {
    /// Config file (default: $CMON_CONFIG, then the user and system config dirs)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging on stderr (CMON_LOG overrides)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Shortcut: show only problematic nodes
    #[arg(long)]
    pub issues: bool,

    /// Shortcut: show only idle or mixed nodes
    #[arg(long)]
    pub available: bool,

    /// Shortcut: show one user's jobs and nodes
    #[arg(long)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show cluster status (default)
    Status(StatusArgs),
    /// Analyze running jobs and resource usage
    Jobs(JobsArgs),
    /// Analyze node availability and efficiency
    Nodes(NodesArgs),
    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write JSON/CSV output to this file
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// Refresh every N seconds
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub watch: Option<u64>,

    /// Disable colors
    #[arg(long)]
    pub no_color: bool,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct StatusArgs {
    /// Only this partition
    #[arg(short, long)]
    pub partition: Option<String>,

    /// Only this user's jobs
    #[arg(short, long)]
    pub user: Option<String>,

    /// Node states to show, comma-separated (e.g. idle,mixed)
    #[arg(short, long)]
    pub state: Option<String>,

    /// Only these nodes (host-list ranges such as node[001-010] work)
    #[arg(short, long)]
    pub nodes: Option<String>,

    /// Only nodes that are down, draining or have warnings
    #[arg(short, long)]
    pub issues: bool,

    /// Only idle or mixed nodes
    #[arg(short, long)]
    pub available: bool,

    /// Amount of detail
    #[arg(short, long, value_enum, default_value_t = ViewLevel::Standard)]
    pub view: ViewLevel,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct JobsArgs {
    /// Only this user's jobs
    #[arg(short, long)]
    pub user: Option<String>,

    /// Only this partition
    #[arg(short, long)]
    pub partition: Option<String>,

    /// Include jobs in every state, not just running ones
    #[arg(long)]
    pub all: bool,

    /// Job states to query, comma-separated (e.g. RUNNING,PENDING); overrides --all
    #[arg(long, value_name = "STATES")]
    pub state: Option<String>,

    /// Sort order
    #[arg(short, long, value_enum, default_value_t = JobSort::StartTime)]
    pub sort: JobSort,

    /// Show only the first N jobs
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Narrow layout regardless of terminal width
    #[arg(short, long)]
    pub compact: bool,

    /// RUNNING instead of R
    #[arg(long)]
    pub full_state: bool,

    /// Comma-separated columns to show
    #[arg(long)]
    pub columns: Option<String>,

    /// Color palette (default from config)
    #[arg(long, value_enum)]
    pub palette: Option<Palette>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct NodesArgs {
    /// Only nodes in this state
    #[arg(short, long, value_enum)]
    pub state: Option<NodeStateFilter>,

    /// Only this partition
    #[arg(short, long)]
    pub partition: Option<String>,

    /// Include hidden partitions
    #[arg(short, long)]
    pub all: bool,

    /// At least N free CPU cores
    #[arg(long = "min-cpu")]
    pub min_cpu: Option<u32>,

    /// At least N GB free memory
    #[arg(long = "min-mem")]
    pub min_mem: Option<u64>,

    /// At least N free GPUs
    #[arg(long = "min-gpu")]
    pub min_gpu: Option<u32>,

    /// Per-node CPU and memory utilization
    #[arg(long)]
    pub efficiency: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            // Help and version are not failures
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    logging::init(args.verbose);

    match app::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("cmon").chain(argv.iter().copied()))
    }

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_default_invocation() {
        let args = parse(&["--issues", "--user", "alice"]).unwrap();
        assert!(args.command.is_none());
        assert!(args.issues);
        assert_eq!(args.user.as_deref(), Some("alice"));
    }

    #[test]
    fn test_status_flags() {
        let args = parse(&["status", "-p", "gpu", "-s", "idle,mixed", "-v", "detailed", "-f", "csv", "-w", "5"]).unwrap();
        let Some(Command::Status(status)) = args.command else {
            panic!("expected status");
        };
        assert_eq!(status.partition.as_deref(), Some("gpu"));
        assert_eq!(status.state.as_deref(), Some("idle,mixed"));
        assert_eq!(status.view, ViewLevel::Detailed);
        assert_eq!(status.output.format, OutputFormat::Csv);
        assert_eq!(status.output.watch, Some(5));
    }

    #[test]
    fn test_jobs_flags() {
        let args = parse(&["jobs", "--all", "-s", "gpu", "-l", "10", "--palette", "neon", "--verbose"]).unwrap();
        assert!(args.verbose);
        let Some(Command::Jobs(jobs)) = args.command else {
            panic!("expected jobs");
        };
        assert!(jobs.all);
        assert_eq!(jobs.sort, JobSort::Gpu);
        assert_eq!(jobs.limit, Some(10));
        assert_eq!(jobs.palette, Some(Palette::Neon));
        assert_eq!(jobs.state, None);
    }

    #[test]
    fn test_jobs_state_and_nodes_all() {
        let args = parse(&["jobs", "--state", "PENDING,FAILED"]).unwrap();
        let Some(Command::Jobs(jobs)) = args.command else {
            panic!("expected jobs");
        };
        assert_eq!(jobs.state.as_deref(), Some("PENDING,FAILED"));
        assert!(!jobs.all);

        let args = parse(&["nodes", "-a", "-p", "debug"]).unwrap();
        let Some(Command::Nodes(nodes)) = args.command else {
            panic!("expected nodes");
        };
        assert!(nodes.all);
        assert_eq!(nodes.partition.as_deref(), Some("debug"));
    }

    #[test]
    fn test_rejected_values() {
        assert!(parse(&["nodes", "-s", "sleepy"]).is_err());
        assert!(parse(&["jobs", "-s", "colour"]).is_err());
        assert!(parse(&["status", "-w", "0"]).is_err());

        let args = parse(&["nodes", "-s", "drain", "--min-mem", "64"]).unwrap();
        let Some(Command::Nodes(nodes)) = args.command else {
            panic!("expected nodes");
        };
        assert_eq!(nodes.state, Some(NodeStateFilter::Drain));
        assert_eq!(nodes.min_mem, Some(64));
    }

    #[test]
    fn test_help_and_version_are_not_errors() {
        assert!(!parse(&["--version"]).unwrap_err().use_stderr());
        assert!(!parse(&["-V"]).unwrap_err().use_stderr());
        assert!(!parse(&["--help"]).unwrap_err().use_stderr());
        assert!(parse(&["--bogus"]).unwrap_err().use_stderr());
    }
}
