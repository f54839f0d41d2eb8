// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Command handlers: validate input, query the scheduler, render or export.

use std::env;
use std::io::{self, IsTerminal, Stdout, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Local;
use ratatui::style::Color;
use ratatui::text::{Line, Span};
use tracing::debug;

use crate::config::Config;
use crate::error::ValidationError;
use crate::export::{nodes_csv, to_json, write_export, StatusExport};
use crate::filter::{parse_state_list, NodeFilter, ViewConfig};
use crate::models::cluster::dedup_nodes;
use crate::models::{normalize_jobs, normalize_nodes, ClusterStatus, Job};
use crate::slurm::{JobQuery, NodeQuery, SlurmClient};
use crate::ui::jobs::{parse_columns, print_jobs, JobColumn, JobsView, TableLayout};
use crate::ui::print::Printer;
use crate::ui::status::{efficiency_lines, print_cluster_status, StatusOptions};
use crate::ui::theme::Theme;
use crate::{watch, Args, Command, JobsArgs, NodesArgs, OutputArgs, OutputFormat, StatusArgs};

const CONNECT_ERROR: &str =
    "Cannot connect to Slurm. Please check that Slurm is installed and accessible.";

/// Everything a command needs after startup
struct Session {
    config: Config,
    client: SlurmClient,
    theme: Theme,
    color: bool,
}

impl Session {
    fn connect(config: Config, no_color: bool) -> Result<Self> {
        let client = SlurmClient::new(&config.slurm)?;
        if !client.test_connectivity() {
            bail!(CONNECT_ERROR);
        }
        let theme = Theme::new(config.display.palette);
        Ok(Self {
            config,
            client,
            theme,
            color: use_color(no_color),
        })
    }

    fn printer(&self) -> Printer<Stdout> {
        Printer::stdout(self.color)
    }

    /// Write `contents` to the export file, or to stdout without one
    fn emit(&self, contents: &str, export: Option<&Path>) -> Result<()> {
        match export {
            Some(path) => {
                write_export(path, contents)?;
                self.printer().line(Line::styled(
                    format!("Exported to {}", path.display()),
                    self.theme.success(),
                ))?;
            }
            None => {
                let mut out = io::stdout().lock();
                writeln!(out, "{}", contents.trim_end())?;
                out.flush()?;
            }
        }
        Ok(())
    }

    fn export_note(&self, export: Option<&Path>, formats: &str) -> Result<()> {
        if export.is_some() {
            self.printer().line(Line::styled(
                format!("Note: Export only supported for {}", formats),
                self.theme.warning(),
            ))?;
        }
        Ok(())
    }
}

pub fn run(args: Args) -> Result<()> {
    let Args {
        config: config_path,
        issues,
        available,
        user,
        command,
        ..
    } = args;

    let command = command.unwrap_or_else(|| {
        Command::Status(StatusArgs {
            user,
            issues,
            available,
            ..Default::default()
        })
    });

    if let Command::Version = command {
        return print_version();
    }

    let config = Config::load(config_path.as_deref())?;

    match command {
        Command::Status(args) => status(config, args),
        Command::Jobs(args) => jobs(config, args),
        Command::Nodes(args) => nodes(config, args),
        Command::Version => Ok(()),
    }
}

fn print_version() -> Result<()> {
    let theme = Theme::default();
    let mut printer = Printer::stdout(use_color(false));
    printer.lines(vec![
        Line::from(vec![
            Span::styled("cmon", theme.bold().fg(Color::Blue)),
            Span::raw(" version "),
            Span::styled(env!("CARGO_PKG_VERSION"), theme.success()),
        ]),
        Line::from("Cluster monitor - Slurm node, job and partition overview"),
    ])?;
    Ok(())
}

/// Colors only on a terminal, and never with `--no-color` or `NO_COLOR`
fn use_color(no_color: bool) -> bool {
    !no_color && env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal()
}

/// Run once, or repeatedly with `--watch`
fn repeat<F>(session: &Session, output: &OutputArgs, mut iteration: F) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    match output.watch {
        Some(secs) => watch::run(secs, session.color, &session.theme, iteration),
        None => iteration(),
    }
}

/// Nodes and jobs in one snapshot; malformed records are logged and skipped
pub fn fetch_cluster(
    client: &SlurmClient,
    node_query: &NodeQuery,
    user: Option<&str>,
) -> Result<ClusterStatus> {
    let nodes = client
        .query_nodes(node_query)
        .context("Failed to query nodes")?;

    let job_query = JobQuery {
        users: user.map(String::from).into_iter().collect(),
        partitions: node_query.partition.iter().cloned().collect(),
        ..Default::default()
    };
    let jobs = client.query_jobs(&job_query).context("Failed to query jobs")?;

    let nodes = normalize_nodes(nodes).into_items();
    let jobs = normalize_jobs(jobs).into_items();
    debug!(nodes = nodes.len(), jobs = jobs.len(), "cluster snapshot");

    Ok(ClusterStatus::new(nodes, jobs))
}

fn status(config: Config, args: StatusArgs) -> Result<()> {
    let states = match &args.state {
        Some(raw) => parse_state_list(raw)?,
        None => Vec::new(),
    };

    let session = Session::connect(config, args.output.no_color)?;
    let filter = NodeFilter {
        states,
        issues: args.issues,
        available: args.available,
        ..Default::default()
    };

    repeat(&session, &args.output, || show_status(&session, &args, &filter))
}

fn show_status(session: &Session, args: &StatusArgs, filter: &NodeFilter) -> Result<()> {
    let node_query = NodeQuery {
        partition: args.partition.clone(),
        nodelist: args.nodes.clone(),
        ..Default::default()
    };
    let cluster = fetch_cluster(&session.client, &node_query, args.user.as_deref())?;
    let job_counts = cluster.job_counts(&session.client);
    let cluster = ClusterStatus::with_timestamp(
        filter.apply(cluster.nodes, &job_counts),
        cluster.jobs,
        cluster.timestamp,
    );
    let export = args.output.export.as_deref();

    match args.output.format {
        OutputFormat::Json => {
            let document = StatusExport {
                timestamp: cluster.timestamp,
                nodes: &cluster.nodes,
                jobs: &cluster.jobs,
            };
            session.emit(&to_json(&document)?, export)
        }
        OutputFormat::Csv => session.emit(&nodes_csv(&cluster.nodes, &job_counts)?, export),
        OutputFormat::Table => {
            let jobs_by_node = cluster.jobs_by_node(&session.client);
            let groups = cluster.partition_groups(&session.config.partition_groups);
            let options = StatusOptions {
                view: args.view.config(),
                issues_only: args.issues,
                groups: &groups,
                jobs_by_node: &jobs_by_node,
            };
            let mut printer = session.printer();
            print_cluster_status(&mut printer, &cluster, &options, &session.theme)?;
            session.export_note(export, "JSON and CSV formats")
        }
    }
}

fn jobs(config: Config, args: JobsArgs) -> Result<()> {
    if args.output.format == OutputFormat::Csv {
        return Err(ValidationError::UnsupportedFormat {
            command: "jobs",
            format: args.output.format.name(),
        }
        .into());
    }
    let columns = args.columns.as_deref().map(parse_columns).transpose()?;
    let states = args.state.as_deref().map(parse_state_list).transpose()?;
    let query = JobQuery {
        users: args.user.iter().cloned().collect(),
        partitions: args.partition.iter().cloned().collect(),
        states: job_states(args.all, states),
    };

    let session = Session::connect(config, args.output.no_color)?;
    repeat(&session, &args.output, || {
        show_jobs(&session, &args, &query, columns.as_deref())
    })
}

/// Explicit states win over `--all`; the default is running jobs only
fn job_states(all: bool, explicit: Option<Vec<String>>) -> Option<Vec<String>> {
    match explicit {
        Some(states) => Some(states),
        None if all => None,
        None => Some(vec!["RUNNING".to_string()]),
    }
}

fn show_jobs(
    session: &Session,
    args: &JobsArgs,
    query: &JobQuery,
    columns: Option<&[JobColumn]>,
) -> Result<()> {
    let records = session
        .client
        .query_jobs(query)
        .context("Failed to query jobs")?;
    let mut jobs: Vec<Job> = normalize_jobs(records).into_items();

    args.sort.sort(&mut jobs, &session.client);
    if let Some(limit) = args.limit {
        jobs.truncate(limit);
    }

    let export = args.output.export.as_deref();
    match args.output.format {
        OutputFormat::Json => session.emit(&to_json(&jobs)?, export),
        _ => {
            let mut printer = session.printer();
            let view = JobsView {
                layout: TableLayout::for_width(printer.width(), args.compact),
                columns: columns.map(<[JobColumn]>::to_vec),
                short_state: !args.full_state,
                current_user: env::var("USER").ok(),
                node_prefix: session.config.display.node_prefix.clone(),
                now: Local::now().naive_local(),
            };
            let theme = args.palette.map_or(session.theme, Theme::new);
            print_jobs(&mut printer, &jobs, &view, &theme)?;
            session.export_note(export, "JSON format")
        }
    }
}

fn nodes(config: Config, args: NodesArgs) -> Result<()> {
    let session = Session::connect(config, args.output.no_color)?;
    let filter = NodeFilter {
        state_class: args.state,
        min_free_cpus: args.min_cpu,
        min_free_memory_gb: args.min_mem,
        min_free_gpus: args.min_gpu,
        ..Default::default()
    };

    repeat(&session, &args.output, || show_nodes(&session, &args, &filter))
}

fn show_nodes(session: &Session, args: &NodesArgs, filter: &NodeFilter) -> Result<()> {
    let node_query = NodeQuery {
        partition: args.partition.clone(),
        all_partitions: args.all,
        ..Default::default()
    };
    let cluster = fetch_cluster(&session.client, &node_query, None)?;
    let job_counts = cluster.job_counts(&session.client);
    let nodes = filter.apply(cluster.nodes, &job_counts);
    let export = args.output.export.as_deref();

    match args.output.format {
        OutputFormat::Json => session.emit(&to_json(&nodes)?, export),
        OutputFormat::Csv => session.emit(&nodes_csv(&nodes, &job_counts)?, export),
        OutputFormat::Table if args.efficiency => {
            let mut printer = session.printer();
            printer.lines(efficiency_lines(&dedup_nodes(&nodes), &session.theme))?;
            session.export_note(export, "JSON and CSV formats")
        }
        OutputFormat::Table => {
            let cluster = ClusterStatus::with_timestamp(nodes, cluster.jobs, cluster.timestamp);
            let jobs_by_node = cluster.jobs_by_node(&session.client);
            let options = StatusOptions {
                view: ViewConfig {
                    show_summary: false,
                    show_partitions: false,
                    show_details: true,
                    show_gpus: true,
                },
                issues_only: false,
                groups: &[],
                jobs_by_node: &jobs_by_node,
            };
            let mut printer = session.printer();
            print_cluster_status(&mut printer, &cluster, &options, &session.theme)?;
            session.export_note(export, "JSON and CSV formats")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(states: &[&str]) -> Option<Vec<String>> {
        Some(states.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_job_states_default_to_running() {
        assert_eq!(job_states(false, None), tags(&["RUNNING"]));
        assert_eq!(job_states(true, None), None);
    }

    #[test]
    fn test_job_states_explicit_list_wins() {
        let explicit = parse_state_list("pending, failed").ok();
        assert_eq!(job_states(false, explicit.clone()), tags(&["PENDING", "FAILED"]));
        assert_eq!(job_states(true, explicit), tags(&["PENDING", "FAILED"]));
    }
}
