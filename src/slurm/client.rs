// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Slurm CLI integration: run sinfo/squeue/scontrol with a bounded timeout.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::raw::{SinfoResponse, SlurmResponse, SqueueResponse};
use crate::config::SlurmConfig;
use crate::models::hostlist::{self, HostListExpander};

/// Failure of a single scheduler command
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
    #[error("`{command}` failed ({status}): {stderr}")]
    NonZeroExit {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("`{command}` returned no output")]
    EmptyOutput { command: String },
    #[error("`{command}` returned invalid JSON: {source}")]
    InvalidJson {
        command: String,
        source: serde_json::Error,
    },
    #[error("`{command}` reported: {message}")]
    Scheduler { command: String, message: String },
}

/// Arguments for `sinfo -N --json`
#[derive(Debug, Clone, Default)]
pub struct NodeQuery {
    pub partition: Option<String>,
    pub nodelist: Option<String>,
    /// Include hidden partitions
    pub all_partitions: bool,
}

impl NodeQuery {
    fn args(&self) -> Vec<String> {
        let mut args = vec!["-N".to_string(), "--json".to_string()];
        if self.all_partitions {
            args.push("--all".to_string());
        }
        if let Some(partition) = &self.partition {
            args.extend(["-p".to_string(), partition.clone()]);
        }
        if let Some(nodelist) = &self.nodelist {
            args.extend(["-n".to_string(), nodelist.clone()]);
        }
        args
    }
}

/// Arguments for `squeue --json`
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub users: Vec<String>,
    pub partitions: Vec<String>,
    /// `None` asks for every state the scheduler still knows about
    pub states: Option<Vec<String>>,
}

impl JobQuery {
    fn args(&self) -> Vec<String> {
        let mut args = vec!["--json".to_string()];
        if let Some(states) = self.states.as_ref().filter(|s| !s.is_empty()) {
            args.extend(["-t".to_string(), states.join(",")]);
        }
        if !self.users.is_empty() {
            args.extend(["-u".to_string(), self.users.join(",")]);
        }
        if !self.partitions.is_empty() {
            args.extend(["-p".to_string(), self.partitions.join(",")]);
        }
        args
    }
}

/// Handle on the scheduler's command-line tools
pub struct SlurmClient {
    /// Directory holding the Slurm binaries; `None` resolves them via PATH
    bin_path: Option<PathBuf>,
    query_timeout: Duration,
    hostlist_timeout: Duration,
    probe_timeout: Duration,
    rt: tokio::runtime::Runtime,
}

impl SlurmClient {
    pub fn new(config: &SlurmConfig) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        Ok(Self {
            bin_path: config.bin_path.clone(),
            query_timeout: config.query_timeout(),
            hostlist_timeout: config.hostlist_timeout(),
            probe_timeout: config.probe_timeout(),
            rt,
        })
    }

    /// Node records from `sinfo -N --json`
    pub fn query_nodes(&self, query: &NodeQuery) -> Result<Vec<Value>, QueryError> {
        self.query::<SinfoResponse>("sinfo", &query.args())
    }

    /// Job records from `squeue --json`
    pub fn query_jobs(&self, query: &JobQuery) -> Result<Vec<Value>, QueryError> {
        self.query::<SqueueResponse>("squeue", &query.args())
    }

    /// Expand a host list through `scontrol show hostnames`.
    ///
    /// Never fails: on any error the pattern itself is returned.
    pub fn expand_host_list(&self, pattern: &str) -> Vec<String> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Vec::new();
        }
        if !pattern.contains(['[', ',']) {
            return vec![pattern.to_string()];
        }

        let args = ["show".to_string(), "hostnames".to_string(), pattern.to_string()];
        match self.run("scontrol", &args, self.hostlist_timeout) {
            Ok(stdout) => stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            Err(err) => {
                warn!(pattern, error = %err, "host list expansion failed, using it verbatim");
                vec![pattern.to_string()]
            }
        }
    }

    /// Whether `sinfo --version` answers within the probe timeout
    pub fn test_connectivity(&self) -> bool {
        match self.run("sinfo", &["--version".to_string()], self.probe_timeout) {
            Ok(version) => {
                debug!(version = version.trim(), "scheduler reachable");
                true
            }
            Err(err) => {
                debug!(error = %err, "connectivity probe failed");
                false
            }
        }
    }

    fn query<R>(&self, program: &str, args: &[String]) -> Result<Vec<Value>, QueryError>
    where
        R: SlurmResponse + DeserializeOwned,
    {
        let stdout = self.run(program, args, self.query_timeout)?;
        decode::<R>(&command_line(program, args), &stdout)
    }

    fn program(&self, name: &str) -> PathBuf {
        match &self.bin_path {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Run a command to completion and return its stdout.
    ///
    /// The child is killed when the timeout elapses.
    fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<String, QueryError> {
        let command = command_line(program, args);
        debug!(%command, "running scheduler command");

        let mut cmd = tokio::process::Command::new(self.program(program));
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = self
            .rt
            .block_on(async { tokio::time::timeout(timeout, cmd.output()).await });

        let output = match output {
            Err(_) => return Err(QueryError::Timeout { command, timeout }),
            Ok(Err(source)) => return Err(QueryError::Spawn { command, source }),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(QueryError::NonZeroExit {
                command,
                status: output.status,
                stderr: if stderr.is_empty() {
                    "no error output".to_string()
                } else {
                    stderr
                },
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            return Err(QueryError::EmptyOutput { command });
        }
        Ok(stdout)
    }
}

/// Local expansion first; only syntax it rejects goes to scontrol
impl HostListExpander for SlurmClient {
    fn expand(&self, pattern: &str) -> Vec<String> {
        match hostlist::expand(pattern) {
            Ok(hosts) => hosts,
            Err(err) => {
                debug!(pattern, error = %err, "falling back to scontrol");
                self.expand_host_list(pattern)
            }
        }
    }
}

fn decode<R>(command: &str, stdout: &str) -> Result<Vec<Value>, QueryError>
where
    R: SlurmResponse + DeserializeOwned,
{
    let response: R = serde_json::from_str(stdout).map_err(|source| QueryError::InvalidJson {
        command: command.to_string(),
        source,
    })?;

    if !response.errors().is_empty() {
        let message = response
            .errors()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(QueryError::Scheduler {
            command: command.to_string(),
            message,
        });
    }

    Ok(response.into_records())
}

fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SlurmClient {
        SlurmClient::new(&SlurmConfig::default()).unwrap()
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_node_query_args() {
        assert_eq!(NodeQuery::default().args(), vec!["-N", "--json"]);

        let query = NodeQuery {
            partition: Some("gpu".to_string()),
            nodelist: Some("node[01-02]".to_string()),
            all_partitions: true,
        };
        assert_eq!(
            query.args(),
            vec!["-N", "--json", "--all", "-p", "gpu", "-n", "node[01-02]"]
        );
    }

    #[test]
    fn test_job_query_args() {
        let query = JobQuery {
            users: vec!["alice".to_string(), "bob".to_string()],
            partitions: vec!["cpu".to_string()],
            states: Some(vec!["RUNNING".to_string(), "PENDING".to_string()]),
        };
        assert_eq!(
            query.args(),
            vec!["--json", "-t", "RUNNING,PENDING", "-u", "alice,bob", "-p", "cpu"]
        );

        let unfiltered = JobQuery {
            states: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(unfiltered.args(), vec!["--json"]);
    }

    #[test]
    fn test_decode_records_and_errors() {
        let records =
            decode::<SinfoResponse>("sinfo", r#"{"sinfo": [{"a": 1}, {"b": 2}], "errors": []}"#)
                .unwrap();
        assert_eq!(records.len(), 2);

        let err = decode::<SqueueResponse>(
            "squeue",
            r#"{"jobs": [], "errors": [{"description": "Invalid user"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::Scheduler { ref message, .. } if message == "Invalid user"));

        let err = decode::<SqueueResponse>("squeue", "not json").unwrap_err();
        assert!(matches!(err, QueryError::InvalidJson { .. }));
    }

    #[test]
    fn test_run_failures() {
        let client = client();

        let err = client
            .run("cmon-no-such-binary", &[], Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, QueryError::Spawn { .. }));

        let err = client
            .run("sh", &sh("echo boom >&2; exit 3"), Duration::from_secs(5))
            .unwrap_err();
        match err {
            QueryError::NonZeroExit { status, stderr, .. } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = client.run("sh", &sh("true"), Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, QueryError::EmptyOutput { .. }));
    }

    #[test]
    fn test_run_timeout_kills_child() {
        let err = client()
            .run("sh", &sh("sleep 5"), Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, QueryError::Timeout { .. }));
        assert!(err.to_string().contains("sh -c sleep 5"));
    }

    #[test]
    fn test_expand_host_list_shortcuts() {
        let client = client();
        assert!(client.expand_host_list("  ").is_empty());
        assert_eq!(client.expand_host_list("node01"), vec!["node01"]);
        // Resolved locally without touching scontrol
        assert_eq!(
            HostListExpander::expand(&client, "gpu[1-2],cpu1"),
            vec!["gpu1", "gpu2", "cpu1"]
        );
    }

    #[test]
    fn test_expand_falls_back_to_pattern() {
        let config = SlurmConfig {
            bin_path: Some(PathBuf::from("/nonexistent/slurm/bin")),
            ..Default::default()
        };
        let client = SlurmClient::new(&config).unwrap();
        assert_eq!(client.expand_host_list("node[3-1]"), vec!["node[3-1]"]);
        assert!(!client.test_connectivity());
    }
}
