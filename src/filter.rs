// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Node filters, job sort orders and status view levels.

use std::collections::HashMap;

use clap::ValueEnum;

use crate::error::ValidationError;
use crate::models::hostlist::HostListExpander;
use crate::models::{Job, Node};

/// How much of the cluster status to show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ViewLevel {
    /// Node table only
    Compact,
    /// Summary, partition panel and node table with GPUs
    #[default]
    Standard,
    /// Everything, including per-node jobs and load
    Detailed,
}

/// Sections of the status output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    pub show_summary: bool,
    pub show_partitions: bool,
    pub show_details: bool,
    pub show_gpus: bool,
}

impl ViewLevel {
    pub fn config(self) -> ViewConfig {
        match self {
            ViewLevel::Compact => ViewConfig {
                show_summary: false,
                show_partitions: false,
                show_details: false,
                show_gpus: false,
            },
            ViewLevel::Standard => ViewConfig {
                show_summary: true,
                show_partitions: true,
                show_details: false,
                show_gpus: true,
            },
            ViewLevel::Detailed => ViewConfig {
                show_summary: true,
                show_partitions: true,
                show_details: true,
                show_gpus: true,
            },
        }
    }
}

/// Node state class accepted by `nodes --state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NodeStateFilter {
    Idle,
    Mixed,
    Allocated,
    Down,
    Drain,
}

impl NodeStateFilter {
    pub fn matches(self, node: &Node) -> bool {
        match self {
            NodeStateFilter::Idle => node.is_idle(),
            NodeStateFilter::Mixed => node.is_mixed(),
            NodeStateFilter::Allocated => node.is_allocated(),
            NodeStateFilter::Down => node.is_down(),
            NodeStateFilter::Drain => node.is_draining(),
        }
    }
}

/// Parse `idle,mixed` into uppercase state tags
pub fn parse_state_list(raw: &str) -> Result<Vec<String>, ValidationError> {
    let mut states = Vec::new();
    for state in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !state.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+') {
            return Err(ValidationError::InvalidState(state.to_string()));
        }
        states.push(state.to_ascii_uppercase());
    }
    if states.is_empty() {
        return Err(ValidationError::EmptyStateFilter);
    }
    Ok(states)
}

/// Filters applied to the node list before display or export
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    /// Keep nodes carrying any of these state tags
    pub states: Vec<String>,
    pub state_class: Option<NodeStateFilter>,
    /// Down, draining or with a warning
    pub issues: bool,
    /// Idle or mixed
    pub available: bool,
    pub min_free_cpus: Option<u32>,
    pub min_free_memory_gb: Option<u64>,
    pub min_free_gpus: Option<u32>,
}

impl NodeFilter {
    /// `job_counts` maps host names to the number of jobs placed on them
    pub fn apply(&self, nodes: Vec<Node>, job_counts: &HashMap<String, usize>) -> Vec<Node> {
        nodes
            .into_iter()
            .filter(|node| self.matches(node, job_counts.get(&node.name).copied().unwrap_or(0)))
            .collect()
    }

    fn matches(&self, node: &Node, job_count: usize) -> bool {
        if !self.states.is_empty() && !self.states.iter().any(|s| node.has_state(s)) {
            return false;
        }
        if let Some(class) = self.state_class {
            if !class.matches(node) {
                return false;
            }
        }
        if self.issues && !(node.is_down() || node.is_draining() || node.has_issues(job_count)) {
            return false;
        }
        if self.available && !(node.is_idle() || node.is_mixed()) {
            return false;
        }
        if let Some(min) = self.min_free_cpus {
            if node.cpus_idle < min {
                return false;
            }
        }
        if let Some(min_gb) = self.min_free_memory_gb {
            if node.memory_free < min_gb.saturating_mul(1024) {
                return false;
            }
        }
        if let Some(min) = self.min_free_gpus {
            if node.gpus.total.saturating_sub(node.gpus.used) < min {
                return false;
            }
        }
        true
    }
}

/// Sort order of the jobs table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum JobSort {
    Id,
    User,
    /// Most recently started first
    #[default]
    #[value(name = "start_time")]
    StartTime,
    /// Fewest nodes first
    Nodes,
    /// Most GPUs first
    Gpu,
}

impl JobSort {
    /// Stable sort; jobs that compare equal keep the scheduler's order.
    pub fn sort(self, jobs: &mut [Job], hosts: &dyn HostListExpander) {
        match self {
            JobSort::Id => jobs.sort_by_key(|j| j.job_id),
            JobSort::User => jobs.sort_by(|a, b| a.user_name.cmp(&b.user_name)),
            JobSort::StartTime => jobs.sort_by(|a, b| b.start_time.cmp(&a.start_time)),
            JobSort::Nodes => jobs.sort_by_cached_key(|j| hosts.expand(&j.nodes).len()),
            JobSort::Gpu => jobs.sort_by(|a, b| b.allocated_gpus().cmp(&a.allocated_gpus())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::hostlist::LocalHostList;
    use crate::models::job::tests::{job, now};
    use crate::models::node::tests::node;
    use chrono::TimeDelta;

    #[test]
    fn test_view_levels() {
        let compact = ViewLevel::Compact.config();
        assert!(!compact.show_summary && !compact.show_partitions && !compact.show_gpus);
        let standard = ViewLevel::Standard.config();
        assert!(standard.show_summary && standard.show_partitions && standard.show_gpus);
        assert!(!standard.show_details);
        assert!(ViewLevel::Detailed.config().show_details);
    }

    #[test]
    fn test_parse_state_list() {
        assert_eq!(parse_state_list("idle, mixed").unwrap(), vec!["IDLE", "MIXED"]);
        assert_eq!(parse_state_list(" , "), Err(ValidationError::EmptyStateFilter));
        assert!(matches!(parse_state_list("idle;down"), Err(ValidationError::InvalidState(_))));
    }

    #[test]
    fn test_state_and_availability_filters() {
        let nodes = vec![
            node("a", &["IDLE"]),
            node("b", &["MIXED"]),
            node("c", &["ALLOCATED"]),
            node("d", &["DOWN"]),
            node("e", &["IDLE", "DRAIN"]),
        ];
        let counts = HashMap::new();
        let names = |filter: NodeFilter| -> Vec<String> {
            filter.apply(nodes.clone(), &counts).into_iter().map(|n| n.name).collect()
        };

        let by_tag = NodeFilter { states: vec!["IDLE".to_string()], ..Default::default() };
        assert_eq!(names(by_tag), vec!["a", "e"]);

        let available = NodeFilter { available: true, ..Default::default() };
        assert_eq!(names(available), vec!["a", "b", "e"]);

        let issues = NodeFilter { issues: true, ..Default::default() };
        assert_eq!(names(issues), vec!["d", "e"]);

        let drain = NodeFilter { state_class: Some(NodeStateFilter::Drain), ..Default::default() };
        assert_eq!(names(drain), vec!["e"]);
    }

    #[test]
    fn test_issues_include_warnings() {
        let mut busy = node("busy", &["MIXED"]);
        busy.cpus_allocated = 1;
        let counts = HashMap::from([("busy".to_string(), 3)]);
        let filter = NodeFilter { issues: true, ..Default::default() };
        assert_eq!(filter.apply(vec![busy], &counts).len(), 1);
    }

    #[test]
    fn test_free_resource_filters() {
        let mut big = node("big", &["MIXED"]);
        big.cpus_idle = 32;
        big.memory_free = 64 * 1024;
        big.gpus.total = 4;
        big.gpus.used = 1;
        let small = node("small", &["MIXED"]);

        let filter = NodeFilter {
            min_free_cpus: Some(16),
            min_free_memory_gb: Some(64),
            min_free_gpus: Some(3),
            ..Default::default()
        };
        let kept = filter.apply(vec![big, small], &HashMap::new());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "big");
    }

    #[test]
    fn test_job_sorting() {
        let mut a = job(3, "n[1-4]", "gres/gpu=1");
        a.user_name = "carol".to_string();
        a.start_time = Some(now() - TimeDelta::hours(3));
        let mut b = job(1, "n1", "gres/gpu=4");
        b.user_name = "alice".to_string();
        b.start_time = Some(now() - TimeDelta::hours(1));
        let mut c = job(2, "n1,n2", "");
        c.user_name = "bob".to_string();

        let ids = |sort: JobSort| -> Vec<u64> {
            let mut jobs = vec![a.clone(), b.clone(), c.clone()];
            sort.sort(&mut jobs, &LocalHostList);
            jobs.iter().map(|j| j.job_id).collect()
        };

        assert_eq!(ids(JobSort::Id), vec![1, 2, 3]);
        assert_eq!(ids(JobSort::User), vec![1, 2, 3]);
        assert_eq!(ids(JobSort::StartTime), vec![1, 3, 2]);
        assert_eq!(ids(JobSort::Nodes), vec![1, 2, 3]);
        assert_eq!(ids(JobSort::Gpu), vec![1, 3, 2]);
    }
}
