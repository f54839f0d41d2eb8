// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Cluster-wide aggregates: node deduplication, partition group rollups and
//! job-to-node association.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::hostlist::HostListExpander;
use super::job::Job;
use super::node::Node;
use super::percent;

/// Node name prefix that assigns a node to a partition group
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartitionGroupRule {
    pub name: String,
    pub prefix: String,
}

impl PartitionGroupRule {
    fn new(name: &str, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
        }
    }
}

pub fn default_partition_groups() -> Vec<PartitionGroupRule> {
    vec![
        PartitionGroupRule::new("CPU Nodes", "demu4xcpu"),
        PartitionGroupRule::new("Fat Nodes", "demu4xfat"),
        PartitionGroupRule::new("GPU Nodes", "demu4xgpu"),
        PartitionGroupRule::new("VDI Nodes", "demu4xvdi"),
    ]
}

/// Resource totals of one partition group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub name: String,
    pub node_count: usize,
    pub cpu_total: u64,
    pub cpu_allocated: u64,
    /// MB
    pub memory_total: u64,
    pub memory_allocated: u64,
    pub gpu_total: u64,
    pub gpu_used: u64,
    pub gpu_types: BTreeSet<String>,
}

impl GroupStats {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            node_count: 0,
            cpu_total: 0,
            cpu_allocated: 0,
            memory_total: 0,
            memory_allocated: 0,
            gpu_total: 0,
            gpu_used: 0,
            gpu_types: BTreeSet::new(),
        }
    }

    fn add(&mut self, node: &Node) {
        self.node_count += 1;
        self.cpu_total += node.cpus_total as u64;
        self.cpu_allocated += node.cpus_allocated as u64;
        self.memory_total += node.memory_total;
        self.memory_allocated += node.memory_allocated;
        self.gpu_total += node.gpus.total as u64;
        self.gpu_used += node.gpus.used as u64;
        if !node.gpus.gpu_type.is_empty() {
            self.gpu_types.insert(node.gpus.gpu_type.clone());
        }
    }

    pub fn cpu_utilization(&self) -> f64 {
        percent(self.cpu_allocated, self.cpu_total)
    }

    pub fn memory_utilization(&self) -> f64 {
        percent(self.memory_allocated, self.memory_total)
    }

    pub fn gpu_utilization(&self) -> f64 {
        percent(self.gpu_used, self.gpu_total)
    }
}

/// Snapshot of nodes and jobs taken at one point in time
#[derive(Debug, Clone, Serialize)]
pub struct ClusterStatus {
    pub timestamp: NaiveDateTime,
    pub nodes: Vec<Node>,
    pub jobs: Vec<Job>,
}

impl ClusterStatus {
    pub fn new(nodes: Vec<Node>, jobs: Vec<Job>) -> Self {
        Self::with_timestamp(nodes, jobs, Local::now().naive_local())
    }

    pub fn with_timestamp(nodes: Vec<Node>, jobs: Vec<Job>, timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            nodes,
            jobs,
        }
    }

    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn idle_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_idle()).count()
    }

    pub fn mixed_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_mixed()).count()
    }

    pub fn allocated_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_allocated()).count()
    }

    pub fn down_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_down()).count()
    }

    pub fn total_cpus(&self) -> u64 {
        self.nodes.iter().map(|n| n.cpus_total as u64).sum()
    }

    pub fn allocated_cpus(&self) -> u64 {
        self.nodes.iter().map(|n| n.cpus_allocated as u64).sum()
    }

    pub fn cpu_utilization(&self) -> f64 {
        percent(self.allocated_cpus(), self.total_cpus())
    }

    pub fn total_gpus(&self) -> u64 {
        self.nodes.iter().map(|n| n.gpus.total as u64).sum()
    }

    pub fn used_gpus(&self) -> u64 {
        self.nodes.iter().map(|n| n.gpus.used as u64).sum()
    }

    pub fn gpu_utilization(&self) -> f64 {
        percent(self.used_gpus(), self.total_gpus())
    }

    pub fn total_jobs(&self) -> usize {
        self.jobs.len()
    }

    pub fn running_jobs(&self) -> usize {
        self.jobs.iter().filter(|j| j.is_running()).count()
    }

    pub fn pending_jobs(&self) -> usize {
        self.jobs.iter().filter(|j| j.is_pending()).count()
    }

    /// Rollups per partition group, in rule order, empty groups omitted.
    ///
    /// A node counts once per group even when listed under several
    /// partitions.
    pub fn partition_groups(&self, rules: &[PartitionGroupRule]) -> Vec<GroupStats> {
        let mut groups: Vec<GroupStats> = rules.iter().map(|r| GroupStats::empty(&r.name)).collect();
        let mut seen: Vec<HashSet<&str>> = vec![HashSet::new(); rules.len()];

        for node in &self.nodes {
            let Some(index) = rules.iter().position(|r| node.name.starts_with(&r.prefix)) else {
                continue;
            };
            if seen[index].insert(node.name.as_str()) {
                groups[index].add(node);
            }
        }

        groups.retain(|g| g.node_count > 0);
        groups
    }

    /// Nodes collapsed by name, see [`dedup_nodes`]
    pub fn unique_nodes(&self) -> Vec<Node> {
        dedup_nodes(&self.nodes)
    }

    /// Jobs placed on each host, from the fully expanded job host lists
    pub fn jobs_by_node(&self, hosts: &dyn HostListExpander) -> HashMap<String, Vec<&Job>> {
        let mut by_node: HashMap<String, Vec<&Job>> = HashMap::new();
        for job in &self.jobs {
            let mut seen = HashSet::new();
            for host in hosts.expand(&job.nodes) {
                if seen.insert(host.clone()) {
                    by_node.entry(host).or_default().push(job);
                }
            }
        }
        by_node
    }

    pub fn job_counts(&self, hosts: &dyn HostListExpander) -> HashMap<String, usize> {
        self.jobs_by_node(hosts)
            .into_iter()
            .map(|(host, jobs)| (host, jobs.len()))
            .collect()
    }
}

/// Collapse nodes by name in first-occurrence order, joining the distinct
/// partition names with `+`.
pub fn dedup_nodes(nodes: &[Node]) -> Vec<Node> {
    let mut unique: Vec<Node> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for node in nodes {
        match index.get(node.name.as_str()) {
            Some(&i) => merge_partition(&mut unique[i], node.partition_name.as_deref()),
            None => {
                index.insert(node.name.as_str(), unique.len());
                unique.push(node.clone());
            }
        }
    }

    unique
}

fn merge_partition(existing: &mut Node, partition: Option<&str>) {
    let Some(partition) = partition else {
        return;
    };
    match &mut existing.partition_name {
        Some(names) => {
            if !names.split('+').any(|p| p == partition) {
                names.push('+');
                names.push_str(partition);
            }
        }
        None => existing.partition_name = Some(partition.to_string()),
    }
}
