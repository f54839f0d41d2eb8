// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Compute nodes: normalization of `sinfo` records, GRES parsing, state
//! classification and per-node health warnings.

use serde::Serialize;

use super::{percent, RecordError};
use crate::slurm::raw::RawNode;

/// Marker of a GPU entry in a GRES string
const GPU_MARKER: &str = "gpu:";

/// Headroom above the allocated CPU count before load counts as high
const LOAD_HEADROOM: f64 = 4.0;

/// Memory utilization (percent) above which a node is flagged
const HIGH_MEMORY_PERCENT: f64 = 90.0;

/// Display state precedence, most severe first
const DISPLAY_PRIORITY: [&str; 6] = ["DOWN", "DRAIN", "DRNG", "MIXED", "ALLOCATED", "IDLE"];

const DRAIN_STATES: [&str; 4] = ["DRAIN", "DRNG", "DRAINING", "DRAINED"];

/// Accelerators of a node, parsed from its GRES strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GpuInfo {
    pub total: u32,
    pub used: u32,
    /// Model name as given in the GRES string (e.g. `l40s`), empty if untyped
    #[serde(rename = "type")]
    pub gpu_type: String,
}

/// A compute node as reported by one `sinfo -N` record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    /// State tags, e.g. `["IDLE", "DRAIN"]`
    pub state: Vec<String>,
    /// Partition(s) the record was listed under, `+`-joined after dedup
    pub partition_name: Option<String>,
    pub cpus_allocated: u32,
    pub cpus_idle: u32,
    pub cpus_total: u32,
    pub cpu_load: f64,
    /// Memory in MB
    pub memory_total: u64,
    pub memory_free: u64,
    pub memory_allocated: u64,
    pub sockets: u32,
    pub cores_per_socket: u32,
    pub threads_per_core: u32,
    pub gres_total: String,
    pub gres_used: String,
    pub gpus: GpuInfo,
    pub features: String,
    pub reason: String,
    pub weight: u64,
}

/// Health warning derived from a node's metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeWarning {
    HighLoad,
    HighMemory,
    Oversubscribed,
}

impl NodeWarning {
    pub fn label(self) -> &'static str {
        match self {
            NodeWarning::HighLoad => "high load",
            NodeWarning::HighMemory => "high memory",
            NodeWarning::Oversubscribed => "oversubscribed",
        }
    }
}

impl Node {
    /// Normalize a decoded record; fails only when the node has no name.
    pub fn from_raw(raw: RawNode) -> Result<Self, RecordError> {
        let name = raw
            .nodes
            .nodes
            .into_iter()
            .next()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(RecordError::MissingNodeName)?;

        let gpus = parse_gres(&raw.gres.total, &raw.gres.used);
        let topology = |value: Option<u64>| {
            value
                .and_then(|v| u32::try_from(v).ok())
                .filter(|&v| v > 0)
                .unwrap_or(1)
        };

        Ok(Self {
            name,
            state: raw.node.state.0,
            partition_name: raw.partition.name.filter(|p| !p.is_empty()),
            cpus_allocated: raw.cpus.allocated.unwrap_or(0),
            cpus_idle: raw.cpus.idle.unwrap_or(0),
            cpus_total: raw.cpus.total.unwrap_or(0),
            cpu_load: raw.cpus.load.minimum.get().map_or(0.0, |v| v as f64 / 100.0),
            memory_total: raw.memory.minimum.unwrap_or(0),
            memory_free: raw.memory.free.minimum.unwrap_or(0),
            memory_allocated: raw.memory.allocated.unwrap_or(0),
            sockets: topology(raw.sockets.minimum.get()),
            cores_per_socket: topology(raw.cores.minimum.get()),
            threads_per_core: topology(raw.threads.minimum.get()),
            gres_total: raw.gres.total,
            gres_used: raw.gres.used,
            gpus,
            features: raw.features.total,
            reason: raw
                .reason
                .map(|r| r.description().to_string())
                .unwrap_or_default(),
            weight: raw.weight.minimum.get().filter(|&w| w > 0).unwrap_or(1),
        })
    }

    pub fn has_state(&self, tag: &str) -> bool {
        self.state.iter().any(|s| s == tag)
    }

    pub fn is_idle(&self) -> bool {
        self.has_state("IDLE")
    }

    pub fn is_mixed(&self) -> bool {
        self.has_state("MIXED")
    }

    pub fn is_allocated(&self) -> bool {
        self.has_state("ALLOCATED")
    }

    /// Down, or draining with nothing left idle
    pub fn is_down(&self) -> bool {
        self.has_state("DOWN")
            || ((self.has_state("DRAIN") || self.has_state("DRNG")) && !self.is_idle())
    }

    pub fn is_draining(&self) -> bool {
        DRAIN_STATES.iter().any(|s| self.has_state(s))
    }

    /// Single state shown for the node
    pub fn display_state(&self) -> &str {
        if let Some(tag) = DISPLAY_PRIORITY.iter().find(|tag| self.has_state(tag)) {
            return tag;
        }
        self.state.first().map_or("unknown", String::as_str)
    }

    pub fn memory_used(&self) -> u64 {
        self.memory_total.saturating_sub(self.memory_free)
    }

    pub fn cpu_utilization(&self) -> f64 {
        percent(self.cpus_allocated as u64, self.cpus_total as u64)
    }

    pub fn memory_utilization(&self) -> f64 {
        percent(self.memory_used(), self.memory_total)
    }

    pub fn gpu_utilization(&self) -> f64 {
        percent(self.gpus.used as u64, self.gpus.total as u64)
    }

    /// Warnings given the number of jobs currently placed on the node
    pub fn warnings(&self, job_count: usize) -> Vec<NodeWarning> {
        let mut warnings = Vec::new();
        if self.cpu_load > self.cpus_allocated as f64 + LOAD_HEADROOM {
            warnings.push(NodeWarning::HighLoad);
        }
        if self.memory_utilization() > HIGH_MEMORY_PERCENT {
            warnings.push(NodeWarning::HighMemory);
        }
        if job_count > self.cpus_allocated as usize {
            warnings.push(NodeWarning::Oversubscribed);
        }
        warnings
    }

    pub fn has_issues(&self, job_count: usize) -> bool {
        !self.warnings(job_count).is_empty()
    }
}

/// Parse GPU counts out of the total and used GRES strings.
///
/// Only the first `gpu:<type>:<count>` entry is read, so `gpu:l40s:4(IDX:0-3)`
/// yields four `l40s` GPUs. An entry without a type counts as no GPUs.
pub fn parse_gres(total: &str, used: &str) -> GpuInfo {
    let (gpu_type, total) = first_gpu_entry(total).unwrap_or_default();
    let used = first_gpu_entry(used).map_or(0, |(_, count)| count);
    GpuInfo {
        total,
        used,
        gpu_type,
    }
}

fn first_gpu_entry(gres: &str) -> Option<(String, u32)> {
    let entry = gres.split(GPU_MARKER).nth(1)?;
    let mut parts = entry.split(':');
    let gpu_type = parts.next()?;
    let count = parts.next()?.split(['(', ',']).next()?.trim();
    Some((gpu_type.to_string(), count.parse().unwrap_or(0)))
}
