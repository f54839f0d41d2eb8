// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Normalized cluster model built from raw scheduler records.
//!
//! Each record is normalized on its own: a record that fails is reported as
//! a [`MalformedRecord`] and the rest of the batch goes through.

pub mod cluster;
pub mod hostlist;
pub mod job;
pub mod node;

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub use cluster::{ClusterStatus, GroupStats};
pub use job::Job;
pub use node::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Node,
    Job,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Node => f.write_str("node"),
            RecordKind::Job => f.write_str("job"),
        }
    }
}

/// Why a single record could not be normalized
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record is not an object")]
    NotAnObject,
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
    #[error("record has no node name")]
    MissingNodeName,
    #[error("record has no job id")]
    MissingJobId,
}

/// A record skipped during normalization
#[derive(Debug, Error)]
#[error("skipped malformed {kind} record #{index}{}: {reason}", label(.name))]
pub struct MalformedRecord {
    pub kind: RecordKind,
    /// Position in the scheduler response
    pub index: usize,
    /// Node name or job id, when it could be recovered
    pub name: Option<String>,
    pub reason: RecordError,
}

fn label(name: &Option<String>) -> String {
    name.as_ref().map(|n| format!(" ({})", n)).unwrap_or_default()
}

/// Outcome of normalizing one batch of records
#[derive(Debug)]
pub struct Normalized<T> {
    pub items: Vec<T>,
    pub skipped: Vec<MalformedRecord>,
}

impl<T> Normalized<T> {
    /// The good records; every skipped one is logged as a warning.
    pub fn into_items(self) -> Vec<T> {
        for record in &self.skipped {
            warn!("{}", record);
        }
        self.items
    }
}

pub fn normalize_nodes(records: Vec<Value>) -> Normalized<Node> {
    normalize_batch(records, RecordKind::Node, node_name, Node::from_raw)
}

pub fn normalize_jobs(records: Vec<Value>) -> Normalized<Job> {
    normalize_batch(records, RecordKind::Job, job_label, Job::from_raw)
}

fn normalize_batch<R, T>(
    records: Vec<Value>,
    kind: RecordKind,
    identify: fn(&Value) -> Option<String>,
    build: fn(R) -> Result<T, RecordError>,
) -> Normalized<T>
where
    R: DeserializeOwned,
{
    let mut batch = Normalized {
        items: Vec::with_capacity(records.len()),
        skipped: Vec::new(),
    };

    for (index, record) in records.into_iter().enumerate() {
        let name = identify(&record);
        let result = if record.is_object() {
            serde_json::from_value::<R>(record)
                .map_err(RecordError::from)
                .and_then(build)
        } else {
            Err(RecordError::NotAnObject)
        };

        match result {
            Ok(item) => batch.items.push(item),
            Err(reason) => batch.skipped.push(MalformedRecord {
                kind,
                index,
                name,
                reason,
            }),
        }
    }

    batch
}

fn node_name(record: &Value) -> Option<String> {
    record
        .pointer("/nodes/nodes/0")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

fn job_label(record: &Value) -> Option<String> {
    let id = record.get("job_id")?;
    id.as_u64()
        .or_else(|| id.get("number").and_then(Value::as_u64))
        .map(|id| id.to_string())
}

/// `part` as a percentage of `whole`, 0 when `whole` is 0
pub(crate) fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
