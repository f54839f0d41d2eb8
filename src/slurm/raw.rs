// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Wire format types for `sinfo --json` and `squeue --json`.
//!
//! These mirror the scheduler schema loosely: every field is optional and
//! defaults on absence, so that only structurally wrong records fail to
//! deserialize. Defaults that carry meaning (topology = 1, tasks = 1, ...)
//! are applied by the normalizers in [`crate::models`], not here.

use std::fmt;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A numeric value wrapped in Slurm's `{set, infinite, number}` envelope.
///
/// Resolves to `None` when the value is unset, infinite or `null`. Bare
/// numbers (older Slurm releases) are accepted as set values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<T>(Option<T>);

impl<T> Default for Envelope<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T: Copy> Envelope<T> {
    pub fn get(&self) -> Option<T> {
        self.0
    }

    pub fn unwrap_or(&self, default: T) -> T {
        self.0.unwrap_or(default)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EnvelopeRepr<T> {
    Wrapped {
        #[serde(default)]
        set: bool,
        #[serde(default)]
        infinite: bool,
        number: Option<T>,
    },
    Bare(T),
    Null,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Envelope<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match EnvelopeRepr::<T>::deserialize(deserializer)? {
            EnvelopeRepr::Wrapped {
                set: true,
                infinite: false,
                number,
            } => Envelope(number),
            EnvelopeRepr::Wrapped { .. } | EnvelopeRepr::Null => Envelope(None),
            EnvelopeRepr::Bare(value) => Envelope(Some(value)),
        })
    }
}

/// State tags. Newer releases send a list, older ones a single string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateList(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum StateListRepr {
    Many(Vec<String>),
    One(String),
    Null,
}

impl<'de> Deserialize<'de> for StateList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match StateListRepr::deserialize(deserializer)? {
            StateListRepr::Many(states) => StateList(states),
            StateListRepr::One(state) if state.is_empty() => StateList(Vec::new()),
            StateListRepr::One(state) => StateList(vec![state]),
            StateListRepr::Null => StateList(Vec::new()),
        })
    }
}

/// Treat an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One record of `sinfo -N --json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawNode {
    pub nodes: RawNodeNames,
    pub node: RawNodeState,
    pub partition: RawPartition,
    pub cpus: RawCpus,
    pub memory: RawMemory,
    pub sockets: RawRange,
    pub cores: RawRange,
    pub threads: RawRange,
    pub gres: RawGres,
    pub features: RawFeatures,
    pub reason: Option<RawReason>,
    pub weight: RawRange,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawNodeNames {
    pub nodes: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawNodeState {
    pub state: StateList,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawPartition {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawCpus {
    pub allocated: Envelope<u32>,
    pub idle: Envelope<u32>,
    pub total: Envelope<u32>,
    pub load: RawRange,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawMemory {
    /// Real memory of the node in MB
    pub minimum: Envelope<u64>,
    pub allocated: Envelope<u64>,
    pub free: RawMemoryFree,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawMemoryFree {
    pub minimum: Envelope<u64>,
}

/// `{minimum, maximum}` pair; `sinfo -N` reports one node per record so both
/// are equal and only `minimum` is read.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawRange {
    pub minimum: Envelope<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawGres {
    #[serde(deserialize_with = "nullable")]
    pub total: String,
    #[serde(deserialize_with = "nullable")]
    pub used: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFeatures {
    #[serde(deserialize_with = "nullable")]
    pub total: String,
}

/// Drain/down reason: a plain string or an object with a description.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawReason {
    Text(String),
    Detail {
        #[serde(default, deserialize_with = "nullable")]
        description: String,
    },
    Other(IgnoredAny),
}

impl RawReason {
    pub fn description(&self) -> &str {
        match self {
            RawReason::Text(text) => text,
            RawReason::Detail { description } => description,
            RawReason::Other(_) => "",
        }
    }
}

/// One record of `squeue --json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawJob {
    pub job_id: Envelope<u64>,
    pub array_job_id: Envelope<u64>,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub user_name: String,
    #[serde(deserialize_with = "nullable")]
    pub group_name: String,
    #[serde(deserialize_with = "nullable")]
    pub account: String,
    #[serde(deserialize_with = "nullable")]
    pub partition: String,
    pub job_state: StateList,
    #[serde(deserialize_with = "nullable")]
    pub nodes: String,
    #[serde(deserialize_with = "nullable")]
    pub tres_alloc_str: String,
    pub cpus_per_task: Envelope<u32>,
    pub tasks: Envelope<u32>,
    /// Epoch seconds
    pub start_time: Envelope<i64>,
    /// Epoch seconds
    pub end_time: Envelope<i64>,
    /// Minutes
    pub time_limit: Envelope<u64>,
    #[serde(deserialize_with = "nullable")]
    pub qos: String,
    #[serde(deserialize_with = "nullable")]
    pub flags: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub batch_host: String,
}

/// Entry of the `errors`/`warnings` arrays of a response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SlurmMessage {
    Text(String),
    Detail {
        #[serde(default, deserialize_with = "nullable")]
        description: String,
        #[serde(default, deserialize_with = "nullable")]
        error: String,
    },
}

impl fmt::Display for SlurmMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlurmMessage::Text(text) => f.write_str(text),
            SlurmMessage::Detail { description, .. } if !description.is_empty() => {
                f.write_str(description)
            }
            SlurmMessage::Detail { error, .. } if !error.is_empty() => f.write_str(error),
            SlurmMessage::Detail { .. } => f.write_str("unknown error"),
        }
    }
}

/// Common shape of the JSON documents printed by the query commands.
///
/// Records are kept as untyped values so that each one can be normalized
/// (and rejected) on its own.
pub trait SlurmResponse {
    fn errors(&self) -> &[SlurmMessage];
    fn into_records(self) -> Vec<Value>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SinfoResponse {
    pub sinfo: Vec<Value>,
    pub errors: Vec<SlurmMessage>,
}

impl SlurmResponse for SinfoResponse {
    fn errors(&self) -> &[SlurmMessage] {
        &self.errors
    }

    fn into_records(self) -> Vec<Value> {
        self.sinfo
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SqueueResponse {
    pub jobs: Vec<Value>,
    pub errors: Vec<SlurmMessage>,
}

impl SlurmResponse for SqueueResponse {
    fn errors(&self) -> &[SlurmMessage] {
        &self.errors
    }

    fn into_records(self) -> Vec<Value> {
        self.jobs
    }
}
