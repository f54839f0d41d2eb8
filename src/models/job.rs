// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Jobs: normalization of `squeue` records, TRES parsing and time accounting.

use chrono::{Local, NaiveDateTime, TimeDelta, TimeZone};
use serde::{Serialize, Serializer};

use super::RecordError;
use crate::slurm::raw::RawJob;

const GPU_TRES: &str = "gres/gpu";
const TYPED_GPU_TRES: &str = "gres/gpu:";

/// Ordered `key=value` pairs of a TRES allocation string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TresAllocation(Vec<(String, String)>);

impl TresAllocation {
    /// Parse `cpu=4,mem=16G,gres/gpu=2`; entries without `=` are dropped.
    pub fn parse(tres: &str) -> Self {
        Self(
            tres.split(',')
                .filter_map(|entry| entry.split_once('='))
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TresAllocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// GPU count and model of a job's allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuTypeInfo {
    pub count: u32,
    /// Uppercased model, empty when the allocation is untyped
    pub gpu_type: String,
    /// `2xL40S`, `2`, or `-` without GPUs
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub job_id: u64,
    /// 0 unless the job is part of an array
    pub array_job_id: u64,
    pub name: String,
    pub user_name: String,
    pub group_name: String,
    pub account: String,
    pub partition: String,
    /// State tags, the first one is the primary state
    pub state: Vec<String>,
    /// Host-list expression of the allocated nodes
    pub nodes: String,
    pub tres_alloc_str: String,
    pub allocated_resources: TresAllocation,
    pub cpus_per_task: u32,
    pub tasks: u32,
    /// Local time, no timezone attached
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub time_limit_minutes: Option<u64>,
    pub qos: String,
    pub flags: Vec<String>,
    pub batch_host: String,
}

impl Job {
    /// Normalize a decoded record; fails when the job id is missing.
    pub fn from_raw(raw: RawJob) -> Result<Self, RecordError> {
        let job_id = raw
            .job_id
            .get()
            .filter(|&id| id > 0)
            .ok_or(RecordError::MissingJobId)?;

        let allocated_resources = TresAllocation::parse(&raw.tres_alloc_str);

        Ok(Self {
            job_id,
            array_job_id: raw.array_job_id.unwrap_or(0),
            name: raw.name,
            user_name: raw.user_name,
            group_name: raw.group_name,
            account: raw.account,
            partition: raw.partition,
            state: raw.job_state.0,
            nodes: raw.nodes,
            tres_alloc_str: raw.tres_alloc_str,
            allocated_resources,
            cpus_per_task: raw.cpus_per_task.get().filter(|&c| c > 0).unwrap_or(1),
            tasks: raw.tasks.get().filter(|&t| t > 0).unwrap_or(1),
            start_time: raw.start_time.get().and_then(local_time),
            end_time: raw.end_time.get().and_then(local_time),
            time_limit_minutes: raw.time_limit.get(),
            qos: raw.qos,
            flags: raw.flags,
            batch_host: raw.batch_host,
        })
    }

    pub fn primary_state(&self) -> &str {
        self.state.first().map_or("", String::as_str)
    }

    /// True when any state tag says so; squeue may list flags first
    pub fn is_running(&self) -> bool {
        self.has_state("RUNNING")
    }

    pub fn is_pending(&self) -> bool {
        self.has_state("PENDING")
    }

    fn has_state(&self, tag: &str) -> bool {
        self.state.iter().any(|s| s == tag)
    }

    pub fn is_array_job(&self) -> bool {
        self.array_job_id > 0
    }

    /// Abbreviated primary state as squeue prints it
    pub fn short_state(&self) -> String {
        let state = self.primary_state();
        let short = match state {
            "" => "UNK",
            "RUNNING" => "R",
            "PENDING" => "PD",
            "COMPLETED" => "CD",
            "CANCELLED" => "CA",
            "FAILED" => "F",
            "TIMEOUT" => "TO",
            "SUSPENDED" => "S",
            "CONFIGURING" => "CF",
            other => return other.chars().take(2).collect(),
        };
        short.to_string()
    }

    pub fn total_cpus(&self) -> u64 {
        self.cpus_per_task as u64 * self.tasks as u64
    }

    /// GPUs from the first `gres/gpu*` entry holding a number
    pub fn allocated_gpus(&self) -> u32 {
        self.allocated_resources
            .iter()
            .filter(|(key, _)| key.contains(GPU_TRES))
            .find_map(|(_, value)| value.parse().ok())
            .unwrap_or(0)
    }

    pub fn gpu_type_info(&self) -> GpuTypeInfo {
        let typed = self.allocated_resources.iter().find_map(|(key, value)| {
            let gpu_type = key.strip_prefix(TYPED_GPU_TRES)?;
            let count = value.parse::<u32>().ok()?;
            Some((gpu_type.to_uppercase(), count))
        });

        match typed {
            Some((gpu_type, count)) => GpuTypeInfo {
                count,
                display: format!("{}x{}", count, gpu_type),
                gpu_type,
            },
            None => {
                let count = self.allocated_gpus();
                GpuTypeInfo {
                    count,
                    gpu_type: String::new(),
                    display: if count > 0 {
                        count.to_string()
                    } else {
                        "-".to_string()
                    },
                }
            }
        }
    }

    /// Memory from the TRES `mem` entry, in GB
    pub fn allocated_memory_gb(&self) -> f64 {
        self.allocated_resources
            .get("mem")
            .and_then(parse_memory_gb)
            .unwrap_or(0.0)
    }

    pub fn elapsed_at(&self, now: NaiveDateTime) -> Option<TimeDelta> {
        let start = self.start_time?;
        Some((now - start).max(TimeDelta::zero()))
    }

    /// Minutes left of the time limit; `None` without a limit or start time
    pub fn remaining_minutes_at(&self, now: NaiveDateTime) -> Option<u64> {
        let limit = self.time_limit_minutes.filter(|&m| m > 0)?;
        let elapsed = self.elapsed_at(now)?.num_minutes().max(0) as u64;
        Some(limit.saturating_sub(elapsed))
    }

    pub fn remaining_time_display_at(&self, now: NaiveDateTime) -> String {
        format_remaining(self.remaining_minutes_at(now))
    }
}

/// `2d 3h`, `5h 10m`, `42m`, `0m`, or `-` when not applicable
pub fn format_remaining(minutes: Option<u64>) -> String {
    let Some(minutes) = minutes else {
        return "-".to_string();
    };
    if minutes < 60 {
        return format!("{}m", minutes);
    }
    if minutes < 1440 {
        let (h, m) = (minutes / 60, minutes % 60);
        return if m > 0 {
            format!("{}h {}m", h, m)
        } else {
            format!("{}h", h)
        };
    }
    let (d, h) = (minutes / 1440, (minutes % 1440) / 60);
    if h > 0 {
        format!("{}d {}h", d, h)
    } else {
        format!("{}d", d)
    }
}

/// `16G`, `500M`, `1T`, `1024K`; a bare number is MB
fn parse_memory_gb(value: &str) -> Option<f64> {
    let value = value.trim();
    let (digits, scale) = match value.chars().last()?.to_ascii_uppercase() {
        'T' => (&value[..value.len() - 1], 1024.0),
        'G' => (&value[..value.len() - 1], 1.0),
        'M' => (&value[..value.len() - 1], 1.0 / 1024.0),
        'K' => (&value[..value.len() - 1], 1.0 / (1024.0 * 1024.0)),
        _ => (value, 1.0 / 1024.0),
    };
    digits.parse::<f64>().ok().map(|n| n * scale)
}

/// Epoch seconds to local wall-clock time; 0 means "not set"
fn local_time(epoch: i64) -> Option<NaiveDateTime> {
    if epoch <= 0 {
        return None;
    }
    Local
        .timestamp_opt(epoch, 0)
        .earliest()
        .map(|dt| dt.naive_local())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    pub(crate) fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    /// Running job on `nodes` with the given TRES string
    pub(crate) fn job(job_id: u64, nodes: &str, tres: &str) -> Job {
        Job {
            job_id,
            array_job_id: 0,
            name: format!("job{}", job_id),
            user_name: "alice".to_string(),
            group_name: "users".to_string(),
            account: "hpc".to_string(),
            partition: "cpu".to_string(),
            state: vec!["RUNNING".to_string()],
            nodes: nodes.to_string(),
            tres_alloc_str: tres.to_string(),
            allocated_resources: TresAllocation::parse(tres),
            cpus_per_task: 1,
            tasks: 1,
            start_time: None,
            end_time: None,
            time_limit_minutes: None,
            qos: "normal".to_string(),
            flags: Vec::new(),
            batch_host: String::new(),
        }
    }

    fn normalize(value: Value) -> Result<Job, RecordError> {
        let raw: RawJob = serde_json::from_value(value)?;
        Job::from_raw(raw)
    }

    #[test]
    fn test_from_raw_envelopes() {
        let job = normalize(json!({
            "job_id": 4242,
            "array_job_id": {"set": true, "infinite": false, "number": 0},
            "name": "train",
            "user_name": "bob",
            "job_state": ["RUNNING", "COMPLETING"],
            "nodes": "demu4xgpu[001-002]",
            "tres_alloc_str": "cpu=8,mem=64G,node=2,billing=8,gres/gpu=4,gres/gpu:h100=4",
            "cpus_per_task": {"set": true, "infinite": false, "number": 4},
            "tasks": {"set": true, "infinite": false, "number": 2},
            "start_time": {"set": true, "infinite": false, "number": 1700000000},
            "end_time": {"set": false, "infinite": false, "number": 0},
            "time_limit": {"set": true, "infinite": false, "number": 1440},
            "flags": null
        }))
        .unwrap();

        assert_eq!(job.job_id, 4242);
        assert!(!job.is_array_job());
        assert_eq!(job.state, vec!["RUNNING", "COMPLETING"]);
        assert!(job.is_running());
        assert_eq!(job.total_cpus(), 8);
        assert!(job.start_time.is_some());
        assert!(job.end_time.is_none());
        assert_eq!(job.time_limit_minutes, Some(1440));
        assert!(job.flags.is_empty());
        assert_eq!(job.allocated_gpus(), 4);
        assert_eq!(job.gpu_type_info().display, "4xH100");
    }

    #[test]
    fn test_scalar_state_and_infinite_limit() {
        let job = normalize(json!({
            "job_id": {"set": true, "number": 7},
            "job_state": "PENDING",
            "time_limit": {"set": true, "infinite": true, "number": 0}
        }))
        .unwrap();
        assert_eq!(job.state, vec!["PENDING"]);
        assert!(job.is_pending());
        assert_eq!(job.time_limit_minutes, None);
        assert_eq!(job.cpus_per_task, 1);
        assert_eq!(job.tasks, 1);
    }

    #[test]
    fn test_running_when_any_state_tag_matches() {
        let mut j = job(3, "n1", "");
        j.state = vec!["COMPLETING".to_string(), "RUNNING".to_string()];
        assert!(j.is_running());
        assert!(!j.is_pending());
        assert_eq!(j.primary_state(), "COMPLETING");

        j.state = vec!["REQUEUED".to_string(), "PENDING".to_string()];
        assert!(j.is_pending());
        assert!(!j.is_running());
    }

    #[test]
    fn test_missing_job_id_is_rejected() {
        assert!(matches!(normalize(json!({"name": "orphan"})), Err(RecordError::MissingJobId)));
        assert!(matches!(normalize(json!({"job_id": 0})), Err(RecordError::MissingJobId)));
        assert!(matches!(normalize(json!({"job_id": "abc"})), Err(RecordError::Decode(_))));
    }

    #[test]
    fn test_tres_parsing() {
        let tres = TresAllocation::parse(" cpu = 4 ,mem=16G,garbage,gres/gpu:l40s=2");
        let pairs: Vec<_> = tres.iter().collect();
        assert_eq!(pairs, vec![("cpu", "4"), ("mem", "16G"), ("gres/gpu:l40s", "2")]);
        assert_eq!(tres.get("mem"), Some("16G"));
        assert!(TresAllocation::parse("").is_empty());
    }

    #[test]
    fn test_gpu_type_info() {
        let typed = job(1, "n1", "cpu=4,mem=16G,gres/gpu:l40s=2");
        assert_eq!(
            typed.gpu_type_info(),
            GpuTypeInfo { count: 2, gpu_type: "L40S".to_string(), display: "2xL40S".to_string() }
        );

        let generic = job(2, "n1", "cpu=4,gres/gpu=3");
        assert_eq!(generic.allocated_gpus(), 3);
        assert_eq!(generic.gpu_type_info().display, "3");
        assert_eq!(generic.gpu_type_info().gpu_type, "");

        let none = job(3, "n1", "cpu=4,mem=1G");
        assert_eq!(none.allocated_gpus(), 0);
        assert_eq!(none.gpu_type_info().display, "-");
    }

    #[test]
    fn test_remaining_minutes() {
        let mut j = job(1, "n1", "");
        j.time_limit_minutes = Some(120);

        j.start_time = Some(now() - TimeDelta::minutes(90));
        assert_eq!(j.remaining_minutes_at(now()), Some(30));
        assert_eq!(j.remaining_time_display_at(now()), "30m");

        j.start_time = Some(now() - TimeDelta::minutes(200));
        assert_eq!(j.remaining_minutes_at(now()), Some(0));
        assert_eq!(j.remaining_time_display_at(now()), "0m");

        // Start in the future counts as not yet elapsed
        j.start_time = Some(now() + TimeDelta::minutes(10));
        assert_eq!(j.remaining_minutes_at(now()), Some(120));

        j.time_limit_minutes = Some(0);
        assert_eq!(j.remaining_minutes_at(now()), None);
        assert_eq!(j.remaining_time_display_at(now()), "-");

        j.time_limit_minutes = Some(60);
        j.start_time = None;
        assert_eq!(j.remaining_minutes_at(now()), None);
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(None), "-");
        assert_eq!(format_remaining(Some(0)), "0m");
        assert_eq!(format_remaining(Some(59)), "59m");
        assert_eq!(format_remaining(Some(120)), "2h");
        assert_eq!(format_remaining(Some(125)), "2h 5m");
        assert_eq!(format_remaining(Some(1440)), "1d");
        assert_eq!(format_remaining(Some(1440 * 2 + 180 + 30)), "2d 3h");
    }

    #[test]
    fn test_short_state() {
        let mut j = job(1, "", "");
        assert_eq!(j.short_state(), "R");
        j.state = vec!["CONFIGURING".to_string()];
        assert_eq!(j.short_state(), "CF");
        j.state = vec!["NODE_FAIL".to_string()];
        assert_eq!(j.short_state(), "NO");
        j.state.clear();
        assert_eq!(j.short_state(), "UNK");
    }

    #[test]
    fn test_allocated_memory_gb() {
        assert_eq!(job(1, "", "mem=16G").allocated_memory_gb(), 16.0);
        assert_eq!(job(1, "", "mem=512M").allocated_memory_gb(), 0.5);
        assert_eq!(job(1, "", "mem=2T").allocated_memory_gb(), 2048.0);
        assert_eq!(job(1, "", "mem=2048").allocated_memory_gb(), 2.0);
        assert_eq!(job(1, "", "mem=1048576K").allocated_memory_gb(), 1.0);
        assert_eq!(job(1, "", "cpu=1").allocated_memory_gb(), 0.0);
        assert_eq!(job(1, "", "mem=lots").allocated_memory_gb(), 0.0);
    }
}
