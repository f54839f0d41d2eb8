// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! JSON and CSV exports.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{Job, Node};

const NODE_CSV_HEADERS: [&str; 9] = [
    "Node",
    "State",
    "CPUs_Allocated",
    "CPUs_Total",
    "Memory_Used_MB",
    "Memory_Total_MB",
    "GPU_Used",
    "GPU_Total",
    "Jobs",
];

/// Document written by `status --format json`
#[derive(Debug, Serialize)]
pub struct StatusExport<'a> {
    pub timestamp: NaiveDateTime,
    pub nodes: &'a [Node],
    pub jobs: &'a [Job],
}

/// Pretty-printed JSON
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize JSON")
}

/// One row per node; `job_counts` maps host names to their job count
pub fn nodes_csv(nodes: &[Node], job_counts: &HashMap<String, usize>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(NODE_CSV_HEADERS)?;

    for node in nodes {
        writer.write_record([
            node.name.clone(),
            node.state.join("|"),
            node.cpus_allocated.to_string(),
            node.cpus_total.to_string(),
            node.memory_used().to_string(),
            node.memory_total.to_string(),
            node.gpus.used.to_string(),
            node.gpus.total.to_string(),
            job_counts.get(&node.name).copied().unwrap_or(0).to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| err.into_error())
        .context("Failed to flush CSV")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

pub fn write_export(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::tests::{job, now};
    use crate::models::node::tests::node;
    use serde_json::Value;

    fn busy_node() -> Node {
        let mut n = node("demu4xgpu001", &["MIXED", "DRAIN"]);
        n.cpus_allocated = 16;
        n.cpus_total = 64;
        n.memory_total = 256_000;
        n.memory_free = 56_000;
        n.gpus.total = 4;
        n.gpus.used = 2;
        n
    }

    #[test]
    fn test_nodes_csv() {
        let counts = HashMap::from([("demu4xgpu001".to_string(), 3)]);
        let csv = nodes_csv(&[busy_node(), node("idle01", &["IDLE"])], &counts).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Node,State,CPUs_Allocated,CPUs_Total,Memory_Used_MB,Memory_Total_MB,GPU_Used,GPU_Total,Jobs"
        );
        assert_eq!(lines[1], "demu4xgpu001,MIXED|DRAIN,16,64,200000,256000,2,4,3");
        assert!(lines[2].starts_with("idle01,IDLE,"));
        assert!(lines[2].ends_with(",0"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_status_json_layout() {
        let nodes = vec![busy_node()];
        let jobs = vec![job(7, "demu4xgpu001", "cpu=4,gres/gpu:l40s=1")];
        let export = StatusExport {
            timestamp: now(),
            nodes: &nodes,
            jobs: &jobs,
        };
        let text = to_json(&export).unwrap();
        assert!(text.contains('\n'));

        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["timestamp"], "2024-03-01T12:00:00");
        assert_eq!(value["nodes"][0]["name"], "demu4xgpu001");
        assert_eq!(value["nodes"][0]["gpus"]["type"], "");
        assert_eq!(value["jobs"][0]["job_id"], 7);
        assert_eq!(value["jobs"][0]["allocated_resources"]["gres/gpu:l40s"], "1");
    }

    #[test]
    fn test_write_export() {
        let path = std::env::temp_dir().join(format!("cmon-export-{}.json", std::process::id()));
        write_export(&path, "[]").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        fs::remove_file(&path).unwrap();

        let missing = Path::new("/nonexistent-dir/cmon/out.json");
        let err = write_export(missing, "[]").unwrap_err();
        assert!(err.to_string().contains("/nonexistent-dir/cmon/out.json"));
    }
}
