// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Configuration file (`config.toml`) and environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::models::cluster::{default_partition_groups, PartitionGroupRule};
use crate::ui::theme::Palette;

const CONFIG_FILE_NAME: &str = "config.toml";
const SYSTEM_CONFIG: &str = "/etc/cmon/config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub slurm: SlurmConfig,
    pub display: DisplayConfig,
    /// Prefix table for the partition utilization panel, first match wins
    pub partition_groups: Vec<PartitionGroupRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            slurm: SlurmConfig::default(),
            display: DisplayConfig::default(),
            partition_groups: default_partition_groups(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlurmConfig {
    /// Directory containing sinfo/squeue/scontrol
    pub bin_path: Option<PathBuf>,
    pub query_timeout_secs: u64,
    pub hostlist_timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for SlurmConfig {
    fn default() -> Self {
        Self {
            bin_path: None,
            query_timeout_secs: 30,
            hostlist_timeout_secs: 10,
            probe_timeout_secs: 5,
        }
    }
}

impl SlurmConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn hostlist_timeout(&self) -> Duration {
        Duration::from_secs(self.hostlist_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Common node name prefix hidden in job node lists
    pub node_prefix: String,
    pub palette: Palette,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            node_prefix: "demu4x".to_string(),
            palette: Palette::Standard,
        }
    }
}

impl Config {
    /// Load the first config file found and apply environment overrides.
    ///
    /// An explicitly given path must exist; the implicit locations are
    /// optional and fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match candidate_paths().into_iter().find(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        if let Some(bin) = std::env::var_os("CMON_SLURM_BIN").filter(|v| !v.is_empty()) {
            config.slurm.bin_path = Some(PathBuf::from(bin));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Config file not found at {}", path.display());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn validate(&self) -> Result<()> {
        let slurm = &self.slurm;
        if slurm.query_timeout_secs == 0
            || slurm.hostlist_timeout_secs == 0
            || slurm.probe_timeout_secs == 0
        {
            bail!("Slurm timeouts must be at least one second");
        }
        if let Some(group) = self.partition_groups.iter().find(|g| g.prefix.is_empty()) {
            bail!("Partition group '{}' has an empty prefix", group.name);
        }
        Ok(())
    }
}

/// `$CMON_CONFIG`, then the per-user config dir, then the system-wide file
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(path) = std::env::var_os("CMON_CONFIG").filter(|v| !v.is_empty()) {
        paths.push(PathBuf::from(path));
    }
    if let Some(dirs) = ProjectDirs::from("", "", "cmon") {
        paths.push(dirs.config_dir().join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(SYSTEM_CONFIG));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.slurm.query_timeout(), Duration::from_secs(30));
        assert_eq!(config.slurm.hostlist_timeout(), Duration::from_secs(10));
        assert_eq!(config.slurm.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.display.node_prefix, "demu4x");
        assert_eq!(config.partition_groups.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
            [slurm]
            bin_path = "/opt/slurm/bin"
            query_timeout_secs = 60

            [display]
            palette = "neon"
            "#,
        )
        .unwrap();
        assert_eq!(config.slurm.bin_path, Some(PathBuf::from("/opt/slurm/bin")));
        assert_eq!(config.slurm.query_timeout_secs, 60);
        assert_eq!(config.slurm.probe_timeout_secs, 5);
        assert_eq!(config.display.palette, Palette::Neon);
        assert_eq!(config.display.node_prefix, "demu4x");
        assert_eq!(config.partition_groups.len(), 4);
    }

    #[test]
    fn test_parse_partition_groups_replace_defaults() {
        let config = Config::parse(
            r#"
            [[partition_groups]]
            name = "Compute"
            prefix = "c"
            "#,
        )
        .unwrap();
        assert_eq!(config.partition_groups.len(), 1);
        assert_eq!(config.partition_groups[0].name, "Compute");
        assert_eq!(config.partition_groups[0].prefix, "c");
    }

    #[test]
    fn test_invalid_config() {
        assert!(Config::parse("[slurm]\nquery_timeout_secs = \"soon\"").is_err());
        assert!(Config::parse("[display]\npalette = \"rainbow\"").is_err());

        let mut config = Config::default();
        config.slurm.probe_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.partition_groups[0].prefix.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Config::from_file(Path::new("/nonexistent/cmon.toml")).is_err());
    }
}
