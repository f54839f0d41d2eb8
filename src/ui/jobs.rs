// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Jobs table with width-dependent layouts.

use std::io::{self, Write};
use std::str::FromStr;

use chrono::NaiveDateTime;
use ratatui::style::Style;
use ratatui::text::{Line, Text};

use super::format::{clip, format_elapsed, shorten_node_list, truncate};
use super::print::{BoxedTable, Column, Printer};
use super::theme::Theme;
use crate::error::ValidationError;
use crate::models::Job;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobColumn {
    JobId,
    User,
    Account,
    State,
    Partition,
    Name,
    Cpus,
    Gpus,
    Time,
    Remaining,
    Nodes,
}

impl JobColumn {
    pub const ALL: [JobColumn; 11] = [
        JobColumn::JobId,
        JobColumn::User,
        JobColumn::Account,
        JobColumn::State,
        JobColumn::Partition,
        JobColumn::Name,
        JobColumn::Cpus,
        JobColumn::Gpus,
        JobColumn::Time,
        JobColumn::Remaining,
        JobColumn::Nodes,
    ];

    pub fn header(self, layout: TableLayout) -> &'static str {
        match self {
            JobColumn::JobId => "Job ID",
            JobColumn::User => "User",
            JobColumn::Account => "Account",
            JobColumn::State => "State",
            JobColumn::Partition if layout == TableLayout::Narrow => "Part",
            JobColumn::Partition => "Partition",
            JobColumn::Name => "Name",
            JobColumn::Cpus => "CPUs",
            JobColumn::Gpus => "GPUs",
            JobColumn::Time => "Time",
            JobColumn::Remaining => "Remaining",
            JobColumn::Nodes => "Nodes",
        }
    }
}

impl FromStr for JobColumn {
    type Err = ValidationError;

    /// Case-insensitive, spaces ignored: `Job ID`, `jobid` and `id` all work
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_lowercase();
        Ok(match key.as_str() {
            "jobid" | "id" => JobColumn::JobId,
            "user" => JobColumn::User,
            "account" => JobColumn::Account,
            "state" => JobColumn::State,
            "partition" | "part" => JobColumn::Partition,
            "name" => JobColumn::Name,
            "cpus" => JobColumn::Cpus,
            "gpus" => JobColumn::Gpus,
            "time" => JobColumn::Time,
            "remaining" => JobColumn::Remaining,
            "nodes" => JobColumn::Nodes,
            _ => {
                return Err(ValidationError::UnknownColumn {
                    name: s.trim().to_string(),
                    available: JobColumn::ALL
                        .iter()
                        .map(|c| c.header(TableLayout::Wide))
                        .collect::<Vec<_>>()
                        .join(", "),
                })
            }
        })
    }
}

/// Parse a `--columns` list such as `id,user,gpus`
pub fn parse_columns(raw: &str) -> Result<Vec<JobColumn>, ValidationError> {
    let mut columns = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let column = name.parse()?;
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    if columns.is_empty() {
        return Err(ValidationError::NoColumns);
    }
    Ok(columns)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    Narrow,
    Medium,
    Wide,
}

impl TableLayout {
    pub fn for_width(width: u16, compact: bool) -> Self {
        if compact || width < 80 {
            TableLayout::Narrow
        } else if width < 120 {
            TableLayout::Medium
        } else {
            TableLayout::Wide
        }
    }

    /// Default columns with their minimum widths; `Name` is sized separately
    fn columns(self) -> &'static [(JobColumn, u16)] {
        use JobColumn::*;
        match self {
            TableLayout::Narrow => &[
                (JobId, 6),
                (User, 4),
                (Name, 0),
                (State, 3),
                (Partition, 4),
                (Gpus, 4),
                (Time, 5),
                (Nodes, 8),
            ],
            TableLayout::Medium => &[
                (JobId, 7),
                (User, 4),
                (Account, 6),
                (State, 4),
                (Partition, 7),
                (Name, 0),
                (Cpus, 4),
                (Gpus, 7),
                (Time, 5),
                (Remaining, 7),
                (Nodes, 8),
            ],
            TableLayout::Wide => &[
                (JobId, 8),
                (User, 8),
                (Account, 10),
                (State, 8),
                (Partition, 10),
                (Name, 0),
                (Cpus, 6),
                (Gpus, 10),
                (Time, 10),
                (Remaining, 10),
                (Nodes, 15),
            ],
        }
    }

    /// Bounds of the name column
    fn name_bounds(self) -> (usize, usize) {
        match self {
            TableLayout::Narrow => (8, 20),
            TableLayout::Medium => (10, 25),
            TableLayout::Wide => (12, 35),
        }
    }

    /// Requested columns in layout order, unknown-to-layout ones appended
    fn select(self, requested: Option<&[JobColumn]>) -> Vec<(JobColumn, u16)> {
        let defaults = self.columns();
        let Some(requested) = requested else {
            return defaults.to_vec();
        };
        let mut selected: Vec<(JobColumn, u16)> = defaults
            .iter()
            .filter(|(column, _)| requested.contains(column))
            .copied()
            .collect();
        for column in requested {
            if !selected.iter().any(|(c, _)| c == column) {
                selected.push((*column, 0));
            }
        }
        selected
    }
}

/// Presentation settings of the jobs table
#[derive(Debug, Clone)]
pub struct JobsView {
    pub layout: TableLayout,
    pub columns: Option<Vec<JobColumn>>,
    /// `R` instead of `RUNNING`
    pub short_state: bool,
    /// Shown as `me` in the user column
    pub current_user: Option<String>,
    /// Stripped from node names
    pub node_prefix: String,
    pub now: NaiveDateTime,
}

pub fn print_jobs<W: Write>(
    printer: &mut Printer<W>,
    jobs: &[Job],
    view: &JobsView,
    theme: &Theme,
) -> io::Result<()> {
    if jobs.is_empty() {
        return printer.line(Line::styled("No jobs found", theme.warning()));
    }

    printer.table(jobs_table(jobs, view, theme))?;

    if !view.node_prefix.is_empty() {
        printer.line(Line::styled(
            format!(
                "Note: Node names are shortened (full name: {}{{shown}})",
                view.node_prefix
            ),
            theme.dim(),
        ))?;
    }
    Ok(())
}

pub fn jobs_table<'a>(jobs: &[Job], view: &JobsView, theme: &Theme) -> BoxedTable<'a> {
    let layout = view.layout;
    let name_width = name_width(jobs, layout);
    let selected = layout.select(view.columns.as_deref());

    let columns = selected
        .iter()
        .map(|&(column, min)| {
            let base = Column::new(column.header(layout)).min(min);
            if column == JobColumn::Name {
                let width = u16::try_from(name_width).unwrap_or(u16::MAX);
                base.min(width).max(width)
            } else {
                base
            }
        })
        .collect();

    let mut table = BoxedTable::new(columns).header_style(theme.bold().fg(theme.colors.warning));

    for job in jobs {
        let row = selected
            .iter()
            .map(|&(column, _)| cell(job, column, view, name_width, theme))
            .collect();
        table.push_row(row);
    }

    table
}

/// Longest job name, within the layout's bounds
fn name_width(jobs: &[Job], layout: TableLayout) -> usize {
    let (min, max) = layout.name_bounds();
    match jobs.iter().map(|j| j.name.chars().count()).max() {
        Some(longest) => longest.clamp(min, max),
        None => min,
    }
}

fn styled(text: String, style: Style) -> Text<'static> {
    Text::from(Line::styled(text, style))
}

fn cell(job: &Job, column: JobColumn, view: &JobsView, name_width: usize, theme: &Theme) -> Text<'static> {
    let narrow = view.layout == TableLayout::Narrow;

    match column {
        JobColumn::JobId => {
            let id = job.job_id.to_string();
            if job.is_array_job() {
                styled(id, theme.info())
            } else {
                Text::from(id)
            }
        }
        JobColumn::User => {
            if view.current_user.as_deref() == Some(job.user_name.as_str()) {
                Text::from("me")
            } else {
                Text::from(job.user_name.clone())
            }
        }
        JobColumn::Account => {
            let account = if job.account.is_empty() { "-" } else { job.account.as_str() };
            if view.layout == TableLayout::Medium {
                Text::from(clip(account, 8))
            } else {
                Text::from(account.to_string())
            }
        }
        JobColumn::State => {
            let state = if view.short_state {
                job.short_state()
            } else if job.state.is_empty() {
                "UNK".to_string()
            } else {
                job.primary_state().to_string()
            };
            let style = match state.as_str() {
                "R" | "RUNNING" => theme.success(),
                "PD" | "PENDING" => theme.warning(),
                "F" | "FAILED" | "CA" | "CANCELLED" | "TO" | "TIMEOUT" => theme.danger(),
                _ => Style::default(),
            };
            styled(state, style)
        }
        JobColumn::Partition => {
            let style = match job.partition.as_str() {
                "cpu" => theme.primary(),
                "gpu" => theme.success(),
                "fat" => theme.accent(),
                "vdi" => theme.info(),
                _ => Style::default(),
            };
            let text = if narrow {
                clip(&job.partition, 4)
            } else {
                job.partition.clone()
            };
            styled(text, style)
        }
        JobColumn::Name => Text::from(truncate(&job.name, name_width)),
        JobColumn::Cpus => Text::from(job.total_cpus().to_string()),
        JobColumn::Gpus => {
            let gpus = job.gpu_type_info();
            if gpus.count == 0 {
                return Text::from("-");
            }
            let style = if gpus.gpu_type.contains("L40S") {
                theme.success()
            } else if gpus.gpu_type.contains("B200") {
                theme.danger()
            } else {
                theme.accent()
            };
            let text = if narrow {
                gpus.count.to_string()
            } else {
                gpus.display
            };
            styled(text, style)
        }
        JobColumn::Time => Text::from(format_elapsed(job.elapsed_at(view.now))),
        JobColumn::Remaining => {
            let minutes = job.remaining_minutes_at(view.now);
            let style = match minutes {
                Some(m) if m < 60 => theme.danger(),
                Some(m) if m < 180 => theme.warning(),
                _ => Style::default(),
            };
            styled(job.remaining_time_display_at(view.now), style)
        }
        JobColumn::Nodes => {
            let nodes = shorten_node_list(&job.nodes, &view.node_prefix);
            if narrow {
                Text::from(clip(&nodes, 10))
            } else {
                Text::from(nodes)
            }
        }
    }
}
