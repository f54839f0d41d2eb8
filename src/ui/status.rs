// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Cluster status output: summary panel, partition utilization panel and
//! the node table.

use std::collections::HashMap;
use std::io::{self, Write};

use ratatui::layout::Alignment;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph};

use super::format::{format_memory, group_thousands, utilization_bar};
use super::print::{BoxedTable, Column, Printer};
use super::theme::Theme;
use crate::filter::ViewConfig;
use crate::models::{ClusterStatus, GroupStats, Job, Node};

const BAR_WIDTH: usize = 20;

/// Jobs listed per node in the detailed view
const JOBS_PER_NODE: usize = 3;

/// Everything the status screen needs besides the cluster itself
pub struct StatusOptions<'a> {
    pub view: ViewConfig,
    /// Show only nodes that are down or have warnings
    pub issues_only: bool,
    pub groups: &'a [GroupStats],
    pub jobs_by_node: &'a HashMap<String, Vec<&'a Job>>,
}

pub fn print_cluster_status<W: Write>(
    printer: &mut Printer<W>,
    cluster: &ClusterStatus,
    options: &StatusOptions<'_>,
    theme: &Theme,
) -> io::Result<()> {
    let width = printer.width();

    if options.view.show_summary {
        let (panel, height) = summary_panel(cluster, theme);
        printer.render(panel, width, height)?;
        printer.blank()?;
    }

    if options.view.show_partitions {
        let (panel, height) = partition_panel(options.groups, theme);
        printer.render(panel, width, height)?;
        printer.blank()?;
    }

    let table = nodes_table(
        &cluster.unique_nodes(),
        options.jobs_by_node,
        options.view,
        options.issues_only,
        theme,
    );
    printer.table(table)
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Blue))
        .title(title)
        .padding(Padding::new(2, 2, 1, 1))
}

/// Panel height for `lines` lines of content: borders plus padding
fn panel_height(lines: usize) -> u16 {
    u16::try_from(lines + 4).unwrap_or(u16::MAX)
}

pub fn summary_panel(cluster: &ClusterStatus, theme: &Theme) -> (Paragraph<'static>, u16) {
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Cluster Overview", theme.bold()),
            Span::raw(format!(" (as of {})", cluster.timestamp.format("%H:%M:%S"))),
        ]),
        Line::default(),
        Line::from(vec![
            Span::styled("Nodes:", theme.fg(Color::Green)),
            Span::raw(format!(
                " {} total • {} idle • {} mixed • {} allocated • ",
                cluster.total_nodes(),
                cluster.idle_nodes(),
                cluster.mixed_nodes(),
                cluster.allocated_nodes()
            )),
            Span::styled(format!("{} down", cluster.down_nodes()), theme.fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::styled("CPUs:", theme.fg(Color::Blue)),
            Span::raw(format!(
                " {}/{} cores ({:.1}% utilized)",
                group_thousands(cluster.allocated_cpus()),
                group_thousands(cluster.total_cpus()),
                cluster.cpu_utilization()
            )),
        ]),
        Line::from(vec![
            Span::styled("Jobs:", theme.fg(Color::Yellow)),
            Span::raw(format!(
                " {} total • {} running • {} pending",
                cluster.total_jobs(),
                cluster.running_jobs(),
                cluster.pending_jobs()
            )),
        ]),
    ];

    if cluster.total_gpus() > 0 {
        lines.push(Line::from(vec![
            Span::styled("GPUs:", theme.fg(Color::Magenta)),
            Span::raw(format!(
                " {}/{} ({:.1}% utilized)",
                cluster.used_gpus(),
                cluster.total_gpus(),
                cluster.gpu_utilization()
            )),
        ]));
    }

    let height = panel_height(lines.len());
    (Paragraph::new(lines).block(panel_block("Cluster Status")), height)
}

pub fn partition_panel(groups: &[GroupStats], theme: &Theme) -> (Paragraph<'static>, u16) {
    let block = panel_block("Partition Utilization");

    if groups.is_empty() {
        let paragraph = Paragraph::new(Line::styled("No partition data available", theme.dim()))
            .alignment(Alignment::Center)
            .block(block);
        return (paragraph, panel_height(1));
    }

    let mut lines = Vec::new();
    for group in groups {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::styled(
            format!("{} ({}):", group.name, group.node_count),
            theme.bold(),
        ));
        lines.push(resource_line(
            "CPUs",
            group.cpu_allocated,
            group.cpu_total,
            group.cpu_utilization(),
            "",
            theme,
        ));
        lines.push(resource_line(
            "Memory",
            group.memory_allocated / 1024,
            group.memory_total / 1024,
            group.memory_utilization(),
            "GB",
            theme,
        ));
        if group.gpu_total > 0 {
            let types = group
                .gpu_types
                .iter()
                .map(|t| t.to_uppercase())
                .collect::<Vec<_>>()
                .join("/");
            lines.push(resource_line(
                "GPUs",
                group.gpu_used,
                group.gpu_total,
                group.gpu_utilization(),
                &types,
                theme,
            ));
        }
    }

    let height = panel_height(lines.len());
    (Paragraph::new(lines).block(block), height)
}

/// `  CPUs:    ████░░░ 45% (1,234/2,048)`
fn resource_line(
    label: &str,
    used: u64,
    total: u64,
    percent: f64,
    unit: &str,
    theme: &Theme,
) -> Line<'static> {
    let unit = if unit.is_empty() {
        String::new()
    } else {
        format!(" {}", unit)
    };
    Line::from(vec![
        Span::raw(format!("  {:<8} ", format!("{}:", label))),
        Span::styled(utilization_bar(percent, BAR_WIDTH), theme.load(percent, 50.0, 80.0)),
        Span::raw(format!(
            " {:>3.0}% ({}/{}{})",
            percent,
            group_thousands(used),
            group_thousands(total),
            unit
        )),
    ])
}

/// Symbol and color for a node's state
fn state_style(node: &Node) -> (&'static str, Color) {
    if node.is_down() {
        ("○", Color::Red)
    } else if node.is_idle() {
        if node.is_draining() {
            ("○", Color::Yellow)
        } else {
            ("●", Color::Green)
        }
    } else if node.is_mixed() {
        ("●", Color::Yellow)
    } else {
        ("●", Color::Blue)
    }
}

/// Red above 90%, yellow above 70%
fn usage_color(percent: f64) -> Color {
    if percent > 90.0 {
        Color::Red
    } else if percent > 70.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

pub fn nodes_table<'a>(
    nodes: &[Node],
    jobs_by_node: &HashMap<String, Vec<&Job>>,
    view: ViewConfig,
    issues_only: bool,
    theme: &Theme,
) -> BoxedTable<'a> {
    let mut columns = vec![
        Column::new("Node").min(12),
        Column::new("State").min(8),
        Column::new("CPU").min(10),
        Column::new("Memory").min(12),
    ];
    if view.show_gpus {
        columns.push(Column::new("GPU").min(10));
    }
    if view.show_details {
        columns.push(Column::new("Jobs").min(15));
        columns.push(Column::new("Load").min(8));
    } else {
        columns.push(Column::new("Jobs").min(8));
    }

    let mut table = BoxedTable::new(columns)
        .header_style(theme.bold().fg(Color::Blue))
        .border_style(theme.fg(Color::Blue));

    let no_jobs = Vec::new();
    for node in nodes {
        let node_jobs = jobs_by_node.get(&node.name).unwrap_or(&no_jobs);
        let warnings = node.warnings(node_jobs.len());
        if issues_only && warnings.is_empty() && !node.is_down() {
            continue;
        }
        let markers = "⚠".repeat(warnings.len());

        let (symbol, color) = state_style(node);
        let mut row = vec![
            Text::from(node.name.clone()),
            Text::from(Line::styled(
                format!("{} {}", symbol, node.display_state()),
                theme.fg(color),
            )),
            Text::from(Line::styled(
                format!("{}/{}", node.cpus_allocated, node.cpus_total),
                theme.fg(usage_color(node.cpu_utilization())),
            )),
            Text::from(Line::styled(
                format!("{}/{}", format_memory(node.memory_used()), format_memory(node.memory_total)),
                theme.fg(usage_color(node.memory_utilization())),
            )),
        ];

        if view.show_gpus {
            row.push(gpu_cell(node, theme));
        }

        let mut jobs = jobs_cell(node_jobs, view.show_details);
        if view.show_details {
            row.push(jobs);
            let mut load = format!("{:.2}", node.cpu_load);
            if !markers.is_empty() {
                load.push(' ');
                load.push_str(&markers);
            }
            row.push(Text::from(load));
        } else {
            if !markers.is_empty() {
                if let Some(line) = jobs.lines.last_mut() {
                    line.spans.push(Span::raw(format!(" {}", markers)));
                }
            }
            row.push(jobs);
        }

        table.push_row(row);
    }

    table
}

fn gpu_cell(node: &Node, theme: &Theme) -> Text<'static> {
    let gpus = &node.gpus;
    if gpus.total == 0 {
        return Text::from("-");
    }
    let mut text = format!("{}/{}", gpus.used, gpus.total);
    if !gpus.gpu_type.is_empty() {
        text.push(' ');
        text.push_str(&gpus.gpu_type);
    }
    let color = if gpus.used >= gpus.total {
        Color::Red
    } else if gpus.used > 0 {
        Color::Yellow
    } else {
        Color::Green
    };
    Text::from(Line::styled(text, theme.fg(color)))
}

fn jobs_cell(jobs: &[&Job], detailed: bool) -> Text<'static> {
    if jobs.is_empty() {
        return Text::from("-");
    }
    if !detailed {
        return Text::from(format!("{} jobs", jobs.len()));
    }

    let mut lines: Vec<Line<'static>> = jobs
        .iter()
        .take(JOBS_PER_NODE)
        .map(|job| {
            let gpus = job.allocated_gpus();
            if gpus > 0 {
                Line::from(format!("{} {} (GPU:{})", job.job_id, job.user_name, gpus))
            } else {
                Line::from(format!("{} {}", job.job_id, job.user_name))
            }
        })
        .collect();
    if jobs.len() > JOBS_PER_NODE {
        lines.push(Line::from(format!("... +{} more", jobs.len() - JOBS_PER_NODE)));
    }
    Text::from(lines)
}

/// Per-node CPU and memory utilization, worst first colored red
pub fn efficiency_lines(nodes: &[Node], theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::styled("Node Efficiency Analysis", theme.bold()),
        Line::default(),
    ];
    for node in nodes {
        let cpu = node.cpu_utilization();
        let memory = node.memory_utilization();
        let color = if cpu < 50.0 || memory < 50.0 {
            Color::Red
        } else if cpu < 80.0 || memory < 80.0 {
            Color::Yellow
        } else {
            Color::Green
        };
        lines.push(Line::from(vec![
            Span::raw(format!("{:<15} ", node.name)),
            Span::styled(
                format!("CPU: {:.1}% | Memory: {:.1}%", cpu, memory),
                theme.fg(color),
            ),
        ]));
    }
    lines
}
