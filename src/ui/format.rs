// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Text formatting helpers shared by the tables and panels.

use chrono::TimeDelta;

/// Memory given in MB: `512M`, `4.5G`, `1.5T`
pub fn format_memory(mb: u64) -> String {
    const GB: u64 = 1024;
    const TB: u64 = 1024 * 1024;
    if mb >= TB {
        format!("{:.1}T", mb as f64 / TB as f64)
    } else if mb >= GB {
        format!("{:.1}G", mb as f64 / GB as f64)
    } else {
        format!("{}M", mb)
    }
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Bar of `width` cells, filled in proportion to `percent`
pub fn utilization_bar(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).floor().clamp(0.0, width as f64) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Run time: `2d 3h`, `1h 5m`, `12m`, `40s`
pub fn format_elapsed(elapsed: Option<TimeDelta>) -> String {
    let Some(elapsed) = elapsed else {
        return "-".to_string();
    };
    let seconds = elapsed.num_seconds().max(0);
    let (days, hours, minutes) = (seconds / 86_400, (seconds % 86_400) / 3600, (seconds % 3600) / 60);
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if seconds >= 3600 {
        format!("{}h {}m", hours, minutes)
    } else if seconds >= 60 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}

pub fn shorten_node_name<'a>(name: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return name;
    }
    name.strip_prefix(prefix).unwrap_or(name)
}

/// Strip the prefix from every entry of a comma-separated node list
pub fn shorten_node_list(list: &str, prefix: &str) -> String {
    if list.is_empty() {
        return String::new();
    }
    list.split(',')
        .map(|node| shorten_node_name(node.trim(), prefix))
        .collect::<Vec<_>>()
        .join(",")
}

/// Cut to `width` characters, marking the cut with `...`
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Cut to `width` characters without a marker
pub fn clip(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}
