// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Slurm host-list expressions, e.g. `node[001-003,007],gpu01`.

use thiserror::Error;

/// Upper bound on the number of names one expression may expand to
const MAX_HOSTS: usize = 65_536;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostListError {
    #[error("unbalanced brackets in host list '{0}'")]
    Unbalanced(String),
    #[error("invalid range '{0}' in host list")]
    InvalidRange(String),
    #[error("host list '{0}' expands to more than {MAX_HOSTS} names")]
    TooLarge(String),
}

/// Something that turns a host-list expression into individual host names.
///
/// Implementations are best-effort: an expression they cannot expand comes
/// back as a single-element list holding the expression itself.
pub trait HostListExpander {
    fn expand(&self, pattern: &str) -> Vec<String>;
}

/// Pure in-process expansion, no scheduler round trip.
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHostList;

#[cfg(test)]
impl HostListExpander for LocalHostList {
    fn expand(&self, pattern: &str) -> Vec<String> {
        expand_or_verbatim(pattern)
    }
}

/// Expand a host-list expression into host names, preserving order.
pub fn expand(pattern: &str) -> Result<Vec<String>, HostListError> {
    let mut hosts = Vec::new();
    for item in split_top_level(pattern)? {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        expand_item(item, &mut hosts)?;
        if hosts.len() > MAX_HOSTS {
            return Err(HostListError::TooLarge(pattern.to_string()));
        }
    }
    Ok(hosts)
}

/// Like [`expand`], but a malformed expression is returned unexpanded.
#[cfg(test)]
pub fn expand_or_verbatim(pattern: &str) -> Vec<String> {
    match expand(pattern) {
        Ok(hosts) => hosts,
        Err(_) => vec![pattern.trim().to_string()],
    }
}

/// Split on commas that are not inside brackets
fn split_top_level(pattern: &str) -> Result<Vec<&str>, HostListError> {
    let mut items = Vec::new();
    let mut in_bracket = false;
    let mut start = 0;

    for (i, c) in pattern.char_indices() {
        match c {
            '[' if in_bracket => return Err(HostListError::Unbalanced(pattern.to_string())),
            '[' => in_bracket = true,
            ']' if !in_bracket => return Err(HostListError::Unbalanced(pattern.to_string())),
            ']' => in_bracket = false,
            ',' if !in_bracket => {
                items.push(&pattern[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_bracket {
        return Err(HostListError::Unbalanced(pattern.to_string()));
    }
    items.push(&pattern[start..]);
    Ok(items)
}

/// Expand one item; several bracket groups multiply out left to right.
fn expand_item(item: &str, out: &mut Vec<String>) -> Result<(), HostListError> {
    let mut partials = vec![String::new()];
    let mut rest = item;

    while let Some(open) = rest.find('[') {
        let close = rest[open..]
            .find(']')
            .map(|offset| open + offset)
            .ok_or_else(|| HostListError::Unbalanced(item.to_string()))?;
        let prefix = &rest[..open];
        let values = expand_ranges(&rest[open + 1..close])?;

        if partials.len().saturating_mul(values.len()) > MAX_HOSTS {
            return Err(HostListError::TooLarge(item.to_string()));
        }
        partials = partials
            .iter()
            .flat_map(|partial| {
                values
                    .iter()
                    .map(move |value| format!("{}{}{}", partial, prefix, value))
            })
            .collect();
        rest = &rest[close + 1..];
    }

    out.extend(partials.into_iter().map(|partial| partial + rest));
    Ok(())
}

/// Expand the inside of a bracket group: `001-003,007`
fn expand_ranges(body: &str) -> Result<Vec<String>, HostListError> {
    let mut values = Vec::new();

    for part in body.split(',') {
        let part = part.trim();
        let invalid = || HostListError::InvalidRange(part.to_string());

        match part.split_once('-') {
            Some((lo, hi)) => {
                if !is_number(lo) || !is_number(hi) {
                    return Err(invalid());
                }
                let start: u64 = lo.parse().map_err(|_| invalid())?;
                let end: u64 = hi.parse().map_err(|_| invalid())?;
                if start > end {
                    return Err(invalid());
                }
                if end - start >= MAX_HOSTS as u64 {
                    return Err(HostListError::TooLarge(part.to_string()));
                }
                // Zero padding follows the lower bound: [001-010] -> 001..010
                let width = lo.len();
                values.extend((start..=end).map(|n| format!("{:0width$}", n, width = width)));
            }
            None if is_number(part) => values.push(part.to_string()),
            None => return Err(invalid()),
        }
    }

    Ok(values)
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names() {
        assert_eq!(expand("node001").unwrap(), vec!["node001"]);
        assert_eq!(expand("a,b , c").unwrap(), vec!["a", "b", "c"]);
        assert!(expand("").unwrap().is_empty());
    }

    #[test]
    fn test_range_with_padding() {
        assert_eq!(
            expand("node[001-003],gpu01").unwrap(),
            vec!["node001", "node002", "node003", "gpu01"]
        );
        assert_eq!(expand("n[8-10]").unwrap(), vec!["n8", "n9", "n10"]);
    }

    #[test]
    fn test_mixed_list_inside_brackets() {
        assert_eq!(
            expand("cpu[01-02,05]").unwrap(),
            vec!["cpu01", "cpu02", "cpu05"]
        );
    }

    #[test]
    fn test_multiple_bracket_groups() {
        assert_eq!(
            expand("node[1-2]-ib[0-1]").unwrap(),
            vec!["node1-ib0", "node1-ib1", "node2-ib0", "node2-ib1"]
        );
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(matches!(expand("node[3-1]"), Err(HostListError::InvalidRange(_))));
        assert!(matches!(expand("node[1-2"), Err(HostListError::Unbalanced(_))));
        assert!(matches!(expand("node]1["), Err(HostListError::Unbalanced(_))));
        assert!(matches!(expand("node[a-b]"), Err(HostListError::InvalidRange(_))));
        assert!(matches!(expand("node[0-99999999]"), Err(HostListError::TooLarge(_))));
    }

    #[test]
    fn test_best_effort_returns_input() {
        assert_eq!(expand_or_verbatim("node[3-1]"), vec!["node[3-1]"]);
        assert_eq!(LocalHostList.expand("gpu[1-2]"), vec!["gpu1", "gpu2"]);
    }
}
