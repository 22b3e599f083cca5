// src/task/template.rs

//! Instance-id sets and `${id}` templating.

use std::collections::{BTreeMap, HashSet};

use crate::config::model::IdSpec;
use crate::errors::{Result, RigError};

/// Placeholder replaced by the instance id in per-instance templates.
pub const ID_PLACEHOLDER: &str = "${id}";

/// Replace every `${id}` in `template` with `id`.
pub fn substitute(template: &str, id: u32) -> String {
    template.replace(ID_PLACEHOLDER, &id.to_string())
}

/// Parse an id expression: comma-separated integers or half-open `a:b` ranges.
///
/// `"0:3"` is `[0, 1, 2]`, `"0:2, 7"` is `[0, 1, 7]`. Order is preserved;
/// duplicates, empty sets and reversed ranges are rejected.
pub fn parse_ids(expr: &str) -> Result<Vec<u32>> {
    let mut ids = Vec::new();

    for item in expr.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        match item.split_once(':') {
            Some((start, end)) => {
                let start = parse_id(start, expr)?;
                let end = parse_id(end, expr)?;
                if end < start {
                    return Err(RigError::config(format!(
                        "reversed id range '{item}' in '{expr}'"
                    )));
                }
                ids.extend(start..end);
            }
            None => ids.push(parse_id(item, expr)?),
        }
    }

    check_id_list(ids, expr)
}

fn parse_id(text: &str, expr: &str) -> Result<u32> {
    text.trim().parse::<u32>().map_err(|_| {
        RigError::config(format!("invalid id '{}' in id expression '{expr}'", text.trim()))
    })
}

fn check_id_list(ids: Vec<u32>, origin: &str) -> Result<Vec<u32>> {
    if ids.is_empty() {
        return Err(RigError::config(format!("id set '{origin}' is empty")));
    }
    let mut seen = HashSet::new();
    for id in &ids {
        if !seen.insert(*id) {
            return Err(RigError::config(format!(
                "duplicate id {id} in id set '{origin}'"
            )));
        }
    }
    Ok(ids)
}

impl IdSpec {
    /// Resolve to an ordered, duplicate-free id list.
    pub fn resolve(&self) -> Result<Vec<u32>> {
        match self {
            IdSpec::Expr(expr) => parse_ids(expr),
            IdSpec::List(list) => check_id_list(list.clone(), &format!("{list:?}")),
        }
    }
}

/// How container names are derived from ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTemplate {
    /// Explicit name per id.
    Explicit(BTreeMap<u32, String>),
    /// `${id}` pattern.
    Pattern(String),
}

impl NameTemplate {
    /// `<group>-${id}`, used when a group declares neither names nor a pattern.
    pub fn default_for(group: &str) -> Self {
        NameTemplate::Pattern(format!("{group}-{ID_PLACEHOLDER}"))
    }

    /// Build from the raw `names` table (string keys) and optional pattern.
    pub fn from_config(
        group: &str,
        names: &BTreeMap<String, String>,
        pattern: Option<&str>,
    ) -> Result<Self> {
        if !names.is_empty() {
            if pattern.is_some() {
                return Err(RigError::config(format!(
                    "containers '{group}' sets both `names` and `name_pattern`"
                )));
            }
            let mut explicit = BTreeMap::new();
            for (key, name) in names {
                let id = key.trim().parse::<u32>().map_err(|_| {
                    RigError::config(format!(
                        "containers '{group}': `names` key '{key}' is not an id"
                    ))
                })?;
                explicit.insert(id, name.clone());
            }
            return Ok(NameTemplate::Explicit(explicit));
        }

        Ok(match pattern {
            Some(p) => NameTemplate::Pattern(p.to_string()),
            None => NameTemplate::default_for(group),
        })
    }

    /// One name per id, in id order. Fails unless the names are pairwise distinct.
    pub fn resolve(&self, ids: &[u32]) -> Result<Vec<String>> {
        let names: Vec<String> = match self {
            NameTemplate::Pattern(pattern) => ids.iter().map(|id| substitute(pattern, *id)).collect(),
            NameTemplate::Explicit(map) => ids
                .iter()
                .map(|id| {
                    map.get(id).cloned().ok_or_else(|| {
                        RigError::config(format!("no explicit container name for id {id}"))
                    })
                })
                .collect::<Result<_>>()?,
        };

        let distinct: HashSet<&String> = names.iter().collect();
        if distinct.len() != ids.len() {
            return Err(RigError::config(format!(
                "name template {self:?} yields {} distinct names for {} ids {ids:?}",
                distinct.len(),
                ids.len()
            )));
        }

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lists_and_ranges() {
        assert_eq!(parse_ids("0,1,2").unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_ids("0:4").unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(parse_ids(" 3:5 , 9 ").unwrap(), vec![3, 4, 9]);
    }

    #[test]
    fn rejects_malformed_id_sets() {
        for bad in ["", "a", "1:b", "5:2", "0,0", "0:2,1", "2:2", "__import__('os')"] {
            assert!(
                matches!(parse_ids(bad), Err(RigError::ConfigError(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn pattern_yields_one_name_per_id() {
        let names = NameTemplate::Pattern("node-${id}".into()).resolve(&[0, 1]).unwrap();
        assert_eq!(names, vec!["node-0", "node-1"]);
    }

    #[test]
    fn constant_pattern_collapses_names() {
        let err = NameTemplate::Pattern("node".into()).resolve(&[0, 1]).unwrap_err();
        assert!(matches!(err, RigError::ConfigError(_)));
    }

    #[test]
    fn explicit_names_must_cover_every_id() {
        let mut names = BTreeMap::new();
        names.insert("0".to_string(), "alpha".to_string());
        let tmpl = NameTemplate::from_config("g", &names, None).unwrap();
        assert_eq!(tmpl.resolve(&[0]).unwrap(), vec!["alpha"]);
        assert!(tmpl.resolve(&[0, 1]).is_err());
    }

    #[test]
    fn default_template_uses_group_name() {
        let tmpl = NameTemplate::from_config("servers", &BTreeMap::new(), None).unwrap();
        assert_eq!(tmpl.resolve(&[2, 5]).unwrap(), vec!["servers-2", "servers-5"]);
    }
}
