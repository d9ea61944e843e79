//! Engine configuration: group-stage shape and knockout qualification.
//!
//! Every field has a default so a partial JSON object (or no environment at all) works.

use serde::{Deserialize, Serialize};

/// How participants are split into groups.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupPartition {
    /// Consecutive seeds fill group 1, then group 2, ... (`[A,B,C,D]` in 2 groups -> `[A,B]`, `[C,D]`).
    #[default]
    Contiguous,
    /// Seed `i` goes to group `i mod group_count`.
    Interleaved,
}

impl std::str::FromStr for GroupPartition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contiguous" => Ok(GroupPartition::Contiguous),
            "interleaved" => Ok(GroupPartition::Interleaved),
            other => Err(format!("unknown group partition '{other}'")),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of groups for the GROUP format.
    #[serde(default = "default_group_count")]
    pub group_count: u32,
    /// Finishers per group that advance to the knockout stage.
    #[serde(default = "default_qualifiers_per_group")]
    pub qualifiers_per_group: u32,
    #[serde(default)]
    pub group_partition: GroupPartition,
}

fn default_group_count() -> u32 {
    2
}

fn default_qualifiers_per_group() -> u32 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            group_count: default_group_count(),
            qualifiers_per_group: default_qualifiers_per_group(),
            group_partition: GroupPartition::default(),
        }
    }
}

impl EngineConfig {
    /// Read `GROUP_COUNT`, `QUALIFIERS_PER_GROUP` and `GROUP_PARTITION`; anything missing or
    /// unparsable keeps its default.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`EngineConfig::from_env`], reading values through `var`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(n) = number(&var, "GROUP_COUNT") {
            config.group_count = n;
        }
        if let Some(n) = number(&var, "QUALIFIERS_PER_GROUP") {
            config.qualifiers_per_group = n;
        }
        if let Some(raw) = var("GROUP_PARTITION") {
            match raw.parse() {
                Ok(p) => config.group_partition = p,
                Err(e) => log::warn!("GROUP_PARTITION ignored: {}", e),
            }
        }
        config
    }
}

fn number(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u32> {
    let raw = var(key)?;
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            log::warn!("{} must be a positive integer (got '{}'), using default", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn nothing_set_gives_defaults() {
        assert_eq!(EngineConfig::from_vars(vars(&[])), EngineConfig::default());
    }

    #[test]
    fn valid_values_are_read() {
        let config = EngineConfig::from_vars(vars(&[
            ("GROUP_COUNT", " 4 "),
            ("QUALIFIERS_PER_GROUP", "2"),
            ("GROUP_PARTITION", "Interleaved"),
        ]));
        assert_eq!(config.group_count, 4);
        assert_eq!(config.qualifiers_per_group, 2);
        assert_eq!(config.group_partition, GroupPartition::Interleaved);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let config = EngineConfig::from_vars(vars(&[
            ("GROUP_COUNT", "0"),
            ("QUALIFIERS_PER_GROUP", "two"),
            ("GROUP_PARTITION", "random"),
        ]));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"group_count": 3}"#).unwrap();
        assert_eq!(config.group_count, 3);
        assert_eq!(config.qualifiers_per_group, 1);
        assert_eq!(config.group_partition, GroupPartition::Contiguous);
    }
}
