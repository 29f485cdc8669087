//! Slot prerequisites.
//!
//! A slot is only asked for once every slot it depends on is filled. The
//! built-in graph puts the domain slot in front of everything and chains each
//! domain's secondary slots behind its type slot. A slot table may override
//! any entry with its own `requires` list.

use crate::{ConfigError, SlotTable};
use slotwise_core::SlotKey;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct SlotDependencyGraph {
    edges: HashMap<SlotKey, Vec<SlotKey>>,
}

impl Default for SlotDependencyGraph {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SlotDependencyGraph {
    pub fn builtin() -> Self {
        let edges = SlotKey::ALL
            .into_iter()
            .filter(|k| *k != SlotKey::LegalDomain)
            .map(|key| {
                let mut deps = vec![SlotKey::LegalDomain];
                let chained = match key {
                    SlotKey::WorkDuration => Some(SlotKey::LaborIssue),
                    SlotKey::MarriageDuration => Some(SlotKey::MarriageIssue),
                    SlotKey::LiableParty => Some(SlotKey::AccidentType),
                    SlotKey::PropertyLocation => Some(SlotKey::PropertyIssue),
                    SlotKey::ContractSubject => Some(SlotKey::ContractType),
                    _ => None,
                };
                deps.extend(chained);
                (key, deps)
            })
            .collect();
        Self { edges }
    }

    /// The built-in graph with the table's declared prerequisites applied.
    pub fn from_table(table: &SlotTable) -> Result<Self, ConfigError> {
        let mut graph = Self::builtin();
        for (key, deps) in table.declared_requires() {
            graph.edges.insert(*key, deps.clone());
        }
        graph.check_acyclic()?;
        Ok(graph)
    }

    pub fn requires(&self, key: SlotKey) -> &[SlotKey] {
        self.edges.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when every prerequisite of `key` is filled.
    pub fn satisfied(&self, key: SlotKey, is_filled: impl Fn(SlotKey) -> bool) -> bool {
        self.requires(key).iter().all(|dep| is_filled(*dep))
    }

    fn check_acyclic(&self) -> Result<(), ConfigError> {
        let mut done = HashSet::new();
        for start in SlotKey::ALL {
            let mut path = Vec::new();
            self.visit(start, &mut path, &mut done)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        key: SlotKey,
        path: &mut Vec<SlotKey>,
        done: &mut HashSet<SlotKey>,
    ) -> Result<(), ConfigError> {
        if done.contains(&key) {
            return Ok(());
        }
        if path.contains(&key) {
            let cycle: Vec<&str> = path.iter().chain([&key]).map(|k| k.marker()).collect();
            return Err(ConfigError::InvalidTable {
                table: "slot table".into(),
                reason: format!("dependency cycle: {}", cycle.join(" -> ")),
            });
        }
        path.push(key);
        for dep in self.requires(key) {
            self.visit(*dep, path, done)?;
        }
        path.pop();
        done.insert(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_waits_for_the_domain() {
        let graph = SlotDependencyGraph::builtin();
        assert!(graph.requires(SlotKey::LegalDomain).is_empty());
        for key in SlotKey::ALL.into_iter().skip(1) {
            assert!(graph.requires(key).contains(&SlotKey::LegalDomain), "{key}");
        }
    }

    #[test]
    fn duration_waits_for_issue() {
        let graph = SlotDependencyGraph::builtin();
        let filled = [SlotKey::LegalDomain];
        assert!(!graph.satisfied(SlotKey::WorkDuration, |k| filled.contains(&k)));
        let filled = [SlotKey::LegalDomain, SlotKey::LaborIssue];
        assert!(graph.satisfied(SlotKey::WorkDuration, |k| filled.contains(&k)));
        assert!(graph.satisfied(SlotKey::Employer, |k| filled.contains(&k)));
    }

    #[test]
    fn table_overrides_apply() {
        let table = SlotTable::from_toml(
            r##"
[[slot]]
slot = "#用人单位#"
query = "单位？"
values = "[一-龥]+公司"
requires = ["#法律类型#", "#工作时长#"]
"##,
        )
        .unwrap();
        let graph = SlotDependencyGraph::from_table(&table).unwrap();
        assert_eq!(
            graph.requires(SlotKey::Employer),
            &[SlotKey::LegalDomain, SlotKey::WorkDuration]
        );
    }

    #[test]
    fn cycles_are_rejected() {
        let table = SlotTable::from_toml(
            r##"
[[slot]]
slot = "#劳动问题类型#"
query = "什么问题？"
values = "工资|加班"
requires = ["#工作时长#"]
"##,
        )
        .unwrap();
        let err = SlotDependencyGraph::from_table(&table).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }
}
