//! Resolution of loaded rule providers into an ordered list of active rules
//!
//! # Steps
//!
//! 1. Loaded set: the providers in declaration order, ids must be unique
//! 2. Enabled set: see [`crate::rule_filter`]
//! 3. Run-after filter: drop rules whose `RunAfterRule` dependency is absent
//!    or disabled, cascading until nothing changes
//! 4. Promotion: a normal rule which has to run after a late rule becomes
//!    late itself
//! 5. Sort the normal and the late partition topologically, breaking ties by
//!    declaration order, and concatenate them
//!
//! Every step is a plain function over providers so the order can be tested
//! without running any rule.

use crate::editor_config::EditorConfig;
use crate::error::ConfigurationError;
use crate::rule::{RuleId, RuleProvider};
use crate::rule_filter::is_rule_enabled;
use indexmap::{IndexMap, IndexSet};
use kstyle_logger::Logger;
use std::collections::BTreeSet;

/// Resolve the execution order of `providers` under `editor_config`
pub fn resolve_rule_order(
    providers: &[RuleProvider],
    editor_config: &EditorConfig,
    logger: &Logger,
) -> Result<Vec<RuleProvider>, ConfigurationError> {
    let loaded = loaded_rules(providers)?;
    check_self_references(&loaded)?;

    let enabled: IndexSet<RuleId> = loaded
        .iter()
        .filter(|(_, provider)| is_rule_enabled(provider, editor_config))
        .map(|(id, _)| *id)
        .collect();

    let active = run_after_filter(&loaded, &enabled)?;
    let order = sort_rules(&loaded, &active)?;

    if logger.can_log_debug() {
        let lines = order
            .iter()
            .map(|id| format!("           - {id}"))
            .collect::<Vec<_>>()
            .join("\n");
        logger.log_debug(&format!("Rules will be executed in order below:\n{lines}"));
    }

    Ok(order
        .into_iter()
        .filter_map(|id| loaded.get(&id).map(|provider| (*provider).clone()))
        .collect())
}

/// Providers by id, in declaration order
pub fn loaded_rules(
    providers: &[RuleProvider],
) -> Result<IndexMap<RuleId, &RuleProvider>, ConfigurationError> {
    let mut loaded = IndexMap::new();
    for provider in providers {
        if loaded.insert(provider.id(), provider).is_some() {
            return Err(ConfigurationError::DuplicateRuleId {
                rule: provider.id(),
            });
        }
    }
    Ok(loaded)
}

fn check_self_references(
    loaded: &IndexMap<RuleId, &RuleProvider>,
) -> Result<(), ConfigurationError> {
    for (id, provider) in loaded {
        if provider.run_after_rule_ids().any(|other| other == *id) {
            return Err(ConfigurationError::SelfReference { rule: *id });
        }
    }
    Ok(())
}

/// Enabled rules whose `RunAfterRule` dependencies are satisfied
///
/// A dependency which is not loaded excludes the rule when
/// `load_only_if_other_loaded`, and is a configuration error otherwise. A
/// dependency which is loaded but not active excludes the rule when
/// `run_only_if_other_enabled`, and is ignored otherwise. A
/// `RunAfterRuleIfActive` hint never excludes a rule.
pub fn run_after_filter(
    loaded: &IndexMap<RuleId, &RuleProvider>,
    enabled: &IndexSet<RuleId>,
) -> Result<IndexSet<RuleId>, ConfigurationError> {
    let mut active = enabled.clone();
    loop {
        let mut excluded = Vec::new();
        for id in &active {
            let Some(provider) = loaded.get(id) else {
                continue;
            };
            for (other, load_only_if_other_loaded, run_only_if_other_enabled) in
                provider.run_after_rules()
            {
                if !loaded.contains_key(&other) {
                    if load_only_if_other_loaded {
                        excluded.push(*id);
                        break;
                    }
                    return Err(ConfigurationError::UnknownRunAfterRule {
                        rule: *id,
                        other,
                    });
                }
                if run_only_if_other_enabled && !active.contains(&other) {
                    excluded.push(*id);
                    break;
                }
            }
        }
        if excluded.is_empty() {
            return Ok(active);
        }
        for id in excluded {
            active.shift_remove(&id);
        }
    }
}

/// Run-after edges between active rules as `(before, after)` pairs
fn edges(
    loaded: &IndexMap<RuleId, &RuleProvider>,
    active: &IndexSet<RuleId>,
) -> Vec<(RuleId, RuleId)> {
    let mut edges = Vec::new();
    for id in active {
        if let Some(provider) = loaded.get(id) {
            for other in provider.run_after_rule_ids() {
                if active.contains(&other) {
                    edges.push((other, *id));
                }
            }
        }
    }
    edges
}

/// Late rules, including normal rules which have to run after a late rule
pub fn late_rules(
    loaded: &IndexMap<RuleId, &RuleProvider>,
    active: &IndexSet<RuleId>,
) -> IndexSet<RuleId> {
    let mut late: IndexSet<RuleId> = active
        .iter()
        .filter(|id| {
            loaded
                .get(*id)
                .is_some_and(|provider| provider.run_as_late_as_possible())
        })
        .copied()
        .collect();
    let edges = edges(loaded, active);
    loop {
        let promoted: Vec<RuleId> = edges
            .iter()
            .filter(|(before, after)| late.contains(before) && !late.contains(after))
            .map(|(_, after)| *after)
            .collect();
        if promoted.is_empty() {
            return late;
        }
        late.extend(promoted);
    }
}

/// Topological order of the active rules, normal partition first
pub fn sort_rules(
    loaded: &IndexMap<RuleId, &RuleProvider>,
    active: &IndexSet<RuleId>,
) -> Result<Vec<RuleId>, ConfigurationError> {
    let late = late_rules(loaded, active);
    let edges = edges(loaded, active);

    let normal_partition: Vec<RuleId> = active.iter().filter(|id| !late.contains(*id)).copied().collect();
    let late_partition: Vec<RuleId> = active.iter().filter(|id| late.contains(*id)).copied().collect();

    let mut order = topological_sort(loaded, &normal_partition, &edges)?;
    order.extend(topological_sort(loaded, &late_partition, &edges)?);
    Ok(order)
}

/// Kahn's algorithm, always picking the ready rule declared first
fn topological_sort(
    loaded: &IndexMap<RuleId, &RuleProvider>,
    partition: &[RuleId],
    edges: &[(RuleId, RuleId)],
) -> Result<Vec<RuleId>, ConfigurationError> {
    let index_of = |id: &RuleId| loaded.get_index_of(id).unwrap_or(usize::MAX);

    let internal: Vec<(RuleId, RuleId)> = edges
        .iter()
        .filter(|(before, after)| partition.contains(before) && partition.contains(after))
        .copied()
        .collect();

    let mut in_degree: IndexMap<RuleId, usize> = partition.iter().map(|id| (*id, 0)).collect();
    for (_, after) in &internal {
        if let Some(degree) = in_degree.get_mut(after) {
            *degree += 1;
        }
    }

    let mut ready: BTreeSet<(usize, RuleId)> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| (index_of(id), *id))
        .collect();

    let mut order = Vec::with_capacity(partition.len());
    while let Some(entry) = ready.pop_first() {
        let (_, id) = entry;
        order.push(id);
        for (before, after) in &internal {
            if *before != id {
                continue;
            }
            if let Some(degree) = in_degree.get_mut(after) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert((index_of(after), *after));
                }
            }
        }
    }

    if order.len() < partition.len() {
        let rules = partition
            .iter()
            .filter(|id| !order.contains(id))
            .map(|id| {
                let blocked_by = internal
                    .iter()
                    .filter(|(before, after)| after == id && !order.contains(before))
                    .map(|(before, _)| *before)
                    .collect();
                (*id, blocked_by)
            })
            .collect();
        return Err(ConfigurationError::Cycle { rules });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Rule, VisitorModifier};
    use pretty_assertions::assert_eq;

    /// Rule which only declares an id and modifiers
    struct Declared {
        id: RuleId,
        modifiers: Vec<VisitorModifier>,
    }

    impl Rule for Declared {
        fn id(&self) -> RuleId {
            self.id
        }

        fn visitor_modifiers(&self) -> Vec<VisitorModifier> {
            self.modifiers.clone()
        }
    }

    fn provider(id: &'static str, modifiers: Vec<VisitorModifier>) -> RuleProvider {
        RuleProvider::new(move || {
            Box::new(Declared {
                id: RuleId::new(id),
                modifiers: modifiers.clone(),
            })
        })
    }

    fn late() -> VisitorModifier {
        VisitorModifier::RunAsLateAsPossible
    }

    fn after(id: &'static str) -> VisitorModifier {
        VisitorModifier::RunAfterRule {
            rule_id: RuleId::new(id),
            load_only_if_other_loaded: false,
            run_only_if_other_enabled: false,
        }
    }

    fn order(providers: &[RuleProvider]) -> Result<Vec<&'static str>, ConfigurationError> {
        order_with(providers, &EditorConfig::new())
    }

    fn order_with(
        providers: &[RuleProvider],
        config: &EditorConfig,
    ) -> Result<Vec<&'static str>, ConfigurationError> {
        resolve_rule_order(providers, config, &Logger::DevNull)
            .map(|rules| rules.iter().map(|p| p.id().value()).collect())
    }

    #[test]
    fn test_declaration_order_without_constraints() {
        let providers = vec![
            provider("test:c", vec![]),
            provider("test:a", vec![]),
            provider("test:b", vec![]),
        ];
        assert_eq!(order(&providers), Ok(vec!["test:c", "test:a", "test:b"]));
    }

    #[test]
    fn test_late_rules_run_last() {
        let providers = vec![
            provider("test:late", vec![late()]),
            provider("test:a", vec![]),
            provider("test:b", vec![]),
        ];
        assert_eq!(
            order(&providers),
            Ok(vec!["test:a", "test:b", "test:late"])
        );
    }

    #[test]
    fn test_run_after_moves_rule_behind_dependency() {
        let providers = vec![
            provider("test:a", vec![after("test:c")]),
            provider("test:b", vec![]),
            provider("test:c", vec![]),
        ];
        assert_eq!(order(&providers), Ok(vec!["test:b", "test:c", "test:a"]));
    }

    #[test]
    fn test_run_after_late_rule_promotes_normal_rule() {
        let providers = vec![
            provider("test:a", vec![after("test:late")]),
            provider("test:late", vec![late()]),
            provider("test:b", vec![]),
        ];
        assert_eq!(
            order(&providers),
            Ok(vec!["test:b", "test:late", "test:a"])
        );
    }

    #[test]
    fn test_late_rules_respect_run_after() {
        let providers = vec![
            provider("test:x", vec![late(), after("test:y")]),
            provider("test:y", vec![late()]),
            provider("test:z", vec![]),
        ];
        assert_eq!(order(&providers), Ok(vec!["test:z", "test:y", "test:x"]));
    }

    #[test]
    fn test_absent_dependency_excludes_rule_when_load_only_if_loaded() {
        let providers = vec![
            provider(
                "test:a",
                vec![VisitorModifier::run_after(RuleId::new("test:missing"))],
            ),
            provider("test:b", vec![]),
        ];
        assert_eq!(order(&providers), Ok(vec!["test:b"]));
    }

    #[test]
    fn test_absent_dependency_is_an_error_otherwise() {
        let providers = vec![provider("test:a", vec![after("test:missing")])];
        assert_eq!(
            order(&providers),
            Err(ConfigurationError::UnknownRunAfterRule {
                rule: RuleId::new("test:a"),
                other: RuleId::new("test:missing"),
            })
        );
    }

    #[test]
    fn test_run_after_hint_never_excludes() {
        let hint = || VisitorModifier::run_after_if_active(RuleId::new("test:b"));
        let providers = vec![provider("test:a", vec![hint()])];
        assert_eq!(order(&providers), Ok(vec!["test:a"]));

        let providers = vec![provider("test:a", vec![hint()]), provider("test:b", vec![])];
        assert_eq!(order(&providers), Ok(vec!["test:b", "test:a"]));

        let config = EditorConfig::new().with("ktlint_test_b", "disabled");
        assert_eq!(order_with(&providers, &config), Ok(vec!["test:a"]));
    }

    #[test]
    fn test_disabled_dependency() {
        let providers = vec![
            provider("test:a", vec![after("test:b")]),
            provider("test:b", vec![]),
            provider(
                "test:c",
                vec![VisitorModifier::run_after_required(RuleId::new("test:a"))],
            ),
        ];
        let config = EditorConfig::new().with("ktlint_test_b", "disabled");
        // The edge to a disabled rule is dropped
        assert_eq!(order_with(&providers, &config), Ok(vec!["test:a", "test:c"]));

        // Exclusion cascades to rules requiring an enabled dependency
        let config = EditorConfig::new().with("ktlint_test_a", "disabled");
        assert_eq!(order_with(&providers, &config), Ok(vec!["test:b"]));
    }

    #[test]
    fn test_cycle_is_reported() {
        let providers = vec![
            provider("test:a", vec![after("test:b")]),
            provider("test:b", vec![after("test:a")]),
            provider("test:c", vec![]),
        ];
        assert_eq!(
            order(&providers),
            Err(ConfigurationError::Cycle {
                rules: vec![
                    (RuleId::new("test:a"), vec![RuleId::new("test:b")]),
                    (RuleId::new("test:b"), vec![RuleId::new("test:a")]),
                ]
            })
        );
    }

    #[test]
    fn test_self_reference_is_reported() {
        let providers = vec![provider("test:a", vec![after("test:a")])];
        assert_eq!(
            order(&providers),
            Err(ConfigurationError::SelfReference {
                rule: RuleId::new("test:a")
            })
        );
    }

    #[test]
    fn test_duplicate_ids_are_reported() {
        let providers = vec![provider("test:a", vec![]), provider("test:a", vec![])];
        assert_eq!(
            order(&providers),
            Err(ConfigurationError::DuplicateRuleId {
                rule: RuleId::new("test:a")
            })
        );
    }

    #[test]
    fn test_order_is_deterministic() {
        let providers = vec![
            provider("test:e", vec![late()]),
            provider("test:d", vec![after("test:a")]),
            provider("test:c", vec![]),
            provider("test:b", vec![late(), after("test:d")]),
            provider("test:a", vec![]),
        ];
        let first = order(&providers);
        for _ in 0..10 {
            assert_eq!(order(&providers), first);
        }
        assert_eq!(
            first,
            Ok(vec!["test:c", "test:a", "test:d", "test:e", "test:b"])
        );
    }
}
