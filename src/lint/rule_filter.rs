//! Enable/disable rules from editor configuration

use crate::editor_config::{EXPERIMENTAL, EditorConfig, KTLINT, RuleExecution};
use crate::rule::RuleProvider;

/// Whether the rule of `provider` runs under `editor_config`
///
/// - `ktlint = disabled` disables every rule
/// - `ktlint_<rule-set>_<rule>` wins when present
/// - experimental rules also need `ktlint_experimental = enabled`
/// - otherwise the rule runs unless its rule set is disabled
pub fn is_rule_enabled(provider: &RuleProvider, editor_config: &EditorConfig) -> bool {
    if editor_config.rule_execution(KTLINT) == Some(RuleExecution::Disabled) {
        return false;
    }

    let id = provider.id();
    if let Some(execution) = editor_config.rule_execution(&id.execution_property()) {
        return execution == RuleExecution::Enabled;
    }

    let rule_set_disabled = editor_config.rule_execution(&id.rule_set_execution_property())
        == Some(RuleExecution::Disabled);

    if provider.is_experimental() {
        editor_config.rule_execution(EXPERIMENTAL) == Some(RuleExecution::Enabled)
            && !rule_set_disabled
    } else {
        !rule_set_disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Rule, RuleId};

    struct Stable;
    impl Rule for Stable {
        fn id(&self) -> RuleId {
            RuleId::new("standard:stable")
        }
    }

    struct Experimental;
    impl Rule for Experimental {
        fn id(&self) -> RuleId {
            RuleId::new("standard:experimental")
        }
        fn is_experimental(&self) -> bool {
            true
        }
    }

    fn enabled(config: &[(&str, &str)]) -> (bool, bool) {
        let config = EditorConfig::from_pairs(config.iter().copied());
        (
            is_rule_enabled(&RuleProvider::new(|| Box::new(Stable)), &config),
            is_rule_enabled(&RuleProvider::new(|| Box::new(Experimental)), &config),
        )
    }

    #[test]
    fn test_defaults() {
        assert_eq!(enabled(&[]), (true, false));
    }

    #[test]
    fn test_experimental_opt_in() {
        assert_eq!(enabled(&[("ktlint_experimental", "enabled")]), (true, true));
        assert_eq!(
            enabled(&[
                ("ktlint_experimental", "enabled"),
                ("ktlint_standard", "disabled")
            ]),
            (false, false)
        );
    }

    #[test]
    fn test_rule_property_wins() {
        assert_eq!(
            enabled(&[
                ("ktlint_standard", "disabled"),
                ("ktlint_standard_stable", "enabled"),
                ("ktlint_standard_experimental", "enabled"),
            ]),
            (true, true)
        );
        assert_eq!(
            enabled(&[("ktlint_standard_stable", "disabled")]),
            (false, false)
        );
    }

    #[test]
    fn test_everything_disabled() {
        assert_eq!(
            enabled(&[
                ("ktlint", "disabled"),
                ("ktlint_standard_stable", "enabled")
            ]),
            (false, false)
        );
    }
}
