//! Lint violations and engine failures

use crate::rule::RuleId;
use kstyle_syntax::ParseError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A style violation reported by a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LintError {
    /// The rule that reported the violation
    pub rule_id: RuleId,

    /// Absolute offset in the text the rule was looking at
    pub offset: usize,

    /// One-based line
    pub line: usize,

    /// One-based column, counted in characters
    pub col: usize,

    /// Human-readable message
    pub message: String,

    pub can_be_autocorrected: bool,
}

impl LintError {
    pub fn new(
        rule_id: RuleId,
        offset: usize,
        (line, col): (usize, usize),
        message: impl Into<String>,
        can_be_autocorrected: bool,
    ) -> Self {
        Self {
            rule_id,
            offset,
            line,
            col,
            message: message.into(),
            can_be_autocorrected,
        }
    }
}

impl fmt::Display for LintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] ({}:{}): {}",
            self.rule_id, self.line, self.col, self.message
        )?;
        if !self.can_be_autocorrected {
            write!(f, " (cannot be auto-corrected)")?;
        }
        Ok(())
    }
}

/// Sort violations by position, then by rule id
pub fn sort_lint_errors(errors: &mut [LintError]) {
    errors.sort_by(|a, b| {
        (a.line, a.col, a.rule_id.value(), &a.message).cmp(&(
            b.line,
            b.col,
            b.rule_id.value(),
            &b.message,
        ))
    });
}

/// Invalid rule set composition, detected before any traversal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error(
        "Found cyclic dependencies between required rules that should run after another rule:\n{}",
        format_cycle(.rules)
    )]
    Cycle {
        /// Every rule on the cycle with the rules it has to run after
        rules: Vec<(RuleId, Vec<RuleId>)>,
    },

    #[error(
        "Rule with id '{rule}' has a visitor modifier of type 'RunAfterRule' which may not refer to the rule itself."
    )]
    SelfReference { rule: RuleId },

    #[error("Rule with id '{rule}' requires rule with id '{other}' to be loaded")]
    UnknownRunAfterRule { rule: RuleId, other: RuleId },

    #[error("Rule with id '{rule}' is provided more than once")]
    DuplicateRuleId { rule: RuleId },
}

fn format_cycle(rules: &[(RuleId, Vec<RuleId>)]) -> String {
    rules
        .iter()
        .map(|(rule, run_after)| {
            let others = run_after
                .iter()
                .map(|id| id.value())
                .collect::<Vec<_>>()
                .join(", ");
            format!("  - Rule with id '{rule}' should run after rule(s) with id '{others}'")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Failure of a lint or format run on a single file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The engine or a rule broke a contract, e.g. used a detached node
    #[error("Rule '{rule_id}' violated an engine invariant: {message}")]
    InvariantViolation { rule_id: RuleId, message: String },

    /// A rule panicked; line and column are `(0, 0)` when formatting
    #[error("Rule '{rule_id}' throws exception in file at position ({line}:{column}): {message}")]
    RuleCrashed {
        rule_id: RuleId,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Not a valid Kotlin file ({0})")]
    Parse(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_report_shape() {
        let error = LintError::new(
            RuleId::new("standard:import-ordering"),
            0,
            (1, 1),
            "Duplicate 'import a.A' found",
            false,
        );
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            serde_json::json!({
                "rule_id": "standard:import-ordering",
                "offset": 0,
                "line": 1,
                "col": 1,
                "message": "Duplicate 'import a.A' found",
                "can_be_autocorrected": false,
            })
        );
    }

    #[test]
    fn test_display() {
        let error = LintError::new(
            RuleId::new("standard:indent"),
            12,
            (2, 5),
            "Unexpected indentation (8) (should be 4)",
            true,
        );
        assert_eq!(
            error.to_string(),
            "[standard:indent] (2:5): Unexpected indentation (8) (should be 4)"
        );
    }

    #[test]
    fn test_cycle_message_lists_every_rule() {
        let error = ConfigurationError::Cycle {
            rules: vec![
                (RuleId::new("test:a"), vec![RuleId::new("test:b")]),
                (RuleId::new("test:b"), vec![RuleId::new("test:a")]),
            ],
        };
        assert_eq!(
            error.to_string(),
            "Found cyclic dependencies between required rules that should run after another rule:\n  \
             - Rule with id 'test:a' should run after rule(s) with id 'test:b'\n  \
             - Rule with id 'test:b' should run after rule(s) with id 'test:a'"
        );
    }

    #[test]
    fn test_sort_by_position_then_rule() {
        let mut errors = vec![
            LintError::new(RuleId::new("standard:b"), 9, (2, 1), "x", true),
            LintError::new(RuleId::new("standard:b"), 0, (1, 1), "x", true),
            LintError::new(RuleId::new("standard:a"), 9, (2, 1), "x", true),
        ];
        sort_lint_errors(&mut errors);
        let order: Vec<_> = errors.iter().map(|e| (e.line, e.rule_id.value())).collect();
        assert_eq!(
            order,
            vec![(1, "standard:b"), (2, "standard:a"), (2, "standard:b")]
        );
    }
}
