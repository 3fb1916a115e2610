//! Rule engine for linting and formatting Kotlin source files
//!
//! Source text is parsed into a lossless syntax tree by `kstyle-syntax`.
//! Rules walk the tree, report violations and, when formatting, fix them by
//! mutating the tree in place. The formatted text is the concatenated text
//! of the leaves once no rule has anything left to fix.
//!
//! # Architecture
//!
//! - **Rules**: Implement [`Rule`], overriding the typed hooks they need
//! - **Visitor**: Calls the hooks of one rule depth-first over the tree
//! - **Scheduler**: Orders the enabled rules by their visitor modifiers
//! - **Engine**: Runs the ordered rules in lint or format mode
//!
//! # Example
//!
//! ```rust,ignore
//! use kstyle_lint::{Code, LintEngine, standard_rule_providers};
//!
//! let engine = LintEngine::new(standard_rule_providers());
//! let result = engine.format(&Code::from_snippet("fun f() {\nreturn 1\n}\n"))?;
//! assert_eq!(result.formatted, "fun f() {\n    return 1\n}\n");
//! ```

pub mod context;
pub mod editor_config;
pub mod error;
pub mod indent_config;
pub mod rule;
pub mod rule_filter;
pub mod rules;
pub mod runner;
pub mod scheduler;
pub mod suppression;
pub mod syntax_utils;
pub mod visitor;

pub use context::RuleContext;
pub use editor_config::{CodeStyle, EditorConfig, IndentStyle};
pub use error::{ConfigurationError, EngineError, LintError};
pub use indent_config::IndentConfig;
pub use rule::{Rule, RuleId, RuleProvider, RuleRegistry, VisitorModifier};
pub use rules::{standard_rule_providers, standard_rule_registry};
pub use runner::{Code, FormatResult, LintEngine};
pub use scheduler::resolve_rule_order;
