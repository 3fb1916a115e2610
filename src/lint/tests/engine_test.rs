//! End-to-end tests running the standard rule set through the engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use kstyle_lint::{
    Code, ConfigurationError, EditorConfig, EngineError, LintEngine, Rule, RuleContext, RuleId,
    RuleProvider, VisitorModifier, standard_rule_providers,
};
use kstyle_syntax::NodeId;
use pretty_assertions::assert_eq;

fn engine(properties: &[(&str, &str)]) -> LintEngine {
    LintEngine::new(standard_rule_providers())
        .with_editor_config(EditorConfig::from_pairs(properties.iter().copied()))
}

fn lint(properties: &[(&str, &str)], code: &str) -> Vec<(usize, usize, String, bool)> {
    engine(properties)
        .lint(&Code::from_snippet(code))
        .unwrap()
        .into_iter()
        .map(|error| (error.line, error.col, error.message, error.can_be_autocorrected))
        .collect()
}

fn format(properties: &[(&str, &str)], code: &str) -> String {
    engine(properties)
        .format(&Code::from_snippet(code))
        .unwrap()
        .formatted
}

/// Counts how often its hooks are called
struct CountingRule {
    id: RuleId,
    modifiers: Vec<VisitorModifier>,
    visits: Arc<AtomicUsize>,
}

impl Rule for CountingRule {
    fn id(&self) -> RuleId {
        self.id
    }

    fn visitor_modifiers(&self) -> Vec<VisitorModifier> {
        self.modifiers.clone()
    }

    fn before_visit_child_nodes(&mut self, _node: NodeId, _ctx: &mut RuleContext<'_>) {
        self.visits.fetch_add(1, Ordering::SeqCst);
    }
}

fn counting_provider(
    id: &'static str,
    modifiers: Vec<VisitorModifier>,
    visits: &Arc<AtomicUsize>,
) -> RuleProvider {
    let visits = visits.clone();
    RuleProvider::new(move || {
        Box::new(CountingRule {
            id: RuleId::new(id),
            modifiers: modifiers.clone(),
            visits: visits.clone(),
        })
    })
}

struct PanickingRule;

impl Rule for PanickingRule {
    fn id(&self) -> RuleId {
        RuleId::new("custom:panicking")
    }

    fn visit_file(&mut self, _node: NodeId, _ctx: &mut RuleContext<'_>) {
        panic!("boom");
    }
}

#[test]
fn test_statement_in_function_body_is_indented() {
    let code = "fun f() {\nreturn 1\n}\n";
    assert_eq!(
        lint(&[], code),
        vec![(
            2,
            1,
            "Unexpected indentation (0) (should be 4)".to_string(),
            true
        )]
    );
    assert_eq!(format(&[], code), "fun f() {\n    return 1\n}\n");
}

#[test]
fn test_unsorted_imports_are_sorted() {
    let code = "import b\nimport a\n";
    let errors = lint(&[], code);
    assert_eq!(errors.len(), 1);
    assert_eq!((errors[0].0, errors[0].1, errors[0].3), (1, 1, true));
    assert_eq!(format(&[], code), "import a\nimport b\n");
}

#[test]
fn test_comment_in_import_list_prevents_sorting() {
    let code = "import b\n// comment\nimport a\n";
    let errors = lint(&[], code);
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].3);

    let result = engine(&[]).format(&Code::from_snippet(code)).unwrap();
    assert_eq!(result.formatted, code);
    assert_eq!(result.remaining_errors().count(), 1);
}

#[test]
fn test_long_call_is_wrapped_with_trailing_comma() {
    let properties = [("max_line_length", "5")];
    let result = engine(&properties)
        .format(&Code::from_snippet("foo(1, 2)\n"))
        .unwrap();
    assert_eq!(result.formatted, "foo(\n    1,\n    2,\n)\n");
    assert!(result.converged);
    assert_eq!(result.remaining_errors().count(), 0);
}

#[test]
fn test_partially_wrapped_call_reaches_fixed_point() {
    let code = "fun f() {\n    foo(1,\n        2)\n}\n";
    let result = engine(&[]).format(&Code::from_snippet(code)).unwrap();
    assert_eq!(
        result.formatted,
        "fun f() {\n    foo(\n        1,\n        2,\n    )\n}\n"
    );
    assert!(result.converged);
    assert_eq!(lint(&[], &result.formatted), vec![]);
}

#[test]
fn test_standard_rules_run_in_dependency_order() {
    let order: Vec<&str> = engine(&[])
        .resolve_rules()
        .unwrap()
        .iter()
        .map(|provider| provider.id().value())
        .collect();
    let position = |id: &str| order.iter().position(|other| *other == id).unwrap();
    assert!(position("standard:argument-list-wrapping") < position("standard:indent"));
    assert!(position("standard:indent") < position("standard:trailing-comma-on-call-site"));
}

#[test]
fn test_large_function_body_is_reindented() {
    let statements = 3000;
    let body: String = (0..statements).map(|i| format!("val x{i} = {i}\n")).collect();
    let code = format!("fun f() {{\n{body}}}\n");

    let errors = lint(&[], &code);
    assert_eq!(errors.len(), statements);
    assert_eq!(
        errors.last(),
        Some(&(
            statements + 1,
            1,
            "Unexpected indentation (0) (should be 4)".to_string(),
            true
        ))
    );

    let result = engine(&[]).format(&Code::from_snippet(&code)).unwrap();
    let indented: String = (0..statements).map(|i| format!("    val x{i} = {i}\n")).collect();
    assert_eq!(result.formatted, format!("fun f() {{\n{indented}}}\n"));
    assert!(result.converged);
}

#[test]
fn test_rule_after_absent_rule_is_never_invoked() {
    let visits = Arc::new(AtomicUsize::new(0));
    let providers = vec![counting_provider(
        "custom:a",
        vec![VisitorModifier::run_after(RuleId::new("custom:b"))],
        &visits,
    )];
    let engine = LintEngine::new(providers);
    let code = Code::from_snippet("val x = 1\n");

    assert_eq!(engine.lint(&code).unwrap(), vec![]);
    assert_eq!(engine.format(&code).unwrap().formatted, "val x = 1\n");
    assert_eq!(visits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cyclic_rules_fail_before_traversal() {
    let visits = Arc::new(AtomicUsize::new(0));
    let providers = vec![
        counting_provider(
            "custom:a",
            vec![VisitorModifier::run_after_required(RuleId::new("custom:b"))],
            &visits,
        ),
        counting_provider(
            "custom:b",
            vec![VisitorModifier::run_after_required(RuleId::new("custom:a"))],
            &visits,
        ),
    ];
    let engine = LintEngine::new(providers);

    let result = engine.lint(&Code::from_snippet("val x = 1\n"));
    assert!(matches!(
        result,
        Err(EngineError::Configuration(ConfigurationError::Cycle { .. }))
    ));
    assert!(engine.format(&Code::from_snippet("val x = 1\n")).is_err());
    assert_eq!(visits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_format_is_idempotent() {
    let sources = [
        "fun f() {\nreturn 1\n}\n",
        "import b\nimport a\n\nclass A {\nfun g() {\nif (x) {\nfoo(1, 2)\n}\n}\n}\n",
        "val x = when (y) {\n1 -> 2\nelse -> 3\n}   \n",
        "fun f() {\n\tval x = 1\n}",
    ];
    for source in sources {
        let once = format(&[], source);
        let twice = format(&[], &once);
        assert_eq!(twice, once, "input: {source:?}");
    }
}

#[test]
fn test_clean_code_is_left_untouched() {
    let code = "import a\nimport b\n\nfun f() {\n    if (x) {\n        return 1\n    }\n}\n";
    assert_eq!(lint(&[], code), vec![]);
    let result = engine(&[]).format(&Code::from_snippet(code)).unwrap();
    assert_eq!(result.formatted, code);
    assert_eq!(result.passes, 1);
    assert!(result.converged);
}

#[test]
fn test_lint_is_deterministic() {
    let code = "import b\nimport a\nfun f() {\nreturn 1  \n}";
    let first = lint(&[], code);
    for _ in 0..5 {
        assert_eq!(lint(&[], code), first);
    }
    let positions: Vec<(usize, usize)> = first.iter().map(|(l, c, _, _)| (*l, *c)).collect();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
}

#[test]
fn test_crlf_and_bom_are_preserved() {
    assert_eq!(
        format(&[], "fun f() {\r\nreturn 1\r\n}\r\n"),
        "fun f() {\r\n    return 1\r\n}\r\n"
    );
    assert_eq!(
        format(&[], "\u{feff}fun f() {\nreturn 1\n}\n"),
        "\u{feff}fun f() {\n    return 1\n}\n"
    );
}

#[test]
fn test_suppressed_violations_are_not_reported() {
    let code = "fun f() {\nreturn 1 // ktlint-disable standard:indent\n}\n";
    assert_eq!(lint(&[], code), vec![]);
    assert_eq!(format(&[], code), code);
}

#[test]
fn test_disabled_rule_does_not_run() {
    let properties = [("ktlint_standard_indent", "disabled")];
    assert_eq!(lint(&properties, "fun f() {\nreturn 1\n}\n"), vec![]);
}

#[test]
fn test_crashing_rule_is_reported() {
    let engine = LintEngine::new(vec![RuleProvider::new(|| Box::new(PanickingRule))]);
    let result = engine.lint(&Code::from_snippet("val x = 1\n"));
    match result {
        Err(EngineError::RuleCrashed { rule_id, message, .. }) => {
            assert_eq!(rule_id.value(), "custom:panicking");
            assert!(message.contains("boom"));
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_files_are_isolated() {
    let engine = engine(&[]);
    let results = engine.format_files(&[
        Code::from_file("a.kt", "fun f() {\nreturn 1\n}\n"),
        Code::from_file("b.kt", "val x = 1\n"),
    ]);
    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0].as_ref().unwrap().formatted,
        "fun f() {\n    return 1\n}\n"
    );
    assert_eq!(results[1].as_ref().unwrap().formatted, "val x = 1\n");
}
