//! Rule trait, rule identifiers and visitor modifiers

use crate::RuleContext;
use crate::editor_config::EditorConfig;
use kstyle_syntax::NodeId;
use kstyle_syntax::ast::{
    BinaryExpression, CallExpression, ClassDeclaration, FunDeclaration, IfExpression,
    ImportList, StringTemplate, ValueArgumentList, WhenExpression,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Globally unique rule identifier of the form `rule-set:rule-name`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleId(&'static str);

impl RuleId {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub fn value(self) -> &'static str {
        self.0
    }

    /// The part before the colon, `standard` when the id has no rule set
    pub fn rule_set(self) -> &'static str {
        match self.0.split_once(':') {
            Some((rule_set, _)) => rule_set,
            None => "standard",
        }
    }

    pub fn name(self) -> &'static str {
        match self.0.split_once(':') {
            Some((_, name)) => name,
            None => self.0,
        }
    }

    /// Editor config property enabling or disabling this rule, e.g.
    /// `ktlint_standard_no-trailing-spaces`
    pub fn execution_property(self) -> String {
        format!("ktlint_{}_{}", self.rule_set(), self.name())
    }

    /// Editor config property enabling or disabling the whole rule set
    pub fn rule_set_execution_property(self) -> String {
        format!("ktlint_{}", self.rule_set())
    }

    /// Whether a suppression directive entry refers to this rule
    pub fn matches(self, reference: &str) -> bool {
        if reference.contains(':') {
            reference == self.0
        } else {
            self.rule_set() == "standard" && reference == self.name()
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Scheduling constraints a rule declares about itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitorModifier {
    /// Hooks are only called for the root of the tree
    RunOnRootNodeOnly,

    /// The rule starts only after `rule_id` has completed its traversal
    RunAfterRule {
        rule_id: RuleId,
        /// When `rule_id` is not loaded at all, silently exclude this rule
        /// instead of failing the run
        load_only_if_other_loaded: bool,
        /// When `rule_id` is loaded but disabled, exclude this rule
        run_only_if_other_enabled: bool,
    },

    /// Ordering hint only: the rule runs after `rule_id` when that rule is
    /// active, and runs anyway when it is not loaded or disabled
    RunAfterRuleIfActive { rule_id: RuleId },

    /// Run after every rule lacking this modifier
    RunAsLateAsPossible,
}

impl VisitorModifier {
    /// Ordering constraint which is ignored when the other rule is absent or
    /// disabled
    pub const fn run_after(rule_id: RuleId) -> Self {
        VisitorModifier::RunAfterRule {
            rule_id,
            load_only_if_other_loaded: true,
            run_only_if_other_enabled: false,
        }
    }

    /// Ordering constraint which requires the other rule to be loaded and
    /// enabled
    pub const fn run_after_required(rule_id: RuleId) -> Self {
        VisitorModifier::RunAfterRule {
            rule_id,
            load_only_if_other_loaded: false,
            run_only_if_other_enabled: true,
        }
    }

    /// Ordering constraint which excludes this rule unless the other rule is
    /// loaded and enabled
    pub const fn run_after_active(rule_id: RuleId) -> Self {
        VisitorModifier::RunAfterRule {
            rule_id,
            load_only_if_other_loaded: true,
            run_only_if_other_enabled: true,
        }
    }

    pub const fn run_after_if_active(rule_id: RuleId) -> Self {
        VisitorModifier::RunAfterRuleIfActive { rule_id }
    }
}

/// A lint rule
///
/// The dispatcher calls a typed `visit_*` hook before the children of a node
/// of that type are visited and the matching `leave_*` hook afterwards. Every
/// typed hook defaults to the generic [`Rule::before_visit_child_nodes`] or
/// [`Rule::after_visit_child_nodes`], so a rule only overrides what it needs.
///
/// An instance is used for a single traversal of a single file. Per-file
/// state is reset in [`Rule::before_first_node`].
///
/// # Example
///
/// ```rust,ignore
/// struct NoSemicolons;
///
/// impl Rule for NoSemicolons {
///     fn id(&self) -> RuleId {
///         RuleId::new("custom:no-semicolons")
///     }
///
///     fn before_visit_child_nodes(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
///         if ctx.tree().kind(node) == ElementType::Semicolon {
///             let offset = ctx.tree().start_offset(node);
///             if ctx.emit(offset, "Unnecessary semicolon", true) {
///                 ctx.tree_mut().remove(node);
///             }
///         }
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait Rule: Send {
    fn id(&self) -> RuleId;

    fn visitor_modifiers(&self) -> Vec<VisitorModifier> {
        Vec::new()
    }

    /// Experimental rules only run when explicitly enabled
    fn is_experimental(&self) -> bool {
        false
    }

    /// Short description of what this rule checks
    fn description(&self) -> &'static str {
        ""
    }

    fn before_first_node(&mut self, editor_config: &EditorConfig) {}

    fn before_visit_child_nodes(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {}

    fn after_visit_child_nodes(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {}

    fn after_last_node(&mut self, ctx: &mut RuleContext<'_>) {}

    // Typed hooks

    fn visit_file(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        self.before_visit_child_nodes(node, ctx)
    }
    fn leave_file(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        self.after_visit_child_nodes(node, ctx)
    }

    fn visit_import_list(&mut self, import_list: ImportList, ctx: &mut RuleContext<'_>) {
        self.before_visit_child_nodes(import_list.node(), ctx)
    }
    fn leave_import_list(&mut self, import_list: ImportList, ctx: &mut RuleContext<'_>) {
        self.after_visit_child_nodes(import_list.node(), ctx)
    }

    fn visit_fun(&mut self, fun: FunDeclaration, ctx: &mut RuleContext<'_>) {
        self.before_visit_child_nodes(fun.node(), ctx)
    }
    fn leave_fun(&mut self, fun: FunDeclaration, ctx: &mut RuleContext<'_>) {
        self.after_visit_child_nodes(fun.node(), ctx)
    }

    fn visit_class(&mut self, class: ClassDeclaration, ctx: &mut RuleContext<'_>) {
        self.before_visit_child_nodes(class.node(), ctx)
    }
    fn leave_class(&mut self, class: ClassDeclaration, ctx: &mut RuleContext<'_>) {
        self.after_visit_child_nodes(class.node(), ctx)
    }

    fn visit_if(&mut self, if_expression: IfExpression, ctx: &mut RuleContext<'_>) {
        self.before_visit_child_nodes(if_expression.node(), ctx)
    }
    fn leave_if(&mut self, if_expression: IfExpression, ctx: &mut RuleContext<'_>) {
        self.after_visit_child_nodes(if_expression.node(), ctx)
    }

    fn visit_when(&mut self, when: WhenExpression, ctx: &mut RuleContext<'_>) {
        self.before_visit_child_nodes(when.node(), ctx)
    }
    fn leave_when(&mut self, when: WhenExpression, ctx: &mut RuleContext<'_>) {
        self.after_visit_child_nodes(when.node(), ctx)
    }

    fn visit_call_expression(&mut self, call: CallExpression, ctx: &mut RuleContext<'_>) {
        self.before_visit_child_nodes(call.node(), ctx)
    }
    fn leave_call_expression(&mut self, call: CallExpression, ctx: &mut RuleContext<'_>) {
        self.after_visit_child_nodes(call.node(), ctx)
    }

    fn visit_value_argument_list(
        &mut self,
        arguments: ValueArgumentList,
        ctx: &mut RuleContext<'_>,
    ) {
        self.before_visit_child_nodes(arguments.node(), ctx)
    }
    fn leave_value_argument_list(
        &mut self,
        arguments: ValueArgumentList,
        ctx: &mut RuleContext<'_>,
    ) {
        self.after_visit_child_nodes(arguments.node(), ctx)
    }

    fn visit_binary_expression(
        &mut self,
        expression: BinaryExpression,
        ctx: &mut RuleContext<'_>,
    ) {
        self.before_visit_child_nodes(expression.node(), ctx)
    }
    fn leave_binary_expression(
        &mut self,
        expression: BinaryExpression,
        ctx: &mut RuleContext<'_>,
    ) {
        self.after_visit_child_nodes(expression.node(), ctx)
    }

    fn visit_string_template(&mut self, template: StringTemplate, ctx: &mut RuleContext<'_>) {
        self.before_visit_child_nodes(template.node(), ctx)
    }
    fn leave_string_template(&mut self, template: StringTemplate, ctx: &mut RuleContext<'_>) {
        self.after_visit_child_nodes(template.node(), ctx)
    }

    fn visit_whitespace(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        self.before_visit_child_nodes(node, ctx)
    }
    fn leave_whitespace(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        self.after_visit_child_nodes(node, ctx)
    }

    /// End-of-line comments, block comments and KDoc
    fn visit_comment(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        self.before_visit_child_nodes(node, ctx)
    }
    fn leave_comment(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        self.after_visit_child_nodes(node, ctx)
    }
}

/// Factory creating a fresh rule instance for every traversal
#[derive(Clone)]
pub struct RuleProvider {
    id: RuleId,
    modifiers: Vec<VisitorModifier>,
    is_experimental: bool,
    factory: Arc<dyn Fn() -> Box<dyn Rule> + Send + Sync>,
}

impl RuleProvider {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn Rule> + Send + Sync + 'static,
    {
        let prototype = factory();
        Self {
            id: prototype.id(),
            modifiers: prototype.visitor_modifiers(),
            is_experimental: prototype.is_experimental(),
            factory: Arc::new(factory),
        }
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn visitor_modifiers(&self) -> &[VisitorModifier] {
        &self.modifiers
    }

    pub fn is_experimental(&self) -> bool {
        self.is_experimental
    }

    pub fn run_on_root_node_only(&self) -> bool {
        self.modifiers.contains(&VisitorModifier::RunOnRootNodeOnly)
    }

    pub fn run_as_late_as_possible(&self) -> bool {
        self.modifiers.contains(&VisitorModifier::RunAsLateAsPossible)
    }

    /// `RunAfterRule` constraints in declaration order
    pub fn run_after_rules(&self) -> impl Iterator<Item = (RuleId, bool, bool)> + '_ {
        self.modifiers.iter().filter_map(|modifier| match *modifier {
            VisitorModifier::RunAfterRule {
                rule_id,
                load_only_if_other_loaded,
                run_only_if_other_enabled,
            } => Some((rule_id, load_only_if_other_loaded, run_only_if_other_enabled)),
            _ => None,
        })
    }

    /// Every rule this rule has to run after, hints included
    pub fn run_after_rule_ids(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.modifiers.iter().filter_map(|modifier| match *modifier {
            VisitorModifier::RunAfterRule { rule_id, .. }
            | VisitorModifier::RunAfterRuleIfActive { rule_id } => Some(rule_id),
            _ => None,
        })
    }

    pub fn create_new_rule_instance(&self) -> Box<dyn Rule> {
        (self.factory)()
    }
}

impl fmt::Debug for RuleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleProvider")
            .field("id", &self.id)
            .field("modifiers", &self.modifiers)
            .finish()
    }
}

/// Ordered collection of rule providers, usually one rule set
pub struct RuleRegistry {
    providers: Vec<RuleProvider>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn register(&mut self, provider: RuleProvider) {
        self.providers.push(provider);
    }

    pub fn get(&self, id: &str) -> Option<&RuleProvider> {
        self.providers.iter().find(|p| p.id().value() == id)
    }

    pub fn all(&self) -> &[RuleProvider] {
        &self.providers
    }

    pub fn ids(&self) -> Vec<RuleId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn into_providers(self) -> Vec<RuleProvider> {
        self.providers
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
