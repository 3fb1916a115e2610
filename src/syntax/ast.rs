//! Typed views over untyped syntax nodes
//!
//! A view is a thin wrapper around a [`NodeId`]. `cast` succeeds only when
//! the node has the right element type *and* the children a well formed
//! construct of that type has, so visitors can rely on the accessors of a
//! view without re-checking the shape.

use crate::element_type::ElementType;
use crate::tree::{NodeId, SyntaxTree};

macro_rules! typed_view {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(NodeId);

        impl $name {
            pub fn node(self) -> NodeId {
                self.0
            }
        }
    };
}

fn has_child(tree: &SyntaxTree, node: NodeId, kind: ElementType) -> bool {
    tree.find_child_by_type(node, kind).is_some()
}

fn children_of_type(tree: &SyntaxTree, node: NodeId, kind: ElementType) -> Vec<NodeId> {
    tree.children(node)
        .iter()
        .copied()
        .filter(|&child| tree.kind(child) == kind)
        .collect()
}

typed_view!(FunDeclaration);

impl FunDeclaration {
    pub fn cast(tree: &SyntaxTree, node: NodeId) -> Option<Self> {
        (tree.kind(node) == ElementType::Fun && has_child(tree, node, ElementType::FunKeyword))
            .then_some(Self(node))
    }

    pub fn name(self, tree: &SyntaxTree) -> Option<String> {
        tree.find_child_by_type(self.0, ElementType::Identifier)
            .map(|id| tree.leaf_text(id).to_string())
    }

    pub fn value_parameter_list(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.find_child_by_type(self.0, ElementType::ValueParameterList)
    }

    /// Declared return type
    pub fn type_reference(self, tree: &SyntaxTree) -> Option<NodeId> {
        let colon = tree.find_child_by_type(self.0, ElementType::Colon)?;
        tree.next_code_sibling(colon)
            .filter(|&node| tree.kind(node) == ElementType::TypeReference)
    }

    pub fn body_block(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.find_child_by_type(self.0, ElementType::Block)
    }

    pub fn eq(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.find_child_by_type(self.0, ElementType::Eq)
    }

    /// Expression body following `=`
    pub fn body_expression(self, tree: &SyntaxTree) -> Option<NodeId> {
        self.eq(tree).and_then(|eq| tree.next_code_sibling(eq))
    }
}

typed_view!(ClassDeclaration);

impl ClassDeclaration {
    pub fn cast(tree: &SyntaxTree, node: NodeId) -> Option<Self> {
        (tree.kind(node) == ElementType::Class && has_child(tree, node, ElementType::ClassKeyword))
            .then_some(Self(node))
    }

    pub fn name(self, tree: &SyntaxTree) -> Option<String> {
        tree.find_child_by_type(self.0, ElementType::Identifier)
            .map(|id| tree.leaf_text(id).to_string())
    }

    pub fn primary_constructor_parameters(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.find_child_by_type(self.0, ElementType::ValueParameterList)
    }

    pub fn body(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.find_child_by_type(self.0, ElementType::ClassBody)
    }
}

typed_view!(IfExpression);

impl IfExpression {
    pub fn cast(tree: &SyntaxTree, node: NodeId) -> Option<Self> {
        let well_formed = tree.kind(node) == ElementType::If
            && has_child(tree, node, ElementType::LPar)
            && has_child(tree, node, ElementType::Condition)
            && has_child(tree, node, ElementType::RPar);
        well_formed.then_some(Self(node))
    }

    pub fn condition(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.find_child_by_type(self.0, ElementType::Condition)
    }

    pub fn then_branch(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.find_child_by_type(self.0, ElementType::Then)
    }

    pub fn else_keyword(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.find_child_by_type(self.0, ElementType::ElseKeyword)
    }

    pub fn else_branch(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.find_child_by_type(self.0, ElementType::Else)
    }
}

typed_view!(WhenExpression);

impl WhenExpression {
    pub fn cast(tree: &SyntaxTree, node: NodeId) -> Option<Self> {
        let well_formed = tree.kind(node) == ElementType::When
            && has_child(tree, node, ElementType::LBrace)
            && has_child(tree, node, ElementType::RBrace);
        well_formed.then_some(Self(node))
    }

    pub fn lpar(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.find_child_by_type(self.0, ElementType::LPar)
    }

    pub fn rpar(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.find_child_by_type(self.0, ElementType::RPar)
    }

    pub fn subject(self, tree: &SyntaxTree) -> Option<NodeId> {
        self.lpar(tree).and_then(|lpar| tree.next_code_sibling(lpar))
            .filter(|&node| tree.kind(node) != ElementType::RPar)
    }

    pub fn entries(self, tree: &SyntaxTree) -> Vec<NodeId> {
        children_of_type(tree, self.0, ElementType::WhenEntry)
    }
}

typed_view!(CallExpression);

impl CallExpression {
    pub fn cast(tree: &SyntaxTree, node: NodeId) -> Option<Self> {
        let well_formed = tree.kind(node) == ElementType::CallExpression
            && (has_child(tree, node, ElementType::ValueArgumentList)
                || has_child(tree, node, ElementType::LambdaArgument));
        well_formed.then_some(Self(node))
    }

    pub fn callee(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.first_child(self.0)
    }

    /// Name of the called function when the callee is a plain reference
    pub fn callee_name(self, tree: &SyntaxTree) -> Option<String> {
        self.callee(tree)
            .filter(|&callee| tree.kind(callee) == ElementType::ReferenceExpression)
            .map(|callee| tree.text(callee))
    }

    pub fn value_argument_list(self, tree: &SyntaxTree) -> Option<ValueArgumentList> {
        tree.find_child_by_type(self.0, ElementType::ValueArgumentList)
            .and_then(|list| ValueArgumentList::cast(tree, list))
    }

    pub fn lambda_arguments(self, tree: &SyntaxTree) -> Vec<NodeId> {
        children_of_type(tree, self.0, ElementType::LambdaArgument)
    }
}

typed_view!(ValueArgumentList);

impl ValueArgumentList {
    pub fn cast(tree: &SyntaxTree, node: NodeId) -> Option<Self> {
        let well_formed = tree.kind(node) == ElementType::ValueArgumentList
            && tree.first_child(node).map(|c| tree.kind(c)) == Some(ElementType::LPar)
            && tree.last_child(node).map(|c| tree.kind(c)) == Some(ElementType::RPar);
        well_formed.then_some(Self(node))
    }

    pub fn lpar(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.first_child(self.0)
    }

    pub fn rpar(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.last_child(self.0)
    }

    pub fn arguments(self, tree: &SyntaxTree) -> Vec<NodeId> {
        children_of_type(tree, self.0, ElementType::ValueArgument)
    }
}

typed_view!(BinaryExpression);

impl BinaryExpression {
    pub fn cast(tree: &SyntaxTree, node: NodeId) -> Option<Self> {
        let well_formed = tree.kind(node) == ElementType::BinaryExpression
            && has_child(tree, node, ElementType::OperationReference);
        well_formed.then_some(Self(node))
    }

    pub fn left(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.first_child(self.0)
    }

    pub fn operation_reference(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.find_child_by_type(self.0, ElementType::OperationReference)
    }

    /// Token type of the operator, e.g. `ElementType::Elvis`
    pub fn operator(self, tree: &SyntaxTree) -> Option<ElementType> {
        self.operation_reference(tree)
            .and_then(|op| tree.first_child(op))
            .map(|token| tree.kind(token))
    }

    pub fn right(self, tree: &SyntaxTree) -> Option<NodeId> {
        self.operation_reference(tree)
            .and_then(|op| tree.next_code_sibling(op))
    }
}

typed_view!(StringTemplate);

impl StringTemplate {
    pub fn cast(tree: &SyntaxTree, node: NodeId) -> Option<Self> {
        let well_formed = tree.kind(node) == ElementType::StringTemplate
            && tree.first_child(node).map(|c| tree.kind(c)) == Some(ElementType::OpenQuote);
        well_formed.then_some(Self(node))
    }

    pub fn is_raw(self, tree: &SyntaxTree) -> bool {
        tree.first_child(self.0)
            .is_some_and(|quote| tree.leaf_text(quote) == "\"\"\"")
    }

    pub fn closing_quote(self, tree: &SyntaxTree) -> Option<NodeId> {
        tree.last_child(self.0)
            .filter(|&quote| tree.kind(quote) == ElementType::ClosingQuote)
    }

    pub fn entries(self, tree: &SyntaxTree) -> Vec<NodeId> {
        tree.children(self.0)
            .iter()
            .copied()
            .filter(|&child| {
                matches!(
                    tree.kind(child),
                    ElementType::LiteralStringTemplateEntry
                        | ElementType::ShortStringTemplateEntry
                        | ElementType::LongStringTemplateEntry
                )
            })
            .collect()
    }

    /// Whether the template has a literal line break entry
    pub fn is_multiline(self, tree: &SyntaxTree) -> bool {
        self.entries(tree).into_iter().any(|entry| {
            tree.kind(entry) == ElementType::LiteralStringTemplateEntry && tree.text(entry) == "\n"
        })
    }
}

typed_view!(ImportList);

impl ImportList {
    pub fn cast(tree: &SyntaxTree, node: NodeId) -> Option<Self> {
        (tree.kind(node) == ElementType::ImportList).then_some(Self(node))
    }

    pub fn directives(self, tree: &SyntaxTree) -> Vec<ImportDirective> {
        tree.children(self.0)
            .iter()
            .filter_map(|&child| ImportDirective::cast(tree, child))
            .collect()
    }
}

typed_view!(ImportDirective);

impl ImportDirective {
    pub fn cast(tree: &SyntaxTree, node: NodeId) -> Option<Self> {
        let well_formed = tree.kind(node) == ElementType::ImportDirective
            && tree.first_child(node).map(|c| tree.kind(c)) == Some(ElementType::ImportKeyword);
        well_formed.then_some(Self(node))
    }

    /// Imported path without keyword, alias and semicolon, e.g. `a.b.*`
    pub fn path(self, tree: &SyntaxTree) -> String {
        tree.children(self.0)
            .iter()
            .filter(|&&child| {
                matches!(
                    tree.kind(child),
                    ElementType::Identifier | ElementType::Dot | ElementType::Mul
                )
            })
            .map(|&child| tree.leaf_text(child))
            .collect()
    }

    pub fn alias(self, tree: &SyntaxTree) -> Option<String> {
        let alias = tree.find_child_by_type(self.0, ElementType::ImportAlias)?;
        tree.find_child_by_type(alias, ElementType::Identifier)
            .map(|name| tree.leaf_text(name).to_string())
    }

    pub fn is_all_under(self, tree: &SyntaxTree) -> bool {
        has_child(tree, self.0, ElementType::Mul)
    }
}
