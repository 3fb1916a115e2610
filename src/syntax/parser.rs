//! Recursive descent parser producing a lossless [`SyntaxTree`]
//!
//! The parser covers the subset of Kotlin needed by the style rules. Input it
//! does not understand is wrapped into `ERROR_ELEMENT` nodes so that the tree
//! still reproduces the source text, and a [`ParseError`] is recorded.
//!
//! Whitespace and comments are collected while looking ahead and attached to
//! whichever node is open when the next real token (or node) starts. A node
//! therefore never begins or ends with trivia; it ends up in the enclosing
//! node instead, which matches the shape of the Kotlin PSI.

use crate::element_type::ElementType;
use crate::lexer::{Token, tokenize};
use crate::tree::{LineIndex, NodeId, SyntaxTree};
use thiserror::Error;

use ElementType::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug)]
pub struct Parse {
    pub tree: SyntaxTree,
    pub errors: Vec<ParseError>,
}

impl Parse {
    pub fn ok(self) -> Result<SyntaxTree, ParseError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(self.tree),
        }
    }
}

const MODIFIERS: &[&str] = &[
    "abstract",
    "annotation",
    "const",
    "data",
    "enum",
    "external",
    "final",
    "infix",
    "inline",
    "inner",
    "internal",
    "lateinit",
    "open",
    "operator",
    "override",
    "private",
    "protected",
    "public",
    "sealed",
    "suspend",
    "tailrec",
    "value",
];

pub fn parse(source: &str) -> Parse {
    let tokens = tokenize(source);
    let mut offsets = Vec::with_capacity(tokens.len() + 1);
    let mut offset = 0;
    for token in &tokens {
        offsets.push(offset);
        offset += token.text.len();
    }
    offsets.push(offset);

    let mut parser = Parser {
        tokens,
        offsets,
        pos: 0,
        pending: Vec::new(),
        tree: SyntaxTree::new(File),
        frames: vec![Frame {
            kind: File,
            children: Vec::new(),
        }],
        newline_modes: vec![true],
        errors: Vec::new(),
    };
    parser.file();

    let line_index = LineIndex::new(source);
    let errors = parser
        .errors
        .iter()
        .map(|(offset, message)| {
            let (line, column) = line_index.line_column(*offset);
            ParseError {
                line,
                column,
                message: message.clone(),
            }
        })
        .collect();

    let mut tree = parser.tree;
    let root = tree.root();
    let children = parser
        .frames
        .pop()
        .map(|frame| frame.children)
        .unwrap_or_default();
    for child in children {
        tree.append_child(root, child);
    }

    Parse { tree, errors }
}

struct Frame {
    kind: ElementType,
    children: Vec<NodeId>,
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    offsets: Vec<usize>,
    /// Next unconsumed token, possibly trivia
    pos: usize,
    /// Trivia tokens seen by lookahead but not yet placed in the tree
    pending: Vec<usize>,
    tree: SyntaxTree,
    frames: Vec<Frame>,
    /// Whether a line break ends the current expression
    newline_modes: Vec<bool>,
    errors: Vec<(usize, String)>,
}

impl<'a> Parser<'a> {
    // Token handling

    fn skip_trivia(&mut self) {
        while let Some(token) = self.tokens.get(self.pos) {
            if !token.kind.is_trivia() {
                break;
            }
            self.pending.push(self.pos);
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<ElementType> {
        self.skip_trivia();
        self.tokens.get(self.pos).map(|token| token.kind)
    }

    fn at(&mut self, kind: ElementType) -> bool {
        self.peek() == Some(kind)
    }

    fn at_eof(&mut self) -> bool {
        self.peek().is_none()
    }

    /// The `n`-th non trivia token from the current position
    fn nth(&self, n: usize) -> Option<Token<'a>> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .filter(|token| !token.kind.is_trivia())
            .nth(n)
            .copied()
    }

    fn nth_kind(&self, n: usize) -> Option<ElementType> {
        self.nth(n).map(|token| token.kind)
    }

    fn newline_before(&mut self) -> bool {
        self.skip_trivia();
        self.pending
            .iter()
            .any(|&index| self.tokens[index].text.contains('\n'))
    }

    fn newline_terminates(&mut self) -> bool {
        self.newline_modes.last().copied().unwrap_or(true) && self.newline_before()
    }

    fn same_line_at(&mut self, kind: ElementType) -> bool {
        self.at(kind) && !self.newline_before()
    }

    fn leaf(&mut self, token: Token<'a>) -> NodeId {
        if token.kind == Kdoc {
            let children = kdoc_parts(token.text)
                .into_iter()
                .map(|(kind, text)| self.tree.new_leaf(kind, text))
                .collect();
            self.tree.new_composite(Kdoc, children)
        } else {
            self.tree.new_leaf(token.kind, token.text)
        }
    }

    fn push_child(&mut self, node: NodeId) {
        if let Some(frame) = self.frames.last_mut() {
            frame.children.push(node);
        }
    }

    fn flush_trivia(&mut self) {
        for index in std::mem::take(&mut self.pending) {
            let node = self.leaf(self.tokens[index]);
            self.push_child(node);
        }
    }

    fn bump(&mut self) {
        self.skip_trivia();
        self.flush_trivia();
        if let Some(token) = self.tokens.get(self.pos).copied() {
            let node = self.leaf(token);
            self.push_child(node);
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: ElementType) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            self.error(format!("Expecting {kind}"));
            false
        }
    }

    fn error(&mut self, message: String) {
        let offset = self.offsets[self.pos.min(self.offsets.len() - 1)];
        self.errors.push((offset, message));
    }

    /// Wrap the current token into an error element
    fn error_token(&mut self) {
        let found = self.peek().map(|kind| kind.to_string()).unwrap_or_default();
        self.error(format!("Unexpected {found}"));
        self.start_node(ErrorElement);
        self.bump();
        self.finish_node();
    }

    // Node handling

    fn start_node(&mut self, kind: ElementType) {
        self.skip_trivia();
        self.flush_trivia();
        self.frames.push(Frame {
            kind,
            children: Vec::new(),
        });
    }

    fn checkpoint(&mut self) -> usize {
        self.skip_trivia();
        self.flush_trivia();
        self.frames.last().map(|frame| frame.children.len()).unwrap_or(0)
    }

    /// Open a node which adopts everything completed since `checkpoint`
    fn start_node_at(&mut self, checkpoint: usize, kind: ElementType) {
        let children = match self.frames.last_mut() {
            Some(frame) => frame.children.split_off(checkpoint.min(frame.children.len())),
            None => Vec::new(),
        };
        self.frames.push(Frame { kind, children });
    }

    fn finish_node(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        if frame.children.is_empty() {
            return;
        }
        let node = self.tree.new_composite(frame.kind, frame.children);
        self.push_child(node);
    }

    fn with_newline_mode(&mut self, significant: bool, parse: impl FnOnce(&mut Self)) {
        self.newline_modes.push(significant);
        parse(self);
        self.newline_modes.pop();
    }

    // Grammar

    fn file(&mut self) {
        if self.at(PackageKeyword) {
            self.start_node(PackageDirective);
            self.bump();
            self.qualified_name();
            if self.at(Semicolon) {
                self.bump();
            }
            self.finish_node();
        }
        if self.at(ImportKeyword) {
            self.start_node(ImportList);
            while self.at(ImportKeyword) {
                self.import_directive();
            }
            self.finish_node();
        }
        self.statements(false);
        self.skip_trivia();
        self.flush_trivia();
    }

    fn qualified_name(&mut self) {
        self.expect(Identifier);
        while self.same_line_at(Dot) {
            self.bump();
            if self.at(Mul) {
                self.bump();
                break;
            }
            self.expect(Identifier);
        }
    }

    fn import_directive(&mut self) {
        self.start_node(ImportDirective);
        self.bump();
        self.qualified_name();
        if self.same_line_at(AsKeyword) {
            self.start_node(ImportAlias);
            self.bump();
            self.expect(Identifier);
            self.finish_node();
        }
        if self.same_line_at(Semicolon) {
            self.bump();
        }
        self.finish_node();
    }

    /// Statements up to the end of input or, inside a block, the closing brace
    fn statements(&mut self, in_block: bool) {
        while let Some(kind) = self.peek() {
            if kind == RBrace && in_block {
                break;
            }
            let before = self.pos;
            if kind == Semicolon {
                self.bump();
                continue;
            }
            self.statement();
            if self.pos == before {
                self.error_token();
            }
        }
    }

    fn statement(&mut self) {
        if let Some(kind) = self.declaration_start() {
            match kind {
                Fun => self.function(),
                Class => self.class(),
                _ => self.property(),
            }
            return;
        }
        match self.peek() {
            Some(ForKeyword) => self.for_loop(),
            Some(WhileKeyword) => self.while_loop(),
            Some(RBrace) | Some(RPar) | Some(RBracket) | Some(BadCharacter) => self.error_token(),
            _ => self.expression_statement(),
        }
    }

    fn is_modifier(token: Token<'_>) -> bool {
        token.kind == Identifier && MODIFIERS.contains(&token.text)
    }

    fn declaration_start(&self) -> Option<ElementType> {
        let mut n = 0;
        loop {
            let token = self.nth(n)?;
            match token.kind {
                FunKeyword => return Some(Fun),
                ClassKeyword => return Some(Class),
                ValKeyword | VarKeyword => return Some(Property),
                _ if Self::is_modifier(token) => n += 1,
                _ => return None,
            }
        }
    }

    fn modifiers(&mut self) {
        while self.nth(0).is_some_and(Self::is_modifier) {
            self.bump();
        }
    }

    fn function(&mut self) {
        self.start_node(Fun);
        self.modifiers();
        self.bump();
        if self.at(Identifier) && self.nth_kind(1) == Some(Dot) {
            // Receiver type
            self.start_node(TypeReference);
            self.start_node(UserType);
            self.reference();
            self.finish_node();
            self.finish_node();
            self.bump();
        }
        self.expect(Identifier);
        if self.at(LPar) {
            self.value_parameter_list();
        } else {
            self.error("Expecting parameter list".to_string());
        }
        if self.at(Colon) {
            self.bump();
            self.type_reference();
        }
        if self.at(Eq) {
            self.bump();
            self.expression();
        } else if self.at(LBrace) {
            self.block();
        }
        self.finish_node();
    }

    fn class(&mut self) {
        self.start_node(Class);
        self.modifiers();
        self.bump();
        self.expect(Identifier);
        if self.same_line_at(LPar) {
            self.value_parameter_list();
        }
        if self.at(Colon) {
            self.bump();
            loop {
                self.type_reference();
                if self.same_line_at(LPar) {
                    self.value_argument_list();
                }
                if self.at(Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        if self.same_line_at(LBrace) {
            self.start_node(ClassBody);
            self.bump();
            self.with_newline_mode(true, |p| p.statements(true));
            self.expect(RBrace);
            self.finish_node();
        }
        self.finish_node();
    }

    fn property(&mut self) {
        self.start_node(Property);
        self.modifiers();
        self.bump();
        self.expect(Identifier);
        if self.at(Colon) {
            self.bump();
            self.type_reference();
        }
        if self.at(Eq) {
            self.bump();
            self.expression();
        }
        self.finish_node();
    }

    fn value_parameter_list(&mut self) {
        self.start_node(ValueParameterList);
        self.bump();
        self.with_newline_mode(false, |p| {
            while !p.at(RPar) && !p.at_eof() {
                p.start_node(ValueParameter);
                p.modifiers();
                if p.at(ValKeyword) || p.at(VarKeyword) {
                    p.bump();
                }
                p.expect(Identifier);
                if p.at(Colon) {
                    p.bump();
                    p.type_reference();
                }
                if p.at(Eq) {
                    p.bump();
                    p.expression();
                }
                p.finish_node();
                if p.at(Comma) {
                    p.bump();
                } else {
                    break;
                }
            }
        });
        self.expect(RPar);
        self.finish_node();
    }

    fn type_reference(&mut self) {
        self.start_node(TypeReference);
        let checkpoint = self.checkpoint();
        self.user_type();
        if self.same_line_at(Quest) {
            self.start_node_at(checkpoint, NullableType);
            self.bump();
            self.finish_node();
        }
        self.finish_node();
    }

    fn user_type(&mut self) {
        if !self.at(Identifier) {
            self.error("Expecting a type".to_string());
            return;
        }
        let checkpoint = self.checkpoint();
        self.start_node(UserType);
        self.reference();
        if self.same_line_at(Lt) {
            self.type_argument_list();
        }
        self.finish_node();
        while self.at(Dot) && self.nth_kind(1) == Some(Identifier) {
            self.start_node_at(checkpoint, UserType);
            self.bump();
            self.reference();
            if self.same_line_at(Lt) {
                self.type_argument_list();
            }
            self.finish_node();
        }
    }

    fn type_argument_list(&mut self) {
        self.start_node(TypeArgumentList);
        self.bump();
        self.with_newline_mode(false, |p| {
            while !p.at(Gt) && !p.at_eof() {
                p.start_node(TypeProjection);
                if p.at(Mul) {
                    p.bump();
                } else {
                    p.type_reference();
                }
                p.finish_node();
                if p.at(Comma) {
                    p.bump();
                } else {
                    break;
                }
            }
        });
        self.expect(Gt);
        self.finish_node();
    }

    /// Whether the `<` at the current position opens type arguments of a call
    fn looks_like_type_arguments(&self) -> bool {
        let mut depth = 0usize;
        let mut n = 0;
        while let Some(kind) = self.nth_kind(n) {
            match kind {
                Lt => depth += 1,
                Gt => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(self.nth_kind(n + 1), Some(LPar) | Some(LBrace));
                    }
                }
                Identifier | Dot | Comma | Quest | Mul => {}
                _ => return false,
            }
            n += 1;
        }
        false
    }

    fn block(&mut self) {
        self.start_node(Block);
        self.bump();
        self.with_newline_mode(true, |p| p.statements(true));
        self.expect(RBrace);
        self.finish_node();
    }

    fn for_loop(&mut self) {
        self.start_node(For);
        self.bump();
        self.expect(LPar);
        self.with_newline_mode(false, |p| {
            p.start_node(ValueParameter);
            p.expect(Identifier);
            p.finish_node();
            p.expect(InKeyword);
            p.start_node(LoopRange);
            p.expression();
            p.finish_node();
        });
        self.expect(RPar);
        self.loop_body();
        self.finish_node();
    }

    fn while_loop(&mut self) {
        self.start_node(While);
        self.bump();
        self.condition();
        self.loop_body();
        self.finish_node();
    }

    fn condition(&mut self) {
        self.expect(LPar);
        self.start_node(Condition);
        self.with_newline_mode(false, |p| p.expression());
        self.finish_node();
        self.expect(RPar);
    }

    fn loop_body(&mut self) {
        self.start_node(Body);
        self.control_structure_body();
        self.finish_node();
    }

    fn control_structure_body(&mut self) {
        if self.at(LBrace) {
            self.block();
        } else if self.at(Semicolon) || self.at_eof() {
        } else {
            self.expression_statement();
        }
    }

    fn expression_statement(&mut self) {
        let checkpoint = self.checkpoint();
        self.expression();
        if matches!(self.peek(), Some(Eq) | Some(PlusEq) | Some(MinusEq)) && !self.newline_before() {
            self.start_node_at(checkpoint, BinaryExpression);
            self.operation();
            self.expression();
            self.finish_node();
        }
    }

    fn operation(&mut self) {
        self.start_node(OperationReference);
        self.bump();
        self.finish_node();
    }

    fn expression(&mut self) {
        self.binary_expression(0);
    }

    fn binary_expression(&mut self, min_precedence: u8) {
        let checkpoint = self.checkpoint();
        self.prefix_expression();
        loop {
            let Some(kind) = self.peek() else {
                break;
            };
            let Some(precedence) = binary_precedence(kind) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            if !matches!(kind, Elvis | AndAnd | OrOr) && self.newline_terminates() {
                break;
            }
            self.start_node_at(checkpoint, BinaryExpression);
            self.operation();
            self.binary_expression(precedence + 1);
            self.finish_node();
        }
    }

    fn prefix_expression(&mut self) {
        if matches!(self.peek(), Some(Minus) | Some(Plus) | Some(Excl)) {
            self.start_node(PrefixExpression);
            self.operation();
            self.prefix_expression();
            self.finish_node();
        } else {
            self.postfix_expression();
        }
    }

    fn postfix_expression(&mut self) {
        let checkpoint = self.checkpoint();
        self.primary_expression();
        loop {
            match self.peek() {
                Some(kind @ (Dot | SafeAccess)) => {
                    let wrapper = if kind == Dot {
                        DotQualifiedExpression
                    } else {
                        SafeAccessExpression
                    };
                    self.start_node_at(checkpoint, wrapper);
                    self.bump();
                    if self.at(Identifier) {
                        self.call_or_reference();
                    } else {
                        self.error("Expecting an identifier".to_string());
                    }
                    self.finish_node();
                }
                Some(LPar) if !self.newline_before() => {
                    self.start_node_at(checkpoint, CallExpression);
                    self.value_argument_list();
                    self.lambda_arguments();
                    self.finish_node();
                }
                Some(LBracket) if !self.newline_before() => {
                    self.start_node_at(checkpoint, ArrayAccessExpression);
                    self.start_node(Indices);
                    self.bracketed_expressions();
                    self.finish_node();
                    self.finish_node();
                }
                _ => break,
            }
        }
    }

    fn primary_expression(&mut self) {
        match self.peek() {
            Some(Identifier) => self.call_or_reference(),
            Some(IntegerLiteral) => self.constant(IntegerConstant),
            Some(FloatLiteral) => self.constant(FloatConstant),
            Some(CharacterLiteral) => self.constant(CharacterConstant),
            Some(TrueKeyword) | Some(FalseKeyword) => self.constant(BooleanConstant),
            Some(NullKeyword) => self.constant(NullConstant),
            Some(OpenQuote) => self.string_template(),
            Some(LPar) => {
                self.start_node(Parenthesized);
                self.bump();
                self.with_newline_mode(false, |p| p.expression());
                self.expect(RPar);
                self.finish_node();
            }
            Some(LBracket) => {
                self.start_node(CollectionLiteralExpression);
                self.bracketed_expressions();
                self.finish_node();
            }
            Some(LBrace) => self.lambda_expression(),
            Some(IfKeyword) => self.if_expression(),
            Some(WhenKeyword) => self.when_expression(),
            Some(ReturnKeyword) => self.jump(ReturnExpression),
            Some(ThrowKeyword) => self.jump(ThrowExpression),
            Some(_) => self.error_token(),
            None => self.error("Expecting an expression".to_string()),
        }
    }

    fn constant(&mut self, kind: ElementType) {
        self.start_node(kind);
        self.bump();
        self.finish_node();
    }

    fn reference(&mut self) {
        self.start_node(ReferenceExpression);
        self.bump();
        self.finish_node();
    }

    fn call_or_reference(&mut self) {
        let checkpoint = self.checkpoint();
        self.reference();
        let type_arguments = self.same_line_at(Lt) && self.looks_like_type_arguments();
        let is_call = type_arguments || self.same_line_at(LPar) || self.same_line_at(LBrace);
        if !is_call {
            return;
        }
        self.start_node_at(checkpoint, CallExpression);
        if type_arguments {
            self.type_argument_list();
        }
        if self.same_line_at(LPar) {
            self.value_argument_list();
        }
        self.lambda_arguments();
        self.finish_node();
    }

    fn lambda_arguments(&mut self) {
        while self.same_line_at(LBrace) {
            self.start_node(LambdaArgument);
            self.lambda_expression();
            self.finish_node();
        }
    }

    fn value_argument_list(&mut self) {
        self.start_node(ValueArgumentList);
        self.bump();
        self.with_newline_mode(false, |p| {
            while !p.at(RPar) && !p.at_eof() {
                p.start_node(ValueArgument);
                if p.at(Identifier) && p.nth_kind(1) == Some(Eq) {
                    p.bump();
                    p.bump();
                }
                if p.at(Mul) {
                    p.bump();
                }
                p.expression();
                p.finish_node();
                if p.at(Comma) {
                    p.bump();
                } else {
                    break;
                }
            }
        });
        self.expect(RPar);
        self.finish_node();
    }

    /// `[a, b]`, used by collection literals and indices
    fn bracketed_expressions(&mut self) {
        self.bump();
        self.with_newline_mode(false, |p| {
            while !p.at(RBracket) && !p.at_eof() {
                p.expression();
                if p.at(Comma) {
                    p.bump();
                } else {
                    break;
                }
            }
        });
        self.expect(RBracket);
    }

    fn lambda_has_parameters(&self) -> bool {
        let mut n = 0;
        while let Some(kind) = self.nth_kind(n) {
            match kind {
                Arrow => return true,
                Identifier | Comma | Colon | Dot | Lt | Gt | Quest => n += 1,
                _ => return false,
            }
        }
        false
    }

    fn lambda_expression(&mut self) {
        self.start_node(LambdaExpression);
        self.start_node(FunctionLiteral);
        self.bump();
        self.with_newline_mode(true, |p| {
            if p.lambda_has_parameters() {
                if !p.at(Arrow) {
                    p.start_node(ValueParameterList);
                    loop {
                        p.start_node(ValueParameter);
                        p.expect(Identifier);
                        if p.at(Colon) {
                            p.bump();
                            p.type_reference();
                        }
                        p.finish_node();
                        if p.at(Comma) {
                            p.bump();
                        } else {
                            break;
                        }
                    }
                    p.finish_node();
                }
                p.expect(Arrow);
            }
            p.start_node(Block);
            p.statements(true);
            p.finish_node();
        });
        self.expect(RBrace);
        self.finish_node();
        self.finish_node();
    }

    fn if_expression(&mut self) {
        self.start_node(If);
        self.bump();
        self.condition();
        self.start_node(Then);
        self.control_structure_body();
        self.finish_node();
        if self.at(ElseKeyword) {
            self.bump();
            self.start_node(Else);
            self.control_structure_body();
            self.finish_node();
        }
        self.finish_node();
    }

    fn when_expression(&mut self) {
        self.start_node(When);
        self.bump();
        if self.same_line_at(LPar) {
            self.bump();
            self.with_newline_mode(false, |p| p.expression());
            self.expect(RPar);
        }
        self.expect(LBrace);
        self.with_newline_mode(true, |p| {
            while !p.at(RBrace) && !p.at_eof() {
                let before = p.pos;
                p.when_entry();
                if p.at(Semicolon) {
                    p.bump();
                }
                if p.pos == before {
                    p.error_token();
                }
            }
        });
        self.expect(RBrace);
        self.finish_node();
    }

    fn when_entry(&mut self) {
        self.start_node(WhenEntry);
        if self.at(ElseKeyword) {
            self.bump();
        } else {
            loop {
                self.start_node(WhenConditionExpression);
                match self.peek() {
                    Some(InKeyword) => {
                        self.bump();
                        self.expression();
                    }
                    Some(IsKeyword) => {
                        self.bump();
                        self.type_reference();
                    }
                    _ => self.expression(),
                }
                self.finish_node();
                if self.at(Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        if self.expect(Arrow) {
            self.control_structure_body();
        }
        self.finish_node();
    }

    fn jump(&mut self, kind: ElementType) {
        self.start_node(kind);
        self.bump();
        if self.peek().is_some_and(can_start_expression) && !self.newline_before() {
            self.expression();
        }
        self.finish_node();
    }

    fn string_template(&mut self) {
        self.start_node(StringTemplate);
        self.bump();
        loop {
            match self.peek() {
                Some(RegularStringPart) => {
                    self.start_node(LiteralStringTemplateEntry);
                    self.bump();
                    self.finish_node();
                }
                Some(ShortTemplateEntryStart) => {
                    self.start_node(ShortStringTemplateEntry);
                    self.bump();
                    if self.at(Identifier) {
                        self.reference();
                    }
                    self.finish_node();
                }
                Some(LongTemplateEntryStart) => {
                    self.start_node(LongStringTemplateEntry);
                    self.bump();
                    self.with_newline_mode(false, |p| p.expression());
                    self.expect(LongTemplateEntryEnd);
                    self.finish_node();
                }
                Some(ClosingQuote) => {
                    self.bump();
                    break;
                }
                _ => {
                    self.error("Unclosed string literal".to_string());
                    break;
                }
            }
        }
        self.finish_node();
    }
}

fn binary_precedence(kind: ElementType) -> Option<u8> {
    Some(match kind {
        OrOr => 1,
        AndAnd => 2,
        EqEq | ExclEq => 3,
        Lt | Gt | LtEq | GtEq => 4,
        InKeyword => 5,
        Elvis => 6,
        Range => 7,
        Plus | Minus => 8,
        Mul | Div | Perc => 9,
        _ => return None,
    })
}

fn can_start_expression(kind: ElementType) -> bool {
    matches!(
        kind,
        Identifier
            | IntegerLiteral
            | FloatLiteral
            | CharacterLiteral
            | TrueKeyword
            | FalseKeyword
            | NullKeyword
            | OpenQuote
            | LPar
            | LBracket
            | LBrace
            | IfKeyword
            | WhenKeyword
            | ThrowKeyword
            | Minus
            | Plus
            | Excl
    )
}

/// Split a KDoc comment into its start, text, whitespace, leading asterisk
/// and end tokens
fn kdoc_parts(text: &str) -> Vec<(ElementType, &str)> {
    let mut parts = vec![(KdocStart, &text[..3])];
    let (body, end) = match text.strip_suffix("*/") {
        Some(body) if body.len() >= 3 => (&body[3..], Some(&text[text.len() - 2..])),
        _ => (&text[3..], None),
    };

    let bytes = body.as_bytes();
    let mut i = 0;
    let mut line_start = false;
    while i < bytes.len() {
        let start = i;
        if matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
            while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
                if bytes[i] == b'\n' {
                    line_start = true;
                }
                i += 1;
            }
            parts.push((WhiteSpace, &body[start..i]));
        } else if line_start && bytes[i] == b'*' {
            i += 1;
            line_start = false;
            parts.push((KdocLeadingAsterisk, &body[start..i]));
        } else {
            line_start = false;
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            // Trailing blanks of a line are whitespace, not text
            let text_end = start + body[start..i].trim_end_matches([' ', '\t', '\r']).len();
            parts.push((KdocText, &body[start..text_end]));
            i = text_end;
        }
    }

    if let Some(end) = end {
        parts.push((KdocEnd, end));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dump(source: &str) -> String {
        let parse = parse(source);
        assert_eq!(parse.errors, vec![], "unexpected parse errors");
        assert_eq!(parse.tree.text(parse.tree.root()), source);
        parse.tree.debug_tree(parse.tree.root())
    }

    #[test]
    fn test_function_with_call() {
        assert_eq!(
            dump("fun foo() {\n    bar(1, x)\n}\n"),
            r#"FILE
  FUN
    FUN_KEYWORD "fun"
    WHITE_SPACE " "
    IDENTIFIER "foo"
    VALUE_PARAMETER_LIST
      LPAR "("
      RPAR ")"
    WHITE_SPACE " "
    BLOCK
      LBRACE "{"
      WHITE_SPACE "\n    "
      CALL_EXPRESSION
        REFERENCE_EXPRESSION
          IDENTIFIER "bar"
        VALUE_ARGUMENT_LIST
          LPAR "("
          VALUE_ARGUMENT
            INTEGER_CONSTANT
              INTEGER_LITERAL "1"
          COMMA ","
          WHITE_SPACE " "
          VALUE_ARGUMENT
            REFERENCE_EXPRESSION
              IDENTIFIER "x"
          RPAR ")"
      WHITE_SPACE "\n"
      RBRACE "}"
  WHITE_SPACE "\n"
"#
        );
    }

    #[test]
    fn test_imports_and_comments() {
        assert_eq!(
            dump("import b.B\n// c\nimport a.*\n"),
            r#"FILE
  IMPORT_LIST
    IMPORT_DIRECTIVE
      IMPORT_KEYWORD "import"
      WHITE_SPACE " "
      IDENTIFIER "b"
      DOT "."
      IDENTIFIER "B"
    WHITE_SPACE "\n"
    EOL_COMMENT "// c"
    WHITE_SPACE "\n"
    IMPORT_DIRECTIVE
      IMPORT_KEYWORD "import"
      WHITE_SPACE " "
      IDENTIFIER "a"
      DOT "."
      MUL "*"
  WHITE_SPACE "\n"
"#
        );
    }

    #[test]
    fn test_binary_expression_stops_at_newline() {
        let parse = parse("val a = b\n+ c\nval d = e ?:\n    f\n");
        let tree = &parse.tree;
        let kinds: Vec<_> = tree
            .children(tree.root())
            .iter()
            .map(|&child| tree.kind(child))
            .filter(|kind| !kind.is_whitespace())
            .collect();
        assert_eq!(kinds, vec![Property, PrefixExpression, Property]);
    }

    #[test]
    fn test_dot_qualified_chain_continues_on_next_line() {
        let source = "val x = a\n    .b()\n    ?.c\n";
        let parse = parse(source);
        let tree = &parse.tree;
        let property = tree.children(tree.root())[0];
        let chain = tree.find_child_by_type(property, SafeAccessExpression);
        assert!(chain.is_some());
        let inner = tree.first_child(chain.unwrap_or(property)).map(|n| tree.kind(n));
        assert_eq!(inner, Some(DotQualifiedExpression));
    }

    #[test]
    fn test_if_else_and_raw_string() {
        let source = "val x = if (a) {\n    \"\"\"\n    y\n    \"\"\".trimIndent()\n} else b\n";
        let parse = parse(source);
        assert!(parse.errors.is_empty());
        let tree = &parse.tree;
        let if_node = tree.descendants(tree.root()).into_iter().find(|&n| tree.kind(n) == If);
        let if_node = if_node.unwrap_or(tree.root());
        assert!(tree.find_child_by_type(if_node, Condition).is_some());
        assert!(tree.find_child_by_type(if_node, Then).is_some());
        assert!(tree.find_child_by_type(if_node, Else).is_some());
        let entries = tree
            .descendants(tree.root())
            .into_iter()
            .filter(|&n| tree.kind(n) == LiteralStringTemplateEntry)
            .map(|n| tree.text(n))
            .collect::<Vec<_>>();
        assert_eq!(entries, vec!["\n", "    y", "\n", "    "]);
    }

    #[test]
    fn test_kdoc_is_split() {
        let parts = kdoc_parts("/**\n * Foo  \n */");
        assert_eq!(
            parts,
            vec![
                (KdocStart, "/**"),
                (WhiteSpace, "\n "),
                (KdocLeadingAsterisk, "*"),
                (WhiteSpace, " "),
                (KdocText, "Foo"),
                (WhiteSpace, "  \n "),
                (KdocEnd, "*/"),
            ]
        );
    }

    #[test]
    fn test_unsupported_input_is_reported() {
        let parse = parse("val x = @\n");
        assert_eq!(parse.errors.len(), 1);
        assert_eq!(parse.tree.text(parse.tree.root()), "val x = @\n");
    }
}
