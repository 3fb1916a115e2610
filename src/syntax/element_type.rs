//! Element types of the concrete syntax tree
//!
//! The set is closed: every node carries exactly one of these tags. Names
//! rendered by [`ElementType::as_str`] follow the upper snake case used by
//! the Kotlin PSI so that tree dumps read the same as the IDE's.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    // Composites
    File,
    PackageDirective,
    ImportList,
    ImportDirective,
    ImportAlias,
    Class,
    ClassBody,
    Fun,
    Property,
    ValueParameterList,
    ValueParameter,
    TypeReference,
    UserType,
    NullableType,
    TypeArgumentList,
    TypeProjection,
    Block,
    ReturnExpression,
    ThrowExpression,
    CallExpression,
    ValueArgumentList,
    ValueArgument,
    LambdaArgument,
    LambdaExpression,
    FunctionLiteral,
    DotQualifiedExpression,
    SafeAccessExpression,
    ArrayAccessExpression,
    Indices,
    BinaryExpression,
    OperationReference,
    PrefixExpression,
    Parenthesized,
    If,
    Condition,
    Then,
    Else,
    When,
    WhenEntry,
    WhenConditionExpression,
    For,
    While,
    LoopRange,
    Body,
    StringTemplate,
    LiteralStringTemplateEntry,
    ShortStringTemplateEntry,
    LongStringTemplateEntry,
    ReferenceExpression,
    IntegerConstant,
    FloatConstant,
    CharacterConstant,
    BooleanConstant,
    NullConstant,
    CollectionLiteralExpression,
    Kdoc,
    ErrorElement,

    // Trivia
    WhiteSpace,
    EolComment,
    BlockComment,
    KdocStart,
    KdocText,
    KdocLeadingAsterisk,
    KdocEnd,

    // Tokens
    Identifier,
    IntegerLiteral,
    FloatLiteral,
    CharacterLiteral,
    OpenQuote,
    ClosingQuote,
    RegularStringPart,
    ShortTemplateEntryStart,
    LongTemplateEntryStart,
    LongTemplateEntryEnd,

    PackageKeyword,
    ImportKeyword,
    AsKeyword,
    ClassKeyword,
    FunKeyword,
    ValKeyword,
    VarKeyword,
    ReturnKeyword,
    ThrowKeyword,
    IfKeyword,
    ElseKeyword,
    WhenKeyword,
    ForKeyword,
    WhileKeyword,
    InKeyword,
    IsKeyword,
    TrueKeyword,
    FalseKeyword,
    NullKeyword,

    LPar,
    RPar,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Comma,
    Colon,
    Semicolon,
    Dot,
    SafeAccess,
    Arrow,
    Eq,
    PlusEq,
    MinusEq,
    EqEq,
    ExclEq,
    Plus,
    Minus,
    Mul,
    Div,
    Perc,
    AndAnd,
    OrOr,
    Excl,
    Elvis,
    Range,
    Quest,
    ColonColon,
    BadCharacter,
}

impl ElementType {
    pub fn as_str(self) -> &'static str {
        use ElementType::*;
        match self {
            File => "FILE",
            PackageDirective => "PACKAGE_DIRECTIVE",
            ImportList => "IMPORT_LIST",
            ImportDirective => "IMPORT_DIRECTIVE",
            ImportAlias => "IMPORT_ALIAS",
            Class => "CLASS",
            ClassBody => "CLASS_BODY",
            Fun => "FUN",
            Property => "PROPERTY",
            ValueParameterList => "VALUE_PARAMETER_LIST",
            ValueParameter => "VALUE_PARAMETER",
            TypeReference => "TYPE_REFERENCE",
            UserType => "USER_TYPE",
            NullableType => "NULLABLE_TYPE",
            TypeArgumentList => "TYPE_ARGUMENT_LIST",
            TypeProjection => "TYPE_PROJECTION",
            Block => "BLOCK",
            ReturnExpression => "RETURN",
            ThrowExpression => "THROW",
            CallExpression => "CALL_EXPRESSION",
            ValueArgumentList => "VALUE_ARGUMENT_LIST",
            ValueArgument => "VALUE_ARGUMENT",
            LambdaArgument => "LAMBDA_ARGUMENT",
            LambdaExpression => "LAMBDA_EXPRESSION",
            FunctionLiteral => "FUNCTION_LITERAL",
            DotQualifiedExpression => "DOT_QUALIFIED_EXPRESSION",
            SafeAccessExpression => "SAFE_ACCESS_EXPRESSION",
            ArrayAccessExpression => "ARRAY_ACCESS_EXPRESSION",
            Indices => "INDICES",
            BinaryExpression => "BINARY_EXPRESSION",
            OperationReference => "OPERATION_REFERENCE",
            PrefixExpression => "PREFIX_EXPRESSION",
            Parenthesized => "PARENTHESIZED",
            If => "IF",
            Condition => "CONDITION",
            Then => "THEN",
            Else => "ELSE",
            When => "WHEN",
            WhenEntry => "WHEN_ENTRY",
            WhenConditionExpression => "WHEN_CONDITION_EXPRESSION",
            For => "FOR",
            While => "WHILE",
            LoopRange => "LOOP_RANGE",
            Body => "BODY",
            StringTemplate => "STRING_TEMPLATE",
            LiteralStringTemplateEntry => "LITERAL_STRING_TEMPLATE_ENTRY",
            ShortStringTemplateEntry => "SHORT_STRING_TEMPLATE_ENTRY",
            LongStringTemplateEntry => "LONG_STRING_TEMPLATE_ENTRY",
            ReferenceExpression => "REFERENCE_EXPRESSION",
            IntegerConstant => "INTEGER_CONSTANT",
            FloatConstant => "FLOAT_CONSTANT",
            CharacterConstant => "CHARACTER_CONSTANT",
            BooleanConstant => "BOOLEAN_CONSTANT",
            NullConstant => "NULL",
            CollectionLiteralExpression => "COLLECTION_LITERAL_EXPRESSION",
            Kdoc => "KDOC",
            ErrorElement => "ERROR_ELEMENT",
            WhiteSpace => "WHITE_SPACE",
            EolComment => "EOL_COMMENT",
            BlockComment => "BLOCK_COMMENT",
            KdocStart => "KDOC_START",
            KdocText => "KDOC_TEXT",
            KdocLeadingAsterisk => "KDOC_LEADING_ASTERISK",
            KdocEnd => "KDOC_END",
            Identifier => "IDENTIFIER",
            IntegerLiteral => "INTEGER_LITERAL",
            FloatLiteral => "FLOAT_LITERAL",
            CharacterLiteral => "CHARACTER_LITERAL",
            OpenQuote => "OPEN_QUOTE",
            ClosingQuote => "CLOSING_QUOTE",
            RegularStringPart => "REGULAR_STRING_PART",
            ShortTemplateEntryStart => "SHORT_TEMPLATE_ENTRY_START",
            LongTemplateEntryStart => "LONG_TEMPLATE_ENTRY_START",
            LongTemplateEntryEnd => "LONG_TEMPLATE_ENTRY_END",
            PackageKeyword => "PACKAGE_KEYWORD",
            ImportKeyword => "IMPORT_KEYWORD",
            AsKeyword => "AS_KEYWORD",
            ClassKeyword => "CLASS_KEYWORD",
            FunKeyword => "FUN_KEYWORD",
            ValKeyword => "VAL_KEYWORD",
            VarKeyword => "VAR_KEYWORD",
            ReturnKeyword => "RETURN_KEYWORD",
            ThrowKeyword => "THROW_KEYWORD",
            IfKeyword => "IF_KEYWORD",
            ElseKeyword => "ELSE_KEYWORD",
            WhenKeyword => "WHEN_KEYWORD",
            ForKeyword => "FOR_KEYWORD",
            WhileKeyword => "WHILE_KEYWORD",
            InKeyword => "IN_KEYWORD",
            IsKeyword => "IS_KEYWORD",
            TrueKeyword => "TRUE_KEYWORD",
            FalseKeyword => "FALSE_KEYWORD",
            NullKeyword => "NULL_KEYWORD",
            LPar => "LPAR",
            RPar => "RPAR",
            LBrace => "LBRACE",
            RBrace => "RBRACE",
            LBracket => "LBRACKET",
            RBracket => "RBRACKET",
            Lt => "LT",
            Gt => "GT",
            LtEq => "LTEQ",
            GtEq => "GTEQ",
            Comma => "COMMA",
            Colon => "COLON",
            Semicolon => "SEMICOLON",
            Dot => "DOT",
            SafeAccess => "SAFE_ACCESS",
            Arrow => "ARROW",
            Eq => "EQ",
            PlusEq => "PLUSEQ",
            MinusEq => "MINUSEQ",
            EqEq => "EQEQ",
            ExclEq => "EXCLEQ",
            Plus => "PLUS",
            Minus => "MINUS",
            Mul => "MUL",
            Div => "DIV",
            Perc => "PERC",
            AndAnd => "ANDAND",
            OrOr => "OROR",
            Excl => "EXCL",
            Elvis => "ELVIS",
            Range => "RANGE",
            Quest => "QUEST",
            ColonColon => "COLONCOLON",
            BadCharacter => "BAD_CHARACTER",
        }
    }

    pub fn is_whitespace(self) -> bool {
        self == ElementType::WhiteSpace
    }

    /// Comment tokens and the KDoc composite.
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            ElementType::EolComment | ElementType::BlockComment | ElementType::Kdoc
        )
    }

    pub fn is_kdoc_part(self) -> bool {
        matches!(
            self,
            ElementType::KdocStart
                | ElementType::KdocText
                | ElementType::KdocLeadingAsterisk
                | ElementType::KdocEnd
        )
    }

    /// Whitespace and comments, which the parser never makes part of a
    /// construct's shape.
    pub fn is_trivia(self) -> bool {
        self.is_whitespace() || self.is_comment()
    }

    pub fn is_keyword(self) -> bool {
        use ElementType::*;
        matches!(
            self,
            PackageKeyword
                | ImportKeyword
                | AsKeyword
                | ClassKeyword
                | FunKeyword
                | ValKeyword
                | VarKeyword
                | ReturnKeyword
                | ThrowKeyword
                | IfKeyword
                | ElseKeyword
                | WhenKeyword
                | ForKeyword
                | WhileKeyword
                | InKeyword
                | IsKeyword
                | TrueKeyword
                | FalseKeyword
                | NullKeyword
        )
    }

    pub fn is_control_flow_keyword(self) -> bool {
        matches!(
            self,
            ElementType::IfKeyword
                | ElementType::ElseKeyword
                | ElementType::WhenKeyword
                | ElementType::ForKeyword
                | ElementType::WhileKeyword
                | ElementType::ReturnKeyword
        )
    }

    pub fn is_chainable_expression(self) -> bool {
        matches!(
            self,
            ElementType::DotQualifiedExpression | ElementType::SafeAccessExpression
        )
    }

    pub fn keyword_from_str(text: &str) -> Option<ElementType> {
        use ElementType::*;
        Some(match text {
            "package" => PackageKeyword,
            "import" => ImportKeyword,
            "as" => AsKeyword,
            "class" => ClassKeyword,
            "fun" => FunKeyword,
            "val" => ValKeyword,
            "var" => VarKeyword,
            "return" => ReturnKeyword,
            "throw" => ThrowKeyword,
            "if" => IfKeyword,
            "else" => ElseKeyword,
            "when" => WhenKeyword,
            "for" => ForKeyword,
            "while" => WhileKeyword,
            "in" => InKeyword,
            "is" => IsKeyword,
            "true" => TrueKeyword,
            "false" => FalseKeyword,
            "null" => NullKeyword,
            _ => return None,
        })
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        assert_eq!(ElementType::keyword_from_str("fun"), Some(ElementType::FunKeyword));
        assert_eq!(ElementType::keyword_from_str("funny"), None);
        assert!(ElementType::WhenKeyword.is_control_flow_keyword());
        assert!(!ElementType::Identifier.is_keyword());
    }

    #[test]
    fn test_trivia() {
        assert!(ElementType::WhiteSpace.is_trivia());
        assert!(ElementType::Kdoc.is_trivia());
        assert!(!ElementType::KdocText.is_trivia());
        assert_eq!(ElementType::ReturnExpression.to_string(), "RETURN");
    }
}
