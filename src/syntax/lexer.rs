//! Tokenizer for the supported Kotlin subset
//!
//! Produces a flat token stream whose texts concatenate to the input. Runs of
//! whitespace, including line breaks, form a single token. String literals
//! are split into quote, literal part and template tokens; a line break inside
//! a raw string is always a part of its own.

use crate::element_type::ElementType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: ElementType,
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Open braces inside a `${...}` entry, zero at top level
    Code { braces: usize },
    String,
    RawString,
}

const OPERATORS: &[(&str, ElementType)] = &[
    ("?.", ElementType::SafeAccess),
    ("?:", ElementType::Elvis),
    ("->", ElementType::Arrow),
    ("==", ElementType::EqEq),
    ("!=", ElementType::ExclEq),
    ("<=", ElementType::LtEq),
    (">=", ElementType::GtEq),
    ("&&", ElementType::AndAnd),
    ("||", ElementType::OrOr),
    ("..", ElementType::Range),
    ("+=", ElementType::PlusEq),
    ("-=", ElementType::MinusEq),
    ("::", ElementType::ColonColon),
    ("(", ElementType::LPar),
    (")", ElementType::RPar),
    ("[", ElementType::LBracket),
    ("]", ElementType::RBracket),
    ("<", ElementType::Lt),
    (">", ElementType::Gt),
    (",", ElementType::Comma),
    (":", ElementType::Colon),
    (";", ElementType::Semicolon),
    (".", ElementType::Dot),
    ("=", ElementType::Eq),
    ("+", ElementType::Plus),
    ("-", ElementType::Minus),
    ("*", ElementType::Mul),
    ("/", ElementType::Div),
    ("%", ElementType::Perc),
    ("!", ElementType::Excl),
    ("?", ElementType::Quest),
];

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    modes: Vec<Mode>,
    tokens: Vec<Token<'a>>,
}

pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer {
        source,
        pos: 0,
        modes: vec![Mode::Code { braces: 0 }],
        tokens: Vec::new(),
    };
    lexer.run();
    lexer.tokens
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{000C}')
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn push(&mut self, kind: ElementType, len: usize) {
        let text = &self.source[self.pos..self.pos + len];
        self.tokens.push(Token { kind, text });
        self.pos += len;
    }

    /// Byte length of the longest prefix of the remaining input whose chars
    /// satisfy `predicate`
    fn prefix_len(&self, predicate: impl Fn(char) -> bool) -> usize {
        self.rest()
            .char_indices()
            .find(|&(_, c)| !predicate(c))
            .map(|(i, _)| i)
            .unwrap_or(self.rest().len())
    }

    fn run(&mut self) {
        while self.pos < self.source.len() {
            match self.modes.last().copied().unwrap_or(Mode::Code { braces: 0 }) {
                Mode::Code { braces } => self.lex_code(braces),
                Mode::String => self.lex_string(false),
                Mode::RawString => self.lex_string(true),
            }
        }
    }

    fn set_braces(&mut self, braces: usize) {
        if let Some(Mode::Code { braces: current }) = self.modes.last_mut() {
            *current = braces;
        }
    }

    fn lex_code(&mut self, braces: usize) {
        let rest = self.rest();
        let Some(c) = self.peek() else {
            return;
        };

        if is_blank(c) {
            let len = self.prefix_len(is_blank);
            self.push(ElementType::WhiteSpace, len);
        } else if rest.starts_with("//") {
            let len = rest.find('\n').unwrap_or(rest.len());
            self.push(ElementType::EolComment, len);
        } else if rest.starts_with("/*") {
            let len = block_comment_len(rest);
            let kind = if rest.starts_with("/**") && !rest.starts_with("/**/") {
                ElementType::Kdoc
            } else {
                ElementType::BlockComment
            };
            self.push(kind, len);
        } else if rest.starts_with("\"\"\"") {
            self.push(ElementType::OpenQuote, 3);
            self.modes.push(Mode::RawString);
        } else if c == '"' {
            self.push(ElementType::OpenQuote, 1);
            self.modes.push(Mode::String);
        } else if c == '\'' {
            self.push(ElementType::CharacterLiteral, char_literal_len(rest));
        } else if c.is_ascii_digit() {
            let (kind, len) = number(rest);
            self.push(kind, len);
        } else if c == '`' {
            let len = rest[1..].find('`').map(|i| i + 2).unwrap_or(rest.len());
            self.push(ElementType::Identifier, len);
        } else if is_identifier_start(c) {
            let len = self.prefix_len(is_identifier_part);
            let kind = ElementType::keyword_from_str(&rest[..len]).unwrap_or(ElementType::Identifier);
            self.push(kind, len);
        } else if c == '{' {
            self.set_braces(braces + 1);
            self.push(ElementType::LBrace, 1);
        } else if c == '}' {
            if braces == 0 && self.modes.len() > 1 {
                self.modes.pop();
                self.push(ElementType::LongTemplateEntryEnd, 1);
            } else {
                self.set_braces(braces.saturating_sub(1));
                self.push(ElementType::RBrace, 1);
            }
        } else if let Some((op, kind)) = OPERATORS.iter().find(|(op, _)| rest.starts_with(op)) {
            self.push(*kind, op.len());
        } else {
            self.push(ElementType::BadCharacter, c.len_utf8());
        }
    }

    fn lex_string(&mut self, raw: bool) {
        let rest = self.rest();
        let Some(c) = self.peek() else {
            return;
        };

        if raw && rest.starts_with("\"\"\"") {
            // The closing delimiter is the last three quotes of the run
            let quotes = self.prefix_len(|c| c == '"');
            if quotes > 3 {
                self.push(ElementType::RegularStringPart, quotes - 3);
            }
            self.push(ElementType::ClosingQuote, 3);
            self.modes.pop();
        } else if !raw && c == '"' {
            self.push(ElementType::ClosingQuote, 1);
            self.modes.pop();
        } else if c == '\n' {
            if raw {
                self.push(ElementType::RegularStringPart, 1);
            } else {
                // Unterminated single line string
                self.modes.pop();
            }
        } else if rest.starts_with("${") {
            self.push(ElementType::LongTemplateEntryStart, 2);
            self.modes.push(Mode::Code { braces: 0 });
        } else if c == '$' && rest[1..].chars().next().is_some_and(is_identifier_start) {
            self.push(ElementType::ShortTemplateEntryStart, 1);
            let len = self.prefix_len(is_identifier_part);
            self.push(ElementType::Identifier, len);
        } else {
            let mut len = 0;
            let mut chars = rest.char_indices().peekable();
            while let Some((i, c)) = chars.next() {
                len = i;
                if c == '\n' || c == '"' {
                    break;
                }
                if c == '$' && i > 0 {
                    let after = &rest[i + 1..];
                    if after.starts_with('{') || after.chars().next().is_some_and(is_identifier_start) {
                        break;
                    }
                }
                if c == '\\' && !raw {
                    chars.next();
                }
                len = chars.peek().map(|&(j, _)| j).unwrap_or(rest.len());
            }
            if len == 0 {
                len = c.len_utf8();
            }
            self.push(ElementType::RegularStringPart, len);
        }
    }
}

fn block_comment_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    text.len()
}

fn char_literal_len(text: &str) -> usize {
    let mut escaped = false;
    for (i, c) in text.char_indices().skip(1) {
        match c {
            '\\' if !escaped => escaped = true,
            '\'' if !escaped => return i + 1,
            '\n' => return i,
            _ => escaped = false,
        }
    }
    text.len()
}

fn number(text: &str) -> (ElementType, usize) {
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut kind = ElementType::IntegerLiteral;
    if text.starts_with("0x") || text.starts_with("0X") || text.starts_with("0b") || text.starts_with("0B") {
        i = 2;
        while i < bytes.len() && (bytes[i].is_ascii_hexdigit() || bytes[i] == b'_') {
            i += 1;
        }
    } else {
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
            i += 1;
        }
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            kind = ElementType::FloatLiteral;
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
                i += 1;
            }
        }
        if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
            kind = ElementType::FloatLiteral;
            i += 1;
            if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                i += 1;
            }
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    match bytes.get(i) {
        Some(b'f' | b'F') => (ElementType::FloatLiteral, i + 1),
        Some(b'L') => (kind, i + 1),
        Some(b'u' | b'U') => {
            if bytes.get(i + 1) == Some(&b'L') {
                (kind, i + 2)
            } else {
                (kind, i + 1)
            }
        }
        _ => (kind, i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<(ElementType, &str)> {
        tokenize(source).into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn test_whitespace_and_comments() {
        assert_eq!(
            kinds("a \n\t// x\n/* /* */ */b"),
            vec![
                (ElementType::Identifier, "a"),
                (ElementType::WhiteSpace, " \n\t"),
                (ElementType::EolComment, "// x"),
                (ElementType::WhiteSpace, "\n"),
                (ElementType::BlockComment, "/* /* */ */"),
                (ElementType::Identifier, "b"),
            ]
        );
        assert_eq!(kinds("/** doc */")[0].0, ElementType::Kdoc);
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("a?.b ?: c..d"),
            vec![
                (ElementType::Identifier, "a"),
                (ElementType::SafeAccess, "?."),
                (ElementType::Identifier, "b"),
                (ElementType::WhiteSpace, " "),
                (ElementType::Elvis, "?:"),
                (ElementType::WhiteSpace, " "),
                (ElementType::Identifier, "c"),
                (ElementType::Range, ".."),
                (ElementType::Identifier, "d"),
            ]
        );
    }

    #[test]
    fn test_string_templates() {
        assert_eq!(
            kinds("\"a $b ${c + {}}\""),
            vec![
                (ElementType::OpenQuote, "\""),
                (ElementType::RegularStringPart, "a "),
                (ElementType::ShortTemplateEntryStart, "$"),
                (ElementType::Identifier, "b"),
                (ElementType::RegularStringPart, " "),
                (ElementType::LongTemplateEntryStart, "${"),
                (ElementType::Identifier, "c"),
                (ElementType::WhiteSpace, " "),
                (ElementType::Plus, "+"),
                (ElementType::WhiteSpace, " "),
                (ElementType::LBrace, "{"),
                (ElementType::RBrace, "}"),
                (ElementType::LongTemplateEntryEnd, "}"),
                (ElementType::ClosingQuote, "\""),
            ]
        );
    }

    #[test]
    fn test_raw_string_line_breaks() {
        assert_eq!(
            kinds("\"\"\"\n  x\n\"\"\"\""),
            vec![
                (ElementType::OpenQuote, "\"\"\""),
                (ElementType::RegularStringPart, "\n"),
                (ElementType::RegularStringPart, "  x"),
                (ElementType::RegularStringPart, "\n"),
                (ElementType::RegularStringPart, "\""),
                (ElementType::ClosingQuote, "\"\"\""),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("1_000L")[0], (ElementType::IntegerLiteral, "1_000L"));
        assert_eq!(kinds("1.5f")[0], (ElementType::FloatLiteral, "1.5f"));
        assert_eq!(kinds("1..2")[0], (ElementType::IntegerLiteral, "1"));
    }
}
