//! Read-only editor configuration properties
//!
//! Properties are kept as strings and converted on access, so an invalid
//! value behaves like an absent one and falls back to the default of the
//! active code style. Keyword values are case insensitive.

use rustc_hash::FxHashMap;

pub const INDENT_STYLE: &str = "indent_style";
pub const INDENT_SIZE: &str = "indent_size";
pub const MAX_LINE_LENGTH: &str = "max_line_length";
pub const INSERT_FINAL_NEWLINE: &str = "insert_final_newline";
pub const END_OF_LINE: &str = "end_of_line";
pub const CODE_STYLE: &str = "ktlint_code_style";
pub const IMPORTS_LAYOUT: &str = "ij_kotlin_imports_layout";
pub const ALLOW_TRAILING_COMMA_ON_CALL_SITE: &str = "ij_kotlin_allow_trailing_comma_on_call_site";
pub const INDENT_BEFORE_ARROW_ON_NEW_LINE: &str = "ij_kotlin_indent_before_arrow_on_new_line";
pub const ARGUMENT_LIST_WRAPPING_IGNORE_THRESHOLD: &str =
    "ktlint_argument_list_wrapping_ignore_when_parameter_count_greater_or_equal_than";
pub const KTLINT: &str = "ktlint";
pub const EXPERIMENTAL: &str = "ktlint_experimental";

pub const DEFAULT_INDENT_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeStyle {
    #[default]
    KtlintOfficial,
    IntellijIdea,
    AndroidStudio,
}

impl CodeStyle {
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "ktlint_official" => Some(CodeStyle::KtlintOfficial),
            "intellij_idea" => Some(CodeStyle::IntellijIdea),
            "android_studio" => Some(CodeStyle::AndroidStudio),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CodeStyle::KtlintOfficial => "ktlint_official",
            CodeStyle::IntellijIdea => "intellij_idea",
            CodeStyle::AndroidStudio => "android_studio",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndentStyle {
    #[default]
    Space,
    Tab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfLine {
    Lf,
    CrLf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleExecution {
    Enabled,
    Disabled,
}

/// Property map handed to the engine and to every rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorConfig {
    properties: FxHashMap<String, String>,
}

impl EditorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut config = Self::new();
        for (key, value) in pairs {
            config.set(key, value);
        }
        config
    }

    /// Builder style [`EditorConfig::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties
            .insert(key.into(), value.into().trim().to_string());
    }

    /// Copy every property of `other` over this configuration
    pub fn merge(&mut self, other: &EditorConfig) {
        for (key, value) in &other.properties {
            self.properties.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Lowercase value, for keyword properties
    fn keyword(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_lowercase)
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.keyword(key)?.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    pub fn code_style(&self) -> CodeStyle {
        self.keyword(CODE_STYLE)
            .and_then(|value| CodeStyle::from_value(&value))
            .unwrap_or_default()
    }

    pub fn indent_style(&self) -> IndentStyle {
        match self.keyword(INDENT_STYLE).as_deref() {
            Some("tab") => IndentStyle::Tab,
            _ => IndentStyle::Space,
        }
    }

    /// Width of one indent level; `0` disables indentation checks
    pub fn indent_size(&self) -> usize {
        match self.keyword(INDENT_SIZE).as_deref() {
            Some("unset") => 0,
            Some(value) => match value.parse::<i64>() {
                Ok(size) if size <= 0 => 0,
                Ok(size) => size as usize,
                Err(_) => DEFAULT_INDENT_SIZE,
            },
            None => DEFAULT_INDENT_SIZE,
        }
    }

    /// `None` when the line length is not limited
    pub fn max_line_length(&self) -> Option<usize> {
        match self.keyword(MAX_LINE_LENGTH).as_deref() {
            Some("off") | Some("unset") => None,
            Some(value) => match value.parse::<i64>() {
                Ok(length) if length <= 0 => None,
                Ok(length) => Some(length as usize),
                Err(_) => self.default_max_line_length(),
            },
            None => self.default_max_line_length(),
        }
    }

    fn default_max_line_length(&self) -> Option<usize> {
        match self.code_style() {
            CodeStyle::KtlintOfficial => Some(140),
            CodeStyle::AndroidStudio => Some(100),
            CodeStyle::IntellijIdea => None,
        }
    }

    pub fn insert_final_newline(&self) -> bool {
        self.get_bool(INSERT_FINAL_NEWLINE).unwrap_or(true)
    }

    /// `None` when the line separator should be detected from the input
    pub fn end_of_line(&self) -> Option<EndOfLine> {
        match self.keyword(END_OF_LINE)?.as_str() {
            "lf" => Some(EndOfLine::Lf),
            "crlf" => Some(EndOfLine::CrLf),
            _ => None,
        }
    }

    pub fn imports_layout(&self) -> String {
        match self.get(IMPORTS_LAYOUT) {
            Some(layout) if !layout.is_empty() => layout.to_string(),
            _ => match self.code_style() {
                CodeStyle::AndroidStudio => "*".to_string(),
                _ => "*,java.**,javax.**,kotlin.**,^".to_string(),
            },
        }
    }

    pub fn allow_trailing_comma_on_call_site(&self) -> bool {
        self.get_bool(ALLOW_TRAILING_COMMA_ON_CALL_SITE)
            .unwrap_or(self.code_style() != CodeStyle::AndroidStudio)
    }

    pub fn indent_before_arrow_on_new_line(&self) -> bool {
        self.get_bool(INDENT_BEFORE_ARROW_ON_NEW_LINE)
            .unwrap_or(false)
    }

    /// `None` when argument lists are wrapped regardless of their size
    pub fn argument_list_wrapping_ignore_threshold(&self) -> Option<usize> {
        match self.keyword(ARGUMENT_LIST_WRAPPING_IGNORE_THRESHOLD).as_deref() {
            Some("unset") => None,
            Some(value) => value.parse().ok(),
            None => match self.code_style() {
                CodeStyle::KtlintOfficial => None,
                _ => Some(8),
            },
        }
    }

    pub fn rule_execution(&self, key: &str) -> Option<RuleExecution> {
        match self.keyword(key)?.as_str() {
            "enabled" => Some(RuleExecution::Enabled),
            "disabled" => Some(RuleExecution::Disabled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::new();
        assert_eq!(config.code_style(), CodeStyle::KtlintOfficial);
        assert_eq!(config.indent_style(), IndentStyle::Space);
        assert_eq!(config.indent_size(), 4);
        assert_eq!(config.max_line_length(), Some(140));
        assert!(config.insert_final_newline());
        assert_eq!(config.end_of_line(), None);
        assert_eq!(config.imports_layout(), "*,java.**,javax.**,kotlin.**,^");
        assert!(config.allow_trailing_comma_on_call_site());
        assert_eq!(config.argument_list_wrapping_ignore_threshold(), None);
    }

    #[test]
    fn test_code_style_defaults() {
        let config = EditorConfig::new().with(CODE_STYLE, "android_studio");
        assert_eq!(config.max_line_length(), Some(100));
        assert_eq!(config.imports_layout(), "*");
        assert!(!config.allow_trailing_comma_on_call_site());
        assert_eq!(config.argument_list_wrapping_ignore_threshold(), Some(8));

        let config = EditorConfig::new().with(CODE_STYLE, "intellij_idea");
        assert_eq!(config.max_line_length(), None);
    }

    #[test]
    fn test_values_are_normalized() {
        let config = EditorConfig::from_pairs([
            (INDENT_STYLE, " TAB "),
            (INDENT_SIZE, "unset"),
            (MAX_LINE_LENGTH, "off"),
            ("ktlint_standard_indent", "Disabled"),
        ]);
        assert_eq!(config.indent_style(), IndentStyle::Tab);
        assert_eq!(config.indent_size(), 0);
        assert_eq!(config.max_line_length(), None);
        assert_eq!(
            config.rule_execution("ktlint_standard_indent"),
            Some(RuleExecution::Disabled)
        );
    }
}
