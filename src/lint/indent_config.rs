//! Indentation unit derived from the editor configuration

use crate::editor_config::{EditorConfig, IndentStyle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentConfig {
    pub indent_style: IndentStyle,
    /// Number of spaces equivalent to one tab
    pub tab_width: usize,
    indent: String,
}

impl IndentConfig {
    pub fn new(indent_style: IndentStyle, tab_width: usize) -> Self {
        let indent = if tab_width == 0 {
            String::new()
        } else {
            match indent_style {
                IndentStyle::Tab => "\t".to_string(),
                IndentStyle::Space => " ".repeat(tab_width),
            }
        };
        Self {
            indent_style,
            tab_width,
            indent,
        }
    }

    pub fn from_editor_config(editor_config: &EditorConfig) -> Self {
        Self::new(editor_config.indent_style(), editor_config.indent_size())
    }

    /// When disabled no rule may enforce indentation
    pub fn disabled(&self) -> bool {
        self.tab_width == 0
    }

    /// One level of indentation, a single tab or `tab_width` spaces
    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// Convert the indentation after the last newline of `text` to the
    /// configured style. Converting to tabs silently drops spaces which do
    /// not fill up a whole tab.
    pub fn to_normalized_indent(&self, text: &str) -> String {
        let indent = text_after_last_newline(text);
        match self.indent_style {
            IndentStyle::Space => indent.replace('\t', &" ".repeat(self.tab_width)),
            IndentStyle::Tab => "\t".repeat(self.indent_level_from(indent)),
        }
    }

    /// Number of whole indent levels in the indentation after the last
    /// newline of `text`
    pub fn indent_level_from(&self, text: &str) -> usize {
        if self.disabled() {
            return 0;
        }
        let indent = text_after_last_newline(text);
        let width: usize = indent
            .chars()
            .map(|c| if c == '\t' { self.tab_width } else { 1 })
            .sum();
        width / self.tab_width
    }

    fn unexpected_indent_char(&self) -> char {
        match self.indent_style {
            IndentStyle::Space => '\t',
            IndentStyle::Tab => ' ',
        }
    }

    pub fn contains_unexpected_indent_char(&self, indent: &str) -> bool {
        indent.contains(self.unexpected_indent_char())
    }
}

impl Default for IndentConfig {
    fn default() -> Self {
        Self::new(IndentStyle::Space, 4)
    }
}

fn text_after_last_newline(text: &str) -> &str {
    match text.rfind('\n') {
        Some(index) => &text[index + 1..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_indent() {
        let config = IndentConfig::new(IndentStyle::Space, 4);
        assert_eq!(config.indent(), "    ");
        assert_eq!(config.to_normalized_indent("\n\t  "), "      ");
        assert_eq!(config.indent_level_from("\n\t    "), 2);
        assert!(config.contains_unexpected_indent_char("  \t"));
    }

    #[test]
    fn test_tab_indent_drops_incomplete_tabs() {
        let config = IndentConfig::new(IndentStyle::Tab, 4);
        assert_eq!(config.indent(), "\t");
        assert_eq!(config.to_normalized_indent("      "), "\t");
        assert_eq!(config.to_normalized_indent("\t    "), "\t\t");
        assert!(!config.contains_unexpected_indent_char("\t\t"));
    }

    #[test]
    fn test_disabled() {
        let config = IndentConfig::new(IndentStyle::Space, 0);
        assert!(config.disabled());
        assert_eq!(config.indent(), "");
        assert_eq!(config.indent_level_from("    "), 0);
    }
}
