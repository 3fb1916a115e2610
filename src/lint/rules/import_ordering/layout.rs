//! Imports layout as written in `ij_kotlin_imports_layout`
//!
//! Entries are comma separated:
//!
//! - `*` all other imports, `^` all other alias imports
//! - `|` a blank line between the neighbouring groups
//! - `java.*` imports from package `java`, `java.**` also from its
//!   subpackages, `^java.**` the alias imports among those

use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportsLayoutError {
    #[error("Import layout must contain at least one entry of a wildcard symbol (*)")]
    Empty,

    #[error("Blank lines are not supported in the beginning or end of import list")]
    BlankLineAtEdge,

    #[error("<all other imports> symbol (\"*\") must be present in the custom imports layout")]
    MissingWildcard,

    #[error("Unexpected imports layout entry: {0}")]
    InvalidEntry(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternEntry {
    BlankLine,
    AllOtherImports,
    AllOtherAliasImports,
    Package {
        name: String,
        with_subpackages: bool,
        has_alias: bool,
    },
}

impl PatternEntry {
    fn has_alias(&self) -> bool {
        match self {
            PatternEntry::AllOtherAliasImports => true,
            PatternEntry::Package { has_alias, .. } => *has_alias,
            _ => false,
        }
    }

    fn matches(&self, import: &ImportPath, as_alias: bool) -> bool {
        match self {
            PatternEntry::BlankLine => false,
            PatternEntry::AllOtherImports => !as_alias,
            PatternEntry::AllOtherAliasImports => as_alias,
            PatternEntry::Package {
                name,
                with_subpackages,
                has_alias,
            } => {
                if *has_alias != as_alias {
                    return false;
                }
                let package = import.package();
                match package.strip_prefix(name.as_str()) {
                    Some("") => true,
                    Some(rest) => *with_subpackages && rest.starts_with('.'),
                    None => false,
                }
            }
        }
    }

    /// Whether this entry is more specific for an import both match
    fn is_better_match_than(&self, other: &PatternEntry) -> bool {
        match (self, other) {
            (PatternEntry::Package { .. }, PatternEntry::AllOtherImports)
            | (PatternEntry::Package { .. }, PatternEntry::AllOtherAliasImports) => true,
            (
                PatternEntry::Package {
                    name,
                    with_subpackages,
                    ..
                },
                PatternEntry::Package {
                    name: other_name,
                    with_subpackages: other_with_subpackages,
                    ..
                },
            ) => {
                if with_subpackages != other_with_subpackages {
                    return !with_subpackages;
                }
                name.matches('.').count() > other_name.matches('.').count()
            }
            _ => false,
        }
    }
}

pub const IDEA_LAYOUT: &str = "*,java.**,javax.**,kotlin.**,^";
pub const ASCII_LAYOUT: &str = "*";

pub fn parse_imports_layout(value: &str) -> Result<Vec<PatternEntry>, ImportsLayoutError> {
    let value = match value.trim() {
        "" => return Err(ImportsLayoutError::Empty),
        "idea" => IDEA_LAYOUT,
        "ascii" => ASCII_LAYOUT,
        value => value,
    };
    let tokens: Vec<&str> = value.split(',').map(str::trim).collect();
    if tokens.first() == Some(&"|") || tokens.last() == Some(&"|") {
        return Err(ImportsLayoutError::BlankLineAtEdge);
    }
    if !tokens.contains(&"*") {
        return Err(ImportsLayoutError::MissingWildcard);
    }

    tokens
        .into_iter()
        .map(|token| match token {
            "|" => Ok(PatternEntry::BlankLine),
            "*" => Ok(PatternEntry::AllOtherImports),
            "^" => Ok(PatternEntry::AllOtherAliasImports),
            _ => {
                let (has_alias, path) = match token.strip_prefix('^') {
                    Some(path) => (true, path),
                    None => (false, token),
                };
                let (name, with_subpackages) = if let Some(name) = path.strip_suffix(".**") {
                    (name, true)
                } else if let Some(name) = path.strip_suffix(".*") {
                    (name, false)
                } else {
                    (path, true)
                };
                if name.is_empty() || name.contains('*') {
                    return Err(ImportsLayoutError::InvalidEntry(token.to_string()));
                }
                Ok(PatternEntry::Package {
                    name: name.to_string(),
                    with_subpackages,
                    has_alias,
                })
            }
        })
        .collect()
}

/// What the sorter needs to know about an import directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPath {
    /// Imported path, e.g. `java.util.List` or `java.util.*`
    pub path: String,
    pub alias: Option<String>,
}

impl ImportPath {
    pub fn new(path: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            path: path.into(),
            alias,
        }
    }

    fn package(&self) -> &str {
        match self.path.rfind('.') {
            Some(i) => &self.path[..i],
            None => "",
        }
    }

    fn sort_key(&self) -> String {
        self.path.replace('`', "")
    }
}

/// Orders imports by layout group, then lexicographically
#[derive(Debug, Clone)]
pub struct ImportSorter {
    pub patterns: Vec<PatternEntry>,
}

impl ImportSorter {
    pub fn new(patterns: Vec<PatternEntry>) -> Self {
        Self { patterns }
    }

    /// Index of the layout entry that best matches `import`
    pub fn find_import_index(&self, import: &ImportPath) -> usize {
        let has_alias = import.alias.is_some();
        self.best_match(import, has_alias)
            // Without alias entries, alias imports are sorted like the others
            .or_else(|| has_alias.then(|| self.best_match(import, false)).flatten())
            .unwrap_or(self.patterns.len())
    }

    fn best_match(&self, import: &ImportPath, as_alias: bool) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (index, entry) in self.patterns.iter().enumerate() {
            if entry.has_alias() != as_alias || !entry.matches(import, as_alias) {
                continue;
            }
            let better = match best {
                None => true,
                Some(best_index) => entry.is_better_match_than(&self.patterns[best_index]),
            };
            if better {
                best = Some(index);
            }
        }
        best
    }

    pub fn compare(&self, a: &ImportPath, b: &ImportPath) -> Ordering {
        self.find_import_index(a)
            .cmp(&self.find_import_index(b))
            .then_with(|| a.sort_key().cmp(&b.sort_key()))
            .then_with(|| a.alias.cmp(&b.alias))
    }

    /// Whether the layout asks for a blank line between two imports in the
    /// given groups
    pub fn has_blank_line_between(&self, previous_index: usize, index: usize) -> bool {
        (previous_index + 1..index)
            .any(|i| self.patterns.get(i) == Some(&PatternEntry::BlankLine))
    }
}
