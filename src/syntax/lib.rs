//! Lossless syntax trees for Kotlin sources
//!
//! # Architecture
//!
//! - [`lexer`] splits source text into tokens, keeping whitespace and comments
//! - [`parser`] builds a [`SyntaxTree`] whose leaves reproduce the input exactly
//! - [`tree`] owns the nodes in an arena and provides navigation and mutation
//! - [`ast`] offers typed views for the constructs rules care about

pub mod ast;
pub mod element_type;
pub mod lexer;
pub mod parser;
pub mod tree;

pub use element_type::ElementType;
pub use parser::{Parse, ParseError, parse};
pub use tree::{LineIndex, NodeId, SyntaxTree, TreeError};
