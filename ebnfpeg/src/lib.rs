//! Compile EBNF-style grammar text into a parser at runtime.
//!
//! Grammar source is a list of `@name = value` directives and
//! `name = expression` rules:
//!
//! ```text
//! @whitespace = vertical
//! @literalws  = right
//! @drop       = whitespace, strings
//!
//! sum    = NUMBER { "+" NUMBER }
//! NUMBER = /\d+/~
//! ```
//!
//! [`compile`] turns such text into a [`CompiledGrammar`], which parses any
//! number of inputs into [`ParseNode`] trees. Matching follows PEG rules:
//! choices are ordered and the first alternative that matches wins.

pub mod ast;
mod check;
pub mod compiler;
pub mod config;
pub mod directives;
pub mod engine;
pub mod error;
pub mod parser;
pub mod tree;
pub mod utils;

pub use compiler::CompiledGrammar;
pub use config::ParserConfig;
pub use directives::LexicalPolicy;
pub use error::{CompileError, ParseError, RunError};
pub use tree::{ParseNode, Tag};

/// Compile grammar source text with the default [`ParserConfig`].
pub fn compile(source: &str) -> Result<CompiledGrammar, CompileError> {
    compile_with_config(source, ParserConfig::default())
}

pub fn compile_with_config(
    source: &str,
    config: ParserConfig,
) -> Result<CompiledGrammar, CompileError> {
    let grammar = parser::parse_grammar(source)?;
    let policy = directives::resolve(&grammar.directives)?;

    compiler::compile_with_config(&grammar, &policy, config)
}
