//! Lexical analysis module for the shading language front-end.
//!
//! This module contains the lexer (tokenizer) that converts shader source
//! into a stream of tokens for parsing. It handles:
//!
//! - Tokenization of source code using anchored regex patterns
//! - Recognition of keywords, built-in type names, identifiers and literals
//! - Token position tracking for error reporting
//! - Comments, preprocessor lines and whitespace skipping

pub mod lexer;
pub mod tokens;

#[cfg(test)]
mod tests;
