//! Parser module for building operation trees and symbol tables.
//!
//! This module contains the parser that transforms a stream of tokens
//! into a translation unit. It uses a Pratt parser for expressions
//! with proper operator precedence and handles:
//!
//! - Statement parsing (declarations, control flow, `__asm`)
//! - Function definitions, including `__operator` and `__constructor`
//! - Expression parsing (binary ops, calls, swizzles, subscripts)
//! - Type parsing for built-in, struct and array types
//!
//! The parser uses NUD (null denotation) and LED (left denotation) functions
//! for expression parsing with binding power for precedence handling.

pub mod expr;
pub mod lookups;
pub mod parser;
pub mod stmt;
pub mod types;

#[cfg(test)]
mod tests;
