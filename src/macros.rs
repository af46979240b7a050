//! Utility macros for the compiler.
//!
//! This module defines helper macros used throughout the compiler:
//!
//! - `MK_TOKEN!` - Creates a Token instance
//! - `MK_DEFAULT_HANDLER!` - Creates a default lexer handler for fixed-text tokens
//! - `MK_ARENA_ACCESSORS!` - Creates the shared/local lookup pair for a symbol arena
//!
//! These macros reduce boilerplate in the lexer and symbol table implementations.

/// Creates a Token instance.
///
/// # Arguments
///
/// * `$kind` - The TokenKind
/// * `$value` - The token's string value
/// * `$span` - The source span
///
/// # Example
///
/// ```ignore
/// let token = MK_TOKEN!(TokenKind::IntLiteral, "42".to_string(), span);
/// ```
#[macro_export]
macro_rules! MK_TOKEN {
    ($kind:expr, $value:expr, $span:expr) => {
        Token {
            kind: $kind,
            value: $value,
            span: $span,
        }
    };
}

/// Creates a default lexer handler for fixed-text tokens.
///
/// Generates a handler function that creates a token with the given kind
/// and advances the lexer position by the token's length.
///
/// # Arguments
///
/// * `$kind` - The TokenKind to create
/// * `$value` - The literal string value (used for length calculation)
///
/// # Example
///
/// ```ignore
/// RegexPattern {
///     regex: Regex::new("^\\+").unwrap(),
///     handler: MK_DEFAULT_HANDLER!(TokenKind::Plus, "+"),
/// }
/// ```
#[macro_export]
macro_rules! MK_DEFAULT_HANDLER {
    ($kind:expr, $value:literal) => {
        |lexer: &mut Lexer, _regex: &Regex| {
            let span = lexer.span_of($value.len());
            lexer.push(MK_TOKEN!($kind, String::from($value), span));
            lexer.advance_n($value.len());
        }
    };
}

/// Creates the accessor pair for one arena of the symbol tables.
///
/// Handles below the length of the shared built-in arena resolve there and
/// are read-only; everything above resolves into the unit's own arena.
///
/// # Arguments
///
/// * `$get` - Name of the shared accessor
/// * `$get_mut` - Name of the mutable accessor (local entries only)
/// * `$field` - The `SymbolArena` field holding the entries
/// * `$id` - The handle type
/// * `$ty` - The entry type
#[macro_export]
macro_rules! MK_ARENA_ACCESSORS {
    ($get:ident, $get_mut:ident, $field:ident, $id:ident, $ty:ty) => {
        pub fn $get(&self, id: $id) -> &$ty {
            let index = id.0 as usize;
            match &self.base {
                Some(base) if index < base.$field.len() => &base.$field[index],
                Some(base) => &self.local.$field[index - base.$field.len()],
                None => &self.local.$field[index],
            }
        }

        pub fn $get_mut(&mut self, id: $id) -> Option<&mut $ty> {
            let offset = self.base.as_ref().map_or(0, |base| base.$field.len());
            let index = id.0 as usize;
            if index < offset {
                None
            } else {
                self.local.$field.get_mut(index - offset)
            }
        }
    };
}
