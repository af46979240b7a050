//! Built-in library loading.
//!
//! The library is written in the shading language itself and parsed once.
//! Its symbol tables are frozen into a shared arena that every compiled
//! unit uses as the base of its own tables.

use std::rc::Rc;

use crate::{
    errors::errors::Error,
    lexer::lexer::tokenize,
    parser::parser::parse,
    symbols::symbols::{FunScopeId, ScopeId, StructScopeId, SymbolArena, Symbols},
};

/// Source of the built-in library.
pub const BUILTIN_SOURCE: &str = include_str!("../../std/builtins.glsl");

const BUILTIN_FILE: &str = "<builtins>";

/// The parsed built-in library.
pub struct Builtins {
    pub arena: Rc<SymbolArena>,
    pub globals: ScopeId,
    pub functions: FunScopeId,
    pub structs: StructScopeId,
}

impl Builtins {
    pub fn load() -> Result<Self, Error> {
        Builtins::from_source(BUILTIN_SOURCE)
    }

    /// Parses a library from source.
    ///
    /// # Arguments
    ///
    /// * `source` - Library source: declarations and function definitions
    ///
    /// # Returns
    ///
    /// The library with its tables frozen for sharing, or the first lexing
    /// or parsing error.
    pub fn from_source(source: &str) -> Result<Self, Error> {
        let file = Some(String::from(BUILTIN_FILE));
        let tokens = tokenize(source, file.clone())?;
        let unit = parse(tokens, file, None)?;
        log::debug!("built-in library parsed");

        Ok(Builtins {
            arena: unit.symbols.into_shared(),
            globals: unit.globals,
            functions: unit.functions,
            structs: unit.structs,
        })
    }

    /// Fresh symbol tables for a unit compiled against the library.
    pub fn symbols(&self) -> Symbols {
        Symbols::with_base(self.arena.clone())
    }
}
