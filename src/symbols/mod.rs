//! Symbol tables for variables, functions and structs.
//!
//! Symbols live in flat arenas addressed by small copyable handles
//! ([`symbols::VarId`], [`symbols::FunId`], [`symbols::StructId`]). Scopes
//! are arena entries too: each holds the handles declared in it and the
//! handle of its enclosing scope, so lookups walk outward without any
//! owning back-pointers.
//!
//! - Variable names are unique within one scope
//! - Functions are identified by name plus parameter passing modes and types;
//!   a later definition completes an earlier prototype
//! - The built-in library's arena is shared read-only between compilations

pub mod symbols;
