//! Lowering of parsed units into instruction streams.
//!
//! This module contains the driver that takes a translation unit from the
//! parser down to an emitted program. It handles:
//!
//! - Overload resolution, including the argument-conversion fallback
//! - Inline expansion of every call
//! - Lowering of statements and expressions into IR
//! - Loading the built-in library shared by all compilations

pub mod compiler;
pub mod expr;
pub mod functions;
pub mod stdlib;
pub mod stmt;
