//! Error types and error handling for the compiler.
//!
//! This module defines the error types used throughout the compilation
//! process. It includes:
//!
//! - Error structures with optional source position information
//! - Specific error variants for each failure class (lookup, type,
//!   resource, control) plus front-end and internal consistency errors
//! - The per-compilation info log that keeps the first error
//! - Helpful error messages and suggestions

pub mod errors;

#[cfg(test)]
mod tests;
