//! Type and swizzle resolution.
//!
//! Answers "what is the type of this expression node" for the lowering
//! passes. For every node it reports:
//!
//! - the resolved [`TypeSpecifier`](crate::ast::types::TypeSpecifier)
//! - whether the node denotes a writable storage location
//! - the component selection accumulated over chained swizzles, where a
//!   later swizzle selects from the result of an earlier one
//!
//! It also owns the storage layout rules (component sizes, struct field
//! offsets, array strides) and constant folding of index and condition
//! expressions. Resolution of calls and operators is delegated to
//! [`crate::compiler::functions`], so a node has the type of the overload
//! the lowering pass would actually pick.

pub mod constant;
pub mod swizzle;
pub mod type_checker;

#[cfg(test)]
mod tests;
