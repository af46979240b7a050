//! Abstract Syntax Tree definitions.
//!
//! The tree handed to the back half of the compiler is made of uniform
//! [`ast::Operation`] nodes. Each node carries:
//!
//! - an [`ast::OperKind`] with the kind-specific payload (literal value,
//!   name atom, label or variable handle)
//! - an ordered, owned list of children
//! - a handle to the variable scope names inside it resolve against
//!
//! Types are described by [`types::TypeSpecifier`] and
//! [`types::TypeQualifier`], combined into a
//! [`types::FullySpecifiedType`].

pub mod ast;
pub mod types;
