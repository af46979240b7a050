//! Intermediate representation between the AST and the instruction stream.
//!
//! Lowering turns every function body into a tree of [`ir::IrNode`]s:
//!
//! - value nodes (`Var`, `Float`, `Swizzle`, `Field`, `Prim`) that the
//!   emitter evaluates into storage locations
//! - statement nodes (`Move`, `VarDecl`, `Kill`) with side effects only
//! - control flow, either as labels and jumps or as structured
//!   `If`/`Loop`/`Break`/`Cont` nodes
//!
//! Which control-flow shape is produced is decided by the
//! [`backend::Backend`] chosen for the compilation. Primitive instructions
//! named by `__asm` statements are looked up in [`ir::ASM_LOOKUP`].

pub mod backend;
pub mod ir;
