//! Instruction emission.
//!
//! Turns a lowered IR tree into a [`instruction::Program`] for a
//! four-component register machine:
//!
//! - variables are placed as their declarations are reached, inside the
//!   allocation scope of the enclosing `Scope` node
//! - globals outside the temporary file (uniforms, inputs, outputs,
//!   samplers, literal constants) are placed on first use
//! - every operation result lands in an anonymous temporary released by
//!   its consumer
//! - literals are pooled in the constant file
//! - branch targets are resolved once the whole stream is known
//!
//! Assignment becomes a `MOV` whose write mask is the destination's
//! component set; values wider than a register are copied register by
//! register.

pub mod emitter;
pub mod instruction;

#[cfg(test)]
mod tests;
