//! Storage descriptors and temporary-register allocation.
//!
//! A [`storage::Storage`] names where a value lives in the target machine:
//! register file, register index, component count and the component
//! selection within the first register.
//!
//! Temporaries are managed by [`alloc::VarTable`], a stack of per-scope
//! tables tracking every component of the temporary file as free, held by a
//! variable, or held by an anonymous temporary. Scalars pack into any free
//! component; larger values start on a register boundary.

pub mod alloc;
pub mod storage;

#[cfg(test)]
mod tests;
