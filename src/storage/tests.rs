use crate::{errors::errors::ErrorImpl, type_checker::swizzle::Swizzle};

use super::{
    alloc::VarTable,
    storage::{RegisterFile, Storage},
};

#[test]
fn test_scalars_pack_into_components() {
    let mut table = VarTable::new(4);
    let a = table.alloc_var(1).unwrap();
    let b = table.alloc_var(1).unwrap();
    assert_eq!(a.index, 0);
    assert_eq!(b.index, 0);
    assert_eq!(a.swizzle, Swizzle::replicate(0));
    assert_eq!(b.swizzle, Swizzle::replicate(1));
}

#[test]
fn test_vectors_are_register_aligned() {
    let mut table = VarTable::new(4);
    table.alloc_var(1).unwrap();
    let v = table.alloc_var(3).unwrap();
    assert_eq!(v.index, 1);
    assert_eq!(v.swizzle, Swizzle::identity(3));

    // The scalar hole left in register 0 is still usable.
    let s = table.alloc_var(1).unwrap();
    assert_eq!(s.index, 0);
    assert_eq!(s.swizzle, Swizzle::replicate(1));
}

#[test]
fn test_large_values_span_registers() {
    let mut table = VarTable::new(4);
    let m = table.alloc_var(16).unwrap();
    assert_eq!(m.index, 0);
    assert_eq!(m.register_count(), 4);
    assert!(table.alloc_var(1).is_err());
}

#[test]
fn test_exhaustion() {
    let mut table = VarTable::new(1);
    table.alloc_var(4).unwrap();
    let error = table.alloc_temp(1).unwrap_err();
    assert_eq!(error.get_error_name(), "RegisterFileExhausted");
}

#[test]
fn test_pop_releases_scope_variables() {
    let mut table = VarTable::new(2);
    table.alloc_var(4).unwrap();
    let used = table.used();

    table.push();
    table.alloc_var(4).unwrap();
    assert!(table.alloc_var(1).is_err());
    table.pop().unwrap();

    assert_eq!(table.used(), used);
    let again = table.alloc_var(4).unwrap();
    assert_eq!(again.index, 1);
}

#[test]
fn test_pop_reports_temporary_held_across_scope() {
    let mut table = VarTable::new(2);
    table.alloc_var(1).unwrap();
    table.push();
    table.alloc_var(1).unwrap();
    let (position, _) = table.alloc_temp(2).unwrap();

    let error = table.pop().unwrap_err();
    assert_eq!(error.get_error_name(), "AllocationLeak");
    match error.get_internal_error() {
        ErrorImpl::AllocationLeak { component } => assert_eq!(*component, position),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_pop_accepts_temporaries_released_in_scope() {
    let mut table = VarTable::new(2);
    table.push();
    table.alloc_var(1).unwrap();
    let (position, _) = table.alloc_temp(2).unwrap();
    table.free_temp(position, 2);
    table.pop().unwrap();
    assert_eq!(table.used(), 0);
}

#[test]
fn test_pop_keeps_parent_temporaries() {
    let mut table = VarTable::new(2);
    let (position, _) = table.alloc_temp(1).unwrap();
    table.push();
    table.alloc_var(2).unwrap();
    table.pop().unwrap();
    assert!(!table.is_free(position));
    assert_eq!(table.used(), 1);
}

#[test]
fn test_temp_freed_in_child_is_free_in_parent() {
    let mut table = VarTable::new(1);
    let (position, _) = table.alloc_temp(1).unwrap();
    table.push();
    table.free_temp(position, 1);
    table.pop().unwrap();
    assert!(table.is_free(position));
}

#[test]
fn test_free_temp_leaves_variables() {
    let mut table = VarTable::new(1);
    let (position, _) = table.alloc_temp(1).unwrap();
    table.alloc_var(1).unwrap();
    table.free_temp(position, 2);
    assert!(table.is_free(position));
    assert!(!table.is_free(position + 1));
}

#[test]
fn test_registers_used() {
    let mut table = VarTable::new(8);
    table.alloc_var(4).unwrap();
    table.alloc_var(2).unwrap();
    assert_eq!(table.registers_used(), 2);
}

#[test]
fn test_field_storage() {
    let base = Storage::registers(RegisterFile::Temporary, 2, 8);
    let second_column = base.field(4, 4);
    assert_eq!(second_column.index, 3);
    assert_eq!(second_column.swizzle, Swizzle::identity(4));

    let scalar = base.field(7, 1);
    assert_eq!(scalar.index, 3);
    assert_eq!(scalar.swizzle, Swizzle::replicate(3));
}

#[test]
fn test_swizzled_storage_composes() {
    let base = Storage::at_component(RegisterFile::Temporary, 4, 4);
    let view = base.swizzled(&Swizzle::parse("wy", 4, "vec4").unwrap());
    assert_eq!(view.size, 2);
    assert_eq!(view.swizzle.selected(), &[3, 1]);
    assert_eq!(view.swizzle.writemask().to_string(), "yw");
    assert_eq!(view.to_string(), "TEMP[1].wyyy");
}
