use crate::{
    ast::{
        ast::{OperKind, Operation},
        types::{FullySpecifiedType, TypeSpecifier},
    },
    errors::errors::ErrorImpl,
    symbols::symbols::{Atom, ScopeId, StructDef, StructField, Symbols, Variable},
};

use super::{
    constant::{evaluate_bool, evaluate_int, literal_value},
    swizzle::{Swizzle, WriteMask},
    type_checker::TypeChecker,
};

fn int(value: i32, scope: ScopeId) -> Operation {
    Operation::leaf(OperKind::LiteralInt(value), scope)
}

fn ident(name: &str, scope: ScopeId) -> Operation {
    Operation::leaf(OperKind::Identifier(Atom::from(name)), scope)
}

fn field(base: Operation, name: &str) -> Operation {
    let scope = base.locals;
    Operation::new(OperKind::Field(Atom::from(name)), vec![base], scope)
}

#[test]
fn test_parse_swizzle_groups() {
    let swizzle = Swizzle::parse("bgr", 4, "vec4").unwrap();
    assert_eq!(swizzle.selected(), &[2, 1, 0]);
    assert_eq!(swizzle.size(), 3);
    assert_eq!(Swizzle::parse("stq", 4, "vec4").unwrap().selected(), &[0, 1, 3]);
}

#[test]
fn test_parse_swizzle_mixed_groups() {
    let error = Swizzle::parse("xg", 4, "vec4").unwrap_err();
    assert_eq!(error.get_error_name(), "InvalidSwizzle");

    let error = Swizzle::parse("xyzwx", 4, "vec4").unwrap_err();
    assert_eq!(error.get_error_name(), "InvalidSwizzle");
}

#[test]
fn test_parse_swizzle_out_of_range() {
    let error = Swizzle::parse("z", 2, "vec2").unwrap_err();
    match error.get_internal_error() {
        ErrorImpl::SwizzleOutOfRange { swizzle, size } => {
            assert_eq!(swizzle, "z");
            assert_eq!(*size, 2);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_padding_replicates_last_component() {
    assert_eq!(Swizzle::parse("yz", 4, "vec4").unwrap().padded(), [1, 2, 2, 2]);
    assert_eq!(Swizzle::replicate(3).padded(), [3, 3, 3, 3]);
    assert_eq!(Swizzle::identity(2), Swizzle::new(&[0, 1]));
}

#[test]
fn test_compose_applies_later_swizzle_to_earlier_result() {
    // v.wzyx.yx reads v.z then v.w.
    let first = Swizzle::parse("wzyx", 4, "vec4").unwrap();
    let second = Swizzle::parse("yx", 4, "vec4").unwrap();
    assert_eq!(first.compose(&second).selected(), &[2, 3]);
}

#[test]
fn test_compose_over_short_swizzle_uses_padding() {
    // v.y.xx reads v.y twice.
    let first = Swizzle::parse("y", 4, "vec4").unwrap();
    let second = Swizzle::parse("xx", 1, "float").unwrap();
    assert_eq!(first.compose(&second).selected(), &[1, 1]);
}

#[test]
fn test_mask_and_simple() {
    assert!(Swizzle::parse("yx", 4, "vec4").unwrap().is_mask());
    assert!(!Swizzle::parse("xx", 4, "vec4").unwrap().is_mask());
    assert!(Swizzle::parse("xyz", 4, "vec4").unwrap().is_simple());
    assert!(!Swizzle::parse("yz", 4, "vec4").unwrap().is_simple());
}

#[test]
fn test_writemask_is_component_set() {
    assert_eq!(Swizzle::parse("yx", 4, "vec4").unwrap().writemask(), WriteMask(0b11));
    assert_eq!(Swizzle::parse("wy", 4, "vec4").unwrap().writemask(), WriteMask(0b1010));
    assert_eq!(WriteMask::first(3), WriteMask(0b111));
    assert_eq!(WriteMask(0b1010).to_string(), "yw");
}

#[test]
fn test_inverse_moves_values_into_masked_slots() {
    // v.yx = r must write r.y into x and r.x into y.
    let inverse = Swizzle::parse("yx", 4, "vec4").unwrap().inverse();
    assert_eq!(inverse.selected(), &[1, 0, 2, 3]);

    // v.wy = r must write r.x into w and r.y into y.
    let inverse = Swizzle::parse("wy", 4, "vec4").unwrap().inverse();
    assert_eq!(inverse.component(3), 0);
    assert_eq!(inverse.component(1), 1);
}

#[test]
fn test_swizzle_display() {
    assert_eq!(Swizzle::parse("yx", 4, "vec4").unwrap().to_string(), "yxxx");
    assert_eq!(Swizzle::identity(4).to_string(), "xyzw");
}

#[test]
fn test_evaluate_constants() {
    let scope = ScopeId(0);
    let expr = Operation::new(
        OperKind::Multiply,
        vec![
            int(3, scope),
            Operation::new(OperKind::Minus, vec![int(2, scope)], scope),
        ],
        scope,
    );
    assert_eq!(evaluate_int(&expr), Some(-6));
    assert_eq!(evaluate_int(&ident("i", scope)), None);

    let condition = Operation::new(
        OperKind::Not,
        vec![Operation::leaf(OperKind::LiteralBool(false), scope)],
        scope,
    );
    assert_eq!(evaluate_bool(&condition), Some(true));
    assert_eq!(literal_value(&Operation::leaf(OperKind::LiteralBool(true), scope)), Some(1.0));
}

#[test]
fn test_struct_layout_aligns_vectors() {
    let mut symbols = Symbols::new();
    let structs = symbols.new_struct_scope(None);
    let functions = symbols.new_function_scope(None);
    let id = symbols
        .declare_struct(
            structs,
            StructDef {
                name: Atom::from("Light"),
                fields: vec![
                    StructField { name: Atom::from("on"), specifier: TypeSpecifier::Float },
                    StructField { name: Atom::from("color"), specifier: TypeSpecifier::Vec3 },
                    StructField { name: Atom::from("power"), specifier: TypeSpecifier::Float },
                ],
            },
        )
        .unwrap();

    let checker = TypeChecker::new(&symbols, functions, structs);
    let layout = checker.struct_layout(id);
    assert_eq!(layout.offsets, vec![0, 4, 7]);
    assert_eq!(layout.size, 8);
    assert_eq!(checker.field_offset(id, "power"), Some((7, TypeSpecifier::Float)));
    assert_eq!(checker.field_offset(id, "missing"), None);
}

#[test]
fn test_sizes() {
    let mut symbols = Symbols::new();
    let structs = symbols.new_struct_scope(None);
    let functions = symbols.new_function_scope(None);
    let single = symbols
        .declare_struct(
            structs,
            StructDef {
                name: Atom::from("One"),
                fields: vec![StructField { name: Atom::from("f"), specifier: TypeSpecifier::Float }],
            },
        )
        .unwrap();
    let checker = TypeChecker::new(&symbols, functions, structs);

    assert_eq!(checker.sizeof_type(&TypeSpecifier::Struct(single)), 2);
    assert_eq!(checker.sizeof_type(&TypeSpecifier::Vec3), 3);
    assert_eq!(checker.sizeof_type(&TypeSpecifier::Mat3), 12);
    assert_eq!(
        checker.sizeof_type(&TypeSpecifier::Array(Box::new(TypeSpecifier::Vec3), Some(3))),
        12
    );
    assert_eq!(
        checker.sizeof_type(&TypeSpecifier::Array(Box::new(TypeSpecifier::Float), Some(1))),
        1
    );
}

#[test]
fn test_type_of_swizzle_chain() {
    let mut symbols = Symbols::new();
    let structs = symbols.new_struct_scope(None);
    let functions = symbols.new_function_scope(None);
    let scope = symbols.new_scope(None);
    symbols
        .declare_variable(
            scope,
            Variable::new(Atom::from("v"), FullySpecifiedType::unqualified(TypeSpecifier::Vec4)),
        )
        .unwrap();
    let checker = TypeChecker::new(&symbols, functions, structs);

    let chained = field(field(ident("v", scope), "wzyx"), "yx");
    let info = checker.type_of(&chained).unwrap();
    assert_eq!(info.specifier, TypeSpecifier::Vec2);
    assert!(info.can_be_referenced);
    assert!(info.is_swizzled);
    assert_eq!(info.swizzle.selected(), &[2, 3]);

    let scalar = checker.type_of(&field(ident("v", scope), "x")).unwrap();
    assert_eq!(scalar.specifier, TypeSpecifier::Float);
}

#[test]
fn test_type_of_vector_subscript_is_swizzle() {
    let mut symbols = Symbols::new();
    let structs = symbols.new_struct_scope(None);
    let functions = symbols.new_function_scope(None);
    let scope = symbols.new_scope(None);
    symbols
        .declare_variable(
            scope,
            Variable::new(Atom::from("v"), FullySpecifiedType::unqualified(TypeSpecifier::Vec3)),
        )
        .unwrap();
    let checker = TypeChecker::new(&symbols, functions, structs);

    let element = Operation::new(OperKind::Subscript, vec![ident("v", scope), int(2, scope)], scope);
    let info = checker.type_of(&element).unwrap();
    assert_eq!(info.specifier, TypeSpecifier::Float);
    assert_eq!(info.swizzle.selected(), &[2]);

    let outside = Operation::new(OperKind::Subscript, vec![ident("v", scope), int(3, scope)], scope);
    let error = checker.type_of(&outside).unwrap_err();
    assert_eq!(error.get_error_name(), "ArrayIndexOutOfBounds");
}

#[test]
fn test_type_of_undeclared_and_literals() {
    let mut symbols = Symbols::new();
    let structs = symbols.new_struct_scope(None);
    let functions = symbols.new_function_scope(None);
    let scope = symbols.new_scope(None);
    let checker = TypeChecker::new(&symbols, functions, structs);

    let error = checker.type_of(&ident("nothing", scope)).unwrap_err();
    assert_eq!(error.get_error_name(), "VariableNotDeclared");

    let literal = checker.type_of(&int(1, scope)).unwrap();
    assert_eq!(literal.specifier, TypeSpecifier::Int);
    assert!(!literal.can_be_referenced);

    let error = checker.type_of(&field(int(1, scope), "xx")).unwrap_err();
    assert_eq!(error.get_error_name(), "InvalidSwizzle");
}

#[test]
fn test_type_of_scalar_swizzle_is_rejected() {
    let mut symbols = Symbols::new();
    let structs = symbols.new_struct_scope(None);
    let functions = symbols.new_function_scope(None);
    let scope = symbols.new_scope(None);
    symbols
        .declare_variable(
            scope,
            Variable::new(Atom::from("f"), FullySpecifiedType::unqualified(TypeSpecifier::Float)),
        )
        .unwrap();
    let checker = TypeChecker::new(&symbols, functions, structs);

    for name in ["xx", "x"] {
        let error = checker.type_of(&field(ident("f", scope), name)).unwrap_err();
        match error.get_internal_error() {
            ErrorImpl::InvalidSwizzle { swizzle, type_ } => {
                assert_eq!(swizzle, name);
                assert_eq!(type_, "float");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
