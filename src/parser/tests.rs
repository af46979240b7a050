//! Unit tests for the parser module.
//!
//! This module contains tests for parsing various language constructs including:
//! - Global and local declarations
//! - Function definitions, operators and constructors
//! - Expressions and precedence
//! - Control flow statements
//! - Struct definitions

use crate::{
    ast::{
        ast::{OperKind, Operation, TranslationUnit},
        types::{TypeQualifier, TypeSpecifier},
    },
    errors::errors::Error,
    lexer::lexer::tokenize,
    symbols::symbols::FunctionKind,
};

use super::parser::parse;

fn parse_source(source: &str) -> Result<TranslationUnit, Error> {
    let tokens = tokenize(source, Some("test.glsl".to_string()))?;
    parse(tokens, Some("test.glsl".to_string()), None)
}

fn body(unit: &TranslationUnit, name: &str) -> Operation {
    let fun = unit.symbols.functions_named(unit.functions, name)[0];
    unit.symbols.function(fun).body.clone().unwrap()
}

/// Expression of the `index`th statement of `name`'s body.
fn expression(unit: &TranslationUnit, name: &str, index: usize) -> Operation {
    let statement = body(unit, name).children[index].clone();
    assert_eq!(statement.kind, OperKind::Expression);
    statement.children[0].clone()
}

#[test]
fn test_parse_empty_program() {
    let unit = parse_source("").unwrap();
    assert!(unit.symbols.functions_named(unit.functions, "main").is_empty());
}

#[test]
fn test_parse_global_declarations() {
    let unit = parse_source("uniform vec4 color; varying vec2 uv, st; const float scale = 2.0;").unwrap();

    let color = unit.symbols.lookup_variable(unit.globals, "color").unwrap();
    let color = unit.symbols.variable(color);
    assert_eq!(color.type_.qualifier, TypeQualifier::Uniform);
    assert_eq!(color.type_.specifier, TypeSpecifier::Vec4);
    assert!(color.is_global);

    assert!(unit.symbols.lookup_variable(unit.globals, "st").is_some());
    let scale = unit.symbols.lookup_variable(unit.globals, "scale").unwrap();
    assert_eq!(
        unit.symbols.variable(scale).initializer.as_ref().unwrap().kind,
        OperKind::LiteralFloat(2.0)
    );
}

#[test]
fn test_parse_function_declaration() {
    let unit = parse_source("float twice(const float x) { return x * 2.0; }").unwrap();
    let fun = unit.symbols.functions_named(unit.functions, "twice")[0];
    let function = unit.symbols.function(fun);

    assert_eq!(function.kind, FunctionKind::Ordinary);
    assert_eq!(function.param_count, 1);
    assert_eq!(function.return_type.specifier, TypeSpecifier::Float);

    let slot = unit.symbols.return_slot(fun).unwrap();
    assert_eq!(&*unit.symbols.variable(slot).name, "__retVal");

    let statement = &function.body.as_ref().unwrap().children[0];
    assert_eq!(statement.kind, OperKind::Return);
    assert_eq!(statement.children[0].kind, OperKind::Multiply);
}

#[test]
fn test_parse_prototype_then_definition() {
    let unit = parse_source("void f(float a); void f(float a) { }").unwrap();
    let overloads = unit.symbols.functions_named(unit.functions, "f");
    assert_eq!(overloads.len(), 1);
    assert!(unit.symbols.function(overloads[0]).body.is_some());
}

#[test]
fn test_parse_redefinition_fails() {
    let error = parse_source("void f() { } void f() { }").unwrap_err();
    assert_eq!(error.get_error_name(), "FunctionAlreadyDeclared");
}

#[test]
fn test_parse_overloads_by_passing() {
    let unit = parse_source("void f(float a) { } void f(out float a) { }").unwrap();
    assert_eq!(unit.symbols.functions_named(unit.functions, "f").len(), 2);
}

#[test]
fn test_parse_operator_and_constructor() {
    let source = "vec2 __operator + (const vec2 a, const vec2 b) { __asm vec4_add __retVal, a, b; }
                  vec2 __constructor (const float x) { __retVal.x = x; __retVal.y = x; }";
    let unit = parse_source(source).unwrap();

    let add = unit.symbols.functions_named(unit.functions, "+")[0];
    assert_eq!(unit.symbols.function(add).kind, FunctionKind::Operator);
    let asm = &unit.symbols.function(add).body.as_ref().unwrap().children[0];
    assert_eq!(asm.kind, OperKind::Asm("vec4_add".into()));
    assert_eq!(asm.children.len(), 3);

    let constructor = unit.symbols.functions_named(unit.functions, "vec2")[0];
    assert_eq!(unit.symbols.function(constructor).kind, FunctionKind::Constructor);
}

#[test]
fn test_parse_void_parameter_list() {
    let unit = parse_source("void main(void) { }").unwrap();
    let fun = unit.symbols.functions_named(unit.functions, "main")[0];
    assert_eq!(unit.symbols.function(fun).param_count, 0);
    assert!(unit.symbols.return_slot(fun).is_none());
}

#[test]
fn test_parse_precedence() {
    let unit = parse_source("void main() { float a, b, c; a = b + c * 2.0; }").unwrap();
    let assign = expression(&unit, "main", 1);
    assert_eq!(assign.kind, OperKind::Assign);

    let sum = &assign.children[1];
    assert_eq!(sum.kind, OperKind::Add);
    assert_eq!(sum.children[1].kind, OperKind::Multiply);
}

#[test]
fn test_parse_assignment_groups_right() {
    let unit = parse_source("void main() { float a, b; a = b = 1.0; }").unwrap();
    let assign = expression(&unit, "main", 1);
    let a = unit.symbols.find_variable_in(body(&unit, "main").locals, "a").unwrap();
    assert_eq!(assign.children[0].kind, OperKind::VariableRef(a));
    assert_eq!(assign.children[1].kind, OperKind::Assign);
}

#[test]
fn test_parse_ternary_and_logical() {
    let unit = parse_source("void main() { bool p, q; float x; x = p && q || p ? 1.0 : 2.0; }").unwrap();
    let assign = expression(&unit, "main", 2);
    let select = &assign.children[1];
    assert_eq!(select.kind, OperKind::Select);
    assert_eq!(select.children[0].kind, OperKind::LogicalOr);
    assert_eq!(select.children[0].children[0].kind, OperKind::LogicalAnd);
}

#[test]
fn test_parse_postfix_chain() {
    let unit = parse_source("void main() { vec4 v[2]; float x; x = v[1].y; v[0]++; }").unwrap();
    let assign = expression(&unit, "main", 2);
    let field = &assign.children[1];
    assert_eq!(field.kind, OperKind::Field("y".into()));
    assert_eq!(field.children[0].kind, OperKind::Subscript);

    let increment = expression(&unit, "main", 3);
    assert_eq!(increment.kind, OperKind::PostIncrement);
}

#[test]
fn test_parse_negative_literal_folds() {
    let unit = parse_source("void main() { float x; int i; x = -1.5; i = -3; x = -x; }").unwrap();
    assert_eq!(expression(&unit, "main", 2).children[1].kind, OperKind::LiteralFloat(-1.5));
    assert_eq!(expression(&unit, "main", 3).children[1].kind, OperKind::LiteralInt(-3));
    assert_eq!(expression(&unit, "main", 4).children[1].kind, OperKind::Minus);
}

#[test]
fn test_parse_hex_literal() {
    let unit = parse_source("void main() { int i; i = 0x1F; }").unwrap();
    assert_eq!(expression(&unit, "main", 1).children[1].kind, OperKind::LiteralInt(31));
}

#[test]
fn test_parse_constructor_call_statement() {
    let unit = parse_source("void main() { vec4(1.0); }").unwrap();
    let call = expression(&unit, "main", 0);
    assert_eq!(call.kind, OperKind::Call("vec4".into()));
    assert_eq!(call.children.len(), 1);
}

#[test]
fn test_parse_inner_scope_shadows() {
    let source = "float a; void main() { float b; b = a; { float a; b = a; } }";
    let unit = parse_source(source).unwrap();
    let main = body(&unit, "main");

    let outer_ref = main.children[1].children[0].children[1].kind.clone();
    let inner_block = &main.children[2];
    assert_eq!(inner_block.kind, OperKind::Block { new_scope: true });
    let inner_ref = inner_block.children[1].children[0].children[1].kind.clone();

    let global = unit.symbols.lookup_variable(unit.globals, "a").unwrap();
    assert_eq!(outer_ref, OperKind::VariableRef(global));
    assert_ne!(inner_ref, OperKind::VariableRef(global));
}

#[test]
fn test_parse_initializer_sees_outer_name() {
    let source = "void main() { float a = 1.0; { float a = a; } }";
    let unit = parse_source(source).unwrap();
    let main = body(&unit, "main");

    let OperKind::VariableDecl(outer) = main.children[0].kind else {
        panic!("expected a declaration");
    };
    let OperKind::VariableDecl(inner) = main.children[1].children[0].kind else {
        panic!("expected a declaration");
    };
    let initializer = unit.symbols.variable(inner).initializer.clone().unwrap();
    assert_eq!(initializer.kind, OperKind::VariableRef(outer));
}

#[test]
fn test_parse_undeclared_variable() {
    let error = parse_source("void main() { x = 1.0; }").unwrap_err();
    assert_eq!(error.get_error_name(), "VariableNotDeclared");
}

#[test]
fn test_parse_duplicate_local() {
    let error = parse_source("void main() { float x; int x; }").unwrap_err();
    assert_eq!(error.get_error_name(), "VariableAlreadyDeclared");
}

#[test]
fn test_parse_struct_definition() {
    let unit = parse_source("struct Light { vec3 position; float a, b; }; Light sun;").unwrap();
    let id = unit.symbols.lookup_struct(unit.structs, "Light").unwrap();
    let def = unit.symbols.struct_def(id);
    assert_eq!(def.fields.len(), 3);
    assert_eq!(&*def.fields[2].name, "b");

    let sun = unit.symbols.lookup_variable(unit.globals, "sun").unwrap();
    assert_eq!(unit.symbols.variable(sun).type_.specifier, TypeSpecifier::Struct(id));
}

#[test]
fn test_parse_local_struct_variable() {
    let unit = parse_source("struct S { float f; }; void main() { S s; s.f = 1.0; }").unwrap();
    let main = body(&unit, "main");
    assert!(matches!(main.children[0].kind, OperKind::VariableDecl(_)));
    assert_eq!(main.children[1].kind, OperKind::Expression);
}

#[test]
fn test_parse_array_sizes() {
    let unit = parse_source("uniform float weights[2 * 3];").unwrap();
    let weights = unit.symbols.lookup_variable(unit.globals, "weights").unwrap();
    assert_eq!(
        unit.symbols.variable(weights).type_.specifier,
        TypeSpecifier::Array(Box::new(TypeSpecifier::Float), Some(6))
    );

    let error = parse_source("uniform float n; uniform float weights[n];").unwrap_err();
    assert_eq!(error.get_error_name(), "NonConstantIndex");
}

#[test]
fn test_parse_for_loop() {
    let unit = parse_source("void main() { for (int i = 0; ; i++) { break; } }").unwrap();
    let wrapper = body(&unit, "main").children[0].clone();
    assert_eq!(wrapper.kind, OperKind::Block { new_scope: true });

    let for_loop = &wrapper.children[0];
    assert_eq!(for_loop.kind, OperKind::For);
    assert!(matches!(for_loop.children[0].kind, OperKind::VariableDecl(_)));
    assert_eq!(for_loop.children[1].kind, OperKind::LiteralBool(true));
    assert_eq!(for_loop.children[2].kind, OperKind::PostIncrement);
    assert_eq!(for_loop.locals, wrapper.locals);
}

#[test]
fn test_parse_if_without_else() {
    let unit = parse_source("void main() { bool p; if (p) discard; }").unwrap();
    let statement = body(&unit, "main").children[1].clone();
    assert_eq!(statement.kind, OperKind::If);
    assert!(statement.children[2].is_noop());
    assert_eq!(statement.children[1].kind, OperKind::Discard);
}

#[test]
fn test_parse_do_while() {
    let unit = parse_source("void main() { bool p; do { continue; } while (p); }").unwrap();
    let statement = body(&unit, "main").children[1].clone();
    assert_eq!(statement.kind, OperKind::Do);
    assert!(matches!(statement.children[1].kind, OperKind::VariableRef(_)));
}

#[test]
fn test_parse_invalid_qualifiers() {
    let error = parse_source("void f(uniform float x) { }").unwrap_err();
    assert_eq!(error.get_error_name(), "InvalidQualifier");

    let error = parse_source("out float x;").unwrap_err();
    assert_eq!(error.get_error_name(), "InvalidQualifier");
}

#[test]
fn test_parse_const_requires_initializer() {
    assert!(parse_source("void main() { const float x; }").is_err());
}

#[test]
fn test_parse_syntax_error_missing_semicolon() {
    let error = parse_source("void main() { float x = 1.0 }").unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedToken");
}

#[test]
fn test_parse_unknown_type() {
    let error = parse_source("Color c;").unwrap_err();
    assert_eq!(error.get_error_name(), "UnknownType");
}

#[test]
fn test_parse_error_position() {
    let source = "void main() {\n  float x;\n  y = 1.0;\n}";
    let error = parse_source(source).unwrap_err();
    let position = error.get_position().unwrap();
    assert_eq!(&source[position.0 as usize..position.0 as usize + 1], "y");
}
