use crate::{
    ast::types::{FullySpecifiedType, TypeQualifier, TypeSpecifier},
    compiler::compiler::ShaderTarget,
    ir::ir::{IrNode, IrOpcode, LabelTable, PrimOp},
    storage::storage::RegisterFile,
    symbols::symbols::{Atom, FunScopeId, StructScopeId, Symbols, VarId, Variable},
    type_checker::{
        swizzle::{Swizzle, WriteMask},
        type_checker::TypeChecker,
    },
};

use super::{
    emitter::Emitter,
    instruction::{Opcode, Program},
};

struct Fixture {
    symbols: Symbols,
    functions: FunScopeId,
    structs: StructScopeId,
    labels: LabelTable,
}

impl Fixture {
    fn new() -> Self {
        let mut symbols = Symbols::new();
        let functions = symbols.new_function_scope(None);
        let structs = symbols.new_struct_scope(None);
        Fixture {
            symbols,
            functions,
            structs,
            labels: LabelTable::new(),
        }
    }

    fn variable(&mut self, name: &str, specifier: TypeSpecifier) -> VarId {
        self.symbols
            .add_variable(Variable::new(Atom::from(name), FullySpecifiedType::unqualified(specifier)))
    }

    fn global(&mut self, name: &str, qualifier: TypeQualifier, specifier: TypeSpecifier) -> VarId {
        let mut variable = Variable::new(Atom::from(name), FullySpecifiedType::new(qualifier, specifier));
        variable.is_global = true;
        self.symbols.add_variable(variable)
    }

    fn emit(&self, root: &IrNode) -> Program {
        self.try_emit(root).unwrap()
    }

    fn try_emit(&self, root: &IrNode) -> Result<Program, crate::errors::errors::Error> {
        let checker = TypeChecker::new(&self.symbols, self.functions, self.structs);
        Emitter::new(checker, &self.labels, ShaderTarget::Fragment, 8).emit_program(root)
    }
}

fn decl(var: VarId, size: u32) -> IrNode {
    IrNode::leaf(IrOpcode::VarDecl { var, size })
}

fn swizzle(text: &str, value: IrNode) -> IrNode {
    IrNode::swizzle(Swizzle::parse(text, 4, "vec4").unwrap(), value)
}

#[test]
fn test_swizzled_assignment_masks_destination() {
    let mut fixture = Fixture::new();
    let v = fixture.variable("v", TypeSpecifier::Vec4);
    let r = fixture.variable("r", TypeSpecifier::Vec2);

    let inverse = Swizzle::parse("yx", 4, "vec4").unwrap().inverse();
    let root = IrNode::seq(vec![
        decl(v, 4),
        decl(r, 2),
        IrNode::assign(swizzle("yx", IrNode::var(v)), IrNode::swizzle(inverse, IrNode::var(r))),
    ]);
    let program = fixture.emit(&root);

    let mov = &program.instructions[0];
    assert_eq!(mov.opcode, Opcode::Mov);
    let dst = mov.dst.unwrap();
    assert_eq!(dst.writemask, WriteMask(0b11));
    assert_eq!(mov.src[0].swizzle.component(0), 1);
    assert_eq!(mov.src[0].swizzle.component(1), 0);
    assert_eq!(program.instructions.last().unwrap().opcode, Opcode::End);
}

#[test]
fn test_scalar_constants_are_packed_and_shared() {
    let mut fixture = Fixture::new();
    let a = fixture.variable("a", TypeSpecifier::Float);
    let b = fixture.variable("b", TypeSpecifier::Float);
    let c = fixture.variable("c", TypeSpecifier::Float);

    let root = IrNode::seq(vec![
        decl(a, 1),
        decl(b, 1),
        decl(c, 1),
        IrNode::assign(IrNode::var(a), IrNode::scalar(1.0)),
        IrNode::assign(IrNode::var(b), IrNode::scalar(2.0)),
        IrNode::assign(IrNode::var(c), IrNode::scalar(1.0)),
    ]);
    let program = fixture.emit(&root);

    assert_eq!(program.constants.len(), 1);
    assert_eq!(program.constants[0][0], 1.0);
    assert_eq!(program.constants[0][1], 2.0);
    assert_eq!(program.instructions[2].src[0].swizzle, Swizzle::replicate(0));
    assert_eq!(program.instructions[1].src[0].swizzle, Swizzle::replicate(1));
}

#[test]
fn test_vector_constants_take_whole_registers() {
    let fixture = Fixture::new();
    let constant = IrNode::leaf(IrOpcode::Float {
        value: [1.0, 2.0, 3.0, 4.0],
        size: 4,
    });
    let root = IrNode::seq(vec![
        IrNode::prim(PrimOp::Add, 4, vec![constant.clone(), constant]),
        IrNode::prim(PrimOp::Add, 1, vec![IrNode::scalar(5.0), IrNode::scalar(5.0)]),
    ]);
    let program = fixture.emit(&root);

    assert_eq!(program.constants.len(), 2);
    assert_eq!(program.instructions[0].src[0].index, program.instructions[0].src[1].index);
    assert_eq!(program.instructions[1].src[0].index, 1);
}

#[test]
fn test_labels_resolve_to_next_instruction() {
    let mut fixture = Fixture::new();
    let end = fixture.labels.new_label("__end");
    let root = IrNode::seq(vec![
        IrNode::leaf(IrOpcode::Jump(end)),
        IrNode::leaf(IrOpcode::Kill),
        IrNode::leaf(IrOpcode::Label(end)),
    ]);
    let program = fixture.emit(&root);

    assert_eq!(program.instructions[0].opcode, Opcode::Bra);
    assert_eq!(program.instructions[0].target, Some(2));
    assert_eq!(program.instructions[2].opcode, Opcode::End);
}

#[test]
fn test_unresolved_label() {
    let mut fixture = Fixture::new();
    let nowhere = fixture.labels.new_label("__nowhere");
    let error = fixture
        .try_emit(&IrNode::leaf(IrOpcode::Jump(nowhere)))
        .unwrap_err();
    assert_eq!(error.get_error_name(), "UnresolvedLabel");
}

#[test]
fn test_structured_if_else_targets() {
    let mut fixture = Fixture::new();
    let flag = fixture.variable("flag", TypeSpecifier::Bool);
    let root = IrNode::seq(vec![
        decl(flag, 1),
        IrNode::new(
            IrOpcode::If,
            vec![IrNode::var(flag), IrNode::leaf(IrOpcode::Kill), IrNode::leaf(IrOpcode::Kill)],
        ),
    ]);
    let program = fixture.emit(&root);

    let opcodes: Vec<Opcode> = program.instructions.iter().map(|i| i.opcode).collect();
    assert_eq!(
        opcodes,
        vec![Opcode::If, Opcode::Kil, Opcode::Else, Opcode::Kil, Opcode::Endif, Opcode::End]
    );
    assert_eq!(program.instructions[0].target, Some(3));
    assert_eq!(program.instructions[2].target, Some(4));
}

#[test]
fn test_loop_targets() {
    let fixture = Fixture::new();
    let root = IrNode::new(
        IrOpcode::Loop,
        vec![IrNode::leaf(IrOpcode::Break), IrNode::leaf(IrOpcode::Cont)],
    );
    let program = fixture.emit(&root);

    let opcodes: Vec<Opcode> = program.instructions.iter().map(|i| i.opcode).collect();
    assert_eq!(
        opcodes,
        vec![Opcode::BgnLoop, Opcode::Brk, Opcode::Cont, Opcode::EndLoop, Opcode::End]
    );
    assert_eq!(program.instructions[0].target, Some(4));
    assert_eq!(program.instructions[1].target, Some(4));
    assert_eq!(program.instructions[2].target, Some(1));
    assert_eq!(program.instructions[3].target, Some(1));
}

#[test]
fn test_break_outside_loop() {
    let fixture = Fixture::new();
    let error = fixture.try_emit(&IrNode::leaf(IrOpcode::Break)).unwrap_err();
    assert_eq!(error.get_error_name(), "BreakOutsideLoop");
}

#[test]
fn test_scope_releases_registers() {
    let mut fixture = Fixture::new();
    let first = fixture.variable("first", TypeSpecifier::Vec4);
    let second = fixture.variable("second", TypeSpecifier::Vec4);
    let root = IrNode::seq(vec![
        IrNode::new(IrOpcode::Scope, vec![decl(first, 4)]),
        IrNode::new(IrOpcode::Scope, vec![decl(second, 4)]),
    ]);
    let program = fixture.emit(&root);

    let first = program.variable("first").unwrap().storage;
    let second = program.variable("second").unwrap().storage;
    assert_eq!(first.index, second.index);
    assert_eq!(program.temporaries, 1);
}

#[test]
fn test_operation_temporaries_are_released() {
    let mut fixture = Fixture::new();
    let v = fixture.variable("v", TypeSpecifier::Vec4);
    let sum = || IrNode::prim(PrimOp::Add, 4, vec![IrNode::var(v), IrNode::var(v)]);
    let root = IrNode::seq(vec![
        decl(v, 4),
        IrNode::assign(IrNode::var(v), sum()),
        IrNode::assign(IrNode::var(v), sum()),
    ]);
    let program = fixture.emit(&root);

    assert_eq!(program.instructions[0].dst.unwrap().index, 1);
    assert_eq!(program.instructions[2].dst.unwrap().index, 1);
    assert_eq!(program.temporaries, 2);
}

#[test]
fn test_negate_is_source_modifier() {
    let mut fixture = Fixture::new();
    let v = fixture.variable("v", TypeSpecifier::Vec4);
    let root = IrNode::seq(vec![
        decl(v, 4),
        IrNode::prim(PrimOp::Negate, 4, vec![IrNode::var(v)]),
    ]);
    let program = fixture.emit(&root);
    assert_eq!(program.instructions[0].opcode, Opcode::Mov);
    assert!(program.instructions[0].src[0].negate);
}

#[test]
fn test_wide_moves_split_per_register() {
    let mut fixture = Fixture::new();
    let a = fixture.variable("a", TypeSpecifier::Mat3);
    let b = fixture.variable("b", TypeSpecifier::Mat3);
    let root = IrNode::seq(vec![
        decl(a, 12),
        decl(b, 12),
        IrNode::assign(IrNode::var(a), IrNode::var(b)),
    ]);
    let program = fixture.emit(&root);
    assert_eq!(program.count(Opcode::Mov), 3);
    assert_eq!(program.instructions[1].dst.unwrap().index, 1);
    assert_eq!(program.instructions[1].src[0].index, 4);
}

#[test]
fn test_globals_are_bound_on_first_use() {
    let mut fixture = Fixture::new();
    let color = fixture.global("gl_FragColor", TypeQualifier::FixedOutput, TypeSpecifier::Vec4);
    let tint = fixture.global("tint", TypeQualifier::Uniform, TypeSpecifier::Vec4);
    let coord = fixture.global("coord", TypeQualifier::Varying, TypeSpecifier::Vec2);
    let matrix = fixture.global("gl_ModelViewProjectionMatrix", TypeQualifier::Uniform, TypeSpecifier::Mat4);
    let root = IrNode::seq(vec![
        IrNode::assign(IrNode::var(color), IrNode::var(tint)),
        IrNode::assign(
            IrNode::new(IrOpcode::Field { offset: 0, size: 2 }, vec![IrNode::var(color)]),
            IrNode::var(coord),
        ),
        IrNode::assign(
            IrNode::var(color),
            IrNode::new(IrOpcode::Field { offset: 4, size: 4 }, vec![IrNode::var(matrix)]),
        ),
    ]);
    let program = fixture.emit(&root);

    assert_eq!(program.output("gl_FragColor").unwrap().storage.file, RegisterFile::Output);
    assert_eq!(program.uniform("tint").unwrap().storage.file, RegisterFile::Uniform);
    assert_eq!(program.input("coord").unwrap().storage.file, RegisterFile::Input);
    assert_eq!(
        program.uniform("gl_ModelViewProjectionMatrix").unwrap().storage.file,
        RegisterFile::StateVariable
    );
    assert_eq!(program.instructions[2].src[0].index, 1);
}

#[test]
fn test_unallocated_local_is_an_error() {
    let mut fixture = Fixture::new();
    let v = fixture.variable("v", TypeSpecifier::Vec4);
    let error = fixture
        .try_emit(&IrNode::assign(IrNode::var(v), IrNode::var(v)))
        .unwrap_err();
    assert_eq!(error.get_error_name(), "VariableNotAllocated");
}
