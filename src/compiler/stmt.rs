use crate::{
    ast::{
        ast::{OperKind, Operation},
        types::TypeSpecifier,
    },
    errors::errors::{Error, ErrorImpl},
    ir::{
        backend::{exit_unless, BackendKind, LoopLabels},
        ir::{IrNode, IrOpcode, PrimOp},
    },
    type_checker::{constant::evaluate_bool, type_checker::expect_child},
};

use super::{
    compiler::{gen_operation, Compiler, FlowContext, LoopFrame, LoopPrologue},
    expr::{gen_assignment, gen_expression},
};

/// Lowers a statement node into IR.
///
/// # Arguments
///
/// * `compiler` - The compilation being built
/// * `ctx` - Loop and function-exit state of the enclosing code
/// * `statement` - The statement to lower
///
/// # Returns
///
/// The lowered statement, or the first error found in it.
pub fn gen_statement(compiler: &mut Compiler, ctx: &mut FlowContext, statement: &Operation) -> Result<IrNode, Error> {
    match &statement.kind {
        OperKind::Noop => Ok(IrNode::nop()),
        OperKind::Block { new_scope } => {
            let mut children = vec![];
            for child in &statement.children {
                let lowered = gen_operation(compiler, ctx, child)?;
                if !lowered.is_nop() {
                    children.push(lowered);
                }
            }
            if *new_scope && !children.is_empty() {
                Ok(IrNode::new(IrOpcode::Scope, children))
            } else {
                Ok(IrNode::seq(children))
            }
        }
        OperKind::VariableDecl(var) => {
            let variable = compiler.symbols.variable(*var).clone();
            let size = compiler.sizeof_type(&variable.type_.specifier);
            let declaration = IrNode::leaf(IrOpcode::VarDecl { var: *var, size });

            let Some(initializer) = &variable.initializer else {
                return Ok(declaration);
            };
            let target = Operation::leaf(OperKind::VariableRef(*var), statement.locals)
                .with_position(statement.position.clone());
            let store = gen_assignment(compiler, ctx, &target, initializer, false)?;
            Ok(IrNode::seq(vec![declaration, store]))
        }
        OperKind::Asm(name) => gen_asm(compiler, ctx, name, statement),
        OperKind::Break => {
            let Some(frame) = ctx.loops.last() else {
                return Err(Error::new(ErrorImpl::BreakOutsideLoop, statement.position.clone()));
            };
            Ok(compiler.backend.lower_break(&frame.labels))
        }
        OperKind::Continue => gen_continue(compiler, ctx, statement),
        OperKind::Discard => Ok(compiler
            .backend
            .lower_discard(&ctx.exit, ctx.program_end, ctx.loops.len())),
        OperKind::Return => {
            if let Some(value) = statement.children.first().filter(|value| !value.is_noop()) {
                let received = compiler.type_of(value)?;
                return Err(Error::new(
                    ErrorImpl::TypeMatchError {
                        expected: "void".to_string(),
                        received: compiler.symbols.type_name(&received.specifier),
                    },
                    statement.position.clone(),
                ));
            }
            Ok(compiler.backend.lower_exit(&ctx.exit, ctx.loops.len()))
        }
        OperKind::Expression => gen_operation(compiler, ctx, expect_child(statement, 0)?),
        OperKind::If => gen_if(compiler, ctx, statement),
        OperKind::While => {
            let cond = expect_child(statement, 0)?;
            let frame = LoopLabels::looping_at_start(&mut compiler.labels);
            let cond = gen_condition(compiler, ctx, cond)?;
            let body = gen_loop_body(compiler, ctx, frame, None, expect_child(statement, 1)?)?;
            let lowered = compiler.backend.lower_while(&frame, cond, body);
            Ok(compiler.backend.after_loop(&ctx.exit, lowered))
        }
        OperKind::Do => {
            let cond = expect_child(statement, 1)?;
            let frame = LoopLabels::with_continue(&mut compiler.labels);
            let prologue = Some(LoopPrologue::ExitTest(cond.clone()));
            let body = gen_loop_body(compiler, ctx, frame, prologue, expect_child(statement, 0)?)?;
            let cond = gen_condition(compiler, ctx, cond)?;
            let lowered = compiler.backend.lower_do(&frame, body, cond);
            Ok(compiler.backend.after_loop(&ctx.exit, lowered))
        }
        OperKind::For => {
            let step = expect_child(statement, 2)?;
            let init = gen_operation(compiler, ctx, expect_child(statement, 0)?)?;
            let frame = LoopLabels::with_continue(&mut compiler.labels);
            let cond = gen_condition(compiler, ctx, expect_child(statement, 1)?)?;
            let prologue = Some(LoopPrologue::Step(step.clone()));
            let body = gen_loop_body(compiler, ctx, frame, prologue, expect_child(statement, 3)?)?;
            let step = gen_operation(compiler, ctx, step)?;
            let lowered = compiler.backend.lower_for(&frame, init, cond, step, body);
            Ok(compiler.backend.after_loop(&ctx.exit, lowered))
        }
        _ => gen_expression(compiler, ctx, statement),
    }
}

/// Where `return` and `discard` appear in a function body.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExitShape {
    /// Some exit is not the last statement of the body.
    pub early: bool,
    /// Some exit sits inside a loop.
    pub in_loop: bool,
}

pub fn exit_shape(body: &Operation) -> ExitShape {
    let mut shape = ExitShape::default();
    let count = body.children.len();
    for (i, statement) in body.children.iter().enumerate() {
        let trailing = i + 1 == count && matches!(statement.kind, OperKind::Return | OperKind::Discard);
        if !trailing {
            find_exits(statement, 0, &mut shape);
        }
    }
    shape
}

fn find_exits(oper: &Operation, loop_depth: usize, shape: &mut ExitShape) {
    match oper.kind {
        OperKind::Return | OperKind::Discard => {
            shape.early = true;
            shape.in_loop |= loop_depth > 0;
        }
        OperKind::While | OperKind::Do | OperKind::For => {
            for child in &oper.children {
                find_exits(child, loop_depth + 1, shape);
            }
        }
        _ => {
            for child in &oper.children {
                find_exits(child, loop_depth, shape);
            }
        }
    }
}

/// Lowers a boolean condition, rejecting every other type.
pub fn gen_condition(compiler: &mut Compiler, ctx: &mut FlowContext, cond: &Operation) -> Result<IrNode, Error> {
    check_condition(compiler, cond)?;
    gen_operation(compiler, ctx, cond)
}

fn check_condition(compiler: &Compiler, cond: &Operation) -> Result<(), Error> {
    let type_ = compiler.type_of(cond)?;
    if type_.specifier != TypeSpecifier::Bool {
        return Err(Error::new(
            ErrorImpl::TypeMatchError {
                expected: "bool".to_string(),
                received: compiler.symbols.type_name(&type_.specifier),
            },
            cond.position.clone(),
        ));
    }
    Ok(())
}

fn gen_if(compiler: &mut Compiler, ctx: &mut FlowContext, statement: &Operation) -> Result<IrNode, Error> {
    let cond = expect_child(statement, 0)?;
    let then = expect_child(statement, 1)?;
    let otherwise = statement.child(2).filter(|branch| !branch.is_noop());

    // A constant condition keeps only the branch taken.
    if let Some(value) = evaluate_bool(cond) {
        check_condition(compiler, cond)?;
        return match (value, otherwise) {
            (true, _) => gen_operation(compiler, ctx, then),
            (false, Some(otherwise)) => gen_operation(compiler, ctx, otherwise),
            (false, None) => Ok(IrNode::nop()),
        };
    }

    let cond = gen_condition(compiler, ctx, cond)?;
    let then = gen_operation(compiler, ctx, then)?;
    let otherwise = match otherwise {
        Some(otherwise) => Some(gen_operation(compiler, ctx, otherwise)?),
        None => None,
    };
    Ok(compiler.backend.lower_if(&mut compiler.labels, cond, then, otherwise))
}

fn gen_loop_body(
    compiler: &mut Compiler,
    ctx: &mut FlowContext,
    labels: LoopLabels,
    prologue: Option<LoopPrologue>,
    body: &Operation,
) -> Result<IrNode, Error> {
    ctx.loops.push(LoopFrame { labels, prologue });
    let lowered = gen_operation(compiler, ctx, body);
    ctx.loops.pop();
    lowered
}

fn gen_continue(compiler: &mut Compiler, ctx: &mut FlowContext, statement: &Operation) -> Result<IrNode, Error> {
    let Some(frame) = ctx.loops.last() else {
        return Err(Error::new(ErrorImpl::ContinueOutsideLoop, statement.position.clone()));
    };
    let labels = frame.labels;
    let prologue = match compiler.backend.kind() {
        BackendKind::Structured => frame.prologue.clone(),
        BackendKind::Labels => None,
    };

    let prologue = match prologue {
        Some(LoopPrologue::Step(step)) => Some(gen_operation(compiler, ctx, &step)?),
        Some(LoopPrologue::ExitTest(cond)) => Some(exit_unless(gen_condition(compiler, ctx, &cond)?)),
        None => None,
    };
    Ok(compiler.backend.lower_continue(&labels, prologue))
}

/// Lowers `__asm name dest, operands...` into a primitive stored to `dest`.
fn gen_asm(compiler: &mut Compiler, ctx: &mut FlowContext, name: &str, statement: &Operation) -> Result<IrNode, Error> {
    let op = PrimOp::from_name(name).ok_or_else(|| {
        Error::new(
            ErrorImpl::UnknownInstruction {
                name: name.to_string(),
            },
            statement.position.clone(),
        )
    })?;

    let dest = expect_child(statement, 0)?;
    let operands = &statement.children[1..];
    if operands.len() != op.operand_count() {
        return Err(Error::new(
            ErrorImpl::ArgumentCountMismatch {
                expected: op.operand_count(),
                received: operands.len(),
            },
            statement.position.clone(),
        ));
    }

    let size = compiler.sizeof_type(&compiler.type_of(dest)?.specifier);
    let mut lowered = vec![];
    for operand in operands {
        lowered.push(gen_operation(compiler, ctx, operand)?);
    }
    let dest = gen_operation(compiler, ctx, dest)?;
    Ok(IrNode::assign(dest, IrNode::prim(op, size, lowered)))
}
