use crate::{
    ast::{
        ast::{OperKind, Operation},
        types::{TypeQualifier, TypeSpecifier},
    },
    errors::errors::{Error, ErrorImpl},
    ir::ir::{IrNode, IrOpcode, PrimOp},
    symbols::symbols::{FunId, ScopeId, StructId, VarId, Variable},
    type_checker::{
        swizzle::Swizzle,
        type_checker::{expect_child, TypeChecker},
    },
};

use super::{
    compiler::{gen_operation, Compiler, FlowContext, ShaderTarget},
    functions::{inline_call, resolve_call, Resolution},
    stmt::gen_condition,
};

/// Lowers an expression node into IR.
///
/// # Arguments
///
/// * `compiler` - The compilation being built
/// * `ctx` - Loop and function-exit state of the enclosing code
/// * `expression` - The expression to lower
///
/// # Returns
///
/// An IR tree whose value is the expression's value.
pub fn gen_expression(compiler: &mut Compiler, ctx: &mut FlowContext, expression: &Operation) -> Result<IrNode, Error> {
    match &expression.kind {
        OperKind::LiteralFloat(value) => Ok(IrNode::scalar(*value)),
        OperKind::LiteralInt(value) => Ok(IrNode::scalar(*value as f32)),
        OperKind::LiteralBool(value) => Ok(IrNode::scalar(if *value { 1.0 } else { 0.0 })),
        OperKind::Identifier(_) | OperKind::VariableRef(_) => {
            let var = variable_of(&compiler.checker(), expression)?;
            Ok(IrNode::var(var))
        }
        OperKind::Sequence => {
            let mut children = vec![];
            for child in &expression.children {
                children.push(gen_operation(compiler, ctx, child)?);
            }
            Ok(IrNode::seq(children))
        }
        OperKind::Assign => gen_assignment(
            compiler,
            ctx,
            expect_child(expression, 0)?,
            expect_child(expression, 1)?,
            true,
        ),
        OperKind::Select => gen_select(compiler, ctx, expression),
        OperKind::LogicalAnd => {
            let (left, right) = logical_operands(compiler, expression, "&&")?;
            let otherwise = Operation::leaf(OperKind::LiteralBool(false), expression.locals);
            gen_select_between(compiler, ctx, left, right, &otherwise)
        }
        OperKind::LogicalOr => {
            let (left, right) = logical_operands(compiler, expression, "||")?;
            let taken = Operation::leaf(OperKind::LiteralBool(true), expression.locals);
            gen_select_between(compiler, ctx, left, &taken, right)
        }
        OperKind::LogicalXor => {
            let (left, right) = logical_operands(compiler, expression, "^^")?;
            let left = gen_operation(compiler, ctx, left)?;
            let right = gen_operation(compiler, ctx, right)?;
            Ok(IrNode::prim(PrimOp::SetNotEqual, 1, vec![left, right]))
        }
        OperKind::Not => {
            let operand = expect_child(expression, 0)?;
            expect_bool(compiler, operand, "!")?;
            Ok(IrNode::not(gen_operation(compiler, ctx, operand)?))
        }
        OperKind::Equal | OperKind::NotEqual => gen_equality(compiler, ctx, expression),
        OperKind::Less | OperKind::Greater | OperKind::LessEqual | OperKind::GreaterEqual => {
            gen_relational(compiler, ctx, expression)
        }
        OperKind::Plus => gen_operation(compiler, ctx, expect_child(expression, 0)?),
        OperKind::Add
        | OperKind::Subtract
        | OperKind::Multiply
        | OperKind::Divide
        | OperKind::Minus
        | OperKind::AddAssign
        | OperKind::SubAssign
        | OperKind::MulAssign
        | OperKind::DivAssign
        | OperKind::PreIncrement
        | OperKind::PreDecrement
        | OperKind::PostIncrement
        | OperKind::PostDecrement => {
            let name = expression.kind.operator_function().unwrap_or("?");
            gen_call(compiler, ctx, name, &expression.children, expression.locals)
        }
        OperKind::Call(name) => gen_call(compiler, ctx, name, &expression.children, expression.locals),
        OperKind::Subscript => gen_subscript(compiler, ctx, expression),
        OperKind::Field(name) => gen_field(compiler, ctx, name, expression),
        _ => Err(Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: format!("{:?}", expression.kind),
                message: "statement used as a value".to_string(),
            },
            expression.position.clone(),
        )),
    }
}

fn variable_of(checker: &TypeChecker, oper: &Operation) -> Result<VarId, Error> {
    checker.variable_of(oper)?.ok_or_else(|| {
        Error::new(
            ErrorImpl::VariableNotDeclared {
                variable: format!("{:?}", oper.kind),
            },
            oper.position.clone(),
        )
    })
}

/// The variable at the root of a chain of field, subscript and swizzle
/// selections.
fn root_variable(checker: &TypeChecker, oper: &Operation) -> Result<Option<VarId>, Error> {
    match &oper.kind {
        OperKind::Field(_) | OperKind::Subscript => root_variable(checker, expect_child(oper, 0)?),
        _ => checker.variable_of(oper),
    }
}

fn is_read_only(qualifier: TypeQualifier, target: ShaderTarget) -> bool {
    match qualifier {
        TypeQualifier::Const | TypeQualifier::Attribute | TypeQualifier::Uniform | TypeQualifier::FixedInput => true,
        TypeQualifier::Varying => target == ShaderTarget::Fragment,
        _ => false,
    }
}

fn check_writable(compiler: &Compiler, target: &Operation) -> Result<(), Error> {
    let Some(var) = root_variable(&compiler.checker(), target)? else {
        return Ok(());
    };
    let variable = compiler.symbols.variable(var);
    if is_read_only(variable.type_.qualifier, compiler.options.target) {
        return Err(Error::new(
            ErrorImpl::ReadOnlyAssignment {
                variable: variable.name.to_string(),
            },
            target.position.clone(),
        ));
    }
    Ok(())
}

/// Lowers `target = value`.
///
/// The types must be equal and the target must be a location. A swizzled
/// target must not repeat a component; when its components are not in
/// order the value is permuted so that a masked positional move stores it.
///
/// # Arguments
///
/// * `target` - The location written
/// * `value` - The value stored
/// * `check_read_only` - Reject targets rooted in read-only variables;
///   initializers of such variables pass `false`
pub fn gen_assignment(
    compiler: &mut Compiler,
    ctx: &mut FlowContext,
    target: &Operation,
    value: &Operation,
    check_read_only: bool,
) -> Result<IrNode, Error> {
    let target_type = compiler.type_of(target)?;
    let value_type = compiler.type_of(value)?;
    if target_type.specifier != value_type.specifier {
        return Err(Error::new(
            ErrorImpl::TypeMatchError {
                expected: compiler.symbols.type_name(&target_type.specifier),
                received: compiler.symbols.type_name(&value_type.specifier),
            },
            value.position.clone().or_else(|| target.position.clone()),
        ));
    }
    if !target_type.can_be_referenced {
        return Err(Error::new(ErrorImpl::NotAnLvalue, target.position.clone()));
    }
    if check_read_only {
        check_writable(compiler, target)?;
    }

    let mut source = gen_operation(compiler, ctx, value)?;
    if target_type.is_swizzled {
        let swizzle = target_type.swizzle;
        if !swizzle.is_mask() {
            return Err(Error::new(
                ErrorImpl::InvalidWriteMask {
                    swizzle: swizzle_letters(&swizzle),
                },
                target.position.clone(),
            ));
        }
        if !swizzle.is_simple() {
            source = IrNode::swizzle(swizzle.inverse(), source);
        }
    }

    let dest = gen_operation(compiler, ctx, target)?;
    Ok(IrNode::assign(dest, source))
}

fn swizzle_letters(swizzle: &Swizzle) -> String {
    swizzle
        .selected()
        .iter()
        .map(|c| ['x', 'y', 'z', 'w'][*c as usize])
        .collect()
}

fn gen_select(compiler: &mut Compiler, ctx: &mut FlowContext, expression: &Operation) -> Result<IrNode, Error> {
    let cond = expect_child(expression, 0)?;
    let taken = expect_child(expression, 1)?;
    let otherwise = expect_child(expression, 2)?;

    let taken_type = compiler.type_of(taken)?;
    let otherwise_type = compiler.type_of(otherwise)?;
    if taken_type.specifier != otherwise_type.specifier {
        return Err(Error::new(
            ErrorImpl::TypeMatchError {
                expected: compiler.symbols.type_name(&taken_type.specifier),
                received: compiler.symbols.type_name(&otherwise_type.specifier),
            },
            otherwise.position.clone(),
        ));
    }
    gen_select_between(compiler, ctx, cond, taken, otherwise)
}

/// `cond ? taken : otherwise` through a temporary written on each branch.
fn gen_select_between(
    compiler: &mut Compiler,
    ctx: &mut FlowContext,
    cond: &Operation,
    taken: &Operation,
    otherwise: &Operation,
) -> Result<IrNode, Error> {
    let specifier = compiler.type_of(taken)?.specifier;
    let size = compiler.sizeof_type(&specifier);
    let temp = compiler.symbols.add_variable(Variable::temporary("__selectTmp", specifier));

    let cond = gen_condition(compiler, ctx, cond)?;
    let taken = IrNode::assign(IrNode::var(temp), gen_operation(compiler, ctx, taken)?);
    let otherwise = IrNode::assign(IrNode::var(temp), gen_operation(compiler, ctx, otherwise)?);
    let branch = compiler.backend.lower_if(&mut compiler.labels, cond, taken, Some(otherwise));

    Ok(IrNode::new(
        IrOpcode::Seq,
        vec![
            IrNode::leaf(IrOpcode::VarDecl { var: temp, size }),
            branch,
            IrNode::var(temp),
        ],
    ))
}

fn expect_bool(compiler: &Compiler, operand: &Operation, operator: &str) -> Result<(), Error> {
    let type_ = compiler.type_of(operand)?;
    if type_.specifier != TypeSpecifier::Bool {
        return Err(Error::new(
            ErrorImpl::InvalidOperands {
                operator: operator.to_string(),
                type_: compiler.symbols.type_name(&type_.specifier),
            },
            operand.position.clone(),
        ));
    }
    Ok(())
}

fn logical_operands<'o>(
    compiler: &Compiler,
    expression: &'o Operation,
    operator: &str,
) -> Result<(&'o Operation, &'o Operation), Error> {
    let left = expect_child(expression, 0)?;
    let right = expect_child(expression, 1)?;
    expect_bool(compiler, left, operator)?;
    expect_bool(compiler, right, operator)?;
    Ok((left, right))
}

fn operator_symbol(kind: &OperKind) -> &'static str {
    match kind {
        OperKind::Equal => "==",
        OperKind::NotEqual => "!=",
        OperKind::Less => "<",
        OperKind::Greater => ">",
        OperKind::LessEqual => "<=",
        _ => ">=",
    }
}

/// Operands of a binary comparison, which must share one type.
fn comparison_operands<'o>(
    compiler: &Compiler,
    expression: &'o Operation,
) -> Result<(&'o Operation, &'o Operation, TypeSpecifier), Error> {
    let left = expect_child(expression, 0)?;
    let right = expect_child(expression, 1)?;
    let left_type = compiler.type_of(left)?.specifier;
    let right_type = compiler.type_of(right)?.specifier;
    if left_type != right_type {
        return Err(Error::new(
            ErrorImpl::TypeMatchError {
                expected: compiler.symbols.type_name(&left_type),
                received: compiler.symbols.type_name(&right_type),
            },
            right.position.clone(),
        ));
    }
    Ok((left, right, left_type))
}

/// Scalars compare directly. Vectors compare through the dot product of
/// their component-wise inequality with itself, which is zero only when
/// every component matches.
fn gen_equality(compiler: &mut Compiler, ctx: &mut FlowContext, expression: &Operation) -> Result<IrNode, Error> {
    let (left, right, specifier) = comparison_operands(compiler, expression)?;
    let equal = matches!(expression.kind, OperKind::Equal);

    if specifier.is_scalar() {
        let op = if equal { PrimOp::SetEqual } else { PrimOp::SetNotEqual };
        let left = gen_operation(compiler, ctx, left)?;
        let right = gen_operation(compiler, ctx, right)?;
        return Ok(IrNode::prim(op, 1, vec![left, right]));
    }

    if specifier.is_vector() {
        let size = specifier.components();
        let dot = match size {
            2 => PrimOp::Dot2,
            3 => PrimOp::Dot3,
            _ => PrimOp::Dot4,
        };
        let left = gen_operation(compiler, ctx, left)?;
        let right = gen_operation(compiler, ctx, right)?;
        let differs = IrNode::prim(PrimOp::SetNotEqual, size, vec![left, right]);
        let ones = IrNode::leaf(IrOpcode::Float {
            value: [1.0; 4],
            size,
        });
        let count = IrNode::prim(dot, 1, vec![differs, ones]);
        let op = if equal { PrimOp::SetEqual } else { PrimOp::SetNotEqual };
        return Ok(IrNode::prim(op, 1, vec![count, IrNode::scalar(0.0)]));
    }

    Err(Error::new(
        ErrorImpl::InvalidOperands {
            operator: operator_symbol(&expression.kind).to_string(),
            type_: compiler.symbols.type_name(&specifier),
        },
        expression.position.clone(),
    ))
}

fn gen_relational(compiler: &mut Compiler, ctx: &mut FlowContext, expression: &Operation) -> Result<IrNode, Error> {
    let (left, right, specifier) = comparison_operands(compiler, expression)?;
    if !matches!(specifier, TypeSpecifier::Int | TypeSpecifier::Float) {
        return Err(Error::new(
            ErrorImpl::InvalidOperands {
                operator: operator_symbol(&expression.kind).to_string(),
                type_: compiler.symbols.type_name(&specifier),
            },
            expression.position.clone(),
        ));
    }

    let op = match expression.kind {
        OperKind::Less => PrimOp::SetLess,
        OperKind::Greater => PrimOp::SetGreater,
        OperKind::LessEqual => PrimOp::SetLessEqual,
        _ => PrimOp::SetGreaterEqual,
    };
    let left = gen_operation(compiler, ctx, left)?;
    let right = gen_operation(compiler, ctx, right)?;
    Ok(IrNode::prim(op, 1, vec![left, right]))
}

fn gen_subscript(compiler: &mut Compiler, ctx: &mut FlowContext, expression: &Operation) -> Result<IrNode, Error> {
    compiler.type_of(expression)?;
    let base = expect_child(expression, 0)?;
    let index = expect_child(expression, 1)?;
    let specifier = compiler.type_of(base)?.specifier;
    let position = compiler.checker().constant_index(index, &specifier)?;
    let lowered = gen_operation(compiler, ctx, base)?;

    let node = match &specifier {
        TypeSpecifier::Array(element, length) => {
            let stride = compiler.checker().array_stride(element, length.unwrap_or(0));
            let size = compiler.sizeof_type(element);
            IrNode::new(
                IrOpcode::Field {
                    offset: position * stride,
                    size,
                },
                vec![lowered],
            )
        }
        spec if spec.is_matrix() => IrNode::new(
            IrOpcode::Field {
                offset: position * 4,
                size: spec.components(),
            },
            vec![lowered],
        ),
        _ => IrNode::swizzle(Swizzle::new(&[position as u8]), lowered),
    };
    Ok(node)
}

fn gen_field(compiler: &mut Compiler, ctx: &mut FlowContext, name: &str, expression: &Operation) -> Result<IrNode, Error> {
    compiler.type_of(expression)?;
    let base = expect_child(expression, 0)?;
    let specifier = compiler.type_of(base)?.specifier;
    let lowered = gen_operation(compiler, ctx, base)?;

    if let TypeSpecifier::Struct(id) = &specifier {
        let Some((offset, field)) = compiler.checker().field_offset(*id, name) else {
            return Err(Error::new(
                ErrorImpl::UnknownField {
                    field: name.to_string(),
                    type_: compiler.symbols.type_name(&specifier),
                },
                expression.position.clone(),
            ));
        };
        let size = compiler.sizeof_type(&field);
        return Ok(IrNode::new(IrOpcode::Field { offset, size }, vec![lowered]));
    }

    let swizzle = Swizzle::parse(
        name,
        specifier.components(),
        &compiler.symbols.type_name(&specifier),
    )?;
    Ok(IrNode::swizzle(swizzle, lowered))
}

/// Lowers a call of a function, operator or constructor.
///
/// Calls whose arguments had to be converted still compile but leave a
/// warning in the compilation's log.
pub fn gen_call(
    compiler: &mut Compiler,
    ctx: &mut FlowContext,
    name: &str,
    args: &[Operation],
    locals: ScopeId,
) -> Result<IrNode, Error> {
    let resolution = resolve_call(&compiler.checker(), name, args)?;
    match resolution {
        Resolution::Function(fun) => {
            check_reference_arguments(compiler, fun, args)?;
            inline_call(compiler, ctx, fun, args, locals)
        }
        Resolution::Adapted(fun, adapted) => {
            let arguments = compiler.checker().argument_list(args)?;
            let position = args
                .iter()
                .find_map(|arg| arg.position.as_ref())
                .map(|position| format!("{}:{}: ", position.1, position.0))
                .unwrap_or_default();
            compiler.warn(format!(
                "{}implicit conversion of arguments {} in call to {}",
                position, arguments, name
            ));
            check_reference_arguments(compiler, fun, &adapted)?;
            inline_call(compiler, ctx, fun, &adapted, locals)
        }
        Resolution::Struct(id) => gen_struct_constructor(compiler, ctx, id, args),
    }
}

/// `out` and `inout` arguments are written by the callee.
fn check_reference_arguments(compiler: &Compiler, fun: FunId, args: &[Operation]) -> Result<(), Error> {
    for (param, arg) in compiler.symbols.parameters(fun).into_iter().zip(args) {
        if compiler.symbols.variable(param).type_.qualifier.is_by_reference() {
            check_writable(compiler, arg)?;
        }
    }
    Ok(())
}

fn gen_struct_constructor(
    compiler: &mut Compiler,
    ctx: &mut FlowContext,
    id: StructId,
    args: &[Operation],
) -> Result<IrNode, Error> {
    let def = compiler.symbols.struct_def(id).clone();
    if def.fields.len() != args.len() {
        return Err(Error::new(
            ErrorImpl::ArgumentCountMismatch {
                expected: def.fields.len(),
                received: args.len(),
            },
            args.first().and_then(|arg| arg.position.clone()),
        ));
    }

    let specifier = TypeSpecifier::Struct(id);
    let size = compiler.sizeof_type(&specifier);
    let temp = compiler.symbols.add_variable(Variable::temporary("__structTmp", specifier));
    let layout = compiler.checker().struct_layout(id);

    let mut statements = vec![IrNode::leaf(IrOpcode::VarDecl { var: temp, size })];
    for ((field, offset), arg) in def.fields.iter().zip(layout.offsets).zip(args) {
        let received = compiler.type_of(arg)?.specifier;
        if received != field.specifier {
            return Err(Error::new(
                ErrorImpl::TypeMatchError {
                    expected: compiler.symbols.type_name(&field.specifier),
                    received: compiler.symbols.type_name(&received),
                },
                arg.position.clone(),
            ));
        }
        let size = compiler.sizeof_type(&field.specifier);
        let value = gen_operation(compiler, ctx, arg)?;
        let dest = IrNode::new(IrOpcode::Field { offset, size }, vec![IrNode::var(temp)]);
        statements.push(IrNode::assign(dest, value));
    }
    statements.push(IrNode::var(temp));
    Ok(IrNode::new(IrOpcode::Seq, statements))
}

