use std::collections::HashMap;

use crate::{
    ast::{
        ast::{OperKind, Operation},
        types::{TypeQualifier, TypeSpecifier},
    },
    errors::errors::{Error, ErrorImpl},
    ir::ir::{IrNode, IrOpcode, PrimOp},
    symbols::symbols::{Atom, FunId, FunctionKind, ScopeId, StructId, Symbols, VarId, Variable},
    type_checker::type_checker::{TypeChecker, TypeInfo},
};

use super::compiler::{gen_operation, Compiler, FlowContext};

const COMPONENT_FIELDS: [&str; 4] = ["x", "y", "z", "w"];

/// Name of the slot primitive wrappers write their result to.
pub const RETURN_SLOT: &str = "__retVal";

/// What a call expression turned out to invoke.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// An overload whose parameters match the arguments exactly.
    Function(FunId),
    /// A struct constructor.
    Struct(StructId),
    /// The first overload of the name, reached by rewriting the arguments.
    Adapted(FunId, Vec<Operation>),
}

/// Resolves a call of `name` with `args`.
///
/// Exact overloads win, innermost scope first. A name without an exact
/// overload that names a struct is its constructor. Otherwise the first
/// function of that name is tried with converted arguments.
///
/// # Arguments
///
/// * `checker` - Type oracle for the arguments
/// * `name` - Function, operator or constructor name
/// * `args` - The call's arguments
///
/// # Returns
///
/// The resolution, `FunctionNotDeclared` when nothing carries the name, or
/// `NoMatchingOverload` when no candidate accepts the arguments.
pub fn resolve_call(checker: &TypeChecker, name: &str, args: &[Operation]) -> Result<Resolution, Error> {
    let types = args
        .iter()
        .map(|arg| checker.type_of(arg))
        .collect::<Result<Vec<_>, Error>>()?;

    if let Some(fun) = locate_function(checker, name, &types) {
        return Ok(Resolution::Function(fun));
    }

    if let Some(id) = checker.symbols.lookup_struct(checker.structs, name) {
        return Ok(Resolution::Struct(id));
    }

    let Some(first) = checker
        .symbols
        .functions_named(checker.functions, name)
        .into_iter()
        .next()
    else {
        return Err(Error::new(
            ErrorImpl::FunctionNotDeclared {
                function: name.to_string(),
            },
            None,
        ));
    };

    match adapt_call(checker, first, args)? {
        Some(adapted) => Ok(Resolution::Adapted(first, adapted)),
        None => Err(Error::new(
            ErrorImpl::NoMatchingOverload {
                function: name.to_string(),
                arguments: checker.argument_list(args)?,
            },
            None,
        )),
    }
}

/// First overload of `name` whose parameters accept `args` exactly.
pub fn locate_function(checker: &TypeChecker, name: &str, args: &[TypeInfo]) -> Option<FunId> {
    checker
        .symbols
        .functions_named(checker.functions, name)
        .into_iter()
        .find(|fun| signature_matches(checker.symbols, *fun, args))
}

/// Equal count and types; `out`/`inout` parameters need a location.
fn signature_matches(symbols: &Symbols, fun: FunId, args: &[TypeInfo]) -> bool {
    let params = symbols.parameters(fun);
    params.len() == args.len()
        && params.iter().zip(args).all(|(param, arg)| {
            let type_ = &symbols.variable(*param).type_;
            type_.specifier == arg.specifier && (!type_.qualifier.is_by_reference() || arg.can_be_referenced)
        })
}

/// Rewrites `args` so that `fun` accepts them.
///
/// Constructor arguments are first flattened into scalar selections. Each
/// argument is then converted on its own: scalars through the target's
/// constructor, vectors to scalars through their first component, scalars
/// to vectors by replication. Parameters passed by reference never take a
/// converted argument.
///
/// # Returns
///
/// The rewritten arguments, or `None` when some argument cannot be
/// converted or the result still does not type-check.
pub fn adapt_call(checker: &TypeChecker, fun: FunId, args: &[Operation]) -> Result<Option<Vec<Operation>>, Error> {
    let symbols = checker.symbols;
    let params = symbols.parameters(fun);

    let args = if symbols.function(fun).kind == FunctionKind::Constructor {
        flatten_constructor_arguments(checker, args, params.len())?
    } else {
        args.to_vec()
    };
    if args.len() != params.len() {
        return Ok(None);
    }

    let mut adapted = vec![];
    for (arg, param) in args.into_iter().zip(&params) {
        let expected = &symbols.variable(*param).type_;
        let actual = checker.type_of(&arg)?;
        if actual.specifier == expected.specifier {
            adapted.push(arg);
            continue;
        }
        if expected.qualifier.is_by_reference() {
            return Ok(None);
        }
        match convert_argument(arg, &actual.specifier, &expected.specifier) {
            Some(converted) => adapted.push(converted),
            None => return Ok(None),
        }
    }

    let types = adapted.iter().map(|arg| checker.type_of(arg)).collect::<Result<Vec<_>, Error>>();
    match types {
        Ok(types) if signature_matches(symbols, fun, &types) => Ok(Some(adapted)),
        _ => Ok(None),
    }
}

/// Splits vector and matrix arguments into their scalar components.
///
/// A lone scalar is replicated to `count` arguments; surplus components are
/// dropped.
fn flatten_constructor_arguments(
    checker: &TypeChecker,
    args: &[Operation],
    count: usize,
) -> Result<Vec<Operation>, Error> {
    let mut flat = vec![];
    for arg in args {
        let specifier = checker.type_of(arg)?.specifier;
        if specifier.is_vector() {
            for component in COMPONENT_FIELDS.iter().take(specifier.components() as usize) {
                flat.push(select_field(arg.clone(), component));
            }
        } else if specifier.is_matrix() {
            let size = specifier.components();
            for column in 0..size {
                let column = Operation::new(
                    OperKind::Subscript,
                    vec![arg.clone(), Operation::leaf(OperKind::LiteralInt(column as i32), arg.locals)],
                    arg.locals,
                );
                for component in COMPONENT_FIELDS.iter().take(size as usize) {
                    flat.push(select_field(column.clone(), component));
                }
            }
        } else {
            flat.push(arg.clone());
        }
    }

    if flat.len() == 1 && count > 1 {
        flat = vec![flat[0].clone(); count];
    }
    flat.truncate(count);
    Ok(flat)
}

fn select_field(base: Operation, field: &str) -> Operation {
    let locals = base.locals;
    let position = base.position.clone();
    Operation::new(OperKind::Field(Atom::from(field)), vec![base], locals).with_position(position)
}

fn construct(name: &str, arg: Operation) -> Operation {
    let locals = arg.locals;
    let position = arg.position.clone();
    Operation::new(OperKind::Call(Atom::from(name)), vec![arg], locals).with_position(position)
}

fn convert_argument(arg: Operation, from: &TypeSpecifier, to: &TypeSpecifier) -> Option<Operation> {
    let to_name = to.builtin_name()?;

    if from.is_scalar() && to.is_scalar() {
        return Some(construct(to_name, arg));
    }

    if from.is_vector() && to.is_scalar() {
        let first = select_field(arg, COMPONENT_FIELDS[0]);
        if from.base_type().as_ref() == Some(to) {
            return Some(first);
        }
        return Some(construct(to_name, first));
    }

    if from.is_scalar() && to.is_vector() {
        let base = to.base_type()?;
        let scalar = if from == &base {
            arg
        } else {
            construct(base.builtin_name()?, arg)
        };
        return Some(construct(to_name, scalar));
    }

    None
}

/// The asm statement of a function whose body only forwards to a primitive.
fn primitive_body<'b>(symbols: &Symbols, body: &'b Operation) -> Option<&'b Operation> {
    let [statement] = body.children.as_slice() else {
        return None;
    };
    let OperKind::Asm(_) = statement.kind else {
        return None;
    };
    let writes_result = match statement.children.first().map(|operand| &operand.kind) {
        Some(OperKind::Identifier(name)) => &**name == RETURN_SLOT,
        Some(OperKind::VariableRef(id)) => &*symbols.variable(*id).name == RETURN_SLOT,
        _ => false,
    };
    writes_result.then_some(statement)
}

/// Arguments a `const` parameter may alias without a copy.
fn is_simple_argument(arg: &Operation) -> bool {
    matches!(
        arg.kind,
        OperKind::Identifier(_)
            | OperKind::VariableRef(_)
            | OperKind::LiteralFloat(_)
            | OperKind::LiteralInt(_)
            | OperKind::LiteralBool(_)
    )
}

/// Lowers a call of `fun` by expanding its body in place.
///
/// # Arguments
///
/// * `fun` - The resolved callee
/// * `args` - Arguments, already adapted to the callee's parameters
/// * `locals` - Scope of the call site; the expansion's scope nests in it
///
/// # Returns
///
/// The lowered expansion. Its value, if the callee returns one, is the
/// result temporary.
pub fn inline_call(
    compiler: &mut Compiler,
    ctx: &mut FlowContext,
    fun: FunId,
    args: &[Operation],
    locals: ScopeId,
) -> Result<IrNode, Error> {
    let function = compiler.symbols.function(fun).clone();
    if ctx.inline_stack.contains(&fun) {
        return Err(Error::new(
            ErrorImpl::RecursiveCall {
                function: function.name.to_string(),
            },
            None,
        ));
    }
    let Some(body) = &function.body else {
        return Err(Error::new(
            ErrorImpl::FunctionNotDefined {
                function: function.name.to_string(),
            },
            None,
        ));
    };

    if let Some(asm) = primitive_body(&compiler.symbols, body) {
        return inline_primitive(compiler, ctx, fun, asm, args);
    }

    log::debug!("inlining {}", function.name);
    let call_scope = compiler.symbols.new_scope(Some(locals));
    let mut substitutions = HashMap::new();
    let mut statements = vec![];

    for (param, arg) in compiler.symbols.parameters(fun).into_iter().zip(args) {
        let variable = compiler.symbols.variable(param).clone();
        let qualifier = variable.type_.qualifier;
        if qualifier.is_by_reference() || (qualifier == TypeQualifier::Const && is_simple_argument(arg)) {
            substitutions.insert(param, arg.clone());
            continue;
        }

        let mut copy = Variable::temporary(&format!("__copy_{}", variable.name), variable.type_.specifier.clone());
        copy.initializer = Some(arg.clone());
        let id = compiler.symbols.declare_variable(call_scope, copy)?;
        statements.push(Operation::leaf(OperKind::VariableDecl(id), call_scope));
        substitutions.insert(param, Operation::leaf(OperKind::VariableRef(id), call_scope));
    }

    let result = match compiler.symbols.return_slot(fun) {
        Some(slot) if !function.return_type.specifier.is_void() => {
            let temp = Variable::temporary("__resultTmp", function.return_type.specifier.clone());
            let id = compiler.symbols.declare_variable(call_scope, temp)?;
            substitutions.insert(slot, Operation::leaf(OperKind::VariableRef(id), call_scope));
            Some(id)
        }
        _ => None,
    };

    let exit = compiler.function_exit(body, "__endfunc");
    let mut copier = BodyCopier {
        symbols: &mut compiler.symbols,
        substitutions,
        remap: HashMap::new(),
        scopes: HashMap::new(),
        result,
    };
    statements.push(copier.copy(body)?);
    let block = Operation::new(OperKind::Block { new_scope: true }, statements, call_scope);

    ctx.inline_stack.push(fun);
    let loops = std::mem::take(&mut ctx.loops);
    let caller_exit = std::mem::replace(&mut ctx.exit, exit);
    let lowered = gen_operation(compiler, ctx, &block);
    ctx.exit = caller_exit;
    ctx.loops = loops;
    ctx.inline_stack.pop();
    let expansion = compiler.backend.lower_function(&exit, lowered?);

    // The result outlives the expansion's own allocation scope.
    Ok(match result {
        Some(result) => {
            let size = compiler.sizeof_type(&function.return_type.specifier);
            IrNode::seq(vec![
                IrNode::leaf(IrOpcode::VarDecl { var: result, size }),
                expansion,
                IrNode::var(result),
            ])
        }
        None => expansion,
    })
}

/// Lowers a call of a function whose body is a single primitive.
fn inline_primitive(
    compiler: &mut Compiler,
    ctx: &mut FlowContext,
    fun: FunId,
    asm: &Operation,
    args: &[Operation],
) -> Result<IrNode, Error> {
    let name = asm.atom().map(|name| name.to_string()).unwrap_or_default();
    let op = PrimOp::from_name(&name).ok_or_else(|| Error::new(ErrorImpl::UnknownInstruction { name }, None))?;

    let substitutions: HashMap<VarId, Operation> = compiler
        .symbols
        .parameters(fun)
        .into_iter()
        .zip(args.iter().cloned())
        .collect();

    let mut operands = vec![];
    for operand in asm.children.iter().skip(1) {
        let operand = substitute_parameters(&compiler.symbols, operand, &substitutions);
        operands.push(gen_operation(compiler, ctx, &operand)?);
    }

    let return_type = compiler.symbols.function(fun).return_type.specifier.clone();
    let size = compiler.sizeof_type(&return_type);
    Ok(IrNode::prim(op, size, operands))
}

fn substitute_parameters(symbols: &Symbols, oper: &Operation, substitutions: &HashMap<VarId, Operation>) -> Operation {
    let id = match &oper.kind {
        OperKind::Identifier(name) => symbols.lookup_variable(oper.locals, name),
        OperKind::VariableRef(id) => Some(*id),
        _ => None,
    };
    if let Some(replacement) = id.and_then(|id| substitutions.get(&id)) {
        return replacement.clone();
    }

    Operation {
        children: oper
            .children
            .iter()
            .map(|child| substitute_parameters(symbols, child, substitutions))
            .collect(),
        ..oper.clone()
    }
}

/// Copies a function body for one inline expansion.
///
/// Every scope the body opens is duplicated so the expansion gets its own
/// variables, parameter references become the substituted arguments and
/// `return expr` becomes a store to the result slot followed by a bare
/// `return` that leaves the expansion.
struct BodyCopier<'s> {
    symbols: &'s mut Symbols,
    substitutions: HashMap<VarId, Operation>,
    remap: HashMap<VarId, VarId>,
    scopes: HashMap<ScopeId, ScopeId>,
    result: Option<VarId>,
}

impl BodyCopier<'_> {
    fn copy(&mut self, oper: &Operation) -> Result<Operation, Error> {
        let mut locals = self.scopes.get(&oper.locals).copied().unwrap_or(oper.locals);

        match &oper.kind {
            OperKind::Block { new_scope: true } if !self.scopes.contains_key(&oper.locals) => {
                let outer = self
                    .symbols
                    .scope(oper.locals)
                    .outer
                    .map(|outer| self.scopes.get(&outer).copied().unwrap_or(outer));
                let copy = self.symbols.copy_scope(oper.locals, outer, &mut self.remap);
                self.scopes.insert(oper.locals, copy);
                locals = copy;
            }
            OperKind::Identifier(name) => {
                if let Some(id) = self.symbols.lookup_variable(oper.locals, name) {
                    return Ok(self.reference(id, oper, locals));
                }
            }
            OperKind::VariableRef(id) => return Ok(self.reference(*id, oper, locals)),
            OperKind::VariableDecl(id) => {
                let copy = self.remap.get(id).copied().unwrap_or(*id);
                let initializer = self.symbols.variable(*id).initializer.clone();
                if let (Some(initializer), true) = (initializer, copy != *id) {
                    let initializer = self.copy(&initializer)?;
                    if let Some(variable) = self.symbols.variable_mut(copy) {
                        variable.initializer = Some(initializer);
                    }
                }
                return Ok(Operation::leaf(OperKind::VariableDecl(copy), locals).with_position(oper.position.clone()));
            }
            OperKind::Return => return self.copy_return(oper, locals),
            _ => {}
        }

        let children = oper
            .children
            .iter()
            .map(|child| self.copy(child))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Operation::new(oper.kind.clone(), children, locals).with_position(oper.position.clone()))
    }

    fn reference(&self, id: VarId, oper: &Operation, locals: ScopeId) -> Operation {
        if let Some(replacement) = self.substitutions.get(&id) {
            return replacement.clone();
        }
        let id = self.remap.get(&id).copied().unwrap_or(id);
        Operation::leaf(OperKind::VariableRef(id), locals).with_position(oper.position.clone())
    }

    fn copy_return(&mut self, oper: &Operation, locals: ScopeId) -> Result<Operation, Error> {
        let exit = Operation::leaf(OperKind::Return, locals).with_position(oper.position.clone());
        let value = oper.children.first().filter(|value| !value.is_noop());

        match (value, self.result) {
            (Some(value), Some(result)) => {
                let store = Operation::new(
                    OperKind::Assign,
                    vec![Operation::leaf(OperKind::VariableRef(result), locals), self.copy(value)?],
                    locals,
                )
                .with_position(oper.position.clone());
                Ok(Operation::new(OperKind::Sequence, vec![store, exit], locals))
            }
            (Some(_), None) => Err(Error::new(
                ErrorImpl::TypeMatchError {
                    expected: "void".to_string(),
                    received: "a return value".to_string(),
                },
                oper.position.clone(),
            )),
            (None, _) => Ok(exit),
        }
    }
}
