//! Main compiler module.
//!
//! This module contains the core Compiler structure and the compilation
//! pipeline from a parsed translation unit to an instruction stream. It
//! owns the unit's symbol tables, the label table and the control-flow
//! backend chosen for the compilation.

use std::rc::Rc;

use crate::{
    ast::{
        ast::{OperKind, Operation, TranslationUnit},
        types::{TypeQualifier, TypeSpecifier},
    },
    emitter::{emitter::Emitter, instruction::Program},
    errors::errors::{Error, ErrorImpl, InfoLog},
    ir::{
        backend::{create_backend, Backend, BackendKind, FunctionExit, LoopLabels},
        ir::{IrNode, IrOpcode, LabelId, LabelTable},
    },
    lexer::lexer::tokenize,
    parser::parser::parse,
    symbols::symbols::{FunId, FunScopeId, ScopeId, StructScopeId, Symbols, Variable},
    type_checker::{
        constant::literal_value,
        type_checker::{TypeChecker, TypeInfo},
    },
};

use super::{
    expr::{gen_assignment, gen_expression},
    stdlib::Builtins,
    stmt::{exit_shape, gen_statement},
};

/// Pipeline stage a shader runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderTarget {
    Vertex,
    #[default]
    Fragment,
}

/// Settings of one compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub target: ShaderTarget,
    pub backend: BackendKind,
    /// Size of the temporary register file.
    pub max_temporaries: u32,
    /// Name of the parameterless `void` function the program starts at.
    pub entry_point: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            target: ShaderTarget::Fragment,
            backend: BackendKind::Labels,
            max_temporaries: 128,
            entry_point: String::from("main"),
        }
    }
}

/// Code a structured `continue` runs before re-entering its loop. Kept as
/// source so every `continue` lowers its own copy.
#[derive(Debug, Clone)]
pub enum LoopPrologue {
    /// The step expression of a `for`.
    Step(Operation),
    /// The condition of a `do`, tested before jumping back.
    ExitTest(Operation),
}

/// Innermost-loop state visible to `break` and `continue`.
pub struct LoopFrame {
    pub labels: LoopLabels,
    pub prologue: Option<LoopPrologue>,
}

/// Control-flow state threaded through lowering.
pub struct FlowContext {
    pub loops: Vec<LoopFrame>,
    /// How `return` leaves the function being lowered.
    pub exit: FunctionExit,
    /// End of the entry point, where a labelled `discard` lands.
    pub program_end: LabelId,
    /// Functions currently being inlined, outermost first.
    pub inline_stack: Vec<FunId>,
}

impl FlowContext {
    pub fn new(exit: FunctionExit) -> Self {
        FlowContext {
            loops: vec![],
            exit,
            program_end: exit.end,
            inline_stack: vec![],
        }
    }
}

/// The main compiler structure that holds the state of one compilation.
///
/// This structure manages:
/// - The unit's symbol tables, chained to the shared built-in library
/// - The label table shared by lowering and emission
/// - The control-flow backend, fixed for the whole compilation
/// - Warnings raised while lowering
pub struct Compiler<'a> {
    pub options: &'a CompileOptions,
    pub symbols: Symbols,
    pub globals: ScopeId,
    pub functions: FunScopeId,
    pub structs: StructScopeId,
    pub labels: LabelTable,
    pub backend: Box<dyn Backend>,
    pub warnings: Vec<String>,
}

impl<'a> Compiler<'a> {
    /// Creates a new Compiler instance.
    ///
    /// # Arguments
    ///
    /// * `unit` - The parsed translation unit to compile
    /// * `options` - Target, backend and resource limits
    ///
    /// # Returns
    ///
    /// A new Compiler instance ready to lower the unit's entry point.
    pub fn new(unit: TranslationUnit, options: &'a CompileOptions) -> Self {
        Compiler {
            options,
            symbols: unit.symbols,
            globals: unit.globals,
            functions: unit.functions,
            structs: unit.structs,
            labels: LabelTable::new(),
            backend: create_backend(options.backend),
            warnings: vec![],
        }
    }

    pub fn checker(&self) -> TypeChecker<'_> {
        TypeChecker::new(&self.symbols, self.functions, self.structs)
    }

    pub fn type_of(&self, oper: &Operation) -> Result<TypeInfo, Error> {
        self.checker().type_of(oper)
    }

    pub fn sizeof_type(&self, specifier: &TypeSpecifier) -> u32 {
        self.checker().sizeof_type(specifier)
    }

    /// Exit of a function about to be lowered from `body`. A structured
    /// compilation gets a return flag when some exit sits inside a loop.
    pub fn function_exit(&mut self, body: &Operation, end: &str) -> FunctionExit {
        let shape = exit_shape(body);
        let flag = (shape.in_loop && self.backend.kind() == BackendKind::Structured).then(|| {
            self.symbols
                .add_variable(Variable::temporary("__returnFlag", TypeSpecifier::Bool))
        });
        FunctionExit {
            end: self.labels.new_label(end),
            early: shape.early,
            flag,
        }
    }

    pub fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Lowers the entry point and emits the program.
    ///
    /// # Returns
    ///
    /// The emitted program and the warnings raised on the way, or the first
    /// error.
    pub fn compile(mut self) -> Result<(Program, Vec<String>), Error> {
        let entry = self.entry_point()?;
        let function = self.symbols.function(entry).clone();
        let Some(body) = function.body else {
            return Err(Error::new(
                ErrorImpl::FunctionNotDefined {
                    function: function.name.to_string(),
                },
                function.position,
            ));
        };

        let exit = self.function_exit(&body, "__endmain");
        let mut ctx = FlowContext::new(exit);
        let prologue = self.global_prologue(&mut ctx)?;
        let lowered = gen_operation(&mut self, &mut ctx, &body)?;
        let root = IrNode::seq(vec![prologue, self.backend.lower_function(&exit, lowered)]);
        log::debug!("lowered {} to {} IR nodes", function.name, root.count());

        let program = Emitter::new(
            self.checker(),
            &self.labels,
            self.options.target,
            self.options.max_temporaries,
        )
        .emit_program(&root)?;
        Ok((program, self.warnings))
    }

    fn entry_point(&self) -> Result<FunId, Error> {
        self.symbols
            .functions_named(self.functions, &self.options.entry_point)
            .into_iter()
            .find(|fun| {
                let function = self.symbols.function(*fun);
                function.param_count == 0 && function.return_type.specifier.is_void()
            })
            .ok_or_else(|| {
                Error::new(
                    ErrorImpl::MissingEntryPoint {
                        name: self.options.entry_point.clone(),
                    },
                    None,
                )
            })
    }

    /// Declarations and initializers of the globals that live in the
    /// temporary file, run before the entry point body.
    fn global_prologue(&mut self, ctx: &mut FlowContext) -> Result<IrNode, Error> {
        let mut statements = vec![];
        for var in self.symbols.scope(self.globals).variables.clone() {
            let variable = self.symbols.variable(var).clone();
            let in_temporaries = match variable.type_.qualifier {
                TypeQualifier::None => true,
                TypeQualifier::Const => variable.initializer.as_ref().and_then(literal_value).is_none(),
                _ => false,
            };
            if !in_temporaries {
                continue;
            }

            let size = self.sizeof_type(&variable.type_.specifier);
            statements.push(IrNode::leaf(IrOpcode::VarDecl { var, size }));
            if let Some(initializer) = &variable.initializer {
                let target = Operation::leaf(OperKind::VariableRef(var), self.globals);
                statements.push(gen_assignment(self, ctx, &target, initializer, false)?);
            }
        }
        Ok(IrNode::seq(statements))
    }
}

/// Lowers one AST node into IR.
///
/// Statements and expressions are dispatched to their generators; errors
/// without a position pick up the position of the innermost node that has
/// one.
pub fn gen_operation(compiler: &mut Compiler, ctx: &mut FlowContext, oper: &Operation) -> Result<IrNode, Error> {
    let lowered = match &oper.kind {
        OperKind::Noop
        | OperKind::Block { .. }
        | OperKind::VariableDecl(_)
        | OperKind::Asm(_)
        | OperKind::Break
        | OperKind::Continue
        | OperKind::Discard
        | OperKind::Return
        | OperKind::Expression
        | OperKind::If
        | OperKind::While
        | OperKind::Do
        | OperKind::For => gen_statement(compiler, ctx, oper),
        _ => gen_expression(compiler, ctx, oper),
    };
    lowered.map_err(|error| error.or_position(oper.position.as_ref()))
}

/// Compiles shader sources against one shared copy of the built-in library.
///
/// The diagnostic log is reset at the start of every compilation and keeps
/// the first error and all warnings of the last one.
pub struct ShaderCompiler {
    builtins: Rc<Builtins>,
    pub options: CompileOptions,
    log: InfoLog,
}

impl ShaderCompiler {
    pub fn new(options: CompileOptions) -> Result<Self, Error> {
        Ok(ShaderCompiler::with_builtins(Rc::new(Builtins::load()?), options))
    }

    pub fn with_builtins(builtins: Rc<Builtins>, options: CompileOptions) -> Self {
        ShaderCompiler {
            builtins,
            options,
            log: InfoLog::new(),
        }
    }

    pub fn log(&self) -> &InfoLog {
        &self.log
    }

    pub fn compile_source(&mut self, source: &str, file: Option<String>) -> Result<Program, Error> {
        self.log.clear();
        match self.compile_unit(source, file) {
            Ok((program, warnings)) => {
                for warning in warnings {
                    self.log.warning(warning);
                }
                Ok(program)
            }
            Err(error) => {
                self.log.record(error.clone());
                Err(error)
            }
        }
    }

    fn compile_unit(&self, source: &str, file: Option<String>) -> Result<(Program, Vec<String>), Error> {
        let tokens = tokenize(source, file.clone())?;
        let unit = parse(tokens, file, Some(&self.builtins))?;
        Compiler::new(unit, &self.options).compile()
    }
}
