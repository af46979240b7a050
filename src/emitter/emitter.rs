use std::collections::HashMap;

use crate::{
    ast::types::TypeQualifier,
    compiler::compiler::ShaderTarget,
    errors::errors::{Error, ErrorImpl},
    ir::ir::{IrNode, IrOpcode, LabelId, LabelTable},
    storage::{
        alloc::VarTable,
        storage::{RegisterFile, Storage},
    },
    symbols::symbols::VarId,
    type_checker::{
        constant::literal_value,
        swizzle::{Swizzle, WriteMask},
        type_checker::TypeChecker,
    },
};

use super::instruction::{Binding, DstReg, Instruction, Opcode, Program, SrcReg};

/// Result of emitting a value node. `temp` is set when the value occupies
/// an anonymous temporary the consumer must release.
#[derive(Debug, Clone, Copy)]
struct Value {
    storage: Storage,
    temp: Option<(u32, u32)>,
}

impl Value {
    fn location(storage: Storage) -> Self {
        Value {
            storage,
            temp: None,
        }
    }
}

struct LoopPatch {
    begin: usize,
    breaks: Vec<usize>,
}

/// Walks an IR tree and produces the instruction stream.
pub struct Emitter<'a> {
    checker: TypeChecker<'a>,
    labels: &'a LabelTable,
    target: ShaderTarget,
    temps: VarTable,
    storage: HashMap<VarId, Storage>,
    program: Program,
    /// Components in use per constant register, and whether that register
    /// only holds packed scalars.
    constant_usage: Vec<(u32, bool)>,
    label_positions: HashMap<LabelId, usize>,
    fixups: Vec<(usize, LabelId)>,
    loops: Vec<LoopPatch>,
    next_register: HashMap<RegisterFile, u32>,
}

impl<'a> Emitter<'a> {
    pub fn new(checker: TypeChecker<'a>, labels: &'a LabelTable, target: ShaderTarget, max_temporaries: u32) -> Self {
        Emitter {
            checker,
            labels,
            target,
            temps: VarTable::new(max_temporaries),
            storage: HashMap::new(),
            program: Program::default(),
            constant_usage: vec![],
            label_positions: HashMap::new(),
            fixups: vec![],
            loops: vec![],
            next_register: HashMap::new(),
        }
    }

    /// Emits `root`, appends `END` and resolves every branch target.
    ///
    /// # Arguments
    ///
    /// * `root` - Lowered body of the entry point, prologue included
    ///
    /// # Returns
    ///
    /// The finished program, or the first allocation or label error.
    pub fn emit_program(mut self, root: &IrNode) -> Result<Program, Error> {
        let value = self.emit(root)?;
        self.release(value);
        self.push(Instruction::new(Opcode::End));

        for (index, label) in std::mem::take(&mut self.fixups) {
            let Some(position) = self.label_positions.get(&label) else {
                return Err(Error::new(
                    ErrorImpl::UnresolvedLabel {
                        label: self.labels.name(label).to_string(),
                    },
                    None,
                ));
            };
            self.program.instructions[index].target = Some(*position);
        }

        self.program.temporaries = self.temps.registers_used();
        Ok(self.program)
    }

    fn push(&mut self, instruction: Instruction) -> usize {
        log::trace!("{:4}: {}", self.program.instructions.len(), instruction);
        self.program.instructions.push(instruction);
        self.program.instructions.len() - 1
    }

    fn release(&mut self, value: Option<Value>) {
        if let Some(Value {
            temp: Some((position, size)),
            ..
        }) = value
        {
            self.temps.free_temp(position, size);
        }
    }

    fn expect_value(&mut self, node: &IrNode) -> Result<Value, Error> {
        self.emit(node)?.ok_or_else(|| {
            Error::new(
                ErrorImpl::TypeMatchError {
                    expected: "a value".to_string(),
                    received: "void".to_string(),
                },
                None,
            )
        })
    }

    fn emit(&mut self, node: &IrNode) -> Result<Option<Value>, Error> {
        match &node.opcode {
            IrOpcode::Nop => Ok(None),
            IrOpcode::Seq => {
                let Some((last, rest)) = node.children.split_last() else {
                    return Ok(None);
                };
                for child in rest {
                    let value = self.emit(child)?;
                    self.release(value);
                }
                self.emit(last)
            }
            IrOpcode::Scope => {
                self.temps.push();
                for child in &node.children {
                    let value = self.emit(child)?;
                    self.release(value);
                }
                self.temps.pop()?;
                Ok(None)
            }
            IrOpcode::Label(label) => {
                self.label_positions.insert(*label, self.program.instructions.len());
                Ok(None)
            }
            IrOpcode::Jump(label) => {
                let index = self.push(Instruction::new(Opcode::Bra));
                self.fixups.push((index, *label));
                Ok(None)
            }
            IrOpcode::CJump { label, if_true } => {
                let cond = self.condition(node)?;
                let opcode = if *if_true { Opcode::Brnz } else { Opcode::Brz };
                let index = self.push(Instruction::new(opcode).with_src(cond));
                self.fixups.push((index, *label));
                Ok(None)
            }
            IrOpcode::If => self.emit_if(node),
            IrOpcode::Loop => self.emit_loop(node),
            IrOpcode::Break => {
                let index = self.push(Instruction::new(Opcode::Brk));
                let Some(frame) = self.loops.last_mut() else {
                    return Err(Error::new(ErrorImpl::BreakOutsideLoop, None));
                };
                frame.breaks.push(index);
                Ok(None)
            }
            IrOpcode::Cont => {
                let Some(begin) = self.loops.last().map(|frame| frame.begin) else {
                    return Err(Error::new(ErrorImpl::ContinueOutsideLoop, None));
                };
                let mut instruction = Instruction::new(Opcode::Cont);
                instruction.target = Some(begin + 1);
                self.push(instruction);
                Ok(None)
            }
            IrOpcode::Move => {
                let (Some(dest), Some(source)) = (node.children.first(), node.children.get(1)) else {
                    return Err(arity_error(2, node.children.len()));
                };
                let dest = self.expect_value(dest)?;
                let source = self.expect_value(source)?;
                self.emit_move(&dest.storage, &source.storage);
                self.release(Some(source));
                Ok(Some(dest))
            }
            IrOpcode::VarDecl { var, size } => {
                if *size == 0 {
                    return Ok(None);
                }
                let storage = self.temps.alloc_var(*size)?;
                self.storage.insert(*var, storage);
                self.program.variables.push(Binding {
                    name: self.checker.symbols.variable(*var).name.to_string(),
                    storage,
                });
                Ok(None)
            }
            IrOpcode::Var(var) => Ok(Some(Value::location(self.variable_storage(*var)?))),
            IrOpcode::Float { value, size } => Ok(Some(Value::location(self.constant(*value, *size)))),
            IrOpcode::Swizzle(swizzle) => {
                let value = self.expect_value(single_child(node)?)?;
                Ok(Some(Value {
                    storage: value.storage.swizzled(swizzle),
                    temp: value.temp,
                }))
            }
            IrOpcode::Field { offset, size } => {
                let value = self.expect_value(single_child(node)?)?;
                Ok(Some(Value {
                    storage: value.storage.field(*offset, *size),
                    temp: value.temp,
                }))
            }
            IrOpcode::Kill => {
                self.push(Instruction::new(Opcode::Kil));
                Ok(None)
            }
            IrOpcode::Prim { op, size } => {
                if node.children.len() != op.operand_count() {
                    return Err(arity_error(op.operand_count(), node.children.len()));
                }

                let mut operands = vec![];
                for child in &node.children {
                    operands.push(self.expect_value(child)?);
                }

                let (position, result) = self.temps.alloc_temp(*size)?;
                let (opcode, negate) = Opcode::from_prim(*op);
                let mut instruction = Instruction::new(opcode).with_dst(DstReg {
                    file: result.file,
                    index: result.index,
                    writemask: result.swizzle.writemask(),
                });
                for operand in &operands {
                    let mut src = SrcReg::from_storage(&operand.storage);
                    src.negate = negate;
                    instruction = instruction.with_src(src);
                }
                self.push(instruction);

                for operand in operands {
                    self.release(Some(operand));
                }
                Ok(Some(Value {
                    storage: result,
                    temp: Some((position, *size)),
                }))
            }
        }
    }

    /// Evaluates the condition child of a branch into a scalar source.
    fn condition(&mut self, node: &IrNode) -> Result<SrcReg, Error> {
        let Some(cond) = node.children.first() else {
            return Err(arity_error(1, 0));
        };
        let value = self.expect_value(cond)?;
        self.release(Some(value));

        let mut src = SrcReg::from_storage(&value.storage);
        src.swizzle = Swizzle::replicate(value.storage.swizzle.component(0));
        Ok(src)
    }

    fn emit_if(&mut self, node: &IrNode) -> Result<Option<Value>, Error> {
        let cond = self.condition(node)?;
        let begin = self.push(Instruction::new(Opcode::If).with_src(cond));

        if let Some(then) = node.children.get(1) {
            let value = self.emit(then)?;
            self.release(value);
        }

        match node.children.get(2) {
            Some(otherwise) => {
                let middle = self.push(Instruction::new(Opcode::Else));
                self.program.instructions[begin].target = Some(middle + 1);
                let value = self.emit(otherwise)?;
                self.release(value);
                let end = self.push(Instruction::new(Opcode::Endif));
                self.program.instructions[middle].target = Some(end);
            }
            None => {
                let end = self.push(Instruction::new(Opcode::Endif));
                self.program.instructions[begin].target = Some(end);
            }
        }
        Ok(None)
    }

    fn emit_loop(&mut self, node: &IrNode) -> Result<Option<Value>, Error> {
        let begin = self.push(Instruction::new(Opcode::BgnLoop));
        self.loops.push(LoopPatch {
            begin,
            breaks: vec![],
        });

        for child in &node.children {
            let value = self.emit(child)?;
            self.release(value);
        }

        let mut end_loop = Instruction::new(Opcode::EndLoop);
        end_loop.target = Some(begin + 1);
        let end = self.push(end_loop);

        if let Some(frame) = self.loops.pop() {
            self.program.instructions[begin].target = Some(end + 1);
            for index in frame.breaks {
                self.program.instructions[index].target = Some(end + 1);
            }
        }
        Ok(None)
    }

    /// Copies `source` into `dest`, one register at a time for values wider
    /// than a register.
    fn emit_move(&mut self, dest: &Storage, source: &Storage) {
        if dest.size <= 4 {
            self.push(
                Instruction::new(Opcode::Mov)
                    .with_dst(DstReg {
                        file: dest.file,
                        index: dest.index,
                        writemask: dest.swizzle.writemask(),
                    })
                    .with_src(SrcReg::from_storage(source)),
            );
            return;
        }

        for register in 0..dest.register_count() {
            let size = (dest.size - register * 4).min(4);
            self.push(
                Instruction::new(Opcode::Mov)
                    .with_dst(DstReg {
                        file: dest.file,
                        index: dest.index + register,
                        writemask: WriteMask::first(size),
                    })
                    .with_src(SrcReg {
                        file: source.file,
                        index: source.index + register,
                        swizzle: Swizzle::identity(4),
                        negate: false,
                    }),
            );
        }
    }

    /// Places a literal in the constant file, reusing equal constants and
    /// packing scalars into free components.
    fn constant(&mut self, value: [f32; 4], size: u32) -> Storage {
        let same = |a: f32, b: f32| a.to_bits() == b.to_bits();

        if size == 1 {
            for (register, (used, scalars)) in self.constant_usage.iter().enumerate() {
                if !*scalars {
                    continue;
                }
                let stored = &self.program.constants[register];
                if let Some(component) = (0..*used as usize).find(|c| same(stored[*c], value[0])) {
                    return Storage::new(
                        RegisterFile::Constant,
                        register as u32,
                        1,
                        Swizzle::replicate(component as u8),
                    );
                }
            }

            if let Some(register) = self
                .constant_usage
                .iter()
                .position(|(used, scalars)| *scalars && *used < 4)
            {
                let component = self.constant_usage[register].0;
                self.program.constants[register][component as usize] = value[0];
                self.constant_usage[register].0 += 1;
                return Storage::new(
                    RegisterFile::Constant,
                    register as u32,
                    1,
                    Swizzle::replicate(component as u8),
                );
            }

            self.program.constants.push([value[0], 0.0, 0.0, 0.0]);
            self.constant_usage.push((1, true));
            return Storage::new(
                RegisterFile::Constant,
                (self.program.constants.len() - 1) as u32,
                1,
                Swizzle::replicate(0),
            );
        }

        let size = size.min(4);
        let existing = self.program.constants.iter().enumerate().position(|(register, stored)| {
            !self.constant_usage[register].1
                && (0..size as usize).all(|c| same(stored[c], value[c]))
        });
        let register = match existing {
            Some(register) => register,
            None => {
                self.program.constants.push(value);
                self.constant_usage.push((size, false));
                self.program.constants.len() - 1
            }
        };
        Storage::registers(RegisterFile::Constant, register as u32, size)
    }

    fn variable_storage(&mut self, var: VarId) -> Result<Storage, Error> {
        if let Some(storage) = self.storage.get(&var) {
            return Ok(*storage);
        }

        let symbols = self.checker.symbols;
        let variable = symbols.variable(var);
        if !variable.is_global {
            return Err(Error::new(
                ErrorImpl::VariableNotAllocated {
                    variable: variable.name.to_string(),
                },
                variable.position.clone(),
            ));
        }

        let storage = self.allocate_global(var)?;
        self.storage.insert(var, storage);
        Ok(storage)
    }

    /// Places a global outside the temporary file on first use.
    fn allocate_global(&mut self, var: VarId) -> Result<Storage, Error> {
        let symbols = self.checker.symbols;
        let variable = symbols.variable(var);
        let name = variable.name.to_string();
        let specifier = variable.type_.specifier.clone();
        let size = self.checker.sizeof_type(&specifier);

        let file = match variable.type_.qualifier {
            TypeQualifier::Uniform if specifier.is_sampler() => RegisterFile::Sampler,
            TypeQualifier::Uniform if name.starts_with("gl_") => RegisterFile::StateVariable,
            TypeQualifier::Uniform => RegisterFile::Uniform,
            TypeQualifier::Attribute | TypeQualifier::FixedInput => RegisterFile::Input,
            TypeQualifier::Varying => match self.target {
                ShaderTarget::Vertex => RegisterFile::Output,
                ShaderTarget::Fragment => RegisterFile::Input,
            },
            TypeQualifier::FixedOutput => RegisterFile::Output,
            TypeQualifier::Const => {
                let Some(value) = variable.initializer.as_ref().and_then(literal_value) else {
                    return Err(Error::new(
                        ErrorImpl::VariableNotAllocated { variable: name },
                        variable.position.clone(),
                    ));
                };
                return Ok(self.constant([value; 4], 1));
            }
            _ => {
                return Err(Error::new(
                    ErrorImpl::VariableNotAllocated { variable: name },
                    variable.position.clone(),
                ))
            }
        };

        let counter = self.next_register.entry(file).or_insert(0);
        let storage = Storage::registers(file, *counter, size);
        *counter += storage.register_count();
        log::debug!("global {} placed at {}", name, storage);

        let binding = Binding { name, storage };
        match file {
            RegisterFile::Sampler => self.program.samplers.push(binding),
            RegisterFile::Uniform | RegisterFile::StateVariable => self.program.uniforms.push(binding),
            RegisterFile::Input => self.program.inputs.push(binding),
            _ => self.program.outputs.push(binding),
        }
        Ok(storage)
    }
}

fn single_child(node: &IrNode) -> Result<&IrNode, Error> {
    node.children.first().ok_or_else(|| arity_error(1, 0))
}

fn arity_error(expected: usize, received: usize) -> Error {
    Error::new(ErrorImpl::ArgumentCountMismatch { expected, received }, None)
}
