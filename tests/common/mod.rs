//! Reference register machine for emitted programs.
//!
//! Executes a `Program` the way a simple target would: four-component
//! float registers per file, swizzled and negatable sources, write-masked
//! destinations, and both jump and structured control flow.

#![allow(dead_code)]

use std::collections::HashMap;

use shadec::{
    compiler::compiler::{CompileOptions, ShaderCompiler},
    emitter::instruction::{Binding, Instruction, Opcode, Program, SrcReg},
    errors::errors::Error,
    storage::storage::{RegisterFile, Storage},
};

const STEP_LIMIT: usize = 100_000;

pub fn compile_with(source: &str, options: CompileOptions) -> Result<Program, Error> {
    let mut compiler = ShaderCompiler::new(options)?;
    compiler.compile_source(source, Some(String::from("test.glsl")))
}

pub fn compile(source: &str) -> Program {
    match compile_with(source, CompileOptions::default()) {
        Ok(program) => program,
        Err(error) => panic!("compilation failed: {:?}", error),
    }
}

pub struct Machine {
    files: HashMap<RegisterFile, Vec<[f32; 4]>>,
    pub killed: bool,
    pub steps: usize,
}

impl Machine {
    pub fn new(program: &Program) -> Self {
        let mut files = HashMap::new();
        files.insert(RegisterFile::Constant, program.constants.clone());
        files.insert(
            RegisterFile::Temporary,
            vec![[0.0; 4]; program.temporaries.max(1) as usize],
        );
        Machine {
            files,
            killed: false,
            steps: 0,
        }
    }

    /// Stores `values` into the registers of `binding`, one component after
    /// another; matrices fill column registers in order.
    pub fn set(&mut self, binding: &Binding, values: &[f32]) {
        let storage = binding.storage;
        if storage.size <= 4 {
            for (i, value) in values.iter().enumerate().take(storage.size as usize) {
                let component = storage.swizzle.component(i) as usize;
                self.register_mut(storage.file, storage.index)[component] = *value;
            }
            return;
        }

        let rows = (values.len() as f32).sqrt() as usize;
        for (i, value) in values.iter().enumerate() {
            let register = storage.index + (i / rows) as u32;
            self.register_mut(storage.file, register)[i % rows] = *value;
        }
    }

    pub fn read(&self, storage: &Storage) -> Vec<f32> {
        if storage.size <= 4 {
            let register = self.register(storage.file, storage.index);
            return (0..storage.size as usize)
                .map(|i| register[storage.swizzle.component(i) as usize])
                .collect();
        }

        let mut values = vec![];
        for register in 0..storage.register_count() {
            values.extend_from_slice(&self.register(storage.file, storage.index + register));
        }
        values
    }

    pub fn output(&self, program: &Program, name: &str) -> Vec<f32> {
        let binding = program
            .output(name)
            .unwrap_or_else(|| panic!("no output named {}", name));
        self.read(&binding.storage)
    }

    fn register(&self, file: RegisterFile, index: u32) -> [f32; 4] {
        self.files
            .get(&file)
            .and_then(|registers| registers.get(index as usize))
            .copied()
            .unwrap_or([0.0; 4])
    }

    fn register_mut(&mut self, file: RegisterFile, index: u32) -> &mut [f32; 4] {
        let registers = self.files.entry(file).or_default();
        if registers.len() <= index as usize {
            registers.resize(index as usize + 1, [0.0; 4]);
        }
        &mut registers[index as usize]
    }

    fn source(&self, src: &SrcReg) -> [f32; 4] {
        if src.file == RegisterFile::Sampler {
            return [src.index as f32; 4];
        }
        let register = self.register(src.file, src.index);
        let mut value = [0.0; 4];
        for (i, slot) in value.iter_mut().enumerate() {
            let component = register[src.swizzle.component(i) as usize];
            *slot = if src.negate { -component } else { component };
        }
        value
    }

    fn write(&mut self, instruction: &Instruction, value: [f32; 4]) {
        let Some(dst) = instruction.dst else {
            return;
        };
        let register = self.register_mut(dst.file, dst.index);
        for (component, slot) in register.iter_mut().enumerate() {
            if dst.writemask.contains(component as u8) {
                *slot = value[component];
            }
        }
    }

    /// Runs until `END`, `KIL` or the step limit.
    pub fn run(&mut self, program: &Program) {
        let mut pc = 0;
        while pc < program.instructions.len() {
            self.steps += 1;
            assert!(self.steps < STEP_LIMIT, "program did not terminate");

            let instruction = &program.instructions[pc];
            let src: Vec<[f32; 4]> = instruction.src.iter().map(|src| self.source(src)).collect();
            let target = instruction.target.unwrap_or(pc + 1);
            let mut next = pc + 1;

            match instruction.opcode {
                Opcode::End => return,
                Opcode::Kil => {
                    self.killed = true;
                    return;
                }
                Opcode::Nop | Opcode::Endif | Opcode::BgnLoop => {}
                Opcode::Bra | Opcode::Else | Opcode::EndLoop | Opcode::Brk | Opcode::Cont => next = target,
                Opcode::Brz | Opcode::If => {
                    if src[0][0] == 0.0 {
                        next = target;
                    }
                }
                Opcode::Brnz => {
                    if src[0][0] != 0.0 {
                        next = target;
                    }
                }
                opcode => {
                    let value = evaluate(opcode, &src);
                    self.write(instruction, value);
                }
            }
            pc = next;
        }
    }
}

fn componentwise(a: [f32; 4], f: impl Fn(f32) -> f32) -> [f32; 4] {
    [f(a[0]), f(a[1]), f(a[2]), f(a[3])]
}

fn zip(a: [f32; 4], b: [f32; 4], f: impl Fn(f32, f32) -> f32) -> [f32; 4] {
    [f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])]
}

fn set(a: [f32; 4], b: [f32; 4], f: impl Fn(f32, f32) -> bool) -> [f32; 4] {
    zip(a, b, |x, y| if f(x, y) { 1.0 } else { 0.0 })
}

fn dot(a: [f32; 4], b: [f32; 4], count: usize) -> [f32; 4] {
    [(0..count).map(|i| a[i] * b[i]).sum(); 4]
}

/// Texture lookups return the coordinate with `1 + bias` in `w`.
fn sample(coord: [f32; 4], bias: f32) -> [f32; 4] {
    [coord[0], coord[1], coord[2], 1.0 + bias]
}

fn evaluate(opcode: Opcode, src: &[[f32; 4]]) -> [f32; 4] {
    let a = src.first().copied().unwrap_or([0.0; 4]);
    let b = src.get(1).copied().unwrap_or([0.0; 4]);
    let c = src.get(2).copied().unwrap_or([0.0; 4]);

    match opcode {
        Opcode::Mov | Opcode::I2f => a,
        Opcode::F2i => componentwise(a, f32::trunc),
        Opcode::Add => zip(a, b, |x, y| x + y),
        Opcode::Sub => zip(a, b, |x, y| x - y),
        Opcode::Mul => zip(a, b, |x, y| x * y),
        Opcode::Min => zip(a, b, f32::min),
        Opcode::Max => zip(a, b, f32::max),
        Opcode::Clamp => zip(zip(a, b, f32::max), c, f32::min),
        Opcode::Lrp => [0, 1, 2, 3].map(|i| a[i] * b[i] + (1.0 - a[i]) * c[i]),
        Opcode::Dp2 => dot(a, b, 2),
        Opcode::Dp3 => dot(a, b, 3),
        Opcode::Dp4 => dot(a, b, 4),
        Opcode::Xpd => [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
            1.0,
        ],
        Opcode::Pow => [a[0].powf(b[0]); 4],
        Opcode::Exp | Opcode::Ex2 => [a[0].exp2(); 4],
        Opcode::Lg2 => [a[0].log2(); 4],
        Opcode::Rsq => [1.0 / a[0].abs().sqrt(); 4],
        Opcode::Rcp => [1.0 / a[0]; 4],
        Opcode::Sin => [a[0].sin(); 4],
        Opcode::Cos => [a[0].cos(); 4],
        Opcode::Flr => componentwise(a, f32::floor),
        Opcode::Frc => componentwise(a, |x| x - x.floor()),
        Opcode::Abs => componentwise(a, f32::abs),
        Opcode::Ddx | Opcode::Ddy => [0.0; 4],
        Opcode::Seq => set(a, b, |x, y| x == y),
        Opcode::Sne => set(a, b, |x, y| x != y),
        Opcode::Slt => set(a, b, |x, y| x < y),
        Opcode::Sle => set(a, b, |x, y| x <= y),
        Opcode::Sgt => set(a, b, |x, y| x > y),
        Opcode::Sge => set(a, b, |x, y| x >= y),
        Opcode::Tex => sample(b, 0.0),
        Opcode::Txb => sample(b, b[3]),
        other => panic!("{} is not an arithmetic instruction", other),
    }
}

/// Compiles and runs a fragment shader with zeroed inputs, returning
/// `gl_FragColor`.
pub fn frag_color(source: &str) -> Vec<f32> {
    let program = compile(source);
    let mut machine = Machine::new(&program);
    machine.run(&program);
    machine.output(&program, "gl_FragColor")
}

pub fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-4, "{:?} vs {:?}", actual, expected);
    }
}
