use std::fmt::Display;

use crate::{
    ir::ir::PrimOp,
    storage::storage::{RegisterFile, Storage},
    type_checker::swizzle::{Swizzle, WriteMask},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    Mov,
    Add,
    Sub,
    Mul,
    Dp2,
    Dp3,
    Dp4,
    Xpd,
    Min,
    Max,
    Clamp,
    Lrp,
    Pow,
    Exp,
    Ex2,
    Lg2,
    Rsq,
    Rcp,
    Sin,
    Cos,
    Flr,
    Frc,
    Abs,
    Ddx,
    Ddy,
    I2f,
    F2i,
    Seq,
    Sne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Tex,
    Txb,
    Kil,
    Bra,
    Brz,
    Brnz,
    If,
    Else,
    Endif,
    BgnLoop,
    EndLoop,
    Brk,
    Cont,
    End,
}

impl Opcode {
    /// Instruction implementing a primitive, and whether its sources are
    /// negated.
    pub fn from_prim(op: PrimOp) -> (Opcode, bool) {
        let opcode = match op {
            PrimOp::Add => Opcode::Add,
            PrimOp::Subtract => Opcode::Sub,
            PrimOp::Multiply => Opcode::Mul,
            PrimOp::Dot2 => Opcode::Dp2,
            PrimOp::Dot3 => Opcode::Dp3,
            PrimOp::Dot4 => Opcode::Dp4,
            PrimOp::Cross => Opcode::Xpd,
            PrimOp::Lerp => Opcode::Lrp,
            PrimOp::Min => Opcode::Min,
            PrimOp::Max => Opcode::Max,
            PrimOp::Clamp => Opcode::Clamp,
            PrimOp::SetEqual => Opcode::Seq,
            PrimOp::SetNotEqual => Opcode::Sne,
            PrimOp::SetLess => Opcode::Slt,
            PrimOp::SetLessEqual => Opcode::Sle,
            PrimOp::SetGreater => Opcode::Sgt,
            PrimOp::SetGreaterEqual => Opcode::Sge,
            PrimOp::Move => Opcode::Mov,
            PrimOp::Negate => return (Opcode::Mov, true),
            PrimOp::Floor => Opcode::Flr,
            PrimOp::Fract => Opcode::Frc,
            PrimOp::Abs => Opcode::Abs,
            PrimOp::Ddx => Opcode::Ddx,
            PrimOp::Ddy => Opcode::Ddy,
            PrimOp::Power => Opcode::Pow,
            PrimOp::Exp => Opcode::Exp,
            PrimOp::Exp2 => Opcode::Ex2,
            PrimOp::Log2 => Opcode::Lg2,
            PrimOp::Rsq => Opcode::Rsq,
            PrimOp::Rcp => Opcode::Rcp,
            PrimOp::Sine => Opcode::Sin,
            PrimOp::Cosine => Opcode::Cos,
            PrimOp::Tex => Opcode::Tex,
            PrimOp::TexBias => Opcode::Txb,
            PrimOp::IntToFloat => Opcode::I2f,
            PrimOp::FloatToInt => Opcode::F2i,
        };
        (opcode, false)
    }

    /// Instructions whose `target` is a resolved instruction index.
    pub fn has_target(&self) -> bool {
        matches!(
            self,
            Opcode::Bra
                | Opcode::Brz
                | Opcode::Brnz
                | Opcode::If
                | Opcode::Else
                | Opcode::BgnLoop
                | Opcode::EndLoop
                | Opcode::Brk
                | Opcode::Cont
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Mov => "MOV",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Dp2 => "DP2",
            Opcode::Dp3 => "DP3",
            Opcode::Dp4 => "DP4",
            Opcode::Xpd => "XPD",
            Opcode::Min => "MIN",
            Opcode::Max => "MAX",
            Opcode::Clamp => "CLAMP",
            Opcode::Lrp => "LRP",
            Opcode::Pow => "POW",
            Opcode::Exp => "EXP",
            Opcode::Ex2 => "EX2",
            Opcode::Lg2 => "LG2",
            Opcode::Rsq => "RSQ",
            Opcode::Rcp => "RCP",
            Opcode::Sin => "SIN",
            Opcode::Cos => "COS",
            Opcode::Flr => "FLR",
            Opcode::Frc => "FRC",
            Opcode::Abs => "ABS",
            Opcode::Ddx => "DDX",
            Opcode::Ddy => "DDY",
            Opcode::I2f => "I2F",
            Opcode::F2i => "F2I",
            Opcode::Seq => "SEQ",
            Opcode::Sne => "SNE",
            Opcode::Slt => "SLT",
            Opcode::Sle => "SLE",
            Opcode::Sgt => "SGT",
            Opcode::Sge => "SGE",
            Opcode::Tex => "TEX",
            Opcode::Txb => "TXB",
            Opcode::Kil => "KIL",
            Opcode::Bra => "BRA",
            Opcode::Brz => "BRZ",
            Opcode::Brnz => "BRNZ",
            Opcode::If => "IF",
            Opcode::Else => "ELSE",
            Opcode::Endif => "ENDIF",
            Opcode::BgnLoop => "BGNLOOP",
            Opcode::EndLoop => "ENDLOOP",
            Opcode::Brk => "BRK",
            Opcode::Cont => "CONT",
            Opcode::End => "END",
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DstReg {
    pub file: RegisterFile,
    pub index: u32,
    pub writemask: WriteMask,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SrcReg {
    pub file: RegisterFile,
    pub index: u32,
    pub swizzle: Swizzle,
    pub negate: bool,
}

impl SrcReg {
    pub fn from_storage(storage: &Storage) -> Self {
        SrcReg {
            file: storage.file,
            index: storage.index,
            swizzle: storage.swizzle,
            negate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dst: Option<DstReg>,
    pub src: Vec<SrcReg>,
    /// Resolved instruction index for branches and structured control.
    pub target: Option<usize>,
    pub comment: Option<String>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            dst: None,
            src: vec![],
            target: None,
            comment: None,
        }
    }

    pub fn with_dst(mut self, dst: DstReg) -> Self {
        self.dst = Some(dst);
        self
    }

    pub fn with_src(mut self, src: SrcReg) -> Self {
        self.src.push(src);
        self
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.opcode)?;

        let mut operands = vec![];
        if let Some(dst) = &self.dst {
            operands.push(format!("{}[{}].{}", dst.file, dst.index, dst.writemask));
        }
        for src in &self.src {
            operands.push(format!(
                "{}{}[{}].{}",
                if src.negate { "-" } else { "" },
                src.file,
                src.index,
                src.swizzle
            ));
        }
        if !operands.is_empty() {
            write!(f, " {}", operands.join(", "))?;
        }

        if let Some(target) = self.target {
            write!(f, " ({})", target)?;
        }
        write!(f, ";")?;

        if let Some(comment) = &self.comment {
            write!(f, "  # {}", comment)?;
        }
        Ok(())
    }
}

/// A named variable and where it was placed.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub storage: Storage,
}

/// Output of one compilation.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    /// Constant file contents, one four-component register per entry.
    pub constants: Vec<[f32; 4]>,
    pub uniforms: Vec<Binding>,
    pub inputs: Vec<Binding>,
    pub outputs: Vec<Binding>,
    pub samplers: Vec<Binding>,
    /// Placement of every declared variable, in declaration order.
    pub variables: Vec<Binding>,
    /// Temporary registers the program needs.
    pub temporaries: u32,
}

impl Program {
    pub fn count(&self, opcode: Opcode) -> usize {
        self.instructions
            .iter()
            .filter(|instruction| instruction.opcode == opcode)
            .count()
    }

    pub fn variable(&self, name: &str) -> Option<&Binding> {
        self.variables.iter().find(|binding| binding.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&Binding> {
        self.outputs.iter().find(|binding| binding.name == name)
    }

    pub fn input(&self, name: &str) -> Option<&Binding> {
        self.inputs.iter().find(|binding| binding.name == name)
    }

    pub fn uniform(&self, name: &str) -> Option<&Binding> {
        self.uniforms.iter().find(|binding| binding.name == name)
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, constant) in self.constants.iter().enumerate() {
            writeln!(
                f,
                "CONST[{}] = {{ {}, {}, {}, {} }}",
                i, constant[0], constant[1], constant[2], constant[3]
            )?;
        }
        for (i, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{:4}: {}", i, instruction)?;
        }
        Ok(())
    }
}
