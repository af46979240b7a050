use std::{collections::HashMap, fmt::Display};

use lazy_static::lazy_static;

use crate::{symbols::symbols::VarId, type_checker::swizzle::Swizzle};

lazy_static! {
    /// Instruction names usable in `__asm` statements.
    pub static ref ASM_LOOKUP: HashMap<&'static str, PrimOp> = {
        let mut map = HashMap::new();
        map.insert("vec4_add", PrimOp::Add);
        map.insert("vec4_subtract", PrimOp::Subtract);
        map.insert("vec4_multiply", PrimOp::Multiply);
        map.insert("vec2_dot", PrimOp::Dot2);
        map.insert("vec3_dot", PrimOp::Dot3);
        map.insert("vec4_dot", PrimOp::Dot4);
        map.insert("vec4_cross", PrimOp::Cross);
        map.insert("vec4_lrp", PrimOp::Lerp);
        map.insert("vec4_min", PrimOp::Min);
        map.insert("vec4_max", PrimOp::Max);
        map.insert("vec4_clamp", PrimOp::Clamp);
        map.insert("vec4_seq", PrimOp::SetEqual);
        map.insert("vec4_sne", PrimOp::SetNotEqual);
        map.insert("vec4_slt", PrimOp::SetLess);
        map.insert("vec4_sle", PrimOp::SetLessEqual);
        map.insert("vec4_sgt", PrimOp::SetGreater);
        map.insert("vec4_sge", PrimOp::SetGreaterEqual);
        map.insert("vec4_move", PrimOp::Move);
        map.insert("vec4_floor", PrimOp::Floor);
        map.insert("vec4_frac", PrimOp::Fract);
        map.insert("vec4_abs", PrimOp::Abs);
        map.insert("vec4_negate", PrimOp::Negate);
        map.insert("vec4_ddx", PrimOp::Ddx);
        map.insert("vec4_ddy", PrimOp::Ddy);
        map.insert("float_power", PrimOp::Power);
        map.insert("float_exp", PrimOp::Exp);
        map.insert("float_exp2", PrimOp::Exp2);
        map.insert("float_log2", PrimOp::Log2);
        map.insert("float_rsq", PrimOp::Rsq);
        map.insert("float_rcp", PrimOp::Rcp);
        map.insert("float_sine", PrimOp::Sine);
        map.insert("float_cosine", PrimOp::Cosine);
        map.insert("vec4_tex", PrimOp::Tex);
        map.insert("vec4_texb", PrimOp::TexBias);
        map.insert("ivec4_to_vec4", PrimOp::IntToFloat);
        map.insert("vec4_to_ivec4", PrimOp::FloatToInt);
        map
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(pub u32);

/// Named jump targets of one compilation. Labels are numbered in creation
/// order so their names are unique.
#[derive(Debug, Default)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    pub fn new() -> Self {
        LabelTable::default()
    }

    pub fn new_label(&mut self, name: &str) -> LabelId {
        let id = LabelId(self.names.len() as u32);
        let name = format!("{}_{}", name, id.0);
        log::debug!("new label {}", name);
        self.names.push(name);
        id
    }

    pub fn name(&self, id: LabelId) -> &str {
        self.names
            .get(id.0 as usize)
            .map(|name| name.as_str())
            .unwrap_or("?")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Primitive instruction an `__asm` statement names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimOp {
    Add,
    Subtract,
    Multiply,
    Dot2,
    Dot3,
    Dot4,
    Cross,
    Lerp,
    Min,
    Max,
    Clamp,
    SetEqual,
    SetNotEqual,
    SetLess,
    SetLessEqual,
    SetGreater,
    SetGreaterEqual,
    Move,
    Floor,
    Fract,
    Abs,
    Negate,
    Ddx,
    Ddy,
    Power,
    Exp,
    Exp2,
    Log2,
    Rsq,
    Rcp,
    Sine,
    Cosine,
    Tex,
    TexBias,
    IntToFloat,
    FloatToInt,
}

impl PrimOp {
    pub fn from_name(name: &str) -> Option<PrimOp> {
        ASM_LOOKUP.get(name).copied()
    }

    /// Number of source operands.
    pub fn operand_count(&self) -> usize {
        match self {
            PrimOp::Lerp | PrimOp::Clamp => 3,
            PrimOp::Add
            | PrimOp::Subtract
            | PrimOp::Multiply
            | PrimOp::Dot2
            | PrimOp::Dot3
            | PrimOp::Dot4
            | PrimOp::Cross
            | PrimOp::Min
            | PrimOp::Max
            | PrimOp::SetEqual
            | PrimOp::SetNotEqual
            | PrimOp::SetLess
            | PrimOp::SetLessEqual
            | PrimOp::SetGreater
            | PrimOp::SetGreaterEqual
            | PrimOp::Power
            | PrimOp::Tex
            | PrimOp::TexBias => 2,
            _ => 1,
        }
    }

    /// Size of the result given the size of the widest operand.
    pub fn result_size(&self, operand_size: u32) -> u32 {
        match self {
            PrimOp::Dot2
            | PrimOp::Dot3
            | PrimOp::Dot4
            | PrimOp::Power
            | PrimOp::Exp
            | PrimOp::Exp2
            | PrimOp::Log2
            | PrimOp::Rsq
            | PrimOp::Rcp
            | PrimOp::Sine
            | PrimOp::Cosine => 1,
            PrimOp::Cross => 3,
            PrimOp::Tex | PrimOp::TexBias => 4,
            _ => operand_size.max(1),
        }
    }
}

/// Operation of an IR node. Child layout is fixed per opcode:
///
/// * `Move`: destination, source
/// * `If`: condition, then, optional else
/// * `CJump`: condition
/// * `Swizzle`/`Field`: the selected value
/// * `Prim`: the operands in order
/// * `Seq`/`Scope`/`Loop`: the statements in order
#[derive(Debug, Clone, PartialEq)]
pub enum IrOpcode {
    /// Statements in order; the value of the last child is the result.
    Seq,
    /// Statements evaluated in a fresh allocation scope.
    Scope,
    Nop,
    Label(LabelId),
    Jump(LabelId),
    /// Jump when the condition's first component is non-zero (`if_true`)
    /// or zero.
    CJump { label: LabelId, if_true: bool },
    If,
    Loop,
    Break,
    Cont,
    Move,
    VarDecl { var: VarId, size: u32 },
    Var(VarId),
    Float { value: [f32; 4], size: u32 },
    Swizzle(Swizzle),
    /// Sub-location `offset` components into a larger value.
    Field { offset: u32, size: u32 },
    Kill,
    Prim { op: PrimOp, size: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrNode {
    pub opcode: IrOpcode,
    pub children: Vec<IrNode>,
}

impl IrNode {
    pub fn new(opcode: IrOpcode, children: Vec<IrNode>) -> Self {
        IrNode { opcode, children }
    }

    pub fn leaf(opcode: IrOpcode) -> Self {
        IrNode::new(opcode, vec![])
    }

    pub fn nop() -> Self {
        IrNode::leaf(IrOpcode::Nop)
    }

    pub fn is_nop(&self) -> bool {
        matches!(self.opcode, IrOpcode::Nop)
    }

    /// Sequence of `children`, dropping no-ops.
    pub fn seq(children: Vec<IrNode>) -> Self {
        let mut children: Vec<IrNode> = children.into_iter().filter(|child| !child.is_nop()).collect();
        match children.len() {
            0 => IrNode::nop(),
            1 => children.remove(0),
            _ => IrNode::new(IrOpcode::Seq, children),
        }
    }

    pub fn assign(dest: IrNode, source: IrNode) -> Self {
        IrNode::new(IrOpcode::Move, vec![dest, source])
    }

    pub fn var(id: VarId) -> Self {
        IrNode::leaf(IrOpcode::Var(id))
    }

    pub fn scalar(value: f32) -> Self {
        IrNode::leaf(IrOpcode::Float {
            value: [value, value, value, value],
            size: 1,
        })
    }

    pub fn swizzle(swizzle: Swizzle, value: IrNode) -> Self {
        IrNode::new(IrOpcode::Swizzle(swizzle), vec![value])
    }

    pub fn prim(op: PrimOp, size: u32, operands: Vec<IrNode>) -> Self {
        IrNode::new(IrOpcode::Prim { op, size }, operands)
    }

    /// `1.0` where the scalar `value` is zero, `0.0` elsewhere.
    pub fn not(value: IrNode) -> Self {
        IrNode::prim(PrimOp::SetEqual, 1, vec![value, IrNode::scalar(0.0)])
    }

    /// Number of nodes in the tree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(|child| child.count()).sum::<usize>()
    }
}

impl Display for IrNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.opcode)?;
        if !self.children.is_empty() {
            write!(f, "(")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
