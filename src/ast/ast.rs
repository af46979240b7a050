use crate::{
    symbols::symbols::{Atom, FunScopeId, ScopeId, StructScopeId, Symbols, VarId},
    Position,
};

/// Kind of an operation node together with its kind-specific payload.
///
/// Child layout is fixed per kind:
///
/// * `If`: condition, then, else (a `Noop` when absent)
/// * `While`: condition, body
/// * `Do`: body, condition
/// * `For`: init, condition, step, body
/// * `Subscript`: base, index
/// * `Field`: base
/// * binary operators and assignments: left, right
/// * `Select`: condition, if-true, if-false
/// * `VariableDecl`: optional initializer
/// * `Return`: optional value
/// * `Call`/`Asm`: the arguments or operands in order
#[derive(Debug, Clone, PartialEq)]
pub enum OperKind {
    Noop,
    /// Statement list; `new_scope` marks a block that opens its own scope.
    Block { new_scope: bool },
    VariableDecl(VarId),
    /// Low-level instruction marker, operands as children.
    Asm(Atom),
    Break,
    Continue,
    Discard,
    Return,
    Expression,
    If,
    While,
    Do,
    For,
    LiteralFloat(f32),
    LiteralInt(i32),
    LiteralBool(bool),
    Identifier(Atom),
    /// Evaluates every child in order, the value of the last one is the result.
    Sequence,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    Select,
    LogicalOr,
    LogicalXor,
    LogicalAnd,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Plus,
    Minus,
    Not,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
    Subscript,
    Call(Atom),
    Field(Atom),
    /// Direct reference to a variable, bypassing name lookup.
    VariableRef(VarId),
}

impl OperKind {
    /// Name of the operator function a kind is lowered through, if any.
    pub fn operator_function(&self) -> Option<&'static str> {
        let name = match self {
            OperKind::Add => "+",
            OperKind::Subtract => "-",
            OperKind::Multiply => "*",
            OperKind::Divide => "/",
            OperKind::Minus => "-",
            OperKind::AddAssign => "+=",
            OperKind::SubAssign => "-=",
            OperKind::MulAssign => "*=",
            OperKind::DivAssign => "/=",
            OperKind::PreIncrement => "++",
            OperKind::PreDecrement => "--",
            OperKind::PostIncrement => "__postIncr",
            OperKind::PostDecrement => "__postDecr",
            _ => return None,
        };
        Some(name)
    }
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OperKind,
    pub children: Vec<Operation>,
    /// Variable scope that names inside this node resolve against.
    pub locals: ScopeId,
    pub position: Option<Position>,
}

impl Operation {
    pub fn new(kind: OperKind, children: Vec<Operation>, locals: ScopeId) -> Self {
        Operation {
            kind,
            children,
            locals,
            position: None,
        }
    }

    pub fn leaf(kind: OperKind, locals: ScopeId) -> Self {
        Operation::new(kind, vec![], locals)
    }

    pub fn with_position(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }

    pub fn noop(locals: ScopeId) -> Self {
        Operation::leaf(OperKind::Noop, locals)
    }

    pub fn child(&self, index: usize) -> Option<&Operation> {
        self.children.get(index)
    }

    pub fn is_noop(&self) -> bool {
        matches!(self.kind, OperKind::Noop)
    }

    /// Name carried by identifiers, calls, fields and asm markers.
    pub fn atom(&self) -> Option<&Atom> {
        match &self.kind {
            OperKind::Identifier(name)
            | OperKind::Call(name)
            | OperKind::Field(name)
            | OperKind::Asm(name) => Some(name),
            _ => None,
        }
    }
}

/// Root of a parsed translation unit.
///
/// Owns the unit's symbol tables; the three scope handles are the unit's
/// global variable, function and struct scopes.
#[derive(Debug)]
pub struct TranslationUnit {
    pub symbols: Symbols,
    pub globals: ScopeId,
    pub functions: FunScopeId,
    pub structs: StructScopeId,
}
