use std::fmt::Display;

use crate::symbols::symbols::VarId;

use super::ir::{IrNode, IrOpcode, LabelId, LabelTable};

/// Which control-flow lowering a compilation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Conditional and unconditional jumps between labels.
    #[default]
    Labels,
    /// Begin/else/end pseudo-instructions for targets with structured
    /// branching.
    Structured,
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Labels => write!(f, "labels"),
            BackendKind::Structured => write!(f, "structured"),
        }
    }
}

/// Jump targets of one loop. `cont` is where `continue` lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLabels {
    pub start: LabelId,
    pub cont: LabelId,
    pub end: LabelId,
}

impl LoopLabels {
    /// Fresh labels for a loop whose `continue` re-enters at the top.
    pub fn looping_at_start(labels: &mut LabelTable) -> Self {
        let start = labels.new_label("__loop");
        LoopLabels {
            start,
            cont: start,
            end: labels.new_label("__endloop"),
        }
    }

    /// Fresh labels for a loop with a separate continue point.
    pub fn with_continue(labels: &mut LabelTable) -> Self {
        LoopLabels {
            start: labels.new_label("__loop"),
            cont: labels.new_label("__continue"),
            end: labels.new_label("__endloop"),
        }
    }
}

/// How `return` leaves the function being lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionExit {
    pub end: LabelId,
    /// Some exit is not the last statement of the body.
    pub early: bool,
    /// Set by a structured exit from inside a loop and tested after every
    /// loop of the function.
    pub flag: Option<VarId>,
}

/// Lowering of branches and loops into IR.
///
/// Conditions and bodies arrive already lowered; the backend only decides
/// how they are stitched together. One implementation is chosen per
/// compilation and used for every function.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    fn lower_if(&self, labels: &mut LabelTable, cond: IrNode, then: IrNode, otherwise: Option<IrNode>) -> IrNode;

    fn lower_while(&self, frame: &LoopLabels, cond: IrNode, body: IrNode) -> IrNode;

    fn lower_do(&self, frame: &LoopLabels, body: IrNode, cond: IrNode) -> IrNode;

    fn lower_for(&self, frame: &LoopLabels, init: IrNode, cond: IrNode, step: IrNode, body: IrNode) -> IrNode;

    fn lower_break(&self, frame: &LoopLabels) -> IrNode;

    /// `prologue` is the code a structured `continue` must run before
    /// re-entering the loop (the step of a `for`, the test of a `do`).
    fn lower_continue(&self, frame: &LoopLabels, prologue: Option<IrNode>) -> IrNode;

    /// Wraps a lowered function body so `lower_exit` can leave it.
    fn lower_function(&self, exit: &FunctionExit, body: IrNode) -> IrNode;

    /// `return` from `loop_depth` loops deep inside the function.
    fn lower_exit(&self, exit: &FunctionExit, loop_depth: usize) -> IrNode;

    /// Kills the fragment and stops running the program.
    fn lower_discard(&self, exit: &FunctionExit, program_end: LabelId, loop_depth: usize) -> IrNode;

    /// A lowered loop of the function followed by whatever carries an exit
    /// taken inside it further out.
    fn after_loop(&self, exit: &FunctionExit, lowered: IrNode) -> IrNode;
}

pub fn create_backend(kind: BackendKind) -> Box<dyn Backend> {
    match kind {
        BackendKind::Labels => Box::new(LabelBackend),
        BackendKind::Structured => Box::new(StructuredBackend),
    }
}

fn label(id: LabelId) -> IrNode {
    IrNode::leaf(IrOpcode::Label(id))
}

fn jump(id: LabelId) -> IrNode {
    IrNode::leaf(IrOpcode::Jump(id))
}

fn cjump(id: LabelId, if_true: bool, cond: IrNode) -> IrNode {
    IrNode::new(IrOpcode::CJump { label: id, if_true }, vec![cond])
}

pub struct LabelBackend;

impl Backend for LabelBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Labels
    }

    fn lower_if(&self, labels: &mut LabelTable, cond: IrNode, then: IrNode, otherwise: Option<IrNode>) -> IrNode {
        let end = labels.new_label("__endif");
        match otherwise {
            Some(otherwise) => {
                let else_label = labels.new_label("__else");
                IrNode::seq(vec![
                    cjump(else_label, false, cond),
                    then,
                    jump(end),
                    label(else_label),
                    otherwise,
                    label(end),
                ])
            }
            None => IrNode::seq(vec![cjump(end, false, cond), then, label(end)]),
        }
    }

    fn lower_while(&self, frame: &LoopLabels, cond: IrNode, body: IrNode) -> IrNode {
        IrNode::seq(vec![
            label(frame.start),
            cjump(frame.end, false, cond),
            body,
            jump(frame.start),
            label(frame.end),
        ])
    }

    fn lower_do(&self, frame: &LoopLabels, body: IrNode, cond: IrNode) -> IrNode {
        IrNode::seq(vec![
            label(frame.start),
            body,
            label(frame.cont),
            cjump(frame.start, true, cond),
            label(frame.end),
        ])
    }

    fn lower_for(&self, frame: &LoopLabels, init: IrNode, cond: IrNode, step: IrNode, body: IrNode) -> IrNode {
        IrNode::seq(vec![
            init,
            label(frame.start),
            cjump(frame.end, false, cond),
            body,
            label(frame.cont),
            step,
            jump(frame.start),
            label(frame.end),
        ])
    }

    fn lower_break(&self, frame: &LoopLabels) -> IrNode {
        jump(frame.end)
    }

    fn lower_continue(&self, frame: &LoopLabels, _prologue: Option<IrNode>) -> IrNode {
        jump(frame.cont)
    }

    fn lower_function(&self, exit: &FunctionExit, body: IrNode) -> IrNode {
        IrNode::seq(vec![body, label(exit.end)])
    }

    fn lower_exit(&self, exit: &FunctionExit, _loop_depth: usize) -> IrNode {
        jump(exit.end)
    }

    fn lower_discard(&self, _exit: &FunctionExit, program_end: LabelId, _loop_depth: usize) -> IrNode {
        IrNode::seq(vec![IrNode::leaf(IrOpcode::Kill), jump(program_end)])
    }

    fn after_loop(&self, _exit: &FunctionExit, lowered: IrNode) -> IrNode {
        lowered
    }
}

pub struct StructuredBackend;

/// Structured `if (!cond) break;`.
pub fn exit_unless(cond: IrNode) -> IrNode {
    IrNode::new(
        IrOpcode::If,
        vec![IrNode::not(cond), IrNode::leaf(IrOpcode::Break)],
    )
}

impl StructuredBackend {
    fn body_loop(children: Vec<IrNode>) -> IrNode {
        IrNode::new(
            IrOpcode::Loop,
            children.into_iter().filter(|child| !child.is_nop()).collect(),
        )
    }
}

impl Backend for StructuredBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Structured
    }

    fn lower_if(&self, _labels: &mut LabelTable, cond: IrNode, then: IrNode, otherwise: Option<IrNode>) -> IrNode {
        let mut children = vec![cond, then];
        children.extend(otherwise);
        IrNode::new(IrOpcode::If, children)
    }

    fn lower_while(&self, _frame: &LoopLabels, cond: IrNode, body: IrNode) -> IrNode {
        StructuredBackend::body_loop(vec![exit_unless(cond), body])
    }

    fn lower_do(&self, _frame: &LoopLabels, body: IrNode, cond: IrNode) -> IrNode {
        StructuredBackend::body_loop(vec![body, exit_unless(cond)])
    }

    fn lower_for(&self, _frame: &LoopLabels, init: IrNode, cond: IrNode, step: IrNode, body: IrNode) -> IrNode {
        IrNode::seq(vec![
            init,
            StructuredBackend::body_loop(vec![exit_unless(cond), body, step]),
        ])
    }

    fn lower_break(&self, _frame: &LoopLabels) -> IrNode {
        IrNode::leaf(IrOpcode::Break)
    }

    fn lower_continue(&self, _frame: &LoopLabels, prologue: Option<IrNode>) -> IrNode {
        match prologue {
            Some(prologue) => IrNode::seq(vec![prologue, IrNode::leaf(IrOpcode::Cont)]),
            None => IrNode::leaf(IrOpcode::Cont),
        }
    }

    /// A body with early exits runs inside a loop that is left after one
    /// pass, so every exit is a `BRK`.
    fn lower_function(&self, exit: &FunctionExit, body: IrNode) -> IrNode {
        if !exit.early {
            return body;
        }

        let mut children = vec![];
        if let Some(flag) = exit.flag {
            children.push(IrNode::leaf(IrOpcode::VarDecl { var: flag, size: 1 }));
            children.push(IrNode::assign(IrNode::var(flag), IrNode::scalar(0.0)));
        }
        children.push(StructuredBackend::body_loop(vec![body, IrNode::leaf(IrOpcode::Break)]));
        IrNode::new(IrOpcode::Scope, children)
    }

    fn lower_exit(&self, exit: &FunctionExit, loop_depth: usize) -> IrNode {
        if !exit.early {
            return IrNode::nop();
        }
        match exit.flag.filter(|_| loop_depth > 0) {
            Some(flag) => IrNode::seq(vec![
                IrNode::assign(IrNode::var(flag), IrNode::scalar(1.0)),
                IrNode::leaf(IrOpcode::Break),
            ]),
            None => IrNode::leaf(IrOpcode::Break),
        }
    }

    fn lower_discard(&self, exit: &FunctionExit, _program_end: LabelId, loop_depth: usize) -> IrNode {
        IrNode::seq(vec![IrNode::leaf(IrOpcode::Kill), self.lower_exit(exit, loop_depth)])
    }

    fn after_loop(&self, exit: &FunctionExit, lowered: IrNode) -> IrNode {
        match exit.flag {
            Some(flag) => IrNode::seq(vec![
                lowered,
                IrNode::new(IrOpcode::If, vec![IrNode::var(flag), IrNode::leaf(IrOpcode::Break)]),
            ]),
            None => lowered,
        }
    }
}
