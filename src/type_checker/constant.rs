use crate::ast::ast::{OperKind, Operation};

/// Integer value of a constant expression built from int literals.
pub fn evaluate_int(oper: &Operation) -> Option<i64> {
    match &oper.kind {
        OperKind::LiteralInt(value) => Some(*value as i64),
        OperKind::Plus => evaluate_int(oper.child(0)?),
        OperKind::Minus => evaluate_int(oper.child(0)?).map(|value| -value),
        OperKind::Add | OperKind::Subtract | OperKind::Multiply | OperKind::Divide => {
            let left = evaluate_int(oper.child(0)?)?;
            let right = evaluate_int(oper.child(1)?)?;
            match oper.kind {
                OperKind::Add => left.checked_add(right),
                OperKind::Subtract => left.checked_sub(right),
                OperKind::Multiply => left.checked_mul(right),
                _ => left.checked_div(right),
            }
        }
        _ => None,
    }
}

/// Truth value of a constant boolean condition.
pub fn evaluate_bool(oper: &Operation) -> Option<bool> {
    match &oper.kind {
        OperKind::LiteralBool(value) => Some(*value),
        OperKind::Not => evaluate_bool(oper.child(0)?).map(|value| !value),
        OperKind::LogicalAnd => Some(evaluate_bool(oper.child(0)?)? && evaluate_bool(oper.child(1)?)?),
        OperKind::LogicalOr => Some(evaluate_bool(oper.child(0)?)? || evaluate_bool(oper.child(1)?)?),
        OperKind::LogicalXor => Some(evaluate_bool(oper.child(0)?)? != evaluate_bool(oper.child(1)?)?),
        _ => None,
    }
}

/// Numeric value of a scalar literal, with booleans as 0.0 and 1.0.
pub fn literal_value(oper: &Operation) -> Option<f32> {
    match &oper.kind {
        OperKind::LiteralFloat(value) => Some(*value),
        OperKind::LiteralInt(value) => Some(*value as f32),
        OperKind::LiteralBool(value) => Some(if *value { 1.0 } else { 0.0 }),
        OperKind::Plus => literal_value(oper.child(0)?),
        OperKind::Minus => literal_value(oper.child(0)?).map(|value| -value),
        _ => None,
    }
}
