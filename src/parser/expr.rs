use crate::{
    ast::ast::{OperKind, Operation},
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    symbols::symbols::Atom,
};

use super::{lookups::BindingPower, parser::Parser};

pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<Operation, Error> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let Some(nud) = parser.get_nud_lookup().get(&token_kind).copied() else {
        return Err(Error::new(
            ErrorImpl::UnexpectedToken {
                token: parser.current_token().value.clone(),
            },
            Some(parser.get_position()),
        ));
    };

    let mut left = nud(parser)?;

    // While LED and current BP is less than BP of current token, continue parsing lhs
    loop {
        let token_kind = parser.current_token_kind();
        let power = parser
            .get_bp_lookup()
            .get(&token_kind)
            .copied()
            .unwrap_or(BindingPower::Default);
        if power <= bp {
            break;
        }

        let Some(led) = parser.get_led_lookup().get(&token_kind).copied() else {
            return Err(parser.unexpected("expected an operator"));
        };
        left = led(parser, left, power)?;
    }

    Ok(left)
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<Operation, Error> {
    let token = parser.advance().clone();
    let position = token.span.start.clone();
    let number_error = || {
        Error::new(
            ErrorImpl::NumberParseError {
                token: token.value.clone(),
            },
            Some(token.span.start.clone()),
        )
    };

    let kind = match token.kind {
        TokenKind::IntLiteral => OperKind::LiteralInt(parse_int(&token.value).ok_or_else(number_error)?),
        TokenKind::FloatLiteral => OperKind::LiteralFloat(token.value.parse().map_err(|_| number_error())?),
        TokenKind::True => OperKind::LiteralBool(true),
        TokenKind::False => OperKind::LiteralBool(false),
        _ => {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken { token: token.value },
                Some(position),
            ))
        }
    };
    Ok(parser.operation(kind, vec![], position))
}

fn parse_int(text: &str) -> Option<i32> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok().map(|value| value as i32),
        None => text.parse().ok(),
    }
}

/// Parses a variable reference or a call.
///
/// Variables resolve here, against the scopes open at this point, so a
/// later declaration in an inner scope cannot capture the name.
pub fn parse_identifier_expr(parser: &mut Parser) -> Result<Operation, Error> {
    let token = parser.advance().clone();
    let position = token.span.start.clone();

    if parser.current_token_kind() == TokenKind::OpenParen {
        let arguments = parse_arguments(parser)?;
        return Ok(parser.operation(OperKind::Call(Atom::from(token.value)), arguments, position));
    }

    match parser.symbols.lookup_variable(parser.scope, &token.value) {
        Some(id) => Ok(parser.operation(OperKind::VariableRef(id), vec![], position)),
        None => Err(Error::new(
            ErrorImpl::VariableNotDeclared { variable: token.value },
            Some(position),
        )),
    }
}

/// Parses a constructor call such as `vec4(1.0)`.
pub fn parse_constructor_expr(parser: &mut Parser) -> Result<Operation, Error> {
    let token = parser.advance().clone();
    if parser.current_token_kind() != TokenKind::OpenParen {
        return Err(parser.unexpected("expected a constructor call"));
    }
    let arguments = parse_arguments(parser)?;
    Ok(parser.operation(OperKind::Call(Atom::from(token.value)), arguments, token.span.start))
}

/// Parses a parenthesised, comma separated argument list.
pub fn parse_arguments(parser: &mut Parser) -> Result<Vec<Operation>, Error> {
    parser.expect(TokenKind::OpenParen)?;
    let mut arguments = vec![];

    // `f(void)` is an empty list.
    if parser.current_token().value == "void" && parser.peek_kind(1) == TokenKind::CloseParen {
        parser.advance();
    }

    while parser.current_token_kind() != TokenKind::CloseParen {
        arguments.push(parse_expr(parser, BindingPower::Comma)?);
        if parser.current_token_kind() != TokenKind::Comma {
            break;
        }
        parser.advance();
    }
    parser.expect(TokenKind::CloseParen)?;
    Ok(arguments)
}

pub fn parse_grouping_expr(parser: &mut Parser) -> Result<Operation, Error> {
    parser.expect(TokenKind::OpenParen)?;
    let expr = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;
    Ok(expr)
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<Operation, Error> {
    let operator = parser.advance().clone();
    let operand = parse_expr(parser, BindingPower::Unary)?;
    let position = operator.span.start;

    let kind = match operator.kind {
        TokenKind::Dash => {
            // Negative literals fold so they stay constant expressions.
            match operand.kind {
                OperKind::LiteralFloat(value) => {
                    return Ok(parser.operation(OperKind::LiteralFloat(-value), vec![], position))
                }
                OperKind::LiteralInt(value) => {
                    return Ok(parser.operation(OperKind::LiteralInt(value.wrapping_neg()), vec![], position))
                }
                _ => OperKind::Minus,
            }
        }
        TokenKind::Plus => OperKind::Plus,
        TokenKind::Not => OperKind::Not,
        TokenKind::PlusPlus => OperKind::PreIncrement,
        TokenKind::MinusMinus => OperKind::PreDecrement,
        _ => {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken { token: operator.value },
                Some(position),
            ))
        }
    };
    Ok(parser.operation(kind, vec![operand], position))
}

pub fn parse_binary_expr(parser: &mut Parser, left: Operation, bp: BindingPower) -> Result<Operation, Error> {
    let operator = parser.advance().clone();
    let right = parse_expr(parser, bp)?;

    let kind = match operator.kind {
        TokenKind::Or => OperKind::LogicalOr,
        TokenKind::Xor => OperKind::LogicalXor,
        TokenKind::And => OperKind::LogicalAnd,
        TokenKind::Equals => OperKind::Equal,
        TokenKind::NotEquals => OperKind::NotEqual,
        TokenKind::Less => OperKind::Less,
        TokenKind::LessEquals => OperKind::LessEqual,
        TokenKind::Greater => OperKind::Greater,
        TokenKind::GreaterEquals => OperKind::GreaterEqual,
        TokenKind::Plus => OperKind::Add,
        TokenKind::Dash => OperKind::Subtract,
        TokenKind::Star => OperKind::Multiply,
        TokenKind::Slash => OperKind::Divide,
        _ => {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken { token: operator.value },
                Some(operator.span.start),
            ))
        }
    };
    Ok(parser.operation(kind, vec![left, right], operator.span.start))
}

/// Parses an assignment; assignments group to the right.
pub fn parse_assignment_expr(parser: &mut Parser, left: Operation, _bp: BindingPower) -> Result<Operation, Error> {
    let operator = parser.advance().clone();
    let right = parse_expr(parser, BindingPower::Comma)?;

    let kind = match operator.kind {
        TokenKind::PlusEquals => OperKind::AddAssign,
        TokenKind::MinusEquals => OperKind::SubAssign,
        TokenKind::StarEquals => OperKind::MulAssign,
        TokenKind::SlashEquals => OperKind::DivAssign,
        _ => OperKind::Assign,
    };
    Ok(parser.operation(kind, vec![left, right], operator.span.start))
}

pub fn parse_ternary_expr(parser: &mut Parser, cond: Operation, _bp: BindingPower) -> Result<Operation, Error> {
    let position = parser.advance().span.start.clone();
    let if_true = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::Colon)?;
    let if_false = parse_expr(parser, BindingPower::Assignment)?;
    Ok(parser.operation(OperKind::Select, vec![cond, if_true, if_false], position))
}

pub fn parse_sequence_expr(parser: &mut Parser, left: Operation, bp: BindingPower) -> Result<Operation, Error> {
    let position = parser.advance().span.start.clone();
    let right = parse_expr(parser, bp)?;

    let mut children = match left.kind {
        OperKind::Sequence => left.children,
        _ => vec![left],
    };
    children.push(right);
    Ok(parser.operation(OperKind::Sequence, children, position))
}

pub fn parse_subscript_expr(parser: &mut Parser, left: Operation, _bp: BindingPower) -> Result<Operation, Error> {
    let position = parser.advance().span.start.clone();
    let index = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseBracket)?;
    Ok(parser.operation(OperKind::Subscript, vec![left, index], position))
}

pub fn parse_member_expr(parser: &mut Parser, left: Operation, _bp: BindingPower) -> Result<Operation, Error> {
    parser.expect(TokenKind::Dot)?;
    let member = parser.expect(TokenKind::Identifier)?;
    Ok(parser.operation(OperKind::Field(Atom::from(member.value)), vec![left], member.span.start))
}

pub fn parse_postfix_expr(parser: &mut Parser, left: Operation, _bp: BindingPower) -> Result<Operation, Error> {
    let operator = parser.advance().clone();
    let kind = match operator.kind {
        TokenKind::PlusPlus => OperKind::PostIncrement,
        _ => OperKind::PostDecrement,
    };
    Ok(parser.operation(kind, vec![left], operator.span.start))
}
