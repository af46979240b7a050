use crate::{
    ast::{
        ast::{OperKind, Operation},
        types::{FullySpecifiedType, TypeQualifier, TypeSpecifier},
    },
    compiler::functions::RETURN_SLOT,
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    symbols::symbols::{Atom, Function, FunctionKind, Variable},
    Position,
};

use super::{
    expr::parse_expr,
    lookups::BindingPower,
    parser::Parser,
    types::{parse_array_suffix, parse_qualifier, parse_type, QualifierContext},
};

pub fn parse_stmt(parser: &mut Parser) -> Result<Operation, Error> {
    let kind = parser.current_token_kind();

    // `vec4(...)` at the start of a statement is an expression.
    let is_constructor_call = kind == TokenKind::TypeName && parser.peek_kind(1) == TokenKind::OpenParen;
    let is_struct_declaration = kind == TokenKind::Identifier
        && parser.peek_kind(1) == TokenKind::Identifier
        && parser
            .symbols
            .lookup_struct(parser.structs, &parser.current_token().value)
            .is_some();

    if is_struct_declaration {
        return parse_declaration_stmt(parser);
    }
    if !is_constructor_call {
        if let Some(handler) = parser.get_stmt_lookup().get(&kind).copied() {
            return handler(parser);
        }
    }

    let position = parser.get_position();
    let expr = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::Semicolon)?;
    Ok(parser.operation(OperKind::Expression, vec![expr], position))
}

/// Parses `{ ... }`; the block opens its own scope.
pub fn parse_block_stmt(parser: &mut Parser) -> Result<Operation, Error> {
    let position = parser.expect(TokenKind::OpenCurly)?.span.start;
    let outer = parser.enter_scope();

    let mut statements = vec![];
    while parser.current_token_kind() != TokenKind::CloseCurly && parser.has_tokens() {
        statements.push(parse_stmt(parser)?);
    }
    parser.expect(TokenKind::CloseCurly)?;

    let block = parser.operation(OperKind::Block { new_scope: true }, statements, position);
    parser.leave_scope(outer);
    Ok(block)
}

pub fn parse_empty_stmt(parser: &mut Parser) -> Result<Operation, Error> {
    let position = parser.expect(TokenKind::Semicolon)?.span.start;
    Ok(parser.operation(OperKind::Noop, vec![], position))
}

pub fn parse_if_stmt(parser: &mut Parser) -> Result<Operation, Error> {
    let position = parser.expect(TokenKind::If)?.span.start;
    let cond = parse_condition(parser)?;
    let then = parse_stmt(parser)?;

    let otherwise = if parser.current_token_kind() == TokenKind::Else {
        parser.advance();
        parse_stmt(parser)?
    } else {
        Operation::noop(parser.scope)
    };

    Ok(parser.operation(OperKind::If, vec![cond, then, otherwise], position))
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<Operation, Error> {
    let position = parser.expect(TokenKind::While)?.span.start;
    let cond = parse_condition(parser)?;
    let body = parse_stmt(parser)?;
    Ok(parser.operation(OperKind::While, vec![cond, body], position))
}

pub fn parse_do_stmt(parser: &mut Parser) -> Result<Operation, Error> {
    let position = parser.expect(TokenKind::Do)?.span.start;
    let body = parse_stmt(parser)?;
    parser.expect(TokenKind::While)?;
    let cond = parse_condition(parser)?;
    parser.expect(TokenKind::Semicolon)?;
    Ok(parser.operation(OperKind::Do, vec![body, cond], position))
}

/// Parses `for (init; cond; step) body`.
///
/// The loop is wrapped in a block holding the scope of its init
/// declaration. A missing condition is `true`.
pub fn parse_for_stmt(parser: &mut Parser) -> Result<Operation, Error> {
    let position = parser.expect(TokenKind::For)?.span.start;
    parser.expect(TokenKind::OpenParen)?;
    let outer = parser.enter_scope();

    let init = parse_stmt(parser)?;

    let cond = if parser.current_token_kind() == TokenKind::Semicolon {
        parser.operation(OperKind::LiteralBool(true), vec![], parser.get_position())
    } else {
        parse_expr(parser, BindingPower::Default)?
    };
    parser.expect(TokenKind::Semicolon)?;

    let step = if parser.current_token_kind() == TokenKind::CloseParen {
        Operation::noop(parser.scope)
    } else {
        parse_expr(parser, BindingPower::Default)?
    };
    parser.expect(TokenKind::CloseParen)?;

    let body = parse_stmt(parser)?;
    let for_loop = parser.operation(OperKind::For, vec![init, cond, step, body], position.clone());
    let block = parser.operation(OperKind::Block { new_scope: true }, vec![for_loop], position);
    parser.leave_scope(outer);
    Ok(block)
}

/// Parses `break;`, `continue;` and `discard;`.
pub fn parse_jump_stmt(parser: &mut Parser) -> Result<Operation, Error> {
    let token = parser.advance().clone();
    let kind = match token.kind {
        TokenKind::Break => OperKind::Break,
        TokenKind::Continue => OperKind::Continue,
        _ => OperKind::Discard,
    };
    parser.expect(TokenKind::Semicolon)?;
    Ok(parser.operation(kind, vec![], token.span.start))
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<Operation, Error> {
    let position = parser.expect(TokenKind::Return)?.span.start;
    let mut children = vec![];
    if parser.current_token_kind() != TokenKind::Semicolon {
        children.push(parse_expr(parser, BindingPower::Default)?);
    }
    parser.expect(TokenKind::Semicolon)?;
    Ok(parser.operation(OperKind::Return, children, position))
}

/// Parses `__asm name dest, operand, ...;`.
pub fn parse_asm_stmt(parser: &mut Parser) -> Result<Operation, Error> {
    let position = parser.expect(TokenKind::Asm)?.span.start;
    let name = parser.expect(TokenKind::Identifier)?.value;

    let mut operands = vec![parse_expr(parser, BindingPower::Comma)?];
    while parser.current_token_kind() == TokenKind::Comma {
        parser.advance();
        operands.push(parse_expr(parser, BindingPower::Comma)?);
    }
    parser.expect(TokenKind::Semicolon)?;
    Ok(parser.operation(OperKind::Asm(Atom::from(name)), operands, position))
}

/// Parses a local declaration; every declarator becomes a `VariableDecl`.
pub fn parse_declaration_stmt(parser: &mut Parser) -> Result<Operation, Error> {
    let position = parser.get_position();
    let qualifier = parse_qualifier(parser, QualifierContext::Local)?;
    let specifier = parse_type(parser, BindingPower::Default)?;
    let mut declarations = parse_declarators(parser, qualifier, specifier, false)?;

    Ok(match declarations.len() {
        0 => parser.operation(OperKind::Noop, vec![], position),
        1 => declarations.remove(0),
        _ => parser.operation(OperKind::Block { new_scope: false }, declarations, position),
    })
}

/// Parses `name [size] [= init], ...;` after a declaration's type.
///
/// Initializers are parsed before the name is declared, so they see the
/// enclosing declaration of the same name. Globals produce no operations;
/// their initializers run in the entry point's prologue.
fn parse_declarators(
    parser: &mut Parser,
    qualifier: TypeQualifier,
    specifier: TypeSpecifier,
    is_global: bool,
) -> Result<Vec<Operation>, Error> {
    let mut declarations = vec![];
    if parser.current_token_kind() == TokenKind::Semicolon {
        parser.advance();
        return Ok(declarations);
    }

    loop {
        let name = parser.expect(TokenKind::Identifier)?;
        let specifier = parse_array_suffix(parser, specifier.clone())?;

        let initializer = if parser.current_token_kind() == TokenKind::Assignment {
            parser.advance();
            Some(parse_expr(parser, BindingPower::Comma)?)
        } else {
            None
        };
        if qualifier == TypeQualifier::Const && initializer.is_none() {
            return Err(parser.unexpected("expected initializer in constant declaration"));
        }

        let mut variable = Variable::new(
            Atom::from(name.value.as_str()),
            FullySpecifiedType::new(qualifier, specifier),
        );
        variable.initializer = initializer;
        variable.is_global = is_global;
        variable.position = Some(name.span.start.clone());
        let id = parser.declare_variable(variable)?;

        if !is_global {
            declarations.push(parser.operation(OperKind::VariableDecl(id), vec![], name.span.start));
        }

        if parser.current_token_kind() != TokenKind::Comma {
            break;
        }
        parser.advance();
    }

    parser.expect(TokenKind::Semicolon)?;
    Ok(declarations)
}

fn parse_condition(parser: &mut Parser) -> Result<Operation, Error> {
    parser.expect(TokenKind::OpenParen)?;
    let cond = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;
    Ok(cond)
}

/// Parses one global declaration or function definition.
///
/// Function names may also be `__operator` followed by the operator token,
/// or `__constructor`, which names the function after its return type.
pub fn parse_external_declaration(parser: &mut Parser) -> Result<(), Error> {
    let position = parser.get_position();
    let qualifier = parse_qualifier(parser, QualifierContext::Global)?;
    let specifier = parse_type(parser, BindingPower::Default)?;

    let function = match parser.current_token_kind() {
        TokenKind::Operator => {
            parser.advance();
            let operator = parser.advance().clone();
            if !is_overloadable(operator.kind) {
                return Err(Error::new(
                    ErrorImpl::UnexpectedTokenDetailed {
                        token: operator.value,
                        message: String::from("expected an overloadable operator"),
                    },
                    Some(operator.span.start),
                ));
            }
            Some((operator.value, FunctionKind::Operator))
        }
        TokenKind::Constructor => {
            parser.advance();
            let Some(name) = specifier.builtin_name() else {
                return Err(parser.unexpected("constructors must return a built-in type"));
            };
            Some((name.to_string(), FunctionKind::Constructor))
        }
        TokenKind::Identifier if parser.peek_kind(1) == TokenKind::OpenParen => {
            Some((parser.advance().value.clone(), FunctionKind::Ordinary))
        }
        _ => None,
    };

    let Some((name, kind)) = function else {
        if qualifier == TypeQualifier::Const && parser.current_token_kind() == TokenKind::Semicolon {
            return Err(parser.unexpected("expected a constant name"));
        }
        parse_declarators(parser, qualifier, specifier, true)?;
        return Ok(());
    };

    if qualifier != TypeQualifier::None {
        return Err(Error::new(
            ErrorImpl::InvalidQualifier {
                qualifier: qualifier.to_string(),
                context: String::from("functions"),
            },
            Some(position),
        ));
    }
    parse_function(parser, FullySpecifiedType::unqualified(specifier), name, kind, position)
}

fn is_overloadable(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Plus
            | TokenKind::Dash
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::PlusEquals
            | TokenKind::MinusEquals
            | TokenKind::StarEquals
            | TokenKind::SlashEquals
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus
    )
}

/// Parses a parameter list and an optional body, then declares the function.
///
/// Parameters live in a scope of their own directly inside the globals; a
/// non-void function gets its result slot right after the parameters. The
/// body's block scope nests in the parameter scope.
fn parse_function(
    parser: &mut Parser,
    return_type: FullySpecifiedType,
    name: String,
    kind: FunctionKind,
    position: Position,
) -> Result<(), Error> {
    parser.expect(TokenKind::OpenParen)?;
    let outer = parser.scope;
    let parameters = parser.symbols.new_scope(Some(parser.globals));
    parser.scope = parameters;

    if parser.current_token().value == "void" && parser.peek_kind(1) == TokenKind::CloseParen {
        parser.advance();
    }

    let mut param_count = 0;
    while parser.current_token_kind() != TokenKind::CloseParen {
        let param_position = parser.get_position();
        let qualifier = parse_qualifier(parser, QualifierContext::Parameter)?;
        let specifier = parse_type(parser, BindingPower::Default)?;
        let param_name = match parser.current_token_kind() {
            TokenKind::Identifier => parser.advance().value.clone(),
            _ => format!("__param{}", param_count),
        };
        let specifier = parse_array_suffix(parser, specifier)?;

        let mut variable = Variable::new(Atom::from(param_name), FullySpecifiedType::new(qualifier, specifier));
        variable.position = Some(param_position);
        parser.declare_variable(variable)?;
        param_count += 1;

        if parser.current_token_kind() != TokenKind::Comma {
            break;
        }
        parser.advance();
    }
    parser.expect(TokenKind::CloseParen)?;

    if !return_type.specifier.is_void() {
        parser.declare_variable(Variable::temporary(RETURN_SLOT, return_type.specifier.clone()))?;
    }

    let body = if parser.current_token_kind() == TokenKind::Semicolon {
        parser.advance();
        None
    } else {
        Some(parse_block_stmt(parser)?)
    };
    parser.leave_scope(outer);

    let function = Function {
        kind,
        name: Atom::from(name),
        return_type,
        parameters,
        param_count,
        body,
        position: Some(position),
    };
    parser.symbols.declare_function(parser.functions, function)?;
    Ok(())
}
