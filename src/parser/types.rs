//! Type parsing implementation.
//!
//! This module handles parsing of type specifiers and qualifiers.
//! It supports:
//!
//! - Built-in types (`float`, `vec3`, `mat4`, samplers)
//! - Struct types, named or defined in place
//! - Array types with constant sizes
//!
//! Similar to expression parsing, it uses NUD/LED handlers with
//! binding powers for parsing type specifiers.

use std::collections::HashMap;

use crate::{
    ast::types::{TypeQualifier, TypeSpecifier},
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    symbols::symbols::{Atom, StructDef, StructField},
    type_checker::constant::evaluate_int,
};

use super::{expr::parse_expr, lookups::BindingPower, parser::Parser};

/// Type alias for type null denotation handler functions.
pub type TypeNUDHandler = fn(&mut Parser) -> Result<TypeSpecifier, Error>;

/// Type alias for type left denotation handler functions.
pub type TypeLEDHandler = fn(&mut Parser, TypeSpecifier, BindingPower) -> Result<TypeSpecifier, Error>;

/// Type alias for type NUD lookup table.
pub type TypeNUDLookup = HashMap<TokenKind, TypeNUDHandler>;

/// Type alias for type LED lookup table.
pub type TypeLEDLookup = HashMap<TokenKind, TypeLEDHandler>;

/// Type alias for type binding power lookup table.
pub type TypeBPLookup = HashMap<TokenKind, BindingPower>;

/// Where a qualifier appears; each place accepts a different set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifierContext {
    Global,
    Local,
    Parameter,
}

impl QualifierContext {
    fn allows(&self, qualifier: TypeQualifier) -> bool {
        match self {
            QualifierContext::Global => !matches!(qualifier, TypeQualifier::Out | TypeQualifier::InOut),
            QualifierContext::Local => matches!(qualifier, TypeQualifier::None | TypeQualifier::Const),
            QualifierContext::Parameter => matches!(
                qualifier,
                TypeQualifier::None | TypeQualifier::Const | TypeQualifier::Out | TypeQualifier::InOut
            ),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            QualifierContext::Global => "global variables",
            QualifierContext::Local => "local variables",
            QualifierContext::Parameter => "parameters",
        }
    }
}

/// Initializes the type parsing lookup tables.
///
/// Registers NUD and LED handlers for parsing type specifiers.
///
/// # Arguments
///
/// * `parser` - Mutable reference to the parser to initialize
pub fn create_token_type_lookups(parser: &mut Parser) {
    parser.type_nud(TokenKind::TypeName, parse_builtin_type);
    parser.type_nud(TokenKind::Identifier, parse_struct_name_type);
    parser.type_nud(TokenKind::Struct, parse_struct_type);
    parser.type_led(TokenKind::OpenBracket, BindingPower::Postfix, parse_array_type);
}

/// Parses a type specifier using the type lookup tables.
///
/// # Arguments
///
/// * `parser` - Mutable reference to the parser
/// * `bp` - Current binding power for precedence handling
///
/// # Returns
///
/// The parsed type, or an error if no type starts at the current token.
pub fn parse_type(parser: &mut Parser, bp: BindingPower) -> Result<TypeSpecifier, Error> {
    let token_kind = parser.current_token_kind();
    let Some(nud) = parser.get_type_nud_lookup().get(&token_kind).copied() else {
        return Err(Error::new(
            ErrorImpl::UnknownType {
                type_: parser.current_token().value.clone(),
            },
            Some(parser.get_position()),
        ));
    };

    let mut left = nud(parser)?;

    while let Some(power) = parser
        .get_type_bp_lookup()
        .get(&parser.current_token_kind())
        .copied()
        .filter(|power| *power > bp)
    {
        let Some(led) = parser.get_type_led_lookup().get(&parser.current_token_kind()).copied() else {
            break;
        };
        left = led(parser, left, power)?;
    }

    Ok(left)
}

/// Parses an optional qualifier and checks it against `context`.
///
/// `const in` on a parameter reads as `const`.
pub fn parse_qualifier(parser: &mut Parser, context: QualifierContext) -> Result<TypeQualifier, Error> {
    let position = parser.get_position();
    let qualifier = match parser.current_token_kind() {
        TokenKind::Const => {
            parser.advance();
            if parser.current_token_kind() == TokenKind::In {
                parser.advance();
            }
            TypeQualifier::Const
        }
        TokenKind::Attribute => TypeQualifier::Attribute,
        TokenKind::Uniform => TypeQualifier::Uniform,
        TokenKind::Varying => TypeQualifier::Varying,
        TokenKind::FixedInput => TypeQualifier::FixedInput,
        TokenKind::FixedOutput => TypeQualifier::FixedOutput,
        TokenKind::Out => TypeQualifier::Out,
        TokenKind::InOut => TypeQualifier::InOut,
        TokenKind::In => TypeQualifier::None,
        _ => return Ok(TypeQualifier::None),
    };
    if qualifier != TypeQualifier::Const {
        parser.advance();
    }

    if !context.allows(qualifier) {
        return Err(Error::new(
            ErrorImpl::InvalidQualifier {
                qualifier: qualifier.to_string(),
                context: context.describe().to_string(),
            },
            Some(position),
        ));
    }
    Ok(qualifier)
}

/// Parses a built-in type name.
pub fn parse_builtin_type(parser: &mut Parser) -> Result<TypeSpecifier, Error> {
    let token = parser.advance().clone();
    TypeSpecifier::from_name(&token.value).ok_or_else(|| {
        Error::new(
            ErrorImpl::UnknownType {
                type_: token.value.clone(),
            },
            Some(token.span.start.clone()),
        )
    })
}

/// Parses a reference to a previously declared struct.
pub fn parse_struct_name_type(parser: &mut Parser) -> Result<TypeSpecifier, Error> {
    let token = parser.advance().clone();
    match parser.symbols.lookup_struct(parser.structs, &token.value) {
        Some(id) => Ok(TypeSpecifier::Struct(id)),
        None => Err(Error::new(
            ErrorImpl::UnknownType { type_: token.value },
            Some(token.span.start),
        )),
    }
}

/// Parses `struct Name { fields }` and declares the struct.
///
/// Each field line is a type followed by one or more field names, each
/// optionally with a constant array size.
pub fn parse_struct_type(parser: &mut Parser) -> Result<TypeSpecifier, Error> {
    let position = parser.expect(TokenKind::Struct)?.span.start;
    let name = parser.expect(TokenKind::Identifier)?.value;
    parser.expect(TokenKind::OpenCurly)?;

    let mut fields: Vec<StructField> = vec![];
    while parser.current_token_kind() != TokenKind::CloseCurly {
        let specifier = parse_type(parser, BindingPower::Default)?;
        loop {
            let field = parser.expect(TokenKind::Identifier)?;
            if fields.iter().any(|existing| *existing.name == *field.value) {
                return Err(Error::new(
                    ErrorImpl::VariableAlreadyDeclared { variable: field.value },
                    Some(field.span.start),
                ));
            }
            let specifier = parse_array_suffix(parser, specifier.clone())?;
            fields.push(StructField {
                name: Atom::from(field.value),
                specifier,
            });

            if parser.current_token_kind() != TokenKind::Comma {
                break;
            }
            parser.advance();
        }
        parser.expect(TokenKind::Semicolon)?;
    }
    parser.expect(TokenKind::CloseCurly)?;

    let def = StructDef {
        name: Atom::from(name),
        fields,
    };
    let id = parser
        .symbols
        .declare_struct(parser.structs, def)
        .map_err(|error| error.or_position(Some(&position)))?;
    Ok(TypeSpecifier::Struct(id))
}

/// Parses an array suffix `[size]` following a type.
pub fn parse_array_type(
    parser: &mut Parser,
    left: TypeSpecifier,
    _bp: BindingPower,
) -> Result<TypeSpecifier, Error> {
    parser.expect(TokenKind::OpenBracket)?;
    let size = parse_array_size(parser)?;
    parser.expect(TokenKind::CloseBracket)?;
    Ok(TypeSpecifier::Array(Box::new(left), size))
}

/// Wraps `specifier` in an array type when a `[size]` suffix follows.
pub fn parse_array_suffix(parser: &mut Parser, specifier: TypeSpecifier) -> Result<TypeSpecifier, Error> {
    if parser.current_token_kind() != TokenKind::OpenBracket {
        return Ok(specifier);
    }
    parse_array_type(parser, specifier, BindingPower::Postfix)
}

/// Parses the size between array brackets; it must be a positive constant.
fn parse_array_size(parser: &mut Parser) -> Result<Option<u32>, Error> {
    if parser.current_token_kind() == TokenKind::CloseBracket {
        return Ok(None);
    }

    let position = parser.get_position();
    let size = parse_expr(parser, BindingPower::Default)?;
    match evaluate_int(&size).and_then(|value| u32::try_from(value).ok()) {
        Some(value) if value > 0 => Ok(Some(value)),
        _ => Err(Error::new(ErrorImpl::NonConstantIndex, Some(position))),
    }
}
