//! Unit tests for the lexer module.
//!
//! This module contains tests for tokenization including:
//! - Keywords, qualifiers and built-in type names
//! - Numeric literals (integers and floats)
//! - Operators and punctuation
//! - Comments and preprocessor lines
//! - Error cases

use super::{lexer::tokenize, tokens::TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source, Some("test.frag".to_string()))
        .unwrap()
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn test_tokenize_keywords() {
    let tokens = kinds("attribute const uniform varying in out inout if else while do for break continue return discard");

    assert_eq!(
        tokens,
        vec![
            TokenKind::Attribute,
            TokenKind::Const,
            TokenKind::Uniform,
            TokenKind::Varying,
            TokenKind::In,
            TokenKind::Out,
            TokenKind::InOut,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::While,
            TokenKind::Do,
            TokenKind::For,
            TokenKind::Break,
            TokenKind::Continue,
            TokenKind::Return,
            TokenKind::Discard,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_type_names() {
    let tokens = tokenize("vec4 mat3 sampler2D void myType", None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::TypeName);
    assert_eq!(tokens[0].value, "vec4");
    assert_eq!(tokens[1].kind, TokenKind::TypeName);
    assert_eq!(tokens[2].kind, TokenKind::TypeName);
    assert_eq!(tokens[3].kind, TokenKind::TypeName);
    assert_eq!(tokens[4].kind, TokenKind::Identifier);
}

#[test]
fn test_tokenize_internal_keywords() {
    let tokens = kinds("__asm __operator __constructor __fixed_input __fixed_output __retVal");

    assert_eq!(tokens[0], TokenKind::Asm);
    assert_eq!(tokens[1], TokenKind::Operator);
    assert_eq!(tokens[2], TokenKind::Constructor);
    assert_eq!(tokens[3], TokenKind::FixedInput);
    assert_eq!(tokens[4], TokenKind::FixedOutput);
    assert_eq!(tokens[5], TokenKind::Identifier);
}

#[test]
fn test_tokenize_numbers() {
    let tokens = tokenize("42 3.14 1. .5 2e3 1.0f 0x1F", None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::IntLiteral);
    assert_eq!(tokens[0].value, "42");
    assert_eq!(tokens[1].kind, TokenKind::FloatLiteral);
    assert_eq!(tokens[1].value, "3.14");
    assert_eq!(tokens[2].kind, TokenKind::FloatLiteral);
    assert_eq!(tokens[2].value, "1.");
    assert_eq!(tokens[3].kind, TokenKind::FloatLiteral);
    assert_eq!(tokens[3].value, ".5");
    assert_eq!(tokens[4].kind, TokenKind::FloatLiteral);
    assert_eq!(tokens[4].value, "2e3");
    assert_eq!(tokens[5].kind, TokenKind::FloatLiteral);
    assert_eq!(tokens[5].value, "1.0");
    assert_eq!(tokens[6].kind, TokenKind::IntLiteral);
    assert_eq!(tokens[6].value, "0x1F");
    assert_eq!(tokens[7].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_operators() {
    let tokens = kinds("+ - * / = == != < <= > >= && || ^^ ! ++ -- += -= *= /= ? :");

    assert_eq!(
        tokens,
        vec![
            TokenKind::Plus,
            TokenKind::Dash,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Assignment,
            TokenKind::Equals,
            TokenKind::NotEquals,
            TokenKind::Less,
            TokenKind::LessEquals,
            TokenKind::Greater,
            TokenKind::GreaterEquals,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Xor,
            TokenKind::Not,
            TokenKind::PlusPlus,
            TokenKind::MinusMinus,
            TokenKind::PlusEquals,
            TokenKind::MinusEquals,
            TokenKind::StarEquals,
            TokenKind::SlashEquals,
            TokenKind::Question,
            TokenKind::Colon,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_swizzle_after_subscript() {
    let tokens = kinds("v[0].xy");

    assert_eq!(
        tokens,
        vec![
            TokenKind::Identifier,
            TokenKind::OpenBracket,
            TokenKind::IntLiteral,
            TokenKind::CloseBracket,
            TokenKind::Dot,
            TokenKind::Identifier,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_skips_comments_and_directives() {
    let source = "#version 110\n// line comment\nfloat /* block\ncomment */ x;";
    let tokens = kinds(source);

    assert_eq!(
        tokens,
        vec![
            TokenKind::TypeName,
            TokenKind::Identifier,
            TokenKind::Semicolon,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_positions() {
    let tokens = tokenize("float  x;", Some("pos.frag".to_string())).unwrap();

    assert_eq!(tokens[0].span.start.0, 0);
    assert_eq!(tokens[0].span.end.0, 5);
    assert_eq!(tokens[1].span.start.0, 7);
    assert_eq!(*tokens[1].span.start.1, "pos.frag");
}

#[test]
fn test_tokenize_unrecognised_character() {
    let result = tokenize("float x = 1 @ 2;", None);

    let error = result.unwrap_err();
    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.get_position().unwrap().0, 12);
}
