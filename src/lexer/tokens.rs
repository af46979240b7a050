use lazy_static::lazy_static;
use std::{collections::HashMap, fmt::Display};

use crate::Span;

lazy_static! {
    pub static ref RESERVED_LOOKUP: HashMap<&'static str, TokenKind> = {
        let mut map = HashMap::new();
        map.insert("attribute", TokenKind::Attribute);
        map.insert("const", TokenKind::Const);
        map.insert("uniform", TokenKind::Uniform);
        map.insert("varying", TokenKind::Varying);
        map.insert("in", TokenKind::In);
        map.insert("out", TokenKind::Out);
        map.insert("inout", TokenKind::InOut);
        map.insert("__fixed_input", TokenKind::FixedInput);
        map.insert("__fixed_output", TokenKind::FixedOutput);
        map.insert("struct", TokenKind::Struct);
        map.insert("if", TokenKind::If);
        map.insert("else", TokenKind::Else);
        map.insert("while", TokenKind::While);
        map.insert("do", TokenKind::Do);
        map.insert("for", TokenKind::For);
        map.insert("break", TokenKind::Break);
        map.insert("continue", TokenKind::Continue);
        map.insert("return", TokenKind::Return);
        map.insert("discard", TokenKind::Discard);
        map.insert("true", TokenKind::True);
        map.insert("false", TokenKind::False);
        map.insert("__asm", TokenKind::Asm);
        map.insert("__operator", TokenKind::Operator);
        map.insert("__constructor", TokenKind::Constructor);

        for name in BUILTIN_TYPE_NAMES {
            map.insert(name, TokenKind::TypeName);
        }
        map
    };
}

/// Names lexed as `TokenKind::TypeName`.
pub const BUILTIN_TYPE_NAMES: [&str; 22] = [
    "void",
    "bool",
    "bvec2",
    "bvec3",
    "bvec4",
    "int",
    "ivec2",
    "ivec3",
    "ivec4",
    "float",
    "vec2",
    "vec3",
    "vec4",
    "mat2",
    "mat3",
    "mat4",
    "sampler1D",
    "sampler2D",
    "sampler3D",
    "samplerCube",
    "sampler1DShadow",
    "sampler2DShadow",
];

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    EOF,
    IntLiteral,
    FloatLiteral,
    Identifier,
    TypeName,

    OpenBracket,
    CloseBracket,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,

    Assignment, // =
    Equals,     // ==
    Not,        // !
    NotEquals,  // !=

    Less,
    LessEquals,
    Greater,
    GreaterEquals,

    Or,  // ||
    Xor, // ^^
    And, // &&

    Dot,
    Semicolon,
    Colon,
    Question,
    Comma,

    PlusPlus,
    MinusMinus,
    PlusEquals,
    MinusEquals,
    SlashEquals,
    StarEquals,

    Plus,
    Dash,
    Slash,
    Star,

    // Reserved
    Attribute,
    Const,
    Uniform,
    Varying,
    In,
    Out,
    InOut,
    FixedInput,
    FixedOutput,
    Struct,
    If,
    Else,
    While,
    Do,
    For,
    Break,
    Continue,
    Return,
    Discard,
    True,
    False,
    Asm,
    Operator,
    Constructor,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token {{\nkind: {},\nvalue: {}}}", self.kind, self.value)
    }
}

impl Token {
    pub fn is_one_of_many(&self, tokens: &[TokenKind]) -> bool {
        tokens.contains(&self.kind)
    }

    /// True for tokens that may start a type qualifier.
    pub fn is_qualifier(&self) -> bool {
        self.is_one_of_many(&[
            TokenKind::Attribute,
            TokenKind::Const,
            TokenKind::Uniform,
            TokenKind::Varying,
            TokenKind::In,
            TokenKind::Out,
            TokenKind::InOut,
            TokenKind::FixedInput,
            TokenKind::FixedOutput,
        ])
    }
}
