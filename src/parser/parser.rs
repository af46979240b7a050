//! Parser implementation for building the operation tree.
//!
//! This module contains the main Parser struct and parsing functions.
//! The parser uses a Pratt parser approach with NUD/LED handlers for
//! expression parsing and specialized functions for statement parsing.
//!
//! It maintains lookup tables for:
//! - Statement handlers
//! - NUD (null denotation) handlers for prefix expressions
//! - LED (left denotation) handlers for infix expressions
//! - Binding powers for operator precedence
//! - Type parsing handlers
//!
//! Declarations are entered into the unit's symbol tables as they are
//! parsed, so names resolve against the scopes visible at that point.

use std::{collections::HashMap, rc::Rc};

use crate::{
    ast::ast::{OperKind, Operation, TranslationUnit},
    compiler::stdlib::Builtins,
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{Token, TokenKind},
    symbols::symbols::{FunScopeId, ScopeId, StructScopeId, Symbols, Variable, VarId},
    Position, Span,
};

use super::{
    lookups::{
        create_token_lookups, BPLookup, BindingPower, LEDHandler, LEDLookup, NUDHandler, NUDLookup,
        StmtHandler, StmtLookup,
    },
    stmt::parse_external_declaration,
    types::{
        create_token_type_lookups, TypeBPLookup, TypeLEDHandler, TypeLEDLookup, TypeNUDHandler,
        TypeNUDLookup,
    },
};

/// The main parser structure that maintains parsing state.
///
/// Besides the token stream and the lookup tables, the parser owns the
/// symbol tables of the unit being built and tracks the innermost variable
/// scope that new declarations go into.
pub struct Parser {
    /// The list of tokens to parse
    tokens: Vec<Token>,
    /// Current position in the token stream
    pos: usize,
    /// Lookup table for statement parsing handlers
    stmt_lookup: StmtLookup,
    /// Lookup table for null denotation (prefix) expression handlers
    nud_lookup: NUDLookup,
    /// Lookup table for left denotation (infix) expression handlers
    led_lookup: LEDLookup,
    /// Lookup table for expression binding powers (precedence)
    binding_power_lookup: BPLookup,
    /// Lookup table for type null denotation handlers
    type_nud_lookup: TypeNUDLookup,
    /// Lookup table for type left denotation handlers
    type_led_lookup: TypeLEDLookup,
    /// Lookup table for type binding powers
    type_binding_power_lookup: TypeBPLookup,
    /// Symbol tables of the unit
    pub symbols: Symbols,
    /// Innermost variable scope
    pub scope: ScopeId,
    pub globals: ScopeId,
    pub functions: FunScopeId,
    pub structs: StructScopeId,
}

impl Parser {
    /// Creates a new Parser instance.
    ///
    /// # Arguments
    ///
    /// * `tokens` - Vector of tokens to parse
    /// * `file` - Reference-counted string containing the source file name
    /// * `builtins` - Library whose scopes enclose the unit's own, if any
    ///
    /// # Returns
    ///
    /// A new Parser instance positioned in the unit's global scope.
    pub fn new(mut tokens: Vec<Token>, file: Rc<String>, builtins: Option<&Builtins>) -> Self {
        if tokens.last().map(|token| token.kind) != Some(TokenKind::EOF) {
            let end = Position(0, Rc::clone(&file));
            tokens.push(Token {
                kind: TokenKind::EOF,
                value: String::from("EOF"),
                span: Span {
                    start: end.clone(),
                    end,
                },
            });
        }

        let mut symbols = match builtins {
            Some(builtins) => builtins.symbols(),
            None => Symbols::new(),
        };
        let globals = symbols.new_scope(builtins.map(|builtins| builtins.globals));
        let functions = symbols.new_function_scope(builtins.map(|builtins| builtins.functions));
        let structs = symbols.new_struct_scope(builtins.map(|builtins| builtins.structs));

        Parser {
            tokens,
            pos: 0,
            stmt_lookup: HashMap::new(),
            nud_lookup: HashMap::new(),
            led_lookup: HashMap::new(),
            binding_power_lookup: HashMap::new(),
            type_nud_lookup: HashMap::new(),
            type_led_lookup: HashMap::new(),
            type_binding_power_lookup: HashMap::new(),
            symbols,
            scope: globals,
            globals,
            functions,
            structs,
        }
    }

    /// Returns the current token without advancing.
    pub fn current_token(&self) -> &Token {
        self.peek(0)
    }

    /// Returns the kind of the current token.
    pub fn current_token_kind(&self) -> TokenKind {
        self.current_token().kind
    }

    /// Returns the token `offset` places ahead, clamped to the final EOF.
    pub fn peek(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    pub fn peek_kind(&self, offset: usize) -> TokenKind {
        self.peek(offset).kind
    }

    /// Advances to the next token and returns the previous token.
    pub fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[index]
    }

    /// Expects a token of the specified kind, with optional custom error.
    ///
    /// # Arguments
    ///
    /// * `expected_kind` - The expected TokenKind
    /// * `error` - Optional custom error to return if expectation fails
    ///
    /// # Returns
    ///
    /// Returns Ok(Token) if the current token matches, otherwise returns an Error.
    pub fn expect_error(&mut self, expected_kind: TokenKind, error: Option<Error>) -> Result<Token, Error> {
        let token = self.current_token();
        if token.kind != expected_kind {
            return Err(error.unwrap_or_else(|| {
                Error::new(
                    ErrorImpl::UnexpectedToken {
                        token: token.value.clone(),
                    },
                    Some(token.span.start.clone()),
                )
            }));
        }
        Ok(self.advance().clone())
    }

    /// Expects a token of the specified kind with default error message.
    pub fn expect(&mut self, expected_kind: TokenKind) -> Result<Token, Error> {
        self.expect_error(expected_kind, None)
    }

    /// Checks if there are more tokens to parse.
    pub fn has_tokens(&self) -> bool {
        self.current_token_kind() != TokenKind::EOF
    }

    /// Error for an unexpected current token.
    pub fn unexpected(&self, message: &str) -> Error {
        Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: self.current_token().value.clone(),
                message: message.to_string(),
            },
            Some(self.get_position()),
        )
    }

    /// Returns a reference to the statement lookup table.
    pub fn get_stmt_lookup(&self) -> &StmtLookup {
        &self.stmt_lookup
    }

    /// Returns a reference to the NUD (null denotation) lookup table.
    pub fn get_nud_lookup(&self) -> &NUDLookup {
        &self.nud_lookup
    }

    /// Returns a reference to the LED (left denotation) lookup table.
    pub fn get_led_lookup(&self) -> &LEDLookup {
        &self.led_lookup
    }

    /// Returns a reference to the binding power lookup table.
    pub fn get_bp_lookup(&self) -> &BPLookup {
        &self.binding_power_lookup
    }

    /// Returns a reference to the type binding power lookup table.
    pub fn get_type_bp_lookup(&self) -> &TypeBPLookup {
        &self.type_binding_power_lookup
    }

    /// Returns a reference to the type NUD lookup table.
    pub fn get_type_nud_lookup(&self) -> &TypeNUDLookup {
        &self.type_nud_lookup
    }

    /// Returns a reference to the type LED lookup table.
    pub fn get_type_led_lookup(&self) -> &TypeLEDLookup {
        &self.type_led_lookup
    }

    /// Registers a left denotation (infix) handler for a token.
    ///
    /// # Arguments
    ///
    /// * `kind` - The token kind to register
    /// * `binding_power` - The precedence/binding power for this operator
    /// * `led_fn` - The handler function for this infix operator
    pub fn led(&mut self, kind: TokenKind, binding_power: BindingPower, led_fn: LEDHandler) {
        self.binding_power_lookup.insert(kind, binding_power);
        self.led_lookup.insert(kind, led_fn);
    }

    /// Registers a null denotation (prefix) handler for a token.
    pub fn nud(&mut self, kind: TokenKind, nud_fn: NUDHandler) {
        self.binding_power_lookup.insert(kind, BindingPower::Primary);
        self.nud_lookup.insert(kind, nud_fn);
    }

    /// Registers a statement handler for a token.
    pub fn stmt(&mut self, kind: TokenKind, stmt_fn: StmtHandler) {
        self.binding_power_lookup.insert(kind, BindingPower::Default);
        self.stmt_lookup.insert(kind, stmt_fn);
    }

    /// Registers a type left denotation handler.
    pub fn type_led(&mut self, kind: TokenKind, binding_power: BindingPower, led_fn: TypeLEDHandler) {
        self.type_binding_power_lookup.insert(kind, binding_power);
        self.type_led_lookup.insert(kind, led_fn);
    }

    /// Registers a type null denotation handler.
    pub fn type_nud(&mut self, kind: TokenKind, nud_fn: TypeNUDHandler) {
        self.type_binding_power_lookup.insert(kind, BindingPower::Primary);
        self.type_nud_lookup.insert(kind, nud_fn);
    }

    /// Returns the source position of the current token.
    pub fn get_position(&self) -> Position {
        self.current_token().span.start.clone()
    }

    /// Builds a node in the current scope.
    pub fn operation(&self, kind: OperKind, children: Vec<Operation>, position: Position) -> Operation {
        Operation::new(kind, children, self.scope).with_position(Some(position))
    }

    /// Opens a scope nested in the current one and makes it current.
    ///
    /// Returns the scope to restore with [`Parser::leave_scope`].
    pub fn enter_scope(&mut self) -> ScopeId {
        let outer = self.scope;
        self.scope = self.symbols.new_scope(Some(outer));
        outer
    }

    pub fn leave_scope(&mut self, outer: ScopeId) {
        self.scope = outer;
    }

    /// Declares a variable in the current scope.
    pub fn declare_variable(&mut self, variable: Variable) -> Result<VarId, Error> {
        self.symbols.declare_variable(self.scope, variable)
    }

    pub fn into_unit(self) -> TranslationUnit {
        TranslationUnit {
            symbols: self.symbols,
            globals: self.globals,
            functions: self.functions,
            structs: self.structs,
        }
    }
}

/// Parses a stream of tokens into a translation unit.
///
/// This is the main entry point for parsing. It creates a parser instance,
/// initializes all lookup tables, and parses external declarations until EOF.
///
/// # Arguments
///
/// * `tokens` - Vector of tokens to parse
/// * `file` - Name of the source file, used in positions
/// * `builtins` - Library the unit is compiled against; `None` when parsing
///   the library itself
///
/// # Returns
///
/// The unit with its populated symbol tables, or the first syntax or
/// declaration error.
pub fn parse(tokens: Vec<Token>, file: Option<String>, builtins: Option<&Builtins>) -> Result<TranslationUnit, Error> {
    let file = Rc::new(file.unwrap_or_else(|| String::from("shell")));
    let mut parser = Parser::new(tokens, file, builtins);
    create_token_lookups(&mut parser);
    create_token_type_lookups(&mut parser);

    while parser.has_tokens() {
        parse_external_declaration(&mut parser)?;
    }

    log::debug!(
        "parsed {} functions",
        parser.symbols.function_scope(parser.functions).functions.len()
    );
    Ok(parser.into_unit())
}
