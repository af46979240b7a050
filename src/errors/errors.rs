use std::fmt::Display;

use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Option<Position>,
}

/// Broad failure classes reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Syntax,
    Lookup,
    Type,
    Resource,
    Control,
    Internal,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Option<Position>) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn get_internal_error(&self) -> &ErrorImpl {
        &self.internal_error
    }

    /// Attaches a position if the error does not carry one yet.
    pub fn or_position(mut self, position: Option<&Position>) -> Self {
        if self.position.is_none() {
            self.position = position.cloned();
        }
        self
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenDetailed { .. } => "UnexpectedTokenDetailed",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::VariableAlreadyDeclared { .. } => "VariableAlreadyDeclared",
            ErrorImpl::FunctionAlreadyDeclared { .. } => "FunctionAlreadyDeclared",
            ErrorImpl::StructAlreadyDeclared { .. } => "StructAlreadyDeclared",
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::InvalidQualifier { .. } => "InvalidQualifier",
            ErrorImpl::VariableNotDeclared { .. } => "VariableNotDeclared",
            ErrorImpl::FunctionNotDeclared { .. } => "FunctionNotDeclared",
            ErrorImpl::NoMatchingOverload { .. } => "NoMatchingOverload",
            ErrorImpl::FunctionNotDefined { .. } => "FunctionNotDefined",
            ErrorImpl::UnknownField { .. } => "UnknownField",
            ErrorImpl::MissingEntryPoint { .. } => "MissingEntryPoint",
            ErrorImpl::TypeMatchError { .. } => "TypeMatchError",
            ErrorImpl::ArgumentCountMismatch { .. } => "ArgumentCountMismatch",
            ErrorImpl::InvalidSwizzle { .. } => "InvalidSwizzle",
            ErrorImpl::SwizzleOutOfRange { .. } => "SwizzleOutOfRange",
            ErrorImpl::InvalidWriteMask { .. } => "InvalidWriteMask",
            ErrorImpl::ReadOnlyAssignment { .. } => "ReadOnlyAssignment",
            ErrorImpl::NotAnLvalue => "NotAnLvalue",
            ErrorImpl::InvalidSubscript { .. } => "InvalidSubscript",
            ErrorImpl::NonConstantIndex => "NonConstantIndex",
            ErrorImpl::ArrayIndexOutOfBounds { .. } => "ArrayIndexOutOfBounds",
            ErrorImpl::InvalidOperands { .. } => "InvalidOperands",
            ErrorImpl::RecursiveCall { .. } => "RecursiveCall",
            ErrorImpl::RegisterFileExhausted { .. } => "RegisterFileExhausted",
            ErrorImpl::BreakOutsideLoop => "BreakOutsideLoop",
            ErrorImpl::ContinueOutsideLoop => "ContinueOutsideLoop",
            ErrorImpl::UnresolvedLabel { .. } => "UnresolvedLabel",
            ErrorImpl::AllocationLeak { .. } => "AllocationLeak",
            ErrorImpl::VariableNotAllocated { .. } => "VariableNotAllocated",
            ErrorImpl::UnknownInstruction { .. } => "UnknownInstruction",
            ErrorImpl::ReadOnlyScope => "ReadOnlyScope",
        }
    }

    pub fn get_error_class(&self) -> ErrorClass {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. }
            | ErrorImpl::UnexpectedToken { .. }
            | ErrorImpl::UnexpectedTokenDetailed { .. }
            | ErrorImpl::NumberParseError { .. }
            | ErrorImpl::VariableAlreadyDeclared { .. }
            | ErrorImpl::FunctionAlreadyDeclared { .. }
            | ErrorImpl::StructAlreadyDeclared { .. }
            | ErrorImpl::UnknownType { .. }
            | ErrorImpl::InvalidQualifier { .. } => ErrorClass::Syntax,
            ErrorImpl::VariableNotDeclared { .. }
            | ErrorImpl::FunctionNotDeclared { .. }
            | ErrorImpl::NoMatchingOverload { .. }
            | ErrorImpl::FunctionNotDefined { .. }
            | ErrorImpl::UnknownField { .. }
            | ErrorImpl::MissingEntryPoint { .. } => ErrorClass::Lookup,
            ErrorImpl::TypeMatchError { .. }
            | ErrorImpl::ArgumentCountMismatch { .. }
            | ErrorImpl::InvalidSwizzle { .. }
            | ErrorImpl::SwizzleOutOfRange { .. }
            | ErrorImpl::InvalidWriteMask { .. }
            | ErrorImpl::ReadOnlyAssignment { .. }
            | ErrorImpl::NotAnLvalue
            | ErrorImpl::InvalidSubscript { .. }
            | ErrorImpl::NonConstantIndex
            | ErrorImpl::ArrayIndexOutOfBounds { .. }
            | ErrorImpl::InvalidOperands { .. }
            | ErrorImpl::RecursiveCall { .. } => ErrorClass::Type,
            ErrorImpl::RegisterFileExhausted { .. } => ErrorClass::Resource,
            ErrorImpl::BreakOutsideLoop | ErrorImpl::ContinueOutsideLoop => ErrorClass::Control,
            ErrorImpl::UnresolvedLabel { .. }
            | ErrorImpl::AllocationLeak { .. }
            | ErrorImpl::VariableNotAllocated { .. }
            | ErrorImpl::UnknownInstruction { .. }
            | ErrorImpl::ReadOnlyScope => ErrorClass::Internal,
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => ErrorTip::None,
            ErrorImpl::UnexpectedToken { token } => ErrorTip::Suggestion(format!(
                "Unexpected token: `{}`, did you miss a semicolon?",
                token
            )),
            ErrorImpl::UnexpectedTokenDetailed { token, message } => {
                ErrorTip::Suggestion(format!("Unexpected token: `{}`, {}", token, message))
            }
            ErrorImpl::NumberParseError { token } => ErrorTip::Suggestion(format!(
                "Invalid number: `{}`, is it above the integer limit?",
                token
            )),
            ErrorImpl::VariableAlreadyDeclared { variable } => ErrorTip::Suggestion(format!(
                "Variable `{}` already declared in this scope",
                variable
            )),
            ErrorImpl::FunctionAlreadyDeclared { function } => ErrorTip::Suggestion(format!(
                "Function `{}` already has a body with these parameter types",
                function
            )),
            ErrorImpl::StructAlreadyDeclared { name } => {
                ErrorTip::Suggestion(format!("Struct `{}` already declared", name))
            }
            ErrorImpl::UnknownType { type_ } => {
                ErrorTip::Suggestion(format!("Unknown type `{}` found", type_))
            }
            ErrorImpl::InvalidQualifier { qualifier, context } => ErrorTip::Suggestion(format!(
                "Qualifier `{}` is not allowed on {}",
                qualifier, context
            )),
            ErrorImpl::VariableNotDeclared { variable } => {
                ErrorTip::Suggestion(format!("Variable `{}` not declared", variable))
            }
            ErrorImpl::FunctionNotDeclared { function } => {
                ErrorTip::Suggestion(format!("Function `{}` not declared", function))
            }
            ErrorImpl::NoMatchingOverload { function, arguments } => ErrorTip::Suggestion(format!(
                "Function `{}` not found for arguments ({}), check argument types",
                function, arguments
            )),
            ErrorImpl::FunctionNotDefined { function } => ErrorTip::Suggestion(format!(
                "Function `{}` is declared but has no body",
                function
            )),
            ErrorImpl::UnknownField { field, type_ } => {
                ErrorTip::Suggestion(format!("`{}` has no field `{}`", type_, field))
            }
            ErrorImpl::MissingEntryPoint { name } => {
                ErrorTip::Suggestion(format!("Expected a `void {}()` function", name))
            }
            ErrorImpl::TypeMatchError { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::ArgumentCountMismatch { expected, received } => ErrorTip::Suggestion(
                format!("Expected {} arguments, received {}", expected, received),
            ),
            ErrorImpl::InvalidSwizzle { swizzle, type_ } => ErrorTip::Suggestion(format!(
                "`.{}` is not a valid swizzle of `{}`",
                swizzle, type_
            )),
            ErrorImpl::SwizzleOutOfRange { swizzle, size } => ErrorTip::Suggestion(format!(
                "`.{}` selects a component beyond the {} available",
                swizzle, size
            )),
            ErrorImpl::InvalidWriteMask { swizzle } => ErrorTip::Suggestion(format!(
                "`.{}` repeats a component and cannot be assigned to",
                swizzle
            )),
            ErrorImpl::ReadOnlyAssignment { variable } => ErrorTip::Suggestion(format!(
                "Illegal assignment to read-only variable `{}`",
                variable
            )),
            ErrorImpl::NotAnLvalue => ErrorTip::Suggestion(String::from(
                "Left side of the assignment does not denote a storage location",
            )),
            ErrorImpl::InvalidSubscript { type_ } => {
                ErrorTip::Suggestion(format!("Values of type `{}` cannot be indexed", type_))
            }
            ErrorImpl::NonConstantIndex => ErrorTip::Suggestion(String::from(
                "Array and matrix indices must be constant integer expressions",
            )),
            ErrorImpl::ArrayIndexOutOfBounds { index, size } => ErrorTip::Suggestion(format!(
                "Index {} is out of bounds for {} elements",
                index, size
            )),
            ErrorImpl::InvalidOperands { operator, type_ } => ErrorTip::Suggestion(format!(
                "Operator `{}` cannot be applied to `{}`",
                operator, type_
            )),
            ErrorImpl::RecursiveCall { function } => ErrorTip::Suggestion(format!(
                "Function `{}` calls itself, recursion cannot be inlined",
                function
            )),
            ErrorImpl::RegisterFileExhausted { file, size } => ErrorTip::Suggestion(format!(
                "No room for {} components in the {} register file",
                size, file
            )),
            ErrorImpl::BreakOutsideLoop => {
                ErrorTip::Suggestion(String::from("`break` is not inside a loop"))
            }
            ErrorImpl::ContinueOutsideLoop => {
                ErrorTip::Suggestion(String::from("`continue` is not inside a loop"))
            }
            ErrorImpl::UnresolvedLabel { label } => {
                ErrorTip::Suggestion(format!("Jump to `{}` was never placed", label))
            }
            ErrorImpl::AllocationLeak { component } => ErrorTip::Suggestion(format!(
                "Component {} is still held when its scope ends",
                component
            )),
            ErrorImpl::VariableNotAllocated { variable } => {
                ErrorTip::Suggestion(format!("Variable `{}` has no storage", variable))
            }
            ErrorImpl::UnknownInstruction { name } => {
                ErrorTip::Suggestion(format!("`{}` is not a known instruction", name))
            }
            ErrorImpl::ReadOnlyScope => ErrorTip::Suggestion(String::from(
                "Built-in library scopes cannot be modified",
            )),
        }
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.position {
            Some(position) => write!(f, "{}:{}: {}", position.1, position.0, self.internal_error),
            None => write!(f, "{}", self.internal_error),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ErrorImpl {
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unexpected token: {token:?}")]
    UnexpectedToken { token: String },
    #[error("unexpected token ({message}): {token:?}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },
    #[error("variable {variable:?} already declared")]
    VariableAlreadyDeclared { variable: String },
    #[error("function {function:?} redefined")]
    FunctionAlreadyDeclared { function: String },
    #[error("struct {name:?} already declared")]
    StructAlreadyDeclared { name: String },
    #[error("unknown type {type_} found")]
    UnknownType { type_: String },
    #[error("qualifier {qualifier} not allowed on {context}")]
    InvalidQualifier { qualifier: String, context: String },
    #[error("variable {variable:?} not declared")]
    VariableNotDeclared { variable: String },
    #[error("function {function:?} not declared")]
    FunctionNotDeclared { function: String },
    #[error("function {function:?} not found (check argument types): ({arguments})")]
    NoMatchingOverload { function: String, arguments: String },
    #[error("function {function:?} has no body")]
    FunctionNotDefined { function: String },
    #[error("type {type_} has no field {field:?}")]
    UnknownField { field: String, type_: String },
    #[error("entry point {name:?} not found")]
    MissingEntryPoint { name: String },
    #[error("types do not match: expected {expected}, received {received}")]
    TypeMatchError { expected: String, received: String },
    #[error("wrong number of arguments: expected {expected}, received {received}")]
    ArgumentCountMismatch { expected: usize, received: usize },
    #[error("invalid swizzle .{swizzle} of {type_}")]
    InvalidSwizzle { swizzle: String, type_: String },
    #[error("swizzle .{swizzle} out of range for {size} components")]
    SwizzleOutOfRange { swizzle: String, size: u32 },
    #[error("invalid writemask .{swizzle}")]
    InvalidWriteMask { swizzle: String },
    #[error("illegal assignment to read-only variable {variable:?}")]
    ReadOnlyAssignment { variable: String },
    #[error("assignment target is not an lvalue")]
    NotAnLvalue,
    #[error("cannot index type {type_}")]
    InvalidSubscript { type_: String },
    #[error("index is not a constant integer expression")]
    NonConstantIndex,
    #[error("array index {index} out of bounds for size {size}")]
    ArrayIndexOutOfBounds { index: i64, size: u32 },
    #[error("invalid operands to {operator}: {type_}")]
    InvalidOperands { operator: String, type_: String },
    #[error("recursive call to {function:?}")]
    RecursiveCall { function: String },
    #[error("{file} register file exhausted allocating {size} components")]
    RegisterFileExhausted { file: String, size: u32 },
    #[error("'break' not in loop")]
    BreakOutsideLoop,
    #[error("'continue' not in loop")]
    ContinueOutsideLoop,
    #[error("unresolved label {label:?}")]
    UnresolvedLabel { label: String },
    #[error("allocation leak at component {component}")]
    AllocationLeak { component: u32 },
    #[error("variable {variable:?} has no storage")]
    VariableNotAllocated { variable: String },
    #[error("unknown instruction {name:?}")]
    UnknownInstruction { name: String },
    #[error("attempt to modify a built-in scope")]
    ReadOnlyScope,
}

/// Per-compilation diagnostic buffer.
///
/// Only the first error of a compilation is kept; later errors are dropped.
/// Warnings accumulate in order.
#[derive(Debug, Default, Clone)]
pub struct InfoLog {
    error: Option<Error>,
    warnings: Vec<String>,
}

impl InfoLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub fn warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn clear(&mut self) {
        self.error = None;
        self.warnings.clear();
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for warning in &self.warnings {
            out.push_str(&format!("warning: {}\n", warning));
        }
        if let Some(error) = &self.error {
            out.push_str(&format!("error: {}\n", error));
        }
        out
    }
}
