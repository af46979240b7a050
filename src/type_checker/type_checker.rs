use crate::{
    ast::{
        ast::{OperKind, Operation},
        types::TypeSpecifier,
    },
    compiler::functions::{resolve_call, Resolution},
    errors::errors::{Error, ErrorImpl},
    symbols::symbols::{FunScopeId, StructId, StructScopeId, Symbols, VarId},
};

use super::{constant::evaluate_int, swizzle::Swizzle};

/// Resolved type of an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub specifier: TypeSpecifier,
    /// The expression denotes a storage location that can be written.
    pub can_be_referenced: bool,
    /// Component selection accumulated over chained swizzles.
    pub is_swizzled: bool,
    pub swizzle: Swizzle,
}

impl TypeInfo {
    /// A computed value.
    pub fn value(specifier: TypeSpecifier) -> Self {
        TypeInfo {
            specifier,
            can_be_referenced: false,
            is_swizzled: false,
            swizzle: Swizzle::identity(4),
        }
    }

    /// A named storage location.
    pub fn location(specifier: TypeSpecifier) -> Self {
        TypeInfo {
            can_be_referenced: true,
            ..TypeInfo::value(specifier)
        }
    }

    fn void() -> Self {
        TypeInfo::value(TypeSpecifier::Void)
    }
}

/// Component offsets of the fields of a struct and its total size.
#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    pub offsets: Vec<u32>,
    pub size: u32,
}

pub fn round_to_register(size: u32) -> u32 {
    (size + 3) & !3
}

/// Answers type questions about expression nodes against one set of scopes.
///
/// The checker never mutates the symbol tables, so it can be built on the
/// fly wherever a lowering step needs the type of a subtree.
pub struct TypeChecker<'a> {
    pub symbols: &'a Symbols,
    pub functions: FunScopeId,
    pub structs: StructScopeId,
}

impl<'a> TypeChecker<'a> {
    pub fn new(symbols: &'a Symbols, functions: FunScopeId, structs: StructScopeId) -> Self {
        TypeChecker {
            symbols,
            functions,
            structs,
        }
    }

    pub fn type_name(&self, specifier: &TypeSpecifier) -> String {
        self.symbols.type_name(specifier)
    }

    /// Parenthesised list of argument types, used in overload errors.
    pub fn argument_list(&self, args: &[Operation]) -> Result<String, Error> {
        let names = args
            .iter()
            .map(|arg| Ok(self.type_name(&self.type_of(arg)?.specifier)))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(format!("({})", names.join(", ")))
    }

    /// The variable an identifier or variable reference denotes.
    pub fn variable_of(&self, oper: &Operation) -> Result<Option<VarId>, Error> {
        match &oper.kind {
            OperKind::VariableRef(id) => Ok(Some(*id)),
            OperKind::Identifier(name) => self
                .symbols
                .lookup_variable(oper.locals, name)
                .map(Some)
                .ok_or_else(|| {
                    Error::new(
                        ErrorImpl::VariableNotDeclared {
                            variable: name.to_string(),
                        },
                        oper.position.clone(),
                    )
                }),
            _ => Ok(None),
        }
    }

    /// Resolves the type of an expression node.
    ///
    /// # Arguments
    ///
    /// * `oper` - The node to type; names resolve against `oper.locals`
    ///
    /// # Returns
    ///
    /// The node's type with its referenceability and accumulated swizzle,
    /// or the first lookup/type error found in the subtree.
    pub fn type_of(&self, oper: &Operation) -> Result<TypeInfo, Error> {
        self.resolve_type(oper)
            .map_err(|error| error.or_position(oper.position.as_ref()))
    }

    fn resolve_type(&self, oper: &Operation) -> Result<TypeInfo, Error> {
        match &oper.kind {
            OperKind::Noop
            | OperKind::Block { .. }
            | OperKind::VariableDecl(_)
            | OperKind::Asm(_)
            | OperKind::Break
            | OperKind::Continue
            | OperKind::Discard
            | OperKind::Return
            | OperKind::Expression
            | OperKind::If
            | OperKind::While
            | OperKind::Do
            | OperKind::For => Ok(TypeInfo::void()),
            OperKind::LiteralFloat(_) => Ok(TypeInfo::value(TypeSpecifier::Float)),
            OperKind::LiteralInt(_) => Ok(TypeInfo::value(TypeSpecifier::Int)),
            OperKind::LiteralBool(_) => Ok(TypeInfo::value(TypeSpecifier::Bool)),
            OperKind::Identifier(_) | OperKind::VariableRef(_) => {
                let Some(id) = self.variable_of(oper)? else {
                    return Ok(TypeInfo::void());
                };
                Ok(TypeInfo::location(self.symbols.variable(id).type_.specifier.clone()))
            }
            OperKind::Sequence => match oper.children.last() {
                Some(last) => self.type_of(last),
                None => Ok(TypeInfo::void()),
            },
            OperKind::Assign
            | OperKind::AddAssign
            | OperKind::SubAssign
            | OperKind::MulAssign
            | OperKind::DivAssign => {
                let target = self.type_of(expect_child(oper, 0)?)?;
                Ok(TypeInfo::value(target.specifier))
            }
            OperKind::Select => {
                let taken = self.type_of(expect_child(oper, 1)?)?;
                Ok(TypeInfo::value(taken.specifier))
            }
            OperKind::LogicalOr
            | OperKind::LogicalXor
            | OperKind::LogicalAnd
            | OperKind::Equal
            | OperKind::NotEqual
            | OperKind::Less
            | OperKind::Greater
            | OperKind::LessEqual
            | OperKind::GreaterEqual
            | OperKind::Not => Ok(TypeInfo::value(TypeSpecifier::Bool)),
            OperKind::Plus => {
                let operand = self.type_of(expect_child(oper, 0)?)?;
                Ok(TypeInfo::value(operand.specifier))
            }
            OperKind::Add
            | OperKind::Subtract
            | OperKind::Multiply
            | OperKind::Divide
            | OperKind::Minus
            | OperKind::PreIncrement
            | OperKind::PreDecrement
            | OperKind::PostIncrement
            | OperKind::PostDecrement => {
                let name = oper.kind.operator_function().unwrap_or("?");
                self.call_type(name, oper)
            }
            OperKind::Call(name) => self.call_type(name, oper),
            OperKind::Subscript => self.subscript_type(oper),
            OperKind::Field(name) => self.field_type(name, oper),
        }
    }

    fn call_type(&self, name: &str, oper: &Operation) -> Result<TypeInfo, Error> {
        match resolve_call(self, name, &oper.children)? {
            Resolution::Function(fun) | Resolution::Adapted(fun, _) => Ok(TypeInfo::value(
                self.symbols.function(fun).return_type.specifier.clone(),
            )),
            Resolution::Struct(id) => Ok(TypeInfo::value(TypeSpecifier::Struct(id))),
        }
    }

    fn subscript_type(&self, oper: &Operation) -> Result<TypeInfo, Error> {
        let base = self.type_of(expect_child(oper, 0)?)?;
        let index = expect_child(oper, 1)?;

        match &base.specifier {
            TypeSpecifier::Array(element, _) => {
                self.constant_index(index, &base.specifier)?;
                Ok(TypeInfo {
                    specifier: (**element).clone(),
                    can_be_referenced: base.can_be_referenced,
                    ..TypeInfo::value(TypeSpecifier::Void)
                })
            }
            spec if spec.is_matrix() => {
                self.constant_index(index, spec)?;
                Ok(TypeInfo {
                    specifier: spec.column_type().unwrap_or(TypeSpecifier::Vec4),
                    can_be_referenced: base.can_be_referenced,
                    ..TypeInfo::value(TypeSpecifier::Void)
                })
            }
            spec if spec.is_vector() => {
                let component = self.constant_index(index, spec)?;
                let selected = Swizzle::new(&[component as u8]);
                Ok(TypeInfo {
                    specifier: spec.base_type().unwrap_or(TypeSpecifier::Float),
                    can_be_referenced: base.can_be_referenced,
                    is_swizzled: true,
                    swizzle: if base.is_swizzled {
                        base.swizzle.compose(&selected)
                    } else {
                        selected
                    },
                })
            }
            other => Err(Error::new(
                ErrorImpl::InvalidSubscript {
                    type_: self.type_name(other),
                },
                oper.position.clone(),
            )),
        }
    }

    /// Validates a constant subscript against the length of `indexed`.
    pub fn constant_index(&self, index: &Operation, indexed: &TypeSpecifier) -> Result<u32, Error> {
        let index_type = self.type_of(index)?;
        if index_type.specifier != TypeSpecifier::Int {
            return Err(Error::new(
                ErrorImpl::TypeMatchError {
                    expected: "int".to_string(),
                    received: self.type_name(&index_type.specifier),
                },
                index.position.clone(),
            ));
        }

        let Some(value) = evaluate_int(index) else {
            return Err(Error::new(ErrorImpl::NonConstantIndex, index.position.clone()));
        };

        let length = match indexed {
            TypeSpecifier::Array(_, length) => length.unwrap_or(0),
            other => other.components(),
        };
        if value < 0 || value >= length as i64 {
            return Err(Error::new(
                ErrorImpl::ArrayIndexOutOfBounds {
                    index: value,
                    size: length,
                },
                index.position.clone(),
            ));
        }
        Ok(value as u32)
    }

    fn field_type(&self, name: &str, oper: &Operation) -> Result<TypeInfo, Error> {
        let base = self.type_of(expect_child(oper, 0)?)?;

        if let TypeSpecifier::Struct(id) = &base.specifier {
            let Some((_, specifier)) = self.field_offset(*id, name) else {
                return Err(Error::new(
                    ErrorImpl::UnknownField {
                        field: name.to_string(),
                        type_: self.type_name(&base.specifier),
                    },
                    oper.position.clone(),
                ));
            };
            return Ok(TypeInfo {
                specifier,
                can_be_referenced: base.can_be_referenced,
                ..TypeInfo::value(TypeSpecifier::Void)
            });
        }

        if base.specifier.is_scalar() {
            return Err(Error::new(
                ErrorImpl::InvalidSwizzle {
                    swizzle: name.to_string(),
                    type_: self.type_name(&base.specifier),
                },
                oper.position.clone(),
            ));
        }
        if !base.specifier.is_vector() {
            return Err(Error::new(
                ErrorImpl::UnknownField {
                    field: name.to_string(),
                    type_: self.type_name(&base.specifier),
                },
                oper.position.clone(),
            ));
        }

        let swizzle = Swizzle::parse(
            name,
            base.specifier.components(),
            &self.type_name(&base.specifier),
        )?;
        let element = base.specifier.base_type().unwrap_or(TypeSpecifier::Float);
        let specifier = TypeSpecifier::vector_of(&element, swizzle.size()).unwrap_or(TypeSpecifier::Vec4);

        Ok(TypeInfo {
            specifier,
            can_be_referenced: base.can_be_referenced,
            is_swizzled: true,
            swizzle: if base.is_swizzled {
                base.swizzle.compose(&swizzle)
            } else {
                swizzle
            },
        })
    }

    /// Number of register components a value of `specifier` occupies.
    pub fn sizeof_type(&self, specifier: &TypeSpecifier) -> u32 {
        match specifier {
            TypeSpecifier::Void => 0,
            TypeSpecifier::Struct(id) => self.struct_layout(*id).size,
            TypeSpecifier::Array(element, length) => {
                let length = length.unwrap_or(0);
                let element = self.sizeof_type(element);
                if length > 1 {
                    round_to_register(element) * length
                } else {
                    element * length
                }
            }
            spec if spec.is_matrix() => spec.components() * 4,
            spec if spec.is_sampler() => 1,
            spec => spec.components(),
        }
    }

    /// Distance in components between consecutive array elements.
    pub fn array_stride(&self, element: &TypeSpecifier, length: u32) -> u32 {
        let size = self.sizeof_type(element);
        if length > 1 {
            round_to_register(size)
        } else {
            size
        }
    }

    pub fn struct_layout(&self, id: StructId) -> StructLayout {
        let mut offsets = vec![];
        let mut offset = 0;
        for field in &self.symbols.struct_def(id).fields {
            let size = self.sizeof_type(&field.specifier);
            if size > 1 || field.specifier.is_array() {
                offset = round_to_register(offset);
            }
            offsets.push(offset);
            offset += size;
        }

        let size = match offset {
            1 => 2,
            n if n > 4 => round_to_register(n),
            n => n,
        };
        StructLayout { offsets, size }
    }

    /// Component offset and type of a named struct field.
    pub fn field_offset(&self, id: StructId, name: &str) -> Option<(u32, TypeSpecifier)> {
        let def = self.symbols.struct_def(id);
        let layout = self.struct_layout(id);
        def.fields
            .iter()
            .zip(layout.offsets)
            .find(|(field, _)| &*field.name == name)
            .map(|(field, offset)| (offset, field.specifier.clone()))
    }
}

/// Child `index` of a node whose arity the parser fixes.
pub fn expect_child(oper: &Operation, index: usize) -> Result<&Operation, Error> {
    oper.child(index).ok_or_else(|| {
        Error::new(
            ErrorImpl::ArgumentCountMismatch {
                expected: index + 1,
                received: oper.children.len(),
            },
            oper.position.clone(),
        )
    })
}
