use std::{collections::HashMap, rc::Rc};

use crate::{
    ast::{
        ast::Operation,
        types::{FullySpecifiedType, ParameterPassing, TypeSpecifier},
    },
    errors::errors::{Error, ErrorImpl},
    Position, MK_ARENA_ACCESSORS,
};

/// Interned identifier text. Equality is by content.
pub type Atom = Rc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructScopeId(pub u32);

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: Atom,
    pub type_: FullySpecifiedType,
    pub array_size: Option<Operation>,
    pub initializer: Option<Operation>,
    pub is_global: bool,
    /// Compiler-introduced temporary (result slots, copied-in arguments).
    pub is_temp: bool,
    pub position: Option<Position>,
}

impl Variable {
    pub fn new(name: Atom, type_: FullySpecifiedType) -> Self {
        Variable {
            name,
            type_,
            array_size: None,
            initializer: None,
            is_global: false,
            is_temp: false,
            position: None,
        }
    }

    pub fn temporary(name: &str, specifier: TypeSpecifier) -> Self {
        let mut variable = Variable::new(Atom::from(name), FullySpecifiedType::unqualified(specifier));
        variable.is_temp = true;
        variable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Ordinary,
    Constructor,
    Operator,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub kind: FunctionKind,
    pub name: Atom,
    pub return_type: FullySpecifiedType,
    /// Owned parameter scope. The first `param_count` entries are the formal
    /// parameters in order; a non-void function has its `__retVal` slot next.
    pub parameters: ScopeId,
    pub param_count: usize,
    pub body: Option<Operation>,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: Atom,
    pub specifier: TypeSpecifier,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: Atom,
    pub fields: Vec<StructField>,
}

#[derive(Debug, Clone, Default)]
pub struct VariableScope {
    pub variables: Vec<VarId>,
    pub outer: Option<ScopeId>,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionScope {
    pub functions: Vec<FunId>,
    pub outer: Option<FunScopeId>,
}

#[derive(Debug, Clone, Default)]
pub struct StructScope {
    pub structs: Vec<StructId>,
    pub outer: Option<StructScopeId>,
}

/// Flat storage for every symbol of one translation unit.
#[derive(Debug, Clone, Default)]
pub struct SymbolArena {
    variables: Vec<Variable>,
    functions: Vec<Function>,
    structs: Vec<StructDef>,
    scopes: Vec<VariableScope>,
    function_scopes: Vec<FunctionScope>,
    struct_scopes: Vec<StructScope>,
}

/// Symbol tables of a compilation.
///
/// Entries of the shared `base` arena (the built-in library) are read-only;
/// new entries always land in `local`. Handles are global across both: a
/// handle below the base arena's length refers into the base.
#[derive(Debug, Clone, Default)]
pub struct Symbols {
    base: Option<Rc<SymbolArena>>,
    local: SymbolArena,
}

impl Symbols {
    pub fn new() -> Self {
        Symbols::default()
    }

    pub fn with_base(base: Rc<SymbolArena>) -> Self {
        Symbols {
            base: Some(base),
            local: SymbolArena::default(),
        }
    }

    /// Freezes a self-contained unit so it can be shared as a base.
    pub fn into_shared(self) -> Rc<SymbolArena> {
        match self.base {
            None => Rc::new(self.local),
            Some(base) => {
                let mut arena = (*base).clone();
                arena.variables.extend(self.local.variables);
                arena.functions.extend(self.local.functions);
                arena.structs.extend(self.local.structs);
                arena.scopes.extend(self.local.scopes);
                arena.function_scopes.extend(self.local.function_scopes);
                arena.struct_scopes.extend(self.local.struct_scopes);
                Rc::new(arena)
            }
        }
    }

    MK_ARENA_ACCESSORS!(variable, variable_mut, variables, VarId, Variable);
    MK_ARENA_ACCESSORS!(function, function_mut, functions, FunId, Function);
    MK_ARENA_ACCESSORS!(struct_def, struct_def_mut, structs, StructId, StructDef);
    MK_ARENA_ACCESSORS!(scope, scope_mut, scopes, ScopeId, VariableScope);
    MK_ARENA_ACCESSORS!(function_scope, function_scope_mut, function_scopes, FunScopeId, FunctionScope);
    MK_ARENA_ACCESSORS!(struct_scope, struct_scope_mut, struct_scopes, StructScopeId, StructScope);

    fn next_index(&self, base_len: fn(&SymbolArena) -> usize) -> u32 {
        let offset = self.base.as_ref().map_or(0, |base| base_len(base));
        (offset + base_len(&self.local)) as u32
    }

    pub fn new_scope(&mut self, outer: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.next_index(|arena| arena.scopes.len()));
        self.local.scopes.push(VariableScope {
            variables: vec![],
            outer,
        });
        id
    }

    pub fn new_function_scope(&mut self, outer: Option<FunScopeId>) -> FunScopeId {
        let id = FunScopeId(self.next_index(|arena| arena.function_scopes.len()));
        self.local.function_scopes.push(FunctionScope {
            functions: vec![],
            outer,
        });
        id
    }

    pub fn new_struct_scope(&mut self, outer: Option<StructScopeId>) -> StructScopeId {
        let id = StructScopeId(self.next_index(|arena| arena.struct_scopes.len()));
        self.local.struct_scopes.push(StructScope {
            structs: vec![],
            outer,
        });
        id
    }

    /// Adds a variable to the arena without entering it in any scope.
    pub fn add_variable(&mut self, variable: Variable) -> VarId {
        let id = VarId(self.next_index(|arena| arena.variables.len()));
        self.local.variables.push(variable);
        id
    }

    /// Finds `name` in `scope` only, ignoring outer scopes.
    pub fn find_variable_in(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        self.scope(scope)
            .variables
            .iter()
            .copied()
            .find(|id| &*self.variable(*id).name == name)
    }

    /// Declares a variable in `scope`. Names are unique per scope.
    pub fn declare_variable(&mut self, scope: ScopeId, variable: Variable) -> Result<VarId, Error> {
        if self.find_variable_in(scope, &variable.name).is_some() {
            return Err(Error::new(
                ErrorImpl::VariableAlreadyDeclared {
                    variable: variable.name.to_string(),
                },
                variable.position.clone(),
            ));
        }

        let position = variable.position.clone();
        let id = self.add_variable(variable);
        self.scope_mut(scope)
            .ok_or_else(|| read_only_scope(position))?
            .variables
            .push(id);
        Ok(id)
    }

    /// Looks `name` up through `scope` and its outer chain.
    pub fn lookup_variable(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(found) = self.find_variable_in(id, name) {
                return Some(found);
            }
            current = self.scope(id).outer;
        }
        None
    }

    pub fn declare_struct(&mut self, scope: StructScopeId, def: StructDef) -> Result<StructId, Error> {
        let exists = self
            .struct_scope(scope)
            .structs
            .iter()
            .any(|id| self.struct_def(*id).name == def.name);
        if exists {
            return Err(Error::new(
                ErrorImpl::StructAlreadyDeclared {
                    name: def.name.to_string(),
                },
                None,
            ));
        }

        let id = StructId(self.next_index(|arena| arena.structs.len()));
        self.local.structs.push(def);
        self.struct_scope_mut(scope)
            .ok_or_else(|| read_only_scope(None))?
            .structs
            .push(id);
        Ok(id)
    }

    pub fn lookup_struct(&self, scope: StructScopeId, name: &str) -> Option<StructId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let table = self.struct_scope(id);
            if let Some(found) = table
                .structs
                .iter()
                .copied()
                .find(|sid| &*self.struct_def(*sid).name == name)
            {
                return Some(found);
            }
            current = table.outer;
        }
        None
    }

    /// Formal parameters of a function in declaration order.
    pub fn parameters(&self, fun: FunId) -> Vec<VarId> {
        let function = self.function(fun);
        self.scope(function.parameters)
            .variables
            .iter()
            .take(function.param_count)
            .copied()
            .collect()
    }

    /// The `__retVal` slot of a non-void function.
    pub fn return_slot(&self, fun: FunId) -> Option<VarId> {
        let function = self.function(fun);
        self.scope(function.parameters)
            .variables
            .get(function.param_count)
            .copied()
    }

    /// Overload identity: the ordered parameter passing modes and types.
    pub fn signature(&self, fun: FunId) -> Vec<(ParameterPassing, TypeSpecifier)> {
        self.parameters(fun)
            .into_iter()
            .map(|param| {
                let type_ = &self.variable(param).type_;
                (type_.qualifier.passing(), type_.specifier.clone())
            })
            .collect()
    }

    /// Declares a function, or completes an earlier prototype.
    ///
    /// A declaration whose name and signature match an entry of the same
    /// scope either supplies the missing body of a prototype, repeats the
    /// prototype (no-op), or is a redefinition error.
    pub fn declare_function(&mut self, scope: FunScopeId, function: Function) -> Result<FunId, Error> {
        let id = FunId(self.next_index(|arena| arena.functions.len()));
        let position = function.position.clone();
        let name = function.name.clone();
        self.local.functions.push(function);

        let signature = self.signature(id);
        let existing = self
            .function_scope(scope)
            .functions
            .iter()
            .copied()
            .find(|other| self.function(*other).name == name && self.signature(*other) == signature);

        let Some(existing) = existing else {
            self.function_scope_mut(scope)
                .ok_or_else(|| read_only_scope(position))?
                .functions
                .push(id);
            return Ok(id);
        };

        // The new entry only served to compute the signature.
        let Some(declared) = self.local.functions.pop() else {
            return Ok(existing);
        };

        match (self.function(existing).body.is_some(), declared.body.is_some()) {
            (true, true) => Err(Error::new(
                ErrorImpl::FunctionAlreadyDeclared {
                    function: name.to_string(),
                },
                position,
            )),
            (false, true) => {
                let target = self
                    .function_mut(existing)
                    .ok_or_else(|| read_only_scope(position))?;
                target.parameters = declared.parameters;
                target.body = declared.body;
                target.position = declared.position;
                Ok(existing)
            }
            _ => Ok(existing),
        }
    }

    /// Every function named `name`, innermost scope first.
    pub fn functions_named(&self, scope: FunScopeId, name: &str) -> Vec<FunId> {
        let mut found = vec![];
        let mut current = Some(scope);
        while let Some(id) = current {
            let table = self.function_scope(id);
            found.extend(
                table
                    .functions
                    .iter()
                    .copied()
                    .filter(|fun| &*self.function(*fun).name == name),
            );
            current = table.outer;
        }
        found
    }

    /// Copies `scope` with fresh variables, rebinding the copy to `outer`.
    ///
    /// Returns the new scope and records old-to-new variable handles in
    /// `remap` so references inside copied code can be rewritten.
    pub fn copy_scope(
        &mut self,
        scope: ScopeId,
        outer: Option<ScopeId>,
        remap: &mut HashMap<VarId, VarId>,
    ) -> ScopeId {
        let copy = self.new_scope(outer);
        let variables = self.scope(scope).variables.clone();
        for old in variables {
            let variable = self.variable(old).clone();
            let new = self.add_variable(variable);
            if let Some(table) = self.scope_mut(copy) {
                table.variables.push(new);
            }
            remap.insert(old, new);
        }
        copy
    }

    /// Human readable type name, resolving struct handles to their names.
    pub fn type_name(&self, specifier: &TypeSpecifier) -> String {
        match specifier {
            TypeSpecifier::Struct(id) => self.struct_def(*id).name.to_string(),
            TypeSpecifier::Array(element, Some(len)) => format!("{}[{}]", self.type_name(element), len),
            TypeSpecifier::Array(element, None) => format!("{}[]", self.type_name(element)),
            other => other.to_string(),
        }
    }
}

fn read_only_scope(position: Option<Position>) -> Error {
    Error::new(ErrorImpl::ReadOnlyScope, position)
}
