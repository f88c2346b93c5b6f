//! Scope arena and symbol tables shared by the analyzer and interpreter.
//!
//! Scopes form a parent-linked chain stored in one arena; a pass holds the
//! arena plus a single "current scope" handle. Pushing appends a scope,
//! popping restores the saved handle, so scope release works on every exit
//! path including `?` propagation.

use std::collections::HashMap;
use std::rc::Rc;

use plc_syntax::ast;
use plc_syntax::error::{error, Result};

use crate::types::Type;
use crate::value::Value;

/// A builtin function implementation.
pub type BuiltinFn = fn(Vec<Value>) -> Result<Value>;

/// How a function is invoked: a native builtin, or a user definition whose
/// body the interpreter executes.
#[derive(Debug, Clone)]
pub enum Invoker {
    Builtin(BuiltinFn),
    Source(Rc<ast::Function>),
}

/// A named variable binding.
///
/// `value` is writable only while `mutable` is true; the target name exists
/// for the host-language emitter.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub target_name: String,
    pub ty: Type,
    pub mutable: bool,
    pub value: Value,
}

/// A named function binding, looked up by `(name, arity)`.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub target_name: String,
    pub parameter_types: Vec<Type>,
    pub return_type: Type,
    pub invoker: Invoker,
}

impl Function {
    /// The arity this function is registered under.
    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}

/// Handle into the scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// One lexical scope: a parent link plus disjoint variable and function
/// tables.
#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    variables: HashMap<String, Variable>,
    functions: HashMap<(String, usize), Function>,
}

/// The scope arena. Index 0 is the root scope; every other scope points at
/// its parent. Scopes are never removed; abandoning a handle is popping.
#[derive(Debug, Default)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Environment {
    /// Creates an environment containing only the root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// The root scope handle.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Appends a child of `parent` and returns its handle.
    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        id
    }

    /// The parent of `scope`, or `None` for the root.
    pub fn parent_of(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    /// Defines a variable in `scope`. Duplicate names within one scope are
    /// rejected; shadowing an outer scope is fine.
    pub fn define_variable(&mut self, scope: ScopeId, variable: Variable) -> Result<()> {
        let table = &mut self.scopes[scope.0].variables;
        if table.contains_key(&variable.name) {
            return error(format!(
                "Variable '{}' is already defined in this scope",
                variable.name
            ));
        }
        table.insert(variable.name.clone(), variable);
        Ok(())
    }

    /// Defines a function in `scope`. Overloading by arity is permitted,
    /// redefining the same `(name, arity)` in one scope is not.
    pub fn define_function(&mut self, scope: ScopeId, function: Function) -> Result<()> {
        let key = (function.name.clone(), function.arity());
        let table = &mut self.scopes[scope.0].functions;
        if table.contains_key(&key) {
            return error(format!(
                "Function '{}/{}' is already defined in this scope",
                key.0, key.1
            ));
        }
        table.insert(key, function);
        Ok(())
    }

    /// Looks `name` up in `scope` and its ancestors.
    pub fn lookup_variable(&self, scope: ScopeId, name: &str) -> Result<&Variable> {
        match self.variable_scope(scope, name) {
            Some(s) => Ok(&self.scopes[s.0].variables[name]),
            None => error(format!("Undefined variable '{}'", name)),
        }
    }

    /// Looks `(name, arity)` up in `scope` and its ancestors.
    pub fn lookup_function(&self, scope: ScopeId, name: &str, arity: usize) -> Result<&Function> {
        let key = (name.to_string(), arity);
        let mut current = Some(scope);
        while let Some(s) = current {
            if let Some(f) = self.scopes[s.0].functions.get(&key) {
                return Ok(f);
            }
            current = self.scopes[s.0].parent;
        }
        error(format!("Undefined function '{}/{}'", name, arity))
    }

    /// Writes a new value into an existing variable. The variable must be
    /// mutable.
    pub fn assign(&mut self, scope: ScopeId, name: &str, value: Value) -> Result<()> {
        let owner = match self.variable_scope(scope, name) {
            Some(s) => s,
            None => return error(format!("Undefined variable '{}'", name)),
        };
        let variable = self.scopes[owner.0].variables.get_mut(name).unwrap();
        if !variable.mutable {
            return error(format!("Variable '{}' is not mutable", name));
        }
        variable.value = value;
        Ok(())
    }

    /// Writes one element of a list variable. Bounds are checked against the
    /// current list length.
    pub fn assign_element(
        &mut self,
        scope: ScopeId,
        name: &str,
        index: usize,
        value: Value,
    ) -> Result<()> {
        let owner = match self.variable_scope(scope, name) {
            Some(s) => s,
            None => return error(format!("Undefined variable '{}'", name)),
        };
        let variable = self.scopes[owner.0].variables.get_mut(name).unwrap();
        if !variable.mutable {
            return error(format!("Variable '{}' is not mutable", name));
        }
        match &mut variable.value {
            Value::List(items) => {
                let len = items.len();
                match items.get_mut(index) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => error(format!(
                        "List index {} out of range for '{}' (length {})",
                        index, name, len
                    )),
                }
            }
            other => error(format!(
                "Variable '{}' holds {}, not a list",
                name,
                other.type_name()
            )),
        }
    }

    fn variable_scope(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(s) = current {
            if self.scopes[s.0].variables.contains_key(name) {
                return Some(s);
            }
            current = self.scopes[s.0].parent;
        }
        None
    }
}
