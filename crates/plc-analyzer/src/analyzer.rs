//! The semantic analysis pass: name resolution, type checking, and the
//! structural rules a well-formed program must satisfy.
//!
//! Functions are resolved in two rounds (every signature is registered
//! before any body is analyzed) so functions may refer to each other in
//! either order. Globals enter scope one at a time, in declaration order.

use std::collections::HashMap;
use std::rc::Rc;

use num_traits::ToPrimitive;

use plc_environment::{Environment, Function, Invoker, ScopeId, Type, Value, Variable};
use plc_syntax::ast;
use plc_syntax::ast::{BinaryOp, Expression, Global, Literal, NodeId, Source, Statement};
use plc_syntax::error::{error, Result};

/// Name of the sentinel variable carrying the enclosing function's declared
/// return type.
const RETURN_TYPE_SENTINEL: &str = "$RETURNTYPE";

/// Resolution results published by a successful analysis, keyed by node id.
///
/// Every expression gets a type; every access, global, and declaration gets
/// a variable; every call and function definition gets a function.
#[derive(Debug, Default)]
pub struct Analysis {
    pub types: HashMap<NodeId, Type>,
    pub variables: HashMap<NodeId, Variable>,
    pub functions: HashMap<NodeId, Function>,
}

impl Analysis {
    /// The type bound to an expression node.
    pub fn type_of(&self, id: NodeId) -> Option<Type> {
        self.types.get(&id).copied()
    }
}

/// The directional compatibility relation between a target type and a value
/// type: identical types, any target, or a comparable target receiving one
/// of the four comparable value types.
pub fn assignable(target: Type, value: Type) -> bool {
    target == value
        || target == Type::Any
        || (target == Type::Comparable
            && matches!(
                value,
                Type::Integer | Type::Decimal | Type::Character | Type::String
            ))
}

fn require_assignable(target: Type, value: Type) -> Result<()> {
    if assignable(target, value) {
        Ok(())
    } else {
        error(format!("Cannot assign {} to {}", value, target))
    }
}

fn resolve_type(name: &str) -> Result<Type> {
    Type::from_source_name(name).ok_or_else(|| format!("Unknown type '{}'", name).into())
}

fn is_comparable(ty: Type) -> bool {
    matches!(
        ty,
        Type::Comparable | Type::Integer | Type::Decimal | Type::Character | Type::String
    )
}

/// Placeholder invoker for builtin signatures; the interpreter installs the
/// real implementations.
fn signature_stub(_: Vec<Value>) -> Result<Value> {
    Ok(Value::Nil)
}

/// The analyzer. Create one, feed it a [`Source`], then take the
/// [`Analysis`] with [`Analyzer::finish`], or use [`analyze`] for the whole
/// round trip.
pub struct Analyzer {
    env: Environment,
    scope: ScopeId,
    analysis: Analysis,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        let root = env.root();
        let builtins = [
            Function {
                name: "print".to_string(),
                target_name: "System.out.println".to_string(),
                parameter_types: vec![Type::Any],
                return_type: Type::Nil,
                invoker: Invoker::Builtin(signature_stub),
            },
            Function {
                name: "logarithm".to_string(),
                target_name: "Math.log".to_string(),
                parameter_types: vec![Type::Decimal],
                return_type: Type::Decimal,
                invoker: Invoker::Builtin(signature_stub),
            },
            Function {
                name: "converter".to_string(),
                target_name: "Integer.toString".to_string(),
                parameter_types: vec![Type::Integer, Type::Integer],
                return_type: Type::String,
                invoker: Invoker::Builtin(signature_stub),
            },
        ];
        for b in builtins {
            env.define_function(root, b)
                .expect("builtin signatures are distinct");
        }
        Self {
            env,
            scope: root,
            analysis: Analysis::default(),
        }
    }

    /// The active scope handle; restored after every visit, successful or
    /// not.
    pub fn current_scope(&self) -> ScopeId {
        self.scope
    }

    pub fn finish(self) -> Analysis {
        self.analysis
    }

    fn in_child_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.scope;
        self.scope = self.env.push(saved);
        let result = f(self);
        self.scope = saved;
        result
    }

    /// Analyzes a whole program: globals in order, then function signatures,
    /// then function bodies, then the `main/0` requirement.
    pub fn visit_source(&mut self, source: &Source) -> Result<()> {
        for global in &source.globals {
            self.visit_global(global)?;
        }
        let mut declared = Vec::with_capacity(source.functions.len());
        for function in &source.functions {
            declared.push(self.declare_function(function)?);
        }
        for (function, signature) in source.functions.iter().zip(declared) {
            self.visit_function_body(function, &signature)?;
        }
        let has_main = source.functions.iter().any(|f| {
            f.name == "main"
                && f.parameters.is_empty()
                && f.return_type_name.as_deref() == Some("Integer")
        });
        if !has_main {
            return error("Missing main/0 function returning Integer");
        }
        Ok(())
    }

    fn visit_global(&mut self, global: &Global) -> Result<()> {
        let ty = resolve_type(&global.type_name)?;
        if let Some(value) = &global.value {
            let value_ty = self.visit_expression(value)?;
            require_assignable(ty, value_ty)?;
        }
        let variable = Variable {
            name: global.name.clone(),
            target_name: global.name.clone(),
            ty,
            mutable: global.mutable,
            value: Value::Nil,
        };
        self.env.define_variable(self.scope, variable.clone())?;
        self.analysis.variables.insert(global.id, variable);
        Ok(())
    }

    /// Resolves a function's signature and registers it in the current
    /// scope, without touching the body.
    fn declare_function(&mut self, function: &ast::Function) -> Result<Function> {
        let mut parameter_types = Vec::with_capacity(function.parameters.len());
        for parameter in &function.parameters {
            parameter_types.push(resolve_type(&parameter.type_name)?);
        }
        let return_type = match &function.return_type_name {
            Some(name) => resolve_type(name)?,
            None => Type::Nil,
        };
        let signature = Function {
            name: function.name.clone(),
            target_name: function.name.clone(),
            parameter_types,
            return_type,
            invoker: Invoker::Source(Rc::new(function.clone())),
        };
        self.env.define_function(self.scope, signature.clone())?;
        self.analysis.functions.insert(function.id, signature.clone());
        Ok(signature)
    }

    /// Analyzes a function body in a fresh child scope holding the
    /// `$RETURNTYPE` sentinel and the parameters.
    fn visit_function_body(
        &mut self,
        function: &ast::Function,
        signature: &Function,
    ) -> Result<()> {
        self.in_child_scope(|a| {
            a.env.define_variable(
                a.scope,
                Variable {
                    name: RETURN_TYPE_SENTINEL.to_string(),
                    target_name: RETURN_TYPE_SENTINEL.to_string(),
                    ty: signature.return_type,
                    mutable: false,
                    value: Value::Nil,
                },
            )?;
            for (parameter, ty) in function.parameters.iter().zip(&signature.parameter_types) {
                a.env.define_variable(
                    a.scope,
                    Variable {
                        name: parameter.name.clone(),
                        target_name: parameter.name.clone(),
                        ty: *ty,
                        mutable: true,
                        value: Value::Nil,
                    },
                )?;
            }
            for statement in &function.body {
                a.visit_statement(statement)?;
            }
            Ok(())
        })
    }

    fn visit_statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Expression(expression) => {
                if !matches!(expression, Expression::Call { .. }) {
                    return error("Expression statements must be function calls");
                }
                self.visit_expression(expression)?;
                Ok(())
            }
            Statement::Declaration {
                id,
                name,
                type_name,
                value,
            } => {
                let ty = match value {
                    Some(value) => self.visit_expression(value)?,
                    None => match type_name {
                        Some(name) => resolve_type(name)?,
                        None => return error("Declaration requires a type or an initializer"),
                    },
                };
                let variable = Variable {
                    name: name.clone(),
                    target_name: name.clone(),
                    ty,
                    mutable: true,
                    value: Value::Nil,
                };
                self.env.define_variable(self.scope, variable.clone())?;
                self.analysis.variables.insert(*id, variable);
                Ok(())
            }
            Statement::Assignment { receiver, value } => {
                if !matches!(receiver, Expression::Access { .. }) {
                    return error("Assignment receiver must be an access expression");
                }
                let value_ty = self.visit_expression(value)?;
                let receiver_ty = self.visit_expression(receiver)?;
                require_assignable(receiver_ty, value_ty)
            }
            Statement::If {
                condition,
                then_block,
                else_block,
            } => {
                if self.visit_expression(condition)? != Type::Boolean {
                    return error("Condition must be a Boolean");
                }
                if then_block.is_empty() {
                    return error("Empty then block");
                }
                self.in_child_scope(|a| {
                    then_block.iter().try_for_each(|s| a.visit_statement(s))
                })?;
                self.in_child_scope(|a| {
                    else_block.iter().try_for_each(|s| a.visit_statement(s))
                })
            }
            Statement::Switch { condition, cases } => {
                let condition_ty = self.visit_expression(condition)?;
                let last = cases.len().saturating_sub(1);
                for (i, case) in cases.iter().enumerate() {
                    self.in_child_scope(|a| {
                        match &case.value {
                            Some(value) => {
                                if i == last {
                                    return error("Default case cannot have a value");
                                }
                                if a.visit_expression(value)? != condition_ty {
                                    return error("Case type does not match switch type");
                                }
                            }
                            None => {
                                if i != last {
                                    return error("Default case must be last");
                                }
                            }
                        }
                        case.body.iter().try_for_each(|s| a.visit_statement(s))
                    })?;
                }
                Ok(())
            }
            Statement::While { condition, body } => {
                let condition_ty = self.visit_expression(condition)?;
                require_assignable(Type::Boolean, condition_ty)?;
                self.in_child_scope(|a| body.iter().try_for_each(|s| a.visit_statement(s)))
            }
            Statement::Return(value) => {
                let value_ty = self.visit_expression(value)?;
                let sentinel = self
                    .env
                    .lookup_variable(self.scope, RETURN_TYPE_SENTINEL)?
                    .ty;
                require_assignable(sentinel, value_ty)
            }
        }
    }

    /// Analyzes one expression, binds its type in the side table, and
    /// returns that type.
    pub fn visit_expression(&mut self, expression: &Expression) -> Result<Type> {
        let ty = match expression {
            Expression::Literal { value, .. } => self.literal_type(value)?,
            Expression::Group { inner, .. } => {
                if !matches!(inner.as_ref(), Expression::Binary { .. }) {
                    return error("Group must contain a binary expression");
                }
                self.visit_expression(inner)?
            }
            Expression::Binary {
                op, left, right, ..
            } => {
                let left_ty = self.visit_expression(left)?;
                let right_ty = self.visit_expression(right)?;
                self.binary_type(*op, left_ty, right_ty)?
            }
            Expression::Access {
                id, name, offset, ..
            } => {
                if let Some(offset) = offset {
                    if self.visit_expression(offset)? != Type::Integer {
                        return error("List offset must be an Integer");
                    }
                }
                let variable = self.env.lookup_variable(self.scope, name)?.clone();
                let ty = variable.ty;
                self.analysis.variables.insert(*id, variable);
                ty
            }
            Expression::Call { id, name, args } => {
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args {
                    arg_types.push(self.visit_expression(arg)?);
                }
                let function = self
                    .env
                    .lookup_function(self.scope, name, args.len())?
                    .clone();
                for (parameter_ty, arg_ty) in function.parameter_types.iter().zip(arg_types) {
                    require_assignable(*parameter_ty, arg_ty)?;
                }
                let ty = function.return_type;
                self.analysis.functions.insert(*id, function);
                ty
            }
            Expression::List { elements, .. } => {
                let mut element_ty = None;
                for element in elements {
                    let ty = self.visit_expression(element)?;
                    match element_ty {
                        None => element_ty = Some(ty),
                        Some(expected) => require_assignable(expected, ty)?,
                    }
                }
                match element_ty {
                    Some(ty) => ty,
                    None => return error("Cannot infer the type of an empty list"),
                }
            }
        };
        self.analysis.types.insert(expression.id(), ty);
        Ok(ty)
    }

    fn literal_type(&self, literal: &Literal) -> Result<Type> {
        match literal {
            Literal::Nil => Ok(Type::Nil),
            Literal::Boolean(_) => Ok(Type::Boolean),
            Literal::Integer(value) => {
                if value.to_i32().is_none() {
                    return error("Integer literal out of range");
                }
                Ok(Type::Integer)
            }
            Literal::Decimal(value) => match value.to_f64() {
                Some(projected) if projected.is_finite() => Ok(Type::Decimal),
                _ => error("Decimal literal out of range"),
            },
            Literal::Character(_) => Ok(Type::Character),
            Literal::String(_) => Ok(Type::String),
        }
    }

    fn binary_type(&self, op: BinaryOp, left: Type, right: Type) -> Result<Type> {
        match op {
            BinaryOp::And | BinaryOp::Or => {
                if left != Type::Boolean || right != Type::Boolean {
                    return error("Both operands must be Boolean");
                }
                Ok(Type::Boolean)
            }
            BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Ne => {
                if !is_comparable(left) || !is_comparable(right) || left != right {
                    return error("Both operands must be Comparable and of the same type");
                }
                Ok(Type::Boolean)
            }
            BinaryOp::Add => {
                if left == Type::String || right == Type::String {
                    return Ok(Type::String);
                }
                if matches!(left, Type::Integer | Type::Decimal) && right == left {
                    Ok(left)
                } else {
                    error(format!("Cannot add {} and {}", left, right))
                }
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                if matches!(left, Type::Integer | Type::Decimal) && right == left {
                    Ok(left)
                } else {
                    error(format!(
                        "Cannot apply '{}' to {} and {}",
                        op, left, right
                    ))
                }
            }
            BinaryOp::Pow => {
                if matches!(left, Type::Integer | Type::Decimal) && right == Type::Integer {
                    Ok(left)
                } else {
                    error(format!(
                        "Exponentiation requires a numeric base and an Integer exponent, got {} and {}",
                        left, right
                    ))
                }
            }
        }
    }
}

/// Analyzes a program and returns the resolution side tables.
pub fn analyze(source: &Source) -> Result<Analysis> {
    let mut analyzer = Analyzer::new();
    analyzer.visit_source(source)?;
    Ok(analyzer.finish())
}
