//! The tree-walking evaluator.
//!
//! Function invocation frames are children of the root scope: top-level
//! functions close over the globals, never over their caller's locals. The
//! current scope handle is saved and restored around every structured block,
//! so the parent scope survives runtime errors and `RETURN` unwinding alike.

use std::cmp::Ordering;
use std::rc::Rc;

use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, One, ToPrimitive, Zero};

use plc_environment::{Environment, Function, Invoker, ScopeId, Type, Value, Variable};
use plc_syntax::ast;
use plc_syntax::ast::{BinaryOp, Expression, Literal, Source, Statement};
use plc_syntax::error::{error, Result};

use crate::flow::Flow;

pub struct Interpreter {
    env: Environment,
    scope: ScopeId,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter whose root scope holds the builtin functions.
    pub fn new() -> Self {
        let mut env = Environment::new();
        let root = env.root();
        let builtins = [
            Function {
                name: "print".to_string(),
                target_name: "System.out.println".to_string(),
                parameter_types: vec![Type::Any],
                return_type: Type::Nil,
                invoker: Invoker::Builtin(builtin_print),
            },
            Function {
                name: "logarithm".to_string(),
                target_name: "Math.log".to_string(),
                parameter_types: vec![Type::Decimal],
                return_type: Type::Decimal,
                invoker: Invoker::Builtin(builtin_logarithm),
            },
            Function {
                name: "converter".to_string(),
                target_name: "Integer.toString".to_string(),
                parameter_types: vec![Type::Integer, Type::Integer],
                return_type: Type::String,
                invoker: Invoker::Builtin(builtin_converter),
            },
        ];
        for b in builtins {
            env.define_function(root, b)
                .expect("builtins are distinct");
        }
        Self { env, scope: root }
    }

    /// The active scope handle; restored after every run, successful or not.
    pub fn current_scope(&self) -> ScopeId {
        self.scope
    }

    /// Runs a program: globals allocate in the root scope, functions
    /// register their invokers there, then `main/0` is invoked and its
    /// result returned.
    pub fn run(&mut self, source: &Source) -> Result<Value> {
        for global in &source.globals {
            let value = match &global.value {
                Some(expression) => self.evaluate_expression(expression)?,
                None => Value::Nil,
            };
            let ty = Type::from_source_name(&global.type_name).unwrap_or(Type::Any);
            self.env.define_variable(
                self.scope,
                Variable {
                    name: global.name.clone(),
                    target_name: global.name.clone(),
                    ty,
                    mutable: global.mutable,
                    value,
                },
            )?;
        }
        for function in &source.functions {
            self.define_function(function)?;
        }
        self.call_function("main", Vec::new())
    }

    fn define_function(&mut self, function: &ast::Function) -> Result<()> {
        let parameter_types = function
            .parameters
            .iter()
            .map(|p| Type::from_source_name(&p.type_name).unwrap_or(Type::Any))
            .collect();
        let return_type = function
            .return_type_name
            .as_deref()
            .and_then(Type::from_source_name)
            .unwrap_or(Type::Nil);
        self.env.define_function(
            self.scope,
            Function {
                name: function.name.clone(),
                target_name: function.name.clone(),
                parameter_types,
                return_type,
                invoker: Invoker::Source(Rc::new(function.clone())),
            },
        )
    }

    /// Invokes `(name, arity)` with already-evaluated arguments.
    pub fn call_function(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        let function = self.env.lookup_function(self.scope, name, args.len())?.clone();
        match &function.invoker {
            Invoker::Builtin(builtin) => builtin(args),
            Invoker::Source(definition) => {
                let saved = self.scope;
                self.scope = self.env.push(self.env.root());
                let result = self.run_function_body(definition, &function, args);
                self.scope = saved;
                result
            }
        }
    }

    fn run_function_body(
        &mut self,
        definition: &ast::Function,
        function: &Function,
        args: Vec<Value>,
    ) -> Result<Value> {
        for ((parameter, ty), value) in definition
            .parameters
            .iter()
            .zip(&function.parameter_types)
            .zip(args)
        {
            self.env.define_variable(
                self.scope,
                Variable {
                    name: parameter.name.clone(),
                    target_name: parameter.name.clone(),
                    ty: *ty,
                    mutable: true,
                    value,
                },
            )?;
        }
        for statement in &definition.body {
            if let Flow::Return(value) = self.execute_statement(statement)? {
                return Ok(value);
            }
        }
        Ok(Value::Nil)
    }

    fn in_child_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.scope;
        self.scope = self.env.push(saved);
        let result = f(self);
        self.scope = saved;
        result
    }

    fn execute_block(&mut self, statements: &[Statement]) -> Result<Flow> {
        for statement in statements {
            if let Flow::Return(value) = self.execute_statement(statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_statement(&mut self, statement: &Statement) -> Result<Flow> {
        match statement {
            Statement::Expression(expression) => {
                self.evaluate_expression(expression)?;
                Ok(Flow::Normal)
            }
            Statement::Declaration { name, value, type_name, .. } => {
                let value = match value {
                    Some(expression) => self.evaluate_expression(expression)?,
                    None => Value::Nil,
                };
                let ty = type_name
                    .as_deref()
                    .and_then(Type::from_source_name)
                    .unwrap_or(Type::Any);
                self.env.define_variable(
                    self.scope,
                    Variable {
                        name: name.clone(),
                        target_name: name.clone(),
                        ty,
                        mutable: true,
                        value,
                    },
                )?;
                Ok(Flow::Normal)
            }
            Statement::Assignment { receiver, value } => {
                let (name, offset) = match receiver {
                    Expression::Access { name, offset, .. } => (name, offset),
                    _ => return error("Only access expressions are assignable"),
                };
                match offset {
                    Some(offset) => {
                        let index = self.evaluate_index(offset)?;
                        let value = self.evaluate_expression(value)?;
                        self.env.assign_element(self.scope, name, index, value)?;
                    }
                    None => {
                        let value = self.evaluate_expression(value)?;
                        self.env.assign(self.scope, name, value)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::If {
                condition,
                then_block,
                else_block,
            } => {
                let condition = self.evaluate_expression(condition)?;
                let block = if expect_boolean(condition)? {
                    then_block
                } else {
                    else_block
                };
                self.in_child_scope(|i| i.execute_block(block))
            }
            Statement::Switch { condition, cases } => {
                self.in_child_scope(|i| i.execute_switch(condition, cases))
            }
            Statement::While { condition, body } => {
                loop {
                    let value = self.evaluate_expression(condition)?;
                    if !expect_boolean(value)? {
                        break;
                    }
                    // a fresh scope per iteration
                    if let Flow::Return(value) =
                        self.in_child_scope(|i| i.execute_block(body))?
                    {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Return(value) => {
                let value = self.evaluate_expression(value)?;
                Ok(Flow::Return(value))
            }
        }
    }

    /// Runs exactly one arm: the first case whose value equals the
    /// condition, else the default.
    fn execute_switch(&mut self, condition: &Expression, cases: &[ast::Case]) -> Result<Flow> {
        let condition = self.evaluate_expression(condition)?;
        for case in cases {
            if let Some(value) = &case.value {
                if self.evaluate_expression(value)? == condition {
                    return self.in_child_scope(|i| i.execute_block(&case.body));
                }
            }
        }
        match cases.iter().find(|c| c.value.is_none()) {
            Some(default) => self.in_child_scope(|i| i.execute_block(&default.body)),
            None => Ok(Flow::Normal),
        }
    }

    pub fn evaluate_expression(&mut self, expression: &Expression) -> Result<Value> {
        match expression {
            Expression::Literal { value, .. } => Ok(literal_value(value)),
            Expression::Group { inner, .. } => self.evaluate_expression(inner),
            Expression::Binary {
                op, left, right, ..
            } => self.evaluate_binary(*op, left, right),
            Expression::Access { name, offset, .. } => {
                let variable = self.env.lookup_variable(self.scope, name)?.clone();
                match offset {
                    Some(offset) => {
                        let index = self.evaluate_index(offset)?;
                        match variable.value {
                            Value::List(items) => match items.get(index) {
                                Some(item) => Ok(item.clone()),
                                None => error(format!(
                                    "List index {} out of range for '{}' (length {})",
                                    index,
                                    name,
                                    items.len()
                                )),
                            },
                            other => error(format!(
                                "Variable '{}' holds {}, not a list",
                                name,
                                other.type_name()
                            )),
                        }
                    }
                    None => Ok(variable.value),
                }
            }
            Expression::Call { name, args, .. } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate_expression(arg)?);
                }
                self.call_function(name, values)
            }
            Expression::List { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate_expression(element)?);
                }
                Ok(Value::List(values))
            }
        }
    }

    fn evaluate_index(&mut self, offset: &Expression) -> Result<usize> {
        match self.evaluate_expression(offset)? {
            Value::Integer(i) => i
                .to_usize()
                .ok_or_else(|| format!("List index {} out of range", i).into()),
            other => error(format!(
                "Expected an Integer list offset, got {}",
                other.type_name()
            )),
        }
    }

    fn evaluate_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> Result<Value> {
        // && and || must not evaluate the right operand when the left decides
        match op {
            BinaryOp::And => {
                let left = expect_boolean(self.evaluate_expression(left)?)?;
                if !left {
                    return Ok(Value::Boolean(false));
                }
                let right = expect_boolean(self.evaluate_expression(right)?)?;
                return Ok(Value::Boolean(right));
            }
            BinaryOp::Or => {
                let left = expect_boolean(self.evaluate_expression(left)?)?;
                if left {
                    return Ok(Value::Boolean(true));
                }
                let right = expect_boolean(self.evaluate_expression(right)?)?;
                return Ok(Value::Boolean(right));
            }
            _ => {}
        }
        let left = self.evaluate_expression(left)?;
        let right = self.evaluate_expression(right)?;
        match op {
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
            BinaryOp::Lt => Ok(Value::Boolean(compare(&left, &right)? == Ordering::Less)),
            BinaryOp::Le => Ok(Value::Boolean(compare(&left, &right)? != Ordering::Greater)),
            BinaryOp::Gt => Ok(Value::Boolean(compare(&left, &right)? == Ordering::Greater)),
            BinaryOp::Ge => Ok(Value::Boolean(compare(&left, &right)? != Ordering::Less)),
            BinaryOp::Eq => Ok(Value::Boolean(left == right)),
            BinaryOp::Ne => Ok(Value::Boolean(left != right)),
            BinaryOp::Add => match (left, right) {
                (l @ Value::Str(_), r) | (l, r @ Value::Str(_)) => {
                    Ok(Value::Str(format!("{}{}", l, r)))
                }
                (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l + r)),
                (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(l + r)),
                (l, r) => error(format!(
                    "Invalid addition between {} and {}",
                    l.type_name(),
                    r.type_name()
                )),
            },
            BinaryOp::Sub => match (left, right) {
                (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l - r)),
                (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(l - r)),
                (l, r) => error(format!(
                    "Invalid arithmetic between {} and {}",
                    l.type_name(),
                    r.type_name()
                )),
            },
            BinaryOp::Mul => match (left, right) {
                (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l * r)),
                (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(l * r)),
                (l, r) => error(format!(
                    "Invalid arithmetic between {} and {}",
                    l.type_name(),
                    r.type_name()
                )),
            },
            BinaryOp::Div => match (left, right) {
                (Value::Integer(l), Value::Integer(r)) => {
                    if r.is_zero() {
                        return error("Division by zero");
                    }
                    // BigInt division truncates toward zero
                    Ok(Value::Integer(l / r))
                }
                (Value::Decimal(l), Value::Decimal(r)) => {
                    if r.is_zero() {
                        return error("Division by zero");
                    }
                    // round half-to-even at the scale of the left operand
                    let scale = l.fractional_digit_count();
                    Ok(Value::Decimal(
                        (l / r).with_scale_round(scale, RoundingMode::HalfEven),
                    ))
                }
                (l, r) => error(format!(
                    "Invalid division between {} and {}",
                    l.type_name(),
                    r.type_name()
                )),
            },
            BinaryOp::Pow => {
                let exponent = match right {
                    Value::Integer(e) => e,
                    other => {
                        return error(format!(
                            "Expected an Integer exponent, got {}",
                            other.type_name()
                        ))
                    }
                };
                if exponent.sign() == num_bigint::Sign::Minus {
                    return error("Negative exponent");
                }
                let exponent = exponent
                    .to_u32()
                    .ok_or_else(|| plc_syntax::error::Error::new("Exponent too large"))?;
                match left {
                    Value::Integer(base) => {
                        let mut result = BigInt::one();
                        for _ in 0..exponent {
                            result = &result * &base;
                        }
                        Ok(Value::Integer(result))
                    }
                    Value::Decimal(base) => {
                        let mut result = BigDecimal::one();
                        for _ in 0..exponent {
                            result = &result * &base;
                        }
                        Ok(Value::Decimal(result))
                    }
                    other => error(format!(
                        "Invalid arithmetic between {} and Integer",
                        other.type_name()
                    )),
                }
            }
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Nil => Value::Nil,
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Integer(n) => Value::Integer(n.clone()),
        Literal::Decimal(d) => Value::Decimal(d.clone()),
        Literal::Character(c) => Value::Character(*c),
        Literal::String(s) => Value::Str(s.clone()),
    }
}

fn expect_boolean(value: Value) -> Result<bool> {
    match value {
        Value::Boolean(b) => Ok(b),
        other => error(format!("Expected a Boolean, got {}", other.type_name())),
    }
}

/// Orders two values of the same comparable type.
fn compare(left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => Ok(l.cmp(r)),
        (Value::Decimal(l), Value::Decimal(r)) => Ok(l.cmp(r)),
        (Value::Character(l), Value::Character(r)) => Ok(l.cmp(r)),
        (Value::Str(l), Value::Str(r)) => Ok(l.cmp(r)),
        (l, r) => error(format!(
            "Cannot compare {} and {}",
            l.type_name(),
            r.type_name()
        )),
    }
}

/// `print/1`: writes the argument's display form and a newline to stdout.
fn builtin_print(args: Vec<Value>) -> Result<Value> {
    println!("{}", args[0]);
    Ok(Value::Nil)
}

/// `logarithm/1`: natural logarithm of a Decimal, projected through double
/// precision.
fn builtin_logarithm(args: Vec<Value>) -> Result<Value> {
    let value = match &args[0] {
        Value::Decimal(d) => d,
        other => {
            return error(format!(
                "Expected type Decimal, received {}",
                other.type_name()
            ))
        }
    };
    let projected = match value.to_f64() {
        Some(f) => f.ln(),
        None => return error("Decimal out of range"),
    };
    match BigDecimal::from_f64(projected) {
        Some(result) if projected.is_finite() => Ok(Value::Decimal(result)),
        _ => error("Logarithm of a non-positive value"),
    }
}

/// `converter/2`: the textual form of an Integer in the given base, built by
/// repeated division (digits 0-9, so bases up to 10).
fn builtin_converter(args: Vec<Value>) -> Result<Value> {
    let (value, base) = match (&args[0], &args[1]) {
        (Value::Integer(v), Value::Integer(b)) => (v, b),
        (l, r) => {
            return error(format!(
                "Expected type Integer, received {} and {}",
                l.type_name(),
                r.type_name()
            ))
        }
    };
    if *base <= BigInt::one() {
        return error("Base must be greater than 1");
    }
    let mut digits = String::new();
    let mut quotient = value.clone();
    loop {
        let next = &quotient / base;
        let remainder = &quotient - &next * base;
        digits = format!("{}{}", remainder, digits);
        quotient = next;
        if quotient <= BigInt::zero() {
            break;
        }
    }
    Ok(Value::Str(digits))
}
