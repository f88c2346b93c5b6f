//! Runtime value types for the PLC interpreter.

use std::fmt;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

/// A runtime PLC value.
///
/// Equality is structural and type-sensitive: two values are equal iff they
/// carry the same variant with equal payloads. `Display` gives the textual
/// form used by `print` and by string concatenation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The unit value
    Nil,
    /// A boolean value
    Boolean(bool),
    /// An arbitrary-precision integer
    Integer(BigInt),
    /// An arbitrary-precision decimal
    Decimal(BigDecimal),
    /// A single Unicode code point
    Character(char),
    /// An immutable UTF-8 string
    Str(String),
    /// An ordered mutable sequence of values
    List(Vec<Value>),
}

impl Value {
    /// The source name of the runtime type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Decimal(_) => "Decimal",
            Value::Character(_) => "Character",
            Value::Str(_) => "String",
            Value::List(_) => "List",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "NIL"),
            Value::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Character(c) => write!(f, "{}", c),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, it) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", it)?;
                }
                write!(f, "]")
            }
        }
    }
}
