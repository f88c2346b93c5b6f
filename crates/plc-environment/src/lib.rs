//! Shared environment for the PLC analyzer and interpreter: the static type
//! table, the runtime value representation, and the lexically scoped symbol
//! tables both passes walk.

pub mod scope;
pub mod types;
pub mod value;

pub use scope::{BuiltinFn, Environment, Function, Invoker, ScopeId, Variable};
pub use types::Type;
pub use value::Value;
