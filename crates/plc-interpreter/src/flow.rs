//! Control flow for the interpreter.

use plc_environment::Value;

/// Outcome of executing a statement. `Return` unwinds to the enclosing
/// function invocation; nothing else consumes it.
#[derive(Debug)]
pub(crate) enum Flow {
    /// Continue normal execution
    Normal,
    /// Return from the enclosing function with the given value
    Return(Value),
}
