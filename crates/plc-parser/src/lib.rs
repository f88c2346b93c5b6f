pub mod parser;

pub use parser::{Parser, Pattern};
