pub mod analyzer;

pub use analyzer::{analyze, assignable, Analysis, Analyzer};
