mod parser;
mod unit;

pub use parser::SourceParser;
pub use unit::{CallSite, Callable, CallableKind, Decorator, Import, SourceUnit};
