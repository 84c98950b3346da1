pub mod ast;
pub mod converter;
pub mod emitter;
pub mod error;
pub mod lexer;
pub mod parser;

pub use converter::parse;
pub use emitter::{compute_requires, generate};
pub use error::ParseError;
