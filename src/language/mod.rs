pub mod ast;
pub mod errors;
pub mod interpolation;
pub mod lexer;
pub mod span;
pub mod token;
