//! Semantic-analysis front end for the Quill language: an interpolating
//! lexer feeding the parser, a module/package resolution pass, and an
//! expression/declaration type checker producing a fully type-annotated
//! declaration model.

pub mod analyzer;
pub mod diagnostics;
pub mod language;
pub mod model;
