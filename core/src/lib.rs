//! Translation of XVM method bodies into Java source.
//!
//! The pipeline runs per method body: [`decode`] reads the binary tree,
//! [`resolve`] records a Java type for every node, [`rewrite`] lowers the
//! constructs Java cannot express directly and [`emit`] prints the result.
//! [`api`] wires the passes together.

pub mod api;
pub mod ast;
pub mod decode;
pub mod emit;
pub mod errors;
pub mod pool;
pub mod resolve;
pub mod rewrite;
pub mod types;
