//! Reading method bodies from their binary form.
//!
//! [`decode_body`] turns the byte stream of one method into an [`Ast`]
//! rooted at a block. [`Writer`] produces the same format and is what the
//! tests use to build inputs.
//!
//! [`Ast`]: crate::ast::Ast

mod cursor;
pub mod decoder;
mod locals;
pub mod opcodes;
pub mod writer;

#[cfg(test)]
mod decoder_test;

pub use cursor::Cursor;
pub use decoder::{Decoder, decode_body};
pub use locals::{Local, Locals};
pub use opcodes::NodeTag;
pub use writer::Writer;
