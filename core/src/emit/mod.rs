//! Java text for lowered method bodies.
//!
//! The emitter walks the tree once. Parenthesization is decided from the
//! [`precedence`] table and indentation is kept by the [`Sb`] sink rather
//! than by recursion depth, since one expression node (a lambda body, a
//! switch expression) may print several lines.

mod emitter;
pub mod precedence;
pub mod sink;

#[cfg(test)]
mod emitter_test;

pub use emitter::Emitter;
pub use sink::Sb;

use crate::ast::{Ast, NodeId};
use crate::errors::{Error, Result};
use crate::pool::ConstantPool;
use crate::resolve::TypeTable;
use tracing::debug;

/// Prints the root block of `ast`.
pub fn emit_body<'t>(
    ast: &Ast<'t>,
    pool: &ConstantPool<'t>,
    table: &TypeTable<'t>,
    indent: &'static str,
) -> Result<String> {
    let root = ast
        .root()
        .ok_or_else(|| Error::structure("Block", None, "tree has no root"))?;
    let mut emitter = Emitter::new(ast, pool, table, indent);
    emitter.body(root)?;
    let text = emitter.finish();
    debug!(nodes = ast.len(), bytes = text.len(), "Emitted method body");
    Ok(text)
}

/// Prints one expression on its own.
pub fn emit_expression<'t>(
    ast: &Ast<'t>,
    pool: &ConstantPool<'t>,
    table: &TypeTable<'t>,
    id: NodeId,
) -> Result<String> {
    let mut emitter = Emitter::new(ast, pool, table, "    ");
    emitter.expression(id)?;
    Ok(emitter.finish())
}
