//! Type resolution over method-body trees.
//!
//! Types live in a [`TypeTable`] beside the tree. Every lowering step
//! resolves the subtree it produced before the walk moves on, so a rule
//! can always ask for the type of any child.

mod resolver;
mod table;


pub use resolver::Resolver;
pub use table::TypeTable;
