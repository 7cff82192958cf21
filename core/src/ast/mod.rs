//! Method-body trees.
//!
//! Nodes live in a flat arena ([`Ast`]) and refer to each other by
//! [`NodeId`]. Each node has a fixed number of child slots and an upward
//! parent index; resolved types are kept outside the tree, in the
//! resolver's side table.

pub mod arena;
pub mod block;
pub mod node;
pub mod ops;


pub use arena::Ast;
pub use block::BlockScope;
pub use node::{CaseLabel, Conv, NativeArm, NativeSwitch, Node, NodeId, NodeKind, SwitchInfo};
pub use ops::{AssignOp, BinOp, UnOp};
