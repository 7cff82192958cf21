//! Errors raised while translating one method body.
//!
//! Every error is fatal for the body being translated and harmless for
//! every other body: nothing that outlives a single tree is touched.

use crate::ast::NodeId;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed or unsupported byte stream.
    #[error("decode error at offset {offset}{}: {reason}", opcode_suffix(.opcode))]
    Decode {
        offset: usize,
        opcode: Option<i64>,
        reason: String,
    },

    /// A lowering rule met a tree shape it does not handle.
    #[error("unexpected {kind}{}: {reason}", node_suffix(.node))]
    Structure {
        kind: &'static str,
        node: Option<NodeId>,
        reason: String,
    },

    /// Re-resolving a node produced a different type than the first time.
    #[error("type of node {node} changed from `{before}` to `{after}`")]
    TypeInvariant {
        node: NodeId,
        before: String,
        after: String,
    },
}

impl Error {
    pub fn decode(offset: usize, opcode: Option<i64>, reason: impl Into<String>) -> Self {
        Error::Decode {
            offset,
            opcode,
            reason: reason.into(),
        }
    }

    pub fn structure(kind: &'static str, node: Option<NodeId>, reason: impl Into<String>) -> Self {
        Error::Structure {
            kind,
            node,
            reason: reason.into(),
        }
    }

    /// Short stable code used in diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Decode { .. } => "X001",
            Error::Structure { .. } => "X002",
            Error::TypeInvariant { .. } => "X003",
        }
    }
}

fn opcode_suffix(opcode: &Option<i64>) -> String {
    match opcode {
        Some(op) => format!(" (opcode {})", op),
        None => String::new(),
    }
}

fn node_suffix(node: &Option<NodeId>) -> String {
    match node {
        Some(id) => format!(" at node {}", id),
        None => String::new(),
    }
}
