use crate::ast::block::BlockScope;
use crate::ast::node::{Kids, Node, NodeId, NodeKind};
use crate::errors::{Error, Result};
use crate::types::Type;
use core::fmt::Write;

/// Flat arena holding one method body's tree.
///
/// Replacing a child is a slot update; detached subtrees simply stay
/// unreachable until the tree is dropped.
#[derive(Debug, Clone, Default)]
pub struct Ast<'t> {
    nodes: Vec<Node<'t>>,
    root: Option<NodeId>,
    // Source of unique temp and label names within this tree.
    next_name: u32,
}

impl<'t> Ast<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: NodeKind<'t>, kids: impl IntoIterator<Item = Option<NodeId>>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let kids: Kids = kids.into_iter().collect();
        for kid in kids.iter().flatten() {
            self.nodes[kid.0 as usize].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            kids,
            parent: None,
        });
        id
    }

    /// Node without children.
    pub fn leaf(&mut self, kind: NodeKind<'t>) -> NodeId {
        self.add(kind, [])
    }

    /// Node whose children are all present.
    pub fn branch(&mut self, kind: NodeKind<'t>, kids: &[NodeId]) -> NodeId {
        self.add(kind, kids.iter().copied().map(Some))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.nodes[root.0 as usize].parent = None;
        self.root = Some(root);
    }

    pub fn node(&self, id: NodeId) -> &Node<'t> {
        &self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind<'t> {
        &self.nodes[id.0 as usize].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind<'t> {
        &mut self.nodes[id.0 as usize].kind
    }

    pub fn kids(&self, id: NodeId) -> &[Option<NodeId>] {
        &self.nodes[id.0 as usize].kids
    }

    pub fn kid(&self, id: NodeId, slot: usize) -> Option<NodeId> {
        self.kids(id).get(slot).copied().flatten()
    }

    /// Child that must be present.
    pub fn expect_kid(&self, id: NodeId, slot: usize) -> Result<NodeId> {
        self.kid(id, slot).ok_or_else(|| {
            Error::structure(
                self.kind(id).name(),
                Some(id),
                format!("missing child {}", slot),
            )
        })
    }

    pub fn set_kid(&mut self, id: NodeId, slot: usize, kid: Option<NodeId>) {
        self.nodes[id.0 as usize].kids[slot] = kid;
        if let Some(kid) = kid {
            self.nodes[kid.0 as usize].parent = Some(id);
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0 as usize].parent
    }

    pub fn set_parent(&mut self, id: NodeId, parent: NodeId) {
        self.nodes[id.0 as usize].parent = Some(parent);
    }

    /// Slot of `kid` within `parent`.
    pub fn slot_of(&self, parent: NodeId, kid: NodeId) -> Option<usize> {
        self.kids(parent).iter().position(|k| *k == Some(kid))
    }

    /// Puts `new` where `old` hangs under its parent (or at the root).
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        if self.root == Some(old) {
            self.set_root(new);
            return Ok(());
        }
        let parent = self.parent(old).ok_or_else(|| {
            Error::structure(self.kind(old).name(), Some(old), "node has no parent")
        })?;
        let slot = self.slot_of(parent, old).ok_or_else(|| {
            Error::structure(
                self.kind(parent).name(),
                Some(parent),
                format!("{} is not a child", old),
            )
        })?;
        self.set_kid(parent, slot, Some(new));
        Ok(())
    }

    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_, 't> {
        Ancestors {
            ast: self,
            next: self.parent(id),
        }
    }

    /// Nearest block strictly above `id`.
    pub fn enclosing_block(&self, id: NodeId) -> Result<NodeId> {
        self.ancestors(id)
            .find(|a| matches!(self.kind(*a), NodeKind::Block(_)))
            .ok_or_else(|| {
                Error::structure(self.kind(id).name(), Some(id), "no enclosing block")
            })
    }

    pub fn block_mut(&mut self, id: NodeId) -> Result<&mut BlockScope<'t>> {
        match &mut self.nodes[id.0 as usize].kind {
            NodeKind::Block(scope) => Ok(scope),
            other => Err(Error::structure(other.name(), Some(id), "expected a block")),
        }
    }

    pub fn fresh_name(&mut self, base: &str) -> String {
        let n = self.next_name;
        self.next_name += 1;
        format!("{}{}", base, n)
    }

    /// Fresh temp of `ty` declared in `block`'s prologue.
    pub fn request_temp(&mut self, block: NodeId, ty: &'t Type<'t>) -> Result<String> {
        self.request_named_temp(block, ty, "$t")
    }

    /// Like `request_temp`, with a caller-chosen prefix.
    pub fn request_named_temp(&mut self, block: NodeId, ty: &'t Type<'t>, base: &str) -> Result<String> {
        let name = self.fresh_name(base);
        self.block_mut(block)?.add_temp(ty, name.clone());
        Ok(name)
    }

    /// Deep copy of the subtree under `id`. The copy is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let kind = self.kind(id).clone();
        let kids: Vec<Option<NodeId>> = self.kids(id).to_vec();
        let kids: Vec<Option<NodeId>> = kids
            .into_iter()
            .map(|kid| kid.map(|kid| self.clone_subtree(kid)))
            .collect();
        self.add(kind, kids)
    }

    /// Every node reachable from `id`, parents before children.
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            for kid in self.kids(next).iter().rev().flatten() {
                stack.push(*kid);
            }
        }
        out
    }

    /// Compact s-expression of the subtree, used to compare tree shapes.
    pub fn shape(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_shape(id, &mut out);
        out
    }

    fn write_shape(&self, id: NodeId, out: &mut String) {
        let kind = self.kind(id);
        let _ = write!(out, "({}", kind.name());
        match kind {
            NodeKind::RegisterRef { name, .. } | NodeKind::Define { name, .. } => {
                let _ = write!(out, " {}", name);
            }
            NodeKind::Constant(c) => {
                let _ = write!(out, " {}", c);
            }
            NodeKind::BinaryOp(op) | NodeKind::Order(op) => {
                let _ = write!(out, " {}", op.text());
            }
            NodeKind::UnaryOp(op) => {
                let _ = write!(out, " {}", op.text());
            }
            NodeKind::Assign(op) => {
                let _ = write!(out, " {}", op.text());
            }
            _ => {}
        }
        for kid in self.kids(id) {
            match kid {
                Some(kid) => {
                    out.push(' ');
                    self.write_shape(*kid, out);
                }
                None => out.push_str(" _"),
            }
        }
        out.push(')');
    }
}

pub struct Ancestors<'a, 't> {
    ast: &'a Ast<'t>,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_, '_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.ast.parent(id);
        Some(id)
    }
}
