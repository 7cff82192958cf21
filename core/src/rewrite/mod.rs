//! Lowering of constructs Java has no direct form for.
//!
//! The walk is preorder: every child slot is lowered to a fixed point
//! before the walk descends into it, and each replacement subtree is
//! resolved as soon as it is built. Rules that need context search upward
//! through parent links, which the walk keeps current.
//!
//! Rules are grouped by construct:
//! - [`elvis`]: null short-circuit markers and `?:`
//! - [`cond_assign`]: `:=` and `?=` in conditions and statements
//! - [`switch`]: flavor selection and switch lowering
//! - [`funky`]: type-level equals/compare/hashCode
//! - [`secondary`]: indexing, ranges, defaults, boxing, comparisons,
//!   multi-value assignment and returns
//! - [`flow`]: break and continue targets
//! - [`capture`]: final copies for lambda captures

mod capture;
mod cond_assign;
mod elvis;
mod flow;
mod funky;
mod secondary;
pub mod switch;


use crate::api::TranslateOptions;
use crate::ast::{AssignOp, Ast, BinOp, BlockScope, NodeId, NodeKind, UnOp};
use crate::errors::{Error, Result};
use crate::pool::{Const, ConstantPool, MethodInfo};
use crate::resolve::{Resolver, TypeTable};
use crate::types::{Prim, Type, TypeManager};
use tracing::{debug, trace};

pub use switch::{Flavor, classify};

/// Per-body state of the lowering pass.
pub struct Rewriter<'a, 't> {
    pub(crate) ast: &'a mut Ast<'t>,
    pub(crate) pool: &'a mut ConstantPool<'t>,
    pub(crate) types: &'t TypeManager<'t>,
    pub(crate) table: &'a mut TypeTable<'t>,
    pub(crate) method: &'a MethodInfo<'t>,
    pub(crate) options: &'a TranslateOptions,
}

impl<'a, 't> Rewriter<'a, 't> {
    pub fn new(
        ast: &'a mut Ast<'t>,
        pool: &'a mut ConstantPool<'t>,
        types: &'t TypeManager<'t>,
        table: &'a mut TypeTable<'t>,
        method: &'a MethodInfo<'t>,
        options: &'a TranslateOptions,
    ) -> Self {
        Rewriter {
            ast,
            pool,
            types,
            table,
            method,
            options,
        }
    }

    /// Lowers the whole tree. The tree must have been resolved.
    pub fn run(&mut self) -> Result<()> {
        let root = self
            .ast
            .root()
            .ok_or_else(|| Error::structure("Block", None, "tree has no root"))?;
        debug!(method = %self.method.name, nodes = self.ast.len(), "Rewriting method body");

        let root = self.lower_fixed(root)?;
        self.ast.set_root(root);
        self.descend(root)?;

        debug!(method = %self.method.name, nodes = self.ast.len(), "Rewrote method body");
        Ok(())
    }

    fn descend(&mut self, id: NodeId) -> Result<()> {
        for slot in 0..self.ast.kids(id).len() {
            let Some(kid) = self.ast.kid(id, slot) else {
                continue;
            };
            self.ast.set_parent(kid, id);
            let kid = self.lower_fixed(kid)?;
            self.descend(kid)?;
        }
        Ok(())
    }

    /// Lowers `id` until no rule applies, keeping the result in `id`'s slot.
    fn lower_fixed(&mut self, id: NodeId) -> Result<NodeId> {
        let mut current = id;
        let mut rewrites = 0;
        loop {
            // Rules may move `current` under its replacement, so the slot
            // is taken before the rule runs.
            let parent = self.ast.parent(current);
            let slot = parent.and_then(|p| self.ast.slot_of(p, current));
            let Some(next) = self.lower(current)? else {
                return Ok(current);
            };
            rewrites += 1;
            if rewrites > self.options.max_rewrites_per_slot {
                return Err(Error::structure(
                    self.ast.kind(current).name(),
                    Some(current),
                    "rewriting did not reach a fixed point",
                ));
            }
            if next != current {
                match (parent, slot) {
                    (Some(parent), Some(slot)) => self.ast.set_kid(parent, slot, Some(next)),
                    _ if self.ast.root() == Some(current) => self.ast.set_root(next),
                    _ => return Err(self.error(current, "rewritten node has no parent")),
                }
            }
            trace!(from = %current, to = %next, kind = self.ast.kind(next).name(), "Lowered");
            self.resolve(next)?;
            current = next;
        }
    }

    /// One lowering step. `Some(id)` with the same id means the node was
    /// changed in place.
    fn lower(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        if self.in_statement_slot(id) {
            if let Some(new) = self.lower_statement(id)? {
                return Ok(Some(new));
            }
        }
        match self.ast.kind(id) {
            NodeKind::BinaryOp(BinOp::CondElse) => self.lower_cond_else(id),
            NodeKind::BinaryOp(op) => {
                let op = *op;
                self.lower_binary(id, op)
            }
            NodeKind::UnaryOp(UnOp::Elvis) => Err(self.error(
                id,
                "null short-circuit outside of a statement or `?:`",
            )),
            NodeKind::Switch(_) => self.lower_switch(id),
            NodeKind::Invoke { .. } => self.lower_invoke(id),
            NodeKind::New { .. } | NodeKind::NewVirtual { .. } => self.lower_new(id),
            NodeKind::CompareChain { .. } => self.lower_compare_chain(id),
            NodeKind::DivRem => self.lower_div_rem(id),
            NodeKind::Unpack => self.ast.expect_kid(id, 0).map(Some),
            NodeKind::Assign(AssignOp::Asn) => self.lower_assign(id),
            NodeKind::Assign(op) if op.is_conditional() => {
                Err(self.error(id, "conditional assignment outside of a condition or statement"))
            }
            NodeKind::Return => self.lower_return(id),
            NodeKind::ForRange { .. } => self.lower_for_range(id),
            NodeKind::Break { .. } => self.lower_break(id),
            NodeKind::Continue { .. } => self.lower_continue(id),
            NodeKind::Convert { .. } => self.lower_convert(id),
            _ => Ok(None),
        }
    }

    /// Rules that look at a whole statement.
    fn lower_statement(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        if let Some(new) = self.lower_condition_list(id)? {
            return Ok(Some(new));
        }
        if let Some(new) = self.lower_conditional_assignment(id)? {
            return Ok(Some(new));
        }
        if let Some(new) = self.ground_elvis(id)? {
            return Ok(Some(new));
        }
        if let Some(new) = self.capture_finals(id)? {
            return Ok(Some(new));
        }
        self.lower_multi_assign(id)
    }

    // === Shared helpers ===

    pub(crate) fn error(&self, id: NodeId, reason: impl Into<String>) -> Error {
        Error::structure(self.ast.kind(id).name(), Some(id), reason)
    }

    pub(crate) fn resolve(&mut self, id: NodeId) -> Result<&'t Type<'t>> {
        Resolver::new(self.types, self.pool, self.options.check_types).resolve(
            self.ast,
            self.table,
            id,
        )
    }

    pub(crate) fn ty(&self, id: NodeId) -> Result<&'t Type<'t>> {
        self.table.ty(id)
    }

    pub(crate) fn kid(&self, id: NodeId, slot: usize) -> Result<NodeId> {
        self.ast.expect_kid(id, slot)
    }

    /// Present children, in slot order.
    pub(crate) fn present_kids(&self, id: NodeId) -> Vec<NodeId> {
        self.ast.kids(id).iter().flatten().copied().collect()
    }

    pub(crate) fn constant(&mut self, value: Const<'t>) -> NodeId {
        let id = self.pool.add(value);
        self.ast.leaf(NodeKind::Constant(id))
    }

    pub(crate) fn const_value(&self, id: NodeId) -> Option<&Const<'t>> {
        match self.ast.kind(id) {
            NodeKind::Constant(c) => self.pool.get(*c).ok(),
            _ => None,
        }
    }

    pub(crate) fn reg(&mut self, name: &str, ty: &'t Type<'t>) -> NodeId {
        self.ast.leaf(NodeKind::RegisterRef {
            name: name.to_string(),
            ty,
        })
    }

    pub(crate) fn binary(&mut self, op: BinOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.ast.branch(NodeKind::BinaryOp(op), &[lhs, rhs])
    }

    pub(crate) fn assign(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.ast.branch(NodeKind::Assign(AssignOp::Asn), &[lhs, rhs])
    }

    /// `a && b && ...`, left-associated. `None` for an empty list.
    pub(crate) fn and_all(&mut self, tests: impl IntoIterator<Item = NodeId>) -> Option<NodeId> {
        tests
            .into_iter()
            .reduce(|acc, test| self.binary(BinOp::And, acc, test))
    }

    pub(crate) fn block(&mut self, scope: BlockScope<'t>, stmts: &[NodeId]) -> NodeId {
        self.ast.branch(NodeKind::Block(Box::new(scope)), stmts)
    }

    pub(crate) fn stmts(&mut self, stmts: &[NodeId]) -> NodeId {
        self.ast.branch(NodeKind::Multi { stmts: true }, stmts)
    }

    /// Fresh temp declared in the block enclosing `near`.
    pub(crate) fn temp(&mut self, near: NodeId, ty: &'t Type<'t>) -> Result<String> {
        let block = self.ast.enclosing_block(near)?;
        self.ast.request_temp(block, ty)
    }

    /// Call of a runtime helper, printed without a receiver. Each
    /// parameter takes the type of its argument, so no conversion is
    /// inserted later.
    pub(crate) fn runtime_call(
        &mut self,
        name: &str,
        ret: &'t Type<'t>,
        args: &[NodeId],
    ) -> Result<NodeId> {
        let mut info = MethodInfo::new(name, self.types.object()).static_();
        for (i, arg) in args.iter().enumerate() {
            let ty = match self.table.get(*arg) {
                Some(ty) => ty,
                None => self.resolve(*arg)?,
            };
            info = info.param(&format!("a{}", i), ty);
        }
        let info = info.returns(ret);
        let method = self.pool.add(Const::Method(Box::new(info)));
        let kids = core::iter::once(None).chain(args.iter().copied().map(Some));
        Ok(self.ast.add(NodeKind::Invoke { method }, kids))
    }

    /// `$t(expr)`: evaluates `expr` for its side effects and yields true.
    pub(crate) fn always_true(&mut self, expr: NodeId) -> Result<NodeId> {
        let bool_ty = self.types.bool();
        self.runtime_call("$t", bool_ty, &[expr])
    }

    /// The `$COND` flag written by a conditional return.
    pub(crate) fn cond_flag(&mut self) -> NodeId {
        let bool_ty = self.types.bool();
        self.reg("$COND", bool_ty)
    }

    /// Constant holding the zero value of `ty`.
    pub(crate) fn zero(&mut self, ty: &'t Type<'t>) -> NodeId {
        let value = match ty {
            Type::Prim(Prim::Bool) => Const::Bool(false),
            Type::Prim(Prim::Char) => Const::Char('\0'),
            Type::Prim(Prim::Float | Prim::Double) => Const::Float(0.0),
            Type::Prim(p) => Const::Int {
                value: 0,
                format: match p {
                    Prim::Long => crate::pool::IntFormat::Int64,
                    _ => crate::pool::IntFormat::Int32,
                },
            },
            _ => Const::Null,
        };
        self.constant(value)
    }

    /// Expressions that may be evaluated twice without a temp.
    pub(crate) fn is_pure(&self, id: NodeId) -> bool {
        matches!(
            self.ast.kind(id),
            NodeKind::RegisterRef { .. } | NodeKind::Constant(_)
        )
    }

    /// Makes `expr` reusable. Returns the node to evaluate first (an
    /// assignment to a new temp, or `expr` itself when it is pure) and a
    /// factory for later references.
    pub(crate) fn hoist(&mut self, near: NodeId, expr: NodeId) -> Result<(NodeId, Reuse<'t>)> {
        if self.is_pure(expr) {
            return Ok((expr, Reuse::Copy(expr)));
        }
        let ty = self.ty(expr)?;
        let name = self.temp(near, ty)?;
        let target = self.reg(&name, ty);
        let first = self.assign(target, expr);
        Ok((first, Reuse::Temp(name, ty)))
    }

    /// Another reference to a hoisted value.
    pub(crate) fn reuse(&mut self, reuse: &Reuse<'t>) -> NodeId {
        match reuse {
            Reuse::Temp(name, ty) => self.reg(name, ty),
            Reuse::Copy(id) => self.ast.clone_subtree(*id),
        }
    }

    pub(crate) fn in_statement_slot(&self, id: NodeId) -> bool {
        match self.ast.parent(id) {
            Some(parent) => match self.ast.slot_of(parent, id) {
                Some(slot) => is_statement_slot(self.ast.kind(parent), slot, self.ast.kids(parent).len()),
                None => false,
            },
            None => self.ast.root() == Some(id),
        }
    }

    /// Nodes of the expression part of `stmt`, parents first. Nested
    /// statements are not entered; `skip` prunes further subtrees.
    pub(crate) fn expression_nodes(
        &self,
        stmt: NodeId,
        skip: impl Fn(&NodeKind<'t>, usize) -> bool,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![stmt];
        while let Some(id) = stack.pop() {
            if id != stmt {
                out.push(id);
            }
            let kind = self.ast.kind(id);
            let kids = self.ast.kids(id);
            for (slot, kid) in kids.iter().enumerate().rev() {
                let Some(kid) = kid else { continue };
                if is_statement_slot(kind, slot, kids.len()) || skip(kind, slot) {
                    continue;
                }
                stack.push(*kid);
            }
        }
        out
    }

    /// Wraps a non-block statement into a block so statements can be
    /// placed before or after it.
    pub(crate) fn block_statements(&self, body: NodeId) -> Vec<NodeId> {
        match self.ast.kind(body) {
            NodeKind::Block(_) => self.present_kids(body),
            NodeKind::NoOp => Vec::new(),
            _ => vec![body],
        }
    }

    /// Turns `T x = rhs` into `x = rhs`, returning the hoisted `T x = zero`
    /// so the declaration can move out of a new scope around the
    /// statement.
    pub(crate) fn split_declaration(&mut self, stmt: NodeId) -> Result<Option<NodeId>> {
        if !matches!(self.ast.kind(stmt), NodeKind::Assign(_)) {
            return Ok(None);
        }
        let target = self.kid(stmt, 0)?;
        let NodeKind::Define { name, ty } = self.ast.kind(target) else {
            return Ok(None);
        };
        let (name, ty) = (name.clone(), *ty);
        let reference = self.reg(&name, ty);
        self.ast.set_kid(stmt, 0, Some(reference));
        let decl = self.ast.leaf(NodeKind::Define { name, ty });
        let zero = self.zero(ty);
        Ok(Some(self.assign(decl, zero)))
    }

    /// `stmts` followed by the statements of `body`, as one block that
    /// keeps `body`'s scope.
    pub(crate) fn prepend(&mut self, body: NodeId, stmts: &[NodeId]) -> NodeId {
        let scope = match self.ast.kind_mut(body) {
            NodeKind::Block(scope) => core::mem::take(&mut **scope),
            _ => BlockScope::new(),
        };
        let mut all = stmts.to_vec();
        all.extend(self.block_statements(body));
        self.block(scope, &all)
    }
}

/// How a hoisted value is referenced again.
pub(crate) enum Reuse<'t> {
    Temp(String, &'t Type<'t>),
    Copy(NodeId),
}

/// Whether child `slot` of a node of `kind` holds a statement.
pub(crate) fn is_statement_slot(kind: &NodeKind<'_>, slot: usize, len: usize) -> bool {
    match kind {
        NodeKind::Block(_) | NodeKind::Multi { stmts: true } => true,
        NodeKind::If => slot >= 1,
        NodeKind::While { .. } => slot == 1,
        NodeKind::DoWhile { .. } => slot == 0,
        NodeKind::ForClassic { .. } => slot != 1,
        NodeKind::ForIterate { .. } | NodeKind::ForRange { .. } => slot == 2,
        NodeKind::Switch(info) => !info.is_expr && slot >= 1,
        NodeKind::TryCatch {
            resources,
            finally,
            ..
        } => {
            if *finally && slot + 1 == len {
                return true;
            }
            // [resource..., body, (var, handler)...]
            slot >= *resources && (slot - resources) % 2 == 0
        }
        NodeKind::StmtExpr { .. } => slot == 0,
        _ => false,
    }
}
