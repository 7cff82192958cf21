use crate::ast::{BinOp, NodeId, NodeKind, UnOp};
use crate::errors::Result;
use crate::pool::Const;
use crate::rewrite::{Rewriter, is_statement_slot};

impl<'a, 't> Rewriter<'a, 't> {
    /// `a ?: b`. Markers inside `a` are grounded here; without markers `a`
    /// is evaluated once into a temp.
    pub(crate) fn lower_cond_else(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let lhs = self.kid(id, 0)?;
        let mut markers = Vec::new();
        self.collect_markers(lhs, &mut markers);
        if is_marker(self, lhs) {
            markers.push(lhs);
        }

        if markers.is_empty() {
            let ty = self.ty(lhs)?;
            if ty.is_prim() {
                return Ok(Some(lhs));
            }
            let rhs = self.kid(id, 1)?;
            let name = self.temp(id, ty)?;
            let target = self.reg(&name, ty);
            let store = self.assign(target, lhs);
            let null = self.constant(Const::Null);
            let test = self.binary(BinOp::Ne, store, null);
            let value_ty = self.types.non_null(ty);
            let value = self.reg(&name, value_ty);
            return Ok(Some(self.ast.branch(NodeKind::Ternary, &[test, value, rhs])));
        }

        let tests = self.ground_markers(&markers)?;
        let lhs = self.kid(id, 0)?;
        let rhs = self.kid(id, 1)?;
        match self.and_all(tests) {
            Some(test) => Ok(Some(self.ast.branch(NodeKind::Ternary, &[test, lhs, rhs]))),
            None => Ok(Some(lhs)),
        }
    }

    /// Grounds the markers of a statement's expressions at the statement.
    pub(crate) fn ground_elvis(&mut self, stmt: NodeId) -> Result<Option<NodeId>> {
        let mut markers = Vec::new();
        self.collect_markers(stmt, &mut markers);
        if markers.is_empty() {
            return Ok(None);
        }

        let cond_slot = match self.ast.kind(stmt) {
            NodeKind::Return | NodeKind::Throw => {
                return Err(self.error(stmt, "null short-circuit in a return or throw"));
            }
            NodeKind::Assert if markers.iter().any(|m| self.is_under(*m, stmt, 1)) => {
                return Err(self.error(stmt, "null short-circuit in an assertion message"));
            }
            NodeKind::If | NodeKind::While { .. } | NodeKind::Assert => Some(0),
            NodeKind::DoWhile { .. } | NodeKind::ForClassic { .. } => Some(1),
            _ => None,
        };
        if let Some(parent) = self.ast.parent(stmt) {
            let slot = self.ast.slot_of(parent, stmt);
            if matches!(self.ast.kind(parent), NodeKind::ForClassic { .. }) && slot != Some(3) {
                return Err(self.error(stmt, "null short-circuit in a loop header"));
            }
        }

        let tests = self.ground_markers(&markers)?;
        match cond_slot {
            Some(slot) => {
                let cond = self.kid(stmt, slot)?;
                let test = self.and_all(tests.into_iter().chain([cond]));
                self.ast.set_kid(stmt, slot, test);
                Ok(Some(stmt))
            }
            None => {
                let Some(test) = self.and_all(tests) else {
                    return Ok(Some(stmt));
                };
                let decl = self.split_declaration(stmt)?;
                let guarded = self.ast.add(NodeKind::If, [Some(test), Some(stmt), None]);
                match decl {
                    Some(decl) => Ok(Some(self.stmts(&[decl, guarded]))),
                    None => Ok(Some(guarded)),
                }
            }
        }
    }

    /// Markers below `id`, innermost first. Nested statements and the
    /// tested side of a nested `?:` ground their own markers.
    fn collect_markers(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let kind = self.ast.kind(id);
        let kids = self.ast.kids(id);
        for (slot, kid) in kids.iter().enumerate() {
            let Some(kid) = kid else { continue };
            if is_statement_slot(kind, slot, kids.len()) {
                continue;
            }
            if matches!(kind, NodeKind::BinaryOp(BinOp::CondElse)) && slot == 0 {
                continue;
            }
            self.collect_markers(*kid, out);
            if is_marker(self, *kid) {
                out.push(*kid);
            }
        }
    }

    /// Replaces each marker with a temp and returns the null tests that
    /// fill the temps, in evaluation order.
    fn ground_markers(&mut self, markers: &[NodeId]) -> Result<Vec<NodeId>> {
        let mut tests = Vec::new();
        for &marker in markers {
            let operand = self.kid(marker, 0)?;
            let operand_ty = self.ty(operand)?;
            if operand_ty.is_prim() {
                self.ast.replace(marker, operand)?;
                continue;
            }
            let ty = self.ty(marker)?;
            let name = self.temp(marker, operand_ty)?;
            let value = self.reg(&name, ty);
            self.ast.replace(marker, value)?;
            let target = self.reg(&name, operand_ty);
            let store = self.assign(target, operand);
            let null = self.constant(Const::Null);
            tests.push(self.binary(BinOp::Ne, store, null));
        }
        Ok(tests)
    }

    /// Whether `id` lies in child `slot` of `ancestor`.
    fn is_under(&self, id: NodeId, ancestor: NodeId, slot: usize) -> bool {
        let Some(top) = self.ast.kid(ancestor, slot) else {
            return false;
        };
        id == top || self.ast.ancestors(id).any(|a| a == top)
    }
}

fn is_marker(rw: &Rewriter<'_, '_>, id: NodeId) -> bool {
    matches!(rw.ast.kind(id), NodeKind::UnaryOp(UnOp::Elvis))
}
