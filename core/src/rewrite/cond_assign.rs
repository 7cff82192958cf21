use crate::ast::{AssignOp, BinOp, NodeId, NodeKind};
use crate::errors::Result;
use crate::pool::Const;
use crate::rewrite::Rewriter;

impl<'a, 't> Rewriter<'a, 't> {
    /// A condition list `(a, b, c)` becomes `a && b && c`.
    pub(crate) fn lower_condition_list(&mut self, stmt: NodeId) -> Result<Option<NodeId>> {
        let Some(slot) = condition_slot(self.ast.kind(stmt)) else {
            return Ok(None);
        };
        let Some(cond) = self.ast.kid(stmt, slot) else {
            return Ok(None);
        };
        if !matches!(self.ast.kind(cond), NodeKind::Multi { stmts: false }) {
            return Ok(None);
        }
        let items = self.present_kids(cond);
        let chain = self
            .and_all(items)
            .ok_or_else(|| self.error(cond, "empty condition list"))?;
        self.ast.set_kid(stmt, slot, Some(chain));
        Ok(Some(stmt))
    }

    /// `:=` and `?=` as conjuncts of an `if`, `while` or `assert`
    /// condition, or as whole statements.
    pub(crate) fn lower_conditional_assignment(&mut self, stmt: NodeId) -> Result<Option<NodeId>> {
        match self.ast.kind(stmt) {
            NodeKind::Assign(op) if op.is_conditional() => self.lower_bare_cond_assign(stmt),
            NodeKind::If | NodeKind::While { .. } | NodeKind::Assert => {
                let Some(cond) = self.ast.kid(stmt, 0) else {
                    return Ok(None);
                };
                let assigns: Vec<NodeId> = self
                    .conjuncts(cond)
                    .into_iter()
                    .filter(|c| {
                        matches!(self.ast.kind(*c), NodeKind::Assign(op) if op.is_conditional())
                    })
                    .collect();
                if assigns.is_empty() {
                    return Ok(None);
                }

                let mut copies = Vec::new();
                for assign in assigns {
                    let (test, copy) = self.split_cond_assign(assign)?;
                    self.ast.replace(assign, test)?;
                    copies.push(copy);
                }

                if matches!(self.ast.kind(stmt), NodeKind::Assert) {
                    let mut all = vec![stmt];
                    all.extend(copies);
                    return Ok(Some(self.stmts(&all)));
                }
                let body = self.kid(stmt, 1)?;
                let body = self.prepend(body, &copies);
                self.ast.set_kid(stmt, 1, Some(body));
                Ok(Some(stmt))
            }
            _ => Ok(None),
        }
    }

    /// `v := f()` on its own: the destination is written only when the
    /// condition holds.
    fn lower_bare_cond_assign(&mut self, stmt: NodeId) -> Result<Option<NodeId>> {
        let decl = self.split_declaration(stmt)?;
        let (test, copy) = self.split_cond_assign(stmt)?;
        let guarded = self.ast.add(NodeKind::If, [Some(test), Some(copy), None]);
        match decl {
            Some(decl) => Ok(Some(self.stmts(&[decl, guarded]))),
            None => Ok(Some(guarded)),
        }
    }

    /// Operands of a `&&` chain, left to right.
    fn conjuncts(&self, cond: NodeId) -> Vec<NodeId> {
        match self.ast.kind(cond) {
            NodeKind::BinaryOp(BinOp::And) => {
                let mut out = Vec::new();
                for kid in self.present_kids(cond) {
                    out.extend(self.conjuncts(kid));
                }
                out
            }
            _ => vec![cond],
        }
    }

    /// Splits `dst := rhs` into a test that stores `rhs` in a temp and the
    /// copy from the temp into `dst`.
    fn split_cond_assign(&mut self, assign: NodeId) -> Result<(NodeId, NodeId)> {
        let NodeKind::Assign(op) = *self.ast.kind(assign) else {
            return Err(self.error(assign, "expected a conditional assignment"));
        };
        let dst = self.kid(assign, 0)?;
        let rhs = self.kid(assign, 1)?;
        if op == AssignOp::CondAsn && !self.table.yields_condition(rhs) {
            return Err(self.error(assign, "`:=` needs a right side that yields a condition"));
        }

        let ty = self.ty(rhs)?;
        let name = self.temp(assign, ty)?;
        let target = self.reg(&name, ty);
        let store = self.assign(target, rhs);
        let test = match op {
            AssignOp::CondAsn => {
                let evaluated = self.always_true(store)?;
                let flag = self.cond_flag();
                self.binary(BinOp::And, evaluated, flag)
            }
            _ => {
                let null = self.constant(Const::Null);
                self.binary(BinOp::Ne, store, null)
            }
        };
        let value_ty = self.types.non_null(ty);
        let value = self.reg(&name, value_ty);
        let copy = self.assign(dst, value);
        Ok((test, copy))
    }
}

/// Child slot holding the condition of a conditional statement.
pub(crate) fn condition_slot(kind: &NodeKind<'_>) -> Option<usize> {
    match kind {
        NodeKind::If | NodeKind::While { .. } | NodeKind::Assert => Some(0),
        NodeKind::DoWhile { .. } | NodeKind::ForClassic { .. } => Some(1),
        _ => None,
    }
}
