use crate::ast::{NodeId, NodeKind};
use crate::errors::Result;
use crate::rewrite::Rewriter;

impl<'a, 't> Rewriter<'a, 't> {
    /// Breakable constructs enclosing `id`, innermost first. A lambda body
    /// ends the search.
    fn jump_targets(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for ancestor in self.ast.ancestors(id) {
            let kind = self.ast.kind(ancestor);
            if matches!(kind, NodeKind::StmtExpr { .. }) {
                break;
            }
            if kind.is_breakable() {
                out.push(ancestor);
            }
        }
        out
    }

    /// Labels the target of a `break` that Java cannot reach unlabeled.
    pub(crate) fn lower_break(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let NodeKind::Break { depth, label: None } = *self.ast.kind(id) else {
            return Ok(None);
        };
        let targets = self.jump_targets(id);
        let target = *targets
            .get(depth as usize)
            .ok_or_else(|| self.error(id, format!("no construct to break out of at depth {}", depth)))?;
        let needs_label = depth > 0 || matches!(self.ast.kind(target), NodeKind::Block(_));
        if !needs_label {
            return Ok(None);
        }

        let label = match self.ast.kind(target).label() {
            Some(label) => label.to_string(),
            None => {
                let label = self.ast.fresh_name("L$");
                if let Some(slot) = self.ast.kind_mut(target).label_mut() {
                    *slot = Some(label.clone());
                }
                label
            }
        };
        *self.ast.kind_mut(id) = NodeKind::Break {
            depth,
            label: Some(label),
        };
        Ok(Some(id))
    }

    /// Only a `continue` of the innermost loop has a Java form.
    pub(crate) fn lower_continue(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let NodeKind::Continue { depth } = *self.ast.kind(id) else {
            return Ok(None);
        };
        if depth > 0 {
            return Err(self.error(id, "continue of an outer loop"));
        }
        for ancestor in self.ast.ancestors(id) {
            match self.ast.kind(ancestor) {
                kind if kind.is_loop() => return Ok(None),
                NodeKind::Switch(info) if !info.is_expr => {
                    return Err(self.error(id, "fallthrough that is not the last statement of a case"));
                }
                NodeKind::Block(scope) if scope.breaks_here => {
                    return Err(self.error(id, "fallthrough in a switch lowered to conditionals"));
                }
                NodeKind::StmtExpr { .. } => break,
                _ => {}
            }
        }
        Err(self.error(id, "continue outside of a loop"))
    }
}
