use crate::ast::{BlockScope, NodeId, NodeKind, block::final_name};
use crate::errors::Result;
use crate::rewrite::Rewriter;
use crate::types::Type;
use hashbrown::HashSet;

impl<'a, 't> Rewriter<'a, 't> {
    /// Locals read inside a lambda are read through `final` copies made
    /// just before the statement that builds the lambda.
    pub(crate) fn capture_finals(&mut self, stmt: NodeId) -> Result<Option<NodeId>> {
        let lambdas: Vec<NodeId> = self
            .expression_nodes(stmt, |_, _| false)
            .into_iter()
            .filter(|id| {
                matches!(
                    self.ast.kind(*id),
                    NodeKind::StmtExpr { .. } | NodeKind::BindFunction { .. }
                )
            })
            .collect();
        if lambdas.is_empty() {
            return Ok(None);
        }

        let mut pre = Vec::new();
        let mut captures: Vec<(String, &'t Type<'t>)> = Vec::new();
        for lambda in lambdas {
            if matches!(self.ast.kind(lambda), NodeKind::BindFunction { .. }) {
                pre.extend(self.hoist_bound_args(stmt, lambda)?);
            }
            let declared = self.declared_names(lambda);
            for id in self.ast.preorder(lambda) {
                let NodeKind::RegisterRef { name, ty } = self.ast.kind(id) else {
                    continue;
                };
                if !is_capturable(name) || declared.contains(name.as_str()) {
                    continue;
                }
                let (name, ty) = (name.clone(), *ty);
                *self.ast.kind_mut(id) = NodeKind::RegisterRef {
                    name: final_name(&name),
                    ty,
                };
                if !captures.iter().any(|(n, _)| *n == name) {
                    captures.push((name, ty));
                }
            }
        }
        if captures.is_empty() && pre.is_empty() {
            return Ok(None);
        }

        let decl = self.split_declaration(stmt)?;
        let mut scope = BlockScope::new();
        for (name, ty) in &captures {
            scope.capture_final(name, *ty);
        }
        let inner = self.block(scope, &[stmt]);

        let mut out: Vec<NodeId> = decl.into_iter().collect();
        out.extend(pre);
        if out.is_empty() {
            return Ok(Some(inner));
        }
        out.push(inner);
        Ok(Some(self.stmts(&out)))
    }

    /// Moves the bound function and arguments that are not plain locals or
    /// constants into temps, so they are evaluated once.
    fn hoist_bound_args(&mut self, stmt: NodeId, bind: NodeId) -> Result<Vec<NodeId>> {
        let mut pre = Vec::new();
        for slot in 0..self.ast.kids(bind).len() {
            let Some(arg) = self.ast.kid(bind, slot) else {
                continue;
            };
            if self.is_pure(arg) {
                continue;
            }
            let ty = self.ty(arg)?;
            let name = self.temp(stmt, ty)?;
            let value = self.reg(&name, ty);
            self.ast.set_kid(bind, slot, Some(value));
            let target = self.reg(&name, ty);
            pre.push(self.assign(target, arg));
        }
        Ok(pre)
    }

    /// Names a lambda declares itself: its locals and block temps.
    fn declared_names(&self, lambda: NodeId) -> HashSet<String> {
        let mut names = HashSet::new();
        for id in self.ast.preorder(lambda) {
            match self.ast.kind(id) {
                NodeKind::Define { name, .. } => {
                    names.insert(name.clone());
                }
                NodeKind::Block(scope) => {
                    for (_, temps) in scope.temps() {
                        names.extend(temps.iter().cloned());
                    }
                    for (name, _) in &scope.captured_finals {
                        names.insert(final_name(name));
                    }
                }
                _ => {}
            }
        }
        names
    }
}

fn is_capturable(name: &str) -> bool {
    !matches!(name, "this" | "super" | "$COND") && !name.ends_with('$')
}
