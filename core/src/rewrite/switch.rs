//! Switch lowering.
//!
//! Every switch gets one of four shapes, chosen by [`classify`] from the
//! selector types and the case constants alone:
//!
//! | Flavor     | When                                          | Java form        |
//! |------------|-----------------------------------------------|------------------|
//! | `Pattern`  | several columns, `instanceof` columns, `_`    | conditionals     |
//! | `Equality` | boxed, boolean, floating or class selectors   | conditionals     |
//! | `Integer`  | primitive integral or `char` selector         | `switch`         |
//! | `Native`   | `String` or enum selector                     | `switch`         |
//!
//! Conditionals are a ternary chain for switch expressions and an
//! `if`/`else if` chain inside a breakable block for statements.

use crate::ast::{BinOp, CaseLabel, NativeArm, NativeSwitch, NodeId, NodeKind, SwitchInfo};
use crate::errors::Result;
use crate::pool::{Const, IntFormat};
use crate::rewrite::{Reuse, Rewriter};
use crate::types::{Prim, Type};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Pattern,
    Equality,
    Integer,
    Native,
}

/// Picks the lowering for a switch over `columns` with one case constant
/// per row (`None` for the default row).
///
/// Integer switches whose ranges would expand to more than
/// `max_expansion` labels fall back to `Pattern`.
pub fn classify(
    columns: &[&Type<'_>],
    isa: u64,
    cases: &[Option<&Const<'_>>],
    max_expansion: u64,
) -> Flavor {
    let [column] = columns else {
        return Flavor::Pattern;
    };
    if isa != 0 {
        return Flavor::Pattern;
    }
    let labels = || cases.iter().flatten();
    if labels().any(|c| matches!(c, Const::Tuple(_) | Const::Any)) {
        return Flavor::Pattern;
    }
    let has_range = labels().any(|c| matches!(c, Const::Range { .. }));

    match column {
        Type::Prim(p) if p.is_integral() => {
            let mut expanded: u64 = 0;
            let mut fits = true;
            for label in labels() {
                let Some((lo, hi)) = label.int_bounds() else {
                    return Flavor::Pattern;
                };
                if hi < lo {
                    return Flavor::Pattern;
                }
                if lo <= i64::from(i32::MIN) || hi > i64::from(i32::MAX) {
                    fits = false;
                    continue;
                }
                expanded = expanded.saturating_add((hi - lo) as u64 + 1);
            }
            match (fits, has_range) {
                (false, true) => Flavor::Pattern,
                (false, false) => Flavor::Equality,
                _ if expanded > max_expansion => Flavor::Pattern,
                _ => Flavor::Integer,
            }
        }
        Type::Str | Type::Enum { .. } => {
            if labels().all(|c| matches!(c, Const::Str(_) | Const::Enum { .. })) {
                Flavor::Native
            } else if has_range {
                Flavor::Pattern
            } else {
                Flavor::Equality
            }
        }
        _ if has_range => Flavor::Pattern,
        _ => Flavor::Equality,
    }
}

/// A group of rows sharing one body.
struct Arm {
    tests: Vec<NodeId>,
    is_default: bool,
    body: NodeId,
}

impl<'a, 't> Rewriter<'a, 't> {
    pub(crate) fn lower_switch(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let NodeKind::Switch(info) = self.ast.kind(id) else {
            return Ok(None);
        };
        if info.native.is_some() {
            return Ok(None);
        }
        let info: SwitchInfo<'t> = (**info).clone();

        let cond = self.kid(id, 0)?;
        let columns = match self.ast.kind(cond) {
            NodeKind::Multi { stmts: false } => self.present_kids(cond),
            _ => vec![cond],
        };
        let column_types = columns
            .iter()
            .map(|c| self.ty(*c))
            .collect::<Result<Vec<_>>>()?;
        let cases = info
            .cases
            .iter()
            .map(|c| c.map(|c| self.pool.get(c).cloned()).transpose())
            .collect::<Result<Vec<_>>>()?;
        let case_refs: Vec<Option<&Const<'t>>> = cases.iter().map(Option::as_ref).collect();

        let flavor = classify(
            &column_types,
            info.isa,
            &case_refs,
            self.options.max_switch_expansion,
        );
        trace!(switch = %id, ?flavor, rows = cases.len(), "Classified switch");

        match flavor {
            Flavor::Integer | Flavor::Native => {
                self.native_switch(id, &info, column_types[0], &cases)
            }
            Flavor::Pattern | Flavor::Equality => {
                let arms = self.conditional_arms(id, &info, &columns, &column_types, &cases)?;
                if info.is_expr {
                    self.ternary_chain(id, arms)
                } else {
                    self.if_chain(arms)
                }
            }
        }
    }

    /// Keeps the switch and records its arm layout.
    fn native_switch(
        &mut self,
        id: NodeId,
        info: &SwitchInfo<'t>,
        column: &'t Type<'t>,
        cases: &[Option<Const<'t>>],
    ) -> Result<Option<NodeId>> {
        let mut arms: Vec<NativeArm> = Vec::new();
        let mut labels = Vec::new();
        let mut is_default = false;
        for (row, case) in cases.iter().enumerate() {
            match case {
                None => is_default = true,
                Some(c) => labels.extend(self.case_labels(id, c, column)?),
            }
            let slot = row + 1;
            if self.ast.kid(id, slot).is_none() {
                continue;
            }
            let fallthrough = !info.is_expr && self.strip_fallthrough(id, slot)?;
            arms.push(NativeArm {
                labels: if is_default {
                    Vec::new()
                } else {
                    core::mem::take(&mut labels)
                },
                is_default,
                body: slot,
                fallthrough,
            });
            labels.clear();
            is_default = false;
        }
        if !labels.is_empty() || is_default {
            return Err(self.error(id, "last case has no body"));
        }
        if arms.last().is_some_and(|arm| arm.fallthrough) {
            return Err(self.error(id, "last case falls through"));
        }
        if info.is_expr {
            // The default arm is printed last.
            if let Some(pos) = arms.iter().position(|arm| arm.is_default) {
                let default = arms.remove(pos);
                arms.push(default);
            }
        }

        let clamp = matches!(column, Type::Prim(Prim::Long));
        if let NodeKind::Switch(info) = self.ast.kind_mut(id) {
            info.native = Some(NativeSwitch { arms, clamp });
        }
        Ok(Some(id))
    }

    fn case_labels(&self, id: NodeId, case: &Const<'t>, column: &Type<'t>) -> Result<Vec<CaseLabel>> {
        match case {
            Const::Str(s) => Ok(vec![CaseLabel::Str(s.clone())]),
            Const::Enum { name, .. } => Ok(vec![CaseLabel::Enum(name.clone())]),
            _ => {
                let (lo, hi) = case
                    .int_bounds()
                    .ok_or_else(|| self.error(id, "case label is not an integer"))?;
                (lo..=hi)
                    .map(|v| match column {
                        Type::Prim(Prim::Char) => u32::try_from(v)
                            .ok()
                            .and_then(char::from_u32)
                            .map(CaseLabel::Char)
                            .ok_or_else(|| self.error(id, format!("{} is not a char", v))),
                        _ => Ok(CaseLabel::Int(v)),
                    })
                    .collect()
            }
        }
    }

    /// Removes a trailing `continue` from a statement arm, which Java
    /// expresses by leaving out the `break`.
    fn strip_fallthrough(&mut self, id: NodeId, slot: usize) -> Result<bool> {
        let body = self.kid(id, slot)?;
        let (holder, index) = match self.ast.kind(body) {
            NodeKind::Block(_) => {
                let kids = self.ast.kids(body);
                match kids.iter().rposition(Option::is_some) {
                    Some(last) => (body, last),
                    None => return Ok(false),
                }
            }
            _ => (id, slot),
        };
        let Some(last) = self.ast.kid(holder, index) else {
            return Ok(false);
        };
        if !matches!(self.ast.kind(last), NodeKind::Continue { depth: 0 }) {
            return Ok(false);
        }
        let noop = self.ast.leaf(NodeKind::NoOp);
        self.ast.set_kid(holder, index, Some(noop));
        Ok(true)
    }

    /// Groups rows into arms and builds each row's test against the
    /// hoisted selector columns. Hoisting assignments come first in the
    /// returned list as arms with no body.
    fn conditional_arms(
        &mut self,
        id: NodeId,
        info: &SwitchInfo<'t>,
        columns: &[NodeId],
        column_types: &[&'t Type<'t>],
        cases: &[Option<Const<'t>>],
    ) -> Result<Conditional> {
        let mut hoists = Vec::new();
        let mut refs = Vec::new();
        for column in columns {
            let (first, reuse) = self.hoist(id, *column)?;
            if matches!(reuse, Reuse::Temp(..)) {
                hoists.push(first);
            }
            refs.push(reuse);
        }

        let mut arms = Vec::new();
        let mut tests = Vec::new();
        let mut is_default = false;
        for (row, case) in cases.iter().enumerate() {
            match case {
                None => is_default = true,
                Some(c) => {
                    let test = self.row_test(id, &refs, column_types, info.isa, c)?;
                    tests.push(test);
                }
            }
            let Some(body) = self.ast.kid(id, row + 1) else {
                continue;
            };
            arms.push(Arm {
                tests: core::mem::take(&mut tests),
                is_default,
                body,
            });
            is_default = false;
        }
        if !tests.is_empty() || is_default {
            return Err(self.error(id, "last case has no body"));
        }
        Ok(Conditional { hoists, arms })
    }

    /// Test for one row: the conjunction of its column tests.
    fn row_test(
        &mut self,
        id: NodeId,
        refs: &[Reuse<'t>],
        column_types: &[&'t Type<'t>],
        isa: u64,
        case: &Const<'t>,
    ) -> Result<NodeId> {
        let items: Vec<&Const<'t>> = match case {
            Const::Tuple(items) => items.iter().collect(),
            single => vec![single],
        };
        if items.len() != refs.len() {
            return Err(self.error(
                id,
                format!("case has {} values for {} columns", items.len(), refs.len()),
            ));
        }
        let mut tests = Vec::new();
        for (column, item) in items.into_iter().enumerate() {
            let instance = isa & (1 << column) != 0;
            if let Some(test) =
                self.column_test(id, &refs[column], column_types[column], instance, item)?
            {
                tests.push(test);
            }
        }
        match self.and_all(tests) {
            Some(test) => Ok(test),
            None => Ok(self.constant(Const::Bool(true))),
        }
    }

    fn column_test(
        &mut self,
        id: NodeId,
        column: &Reuse<'t>,
        column_ty: &'t Type<'t>,
        instance: bool,
        case: &Const<'t>,
    ) -> Result<Option<NodeId>> {
        if matches!(case, Const::Any) {
            return Ok(None);
        }
        if instance {
            let Const::Type(ty) = case else {
                return Err(self.error(id, "type column needs a type constant"));
            };
            let value = self.reuse(column);
            return Ok(Some(self.ast.branch(NodeKind::Is { ty: *ty }, &[value])));
        }
        if let Const::Range { .. } = case {
            let (lo, hi) = case
                .int_bounds()
                .ok_or_else(|| self.error(id, "range case is empty"))?;
            let format = match column_ty.prim() {
                Some(Prim::Long) | None => IntFormat::Int64,
                Some(_) => IntFormat::Int32,
            };
            let lo = self.constant(Const::Int { value: lo, format });
            let hi = self.constant(Const::Int { value: hi, format });
            let low = self.reuse(column);
            let above = self.binary(BinOp::Le, lo, low);
            let high = self.reuse(column);
            let below = self.binary(BinOp::Le, high, hi);
            return Ok(Some(self.binary(BinOp::And, above, below)));
        }
        let value = self.reuse(column);
        let label = self.constant(case.clone());
        Ok(Some(self.binary(BinOp::Eq, value, label)))
    }

    /// Switch expression as `t0 ? v0 : t1 ? v1 : default`.
    fn ternary_chain(&mut self, id: NodeId, conditional: Conditional) -> Result<Option<NodeId>> {
        let Conditional { hoists, mut arms } = conditional;
        let default = match arms.iter().position(|arm| arm.is_default) {
            Some(pos) => arms.remove(pos).body,
            None => arms
                .pop()
                .map(|arm| arm.body)
                .ok_or_else(|| self.error(id, "switch has no cases"))?,
        };

        let mut chain = default;
        for arm in arms.into_iter().rev() {
            let Some(test) = self.or_all(arm.tests) else {
                continue;
            };
            chain = self.ast.branch(NodeKind::Ternary, &[test, arm.body, chain]);
        }

        if hoists.is_empty() {
            return Ok(Some(chain));
        }
        let evaluated = hoists
            .into_iter()
            .map(|h| self.always_true(h))
            .collect::<Result<Vec<NodeId>>>()?;
        let Some(prefix) = self.and_all(evaluated) else {
            return Ok(Some(chain));
        };
        if matches!(self.ast.kind(chain), NodeKind::Ternary) {
            let first = self.kid(chain, 0)?;
            let test = self.binary(BinOp::And, prefix, first);
            self.ast.set_kid(chain, 0, Some(test));
            Ok(Some(chain))
        } else {
            let other = self.ast.clone_subtree(chain);
            Ok(Some(self.ast.branch(NodeKind::Ternary, &[prefix, chain, other])))
        }
    }

    /// Statement switch as a breakable block holding an `if` chain.
    fn if_chain(&mut self, conditional: Conditional) -> Result<Option<NodeId>> {
        let Conditional { hoists, mut arms } = conditional;
        let default = arms
            .iter()
            .position(|arm| arm.is_default)
            .map(|pos| arms.remove(pos).body);

        let mut chain = default;
        for arm in arms.into_iter().rev() {
            let Some(test) = self.or_all(arm.tests) else {
                continue;
            };
            chain = Some(self.ast.add(NodeKind::If, [Some(test), Some(arm.body), chain]));
        }

        let mut stmts = hoists;
        stmts.extend(chain);
        let mut scope = crate::ast::BlockScope::new();
        scope.breaks_here = true;
        Ok(Some(self.block(scope, &stmts)))
    }

    fn or_all(&mut self, tests: Vec<NodeId>) -> Option<NodeId> {
        tests
            .into_iter()
            .reduce(|acc, test| self.binary(BinOp::Or, acc, test))
    }
}

struct Conditional {
    /// Assignments of non-trivial selector columns to temps.
    hoists: Vec<NodeId>,
    arms: Vec<Arm>,
}
