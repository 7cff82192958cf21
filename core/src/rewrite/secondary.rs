use crate::ast::{AssignOp, BinOp, Conv, NodeId, NodeKind, UnOp};
use crate::errors::Result;
use crate::pool::{Const, ConstId, IntFormat, MethodInfo};
use crate::rewrite::{Reuse, Rewriter};
use crate::types::{Prim, Type};

impl<'a, 't> Rewriter<'a, 't> {
    pub(crate) fn lower_binary(&mut self, id: NodeId, op: BinOp) -> Result<Option<NodeId>> {
        match op {
            BinOp::Index => self.lower_index(id),
            BinOp::RangeIncl | BinOp::RangeExcl => self.lower_range(id, op),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => self.lower_ordering(id, op),
            BinOp::Eq | BinOp::Ne => self.lower_equality(id, op),
            BinOp::Add if self.operand_is_str(id)? => Ok(None),
            BinOp::Add
            | BinOp::Sub
            | BinOp::Mul
            | BinOp::Div
            | BinOp::Mod
            | BinOp::Shl
            | BinOp::Shr
            | BinOp::Ushr
            | BinOp::BitAnd
            | BinOp::BitOr
            | BinOp::BitXor
            | BinOp::Cmp => self.unbox_operands(id),
            _ => Ok(None),
        }
    }

    fn operand_is_str(&self, id: NodeId) -> Result<bool> {
        let lhs = self.ty(self.kid(id, 0)?)?;
        let rhs = self.ty(self.kid(id, 1)?)?;
        Ok(matches!(lhs, Type::Str) || matches!(rhs, Type::Str))
    }

    /// Unboxes non-null boxed operands of a binary operator.
    fn unbox_operands(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let mut changed = false;
        for slot in 0..2 {
            let kid = self.kid(id, slot)?;
            let ty = self.ty(kid)?;
            if !ty.is_boxed() {
                continue;
            }
            let Some(p) = ty.prim() else { continue };
            let prim = self.types.prim(p);
            let unboxed = self.ast.branch(
                NodeKind::Convert {
                    ty: prim,
                    conv: Conv::Unbox,
                },
                &[kid],
            );
            self.ast.set_kid(id, slot, Some(unboxed));
            changed = true;
        }
        Ok(changed.then_some(id))
    }

    fn lower_index(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let base = self.kid(id, 0)?;
        let index = self.kid(id, 1)?;
        match self.ty(base)? {
            Type::Tuple(_) => match self.const_value(index) {
                Some(range @ Const::Range { .. }) => {
                    let (lo, hi) = range
                        .int_bounds()
                        .ok_or_else(|| self.error(id, "empty tuple slice"))?;
                    self.lower_tuple_slice(id, lo, hi)
                }
                _ => Ok(None),
            },
            Type::Array(Type::Prim(Prim::Long | Prim::Char | Prim::Bool)) => {
                if self.is_lvalue(id) || self.needs_boxed(id)? {
                    return Ok(None);
                }
                Ok(Some(self.binary(BinOp::IndexPrim, base, index)))
            }
            _ => Ok(None),
        }
    }

    /// `t[lo..hi]` on a tuple: a new tuple of the selected fields, with
    /// `t` evaluated once.
    fn lower_tuple_slice(&mut self, id: NodeId, lo: i64, hi: i64) -> Result<Option<NodeId>> {
        let ty = self.ty(id)?;
        let tuple = self.kid(id, 0)?;
        let (first, reuse) = self.hoist(id, tuple)?;
        let mut fields = Vec::new();
        for (n, field) in (lo..=hi).enumerate() {
            let source = if n == 0 { first } else { self.reuse(&reuse) };
            let index = self.constant(Const::long(field));
            fields.push(self.binary(BinOp::Index, source, index));
        }
        Ok(Some(self.ast.branch(NodeKind::Tuple { ty }, &fields)))
    }

    fn is_lvalue(&self, id: NodeId) -> bool {
        let Some(parent) = self.ast.parent(id) else {
            return false;
        };
        match self.ast.kind(parent) {
            NodeKind::Assign(_) => self.ast.slot_of(parent, id) == Some(0),
            NodeKind::UnaryOp(op) => op.mutates(),
            _ => false,
        }
    }

    /// Whether the value of `id` flows somewhere that takes a reference
    /// type.
    fn needs_boxed(&self, id: NodeId) -> Result<bool> {
        let Some(parent) = self.ast.parent(id) else {
            return Ok(false);
        };
        let Some(slot) = self.ast.slot_of(parent, id) else {
            return Ok(false);
        };
        let reference = |ty: &Type<'_>| !ty.is_prim();
        Ok(match self.ast.kind(parent) {
            NodeKind::Tuple { .. }
            | NodeKind::ListLiteral { .. }
            | NodeKind::MapLiteral { .. }
            | NodeKind::Call
            | NodeKind::BindFunction { .. } => true,
            NodeKind::Assign(_) => reference(self.ty(self.kid(parent, 0)?)?),
            NodeKind::Ternary if slot > 0 => reference(self.ty(parent)?),
            NodeKind::Return => reference(self.return_type(parent).0),
            NodeKind::BinaryOp(BinOp::Eq | BinOp::Ne) => {
                let other = self.kid(parent, 1 - slot)?;
                matches!(self.ty(other)?, Type::Null)
            }
            NodeKind::Invoke { method } if slot > 0 => self.param_is_reference(*method, slot - 1)?,
            NodeKind::New { ctor: Some(ctor), .. } => self.param_is_reference(*ctor, slot)?,
            NodeKind::NewVirtual { ctor: Some(ctor), .. } if slot > 0 => {
                self.param_is_reference(*ctor, slot - 1)?
            }
            _ => false,
        })
    }

    fn param_is_reference(&self, method: ConstId, index: usize) -> Result<bool> {
        let info = self.method_info(method)?;
        Ok(info.params.get(index).is_some_and(|p| !p.ty.is_prim()))
    }

    pub(crate) fn method_info(&self, id: ConstId) -> Result<MethodInfo<'t>> {
        self.pool.get(id)?.as_method().cloned().ok_or_else(|| {
            crate::errors::Error::structure("Constant", None, format!("{} is not a method", id))
        })
    }

    /// `lo..hi` used as a value.
    fn lower_range(&mut self, id: NodeId, op: BinOp) -> Result<Option<NodeId>> {
        let lo = self.kid(id, 0)?;
        let hi = self.kid(id, 1)?;
        let lo_excl = self.constant(Const::Bool(false));
        let hi_excl = self.constant(Const::Bool(op == BinOp::RangeExcl));
        let ty = self.types.range();
        Ok(Some(self.ast.branch(
            NodeKind::New { ty, ctor: None },
            &[lo, hi, lo_excl, hi_excl],
        )))
    }

    fn lower_ordering(&mut self, id: NodeId, op: BinOp) -> Result<Option<NodeId>> {
        let lhs = self.kid(id, 0)?;
        let rhs = self.kid(id, 1)?;
        let (lt, rt) = (self.ty(lhs)?, self.ty(rhs)?);
        if lt.is_numeric() && rt.is_numeric() {
            return self.unbox_operands(id);
        }
        Ok(Some(self.ast.branch(NodeKind::Order(op), &[lhs, rhs])))
    }

    fn lower_equality(&mut self, id: NodeId, op: BinOp) -> Result<Option<NodeId>> {
        let lhs = self.kid(id, 0)?;
        let rhs = self.kid(id, 1)?;
        let (lt, rt) = (self.ty(lhs)?, self.ty(rhs)?);
        if matches!(lt, Type::Null) || matches!(rt, Type::Null) {
            return Ok(None);
        }
        if lt.prim().is_some() && rt.prim().is_some() && !lt.is_nullable() && !rt.is_nullable() {
            return self.unbox_operands(id);
        }
        if matches!(lt, Type::Enum { .. }) || matches!(rt, Type::Enum { .. }) {
            return Ok(None);
        }
        if !lt.is_reference() && !rt.is_reference() {
            return Ok(None);
        }
        let equals = self.binary(BinOp::Equals, lhs, rhs);
        Ok(Some(match op {
            BinOp::Ne => self.ast.branch(NodeKind::UnaryOp(UnOp::Not), &[equals]),
            _ => equals,
        }))
    }

    pub(crate) fn lower_invoke(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let NodeKind::Invoke { method } = *self.ast.kind(id) else {
            return Ok(None);
        };
        let info = self.method_info(method)?;
        if info.funky {
            return self.lower_funky(id, &info);
        }
        let changed = self.lower_args(id, 1, &info)?;
        Ok(changed.then_some(id))
    }

    pub(crate) fn lower_new(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let (ctor, first) = match self.ast.kind(id) {
            NodeKind::New { ctor: Some(ctor), .. } => (*ctor, 0),
            NodeKind::NewVirtual { ctor: Some(ctor), .. } => (*ctor, 1),
            _ => return Ok(None),
        };
        let info = self.method_info(ctor)?;
        let changed = self.lower_args(id, first, &info)?;
        Ok(changed.then_some(id))
    }

    /// Fills defaulted arguments and converts the rest to the parameter
    /// types. Arguments start at child `first`.
    fn lower_args(&mut self, id: NodeId, first: usize, info: &MethodInfo<'t>) -> Result<bool> {
        let mut changed = false;
        for (i, param) in info.params.iter().enumerate() {
            let slot = first + i;
            let Some(arg) = self.ast.kid(id, slot) else {
                continue;
            };
            if matches!(self.ast.kind(arg), NodeKind::DefaultArg) {
                let value = info.defaults.get(i).cloned().flatten().ok_or_else(|| {
                    self.error(id, format!("parameter `{}` has no default", param.name))
                })?;
                let value = self.constant(value);
                self.ast.set_kid(id, slot, Some(value));
                changed = true;
                continue;
            }
            if let Some(converted) = self.coerce(arg, param.ty)? {
                self.ast.set_kid(id, slot, Some(converted));
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Boxing or unboxing that makes `expr` fit where `to` is expected.
    pub(crate) fn coerce(&mut self, expr: NodeId, to: &'t Type<'t>) -> Result<Option<NodeId>> {
        let from = self.ty(expr)?;
        if core::ptr::eq(from, to) {
            return Ok(None);
        }
        let target_prim = |ty: &Type<'_>| match ty {
            Type::Boxed(p) => Some(*p),
            Type::Nullable(Type::Boxed(p)) => Some(*p),
            _ => None,
        };
        let (ty, conv) = match (from, to) {
            (Type::Prim(p), _) if !to.is_prim() && !matches!(to, Type::Void | Type::Str) => {
                let boxed = match target_prim(to) {
                    Some(q) if q.is_numeric() && p.is_numeric() => self.types.boxed(q),
                    _ => self.types.boxed(*p),
                };
                (boxed, Conv::Box)
            }
            (_, Type::Prim(q)) if !from.is_prim() => {
                let Some(p) = from.prim() else {
                    return Ok(None);
                };
                let prim = if p.is_numeric() && q.is_numeric() { *q } else { p };
                (self.types.prim(prim), Conv::Unbox)
            }
            _ => return Ok(None),
        };
        Ok(Some(self.ast.branch(NodeKind::Convert { ty, conv }, &[expr])))
    }

    pub(crate) fn lower_assign(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let lhs = self.kid(id, 0)?;
        match self.ast.kind(lhs) {
            NodeKind::Multi { .. } => {
                return Err(self.error(id, "multi-value assignment in expression position"));
            }
            NodeKind::Ignore => return Ok(Some(self.kid(id, 1)?)),
            _ => {}
        }
        let rhs = self.kid(id, 1)?;
        let to = self.ty(lhs)?;
        match self.coerce(rhs, to)? {
            Some(converted) => {
                self.ast.set_kid(id, 1, Some(converted));
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Java return type in effect at `id`, and whether the condition
    /// half travels through `$COND`.
    pub(crate) fn return_type(&self, id: NodeId) -> (&'t Type<'t>, bool) {
        for ancestor in self.ast.ancestors(id) {
            if let NodeKind::StmtExpr { ty } = self.ast.kind(ancestor) {
                return (ty, false);
            }
        }
        (self.method.java_return(self.types), self.method.cond_ret)
    }

    pub(crate) fn lower_return(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let values = self.present_kids(id);
        let (ret, cond_ret) = self.return_type(id);

        if cond_ret {
            let pair = match values.as_slice() {
                [cond, value] => Some((*cond, *value)),
                [only] if self.const_value(*only) == Some(&Const::Bool(false)) => {
                    let zero = self.zero(ret);
                    self.resolve(zero)?;
                    Some((*only, zero))
                }
                _ => None,
            };
            if let Some((cond, value)) = pair {
                let call = self.runtime_call("SET$COND", ret, &[cond, value])?;
                return Ok(Some(self.ast.branch(NodeKind::Return, &[call])));
            }
        }

        match values.as_slice() {
            [] => Ok(None),
            [value] => match self.coerce(*value, ret)? {
                Some(converted) => {
                    self.ast.set_kid(id, 0, Some(converted));
                    Ok(Some(id))
                }
                None => Ok(None),
            },
            many => {
                let tuple = self.ast.branch(NodeKind::Tuple { ty: ret }, many);
                Ok(Some(self.ast.branch(NodeKind::Return, &[tuple])))
            }
        }
    }

    /// `a < b <= c` as `a < (t = b) && t <= c`.
    pub(crate) fn lower_compare_chain(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let NodeKind::CompareChain { ops } = self.ast.kind(id) else {
            return Ok(None);
        };
        let ops = ops.clone();
        let operands = self.present_kids(id);
        if operands.len() != ops.len() + 1 {
            return Err(self.error(id, "operator count does not match operands"));
        }

        let last = operands.len() - 1;
        let mut tests = Vec::new();
        let mut left = operands[0];
        for (i, op) in ops.iter().enumerate() {
            let right = operands[i + 1];
            if i + 1 == last {
                tests.push(self.binary(*op, left, right));
                break;
            }
            let (first, reuse) = self.hoist(id, right)?;
            tests.push(self.binary(*op, left, first));
            left = self.reuse(&reuse);
        }
        Ok(self.and_all(tests))
    }

    /// `a /% b` as a tuple of quotient and remainder.
    pub(crate) fn lower_div_rem(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let ty = self.ty(id)?;
        let lhs = self.kid(id, 0)?;
        let rhs = self.kid(id, 1)?;
        let (lhs_first, lhs_again) = self.hoist(id, lhs)?;
        let (rhs_first, rhs_again) = self.hoist(id, rhs)?;
        let quotient = self.binary(BinOp::Div, lhs_first, rhs_first);
        let lhs = self.reuse(&lhs_again);
        let rhs = self.reuse(&rhs_again);
        let remainder = self.binary(BinOp::Mod, lhs, rhs);
        Ok(Some(
            self.ast
                .branch(NodeKind::Tuple { ty }, &[quotient, remainder]),
        ))
    }

    /// `(a, b) = rhs` as a statement.
    pub(crate) fn lower_multi_assign(&mut self, stmt: NodeId) -> Result<Option<NodeId>> {
        if !matches!(self.ast.kind(stmt), NodeKind::Assign(AssignOp::Asn)) {
            return Ok(None);
        }
        let lhs = self.kid(stmt, 0)?;
        if !matches!(self.ast.kind(lhs), NodeKind::Multi { stmts: false }) {
            return Ok(None);
        }
        let targets = self.present_kids(lhs);
        let rhs = self.kid(stmt, 1)?;
        let ignored = |rw: &Self, id: NodeId| matches!(rw.ast.kind(id), NodeKind::Ignore);

        // A conditional call: the value lands in the second target and the
        // condition is read back from `$COND`.
        if self.table.yields_condition(rhs) && targets.len() == 2 {
            let mut out = Vec::new();
            if ignored(self, targets[1]) {
                out.push(rhs);
            } else {
                out.push(self.assign(targets[1], rhs));
            }
            if !ignored(self, targets[0]) {
                let flag = self.cond_flag();
                out.push(self.assign(targets[0], flag));
            }
            return Ok(Some(self.stmts(&out)));
        }

        if !self.ty(rhs)?.is_tuple() {
            return Err(self.error(stmt, "multi-value assignment from a non-tuple"));
        }
        let (first, reuse) = self.hoist(stmt, rhs)?;
        let mut out = Vec::new();
        if matches!(reuse, Reuse::Temp(..)) {
            out.push(first);
        }
        for (i, target) in targets.into_iter().enumerate() {
            if ignored(self, target) {
                continue;
            }
            let source = self.reuse(&reuse);
            let index = self.constant(Const::long(i as i64));
            let field = self.binary(BinOp::Index, source, index);
            out.push(self.assign(target, field));
        }
        Ok(Some(self.stmts(&out)))
    }

    /// `for (x : lo..hi)` as a counting loop, or an iterator loop when the
    /// range is only known at run time.
    pub(crate) fn lower_for_range(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let NodeKind::ForRange { label } = self.ast.kind(id) else {
            return Ok(None);
        };
        let label = label.clone();
        let var = self.kid(id, 0)?;
        let range = self.kid(id, 1)?;
        let body = self.kid(id, 2)?;
        let (name, var_ty) = match self.ast.kind(var) {
            NodeKind::Define { name, ty } | NodeKind::RegisterRef { name, ty } => (name.clone(), *ty),
            _ => return Err(self.error(id, "loop variable must be a local")),
        };

        let (start, end, cmp, step) = match self.ast.kind(range) {
            NodeKind::BinaryOp(op @ (BinOp::RangeIncl | BinOp::RangeExcl)) => {
                let cmp = if *op == BinOp::RangeExcl { BinOp::Lt } else { BinOp::Le };
                (self.kid(range, 0)?, self.kid(range, 1)?, cmp, UnOp::PreInc)
            }
            NodeKind::Constant(c) => match self.pool.get(*c)?.clone() {
                Const::Range {
                    lo,
                    hi,
                    lo_excl,
                    hi_excl,
                } => {
                    let (start, end, cmp, step) = if lo <= hi {
                        (lo + lo_excl as i64, hi - hi_excl as i64, BinOp::Le, UnOp::PreInc)
                    } else {
                        (lo - lo_excl as i64, hi + hi_excl as i64, BinOp::Ge, UnOp::PreDec)
                    };
                    // `i <= MAX` never fails. Count until the counter wraps
                    // past its start instead.
                    let (min, max) = counter_limits(var_ty);
                    let (end, cmp) = match cmp {
                        BinOp::Le if end >= max && start > min => (start, BinOp::Ge),
                        BinOp::Ge if end <= min && start < max => (start, BinOp::Le),
                        BinOp::Le if end >= max => {
                            return Err(self.error(id, format!("range covers every `{}` value", var_ty)));
                        }
                        BinOp::Ge if end <= min => {
                            return Err(self.error(id, format!("range covers every `{}` value", var_ty)));
                        }
                        _ => (end, cmp),
                    };
                    let start = self.int_const(start, var_ty)?;
                    let end = self.int_const(end, var_ty)?;
                    (start, end, cmp, step)
                }
                _ => return Err(self.error(id, "loop range constant is not a range")),
            },
            _ => {
                return Ok(Some(self.ast.branch(
                    NodeKind::ForIterate { label, map: false },
                    &[var, range, body],
                )));
            }
        };

        let (end_first, end_again) = self.hoist(id, end)?;
        let hoisted = matches!(end_again, Reuse::Temp(..));
        let bound = if hoisted { self.reuse(&end_again) } else { end_first };

        let init = self.assign(var, start);
        let counter = self.reg(&name, var_ty);
        let cond = self.binary(cmp, counter, bound);
        let counter = self.reg(&name, var_ty);
        let update = self.ast.branch(NodeKind::UnaryOp(step), &[counter]);
        let lowered = self
            .ast
            .branch(NodeKind::ForClassic { label }, &[init, cond, update, body]);
        if hoisted {
            Ok(Some(self.stmts(&[end_first, lowered])))
        } else {
            Ok(Some(lowered))
        }
    }

    fn int_const(&mut self, value: i64, ty: &'t Type<'t>) -> Result<NodeId> {
        let constant = match ty.prim() {
            Some(Prim::Char) => {
                let c = u32::try_from(value)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| crate::errors::Error::structure(
                        "Constant",
                        None,
                        format!("{} is not a char", value),
                    ))?;
                Const::Char(c)
            }
            Some(Prim::Long) | None => Const::long(value),
            Some(_) => Const::Int {
                value,
                format: IntFormat::Int32,
            },
        };
        Ok(self.constant(constant))
    }

    /// Method conversions between primitives become casts.
    pub(crate) fn lower_convert(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let NodeKind::Convert {
            ty,
            conv: Conv::Method(_),
        } = self.ast.kind(id)
        else {
            return Ok(None);
        };
        let ty = *ty;
        let from = self.ty(self.kid(id, 0)?)?;
        let conv = match (from, ty) {
            (Type::Prim(a), Type::Prim(b)) if a.is_numeric() && b.is_numeric() => Conv::Cast,
            (Type::Boxed(a), Type::Prim(b)) if a == b => Conv::Unbox,
            (Type::Prim(a), Type::Boxed(b)) if a == b => Conv::Box,
            _ => return Ok(None),
        };
        *self.ast.kind_mut(id) = NodeKind::Convert { ty, conv };
        Ok(Some(id))
    }
}

/// Smallest and largest value a loop counter of `ty` can hold.
fn counter_limits(ty: &Type<'_>) -> (i64, i64) {
    match ty.prim() {
        Some(Prim::Char) => (0, i64::from(u16::MAX)),
        Some(Prim::Byte) => (i64::from(i8::MIN), i64::from(i8::MAX)),
        Some(Prim::Short) => (i64::from(i16::MIN), i64::from(i16::MAX)),
        Some(Prim::Int) => (i64::from(i32::MIN), i64::from(i32::MAX)),
        _ => (i64::MIN, i64::MAX),
    }
}
