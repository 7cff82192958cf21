use crate::ast::{Ast, BinOp, NodeId, NodeKind, UnOp};
use crate::errors::{Error, Result};
use crate::pool::{Const, ConstId, ConstantPool, MethodInfo};
use crate::resolve::TypeTable;
use crate::types::{Type, TypeManager};
use tracing::debug;

/// Computes the Java-side type of every node in a subtree.
///
/// Resolution is bottom-up and reads only the children's recorded types,
/// so resolving an unchanged subtree twice gives the same answer.
pub struct Resolver<'a, 't> {
    types: &'t TypeManager<'t>,
    pool: &'a ConstantPool<'t>,
    check: bool,
}

impl<'a, 't> Resolver<'a, 't> {
    /// With `check` set, a node whose recorded type changes is an error.
    pub fn new(types: &'t TypeManager<'t>, pool: &'a ConstantPool<'t>, check: bool) -> Self {
        Resolver { types, pool, check }
    }

    pub fn resolve(
        &self,
        ast: &Ast<'t>,
        table: &mut TypeTable<'t>,
        id: NodeId,
    ) -> Result<&'t Type<'t>> {
        for kid in ast.kids(id).iter().flatten() {
            self.resolve(ast, table, *kid)?;
        }
        let ty = self.node_type(ast, table, id)?;
        table.set(id, ty, self.check)?;
        let cond = self.yields_condition(ast, table, id)?;
        table.set_yields_condition(id, cond);
        if ast.root() == Some(id) {
            debug!(nodes = ast.len(), checked = self.check, "Resolved method body");
        }
        Ok(ty)
    }

    fn method(&self, id: ConstId, node: NodeId, kind: &'static str) -> Result<&'a MethodInfo<'t>> {
        self.pool
            .get(id)?
            .as_method()
            .ok_or_else(|| Error::structure(kind, Some(node), format!("{} is not a method", id)))
    }

    fn node_type(&self, ast: &Ast<'t>, table: &TypeTable<'t>, id: NodeId) -> Result<&'t Type<'t>> {
        let types = self.types;
        let kid_ty = |slot: usize| -> Result<&'t Type<'t>> { table.ty(ast.expect_kid(id, slot)?) };

        let ty = match ast.kind(id) {
            NodeKind::Block(_)
            | NodeKind::Multi { stmts: true }
            | NodeKind::If
            | NodeKind::While { .. }
            | NodeKind::DoWhile { .. }
            | NodeKind::ForClassic { .. }
            | NodeKind::ForIterate { .. }
            | NodeKind::ForRange { .. }
            | NodeKind::TryCatch { .. }
            | NodeKind::Assert
            | NodeKind::Throw
            | NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Return
            | NodeKind::NoOp => types.void(),
            NodeKind::Switch(info) => info.result.unwrap_or_else(|| types.void()),
            NodeKind::Define { ty, .. } | NodeKind::RegisterRef { ty, .. } => *ty,
            NodeKind::Ignore | NodeKind::DefaultArg => types.object(),
            NodeKind::Constant(c) => types.resolve_constant_type(self.pool.get(*c)?)?,
            NodeKind::PropertyRef { prop } => match self.pool.get(*prop)? {
                Const::Property { ty, .. } => *ty,
                _ => {
                    return Err(Error::structure(
                        "PropertyRef",
                        Some(id),
                        format!("{} is not a property", prop),
                    ));
                }
            },
            NodeKind::Assign(op) if op.is_conditional() => types.bool(),
            NodeKind::Assign(_) => kid_ty(0)?,
            NodeKind::BinaryOp(op) => self.binary_type(ast, table, id, *op)?,
            NodeKind::UnaryOp(op) => {
                let operand = kid_ty(0)?;
                match op {
                    UnOp::Not => types.bool(),
                    UnOp::Elvis => types.non_null(operand),
                    op if op.mutates() => operand,
                    _ => types.promote(operand, operand),
                }
            }
            NodeKind::Ternary => self.join(kid_ty(1)?, kid_ty(2)?),
            NodeKind::Invoke { method } => self.method(*method, id, "Invoke")?.java_return(types),
            NodeKind::Call => match kid_ty(0)? {
                Type::Function { rets, .. } => match *rets {
                    [] => types.void(),
                    [single] => *single,
                    many => types.tuple(many),
                },
                _ => types.object(),
            },
            NodeKind::New { ty, .. }
            | NodeKind::NewVirtual { ty, .. }
            | NodeKind::Convert { ty, .. }
            | NodeKind::Narrow { ty }
            | NodeKind::Outer { ty }
            | NodeKind::Tuple { ty }
            | NodeKind::ListLiteral { ty }
            | NodeKind::MapLiteral { ty }
            | NodeKind::StmtExpr { ty } => *ty,
            NodeKind::Is { .. } | NodeKind::CompareChain { .. } | NodeKind::Order(_) => {
                types.bool()
            }
            NodeKind::BindFunction { indices } => match kid_ty(0)? {
                Type::Function { args, rets } => {
                    let unbound: Vec<&'t Type<'t>> = args
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| !indices.contains(i))
                        .map(|(_, ty)| *ty)
                        .collect();
                    types.function(&unbound, rets)
                }
                other => {
                    return Err(Error::structure(
                        "BindFunction",
                        Some(id),
                        format!("cannot bind arguments of `{}`", other),
                    ));
                }
            },
            NodeKind::BindMethod { method } => {
                let method = self.method(*method, id, "BindMethod")?;
                types.function(&method.param_types(), &method.rets)
            }
            NodeKind::DivRem => {
                let value = types.box_type(types.promote(kid_ty(0)?, kid_ty(1)?));
                types.tuple(&[value, value])
            }
            NodeKind::Unpack => kid_ty(0)?,
            NodeKind::TemplateString => types.str(),
            NodeKind::Multi { stmts: false } => {
                let items = ast
                    .kids(id)
                    .iter()
                    .flatten()
                    .map(|kid| table.ty(*kid))
                    .collect::<Result<Vec<_>>>()?;
                if !items.is_empty() && items.iter().all(|ty| ty.is_prim() && ty.is_bool()) {
                    types.bool()
                } else {
                    let boxed: Vec<_> = items.iter().map(|ty| types.box_type(ty)).collect();
                    types.tuple(&boxed)
                }
            }
        };
        Ok(ty)
    }

    fn binary_type(
        &self,
        ast: &Ast<'t>,
        table: &TypeTable<'t>,
        id: NodeId,
        op: BinOp,
    ) -> Result<&'t Type<'t>> {
        let types = self.types;
        let lhs_id = ast.expect_kid(id, 0)?;
        let rhs_id = ast.expect_kid(id, 1)?;
        let lhs = table.ty(lhs_id)?;
        let rhs = table.ty(rhs_id)?;

        Ok(match op {
            BinOp::Add if matches!(lhs, Type::Str) || matches!(rhs, Type::Str) => types.str(),
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor if lhs.is_bool() && rhs.is_bool() => {
                types.bool()
            }
            BinOp::Add
            | BinOp::Sub
            | BinOp::Mul
            | BinOp::Div
            | BinOp::Mod
            | BinOp::BitAnd
            | BinOp::BitOr
            | BinOp::BitXor => types.promote(lhs, rhs),
            BinOp::Shl | BinOp::Shr | BinOp::Ushr => types.promote(lhs, lhs),
            BinOp::And
            | BinOp::Or
            | BinOp::Eq
            | BinOp::Ne
            | BinOp::Lt
            | BinOp::Le
            | BinOp::Gt
            | BinOp::Ge
            | BinOp::Equals => types.bool(),
            BinOp::RangeIncl | BinOp::RangeExcl => types.range(),
            BinOp::CondElse => {
                let value = types.non_null(lhs);
                if rhs.is_nullable() {
                    types.nullable(value)
                } else {
                    value
                }
            }
            BinOp::Cmp => types.ordering(),
            BinOp::Index | BinOp::IndexPrim => match lhs {
                Type::Array(elem) if op == BinOp::Index => types.box_type(elem),
                Type::Array(elem) => types.unbox_type(elem),
                Type::Tuple(fields) => {
                    let bounds = match ast.kind(rhs_id) {
                        NodeKind::Constant(c) => self.pool.get(*c)?.int_bounds(),
                        _ => None,
                    };
                    let (lo, hi) = bounds
                        .and_then(|(lo, hi)| Some((usize::try_from(lo).ok()?, usize::try_from(hi).ok()?)))
                        .filter(|(lo, hi)| lo <= hi && *hi < fields.len())
                        .ok_or_else(|| {
                            Error::structure("BinaryOp", Some(id), "tuple index must be a constant")
                        })?;
                    match ast.kind(rhs_id) {
                        // A range index slices the tuple.
                        NodeKind::Constant(c) if matches!(self.pool.get(*c)?, Const::Range { .. }) => {
                            types.tuple(&fields[lo..=hi])
                        }
                        _ => fields[lo],
                    }
                }
                Type::Str => types.char(),
                _ => types.object(),
            },
        })
    }

    /// Type of a ternary whose arms have types `a` and `b`.
    fn join(&self, a: &'t Type<'t>, b: &'t Type<'t>) -> &'t Type<'t> {
        let types = self.types;
        match (a, b) {
            _ if core::ptr::eq(a, b) => a,
            (Type::Void, _) => b,
            (_, Type::Void) => a,
            (Type::Null, _) => types.nullable(b),
            (_, Type::Null) => types.nullable(a),
            (Type::Prim(_), Type::Prim(_)) => types.promote(a, b),
            (Type::Nullable(_), _) => a,
            (_, Type::Nullable(_)) => b,
            _ if a.is_prim() => b,
            _ => a,
        }
    }

    fn yields_condition(&self, ast: &Ast<'t>, table: &TypeTable<'t>, id: NodeId) -> Result<bool> {
        Ok(match ast.kind(id) {
            NodeKind::Invoke { method } => self.method(*method, id, "Invoke")?.cond_ret,
            NodeKind::Ternary => {
                let then = ast.expect_kid(id, 1)?;
                let other = ast.expect_kid(id, 2)?;
                table.yields_condition(then) && table.yields_condition(other)
            }
            _ => false,
        })
    }
}
