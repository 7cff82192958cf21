use crate::ast::{AssignOp, Ast, BinOp, BlockScope, NodeId, NodeKind, SwitchInfo, UnOp};
use crate::decode::cursor::Cursor;
use crate::decode::locals::Locals;
use crate::decode::opcodes::{
    A_DEFAULT, A_IGNORE, A_STACK, A_SUPER, A_THIS, CONSTANT_OFFSET, NodeTag, REGISTER_OFFSET,
};
use crate::errors::{Error, Result};
use crate::pool::{Const, ConstId, ConstantPool, MethodInfo};
use crate::types::{Type, TypeManager};
use tracing::debug;

/// Decodes one method body into a fresh tree.
///
/// The method's parameters are live registers `0..n`. The root is always a
/// block; trailing bytes after the root statement are an error.
pub fn decode_body<'t>(
    types: &'t TypeManager<'t>,
    pool: &ConstantPool<'t>,
    method: &MethodInfo<'t>,
    bytes: &[u8],
) -> Result<Ast<'t>> {
    let mut decoder = Decoder::new(types, pool, method, bytes);
    for param in &method.params {
        decoder.locals.register(&param.name, param.ty);
    }

    let root = decoder.decode()?;
    if !decoder.cur.at_end() {
        return Err(decoder.error(decoder.cur.pos(), "trailing bytes after method body"));
    }
    let root = match decoder.ast.kind(root) {
        NodeKind::Block(_) => root,
        _ => decoder
            .ast
            .branch(NodeKind::Block(Box::new(BlockScope::new())), &[root]),
    };
    decoder.ast.set_root(root);

    debug!(method = %method.name, nodes = decoder.ast.len(), "Decoded method body");
    Ok(decoder.ast)
}

/// Recursive-descent reader producing [`Ast`] nodes.
pub struct Decoder<'a, 'p, 't> {
    cur: Cursor<'a>,
    types: &'t TypeManager<'t>,
    pool: &'p ConstantPool<'t>,
    method: &'p MethodInfo<'t>,
    ast: Ast<'t>,
    locals: Locals<'t>,
    /// Last tag read, reported with errors.
    tag: Option<i64>,
}

impl<'a, 'p, 't> Decoder<'a, 'p, 't> {
    pub fn new(
        types: &'t TypeManager<'t>,
        pool: &'p ConstantPool<'t>,
        method: &'p MethodInfo<'t>,
        bytes: &'a [u8],
    ) -> Self {
        Decoder {
            cur: Cursor::new(bytes),
            types,
            pool,
            method,
            ast: Ast::new(),
            locals: Locals::new(),
            tag: None,
        }
    }

    fn error(&self, offset: usize, reason: impl Into<String>) -> Error {
        Error::decode(offset, self.tag, reason)
    }

    /// Node in statement position: a one-byte tag.
    pub fn decode(&mut self) -> Result<NodeId> {
        let start = self.cur.pos();
        let b = self.cur.read_u8()?;
        self.tag = Some(b as i64);
        let tag = NodeTag::from_u8(b).ok_or_else(|| self.error(start, "unknown node tag"))?;
        if tag == NodeTag::None {
            return Ok(self.ast.leaf(NodeKind::NoOp));
        }
        self.node(tag, start)
    }

    /// Node in expression position, where registers and constants are
    /// encoded inline. Returns `None` for an empty slot.
    pub fn decode_term(&mut self) -> Result<Option<NodeId>> {
        let start = self.cur.pos();
        let n = self.cur.read_packed()?;
        if n <= CONSTANT_OFFSET {
            let id = u32::try_from(CONSTANT_OFFSET - n)
                .map_err(|_| self.error(start, "constant index out of range"))?;
            let id = self.checked_const(id, start)?;
            return Ok(Some(self.ast.leaf(NodeKind::Constant(id))));
        }
        if n < 0 {
            return self.special_register(n, start).map(Some);
        }
        if n >= REGISTER_OFFSET {
            return self.register_ref((n - REGISTER_OFFSET) as u32, start).map(Some);
        }
        if n == 0 {
            return Ok(None);
        }
        let tag = if n == NodeTag::Escape as i64 {
            let b = self.cur.read_u8()?;
            self.tag = Some(b as i64);
            NodeTag::from_u8(b).ok_or_else(|| self.error(start, "unknown node tag"))?
        } else {
            self.tag = Some(n);
            NodeTag::from_u8(n as u8).ok_or_else(|| self.error(start, "unknown node tag"))?
        };
        self.node(tag, start).map(Some)
    }

    // === Field readers ===

    fn expr(&mut self) -> Result<NodeId> {
        let start = self.cur.pos();
        self.decode_term()?
            .ok_or_else(|| self.error(start, "missing expression"))
    }

    fn exprs(&mut self) -> Result<Vec<NodeId>> {
        let count = self.cur.read_magnitude()?;
        (0..count).map(|_| self.expr()).collect()
    }

    fn checked_const(&self, id: u32, offset: usize) -> Result<ConstId> {
        let id = ConstId(id);
        self.pool
            .get(id)
            .map_err(|_| self.error(offset, format!("no constant {} in pool", id)))?;
        Ok(id)
    }

    fn const_id(&mut self) -> Result<ConstId> {
        let start = self.cur.pos();
        let id = self.cur.read_magnitude()?;
        self.checked_const(id, start)
    }

    fn constant(&mut self) -> Result<(ConstId, &'p Const<'t>)> {
        let start = self.cur.pos();
        let id = self.const_id()?;
        let pool = self.pool;
        let constant = pool.get(id).map_err(|_| self.error(start, "bad constant"))?;
        Ok((id, constant))
    }

    fn type_const(&mut self) -> Result<&'t Type<'t>> {
        let start = self.cur.pos();
        let (_, constant) = self.constant()?;
        self.types
            .resolve_type(constant, false)
            .ok_or_else(|| self.error(start, "expected a type constant"))
    }

    fn name_const(&mut self) -> Result<String> {
        let start = self.cur.pos();
        match self.constant()? {
            (_, Const::Str(name)) => Ok(name.clone()),
            _ => Err(self.error(start, "expected a name constant")),
        }
    }

    fn method_const(&mut self) -> Result<ConstId> {
        let start = self.cur.pos();
        match self.constant()? {
            (id, Const::Method(_)) => Ok(id),
            _ => Err(self.error(start, "expected a method constant")),
        }
    }

    fn op_byte(&mut self) -> Result<(u8, usize)> {
        let start = self.cur.pos();
        Ok((self.cur.read_u8()?, start))
    }

    fn bin_op(&mut self) -> Result<BinOp> {
        let (b, start) = self.op_byte()?;
        BinOp::from_byte(b).ok_or_else(|| self.error(start, format!("unknown binary operator {}", b)))
    }

    fn un_op(&mut self) -> Result<UnOp> {
        let (b, start) = self.op_byte()?;
        UnOp::from_byte(b).ok_or_else(|| self.error(start, format!("unknown unary operator {}", b)))
    }

    fn assign_op(&mut self) -> Result<AssignOp> {
        let (b, start) = self.op_byte()?;
        AssignOp::from_byte(b)
            .ok_or_else(|| self.error(start, format!("unknown assignment operator {}", b)))
    }

    /// Runs `f` inside a register scope.
    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.locals.enter();
        let result = f(self)?;
        if !self.locals.exit() {
            return Err(self.error(self.cur.pos(), "unbalanced register scope"));
        }
        Ok(result)
    }

    /// Statement slot where `NoOp` means "absent".
    fn opt_stmt(&mut self) -> Result<Option<NodeId>> {
        let stmt = self.decode()?;
        Ok(match self.ast.kind(stmt) {
            NodeKind::NoOp => None,
            _ => Some(stmt),
        })
    }

    // === Terms ===

    fn special_register(&mut self, n: i64, start: usize) -> Result<NodeId> {
        let kind = match n {
            A_THIS => NodeKind::RegisterRef {
                name: "this".to_string(),
                ty: self.method.owner,
            },
            A_SUPER => NodeKind::RegisterRef {
                name: "super".to_string(),
                ty: self.method.owner,
            },
            A_DEFAULT => NodeKind::DefaultArg,
            A_IGNORE => NodeKind::Ignore,
            A_STACK => return Err(self.error(start, "stack register in a tree body")),
            _ => return Err(self.error(start, format!("unsupported special register {}", n))),
        };
        Ok(self.ast.leaf(kind))
    }

    fn register_ref(&mut self, reg: u32, start: usize) -> Result<NodeId> {
        let local = self
            .locals
            .get(reg)
            .ok_or_else(|| self.error(start, format!("register {} is not live", reg)))?;
        let kind = NodeKind::RegisterRef {
            name: local.name.clone(),
            ty: local.ty,
        };
        Ok(self.ast.leaf(kind))
    }

    fn define(&mut self, name: Option<String>, ty: &'t Type<'t>) -> NodeId {
        let base = name.unwrap_or_else(|| format!("$r{}", self.locals.len()));
        let (_, name) = self.locals.register(&base, ty);
        self.ast.leaf(NodeKind::Define { name, ty })
    }

    fn unary(&mut self, op: UnOp) -> Result<NodeId> {
        let operand = self.expr()?;
        Ok(self.ast.branch(NodeKind::UnaryOp(op), &[operand]))
    }

    fn with_args(&mut self, kind: NodeKind<'t>, head: &[NodeId]) -> Result<NodeId> {
        let mut kids = head.to_vec();
        kids.extend(self.exprs()?);
        Ok(self.ast.branch(kind, &kids))
    }

    // === Nodes ===

    fn node(&mut self, tag: NodeTag, start: usize) -> Result<NodeId> {
        let id = match tag {
            NodeTag::PropertyExpr => {
                let target = self.expr()?;
                let prop_start = self.cur.pos();
                let (prop, constant) = self.constant()?;
                if !matches!(constant, Const::Property { .. }) {
                    return Err(self.error(prop_start, "expected a property constant"));
                }
                self.ast.branch(NodeKind::PropertyRef { prop }, &[target])
            }
            NodeTag::InvokeExpr => {
                let method = self.method_const()?;
                let target = self.expr()?;
                self.with_args(NodeKind::Invoke { method }, &[target])?
            }
            NodeTag::CallExpr => {
                let function = self.expr()?;
                self.with_args(NodeKind::Call, &[function])?
            }
            NodeTag::CondOpExpr | NodeTag::RelOpExpr => {
                let lhs = self.expr()?;
                let op = self.bin_op()?;
                let rhs = self.expr()?;
                self.ast.branch(NodeKind::BinaryOp(op), &[lhs, rhs])
            }
            NodeTag::Assign => {
                let lhs = self.expr()?;
                let rhs = self.expr()?;
                self.ast.branch(NodeKind::Assign(AssignOp::Asn), &[lhs, rhs])
            }
            NodeTag::BinOpAssign => {
                let lhs = self.expr()?;
                let op = self.assign_op()?;
                let rhs = self.expr()?;
                self.ast.branch(NodeKind::Assign(op), &[lhs, rhs])
            }
            NodeTag::NamedRegAlloc | NodeTag::AnnoNamedRegAlloc => {
                if tag == NodeTag::AnnoNamedRegAlloc {
                    self.const_id()?;
                }
                let ty = self.type_const()?;
                let name = self.name_const()?;
                self.define(Some(name), ty)
            }
            NodeTag::RegAlloc | NodeTag::AnnoRegAlloc => {
                if tag == NodeTag::AnnoRegAlloc {
                    self.const_id()?;
                }
                let ty = self.type_const()?;
                self.define(None, ty)
            }
            NodeTag::NarrowedExpr => {
                let ty = self.type_const()?;
                let operand = self.expr()?;
                self.ast.branch(NodeKind::Narrow { ty }, &[operand])
            }
            NodeTag::ConvertExpr => {
                let ty = self.type_const()?;
                let conv_start = self.cur.pos();
                let name = match self.constant()? {
                    (_, Const::Method(m)) => m.name.clone(),
                    _ => return Err(self.error(conv_start, "expected a conversion method")),
                };
                let operand = self.expr()?;
                let conv = crate::ast::Conv::Method(name);
                self.ast.branch(NodeKind::Convert { ty, conv }, &[operand])
            }
            NodeTag::UnaryOpExpr => {
                let op = self.un_op()?;
                self.unary(op)?
            }
            NodeTag::NotExpr => self.unary(UnOp::Not)?,
            NodeTag::NegExpr => self.unary(UnOp::Neg)?,
            NodeTag::BitNotExpr => self.unary(UnOp::BitNot)?,
            NodeTag::PreIncExpr => self.unary(UnOp::PreInc)?,
            NodeTag::PreDecExpr => self.unary(UnOp::PreDec)?,
            NodeTag::PostIncExpr => self.unary(UnOp::PostInc)?,
            NodeTag::PostDecExpr => self.unary(UnOp::PostDec)?,
            NodeTag::NotNullExpr => self.unary(UnOp::Elvis)?,
            NodeTag::NewExpr => {
                let ty = self.type_const()?;
                let ctor = self.method_const()?;
                self.with_args(NodeKind::New { ty, ctor: Some(ctor) }, &[])?
            }
            NodeTag::NewChildExpr | NodeTag::NewVirtualExpr => {
                let outer = self.expr()?;
                let ty = self.type_const()?;
                let ctor = self.method_const()?;
                self.with_args(NodeKind::NewVirtual { ty, ctor: Some(ctor) }, &[outer])?
            }
            NodeTag::ThrowExpr => {
                let exception = self.expr()?;
                self.ast.branch(NodeKind::Throw, &[exception])
            }
            NodeTag::ArrayAccessExpr => {
                let array = self.expr()?;
                let index = self.expr()?;
                self.ast.branch(NodeKind::BinaryOp(BinOp::Index), &[array, index])
            }
            NodeTag::TernaryExpr => {
                let cond = self.expr()?;
                let then = self.expr()?;
                let other = self.expr()?;
                self.ast.branch(NodeKind::Ternary, &[cond, then, other])
            }
            NodeTag::OuterExpr => {
                let operand = self.expr()?;
                let ty = self.type_const()?;
                self.ast.branch(NodeKind::Outer { ty }, &[operand])
            }
            NodeTag::MultiExpr => self.with_args(NodeKind::Multi { stmts: false }, &[])?,
            NodeTag::TemplateExpr => self.with_args(NodeKind::TemplateString, &[])?,
            NodeTag::TupleExpr => {
                let ty = self.type_const()?;
                self.with_args(NodeKind::Tuple { ty }, &[])?
            }
            NodeTag::ListExpr => {
                let ty = self.type_const()?;
                self.with_args(NodeKind::ListLiteral { ty }, &[])?
            }
            NodeTag::MapExpr => {
                let ty = self.type_const()?;
                let keys = self.exprs()?;
                let values = self.exprs()?;
                if keys.len() != values.len() {
                    return Err(self.error(start, "map literal key/value counts differ"));
                }
                let kids: Vec<NodeId> = keys
                    .into_iter()
                    .zip(values)
                    .flat_map(|(k, v)| [k, v])
                    .collect();
                self.ast.branch(NodeKind::MapLiteral { ty }, &kids)
            }
            NodeTag::BindFunctionExpr => {
                let function = self.expr()?;
                let count = self.cur.read_magnitude()?;
                // The count is untrusted; let the vectors grow with what is
                // actually read.
                let mut indices = Vec::new();
                let mut kids = vec![function];
                for _ in 0..count {
                    indices.push(self.cur.read_magnitude()? as usize);
                    kids.push(self.expr()?);
                }
                self.ast.branch(NodeKind::BindFunction { indices }, &kids)
            }
            NodeTag::BindMethodExpr => {
                let target = self.expr()?;
                let method = self.method_const()?;
                self.ast.branch(NodeKind::BindMethod { method }, &[target])
            }
            NodeTag::DivRemExpr => {
                let lhs = self.expr()?;
                let rhs = self.expr()?;
                self.ast.branch(NodeKind::DivRem, &[lhs, rhs])
            }
            NodeTag::UnpackExpr => {
                let tuple = self.expr()?;
                self.ast.branch(NodeKind::Unpack, &[tuple])
            }
            NodeTag::IsExpr => {
                let operand = self.expr()?;
                let ty = self.type_const()?;
                self.ast.branch(NodeKind::Is { ty }, &[operand])
            }
            NodeTag::CmpChainExpr => {
                let operands = self.exprs()?;
                if operands.len() < 2 {
                    return Err(self.error(start, "comparison chain needs two operands"));
                }
                let mut ops = Vec::with_capacity(operands.len() - 1);
                for _ in 1..operands.len() {
                    let op_start = self.cur.pos();
                    let op = self.bin_op()?;
                    if !op.is_comparison() {
                        return Err(self.error(op_start, "comparison chain with a non-comparison"));
                    }
                    ops.push(op);
                }
                self.ast.branch(NodeKind::CompareChain { ops }, &operands)
            }
            NodeTag::ConstantExpr => {
                let id = self.const_id()?;
                self.ast.leaf(NodeKind::Constant(id))
            }
            NodeTag::StmtExpr => {
                let body = self.decode()?;
                let body = match self.ast.kind(body) {
                    NodeKind::Block(_) => body,
                    _ => self
                        .ast
                        .branch(NodeKind::Block(Box::new(BlockScope::new())), &[body]),
                };
                let ty = self.type_const()?;
                self.ast.branch(NodeKind::StmtExpr { ty }, &[body])
            }
            NodeTag::SwitchExpr => self.switch(true, start)?,
            NodeTag::SwitchStmt => self.switch(false, start)?,
            NodeTag::AssertStmt => {
                let cond = self.expr()?;
                let message = self.decode_term()?;
                self.ast.add(NodeKind::Assert, [Some(cond), message])
            }
            NodeTag::StmtBlock => {
                let stmts = self.scoped(|d| {
                    let count = d.cur.read_magnitude()?;
                    (0..count).map(|_| d.decode()).collect::<Result<Vec<_>>>()
                })?;
                self.ast
                    .branch(NodeKind::Block(Box::new(BlockScope::new())), &stmts)
            }
            NodeTag::MultiStmt => {
                let count = self.cur.read_magnitude()?;
                let stmts = (0..count)
                    .map(|_| self.decode())
                    .collect::<Result<Vec<_>>>()?;
                self.ast.branch(NodeKind::Multi { stmts: true }, &stmts)
            }
            NodeTag::IfThenStmt | NodeTag::IfElseStmt => {
                let (cond, then, other) = self.scoped(|d| {
                    let cond = d.expr()?;
                    let then = d.scoped(|d| d.decode())?;
                    let other = if tag == NodeTag::IfElseStmt {
                        Some(d.scoped(|d| d.decode())?)
                    } else {
                        None
                    };
                    Ok((cond, then, other))
                })?;
                self.ast.add(NodeKind::If, [Some(cond), Some(then), other])
            }
            NodeTag::LoopStmt => {
                let body = self.scoped(|d| d.decode())?;
                self.ast.add(NodeKind::While { label: None }, [None, Some(body)])
            }
            NodeTag::WhileDoStmt => {
                let (cond, body) = self.scoped(|d| Ok((d.expr()?, d.decode()?)))?;
                self.ast.branch(NodeKind::While { label: None }, &[cond, body])
            }
            NodeTag::DoWhileStmt => {
                let (body, cond) = self.scoped(|d| Ok((d.decode()?, d.expr()?)))?;
                self.ast.branch(NodeKind::DoWhile { label: None }, &[body, cond])
            }
            NodeTag::ForStmt => {
                let kids = self.scoped(|d| {
                    let init = d.opt_stmt()?;
                    let cond = d.decode_term()?;
                    let update = d.opt_stmt()?;
                    let body = d.decode()?;
                    Ok([init, cond, update, Some(body)])
                })?;
                self.ast.add(NodeKind::ForClassic { label: None }, kids)
            }
            NodeTag::ForIteratorStmt
            | NodeTag::ForListStmt
            | NodeTag::ForIterableStmt
            | NodeTag::ForMapStmt
            | NodeTag::ForRangeStmt => {
                let kids = self.scoped(|d| Ok([d.expr()?, d.expr()?, d.decode()?]))?;
                let kind = match tag {
                    NodeTag::ForRangeStmt => NodeKind::ForRange { label: None },
                    NodeTag::ForMapStmt => NodeKind::ForIterate {
                        label: None,
                        map: true,
                    },
                    _ => NodeKind::ForIterate {
                        label: None,
                        map: false,
                    },
                };
                self.ast.branch(kind, &kids)
            }
            NodeTag::ContinueStmt => {
                let depth = self.cur.read_magnitude()?;
                self.ast.leaf(NodeKind::Continue { depth })
            }
            NodeTag::BreakStmt => {
                let depth = self.cur.read_magnitude()?;
                self.ast.leaf(NodeKind::Break { depth, label: None })
            }
            NodeTag::Return0Stmt => self.ast.leaf(NodeKind::Return),
            NodeTag::Return1Stmt | NodeTag::ReturnTStmt => {
                let value = self.expr()?;
                self.ast.branch(NodeKind::Return, &[value])
            }
            NodeTag::ReturnNStmt => self.with_args(NodeKind::Return, &[])?,
            NodeTag::TryCatchStmt | NodeTag::TryFinallyStmt => self.try_catch(tag)?,
            NodeTag::None
            | NodeTag::Escape
            | NodeTag::RegisterExpr
            | NodeTag::InvokeAsyncExpr
            | NodeTag::CallAsyncExpr
            | NodeTag::RefOfExpr
            | NodeTag::VarOfExpr
            | NodeTag::NotCond
            | NodeTag::NotNullCond
            | NodeTag::NotFalseCond
            | NodeTag::MatrixAccessExpr
            | NodeTag::NotImplYet => {
                return Err(self.error(start, format!("unsupported node {:?}", tag)));
            }
        };
        Ok(id)
    }

    fn switch(&mut self, is_expr: bool, start: usize) -> Result<NodeId> {
        let (cond, isa, cases, bodies) = self.scoped(|d| {
            let cond = d.expr()?;
            let isa = d.cur.read_packed()? as u64;
            let rows = d.cur.read_magnitude()? as usize;
            if rows == 0 || rows > 64 {
                return Err(d.error(start, format!("switch with {} rows", rows)));
            }
            let mut cases = Vec::with_capacity(rows);
            for _ in 0..rows {
                let case_start = d.cur.pos();
                let id = d.cur.read_packed()?;
                cases.push(match u32::try_from(id) {
                    Ok(id) => Some(d.checked_const(id, case_start)?),
                    Err(_) if id == -1 => None,
                    Err(_) => return Err(d.error(case_start, "bad case constant")),
                });
            }
            let has_body = d.cur.read_packed()? as u64;
            let mut bodies = Vec::with_capacity(rows);
            for row in 0..rows {
                if has_body & (1u64 << row) == 0 {
                    bodies.push(None);
                    continue;
                }
                let body = d.scoped(|d| if is_expr { d.expr() } else { d.decode() })?;
                bodies.push(Some(body));
            }
            Ok((cond, isa, cases, bodies))
        })?;
        let result = if is_expr {
            Some(self.type_const()?)
        } else {
            None
        };
        let info = SwitchInfo {
            is_expr,
            isa,
            cases,
            result,
            native: None,
            label: None,
        };
        let kids = core::iter::once(Some(cond)).chain(bodies);
        Ok(self.ast.add(NodeKind::Switch(Box::new(info)), kids))
    }

    fn try_catch(&mut self, tag: NodeTag) -> Result<NodeId> {
        let (kids, resources, catches, finally) = self.scoped(|d| {
            let resources = d.exprs()?;
            let mut kids: Vec<NodeId> = resources.clone();
            kids.push(d.decode()?);
            let count = d.cur.read_magnitude()? as usize;
            for _ in 0..count {
                let (var, handler) = d.scoped(|d| Ok((d.expr()?, d.decode()?)))?;
                kids.push(var);
                kids.push(handler);
            }
            let finally = tag == NodeTag::TryFinallyStmt;
            if finally {
                kids.push(d.decode()?);
            }
            Ok((kids, resources.len(), count, finally))
        })?;
        Ok(self.ast.branch(
            NodeKind::TryCatch {
                resources,
                catches,
                finally,
            },
            &kids,
        ))
    }
}
