use crate::ast::block::final_name;
use crate::ast::{Ast, BinOp, BlockScope, CaseLabel, Conv, NativeArm, NativeSwitch, NodeId, NodeKind, UnOp};
use crate::emit::precedence::{self as prec, ADDITIVE, LAMBDA, MULTIPLICATIVE, POSTFIX, PRIMARY, RELATIONAL, TERNARY, UNARY};
use crate::emit::sink::Sb;
use crate::errors::{Error, Result};
use crate::pool::{Const, ConstId, ConstantPool, IntFormat, MethodInfo};
use crate::resolve::TypeTable;
use crate::types::Type;

/// Prints a lowered tree as Java.
///
/// Statements end with a newline; expressions never do, although a
/// lambda body or a switch expression spans several lines.
pub struct Emitter<'a, 't> {
    ast: &'a Ast<'t>,
    pool: &'a ConstantPool<'t>,
    table: &'a TypeTable<'t>,
    out: Sb,
}

impl<'a, 't> Emitter<'a, 't> {
    pub fn new(
        ast: &'a Ast<'t>,
        pool: &'a ConstantPool<'t>,
        table: &'a TypeTable<'t>,
        indent: &'static str,
    ) -> Self {
        Emitter {
            ast,
            pool,
            table,
            out: Sb::new(indent),
        }
    }

    pub fn finish(self) -> String {
        self.out.finish()
    }

    /// Prints a method body. The root must be a block.
    pub fn body(&mut self, root: NodeId) -> Result<()> {
        if !matches!(self.ast.kind(root), NodeKind::Block(_)) {
            return Err(self.error(root, "method body is not a block"));
        }
        self.statement(root)
    }

    pub fn expression(&mut self, id: NodeId) -> Result<()> {
        self.expr(id, LAMBDA)
    }

    fn error(&self, id: NodeId, reason: impl Into<String>) -> Error {
        Error::structure(self.ast.kind(id).name(), Some(id), reason)
    }

    fn kid(&self, id: NodeId, slot: usize) -> Result<NodeId> {
        self.ast.expect_kid(id, slot)
    }

    fn method(&self, id: NodeId, method: ConstId) -> Result<&'a MethodInfo<'t>> {
        let pool = self.pool;
        pool.get(method)?
            .as_method()
            .ok_or_else(|| self.error(id, format!("{} is not a method", method)))
    }

    // === Statements ===

    fn statement(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Block(scope) => {
                self.label(scope.label.as_deref());
                self.open_block();
                self.block_contents(id, scope)?;
                self.close_block();
                self.out.newline();
            }
            NodeKind::Multi { stmts: true } => {
                for kid in ast.kids(id).iter().flatten() {
                    self.statement(*kid)?;
                }
            }
            NodeKind::NoOp => {}
            NodeKind::If => self.if_chain(id)?,
            NodeKind::While { label } => {
                self.label(label.as_deref());
                self.out.print("while (");
                match ast.kid(id, 0) {
                    Some(cond) => self.expr(cond, LAMBDA)?,
                    None => self.out.print("true"),
                }
                self.out.print(") ");
                self.braced(self.kid(id, 1)?)?;
                self.out.newline();
            }
            NodeKind::DoWhile { label } => {
                self.label(label.as_deref());
                self.out.print("do ");
                self.braced(self.kid(id, 0)?)?;
                self.out.print(" while (");
                self.expr(self.kid(id, 1)?, LAMBDA)?;
                self.out.print(");");
                self.out.newline();
            }
            NodeKind::ForClassic { label } => {
                self.label(label.as_deref());
                self.for_classic(id)?;
            }
            NodeKind::ForIterate { label, map } => {
                self.label(label.as_deref());
                self.for_each(id, *map)?;
            }
            NodeKind::ForRange { .. } => return Err(self.error(id, "ranged loop was not lowered")),
            NodeKind::Switch(info) if !info.is_expr => {
                let native = info
                    .native
                    .as_ref()
                    .ok_or_else(|| self.error(id, "switch was not lowered"))?;
                self.label(info.label.as_deref());
                self.switch_statement(id, native)?;
            }
            NodeKind::TryCatch {
                resources,
                catches,
                finally,
            } => self.try_catch(id, *resources, *catches, *finally)?,
            NodeKind::Assert => {
                self.out.print("$assert(");
                self.expr(self.kid(id, 0)?, LAMBDA)?;
                if let Some(message) = self.ast.kid(id, 1) {
                    self.out.print(", ");
                    self.expr(message, LAMBDA)?;
                }
                self.out.print(");");
                self.out.newline();
            }
            NodeKind::Throw => {
                self.out.print("throw ");
                self.expr(self.kid(id, 0)?, LAMBDA)?;
                self.out.print(";");
                self.out.newline();
            }
            NodeKind::Break { label, .. } => {
                match label {
                    Some(label) => self.out.print(&format!("break {};", label)),
                    None => self.out.print("break;"),
                }
                self.out.newline();
            }
            NodeKind::Continue { .. } => {
                self.out.print("continue;");
                self.out.newline();
            }
            NodeKind::Return => {
                let values: Vec<NodeId> = ast.kids(id).iter().flatten().copied().collect();
                match values.as_slice() {
                    [] => self.out.print("return;"),
                    [value] => {
                        self.out.print("return ");
                        self.expr(*value, LAMBDA)?;
                        self.out.print(";");
                    }
                    _ => return Err(self.error(id, "several values returned without a tuple")),
                }
                self.out.newline();
            }
            NodeKind::Define { name, ty } => {
                self.out.print(&format!("{} {};", ty, name));
                self.out.newline();
            }
            _ => {
                self.expr(id, LAMBDA)?;
                self.out.print(";");
                self.out.newline();
            }
        }
        Ok(())
    }

    fn label(&mut self, label: Option<&str>) {
        if let Some(label) = label {
            self.out.print(label);
            self.out.print(": ");
        }
    }

    fn open_block(&mut self) {
        self.out.print("{");
        self.out.newline();
        self.out.indent();
    }

    fn close_block(&mut self) {
        self.out.dedent();
        self.out.print("}");
    }

    /// `{ ... }` around a statement, without the trailing newline so the
    /// caller can continue the line.
    fn braced(&mut self, id: NodeId) -> Result<()> {
        self.open_block();
        self.contents(id)?;
        self.close_block();
        Ok(())
    }

    /// The statements of an unlabeled block, or the statement itself.
    fn contents(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Block(scope) if scope.label.is_none() => self.block_contents(id, scope),
            _ => self.statement(id),
        }
    }

    fn block_contents(&mut self, id: NodeId, scope: &BlockScope<'t>) -> Result<()> {
        self.prologue(scope);
        let ast = self.ast;
        for kid in ast.kids(id).iter().flatten() {
            self.statement(*kid)?;
        }
        Ok(())
    }

    /// Declarations of the block's temps, one line per type, then the
    /// final copies taken for lambdas.
    fn prologue(&mut self, scope: &BlockScope<'t>) {
        for (ty, names) in scope.temps() {
            let decls: Vec<String> = names
                .iter()
                .map(|name| format!("{} = {}", name, ty.zero_literal()))
                .collect();
            self.out.print(&format!("{} {};", ty, decls.join(", ")));
            self.out.newline();
        }
        for (name, ty) in &scope.captured_finals {
            self.out
                .print(&format!("final {} {} = {};", ty, final_name(name), name));
            self.out.newline();
        }
    }

    fn if_chain(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;
        let mut current = id;
        loop {
            self.out.print("if (");
            self.expr(self.kid(current, 0)?, LAMBDA)?;
            self.out.print(") ");
            self.braced(self.kid(current, 1)?)?;
            let Some(other) = ast.kid(current, 2) else {
                break;
            };
            if matches!(ast.kind(other), NodeKind::NoOp) {
                break;
            }
            self.out.print(" else ");
            match self.sole_if(other) {
                Some(next) => current = next,
                None => {
                    self.braced(other)?;
                    break;
                }
            }
        }
        self.out.newline();
        Ok(())
    }

    /// An `if` that is the whole of an else branch prints as `else if`.
    fn sole_if(&self, id: NodeId) -> Option<NodeId> {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::If => Some(id),
            NodeKind::Block(scope) if scope.label.is_none() && !scope.has_prologue() => {
                match ast.kids(id) {
                    [Some(only)] if matches!(ast.kind(*only), NodeKind::If) => Some(*only),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn for_classic(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;
        self.out.print("for (");
        if let Some(init) = ast.kid(id, 0) {
            self.for_clause(init, true)?;
        }
        self.out.print(";");
        if let Some(cond) = ast.kid(id, 1) {
            self.out.print(" ");
            self.expr(cond, LAMBDA)?;
        }
        self.out.print(";");
        if let Some(update) = ast.kid(id, 2) {
            self.out.print(" ");
            self.for_clause(update, false)?;
        }
        self.out.print(") ");
        self.braced(self.kid(id, 3)?)?;
        self.out.newline();
        Ok(())
    }

    /// Init or update clause of a classic `for`: a comma list of
    /// expressions, or one declaration of several variables of one type.
    fn for_clause(&mut self, id: NodeId, is_init: bool) -> Result<()> {
        let ast = self.ast;
        let items = self.flatten(id);
        let mut declared: Option<&'t Type<'t>> = None;
        for (i, item) in items.iter().enumerate() {
            let (target, value) = match ast.kind(*item) {
                NodeKind::Assign(op) if !op.is_conditional() => {
                    (self.kid(*item, 0)?, Some(self.kid(*item, 1)?))
                }
                _ => (*item, None),
            };
            match (ast.kind(target), declared) {
                (NodeKind::Define { name, ty }, None) if is_init && i == 0 => {
                    self.out.print(&format!("{} {}", ty, name));
                    declared = Some(*ty);
                }
                (NodeKind::Define { name, ty }, Some(first)) if core::ptr::eq(first, *ty) => {
                    self.out.print(name);
                }
                (NodeKind::Define { .. }, _) | (_, Some(_)) => {
                    return Err(self.error(id, "for clause mixes declarations and expressions"));
                }
                _ => {
                    self.expr(*item, LAMBDA)?;
                    self.out.print(", ");
                    continue;
                }
            }
            if let Some(value) = value {
                self.out.print(" = ");
                self.expr(value, LAMBDA)?;
            }
            self.out.print(", ");
        }
        if !items.is_empty() {
            self.out.remove_last(2);
        }
        Ok(())
    }

    /// Statements of a statement list, with nested lists spliced in.
    fn flatten(&self, id: NodeId) -> Vec<NodeId> {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Multi { stmts: true } => ast
                .kids(id)
                .iter()
                .flatten()
                .flat_map(|kid| self.flatten(*kid))
                .collect(),
            NodeKind::NoOp => Vec::new(),
            _ => vec![id],
        }
    }

    fn for_each(&mut self, id: NodeId, map: bool) -> Result<()> {
        let ast = self.ast;
        let lvalue = self.kid(id, 0)?;
        let container = self.kid(id, 1)?;
        let body = self.kid(id, 2)?;
        self.out.print("for (");
        if !map {
            self.declaration(lvalue)?;
            self.out.print(" : ");
            self.expr(container, LAMBDA)?;
            self.out.print(") ");
            self.braced(body)?;
            self.out.newline();
            return Ok(());
        }

        let vars: Vec<NodeId> = match ast.kind(lvalue) {
            NodeKind::Multi { stmts: false } => ast.kids(lvalue).iter().flatten().copied().collect(),
            _ => vec![lvalue],
        };
        match vars.as_slice() {
            [key] => {
                self.declaration(*key)?;
                self.out.print(" : ");
                self.expr(container, POSTFIX)?;
                self.out.print(".keySet()) ");
                self.braced(body)?;
            }
            [key, value] => {
                let entry = format!("$e{}", id.0);
                self.out.print(&format!("var {} : ", entry));
                self.expr(container, POSTFIX)?;
                self.out.print(".entrySet()) ");
                self.open_block();
                self.bind_from(*key, &format!("{}.getKey()", entry))?;
                self.bind_from(*value, &format!("{}.getValue()", entry))?;
                self.contents(body)?;
                self.close_block();
            }
            _ => return Err(self.error(id, "map loop needs a key and at most one value")),
        }
        self.out.newline();
        Ok(())
    }

    /// `T x` for a declared loop or catch variable.
    fn declaration(&mut self, id: NodeId) -> Result<()> {
        match self.ast.kind(id) {
            NodeKind::Define { name, ty } => {
                self.out.print(&format!("{} {}", ty, name));
                Ok(())
            }
            _ => Err(self.error(id, "variable must be declared here")),
        }
    }

    fn bind_from(&mut self, target: NodeId, source: &str) -> Result<()> {
        let ast = self.ast;
        match ast.kind(target) {
            NodeKind::Ignore => return Ok(()),
            NodeKind::Define { name, ty } => self.out.print(&format!("{} {} = {};", ty, name, source)),
            NodeKind::RegisterRef { name, .. } => self.out.print(&format!("{} = {};", name, source)),
            _ => return Err(self.error(target, "map loop variable is not a local")),
        }
        self.out.newline();
        Ok(())
    }

    fn switch_head(&mut self, id: NodeId, native: &NativeSwitch) -> Result<()> {
        let selector = self.kid(id, 0)?;
        self.out.print("switch (");
        if native.clamp {
            self.out.print("clampInt(");
            self.expr(selector, LAMBDA)?;
            self.out.print(")");
        } else {
            self.expr(selector, LAMBDA)?;
        }
        self.out.print(") ");
        self.open_block();
        Ok(())
    }

    fn case_head(&mut self, arm: &NativeArm, arrow: bool) {
        if arm.is_default {
            self.out.print("default");
        } else {
            let labels: Vec<String> = arm.labels.iter().map(case_label).collect();
            self.out.print(&format!("case {}", labels.join(", ")));
        }
        self.out.print(if arrow { " -> " } else { ":" });
    }

    fn switch_statement(&mut self, id: NodeId, native: &NativeSwitch) -> Result<()> {
        let ast = self.ast;
        self.switch_head(id, native)?;
        for arm in &native.arms {
            self.case_head(arm, false);
            self.out.newline();
            self.out.indent();
            let body = self.kid(id, arm.body)?;
            match ast.kind(body) {
                NodeKind::Block(scope) if scope.has_prologue() => {
                    self.braced(body)?;
                    self.out.newline();
                }
                _ => self.contents(body)?,
            }
            if !arm.fallthrough && !self.ends_in_jump(body) {
                self.out.print("break;");
                self.out.newline();
            }
            self.out.dedent();
        }
        self.close_block();
        self.out.newline();
        Ok(())
    }

    fn switch_expression(&mut self, id: NodeId, native: &NativeSwitch) -> Result<()> {
        self.switch_head(id, native)?;
        for arm in &native.arms {
            self.case_head(arm, true);
            self.expr(self.kid(id, arm.body)?, LAMBDA)?;
            self.out.print(";");
            self.out.newline();
        }
        if !native.arms.iter().any(|arm| arm.is_default) {
            self.out.print("default -> throw new IllegalStateException();");
            self.out.newline();
        }
        self.close_block();
        Ok(())
    }

    /// The statement never completes normally, so no `break` is needed.
    fn ends_in_jump(&self, id: NodeId) -> bool {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Block(scope) if scope.label.is_some() => false,
            NodeKind::Block(_) | NodeKind::Multi { stmts: true } => ast
                .kids(id)
                .iter()
                .rev()
                .flatten()
                .find(|kid| !matches!(ast.kind(**kid), NodeKind::NoOp))
                .is_some_and(|last| self.ends_in_jump(*last)),
            NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Return
            | NodeKind::Throw => true,
            _ => false,
        }
    }

    fn try_catch(&mut self, id: NodeId, resources: usize, catches: usize, finally: bool) -> Result<()> {
        let ast = self.ast;
        self.out.print("try ");
        if resources > 0 {
            self.out.print("(");
            for slot in 0..resources {
                let resource = self.kid(id, slot)?;
                match ast.kind(resource) {
                    NodeKind::Assign(_) => {
                        self.declaration(self.kid(resource, 0)?)?;
                        self.out.print(" = ");
                        self.expr(self.kid(resource, 1)?, LAMBDA)?;
                    }
                    _ => self.expr(resource, LAMBDA)?,
                }
                self.out.print("; ");
            }
            self.out.remove_last(2);
            self.out.print(") ");
        }
        self.braced(self.kid(id, resources)?)?;
        for n in 0..catches {
            let var = self.kid(id, resources + 1 + 2 * n)?;
            let handler = self.kid(id, resources + 2 + 2 * n)?;
            self.out.print(" catch (");
            self.declaration(var)?;
            self.out.print(") ");
            self.braced(handler)?;
        }
        if finally {
            self.out.print(" finally ");
            self.braced(self.kid(id, resources + 1 + 2 * catches)?)?;
        }
        self.out.newline();
        Ok(())
    }

    // === Expressions ===

    /// Prints `id`, parenthesized when it binds looser than `floor`.
    fn expr(&mut self, id: NodeId, floor: u8) -> Result<()> {
        let parens = self.level(id)? < floor;
        if parens {
            self.out.print("(");
        }
        self.expr_inner(id)?;
        if parens {
            self.out.print(")");
        }
        Ok(())
    }

    /// Precedence level of the printed form of `id`.
    fn level(&self, id: NodeId) -> Result<u8> {
        let ast = self.ast;
        Ok(match ast.kind(id) {
            NodeKind::BinaryOp(op) => prec::binary(*op),
            NodeKind::Assign(_) => prec::ASSIGN,
            NodeKind::Ternary => TERNARY,
            NodeKind::UnaryOp(op) if op.is_postfix() => POSTFIX,
            NodeKind::UnaryOp(_) => UNARY,
            NodeKind::Convert { conv: Conv::Cast, .. } => UNARY,
            NodeKind::Convert { conv: Conv::Box, .. } => PRIMARY,
            NodeKind::Convert { .. } => POSTFIX,
            NodeKind::Narrow { ty } if ty.is_prim() => self.level(self.kid(id, 0)?)?,
            NodeKind::Narrow { .. } => UNARY,
            NodeKind::Is { .. } | NodeKind::Order(_) => RELATIONAL,
            NodeKind::TemplateString => ADDITIVE,
            NodeKind::BindFunction { .. }
            | NodeKind::BindMethod { .. }
            | NodeKind::Switch(_)
            | NodeKind::Throw => LAMBDA,
            NodeKind::Constant(c) => match self.pool.get(*c)? {
                Const::Int { value, .. } if *value < 0 => UNARY,
                Const::Float(f) if f.is_finite() && f.is_sign_negative() => UNARY,
                _ => PRIMARY,
            },
            NodeKind::Invoke { .. }
            | NodeKind::Call
            | NodeKind::PropertyRef { .. }
            | NodeKind::NewVirtual { .. }
            | NodeKind::StmtExpr { .. } => POSTFIX,
            _ => PRIMARY,
        })
    }

    fn expr_inner(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::RegisterRef { name, .. } => self.out.print(name),
            NodeKind::Define { name, ty } => self.out.print(&format!("{} {}", ty, name)),
            NodeKind::Constant(c) => {
                let text = literal(self.pool.get(*c)?)
                    .ok_or_else(|| self.error(id, format!("constant {} has no Java literal", c)))?;
                self.out.print(&text);
            }
            NodeKind::PropertyRef { prop } => {
                let name = match self.pool.get(*prop)? {
                    Const::Property { name, .. } => name.clone(),
                    _ => return Err(self.error(id, format!("{} is not a property", prop))),
                };
                if let Some(target) = ast.kid(id, 0) {
                    self.expr(target, POSTFIX)?;
                    self.out.print(".");
                }
                self.out.print(&name);
            }
            NodeKind::Assign(op) if !op.is_conditional() => {
                self.expr(self.kid(id, 0)?, POSTFIX)?;
                self.out.print(&format!(" {} ", op.text()));
                self.expr(self.kid(id, 1)?, LAMBDA)?;
            }
            NodeKind::BinaryOp(op) => self.binary(id, *op)?,
            NodeKind::UnaryOp(op) => self.unary(id, *op)?,
            NodeKind::Ternary => {
                self.expr(self.kid(id, 0)?, TERNARY + 1)?;
                self.out.print(" ? ");
                self.expr(self.kid(id, 1)?, LAMBDA)?;
                self.out.print(" : ");
                self.expr(self.kid(id, 2)?, TERNARY)?;
            }
            NodeKind::Invoke { method } => {
                let info = self.method(id, *method)?;
                match ast.kid(id, 0) {
                    Some(target) => {
                        self.expr(target, POSTFIX)?;
                        self.out.print(".");
                    }
                    None if info.is_static && !matches!(info.owner, Type::Object) => {
                        self.out.print(&info.owner.raw_name());
                        self.out.print(".");
                    }
                    None => {}
                }
                self.children(id, 1, &format!("{}(", info.name), ", ", ")")?;
            }
            NodeKind::Call => {
                self.expr(self.kid(id, 0)?, POSTFIX)?;
                self.children(id, 1, ".call(", ", ", ")")?;
            }
            NodeKind::New { ty, .. } => self.children(id, 0, &format!("new {}(", ty), ", ", ")")?,
            NodeKind::NewVirtual { ty, .. } => {
                self.expr(self.kid(id, 0)?, POSTFIX)?;
                self.children(id, 1, &format!(".new {}(", ty.raw_name()), ", ", ")")?;
            }
            NodeKind::Tuple { ty } | NodeKind::ListLiteral { ty } => {
                self.children(id, 0, &format!("new {}(", ty), ", ", ")")?
            }
            NodeKind::MapLiteral { ty } => {
                self.children(id, 0, &format!("{}.of(", ty.raw_name()), ", ", ")")?
            }
            NodeKind::TemplateString => self.template(id)?,
            NodeKind::StmtExpr { ty } => {
                self.out
                    .print(&format!("((Supplier<{}>) () -> ", ty.boxed_name()));
                self.braced(self.kid(id, 0)?)?;
                self.out.print(").get()");
            }
            NodeKind::BindFunction { indices } => self.bind_function(id, indices)?,
            NodeKind::BindMethod { method } => {
                let info = self.method(id, *method)?;
                match ast.kid(id, 0) {
                    Some(target) => self.expr(target, POSTFIX)?,
                    None => self.out.print(&info.owner.raw_name()),
                }
                self.out.print("::");
                self.out.print(&info.name);
            }
            NodeKind::Convert { ty, conv } => self.convert(id, ty, conv)?,
            NodeKind::Narrow { ty } => {
                let operand = self.kid(id, 0)?;
                if ty.is_prim() {
                    self.expr(operand, LAMBDA)?;
                } else {
                    self.out.print(&format!("({}) ", ty));
                    self.expr(operand, UNARY)?;
                }
            }
            NodeKind::Is { ty } => {
                self.expr(self.kid(id, 0)?, RELATIONAL)?;
                self.out.print(" instanceof ");
                self.out.print(&ty.raw_name());
            }
            NodeKind::Outer { ty } => self.out.print(&format!("{}.this", ty.raw_name())),
            NodeKind::Order(op) => {
                self.expr(self.kid(id, 0)?, POSTFIX)?;
                self.out.print(".compareTo(");
                self.expr(self.kid(id, 1)?, LAMBDA)?;
                self.out.print(&format!(") {} 0", op.text()));
            }
            NodeKind::Switch(info) => match (&info.native, info.is_expr) {
                (Some(native), true) => self.switch_expression(id, native)?,
                _ => return Err(self.error(id, "switch was not lowered")),
            },
            NodeKind::Throw => {
                self.out.print("throw ");
                self.expr(self.kid(id, 0)?, LAMBDA)?;
            }
            NodeKind::Assign(_)
            | NodeKind::Ignore
            | NodeKind::DefaultArg
            | NodeKind::CompareChain { .. }
            | NodeKind::DivRem
            | NodeKind::Unpack
            | NodeKind::Multi { stmts: false } => {
                return Err(self.error(id, "node was not lowered"));
            }
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
            | NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Return
            | NodeKind::NoOp => {
                return Err(self.error(id, "statement in expression position"));
            }
        }
        Ok(())
    }

    /// Prints `pre`, the children from slot `first` on with `between`
    /// after each, drops the last separator and prints `post`.
    fn children(&mut self, id: NodeId, first: usize, pre: &str, between: &str, post: &str) -> Result<()> {
        let ast = self.ast;
        self.out.print(pre);
        let mut any = false;
        for kid in ast.kids(id).iter().skip(first) {
            let kid = kid.ok_or_else(|| self.error(id, "missing operand"))?;
            self.expr(kid, LAMBDA)?;
            self.out.print(between);
            any = true;
        }
        if any {
            self.out.remove_last(between.chars().count());
        }
        self.out.print(post);
        Ok(())
    }

    fn binary(&mut self, id: NodeId, op: BinOp) -> Result<()> {
        let lhs = self.kid(id, 0)?;
        let rhs = self.kid(id, 1)?;
        match op {
            BinOp::Index => self.index(id, lhs, rhs)?,
            BinOp::IndexPrim => {
                self.expr(lhs, POSTFIX)?;
                self.out.print(".at(");
                self.expr(rhs, LAMBDA)?;
                self.out.print(")");
            }
            BinOp::Equals => {
                self.expr(lhs, POSTFIX)?;
                self.out.print(".equals(");
                self.expr(rhs, LAMBDA)?;
                self.out.print(")");
            }
            BinOp::Cmp => {
                self.out.print("Ordering.of(");
                match self.table.ty(lhs)? {
                    Type::Prim(p) => {
                        self.out.print(&format!("{}.compare(", p.wrapper()));
                        self.expr(lhs, LAMBDA)?;
                        self.out.print(", ");
                        self.expr(rhs, LAMBDA)?;
                        self.out.print(")");
                    }
                    _ => {
                        self.expr(lhs, POSTFIX)?;
                        self.out.print(".compareTo(");
                        self.expr(rhs, LAMBDA)?;
                        self.out.print(")");
                    }
                }
                self.out.print(")");
            }
            BinOp::RangeIncl | BinOp::RangeExcl | BinOp::CondElse => {
                return Err(self.error(id, format!("`{}` was not lowered", op.text())));
            }
            _ => {
                let (left, right) = prec::operand_floors(prec::binary(op));
                self.expr(lhs, left)?;
                self.out.print(&format!(" {} ", op.text()));
                self.expr(rhs, right)?;
            }
        }
        Ok(())
    }

    fn index(&mut self, id: NodeId, base: NodeId, index: NodeId) -> Result<()> {
        let base_ty = self.table.ty(base)?;
        self.expr(base, POSTFIX)?;
        match base_ty {
            Type::Tuple(_) => {
                let field = match self.ast.kind(index) {
                    NodeKind::Constant(c) => self.pool.get(*c)?.as_int(),
                    _ => None,
                }
                .ok_or_else(|| self.error(id, "tuple index must be a constant"))?;
                self.out.print(&format!("._f{}", field));
            }
            Type::Str => {
                self.out.print(".charAt((int) ");
                self.expr(index, UNARY)?;
                self.out.print(")");
            }
            _ => {
                self.out.print(".get(");
                self.expr(index, LAMBDA)?;
                self.out.print(")");
            }
        }
        Ok(())
    }

    fn unary(&mut self, id: NodeId, op: UnOp) -> Result<()> {
        let operand = self.kid(id, 0)?;
        if op == UnOp::Elvis {
            return Err(self.error(id, "null short-circuit was not lowered"));
        }
        if op.is_postfix() {
            self.expr(operand, POSTFIX)?;
            self.out.print(op.text());
            return Ok(());
        }
        self.out.print(op.text());
        if self.needs_space(op, operand)? {
            self.out.print(" ");
        }
        self.expr(operand, UNARY)
    }

    /// `- -x` must not print as `--x`.
    fn needs_space(&self, op: UnOp, operand: NodeId) -> Result<bool> {
        let sign = match op {
            UnOp::Neg | UnOp::PreDec => '-',
            UnOp::Plus | UnOp::PreInc => '+',
            _ => return Ok(false),
        };
        Ok(match self.ast.kind(operand) {
            NodeKind::UnaryOp(inner) if !inner.is_postfix() => inner.text().starts_with(sign),
            NodeKind::Constant(_) => sign == '-' && self.level(operand)? == UNARY,
            _ => false,
        })
    }

    fn convert(&mut self, id: NodeId, ty: &Type<'t>, conv: &Conv) -> Result<()> {
        let operand = self.kid(id, 0)?;
        let prim = || {
            ty.prim()
                .ok_or_else(|| self.error(id, format!("`{}` is not a primitive type", ty)))
        };
        match conv {
            Conv::Box => {
                let p = prim()?;
                self.out.print(&format!("{}.valueOf(", p.wrapper()));
                self.expr(operand, LAMBDA)?;
                self.out.print(")");
            }
            Conv::Unbox => {
                let p = prim()?;
                self.expr(operand, POSTFIX)?;
                self.out.print(&format!(".{}Value()", p.keyword()));
            }
            Conv::Cast => {
                self.out.print(&format!("({}) ", ty));
                self.expr(operand, UNARY)?;
            }
            Conv::Method(name) => {
                self.expr(operand, POSTFIX)?;
                self.out.print(&format!(".{}()", name));
            }
        }
        Ok(())
    }

    /// String concatenation of the parts; a leading `""` makes the `+`
    /// chain a string concatenation when the first part is not a string.
    fn template(&mut self, id: NodeId) -> Result<()> {
        let parts: Vec<NodeId> = self.ast.kids(id).iter().flatten().copied().collect();
        let leads_with_text = parts
            .first()
            .is_some_and(|part| matches!(self.table.get(*part), Some(Type::Str)));
        if !leads_with_text {
            self.out.print("\"\"");
            if parts.is_empty() {
                return Ok(());
            }
            self.out.print(" + ");
        }
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.out.print(" + ");
            }
            let floor = if i == 0 { ADDITIVE } else { MULTIPLICATIVE };
            self.expr(*part, floor)?;
        }
        Ok(())
    }

    /// A lambda taking the unbound parameters and calling the function
    /// with bound and unbound arguments in parameter order.
    fn bind_function(&mut self, id: NodeId, indices: &[usize]) -> Result<()> {
        let function = self.kid(id, 0)?;
        let arity = match self.table.ty(function)? {
            Type::Function { args, .. } => args.len(),
            other => return Err(self.error(id, format!("cannot bind arguments of `{}`", other))),
        };
        let bound: Vec<NodeId> = self.ast.kids(id).iter().skip(1).flatten().copied().collect();
        let params: Vec<String> = (0..arity)
            .filter(|i| !indices.contains(i))
            .map(|i| format!("$p{}", i))
            .collect();
        self.out.print(&format!("({}) -> ", params.join(", ")));
        self.expr(function, POSTFIX)?;
        self.out.print(".call(");
        for i in 0..arity {
            match indices.iter().position(|index| *index == i) {
                Some(n) => {
                    let arg = *bound
                        .get(n)
                        .ok_or_else(|| self.error(id, format!("no argument bound to parameter {}", i)))?;
                    self.expr(arg, LAMBDA)?;
                }
                None => self.out.print(&format!("$p{}", i)),
            }
            self.out.print(", ");
        }
        if arity > 0 {
            self.out.remove_last(2);
        }
        self.out.print(")");
        Ok(())
    }
}

fn case_label(label: &CaseLabel) -> String {
    match label {
        CaseLabel::Int(value) => value.to_string(),
        CaseLabel::Char(c) => char_literal(*c),
        CaseLabel::Str(s) => string_literal(s),
        CaseLabel::Enum(name) => name.clone(),
    }
}

/// Java source for a constant. `None` for constants that only exist as
/// pattern-switch labels.
pub(crate) fn literal(value: &Const<'_>) -> Option<String> {
    Some(match value {
        Const::Int { value, format } => match format {
            IntFormat::Int64 | IntFormat::IntLiteral => format!("{}L", value),
            _ => value.to_string(),
        },
        Const::Char(c) => char_literal(*c),
        Const::Str(s) => string_literal(s),
        Const::Bool(b) => b.to_string(),
        Const::Float(f) => float_literal(*f),
        Const::Null => "null".to_string(),
        Const::Enum { ty, name } => format!("{}.{}", ty.raw_name(), name),
        Const::Range {
            lo,
            hi,
            lo_excl,
            hi_excl,
        } => format!("new Range({}L, {}L, {}, {})", lo, hi, lo_excl, hi_excl),
        Const::Tuple(items) => {
            let items = items.iter().map(literal).collect::<Option<Vec<_>>>()?;
            format!("new Tuple{}<>({})", items.len(), items.join(", "))
        }
        Const::Type(ty) => format!("{}.class", ty.raw_name()),
        Const::Method(info) => format!("{}::{}", info.owner.raw_name(), info.name),
        Const::Property { name, .. } => name.clone(),
        Const::Any => return None,
    })
}

fn float_literal(f: f64) -> String {
    if f.is_nan() {
        "Double.NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 {
            "Double.POSITIVE_INFINITY".to_string()
        } else {
            "Double.NEGATIVE_INFINITY".to_string()
        }
    } else {
        format!("{:?}", f)
    }
}

fn char_literal(c: char) -> String {
    let mut out = String::from("'");
    escape(c, '\'', &mut out);
    out.push('\'');
    out
}

fn string_literal(s: &str) -> String {
    let mut out = String::from("\"");
    for c in s.chars() {
        escape(c, '"', &mut out);
    }
    out.push('"');
    out
}

fn escape(c: char, quote: char, out: &mut String) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\0' => out.push_str("\\0"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push(c),
    }
}
