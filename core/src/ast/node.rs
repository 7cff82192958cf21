use crate::ast::block::BlockScope;
use crate::ast::ops::{AssignOp, BinOp, UnOp};
use crate::pool::ConstId;
use crate::types::Type;
use core::fmt;
use smallvec::SmallVec;

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Child slots. The length is fixed when the node is allocated.
pub type Kids = SmallVec<[Option<NodeId>; 4]>;

#[derive(Debug, Clone)]
pub struct Node<'t> {
    pub kind: NodeKind<'t>,
    pub(crate) kids: Kids,
    /// Set during the rewrite descent; only used to search upward.
    pub(crate) parent: Option<NodeId>,
}

/// How a `Convert` node changes its operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conv {
    /// `Long.valueOf(x)`
    Box,
    /// `x.longValue()`
    Unbox,
    /// `((int) x)`
    Cast,
    /// `x.name()`
    Method(String),
}

/// A case label of a switch printed natively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseLabel {
    Int(i64),
    Char(char),
    Str(String),
    Enum(String),
}

/// One arm of a native switch: a run of labels sharing a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeArm {
    pub labels: Vec<CaseLabel>,
    pub is_default: bool,
    /// Child slot of the body.
    pub body: usize,
    /// The arm ends in a `continue` that falls into the next arm.
    pub fallthrough: bool,
}

/// Layout chosen when a switch stays a Java `switch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSwitch {
    pub arms: Vec<NativeArm>,
    /// Selector is a `long` and is narrowed through `clampInt`.
    pub clamp: bool,
}

#[derive(Debug, Clone)]
pub struct SwitchInfo<'t> {
    pub is_expr: bool,
    /// Bit `i` set: column `i` is tested with `instanceof`.
    pub isa: u64,
    /// One entry per row; `None` is the default row.
    pub cases: Vec<Option<ConstId>>,
    pub result: Option<&'t Type<'t>>,
    pub native: Option<NativeSwitch>,
    pub label: Option<String>,
}

/// Every node shape the passes understand.
///
/// Child layouts are listed per variant; a `?` marks a slot that may be
/// empty.
#[derive(Debug, Clone)]
pub enum NodeKind<'t> {
    // === Statements ===
    /// `[stmt...]`
    Block(Box<BlockScope<'t>>),
    /// `[item...]`. Statements in sequence without a scope, or a list of
    /// conditions joined with `&&`.
    Multi { stmts: bool },
    /// `[cond, then, else?]`
    If,
    /// `[cond?, body]`; an empty condition loops forever.
    While { label: Option<String> },
    /// `[body, cond]`
    DoWhile { label: Option<String> },
    /// `[init?, cond?, update?, body]`
    ForClassic { label: Option<String> },
    /// `[lvalue, container, body]`
    ForIterate { label: Option<String>, map: bool },
    /// `[lvalue, range, body]`
    ForRange { label: Option<String> },
    /// `[cond, body...]`, one body slot per row; an empty body falls into
    /// the next row.
    Switch(Box<SwitchInfo<'t>>),
    /// `[resource..., body, (catch-var, handler)..., finally?]`
    TryCatch {
        resources: usize,
        catches: usize,
        finally: bool,
    },
    /// `[cond, message?]`
    Assert,
    /// `[exception]`
    Throw,
    Break { depth: u32, label: Option<String> },
    Continue { depth: u32 },
    /// `[value...]`
    Return,
    NoOp,
    /// Local declaration. Printed with its initializer when it is the
    /// target of an assignment.
    Define { name: String, ty: &'t Type<'t> },

    // === Expressions ===
    RegisterRef { name: String, ty: &'t Type<'t> },
    /// Discarded target of a multi-value assignment.
    Ignore,
    /// Argument left to the callee's default.
    DefaultArg,
    Constant(ConstId),
    /// `[target]`
    PropertyRef { prop: ConstId },
    /// `[lhs, rhs]`
    Assign(AssignOp),
    /// `[lhs, rhs]`
    BinaryOp(BinOp),
    /// `[operand]`
    UnaryOp(UnOp),
    /// `[cond, then, else]`
    Ternary,
    /// `[target, arg...]`
    Invoke { method: ConstId },
    /// `[function, arg...]`
    Call,
    /// `[arg...]`
    New {
        ty: &'t Type<'t>,
        ctor: Option<ConstId>,
    },
    /// `[outer, arg...]`
    NewVirtual {
        ty: &'t Type<'t>,
        ctor: Option<ConstId>,
    },
    /// `[function, arg...]`; `indices[i]` is the parameter bound by arg `i`.
    BindFunction { indices: Vec<usize> },
    /// `[target]`
    BindMethod { method: ConstId },
    /// `[operand]`
    Convert { ty: &'t Type<'t>, conv: Conv },
    /// `[operand]`
    Narrow { ty: &'t Type<'t> },
    /// `[operand]`
    Is { ty: &'t Type<'t> },
    /// `[operand]`
    Outer { ty: &'t Type<'t> },
    /// `[operand...]`, `ops.len() == operands - 1`
    CompareChain { ops: Vec<BinOp> },
    /// `[lhs, rhs]`, printed as `lhs.compareTo(rhs) op 0`.
    Order(BinOp),
    /// `[lhs, rhs]`
    DivRem,
    /// `[tuple]`
    Unpack,
    /// `[field...]`
    Tuple { ty: &'t Type<'t> },
    /// `[elem...]`
    ListLiteral { ty: &'t Type<'t> },
    /// `[key, value, key, value, ...]`
    MapLiteral { ty: &'t Type<'t> },
    /// `[part...]`
    TemplateString,
    /// `[block]`
    StmtExpr { ty: &'t Type<'t> },
}

impl<'t> NodeKind<'t> {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Block(_) => "Block",
            NodeKind::Multi { .. } => "Multi",
            NodeKind::If => "If",
            NodeKind::While { .. } => "While",
            NodeKind::DoWhile { .. } => "DoWhile",
            NodeKind::ForClassic { .. } => "ForClassic",
            NodeKind::ForIterate { .. } => "ForIterate",
            NodeKind::ForRange { .. } => "ForRange",
            NodeKind::Switch(_) => "Switch",
            NodeKind::TryCatch { .. } => "TryCatch",
            NodeKind::Assert => "Assert",
            NodeKind::Throw => "Throw",
            NodeKind::Break { .. } => "Break",
            NodeKind::Continue { .. } => "Continue",
            NodeKind::Return => "Return",
            NodeKind::NoOp => "NoOp",
            NodeKind::Define { .. } => "Define",
            NodeKind::RegisterRef { .. } => "RegisterRef",
            NodeKind::Ignore => "Ignore",
            NodeKind::DefaultArg => "DefaultArg",
            NodeKind::Constant(_) => "Constant",
            NodeKind::PropertyRef { .. } => "PropertyRef",
            NodeKind::Assign(_) => "Assign",
            NodeKind::BinaryOp(_) => "BinaryOp",
            NodeKind::UnaryOp(_) => "UnaryOp",
            NodeKind::Ternary => "Ternary",
            NodeKind::Invoke { .. } => "Invoke",
            NodeKind::Call => "Call",
            NodeKind::New { .. } => "New",
            NodeKind::NewVirtual { .. } => "NewVirtual",
            NodeKind::BindFunction { .. } => "BindFunction",
            NodeKind::BindMethod { .. } => "BindMethod",
            NodeKind::Convert { .. } => "Convert",
            NodeKind::Narrow { .. } => "Narrow",
            NodeKind::Is { .. } => "Is",
            NodeKind::Outer { .. } => "Outer",
            NodeKind::CompareChain { .. } => "CompareChain",
            NodeKind::Order(_) => "Order",
            NodeKind::DivRem => "DivRem",
            NodeKind::Unpack => "Unpack",
            NodeKind::Tuple { .. } => "Tuple",
            NodeKind::ListLiteral { .. } => "ListLiteral",
            NodeKind::MapLiteral { .. } => "MapLiteral",
            NodeKind::TemplateString => "TemplateString",
            NodeKind::StmtExpr { .. } => "StmtExpr",
        }
    }

    /// Nodes that only make sense in statement position.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
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
                | NodeKind::NoOp
        ) || matches!(self, NodeKind::Switch(info) if !info.is_expr)
    }

    /// Loops and statement switches: the constructs `break` can leave.
    pub fn is_breakable(&self) -> bool {
        match self {
            NodeKind::While { .. }
            | NodeKind::DoWhile { .. }
            | NodeKind::ForClassic { .. }
            | NodeKind::ForIterate { .. }
            | NodeKind::ForRange { .. } => true,
            NodeKind::Switch(info) => !info.is_expr,
            NodeKind::Block(scope) => scope.breaks_here,
            _ => false,
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            NodeKind::While { .. }
                | NodeKind::DoWhile { .. }
                | NodeKind::ForClassic { .. }
                | NodeKind::ForIterate { .. }
                | NodeKind::ForRange { .. }
        )
    }

    /// Mutable access to the label of a loop, switch or block.
    pub fn label_mut(&mut self) -> Option<&mut Option<String>> {
        match self {
            NodeKind::While { label }
            | NodeKind::DoWhile { label }
            | NodeKind::ForClassic { label }
            | NodeKind::ForIterate { label, .. }
            | NodeKind::ForRange { label } => Some(label),
            NodeKind::Switch(info) => Some(&mut info.label),
            NodeKind::Block(scope) => Some(&mut scope.label),
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            NodeKind::While { label }
            | NodeKind::DoWhile { label }
            | NodeKind::ForClassic { label }
            | NodeKind::ForIterate { label, .. }
            | NodeKind::ForRange { label } => label.as_deref(),
            NodeKind::Switch(info) => info.label.as_deref(),
            NodeKind::Block(scope) => scope.label.as_deref(),
            _ => None,
        }
    }
}
