//! Operator tables shared by the decoder, the passes and the emitter.
//!
//! The byte value of each operator is its position in the table, which is
//! also how the byte stream encodes it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Ushr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `lo..hi`
    RangeIncl,
    /// `lo..<hi`
    RangeExcl,
    /// `a ?: b`
    CondElse,
    /// `a <=> b`
    Cmp,

    // Produced by lowering only; never encoded.
    /// Boxed element access, `a.get(i)`.
    Index,
    /// Unboxed element access, `a.at(i)`.
    IndexPrim,
    /// `a.equals(b)`
    Equals,
}

const BIN_OPS: [BinOp; 23] = [
    BinOp::Add,
    BinOp::Sub,
    BinOp::Mul,
    BinOp::Div,
    BinOp::Mod,
    BinOp::Shl,
    BinOp::Shr,
    BinOp::Ushr,
    BinOp::BitAnd,
    BinOp::BitOr,
    BinOp::BitXor,
    BinOp::And,
    BinOp::Or,
    BinOp::Eq,
    BinOp::Ne,
    BinOp::Lt,
    BinOp::Le,
    BinOp::Gt,
    BinOp::Ge,
    BinOp::RangeIncl,
    BinOp::RangeExcl,
    BinOp::CondElse,
    BinOp::Cmp,
];

impl BinOp {
    pub fn from_byte(b: u8) -> Option<BinOp> {
        BIN_OPS.get(b as usize).copied()
    }

    pub fn to_byte(self) -> Option<u8> {
        BIN_OPS.iter().position(|op| *op == self).map(|i| i as u8)
    }

    /// Infix token in Java. Operators without an infix spelling return the
    /// source token, which never reaches the output.
    pub fn text(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Ushr => ">>>",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::RangeIncl => "..",
            BinOp::RangeExcl => "..<",
            BinOp::CondElse => "?:",
            BinOp::Cmp => "<=>",
            BinOp::Index => "[]",
            BinOp::IndexPrim => "[]",
            BinOp::Equals => ".equals",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_ordering(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinOp::Shl | BinOp::Shr | BinOp::Ushr)
    }

    pub fn is_range(self) -> bool {
        matches!(self, BinOp::RangeIncl | BinOp::RangeExcl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Plus,
    Neg,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    /// `x?`: short-circuit the grounding expression when `x` is null.
    Elvis,
}

const UN_OPS: [UnOp; 9] = [
    UnOp::Plus,
    UnOp::Neg,
    UnOp::Not,
    UnOp::BitNot,
    UnOp::PreInc,
    UnOp::PreDec,
    UnOp::PostInc,
    UnOp::PostDec,
    UnOp::Elvis,
];

impl UnOp {
    pub fn from_byte(b: u8) -> Option<UnOp> {
        UN_OPS.get(b as usize).copied()
    }

    pub fn to_byte(self) -> u8 {
        UN_OPS.iter().position(|op| *op == self).unwrap_or(0) as u8
    }

    pub fn text(self) -> &'static str {
        match self {
            UnOp::Plus => "+",
            UnOp::Neg => "-",
            UnOp::Not => "!",
            UnOp::BitNot => "~",
            UnOp::PreInc | UnOp::PostInc => "++",
            UnOp::PreDec | UnOp::PostDec => "--",
            UnOp::Elvis => "?",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnOp::PostInc | UnOp::PostDec | UnOp::Elvis)
    }

    pub fn mutates(self) -> bool {
        matches!(
            self,
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Asn,
    AddAsn,
    SubAsn,
    MulAsn,
    DivAsn,
    ModAsn,
    ShlAsn,
    ShrAsn,
    UshrAsn,
    AndAsn,
    OrAsn,
    XorAsn,
    /// `:=`: assign when the right side's condition holds.
    CondAsn,
    /// `?=`: assign when the right side is not null.
    NotNullAsn,
}

const ASSIGN_OPS: [AssignOp; 14] = [
    AssignOp::Asn,
    AssignOp::AddAsn,
    AssignOp::SubAsn,
    AssignOp::MulAsn,
    AssignOp::DivAsn,
    AssignOp::ModAsn,
    AssignOp::ShlAsn,
    AssignOp::ShrAsn,
    AssignOp::UshrAsn,
    AssignOp::AndAsn,
    AssignOp::OrAsn,
    AssignOp::XorAsn,
    AssignOp::CondAsn,
    AssignOp::NotNullAsn,
];

impl AssignOp {
    pub fn from_byte(b: u8) -> Option<AssignOp> {
        ASSIGN_OPS.get(b as usize).copied()
    }

    pub fn to_byte(self) -> u8 {
        ASSIGN_OPS.iter().position(|op| *op == self).unwrap_or(0) as u8
    }

    pub fn text(self) -> &'static str {
        match self {
            AssignOp::Asn => "=",
            AssignOp::AddAsn => "+=",
            AssignOp::SubAsn => "-=",
            AssignOp::MulAsn => "*=",
            AssignOp::DivAsn => "/=",
            AssignOp::ModAsn => "%=",
            AssignOp::ShlAsn => "<<=",
            AssignOp::ShrAsn => ">>=",
            AssignOp::UshrAsn => ">>>=",
            AssignOp::AndAsn => "&=",
            AssignOp::OrAsn => "|=",
            AssignOp::XorAsn => "^=",
            AssignOp::CondAsn => ":=",
            AssignOp::NotNullAsn => "?=",
        }
    }

    pub fn is_conditional(self) -> bool {
        matches!(self, AssignOp::CondAsn | AssignOp::NotNullAsn)
    }
}
