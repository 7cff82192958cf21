//! Node tags and reserved term values of the method-body stream.

/// Tag of an encoded node. The discriminant is the byte written in the
/// stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeTag {
    None = 0x00,
    PropertyExpr = 0x01,
    InvokeExpr = 0x02,
    CondOpExpr = 0x03,
    Assign = 0x04,
    NamedRegAlloc = 0x05,
    RelOpExpr = 0x06,
    NarrowedExpr = 0x07,
    UnaryOpExpr = 0x08,
    NewExpr = 0x09,
    ThrowExpr = 0x0A,
    CallExpr = 0x0B,
    ArrayAccessExpr = 0x0C,
    BinOpAssign = 0x0D,
    TernaryExpr = 0x0E,
    OuterExpr = 0x0F,
    NotExpr = 0x10,
    MultiExpr = 0x11,
    BindFunctionExpr = 0x12,
    DivRemExpr = 0x13,
    BindMethodExpr = 0x14,
    NotNullExpr = 0x15,
    ConvertExpr = 0x16,
    TemplateExpr = 0x17,
    NewChildExpr = 0x18,
    TupleExpr = 0x19,
    CmpChainExpr = 0x1A,
    UnpackExpr = 0x1B,
    SwitchExpr = 0x1C,
    NewVirtualExpr = 0x1D,
    ListExpr = 0x1E,
    Escape = 0x1F,
    AnnoRegAlloc = 32,
    AnnoNamedRegAlloc = 33,
    RegAlloc = 34,
    RegisterExpr = 35,
    InvokeAsyncExpr = 36,
    CallAsyncExpr = 37,
    IsExpr = 38,
    NegExpr = 39,
    BitNotExpr = 40,
    PreIncExpr = 41,
    PreDecExpr = 42,
    PostIncExpr = 43,
    PostDecExpr = 44,
    RefOfExpr = 45,
    VarOfExpr = 46,
    ConstantExpr = 47,
    MapExpr = 48,
    StmtExpr = 49,
    NotCond = 50,
    NotNullCond = 51,
    NotFalseCond = 52,
    MatrixAccessExpr = 53,
    AssertStmt = 54,
    StmtBlock = 55,
    MultiStmt = 56,
    IfThenStmt = 57,
    IfElseStmt = 58,
    SwitchStmt = 59,
    LoopStmt = 60,
    WhileDoStmt = 61,
    DoWhileStmt = 62,
    ForStmt = 63,
    ForIteratorStmt = 64,
    ForRangeStmt = 65,
    ForListStmt = 66,
    ForMapStmt = 67,
    ForIterableStmt = 68,
    ContinueStmt = 69,
    BreakStmt = 70,
    Return0Stmt = 71,
    Return1Stmt = 72,
    ReturnNStmt = 73,
    ReturnTStmt = 74,
    TryCatchStmt = 75,
    TryFinallyStmt = 76,
    NotImplYet = 77,
}

const TAGS: [NodeTag; 78] = [
    NodeTag::None,
    NodeTag::PropertyExpr,
    NodeTag::InvokeExpr,
    NodeTag::CondOpExpr,
    NodeTag::Assign,
    NodeTag::NamedRegAlloc,
    NodeTag::RelOpExpr,
    NodeTag::NarrowedExpr,
    NodeTag::UnaryOpExpr,
    NodeTag::NewExpr,
    NodeTag::ThrowExpr,
    NodeTag::CallExpr,
    NodeTag::ArrayAccessExpr,
    NodeTag::BinOpAssign,
    NodeTag::TernaryExpr,
    NodeTag::OuterExpr,
    NodeTag::NotExpr,
    NodeTag::MultiExpr,
    NodeTag::BindFunctionExpr,
    NodeTag::DivRemExpr,
    NodeTag::BindMethodExpr,
    NodeTag::NotNullExpr,
    NodeTag::ConvertExpr,
    NodeTag::TemplateExpr,
    NodeTag::NewChildExpr,
    NodeTag::TupleExpr,
    NodeTag::CmpChainExpr,
    NodeTag::UnpackExpr,
    NodeTag::SwitchExpr,
    NodeTag::NewVirtualExpr,
    NodeTag::ListExpr,
    NodeTag::Escape,
    NodeTag::AnnoRegAlloc,
    NodeTag::AnnoNamedRegAlloc,
    NodeTag::RegAlloc,
    NodeTag::RegisterExpr,
    NodeTag::InvokeAsyncExpr,
    NodeTag::CallAsyncExpr,
    NodeTag::IsExpr,
    NodeTag::NegExpr,
    NodeTag::BitNotExpr,
    NodeTag::PreIncExpr,
    NodeTag::PreDecExpr,
    NodeTag::PostIncExpr,
    NodeTag::PostDecExpr,
    NodeTag::RefOfExpr,
    NodeTag::VarOfExpr,
    NodeTag::ConstantExpr,
    NodeTag::MapExpr,
    NodeTag::StmtExpr,
    NodeTag::NotCond,
    NodeTag::NotNullCond,
    NodeTag::NotFalseCond,
    NodeTag::MatrixAccessExpr,
    NodeTag::AssertStmt,
    NodeTag::StmtBlock,
    NodeTag::MultiStmt,
    NodeTag::IfThenStmt,
    NodeTag::IfElseStmt,
    NodeTag::SwitchStmt,
    NodeTag::LoopStmt,
    NodeTag::WhileDoStmt,
    NodeTag::DoWhileStmt,
    NodeTag::ForStmt,
    NodeTag::ForIteratorStmt,
    NodeTag::ForRangeStmt,
    NodeTag::ForListStmt,
    NodeTag::ForMapStmt,
    NodeTag::ForIterableStmt,
    NodeTag::ContinueStmt,
    NodeTag::BreakStmt,
    NodeTag::Return0Stmt,
    NodeTag::Return1Stmt,
    NodeTag::ReturnNStmt,
    NodeTag::ReturnTStmt,
    NodeTag::TryCatchStmt,
    NodeTag::TryFinallyStmt,
    NodeTag::NotImplYet,
];

impl NodeTag {
    pub fn from_u8(b: u8) -> Option<NodeTag> {
        TAGS.get(b as usize).copied()
    }

    /// Tags small enough to be written directly in an expression position.
    pub fn is_short(self) -> bool {
        (self as u8) < NodeTag::Escape as u8
    }
}

/// Term values at or below this denote constant `CONSTANT_OFFSET - n`.
pub const CONSTANT_OFFSET: i64 = -17;
/// Term values at or above this denote register `n - REGISTER_OFFSET`.
pub const REGISTER_OFFSET: i64 = 32;

// Reserved registers.
pub const A_STACK: i64 = -1;
pub const A_IGNORE: i64 = -2;
pub const A_DEFAULT: i64 = -3;
pub const A_THIS: i64 = -4;
pub const A_SUPER: i64 = -12;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_discriminants() {
        for (i, tag) in TAGS.iter().enumerate() {
            assert_eq!(*tag as u8 as usize, i);
        }
        assert_eq!(NodeTag::from_u8(78), None);
        assert!(NodeTag::ListExpr.is_short());
        assert!(!NodeTag::RegAlloc.is_short());
    }
}
