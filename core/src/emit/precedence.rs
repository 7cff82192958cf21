//! Java operator precedence, loosest first.
//!
//! A child is parenthesized when its level is below the floor its parent
//! sets for that position. For a left-associative operator the left floor
//! is the operator's own level and the right floor is one tighter, so
//! `a - b - c` prints bare while `a - (b - c)` keeps its parentheses.

use crate::ast::BinOp;

pub const LAMBDA: u8 = 0;
pub const ASSIGN: u8 = 1;
pub const TERNARY: u8 = 2;
pub const OR: u8 = 3;
pub const AND: u8 = 4;
pub const BIT_OR: u8 = 5;
pub const BIT_XOR: u8 = 6;
pub const BIT_AND: u8 = 7;
pub const EQUALITY: u8 = 8;
pub const RELATIONAL: u8 = 9;
pub const SHIFT: u8 = 10;
pub const ADDITIVE: u8 = 11;
pub const MULTIPLICATIVE: u8 = 12;
pub const UNARY: u8 = 14;
pub const POSTFIX: u8 = 15;
pub const PRIMARY: u8 = 16;

/// Level of a binary operator printed infix, or of the call form it is
/// printed as.
pub fn binary(op: BinOp) -> u8 {
    match op {
        BinOp::Mul | BinOp::Div | BinOp::Mod => MULTIPLICATIVE,
        BinOp::Add | BinOp::Sub => ADDITIVE,
        BinOp::Shl | BinOp::Shr | BinOp::Ushr => SHIFT,
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => RELATIONAL,
        BinOp::Eq | BinOp::Ne => EQUALITY,
        BinOp::BitAnd => BIT_AND,
        BinOp::BitXor => BIT_XOR,
        BinOp::BitOr => BIT_OR,
        BinOp::And => AND,
        BinOp::Or => OR,
        BinOp::CondElse => TERNARY,
        BinOp::Index | BinOp::IndexPrim | BinOp::Equals => POSTFIX,
        BinOp::Cmp | BinOp::RangeIncl | BinOp::RangeExcl => PRIMARY,
    }
}

pub fn is_right_assoc(level: u8) -> bool {
    level == ASSIGN || level == TERNARY
}

/// Floors for the left and right operand of an infix operator at `level`.
pub fn operand_floors(level: u8) -> (u8, u8) {
    if is_right_assoc(level) {
        (level + 1, level)
    } else {
        (level, level + 1)
    }
}
