//! Constant pool seen by one method body.
//!
//! The decoder resolves every constant-pool index through this table.
//! Lowering rules may append constants (default arguments, flags for range
//! construction), which is why the pool is per method and append-only.

use crate::errors::{Error, Result};
use crate::types::{Type, TypeManager};
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstId(pub u32);

impl fmt::Display for ConstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage format of an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntFormat {
    Int8,
    Int16,
    Int32,
    Int64,
    /// Untyped literal; treated as 64-bit.
    IntLiteral,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Const<'t> {
    Int { value: i64, format: IntFormat },
    Char(char),
    Str(String),
    Bool(bool),
    Float(f64),
    Null,
    Enum { ty: &'t Type<'t>, name: String },
    Range {
        lo: i64,
        hi: i64,
        lo_excl: bool,
        hi_excl: bool,
    },
    /// Multi-column case label in a pattern switch.
    Tuple(Vec<Const<'t>>),
    /// `_`: matches any value in a pattern switch column.
    Any,
    Type(&'t Type<'t>),
    Method(Box<MethodInfo<'t>>),
    Property { name: String, ty: &'t Type<'t> },
}

impl<'t> Const<'t> {
    pub fn long(value: i64) -> Self {
        Const::Int {
            value,
            format: IntFormat::Int64,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Const::Int { value, .. } => Some(*value),
            Const::Char(c) => Some(*c as i64),
            _ => None,
        }
    }

    /// Inclusive bounds of a range constant.
    pub fn int_bounds(&self) -> Option<(i64, i64)> {
        match self {
            Const::Range {
                lo,
                hi,
                lo_excl,
                hi_excl,
            } => {
                let lo = if *lo_excl { lo.checked_add(1)? } else { *lo };
                let hi = if *hi_excl { hi.checked_sub(1)? } else { *hi };
                Some((lo, hi))
            }
            _ => self.as_int().map(|v| (v, v)),
        }
    }

    pub fn as_method(&self) -> Option<&MethodInfo<'t>> {
        match self {
            Const::Method(method) => Some(method),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param<'t> {
    pub name: String,
    pub ty: &'t Type<'t>,
}

/// Callee metadata carried by a method constant.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo<'t> {
    pub name: String,
    pub owner: &'t Type<'t>,
    pub params: Vec<Param<'t>>,
    pub rets: Vec<&'t Type<'t>>,
    /// Default value per parameter, when the parameter has one.
    pub defaults: Vec<Option<Const<'t>>>,
    pub is_static: bool,
    /// Returns `(Boolean, T)`: the boolean travels through `$COND`.
    pub cond_ret: bool,
    /// Type-level `equals`/`compare`/`hashCode` dispatched on the
    /// compile-time type of its operands.
    pub funky: bool,
}

impl<'t> MethodInfo<'t> {
    pub fn new(name: &str, owner: &'t Type<'t>) -> Self {
        MethodInfo {
            name: name.to_string(),
            owner,
            params: Vec::new(),
            rets: Vec::new(),
            defaults: Vec::new(),
            is_static: false,
            cond_ret: false,
            funky: false,
        }
    }

    pub fn param(mut self, name: &str, ty: &'t Type<'t>) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            ty,
        });
        self.defaults.push(None);
        self
    }

    pub fn param_with_default(mut self, name: &str, ty: &'t Type<'t>, default: Const<'t>) -> Self {
        self = self.param(name, ty);
        if let Some(slot) = self.defaults.last_mut() {
            *slot = Some(default);
        }
        self
    }

    pub fn returns(mut self, ty: &'t Type<'t>) -> Self {
        self.rets.push(ty);
        self
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Marks the method as returning `(Boolean, T)`.
    pub fn conditional(mut self, types: &TypeManager<'t>, ty: &'t Type<'t>) -> Self {
        self.rets = vec![types.bool(), ty];
        self.cond_ret = true;
        self
    }

    pub fn funky(mut self) -> Self {
        self.funky = true;
        self.is_static = true;
        self
    }

    pub fn param_types(&self) -> Vec<&'t Type<'t>> {
        self.params.iter().map(|p| p.ty).collect()
    }

    /// The Java return type: the value half of a conditional return, a
    /// tuple for several values, `void` for none.
    pub fn java_return(&self, types: &TypeManager<'t>) -> &'t Type<'t> {
        match self.rets.as_slice() {
            [] => types.void(),
            [single] => single,
            [_, value] if self.cond_ret => value,
            many => types.tuple(many),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool<'t> {
    consts: Vec<Const<'t>>,
}

impl<'t> ConstantPool<'t> {
    pub fn new() -> Self {
        ConstantPool { consts: Vec::new() }
    }

    pub fn add(&mut self, constant: Const<'t>) -> ConstId {
        if let Some(index) = self.consts.iter().position(|c| c == &constant) {
            return ConstId(index as u32);
        }
        self.consts.push(constant);
        ConstId((self.consts.len() - 1) as u32)
    }

    pub fn get(&self, id: ConstId) -> Result<&Const<'t>> {
        self.consts.get(id.0 as usize).ok_or_else(|| {
            Error::structure("Constant", None, format!("no constant {} in pool", id))
        })
    }

    pub fn len(&self) -> usize {
        self.consts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consts.is_empty()
    }
}
