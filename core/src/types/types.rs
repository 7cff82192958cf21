use core::fmt::{self, Display};

/// Java primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    Bool,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Prim {
    /// Java keyword for the unboxed form.
    pub fn keyword(self) -> &'static str {
        match self {
            Prim::Bool => "boolean",
            Prim::Char => "char",
            Prim::Byte => "byte",
            Prim::Short => "short",
            Prim::Int => "int",
            Prim::Long => "long",
            Prim::Float => "float",
            Prim::Double => "double",
        }
    }

    /// Wrapper class for the boxed form.
    pub fn wrapper(self) -> &'static str {
        match self {
            Prim::Bool => "Boolean",
            Prim::Char => "Character",
            Prim::Byte => "Byte",
            Prim::Short => "Short",
            Prim::Int => "Integer",
            Prim::Long => "Long",
            Prim::Float => "Float",
            Prim::Double => "Double",
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Prim::Char | Prim::Byte | Prim::Short | Prim::Int | Prim::Long
        )
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Prim::Bool)
    }

    /// Widening rank used for binary numeric promotion.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Prim::Bool => 0,
            Prim::Byte => 1,
            Prim::Short | Prim::Char => 2,
            Prim::Int => 3,
            Prim::Long => 4,
            Prim::Float => 5,
            Prim::Double => 6,
        }
    }
}

/// A Java-side type. Always handled as an interned `&'t Type<'t>`, so two
/// types are the same type exactly when the pointers are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type<'t> {
    Prim(Prim),
    Boxed(Prim),
    Str,
    Void,
    /// Type of the `null` literal, and of expressions that never complete.
    Null,
    Object,

    Class {
        name: &'t str,
        params: &'t [&'t Type<'t>],
    },
    Enum {
        name: &'t str,
        values: &'t [&'t str],
    },

    Array(&'t Type<'t>),
    Tuple(&'t [&'t Type<'t>]),
    Function {
        args: &'t [&'t Type<'t>],
        rets: &'t [&'t Type<'t>],
    },
    Range,

    /// `T?`. The inner type is never a primitive.
    Nullable(&'t Type<'t>),
}

impl<'t> Type<'t> {
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, Type::Tuple(_))
    }

    pub fn is_prim(&self) -> bool {
        matches!(self, Type::Prim(_))
    }

    pub fn is_boxed(&self) -> bool {
        matches!(self, Type::Boxed(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Prim(Prim::Bool) | Type::Boxed(Prim::Bool))
    }

    /// Signed integral or char, boxed or not.
    pub fn is_integer(&self) -> bool {
        self.prim().is_some_and(Prim::is_integral)
    }

    pub fn is_numeric(&self) -> bool {
        self.prim().is_some_and(Prim::is_numeric)
    }

    /// Types whose values are compared with `.equals` rather than `==`.
    pub fn is_reference(&self) -> bool {
        !matches!(self, Type::Prim(_) | Type::Enum { .. } | Type::Null)
    }

    /// The primitive behind a primitive or boxed type.
    pub fn prim(&self) -> Option<Prim> {
        match self {
            Type::Prim(p) | Type::Boxed(p) => Some(*p),
            Type::Nullable(inner) => match inner {
                Type::Boxed(p) => Some(*p),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&'t Type<'t>> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn field_type(&self, index: usize) -> Option<&'t Type<'t>> {
        match self {
            Type::Tuple(fields) => fields.get(index).copied(),
            _ => None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Type::Nullable(_) | Type::Null)
    }

    /// Default-value literal used when declaring a local up front.
    pub fn zero_literal(&self) -> &'static str {
        match self {
            Type::Prim(Prim::Bool) => "false",
            Type::Prim(Prim::Long) => "0L",
            Type::Prim(Prim::Float) => "0.0f",
            Type::Prim(Prim::Double) => "0.0",
            Type::Prim(_) => "0",
            _ => "null",
        }
    }

    /// Name usable after `instanceof` or in a static-qualified call, with
    /// generic parameters erased.
    pub fn raw_name(&self) -> String {
        match self {
            Type::Class { name, .. } | Type::Enum { name, .. } => (*name).to_string(),
            Type::Tuple(fields) => format!("Tuple{}", fields.len()),
            Type::Function { args, .. } => format!("Fun{}", args.len()),
            Type::Array(_) => self.boxed_name().split('<').next().unwrap_or("Ary").to_string(),
            _ => self.boxed_name(),
        }
    }

    /// Java spelling where a reference type is required (generic argument,
    /// `Supplier<T>`, tuple field).
    pub fn boxed_name(&self) -> String {
        match self {
            Type::Prim(p) => p.wrapper().to_string(),
            Type::Void => "Void".to_string(),
            _ => self.to_string(),
        }
    }
}

fn join_boxed(types: &[&Type<'_>]) -> String {
    types
        .iter()
        .map(|ty| ty.boxed_name())
        .collect::<Vec<_>>()
        .join(",")
}

impl Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Prim(p) => write!(f, "{}", p.keyword()),
            Type::Boxed(p) => write!(f, "{}", p.wrapper()),
            Type::Str => write!(f, "String"),
            Type::Void => write!(f, "void"),
            Type::Null | Type::Object => write!(f, "Object"),
            Type::Class { name, params } => {
                if params.is_empty() {
                    write!(f, "{}", name)
                } else {
                    write!(f, "{}<{}>", name, join_boxed(params))
                }
            }
            Type::Enum { name, .. } => write!(f, "{}", name),
            Type::Array(elem) => match elem {
                Type::Prim(Prim::Long) => write!(f, "AryI64"),
                Type::Prim(Prim::Char) => write!(f, "AryChar"),
                Type::Prim(Prim::Bool) => write!(f, "AryBool"),
                _ => write!(f, "Ary<{}>", elem.boxed_name()),
            },
            Type::Tuple(fields) => write!(f, "Tuple{}<{}>", fields.len(), join_boxed(fields)),
            Type::Function { args, rets } => {
                let mut all: Vec<&Type<'_>> = args.to_vec();
                all.extend(rets.iter().copied());
                if all.is_empty() {
                    write!(f, "Fun{}", args.len())
                } else {
                    write!(f, "Fun{}<{}>", args.len(), join_boxed(&all))
                }
            }
            Type::Range => write!(f, "Range"),
            Type::Nullable(inner) => write!(f, "{}", inner.boxed_name()),
        }
    }
}
