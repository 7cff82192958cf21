use crate::errors::{Error, Result};
use crate::pool::{Const, IntFormat};
use crate::types::types::{Prim, Type};
use bumpalo::Bump;
use core::cell::{Ref, RefCell};
use hashbrown::{DefaultHashBuilder, HashMap};

/// Interns every Java-side type used while translating a module.
///
/// Types are allocated in the arena and deduplicated, so identity checks
/// are pointer comparisons. One manager is shared by all method bodies of
/// a unit; it holds no per-method state.
pub struct TypeManager<'a> {
    // Arena holding all types from this TypeManager.
    arena: &'a Bump,
    interned_strs: RefCell<HashMap<&'a str, &'a str, DefaultHashBuilder, &'a Bump>>,
    interned: RefCell<HashMap<Type<'a>, &'a Type<'a>, DefaultHashBuilder, &'a Bump>>,
}

impl<'a> TypeManager<'a> {
    pub fn new(arena: &'a Bump) -> &'a Self {
        arena.alloc(Self {
            arena,
            interned_strs: RefCell::new(HashMap::new_in(arena)),
            interned: RefCell::new(HashMap::new_in(arena)),
        })
    }

    pub(super) fn intern_str(&self, s: &str) -> &'a str {
        if let Some(&interned_str) = self.interned_strs.borrow().get(s) {
            return interned_str;
        }
        let arena_str = self.arena.alloc_str(s);
        self.interned_strs.borrow_mut().insert(arena_str, arena_str);
        arena_str
    }

    fn intern_map(&self) -> Ref<'_, HashMap<Type<'a>, &'a Type<'a>, DefaultHashBuilder, &'a Bump>> {
        self.interned.borrow()
    }

    fn intern(&self, ty: Type<'a>) -> &'a Type<'a> {
        if let Some(&interned_ty) = self.intern_map().get(&ty) {
            return interned_ty;
        }
        let arena_ty = self.arena.alloc(ty.clone());
        self.interned.borrow_mut().insert(ty, arena_ty);
        arena_ty
    }

    fn intern_slice(&self, types: &[&'a Type<'a>]) -> &'a [&'a Type<'a>] {
        self.arena.alloc_slice_copy(types)
    }

    // Factory methods for types.
    pub fn prim(&self, p: Prim) -> &'a Type<'a> {
        self.intern(Type::Prim(p))
    }
    pub fn boxed(&self, p: Prim) -> &'a Type<'a> {
        self.intern(Type::Boxed(p))
    }
    pub fn bool(&self) -> &'a Type<'a> {
        self.prim(Prim::Bool)
    }
    pub fn long(&self) -> &'a Type<'a> {
        self.prim(Prim::Long)
    }
    pub fn int(&self) -> &'a Type<'a> {
        self.prim(Prim::Int)
    }
    pub fn char(&self) -> &'a Type<'a> {
        self.prim(Prim::Char)
    }
    pub fn str(&self) -> &'a Type<'a> {
        self.intern(Type::Str)
    }
    pub fn void(&self) -> &'a Type<'a> {
        self.intern(Type::Void)
    }
    pub fn null(&self) -> &'a Type<'a> {
        self.intern(Type::Null)
    }
    pub fn object(&self) -> &'a Type<'a> {
        self.intern(Type::Object)
    }
    pub fn range(&self) -> &'a Type<'a> {
        self.intern(Type::Range)
    }

    pub fn class(&self, name: &str, params: &[&'a Type<'a>]) -> &'a Type<'a> {
        let name = self.intern_str(name);
        let params = self.intern_slice(params);
        self.intern(Type::Class { name, params })
    }

    pub fn enumeration(&self, name: &str, values: &[&str]) -> &'a Type<'a> {
        let name = self.intern_str(name);
        let values: Vec<&'a str> = values.iter().map(|v| self.intern_str(v)).collect();
        let values = self.arena.alloc_slice_copy(&values);
        self.intern(Type::Enum { name, values })
    }

    pub fn array(&self, elem: &'a Type<'a>) -> &'a Type<'a> {
        self.intern(Type::Array(elem))
    }

    pub fn tuple(&self, fields: &[&'a Type<'a>]) -> &'a Type<'a> {
        let fields = self.intern_slice(fields);
        self.intern(Type::Tuple(fields))
    }

    pub fn function(&self, args: &[&'a Type<'a>], rets: &[&'a Type<'a>]) -> &'a Type<'a> {
        let args = self.intern_slice(args);
        let rets = self.intern_slice(rets);
        self.intern(Type::Function { args, rets })
    }

    /// `T?`. Primitives are boxed first; nullable and null types are
    /// returned unchanged.
    pub fn nullable(&self, inner: &'a Type<'a>) -> &'a Type<'a> {
        match inner {
            Type::Nullable(_) | Type::Null => inner,
            _ => {
                let inner = self.box_type(inner);
                self.intern(Type::Nullable(inner))
            }
        }
    }

    /// Ordering enum produced by `<=>` and `compare`.
    pub fn ordering(&self) -> &'a Type<'a> {
        self.enumeration("Ordering", &["Lesser", "Equal", "Greater"])
    }

    pub fn box_type(&self, ty: &'a Type<'a>) -> &'a Type<'a> {
        match ty {
            Type::Prim(p) => self.boxed(*p),
            _ => ty,
        }
    }

    pub fn unbox_type(&self, ty: &'a Type<'a>) -> &'a Type<'a> {
        match ty {
            Type::Boxed(p) => self.prim(*p),
            _ => ty,
        }
    }

    /// `T?` to `T`, keeping the boxed form.
    pub fn non_null(&self, ty: &'a Type<'a>) -> &'a Type<'a> {
        match ty {
            Type::Nullable(inner) => inner,
            _ => ty,
        }
    }

    /// Type of the value a constant denotes when used as an expression.
    pub fn resolve_constant_type(&self, constant: &Const<'a>) -> Result<&'a Type<'a>> {
        Ok(match constant {
            Const::Int { format, .. } => self.prim(format.prim()),
            Const::Char(_) => self.char(),
            Const::Str(_) => self.str(),
            Const::Bool(_) => self.bool(),
            Const::Float(_) => self.prim(Prim::Double),
            Const::Null => self.null(),
            Const::Enum { ty, .. } => ty,
            Const::Range { .. } => self.range(),
            Const::Tuple(items) => {
                let fields = items
                    .iter()
                    .map(|item| self.resolve_constant_type(item).map(|ty| self.box_type(ty)))
                    .collect::<Result<Vec<_>>>()?;
                self.tuple(&fields)
            }
            Const::Type(ty) => ty,
            Const::Method(method) => self.function(&method.param_types(), &method.rets),
            Const::Property { ty, .. } => ty,
            Const::Any => {
                return Err(Error::structure(
                    "Constant",
                    None,
                    "the `_` wildcard has no value type",
                ));
            }
        })
    }

    /// Type named by a type constant, optionally in its boxed form.
    pub fn resolve_type(&self, constant: &Const<'a>, boxed: bool) -> Option<&'a Type<'a>> {
        match constant {
            Const::Type(ty) if boxed => Some(self.box_type(ty)),
            Const::Type(ty) => Some(ty),
            _ => None,
        }
    }

    /// Binary numeric promotion of two operand types.
    pub fn promote(&self, lhs: &'a Type<'a>, rhs: &'a Type<'a>) -> &'a Type<'a> {
        match (lhs.prim(), rhs.prim()) {
            (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => {
                let wider = if a.rank() >= b.rank() { a } else { b };
                // Java promotes anything narrower than int to int.
                if wider.rank() < Prim::Int.rank() {
                    self.int()
                } else {
                    self.prim(wider)
                }
            }
            _ => self.unbox_type(lhs),
        }
    }
}

impl IntFormat {
    pub fn prim(self) -> Prim {
        match self {
            IntFormat::Int8 => Prim::Byte,
            IntFormat::Int16 => Prim::Short,
            IntFormat::Int32 => Prim::Int,
            IntFormat::Int64 | IntFormat::IntLiteral => Prim::Long,
        }
    }
}
