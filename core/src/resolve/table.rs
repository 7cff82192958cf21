use crate::ast::NodeId;
use crate::errors::{Error, Result};
use crate::types::Type;

/// Resolved type of every node, indexed by [`NodeId`].
///
/// Kept beside the tree so that lowering can mutate nodes freely. A node
/// whose kind is changed in place must be forgotten before it is
/// resolved again.
#[derive(Debug, Default, Clone)]
pub struct TypeTable<'t> {
    types: Vec<Option<&'t Type<'t>>>,
    // Expression leaves its boolean half in `$COND`.
    cond: Vec<bool>,
}

impl<'t> TypeTable<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    fn grow(&mut self, id: NodeId) {
        let len = id.0 as usize + 1;
        if self.types.len() < len {
            self.types.resize(len, None);
            self.cond.resize(len, false);
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&'t Type<'t>> {
        self.types.get(id.0 as usize).copied().flatten()
    }

    /// Type of a node that must already be resolved.
    pub fn ty(&self, id: NodeId) -> Result<&'t Type<'t>> {
        self.get(id)
            .ok_or_else(|| Error::structure("Node", Some(id), "type not resolved"))
    }

    /// Records `ty` for `id`. With `check` set, a different type than the
    /// one already recorded is an error.
    pub fn set(&mut self, id: NodeId, ty: &'t Type<'t>, check: bool) -> Result<()> {
        self.grow(id);
        let slot = &mut self.types[id.0 as usize];
        if let Some(before) = *slot {
            if check && !core::ptr::eq(before, ty) {
                return Err(Error::TypeInvariant {
                    node: id,
                    before: before.to_string(),
                    after: ty.to_string(),
                });
            }
        }
        *slot = Some(ty);
        Ok(())
    }

    pub fn forget(&mut self, id: NodeId) {
        if let Some(slot) = self.types.get_mut(id.0 as usize) {
            *slot = None;
        }
    }

    pub fn set_yields_condition(&mut self, id: NodeId, cond: bool) {
        self.grow(id);
        self.cond[id.0 as usize] = cond;
    }

    /// The expression also produces a condition through `$COND`.
    pub fn yields_condition(&self, id: NodeId) -> bool {
        self.cond.get(id.0 as usize).copied().unwrap_or(false)
    }
}
