use crate::types::Type;

#[derive(Debug, Clone)]
pub struct Local<'t> {
    pub name: String,
    pub ty: &'t Type<'t>,
}

/// Registers visible at the decoder's current position.
///
/// Registers are numbered by allocation order. `enter` and `exit` bracket
/// a lexical scope: everything allocated inside is dropped on exit, so a
/// register is only valid within its declaring scope.
#[derive(Debug, Default)]
pub struct Locals<'t> {
    regs: Vec<Local<'t>>,
    scopes: Vec<usize>,
}

impl<'t> Locals<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self) {
        self.scopes.push(self.regs.len());
    }

    /// Returns false when there is no scope to leave.
    pub fn exit(&mut self) -> bool {
        match self.scopes.pop() {
            Some(len) => {
                self.regs.truncate(len);
                true
            }
            None => false,
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Allocates the next register. The name is made unique among live
    /// registers because Java locals cannot shadow each other.
    pub fn register(&mut self, name: &str, ty: &'t Type<'t>) -> (u32, String) {
        let mut unique = name.to_string();
        let mut n = 1;
        while self.regs.iter().any(|r| r.name == unique) {
            unique = format!("{}${}", name, n);
            n += 1;
        }
        self.regs.push(Local {
            name: unique.clone(),
            ty,
        });
        ((self.regs.len() - 1) as u32, unique)
    }

    pub fn get(&self, reg: u32) -> Option<&Local<'t>> {
        self.regs.get(reg as usize)
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }
}
