use crate::types::Type;

/// Locals owned by a block: temps declared in its prologue and immutable
/// copies of outer variables captured by a nested lambda.
#[derive(Debug, Clone, Default)]
pub struct BlockScope<'t> {
    // Grouped per type, in first-request order.
    temps: Vec<(&'t Type<'t>, Vec<String>)>,
    pub captured_finals: Vec<(String, &'t Type<'t>)>,
    pub label: Option<String>,
    /// The block stands in for a statement switch, so `break` leaves it.
    pub breaks_here: bool,
}

impl<'t> BlockScope<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_temp(&mut self, ty: &'t Type<'t>, name: String) {
        match self.temps.iter_mut().find(|(t, _)| core::ptr::eq(*t, ty)) {
            Some((_, names)) => names.push(name),
            None => self.temps.push((ty, vec![name])),
        }
    }

    pub fn temps(&self) -> &[(&'t Type<'t>, Vec<String>)] {
        &self.temps
    }

    pub fn has_prologue(&self) -> bool {
        !self.temps.is_empty() || !self.captured_finals.is_empty()
    }

    /// Name of the immutable copy for `name`, adding the capture if new.
    pub fn capture_final(&mut self, name: &str, ty: &'t Type<'t>) -> String {
        if !self.captured_finals.iter().any(|(n, _)| n == name) {
            self.captured_finals.push((name.to_string(), ty));
        }
        final_name(name)
    }
}

pub fn final_name(name: &str) -> String {
    format!("{}$", name)
}
