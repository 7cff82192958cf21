/// Text sink that tracks indentation explicitly.
///
/// Indentation is written lazily, on the first `print` of a line, so a
/// node may open a line, emit nested lines of its own and continue where
/// it left off.
#[derive(Debug)]
pub struct Sb {
    out: String,
    unit: &'static str,
    depth: usize,
    at_line_start: bool,
}

impl Sb {
    pub fn new(unit: &'static str) -> Self {
        Sb {
            out: String::new(),
            unit,
            depth: 0,
            at_line_start: true,
        }
    }

    pub fn print(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.at_line_start {
            for _ in 0..self.depth {
                self.out.push_str(self.unit);
            }
            self.at_line_start = false;
        }
        self.out.push_str(text);
    }

    pub fn newline(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn was_at_line_start(&self) -> bool {
        self.at_line_start
    }

    /// Drops the last `n` characters, e.g. a trailing separator.
    pub fn remove_last(&mut self, n: usize) {
        for _ in 0..n {
            if self.out.pop().is_none() {
                break;
            }
        }
        self.at_line_start = self.out.is_empty() || self.out.ends_with('\n');
    }

    pub fn finish(self) -> String {
        self.out
    }
}
