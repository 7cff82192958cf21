//! Error rendering using miette's graphical report handler.
//!
//! Translation errors carry no source text to point into, so a report is
//! the message, the error code, the help line and, for a class, one nested
//! report per failing method.

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};
use std::io::Write;

/// Render an error to stderr.
///
/// # Example
/// ```no_run
/// use xjava::{ConstantPool, MethodInfo, TranslateOptions, Translator, TypeManager, render_error};
/// use bumpalo::Bump;
///
/// let arena = Bump::new();
/// let types = TypeManager::new(&arena);
/// let translator = Translator::new(types, TranslateOptions::default());
/// let method = MethodInfo::new("broken", types.class("Demo", &[]));
///
/// if let Err(e) = translator.translate_method(&method, &mut ConstantPool::new(), &[0xff]) {
///     render_error(&xjava::TranslateError::new("broken", e));
/// }
/// ```
pub fn render_error(error: &dyn Diagnostic) {
    render_error_to(error, &mut std::io::stderr()).ok();
}

/// Render an error to a specific writer, with color.
pub fn render_error_to(error: &dyn Diagnostic, writer: &mut dyn Write) -> std::io::Result<()> {
    writer.write_all(render(error, true).as_bytes())
}

/// Render an error to a String (useful for logs, web UIs, etc.)
pub fn render_error_to_string(error: &dyn Diagnostic) -> String {
    render(error, true)
}

/// Render an error to a String without color codes (useful for tests)
pub fn render_error_to_string_no_color(error: &dyn Diagnostic) -> String {
    render(error, false)
}

fn render(error: &dyn Diagnostic, use_color: bool) -> String {
    let theme = if use_color {
        GraphicalTheme::unicode()
    } else {
        GraphicalTheme::unicode_nocolor()
    };
    let handler = GraphicalReportHandler::new_themed(theme);
    let mut out = String::new();
    if handler.render_report(&mut out, error).is_err() {
        // Fall back to the plain message.
        out = format!("{}\n", error);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConstantPool, MethodInfo, TranslateOptions, Translator, TypeManager};
    use bumpalo::Bump;

    #[test]
    fn test_render_decode_error() {
        let arena = Bump::new();
        let types = TypeManager::new(&arena);
        let translator = Translator::new(types, TranslateOptions::default());
        let method = MethodInfo::new("broken", types.class("Demo", &[]));

        let err = translator
            .translate_method(&method, &mut ConstantPool::new(), &[])
            .unwrap_err();
        let output = render_error_to_string_no_color(&crate::TranslateError::new("broken", err));

        assert!(output.contains("X001"), "{}", output);
        assert!(output.contains("cannot translate `broken`"), "{}", output);
        assert!(output.lines().count() > 1);
    }
}
