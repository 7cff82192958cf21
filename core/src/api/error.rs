//! Public error types for the translator API.
//!
//! Internal errors carry no method context. At the API boundary they are
//! paired with the name of the method they came from, and a failing class
//! collects every failing method rather than stopping at the first.

use crate::errors;
use core::fmt;

/// A method body that could not be translated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot translate `{method}`: {error}")]
pub struct TranslateError {
    /// Name of the method whose body failed.
    pub method: String,
    pub error: errors::Error,
}

impl TranslateError {
    pub fn new(method: impl Into<String>, error: errors::Error) -> Self {
        TranslateError {
            method: method.into(),
            error,
        }
    }

    /// Flattens the error into a public diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            message: self.error.to_string(),
            method: self.method.clone(),
            help: help_for(&self.error).map(String::from),
            code: Some(self.error.code().to_string()),
        }
    }
}

impl miette::Diagnostic for TranslateError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.error.code()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        help_for(&self.error).map(|help| Box::new(help) as Box<dyn fmt::Display>)
    }
}

fn help_for(error: &errors::Error) -> Option<&'static str> {
    match error {
        errors::Error::Decode { .. } => {
            Some("the body bytes are truncated or use a node tag outside the supported set")
        }
        errors::Error::Structure { .. } => None,
        errors::Error::TypeInvariant { .. } => {
            Some("a lowering changed the type of a node it did not replace")
        }
    }
}

/// A class whose methods did not all translate. No partial text is kept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("class `{class}`: {} method(s) failed to translate", .failures.len())]
pub struct UnitError {
    pub class: String,
    /// One entry per failing method, in declaration order.
    pub failures: Vec<TranslateError>,
}

impl UnitError {
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.failures.iter().map(TranslateError::to_diagnostic).collect()
    }
}

impl miette::Diagnostic for UnitError {
    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn miette::Diagnostic> + 'a>> {
        Some(Box::new(
            self.failures
                .iter()
                .map(|failure| failure as &dyn miette::Diagnostic),
        ))
    }
}

/// A translation problem reduced to plain data, e.g. for an editor or a
/// build log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Method the problem was found in.
    pub method: String,

    /// Optional text suggesting what to look at.
    pub help: Option<String>,

    /// Error code (`X001` decode, `X002` structure, `X003` type
    /// invariant).
    pub code: Option<String>,
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl From<&TranslateError> for Diagnostic {
    fn from(err: &TranslateError) -> Self {
        err.to_diagnostic()
    }
}
