//! Public API for translating XVM method bodies to Java.
//!
//! A [`Translator`] owns the options and borrows the type manager. It
//! works at three granularities:
//!
//! 1. **Body**: one encoded body to one Java block (`translate_body`)
//! 2. **Method**: signature line plus body (`translate_method`)
//! 3. **Unit**: every method of a class, all or nothing (`translate_unit`)
//!
//! Failures are reported as [`TranslateError`] (one method) or
//! [`UnitError`] (a class), both of which render through `miette`.

pub mod error;
pub mod options;
pub mod translator;

pub use error::{Diagnostic, Severity, TranslateError, UnitError};
pub use options::TranslateOptions;
pub use translator::{MethodSource, Translator};
