//! Configuration options for the translator.

/// Options controlling how method bodies are lowered and printed.
///
/// # Example
///
/// ```
/// use xjava_core::api::TranslateOptions;
///
/// let options = TranslateOptions {
///     indent: "  ",
///     max_switch_expansion: 64,
///     ..TranslateOptions::default()
/// };
/// assert_eq!(options.max_rewrites_per_slot, 64);
/// ```
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// One level of indentation in the emitted text.
    ///
    /// Default: four spaces
    pub indent: &'static str,

    /// Largest number of `case` labels an integer switch may expand its
    /// ranges into before it is lowered to a conditional chain instead.
    ///
    /// Default: 256
    pub max_switch_expansion: u64,

    /// How many times one child slot may be rewritten before the rewrite
    /// is declared non-terminating.
    ///
    /// Default: 64
    pub max_rewrites_per_slot: usize,

    /// Re-resolve the lowered tree and fail if any node's type changes.
    ///
    /// Default: on in debug builds
    pub check_types: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            indent: "    ",
            max_switch_expansion: 256,
            max_rewrites_per_slot: 64,
            check_types: cfg!(debug_assertions),
        }
    }
}
