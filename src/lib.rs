//! xjava: translates encoded XVM method bodies into Java source.
//!
//! # Overview
//!
//! A method body arrives as bytes together with its constant pool and the
//! signature of the method it belongs to. Translation decodes the bytes
//! into a tree, resolves the type of every expression, lowers the
//! constructs Java has no spelling for and prints the result.
//!
//! # Quick Start
//!
//! ```
//! use xjava::{ConstantPool, MethodInfo, TranslateOptions, Translator, TypeManager};
//! use xjava::decode::{NodeTag, Writer};
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let types = TypeManager::new(&arena);
//! let translator = Translator::new(types, TranslateOptions::default());
//!
//! let method = MethodInfo::new("twice", types.class("Demo", &[]))
//!     .static_()
//!     .param("n", types.long())
//!     .returns(types.long());
//! let mut body = Writer::new();
//! body.stmt(NodeTag::Return1Stmt).register(0);
//!
//! let java = translator
//!     .translate_method(&method, &mut ConstantPool::new(), &body.finish())
//!     .unwrap();
//! assert_eq!(java, "public static long twice(long n) {\n    return n;\n}\n");
//! ```
//!
//! Failures come back as [`TranslateError`] (one method) or [`UnitError`]
//! (a whole class). Both implement [`miette::Diagnostic`] and can be shown
//! with [`render_error`].

pub use xjava_core::api::{
    Diagnostic, MethodSource, Severity, TranslateError, TranslateOptions, Translator, UnitError,
};

pub use xjava_core::pool::{Const, ConstId, ConstantPool, MethodInfo};
pub use xjava_core::types::{self, Prim, Type, TypeManager};

// Building blocks for callers that drive the passes themselves.
pub use xjava_core::{ast, decode, emit, resolve, rewrite};

mod error_renderer;
pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};
