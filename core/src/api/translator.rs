//! The translation pipeline.

use super::{TranslateError, TranslateOptions, UnitError};
use crate::ast::Ast;
use crate::decode::decode_body;
use crate::emit::emit_body;
use crate::errors::{Error, Result};
use crate::pool::{ConstantPool, MethodInfo};
use crate::resolve::{Resolver, TypeTable};
use crate::rewrite::Rewriter;
use crate::types::TypeManager;
use tracing::{debug, warn};

/// One method of a class, as handed to [`Translator::translate_unit`].
#[derive(Debug, Clone)]
pub struct MethodSource<'t> {
    pub method: MethodInfo<'t>,
    /// The method's own constant pool. Lowering may append to it.
    pub pool: ConstantPool<'t>,
    pub body: Vec<u8>,
}

/// Translates encoded method bodies into Java source.
///
/// Each body is decoded, resolved, lowered, optionally checked and printed
/// on its own. Nothing but the type manager is shared between bodies, so a
/// failure in one method leaves the others untouched.
///
/// # Example
///
/// ```
/// use bumpalo::Bump;
/// use xjava_core::api::{TranslateOptions, Translator};
/// use xjava_core::decode::{NodeTag, Writer};
/// use xjava_core::pool::{ConstantPool, MethodInfo};
/// use xjava_core::types::TypeManager;
///
/// let arena = Bump::new();
/// let types = TypeManager::new(&arena);
/// let translator = Translator::new(types, TranslateOptions::default());
///
/// let method = MethodInfo::new("id", types.class("Demo", &[]))
///     .static_()
///     .param("x", types.long())
///     .returns(types.long());
/// let mut body = Writer::new();
/// body.stmt(NodeTag::Return1Stmt).register(0);
///
/// let text = translator
///     .translate_body(&method, &mut ConstantPool::new(), &body.finish())
///     .unwrap();
/// assert_eq!(text, "{\n    return x;\n}\n");
/// ```
pub struct Translator<'t> {
    types: &'t TypeManager<'t>,
    options: TranslateOptions,
}

impl<'t> Translator<'t> {
    pub fn new(types: &'t TypeManager<'t>, options: TranslateOptions) -> Self {
        Translator { types, options }
    }

    pub fn type_manager(&self) -> &'t TypeManager<'t> {
        self.types
    }

    pub fn options(&self) -> &TranslateOptions {
        &self.options
    }

    /// Translates one body into a Java block, braces included.
    pub fn translate_body(
        &self,
        method: &MethodInfo<'t>,
        pool: &mut ConstantPool<'t>,
        bytes: &[u8],
    ) -> Result<String> {
        self.pipeline(method, pool, bytes).inspect_err(|error| {
            warn!(method = %method.name, %error, "Method body failed to translate");
        })
    }

    fn pipeline(
        &self,
        method: &MethodInfo<'t>,
        pool: &mut ConstantPool<'t>,
        bytes: &[u8],
    ) -> Result<String> {
        debug!(method = %method.name, bytes = bytes.len(), "Translating method body");
        let mut ast = decode_body(self.types, pool, method, bytes)?;

        let mut table = TypeTable::new();
        Resolver::new(self.types, pool, false).resolve(&ast, &mut table, root(&ast)?)?;
        Rewriter::new(&mut ast, pool, self.types, &mut table, method, &self.options).run()?;

        // Resolve the lowered tree from scratch; with checking on, a
        // second pass over the same table must agree node for node.
        let root = root(&ast)?;
        let mut table = TypeTable::new();
        Resolver::new(self.types, pool, false).resolve(&ast, &mut table, root)?;
        if self.options.check_types {
            Resolver::new(self.types, pool, true).resolve(&ast, &mut table, root)?;
        }

        emit_body(&ast, pool, &table, self.options.indent)
    }

    /// Signature line followed by the translated body.
    pub fn translate_method(
        &self,
        method: &MethodInfo<'t>,
        pool: &mut ConstantPool<'t>,
        bytes: &[u8],
    ) -> Result<String> {
        let body = self.translate_body(method, pool, bytes)?;
        Ok(format!("{} {}", self.signature(method), body))
    }

    fn signature(&self, method: &MethodInfo<'t>) -> String {
        let params: Vec<String> = method
            .params
            .iter()
            .map(|param| format!("{} {}", param.ty, param.name))
            .collect();
        format!(
            "public {}{} {}({})",
            if method.is_static { "static " } else { "" },
            method.java_return(self.types),
            method.name,
            params.join(", ")
        )
    }

    /// Translates every method of a class into one `class` declaration.
    ///
    /// All methods are attempted. If any fails, the error lists each
    /// failure and none of the translated text is returned.
    pub fn translate_unit(
        &self,
        class_name: &str,
        methods: &mut [MethodSource<'t>],
    ) -> core::result::Result<String, UnitError> {
        let mut members = Vec::with_capacity(methods.len());
        let mut failures = Vec::new();
        for source in methods.iter_mut() {
            match self.translate_method(&source.method, &mut source.pool, &source.body) {
                Ok(text) => members.push(text),
                Err(error) => failures.push(TranslateError::new(source.method.name.clone(), error)),
            }
        }
        if !failures.is_empty() {
            return Err(UnitError {
                class: class_name.to_string(),
                failures,
            });
        }

        let unit = self.options.indent;
        let members: Vec<String> = members.iter().map(|text| indent_lines(text, unit)).collect();
        debug!(class = class_name, methods = methods.len(), "Translated class");
        Ok(format!("public class {} {{\n{}}}\n", class_name, members.join("\n")))
    }
}

fn root(ast: &Ast<'_>) -> Result<crate::ast::NodeId> {
    ast.root()
        .ok_or_else(|| Error::structure("Block", None, "tree has no root"))
}

/// Prefixes every non-empty line with one indent unit.
fn indent_lines(text: &str, unit: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if !line.is_empty() {
            out.push_str(unit);
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}
