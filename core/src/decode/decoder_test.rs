use crate::ast::NodeKind;
use crate::decode::{NodeTag, Writer, decode_body};
use crate::errors::Error;
use crate::pool::{Const, ConstantPool, MethodInfo};
use crate::types::TypeManager;
use bumpalo::Bump;
use pretty_assertions::assert_eq;

fn method<'t>(types: &'t TypeManager<'t>) -> MethodInfo<'t> {
    MethodInfo::new("f", types.class("Test", &[]))
        .param("x", types.long())
        .returns(types.long())
}

#[test]
fn test_root_is_wrapped_in_block() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let one = pool.add(Const::long(1));

    let mut w = Writer::new();
    w.stmt(NodeTag::Return1Stmt).constant(one);

    let ast = decode_body(types, &pool, &method(types), &w.finish()).unwrap();
    let root = ast.root().unwrap();
    assert_eq!(ast.shape(root), "(Block (Return (Constant #0)))");
}

#[test]
fn test_named_register_is_visible_to_later_statements() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let long = pool.add(Const::Type(types.long()));
    let name = pool.add(Const::Str("y".to_string()));

    let mut w = Writer::new();
    w.stmt(NodeTag::StmtBlock).magnitude(2);
    w.stmt(NodeTag::Assign)
        .expr(NodeTag::NamedRegAlloc)
        .const_id(long)
        .const_id(name)
        .register(0);
    w.stmt(NodeTag::Return1Stmt).register(1);

    let ast = decode_body(types, &pool, &method(types), &w.finish()).unwrap();
    assert_eq!(
        ast.shape(ast.root().unwrap()),
        "(Block (Assign = (Define y) (RegisterRef x)) (Return (RegisterRef y)))"
    );
}

#[test]
fn test_register_out_of_scope() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let long = pool.add(Const::Type(types.long()));
    let name = pool.add(Const::Str("y".to_string()));

    let mut w = Writer::new();
    w.stmt(NodeTag::StmtBlock).magnitude(2);
    w.stmt(NodeTag::StmtBlock).magnitude(1);
    w.stmt(NodeTag::NamedRegAlloc).const_id(long).const_id(name);
    w.stmt(NodeTag::Return1Stmt).register(1);

    let err = decode_body(types, &pool, &method(types), &w.finish()).unwrap_err();
    match err {
        Error::Decode { reason, .. } => assert_eq!(reason, "register 1 is not live"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_shadowed_name_is_renamed() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let long = pool.add(Const::Type(types.long()));
    let name = pool.add(Const::Str("x".to_string()));

    let mut w = Writer::new();
    w.stmt(NodeTag::StmtBlock).magnitude(2);
    w.stmt(NodeTag::NamedRegAlloc).const_id(long).const_id(name);
    w.stmt(NodeTag::Return1Stmt).register(1);

    let ast = decode_body(types, &pool, &method(types), &w.finish()).unwrap();
    assert_eq!(
        ast.shape(ast.root().unwrap()),
        "(Block (Define x$1) (Return (RegisterRef x$1)))"
    );
}

#[test]
fn test_escaped_tag_in_expression_position() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();

    let mut w = Writer::new();
    w.stmt(NodeTag::Return1Stmt).expr(NodeTag::NegExpr).register(0);

    let bytes = w.finish();
    assert_eq!(bytes[1], NodeTag::Escape as u8);
    let ast = decode_body(types, &pool, &method(types), &bytes).unwrap();
    assert_eq!(
        ast.shape(ast.root().unwrap()),
        "(Block (Return (UnaryOp - (RegisterRef x))))"
    );
}

#[test]
fn test_switch_rows_and_bodies() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let one = pool.add(Const::long(1));
    let two = pool.add(Const::long(2));

    let mut w = Writer::new();
    w.stmt(NodeTag::SwitchStmt).register(0).packed(0).magnitude(3);
    w.const_id(one).const_id(two).packed(-1);
    // Row 0 has no body and shares row 1's.
    w.packed(0b110);
    w.stmt(NodeTag::BreakStmt).magnitude(0);
    w.stmt(NodeTag::Return0Stmt);

    let ast = decode_body(types, &pool, &method(types), &w.finish()).unwrap();
    let root = ast.root().unwrap();
    assert_eq!(
        ast.shape(root),
        "(Block (Switch (RegisterRef x) _ (Break) (Return)))"
    );
    let switch = ast.kid(root, 0).unwrap();
    match ast.kind(switch) {
        NodeKind::Switch(info) => {
            assert!(!info.is_expr);
            assert_eq!(info.cases, vec![Some(one), Some(two), None]);
            assert!(info.native.is_none());
        }
        other => panic!("expected a switch, got {}", other.name()),
    }
}

#[test]
fn test_unknown_tag_reports_offset() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();

    let mut w = Writer::new();
    w.stmt(NodeTag::StmtBlock).magnitude(1).byte(0xF0);

    let err = decode_body(types, &pool, &method(types), &w.finish()).unwrap_err();
    assert_eq!(
        err,
        Error::decode(2, Some(0xF0), "unknown node tag"),
    );
    assert_eq!(err.code(), "X001");
}

#[test]
fn test_trailing_bytes() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();

    let mut w = Writer::new();
    w.stmt(NodeTag::Return0Stmt).stmt(NodeTag::Return0Stmt);

    let err = decode_body(types, &pool, &method(types), &w.finish()).unwrap_err();
    assert!(
        matches!(err, Error::Decode { offset: 1, .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn test_huge_bind_count_is_a_decode_error() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();

    let mut w = Writer::new();
    w.stmt(NodeTag::Return1Stmt)
        .expr(NodeTag::BindFunctionExpr)
        .register(0)
        .magnitude(u32::MAX);

    let err = decode_body(types, &pool, &method(types), &w.finish()).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }), "unexpected error: {err}");
}

#[test]
fn test_unsupported_nodes_are_rejected() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();

    let mut w = Writer::new();
    w.stmt(NodeTag::Return1Stmt).expr(NodeTag::RefOfExpr).register(0);

    let err = decode_body(types, &pool, &method(types), &w.finish()).unwrap_err();
    assert!(err.to_string().contains("RefOfExpr"), "{err}");
}

#[test]
fn test_missing_constant() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();

    let mut w = Writer::new();
    w.stmt(NodeTag::Return1Stmt).packed(-17);

    let err = decode_body(types, &pool, &method(types), &w.finish()).unwrap_err();
    assert!(err.to_string().contains("no constant #0"), "{err}");
}
