use crate::ast::{Ast, AssignOp, BinOp, BlockScope, CaseLabel, Conv, NativeArm, NativeSwitch, NodeId, NodeKind, SwitchInfo, UnOp};
use crate::emit::{emit_body, emit_expression};
use crate::errors::Error;
use crate::pool::{Const, ConstantPool, IntFormat, MethodInfo};
use crate::resolve::{Resolver, TypeTable};
use crate::test_utils::init_test_logging;
use crate::types::{Prim, Type, TypeManager};
use bumpalo::Bump;
use indoc::indoc;
use pretty_assertions::assert_eq;

fn reg<'t>(ast: &mut Ast<'t>, name: &str, ty: &'t Type<'t>) -> NodeId {
    ast.leaf(NodeKind::RegisterRef {
        name: name.to_string(),
        ty,
    })
}

fn define<'t>(ast: &mut Ast<'t>, name: &str, ty: &'t Type<'t>) -> NodeId {
    ast.leaf(NodeKind::Define {
        name: name.to_string(),
        ty,
    })
}

fn block<'t>(ast: &mut Ast<'t>, stmts: &[NodeId]) -> NodeId {
    ast.branch(NodeKind::Block(Box::new(BlockScope::new())), stmts)
}

fn constant<'t>(ast: &mut Ast<'t>, pool: &mut ConstantPool<'t>, value: Const<'t>) -> NodeId {
    let id = pool.add(value);
    ast.leaf(NodeKind::Constant(id))
}

fn expr<'t>(types: &'t TypeManager<'t>, pool: &ConstantPool<'t>, ast: &Ast<'t>, id: NodeId) -> String {
    let mut table = TypeTable::new();
    Resolver::new(types, pool, false)
        .resolve(ast, &mut table, id)
        .unwrap();
    emit_expression(ast, pool, &table, id).unwrap()
}

fn body<'t>(types: &'t TypeManager<'t>, pool: &ConstantPool<'t>, ast: &mut Ast<'t>, root: NodeId) -> String {
    init_test_logging();
    ast.set_root(root);
    let mut table = TypeTable::new();
    Resolver::new(types, pool, false)
        .resolve(ast, &mut table, root)
        .unwrap();
    emit_body(ast, pool, &table, "    ").unwrap()
}

#[test]
fn test_parenthesizes_by_precedence() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();
    let mut ast = Ast::new();
    let long = types.long();

    let (a, b, c) = (reg(&mut ast, "a", long), reg(&mut ast, "b", long), reg(&mut ast, "c", long));
    let sum = ast.branch(NodeKind::BinaryOp(BinOp::Add), &[a, b]);
    let product = ast.branch(NodeKind::BinaryOp(BinOp::Mul), &[sum, c]);
    assert_eq!(expr(types, &pool, &ast, product), "(a + b) * c");

    let (a, b, c) = (reg(&mut ast, "a", long), reg(&mut ast, "b", long), reg(&mut ast, "c", long));
    let inner = ast.branch(NodeKind::BinaryOp(BinOp::Sub), &[b, c]);
    let right = ast.branch(NodeKind::BinaryOp(BinOp::Sub), &[a, inner]);
    assert_eq!(expr(types, &pool, &ast, right), "a - (b - c)");

    let (a, b, c) = (reg(&mut ast, "a", long), reg(&mut ast, "b", long), reg(&mut ast, "c", long));
    let inner = ast.branch(NodeKind::BinaryOp(BinOp::Sub), &[a, b]);
    let left = ast.branch(NodeKind::BinaryOp(BinOp::Sub), &[inner, c]);
    assert_eq!(expr(types, &pool, &ast, left), "a - b - c");

    let (a, b, c) = (reg(&mut ast, "a", long), reg(&mut ast, "b", long), reg(&mut ast, "c", long));
    let shift = ast.branch(NodeKind::BinaryOp(BinOp::Shl), &[a, b]);
    let masked = ast.branch(NodeKind::BinaryOp(BinOp::BitAnd), &[shift, c]);
    assert_eq!(expr(types, &pool, &ast, masked), "a << b & c");
}

#[test]
fn test_logical_operators() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();
    let mut ast = Ast::new();
    let bool_ty = types.bool();

    let (p, q, r) = (reg(&mut ast, "p", bool_ty), reg(&mut ast, "q", bool_ty), reg(&mut ast, "r", bool_ty));
    let or = ast.branch(NodeKind::BinaryOp(BinOp::Or), &[q, r]);
    let and = ast.branch(NodeKind::BinaryOp(BinOp::And), &[p, or]);
    let not = ast.branch(NodeKind::UnaryOp(UnOp::Not), &[and]);
    assert_eq!(expr(types, &pool, &ast, not), "!(p && (q || r))");
}

#[test]
fn test_unary_signs_do_not_merge() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let mut ast = Ast::new();

    let x = reg(&mut ast, "x", types.long());
    let inner = ast.branch(NodeKind::UnaryOp(UnOp::Neg), &[x]);
    let outer = ast.branch(NodeKind::UnaryOp(UnOp::Neg), &[inner]);
    assert_eq!(expr(types, &pool, &ast, outer), "- -x");

    let five = constant(&mut ast, &mut pool, Const::long(-5));
    let negated = ast.branch(NodeKind::UnaryOp(UnOp::Neg), &[five]);
    assert_eq!(expr(types, &pool, &ast, negated), "- -5L");

    let y = reg(&mut ast, "y", types.long());
    let post = ast.branch(NodeKind::UnaryOp(UnOp::PostInc), &[y]);
    assert_eq!(expr(types, &pool, &ast, post), "y++");
}

#[test]
fn test_ternary_nests_to_the_right() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();
    let mut ast = Ast::new();
    let bool_ty = types.bool();
    let long = types.long();

    let c = reg(&mut ast, "c", bool_ty);
    let d = reg(&mut ast, "d", bool_ty);
    let (a, b, e) = (reg(&mut ast, "a", long), reg(&mut ast, "b", long), reg(&mut ast, "e", long));
    let inner = ast.branch(NodeKind::Ternary, &[d, b, e]);
    let outer = ast.branch(NodeKind::Ternary, &[c, a, inner]);
    assert_eq!(expr(types, &pool, &ast, outer), "c ? a : d ? b : e");

    let (x, y) = (reg(&mut ast, "x", long), reg(&mut ast, "y", long));
    let value = ast.branch(NodeKind::Ternary, &[outer, x, y]);
    assert_eq!(
        expr(types, &pool, &ast, value),
        "(c ? a : d ? b : e) ? x : y"
    );
}

#[test]
fn test_calls_and_conversions() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let mut ast = Ast::new();
    let long = types.long();

    let helper = pool.add(Const::Method(Box::new(
        MethodInfo::new("$t", types.object())
            .static_()
            .param("a0", long)
            .returns(types.bool()),
    )));
    let math = types.class("Math", &[]);
    let max = pool.add(Const::Method(Box::new(
        MethodInfo::new("max", math)
            .static_()
            .param("a", long)
            .param("b", long)
            .returns(long),
    )));
    let length = pool.add(Const::Method(Box::new(
        MethodInfo::new("length", types.str()).returns(types.int()),
    )));

    let x = reg(&mut ast, "x", long);
    let call = ast.add(NodeKind::Invoke { method: helper }, [None, Some(x)]);
    assert_eq!(expr(types, &pool, &ast, call), "$t(x)");

    let (a, b) = (reg(&mut ast, "a", long), reg(&mut ast, "b", long));
    let call = ast.add(NodeKind::Invoke { method: max }, [None, Some(a), Some(b)]);
    assert_eq!(expr(types, &pool, &ast, call), "Math.max(a, b)");

    let s = reg(&mut ast, "s", types.str());
    let call = ast.add(NodeKind::Invoke { method: length }, [Some(s)]);
    let widened = ast.branch(
        NodeKind::Convert {
            ty: long,
            conv: Conv::Cast,
        },
        &[call],
    );
    assert_eq!(expr(types, &pool, &ast, widened), "(long) s.length()");

    let n = reg(&mut ast, "n", types.boxed(Prim::Long));
    let (p, q) = (reg(&mut ast, "p", long), reg(&mut ast, "q", long));
    let sum = ast.branch(NodeKind::BinaryOp(BinOp::Add), &[p, q]);
    let boxed = ast.branch(
        NodeKind::Convert {
            ty: types.boxed(Prim::Long),
            conv: Conv::Box,
        },
        &[sum],
    );
    let equals = ast.branch(NodeKind::BinaryOp(BinOp::Equals), &[n, boxed]);
    assert_eq!(
        expr(types, &pool, &ast, equals),
        "n.equals(Long.valueOf(p + q))"
    );
}

#[test]
fn test_comparisons_and_element_access() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let mut ast = Ast::new();
    let long = types.long();

    let (a, b) = (reg(&mut ast, "a", long), reg(&mut ast, "b", long));
    let cmp = ast.branch(NodeKind::BinaryOp(BinOp::Cmp), &[a, b]);
    assert_eq!(
        expr(types, &pool, &ast, cmp),
        "Ordering.of(Long.compare(a, b))"
    );

    let (s, t) = (reg(&mut ast, "s", types.str()), reg(&mut ast, "t", types.str()));
    let order = ast.branch(NodeKind::Order(BinOp::Le), &[s, t]);
    assert_eq!(expr(types, &pool, &ast, order), "s.compareTo(t) <= 0");

    let pair = types.tuple(&[types.str(), types.boxed(Prim::Long)]);
    let tuple = reg(&mut ast, "pair", pair);
    let one = constant(&mut ast, &mut pool, Const::long(1));
    let field = ast.branch(NodeKind::BinaryOp(BinOp::Index), &[tuple, one]);
    assert_eq!(expr(types, &pool, &ast, field), "pair._f1");

    let array = reg(&mut ast, "xs", types.array(long));
    let i = reg(&mut ast, "i", long);
    let element = ast.branch(NodeKind::BinaryOp(BinOp::IndexPrim), &[array, i]);
    assert_eq!(expr(types, &pool, &ast, element), "xs.at(i)");
}

#[test]
fn test_literals_are_escaped() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let mut ast = Ast::new();

    let cases = [
        (Const::Str("say \"hi\"\n".into()), r#""say \"hi\"\n""#),
        (Const::Char('\''), r"'\''"),
        (
            Const::Int {
                value: 7,
                format: IntFormat::Int32,
            },
            "7",
        ),
        (Const::Float(1.5), "1.5"),
        (Const::Float(f64::NAN), "Double.NaN"),
        (Const::Null, "null"),
        (
            Const::Range {
                lo: 1,
                hi: 4,
                lo_excl: false,
                hi_excl: true,
            },
            "new Range(1L, 4L, false, true)",
        ),
    ];
    for (value, java) in cases {
        let id = constant(&mut ast, &mut pool, value);
        assert_eq!(expr(types, &pool, &ast, id), java);
    }
}

#[test]
fn test_block_prologue_declares_temps_and_finals() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();
    let mut ast = Ast::new();
    let long = types.long();

    let mut scope = BlockScope::new();
    scope.add_temp(long, "$t0".to_string());
    scope.add_temp(types.str(), "$t1".to_string());
    scope.add_temp(long, "$t2".to_string());
    scope.capture_final("x", long);
    let target = reg(&mut ast, "$t0", long);
    let x = reg(&mut ast, "x", long);
    let assign = ast.branch(NodeKind::Assign(AssignOp::Asn), &[target, x]);
    let root = ast.branch(NodeKind::Block(Box::new(scope)), &[assign]);

    assert_eq!(
        body(types, &pool, &mut ast, root),
        indoc! {"
            {
                long $t0 = 0L, $t2 = 0L;
                String $t1 = null;
                final long x$ = x;
                $t0 = x;
            }
        "}
    );
}

#[test]
fn test_assert_with_and_without_message() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let mut ast = Ast::new();

    let ok = reg(&mut ast, "ok", types.bool());
    let bare = ast.add(NodeKind::Assert, [Some(ok), None]);
    let ok = reg(&mut ast, "ok", types.bool());
    let message = constant(&mut ast, &mut pool, Const::Str("not ok".to_string()));
    let explained = ast.add(NodeKind::Assert, [Some(ok), Some(message)]);
    let root = block(&mut ast, &[bare, explained]);

    assert_eq!(
        body(types, &pool, &mut ast, root),
        indoc! {r#"
            {
                $assert(ok);
                $assert(ok, "not ok");
            }
        "#}
    );
}

#[test]
fn test_else_if_chain() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();
    let mut ast = Ast::new();
    let bool_ty = types.bool();
    let long = types.long();

    let a = reg(&mut ast, "a", bool_ty);
    let b = reg(&mut ast, "b", bool_ty);
    let x = reg(&mut ast, "x", long);
    let y = reg(&mut ast, "y", long);
    let z = reg(&mut ast, "z", long);
    let ret_x = ast.branch(NodeKind::Return, &[x]);
    let ret_y = ast.branch(NodeKind::Return, &[y]);
    let ret_z = ast.branch(NodeKind::Return, &[z]);
    let then_x = block(&mut ast, &[ret_x]);
    let then_y = block(&mut ast, &[ret_y]);
    let then_z = block(&mut ast, &[ret_z]);
    let inner = ast.branch(NodeKind::If, &[b, then_y, then_z]);
    let other = block(&mut ast, &[inner]);
    let outer = ast.branch(NodeKind::If, &[a, then_x, other]);
    let root = block(&mut ast, &[outer]);

    assert_eq!(
        body(types, &pool, &mut ast, root),
        indoc! {"
            {
                if (a) {
                    return x;
                } else if (b) {
                    return y;
                } else {
                    return z;
                }
            }
        "}
    );
}

#[test]
fn test_native_switch_statement() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let mut ast = Ast::new();
    let long = types.long();

    let x = reg(&mut ast, "x", long);
    let y = reg(&mut ast, "y", long);
    let one = constant(&mut ast, &mut pool, Const::long(1));
    let assign = ast.branch(NodeKind::Assign(AssignOp::Asn), &[y, one]);
    let first = block(&mut ast, &[assign]);
    let noop = ast.leaf(NodeKind::NoOp);
    let second = block(&mut ast, &[noop]);
    let ret = ast.leaf(NodeKind::Return);
    let fallback = block(&mut ast, &[ret]);
    let native = NativeSwitch {
        arms: vec![
            NativeArm {
                labels: vec![CaseLabel::Int(1), CaseLabel::Int(2)],
                is_default: false,
                body: 1,
                fallthrough: false,
            },
            NativeArm {
                labels: vec![CaseLabel::Int(3)],
                is_default: false,
                body: 2,
                fallthrough: true,
            },
            NativeArm {
                labels: vec![],
                is_default: true,
                body: 3,
                fallthrough: false,
            },
        ],
        clamp: true,
    };
    let switch = ast.add(
        NodeKind::Switch(Box::new(SwitchInfo {
            is_expr: false,
            isa: 0,
            cases: vec![],
            result: None,
            native: Some(native),
            label: None,
        })),
        [Some(x), Some(first), Some(second), Some(fallback)],
    );
    let root = block(&mut ast, &[switch]);

    assert_eq!(
        body(types, &pool, &mut ast, root),
        indoc! {"
            {
                switch (clampInt(x)) {
                    case 1, 2:
                        y = 1L;
                        break;
                    case 3:
                    default:
                        return;
                }
            }
        "}
    );
}

#[test]
fn test_switch_expression_gets_a_default() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let mut ast = Ast::new();
    let long = types.long();

    let s = reg(&mut ast, "s", types.str());
    let one = constant(&mut ast, &mut pool, Const::long(1));
    let native = NativeSwitch {
        arms: vec![NativeArm {
            labels: vec![CaseLabel::Str("a".into()), CaseLabel::Str("b".into())],
            is_default: false,
            body: 1,
            fallthrough: false,
        }],
        clamp: false,
    };
    let switch = ast.add(
        NodeKind::Switch(Box::new(SwitchInfo {
            is_expr: true,
            isa: 0,
            cases: vec![],
            result: Some(long),
            native: Some(native),
            label: None,
        })),
        [Some(s), Some(one)],
    );
    let ret = ast.branch(NodeKind::Return, &[switch]);
    let root = block(&mut ast, &[ret]);

    assert_eq!(
        body(types, &pool, &mut ast, root),
        indoc! {r#"
            {
                return switch (s) {
                    case "a", "b" -> 1L;
                    default -> throw new IllegalStateException();
                };
            }
        "#}
    );
}

#[test]
fn test_statement_expression_becomes_supplier() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();
    let mut ast = Ast::new();
    let long = types.long();

    let x = reg(&mut ast, "x", long);
    let inner_ret = ast.branch(NodeKind::Return, &[x]);
    let lambda_body = block(&mut ast, &[inner_ret]);
    let value = ast.branch(NodeKind::StmtExpr { ty: long }, &[lambda_body]);
    let ret = ast.branch(NodeKind::Return, &[value]);
    let root = block(&mut ast, &[ret]);

    assert_eq!(
        body(types, &pool, &mut ast, root),
        indoc! {"
            {
                return ((Supplier<Long>) () -> {
                    return x;
                }).get();
            }
        "}
    );
}

#[test]
fn test_loops() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let mut ast = Ast::new();
    let long = types.long();

    let i = define(&mut ast, "i", long);
    let zero = constant(&mut ast, &mut pool, Const::long(0));
    let init = ast.branch(NodeKind::Assign(AssignOp::Asn), &[i, zero]);
    let (i_ref, n) = (reg(&mut ast, "i", long), reg(&mut ast, "n", long));
    let cond = ast.branch(NodeKind::BinaryOp(BinOp::Lt), &[i_ref, n]);
    let i_ref = reg(&mut ast, "i", long);
    let update = ast.branch(NodeKind::UnaryOp(UnOp::PreInc), &[i_ref]);
    let empty = block(&mut ast, &[]);
    let counted = ast.add(
        NodeKind::ForClassic { label: None },
        [Some(init), Some(cond), Some(update), Some(empty)],
    );

    let map_ty = types.class("Map", &[types.str(), types.boxed(Prim::Long)]);
    let k = define(&mut ast, "k", types.str());
    let v = define(&mut ast, "v", long);
    let vars = ast.branch(NodeKind::Multi { stmts: false }, &[k, v]);
    let m = reg(&mut ast, "m", map_ty);
    let (total, v_ref) = (reg(&mut ast, "total", long), reg(&mut ast, "v", long));
    let add = ast.branch(NodeKind::Assign(AssignOp::AddAsn), &[total, v_ref]);
    let loop_body = block(&mut ast, &[add]);
    let entries = ast.add(
        NodeKind::ForIterate {
            label: Some("L$0".into()),
            map: true,
        },
        [Some(vars), Some(m), Some(loop_body)],
    );
    let root = block(&mut ast, &[counted, entries]);

    let expected = indoc! {"
        {
            for (long i = 0L; i < n; ++i) {
            }
            L$0: for (var $eN : m.entrySet()) {
                String k = $eN.getKey();
                long v = $eN.getValue();
                total += v;
            }
        }
    "}
    .replace("$eN", &format!("$e{}", entries.0));
    assert_eq!(body(types, &pool, &mut ast, root), expected);
}

#[test]
fn test_try_with_resources() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let mut pool = ConstantPool::new();
    let mut ast = Ast::new();
    let reader = types.class("Reader", &[]);
    let failure = types.class("IOException", &[]);
    let open = pool.add(Const::Method(Box::new(
        MethodInfo::new("open", reader).static_().returns(reader),
    )));

    let r = define(&mut ast, "r", reader);
    let call = ast.add(NodeKind::Invoke { method: open }, [None]);
    let resource = ast.branch(NodeKind::Assign(AssignOp::Asn), &[r, call]);
    let ret = ast.leaf(NodeKind::Return);
    let body_block = block(&mut ast, &[ret]);
    let e = define(&mut ast, "e", failure);
    let e_ref = reg(&mut ast, "e", failure);
    let rethrow = ast.branch(NodeKind::Throw, &[e_ref]);
    let handler = block(&mut ast, &[rethrow]);
    let cleanup = block(&mut ast, &[]);
    let try_catch = ast.branch(
        NodeKind::TryCatch {
            resources: 1,
            catches: 1,
            finally: true,
        },
        &[resource, body_block, e, handler, cleanup],
    );
    let root = block(&mut ast, &[try_catch]);

    assert_eq!(
        body(types, &pool, &mut ast, root),
        indoc! {"
            {
                try (Reader r = Reader.open()) {
                    return;
                } catch (IOException e) {
                    throw e;
                } finally {
                }
            }
        "}
    );
}

#[test]
fn test_unlowered_node_is_an_error() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();
    let mut ast = Ast::new();
    let text = types.nullable(types.str());

    let a = reg(&mut ast, "a", text);
    let b = reg(&mut ast, "b", types.str());
    let elvis = ast.branch(NodeKind::BinaryOp(BinOp::CondElse), &[a, b]);
    let mut table = TypeTable::new();
    Resolver::new(types, &pool, false)
        .resolve(&ast, &mut table, elvis)
        .unwrap();

    let err = emit_expression(&ast, &pool, &table, elvis).unwrap_err();
    assert!(
        matches!(&err, Error::Structure { kind: "BinaryOp", reason, .. } if reason == "`?:` was not lowered"),
        "unexpected error: {}",
        err
    );
}
