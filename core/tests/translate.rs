//! End-to-end translation of encoded method bodies.

use bumpalo::Bump;
use indoc::indoc;
use pretty_assertions::assert_eq;
use xjava_core::api::{MethodSource, TranslateOptions, Translator};
use xjava_core::ast::{AssignOp, Ast, BinOp, NodeId, NodeKind, UnOp};
use xjava_core::decode::{NodeTag, Writer, decode_body};
use xjava_core::emit::emit_expression;
use xjava_core::pool::{Const, ConstantPool, MethodInfo};
use xjava_core::resolve::{Resolver, TypeTable};
use xjava_core::rewrite::Rewriter;
use xjava_core::types::TypeManager;

fn checked() -> TranslateOptions {
    TranslateOptions {
        check_types: true,
        ..TranslateOptions::default()
    }
}

fn switch_body(pool: &mut ConstantPool<'_>) -> Vec<u8> {
    let one = pool.add(Const::long(1));
    let two = pool.add(Const::long(2));
    let mut w = Writer::new();
    w.stmt(NodeTag::SwitchStmt).register(0).packed(0).magnitude(3);
    w.const_id(one).const_id(two).packed(-1);
    w.packed(0b110);
    w.stmt(NodeTag::BreakStmt).magnitude(0);
    w.stmt(NodeTag::Return0Stmt);
    w.finish()
}

#[test]
fn test_integer_switch_stays_native() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let method = MethodInfo::new("classify", types.class("Demo", &[]))
        .static_()
        .param("x", types.long());
    let mut pool = ConstantPool::new();
    let bytes = switch_body(&mut pool);

    let text = translator.translate_method(&method, &mut pool, &bytes).unwrap();
    assert_eq!(
        text,
        indoc! {"
            public static void classify(long x) {
                switch (clampInt(x)) {
                    case 1, 2:
                        break;
                    default:
                        return;
                }
            }
        "}
    );
}

#[test]
fn test_small_expansion_limit_lowers_switch_to_conditionals() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let options = TranslateOptions {
        max_switch_expansion: 1,
        ..checked()
    };
    let translator = Translator::new(types, options);
    let method = MethodInfo::new("classify", types.class("Demo", &[]))
        .static_()
        .param("x", types.long());
    let mut pool = ConstantPool::new();
    let bytes = switch_body(&mut pool);

    let text = translator.translate_body(&method, &mut pool, &bytes).unwrap();
    assert!(!text.contains("switch"), "{}", text);
    assert!(text.contains("if ("), "{}", text);
    assert!(text.contains("break L$"), "{}", text);
}

#[test]
fn test_conditional_assignment_in_if() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let method = MethodInfo::new("pick", types.class("Demo", &[]))
        .static_()
        .param("s", types.nullable(types.str()))
        .returns(types.str());

    let mut pool = ConstantPool::new();
    let string = pool.add(Const::Type(types.str()));
    let name = pool.add(Const::Str("v".to_string()));
    let none = pool.add(Const::Str("none".to_string()));

    let mut w = Writer::new();
    w.stmt(NodeTag::StmtBlock).magnitude(2);
    w.stmt(NodeTag::IfThenStmt);
    w.expr(NodeTag::BinOpAssign)
        .expr(NodeTag::NamedRegAlloc)
        .const_id(string)
        .const_id(name)
        .assign_op(AssignOp::NotNullAsn)
        .register(0);
    w.stmt(NodeTag::Return1Stmt).register(1);
    w.stmt(NodeTag::Return1Stmt).constant(none);

    let text = translator
        .translate_method(&method, &mut pool, &w.finish())
        .unwrap();
    assert_eq!(
        text,
        indoc! {r#"
            public static String pick(String s) {
                String $t0 = null;
                if (($t0 = s) != null) {
                    String v = $t0;
                    return v;
                }
                return "none";
            }
        "#}
    );
}

#[test]
fn test_elvis_evaluates_its_left_side_once() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let method = MethodInfo::new("orElse", types.class("Demo", &[]))
        .static_()
        .param("a", types.nullable(types.str()))
        .returns(types.str());

    let mut pool = ConstantPool::new();
    let none = pool.add(Const::Str("none".to_string()));
    let mut w = Writer::new();
    w.stmt(NodeTag::Return1Stmt)
        .expr(NodeTag::CondOpExpr)
        .register(0)
        .bin_op(BinOp::CondElse)
        .constant(none);

    let text = translator.translate_body(&method, &mut pool, &w.finish()).unwrap();
    assert_eq!(
        text,
        indoc! {r#"
            {
                String $t0 = null;
                return ($t0 = a) != null ? $t0 : "none";
            }
        "#}
    );
    assert_eq!(text.matches(" a)").count(), 1);
}

#[test]
fn test_tuple_slice_builds_a_new_tuple() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let point = types.class("Point", &[]);
    let method = MethodInfo::new("tail", types.class("Demo", &[]))
        .static_()
        .param("t", types.tuple(&[types.str(), types.str(), point]))
        .returns(types.tuple(&[types.str(), point]));

    let mut pool = ConstantPool::new();
    let range = pool.add(Const::Range {
        lo: 1,
        hi: 2,
        lo_excl: false,
        hi_excl: false,
    });
    let mut w = Writer::new();
    w.stmt(NodeTag::Return1Stmt)
        .expr(NodeTag::ArrayAccessExpr)
        .register(0)
        .constant(range);

    let text = translator
        .translate_method(&method, &mut pool, &w.finish())
        .unwrap();
    assert_eq!(
        text,
        indoc! {"
            public static Tuple2<String,Point> tail(Tuple3<String,String,Point> t) {
                return new Tuple2<String,Point>(t._f1, t._f2);
            }
        "}
    );
}

#[test]
fn test_translation_is_deterministic() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let method = MethodInfo::new("classify", types.class("Demo", &[]))
        .static_()
        .param("x", types.long());

    let mut first_pool = ConstantPool::new();
    let bytes = switch_body(&mut first_pool);
    let first = translator.translate_body(&method, &mut first_pool, &bytes).unwrap();

    let mut second_pool = ConstantPool::new();
    let bytes = switch_body(&mut second_pool);
    let second = translator.translate_body(&method, &mut second_pool, &bytes).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_integer_switch_expands_range_labels() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let method = MethodInfo::new("classify", types.class("Demo", &[]))
        .static_()
        .param("x", types.long());

    let mut pool = ConstantPool::new();
    let one = pool.add(Const::long(1));
    let span = pool.add(Const::Range {
        lo: 4,
        hi: 10,
        lo_excl: false,
        hi_excl: false,
    });
    let mut w = Writer::new();
    w.stmt(NodeTag::SwitchStmt).register(0).packed(0).magnitude(3);
    w.const_id(one).const_id(span).packed(-1);
    w.packed(0b110);
    w.stmt(NodeTag::BreakStmt).magnitude(0);
    w.stmt(NodeTag::Return0Stmt);

    let text = translator.translate_body(&method, &mut pool, &w.finish()).unwrap();
    assert_eq!(
        text,
        indoc! {"
            {
                switch (clampInt(x)) {
                    case 1, 4, 5, 6, 7, 8, 9, 10:
                        break;
                    default:
                        return;
                }
            }
        "}
    );
}

#[test]
fn test_tuple_slice_of_a_call_evaluates_it_once() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let demo = types.class("Demo", &[]);
    let point = types.class("Point", &[]);
    let five = types.tuple(&[types.long(), types.str(), types.str(), point, types.long()]);
    let method = MethodInfo::new("tail", demo).returns(types.tuple(&[types.str(), point]));

    let mut pool = ConstantPool::new();
    let produce = pool.add(Const::Method(Box::new(MethodInfo::new("five", demo).returns(five))));
    let range = pool.add(Const::Range {
        lo: 2,
        hi: 3,
        lo_excl: false,
        hi_excl: false,
    });
    let mut w = Writer::new();
    w.stmt(NodeTag::Return1Stmt).expr(NodeTag::ArrayAccessExpr);
    w.expr(NodeTag::InvokeExpr).const_id(produce).this().magnitude(0);
    w.constant(range);

    let text = translator
        .translate_method(&method, &mut pool, &w.finish())
        .unwrap();
    assert_eq!(
        text,
        indoc! {"
            public Tuple2<String,Point> tail() {
                Tuple5<Long,String,String,Point,Long> $t0 = null;
                return new Tuple2<String,Point>(($t0 = this.five())._f2, $t0._f3);
            }
        "}
    );
    assert_eq!(text.matches("five()").count(), 1);
}

#[test]
fn test_elvis_calls_its_left_side_once() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let demo = types.class("Demo", &[]);
    let method = MethodInfo::new("orElse", demo).returns(types.str());

    let mut pool = ConstantPool::new();
    let lookup = pool.add(Const::Method(Box::new(
        MethodInfo::new("lookup", demo).returns(types.nullable(types.str())),
    )));
    let none = pool.add(Const::Str("none".to_string()));
    let mut w = Writer::new();
    w.stmt(NodeTag::Return1Stmt).expr(NodeTag::CondOpExpr);
    w.expr(NodeTag::InvokeExpr).const_id(lookup).this().magnitude(0);
    w.bin_op(BinOp::CondElse).constant(none);

    let text = translator.translate_body(&method, &mut pool, &w.finish()).unwrap();
    assert_eq!(
        text,
        indoc! {r#"
            {
                String $t0 = null;
                return ($t0 = this.lookup()) != null ? $t0 : "none";
            }
        "#}
    );
    assert_eq!(text.matches("lookup()").count(), 1);
}

#[test]
fn test_assert_without_message() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let method = MethodInfo::new("check", types.class("Demo", &[]))
        .static_()
        .param("ok", types.bool());

    let mut w = Writer::new();
    w.stmt(NodeTag::AssertStmt).register(0).none();

    let text = translator
        .translate_method(&method, &mut ConstantPool::new(), &w.finish())
        .unwrap();
    assert_eq!(
        text,
        indoc! {"
            public static void check(boolean ok) {
                $assert(ok);
            }
        "}
    );
}

/// `for (i : range) { s += i; } return s;` over a constant range.
fn range_loop<'t>(
    pool: &mut ConstantPool<'t>,
    types: &'t TypeManager<'t>,
    range: Const<'t>,
) -> Vec<u8> {
    let long = pool.add(Const::Type(types.long()));
    let name = pool.add(Const::Str("i".to_string()));
    let range = pool.add(range);
    let mut w = Writer::new();
    w.stmt(NodeTag::StmtBlock).magnitude(2);
    w.stmt(NodeTag::ForRangeStmt);
    w.expr(NodeTag::NamedRegAlloc).const_id(long).const_id(name);
    w.constant(range);
    w.stmt(NodeTag::BinOpAssign)
        .register(0)
        .assign_op(AssignOp::AddAsn)
        .register(1);
    w.stmt(NodeTag::Return1Stmt).register(0);
    w.finish()
}

#[test]
fn test_constant_range_loop_counts_up() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let method = MethodInfo::new("total", types.class("Demo", &[]))
        .static_()
        .param("s", types.long())
        .returns(types.long());

    let mut pool = ConstantPool::new();
    let bytes = range_loop(
        &mut pool,
        types,
        Const::Range {
            lo: 0,
            hi: 10,
            lo_excl: false,
            hi_excl: true,
        },
    );
    let text = translator.translate_method(&method, &mut pool, &bytes).unwrap();
    assert_eq!(
        text,
        indoc! {"
            public static long total(long s) {
                for (long i = 0L; i <= 9L; ++i) {
                    s += i;
                }
                return s;
            }
        "}
    );
}

#[test]
fn test_range_loop_up_to_the_largest_value_stops_on_wrap() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let method = MethodInfo::new("total", types.class("Demo", &[]))
        .static_()
        .param("s", types.long())
        .returns(types.long());

    let mut pool = ConstantPool::new();
    let bytes = range_loop(
        &mut pool,
        types,
        Const::Range {
            lo: 5,
            hi: i64::MAX,
            lo_excl: false,
            hi_excl: false,
        },
    );
    let text = translator.translate_body(&method, &mut pool, &bytes).unwrap();
    assert!(text.contains("for (long i = 5L; i >= 5L; ++i) {"), "{}", text);

    let mut pool = ConstantPool::new();
    let bytes = range_loop(
        &mut pool,
        types,
        Const::Range {
            lo: i64::MIN,
            hi: i64::MAX,
            lo_excl: false,
            hi_excl: false,
        },
    );
    let err = translator.translate_body(&method, &mut pool, &bytes).unwrap_err();
    assert!(err.to_string().contains("range covers every `long` value"), "{}", err);
}

/// Resolves `ast` from scratch, rewrites it and returns the root shape.
fn rewrite_pass<'t>(
    types: &'t TypeManager<'t>,
    pool: &mut ConstantPool<'t>,
    method: &MethodInfo<'t>,
    ast: &mut Ast<'t>,
) -> String {
    let options = checked();
    let mut table = TypeTable::new();
    let root = ast.root().unwrap();
    Resolver::new(types, pool, false)
        .resolve(ast, &mut table, root)
        .unwrap();
    Rewriter::new(ast, pool, types, &mut table, method, &options)
        .run()
        .unwrap();
    ast.shape(ast.root().unwrap())
}

#[test]
fn test_rewriting_a_lowered_tree_changes_nothing() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let method = MethodInfo::new("orElse", types.class("Demo", &[]))
        .static_()
        .param("a", types.nullable(types.str()))
        .returns(types.str());

    let mut pool = ConstantPool::new();
    let none = pool.add(Const::Str("none".to_string()));
    let mut w = Writer::new();
    w.stmt(NodeTag::StmtBlock).magnitude(2);
    w.stmt(NodeTag::SwitchStmt).register(0).packed(0).magnitude(2);
    w.const_id(none).packed(-1);
    w.packed(0b11);
    w.stmt(NodeTag::BreakStmt).magnitude(0);
    w.stmt(NodeTag::Return0Stmt);
    w.stmt(NodeTag::Return1Stmt)
        .expr(NodeTag::CondOpExpr)
        .register(0)
        .bin_op(BinOp::CondElse)
        .constant(none);

    let mut ast = decode_body(types, &pool, &method, &w.finish()).unwrap();
    let once = rewrite_pass(types, &mut pool, &method, &mut ast);
    let twice = rewrite_pass(types, &mut pool, &method, &mut ast);
    assert_eq!(once, twice);
}

#[test]
fn test_type_check_does_not_change_output() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let method = MethodInfo::new("classify", types.class("Demo", &[]))
        .static_()
        .param("x", types.long());

    let unchecked = Translator::new(
        types,
        TranslateOptions {
            check_types: false,
            ..TranslateOptions::default()
        },
    );
    let mut pool = ConstantPool::new();
    let bytes = switch_body(&mut pool);
    let plain = unchecked.translate_body(&method, &mut pool, &bytes).unwrap();

    let checked = Translator::new(types, checked());
    let mut pool = ConstantPool::new();
    let bytes = switch_body(&mut pool);
    let verified = checked.translate_body(&method, &mut pool, &bytes).unwrap();

    assert_eq!(plain, verified);
}

#[test]
fn test_unit_collects_every_failure() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let owner = types.class("Demo", &[]);

    let mut good = Writer::new();
    good.stmt(NodeTag::Return1Stmt).register(0);
    let mut stray_continue = Writer::new();
    stray_continue.stmt(NodeTag::ContinueStmt).magnitude(0);

    let mut methods = vec![
        MethodSource {
            method: MethodInfo::new("id", owner)
                .static_()
                .param("x", types.long())
                .returns(types.long()),
            pool: ConstantPool::new(),
            body: good.finish(),
        },
        MethodSource {
            method: MethodInfo::new("truncated", owner).static_(),
            pool: ConstantPool::new(),
            body: vec![NodeTag::Return1Stmt as u8],
        },
        MethodSource {
            method: MethodInfo::new("stray", owner).static_(),
            pool: ConstantPool::new(),
            body: stray_continue.finish(),
        },
    ];

    let err = translator.translate_unit("Demo", &mut methods).unwrap_err();
    assert_eq!(err.class, "Demo");
    let failed: Vec<&str> = err.failures.iter().map(|f| f.method.as_str()).collect();
    assert_eq!(failed, vec!["truncated", "stray"]);
    assert_eq!(err.to_string(), "class `Demo`: 2 method(s) failed to translate");

    let codes: Vec<Option<String>> = err.diagnostics().into_iter().map(|d| d.code).collect();
    assert_eq!(
        codes,
        vec![Some("X001".to_string()), Some("X002".to_string())]
    );
}

#[test]
fn test_unit_wraps_methods_in_a_class() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let translator = Translator::new(types, checked());
    let owner = types.class("Demo", &[]);

    let mut id = Writer::new();
    id.stmt(NodeTag::Return1Stmt).register(0);
    let mut nothing = Writer::new();
    nothing.stmt(NodeTag::Return0Stmt);

    let mut methods = vec![
        MethodSource {
            method: MethodInfo::new("id", owner)
                .static_()
                .param("x", types.long())
                .returns(types.long()),
            pool: ConstantPool::new(),
            body: id.finish(),
        },
        MethodSource {
            method: MethodInfo::new("nothing", owner),
            pool: ConstantPool::new(),
            body: nothing.finish(),
        },
    ];

    let text = translator.translate_unit("Demo", &mut methods).unwrap();
    assert_eq!(
        text,
        indoc! {"
            public class Demo {
                public static long id(long x) {
                    return x;
                }

                public void nothing() {
                    return;
                }
            }
        "}
    );
}

/// Linear congruential generator; the tests only need a repeatable
/// stream.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

const OPS: [BinOp; 18] = [
    BinOp::Mul,
    BinOp::Div,
    BinOp::Mod,
    BinOp::Add,
    BinOp::Sub,
    BinOp::Shl,
    BinOp::Shr,
    BinOp::Lt,
    BinOp::Le,
    BinOp::Gt,
    BinOp::Ge,
    BinOp::Eq,
    BinOp::Ne,
    BinOp::BitAnd,
    BinOp::BitXor,
    BinOp::BitOr,
    BinOp::And,
    BinOp::Or,
];

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

fn random_name(rng: &mut Lcg) -> &'static str {
    NAMES[rng.next(NAMES.len() as u64) as usize]
}

/// Builds a random tree and returns it with its fully parenthesized form.
fn random_tree<'t>(
    rng: &mut Lcg,
    types: &'t TypeManager<'t>,
    ast: &mut Ast<'t>,
    depth: u32,
) -> (NodeId, String) {
    let choice = if depth == 0 { 0 } else { rng.next(9) };
    match choice {
        0 => {
            let name = random_name(rng);
            let id = ast.leaf(NodeKind::RegisterRef {
                name: name.to_string(),
                ty: types.long(),
            });
            (id, name.to_string())
        }
        1 => {
            let op = if rng.next(2) == 0 { UnOp::Neg } else { UnOp::BitNot };
            let (operand, text) = random_tree(rng, types, ast, depth - 1);
            let id = ast.branch(NodeKind::UnaryOp(op), &[operand]);
            (id, format!("(u{} {})", op.text(), text))
        }
        2 => {
            let (cond, c) = random_tree(rng, types, ast, depth - 1);
            let (then, t) = random_tree(rng, types, ast, depth - 1);
            let (other, e) = random_tree(rng, types, ast, depth - 1);
            let id = ast.branch(NodeKind::Ternary, &[cond, then, other]);
            (id, format!("(? {} {} {})", c, t, e))
        }
        3 => {
            let name = random_name(rng);
            let target = ast.leaf(NodeKind::RegisterRef {
                name: name.to_string(),
                ty: types.long(),
            });
            let (value, text) = random_tree(rng, types, ast, depth - 1);
            let id = ast.branch(NodeKind::Assign(AssignOp::Asn), &[target, value]);
            (id, format!("(= {} {})", name, text))
        }
        _ => {
            let op = OPS[rng.next(OPS.len() as u64) as usize];
            let (lhs, left) = random_tree(rng, types, ast, depth - 1);
            let (rhs, right) = random_tree(rng, types, ast, depth - 1);
            let id = ast.branch(NodeKind::BinaryOp(op), &[lhs, rhs]);
            (id, format!("({} {} {})", op.text(), left, right))
        }
    }
}

const TWO_CHAR_OPS: [&str; 8] = ["<<", ">>", "<=", ">=", "==", "!=", "&&", "||"];

/// Precedence-climbing reader for the Java subset the random trees use.
struct Reader {
    tokens: Vec<String>,
    pos: usize,
}

impl Reader {
    const ASSIGN: u8 = 1;
    const TERNARY: u8 = 2;

    fn new(text: &str) -> Self {
        let mut tokens = Vec::new();
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            let pair: String = chars[i..chars.len().min(i + 2)].iter().collect();
            if TWO_CHAR_OPS.contains(&pair.as_str()) {
                tokens.push(pair);
                i += 2;
            } else {
                tokens.push(c.to_string());
                i += 1;
            }
        }
        Reader { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn bump(&mut self) -> String {
        self.pos += 1;
        self.tokens[self.pos - 1].clone()
    }

    fn level(token: &str) -> Option<u8> {
        Some(match token {
            "*" | "/" | "%" => 12,
            "+" | "-" => 11,
            "<<" | ">>" => 10,
            "<" | "<=" | ">" | ">=" => 9,
            "==" | "!=" => 8,
            "&" => 7,
            "^" => 6,
            "|" => 5,
            "&&" => 4,
            "||" => 3,
            "?" => Self::TERNARY,
            "=" => Self::ASSIGN,
            _ => return None,
        })
    }

    fn expr(&mut self, min: u8) -> String {
        let mut lhs = match self.bump().as_str() {
            "(" => {
                let inner = self.expr(0);
                assert_eq!(self.bump(), ")");
                inner
            }
            op @ ("-" | "~") => format!("(u{} {})", op, self.expr(u8::MAX)),
            name => name.to_string(),
        };
        while let Some(level) = self.peek().and_then(Reader::level) {
            if level < min {
                break;
            }
            let op = self.bump();
            lhs = match op.as_str() {
                "?" => {
                    let then = self.expr(0);
                    assert_eq!(self.bump(), ":");
                    let other = self.expr(Self::TERNARY);
                    format!("(? {} {} {})", lhs, then, other)
                }
                "=" => format!("(= {} {})", lhs, self.expr(Self::ASSIGN)),
                _ => format!("({} {} {})", op, lhs, self.expr(level + 1)),
            };
        }
        lhs
    }
}

#[test]
fn test_emitted_expressions_read_back_as_the_same_tree() {
    let bump = Bump::new();
    let types = TypeManager::new(&bump);
    let pool = ConstantPool::new();
    let table = TypeTable::new();
    let mut rng = Lcg(0x5eed);

    for _ in 0..200 {
        let mut ast = Ast::new();
        let (root, expected) = random_tree(&mut rng, types, &mut ast, 5);
        let text = emit_expression(&ast, &pool, &table, root).unwrap();
        assert!(!text.contains("--"), "{}", text);

        let mut reader = Reader::new(&text);
        let parsed = reader.expr(0);
        assert_eq!(reader.peek(), None, "{}", text);
        assert_eq!(parsed, expected, "{}", text);
    }
}
