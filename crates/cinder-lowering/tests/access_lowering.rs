//! Scope-chain access and assignment lowering.

use cinder_ast::{AssignOp, BinaryOp, IncrDecrOp, NodeArena, NodeIndex, NodeKind, NodeList};
use cinder_common::Span;
use cinder_lowering::{
    ExprContext, Fragment, LowerErrorKind, LoweringSession, RuntimeFn, lower_expr,
};

fn member(arena: &mut NodeArena, base: NodeIndex, name: &str, safe: bool) -> NodeIndex {
    arena.add(
        NodeKind::MemberAccess {
            base,
            name: name.to_string(),
            safe,
        },
        Span::EMPTY,
    )
}

fn assignment(
    arena: &mut NodeArena,
    target: NodeIndex,
    op: AssignOp,
    value: NodeIndex,
) -> NodeIndex {
    arena.add(
        NodeKind::Assignment {
            target,
            op,
            value,
            declares_local: false,
        },
        Span::EMPTY,
    )
}

fn scope_find(name: &str) -> Fragment {
    Fragment::call(
        RuntimeFn::ScopeFind,
        vec![Fragment::name("context"), Fragment::string(name)],
    )
}

#[test]
fn identifier_lowers_per_context() {
    let mut arena = NodeArena::new("x");
    let x = arena.add_ident("x", Span::new(0, 1));
    let mut session = LoweringSession::new();

    let read = lower_expr(&arena, &mut session, x, ExprContext::Right).unwrap();
    assert_eq!(read, scope_find("x"));

    let target = lower_expr(&arena, &mut session, x, ExprContext::Left).unwrap();
    assert_eq!(
        target,
        Fragment::location(
            Fragment::call(
                RuntimeFn::ScopeLocate,
                vec![Fragment::name("context"), Fragment::string("x")],
            ),
            Fragment::string("x"),
        )
    );

    // A location is never a read and a read is never a location.
    assert!(matches!(read, Fragment::RuntimeCall { .. }));
    assert!(matches!(target, Fragment::Location { .. }));
}

#[test]
fn member_chain_is_one_deref_per_hop() {
    let mut arena = NodeArena::new("a.b.c");
    let a = arena.add_ident("a", Span::new(0, 1));
    let ab = member(&mut arena, a, "b", false);
    let abc = member(&mut arena, ab, "c", false);
    let mut session = LoweringSession::new();

    let frag = lower_expr(&arena, &mut session, abc, ExprContext::Right).unwrap();
    assert_eq!(
        frag,
        Fragment::call(
            RuntimeFn::Deref { safe: false },
            vec![
                Fragment::call(
                    RuntimeFn::Deref { safe: false },
                    vec![scope_find("a"), Fragment::string("b")],
                ),
                Fragment::string("c"),
            ],
        )
    );
}

#[test]
fn safe_hop_forces_whole_chain_safe() {
    let mut arena = NodeArena::new("a?.b.c");
    let a = arena.add_ident("a", Span::new(0, 1));
    let ab = member(&mut arena, a, "b", true);
    let abc = member(&mut arena, ab, "c", false);
    let mut session = LoweringSession::new();

    let frag = lower_expr(&arena, &mut session, abc, ExprContext::Right).unwrap();
    let safe_hops = frag.count_matching(|f| {
        matches!(
            f,
            Fragment::RuntimeCall {
                func: RuntimeFn::Deref { safe: true },
                ..
            }
        )
    });
    let unsafe_hops = frag.count_matching(|f| {
        matches!(
            f,
            Fragment::RuntimeCall {
                func: RuntimeFn::Deref { safe: false },
                ..
            }
        )
    });
    assert_eq!(safe_hops, 2);
    assert_eq!(unsafe_hops, 0);
}

#[test]
fn safe_method_call_marks_the_call_shape() {
    let mut arena = NodeArena::new("a?.run()");
    let a = arena.add_ident("a", Span::new(0, 1));
    let call = arena.add(
        NodeKind::MethodCall {
            base: a,
            name: "run".to_string(),
            args: NodeList::empty(),
            safe: true,
        },
        Span::EMPTY,
    );
    let mut session = LoweringSession::new();

    let frag = lower_expr(&arena, &mut session, call, ExprContext::Right).unwrap();
    assert_eq!(
        frag,
        Fragment::call(
            RuntimeFn::CallMethod { safe: true },
            vec![
                scope_find("a"),
                Fragment::string("run"),
                Fragment::Array(Vec::new()),
            ],
        )
    );
}

#[test]
fn bare_identifier_index_is_a_literal_key() {
    let mut arena = NodeArena::new("a[b]");
    let a = arena.add_ident("a", Span::new(0, 1));
    let b = arena.add_ident("b", Span::new(2, 3));
    let access = arena.add(
        NodeKind::IndexAccess {
            base: a,
            index: b,
            safe: false,
        },
        Span::EMPTY,
    );
    let mut session = LoweringSession::new();

    let frag = lower_expr(&arena, &mut session, access, ExprContext::Right).unwrap();
    assert_eq!(
        frag,
        Fragment::call(
            RuntimeFn::Deref { safe: false },
            vec![scope_find("a"), Fragment::string("b")],
        )
    );
}

#[test]
fn plain_assignment_resolves_then_assigns() {
    let mut arena = NodeArena::new("x = 1");
    let x = arena.add_ident("x", Span::new(0, 1));
    let one = arena.add_number(1.0, Span::new(4, 5));
    let assign = assignment(&mut arena, x, AssignOp::Assign, one);
    let mut session = LoweringSession::new();

    let frag = lower_expr(&arena, &mut session, assign, ExprContext::None).unwrap();
    assert_eq!(
        frag,
        Fragment::call(
            RuntimeFn::ScopeAssign,
            vec![
                Fragment::name("context"),
                Fragment::string("x"),
                Fragment::Number(1.0),
            ],
        )
    );
}

#[test]
fn declaring_assignment_makes_a_local_binding() {
    let mut arena = NodeArena::new("var x = 1");
    let x = arena.add_ident("x", Span::new(4, 5));
    let one = arena.add_number(1.0, Span::new(8, 9));
    let assign = arena.add(
        NodeKind::Assignment {
            target: x,
            op: AssignOp::Assign,
            value: one,
            declares_local: true,
        },
        Span::EMPTY,
    );
    let mut session = LoweringSession::new();

    let frag = lower_expr(&arena, &mut session, assign, ExprContext::None).unwrap();
    match frag {
        Fragment::RuntimeCall { func, .. } => assert_eq!(func, RuntimeFn::LocalAssign),
        other => panic!("unexpected fragment {other:?}"),
    }
}

#[test]
fn deep_assignment_is_one_deep_set_with_full_path() {
    let mut arena = NodeArena::new("a.b.c = v");
    let a = arena.add_ident("a", Span::new(0, 1));
    let ab = member(&mut arena, a, "b", false);
    let abc = member(&mut arena, ab, "c", false);
    let v = arena.add_ident("v", Span::new(8, 9));
    let assign = assignment(&mut arena, abc, AssignOp::Assign, v);
    let mut session = LoweringSession::new();

    let frag = lower_expr(&arena, &mut session, assign, ExprContext::None).unwrap();
    assert_eq!(
        frag,
        Fragment::call(
            RuntimeFn::DeepSet,
            vec![
                scope_find("a"),
                Fragment::Array(vec![Fragment::string("b"), Fragment::string("c")]),
                scope_find("v"),
            ],
        )
    );

    // Never a read-then-write pair: no dereference of the intermediate hop.
    let derefs = frag.count_matching(|f| {
        matches!(
            f,
            Fragment::RuntimeCall {
                func: RuntimeFn::Deref { .. },
                ..
            }
        )
    });
    assert_eq!(derefs, 0);
}

#[test]
fn single_hop_assignment_uses_plain_set() {
    let mut arena = NodeArena::new("a.b = 2");
    let a = arena.add_ident("a", Span::new(0, 1));
    let ab = member(&mut arena, a, "b", false);
    let two = arena.add_number(2.0, Span::new(6, 7));
    let assign = assignment(&mut arena, ab, AssignOp::Assign, two);
    let mut session = LoweringSession::new();

    let frag = lower_expr(&arena, &mut session, assign, ExprContext::None).unwrap();
    assert_eq!(
        frag,
        Fragment::call(
            RuntimeFn::Set,
            vec![
                scope_find("a"),
                Fragment::string("b"),
                Fragment::Number(2.0),
            ],
        )
    );
}

#[test]
fn compound_assignment_evaluates_target_base_once() {
    let mut arena = NodeArena::new("expr().x += 1");
    let callee = arena.add(
        NodeKind::FunctionCall {
            name: "expr".to_string(),
            args: NodeList::empty(),
        },
        Span::new(0, 6),
    );
    let target = member(&mut arena, callee, "x", false);
    let one = arena.add_number(1.0, Span::new(12, 13));
    let assign = assignment(&mut arena, target, AssignOp::AddAssign, one);
    let mut session = LoweringSession::new();

    let frag = lower_expr(&arena, &mut session, assign, ExprContext::None).unwrap();
    match &frag {
        Fragment::RuntimeCall { func, args } => {
            assert_eq!(*func, RuntimeFn::Compound("Plus"));
            assert_eq!(args.len(), 3);
            assert_eq!(args[1], Fragment::string("x"));
        }
        other => panic!("unexpected fragment {other:?}"),
    }
    let callee_evals = frag.count_matching(|f| {
        matches!(
            f,
            Fragment::RuntimeCall {
                func: RuntimeFn::CallFunction,
                ..
            }
        )
    });
    assert_eq!(callee_evals, 1);
}

#[test]
fn compound_operators_map_to_runtime_names() {
    let table = [
        (AssignOp::AddAssign, "Plus"),
        (AssignOp::SubAssign, "Minus"),
        (AssignOp::MulAssign, "Multiply"),
        (AssignOp::DivAssign, "Divide"),
        (AssignOp::ModAssign, "Modulus"),
        (AssignOp::ConcatAssign, "Concat"),
    ];
    for (op, expected) in table {
        let mut arena = NodeArena::new("x ?= 1");
        let x = arena.add_ident("x", Span::new(0, 1));
        let one = arena.add_number(1.0, Span::new(5, 6));
        let assign = assignment(&mut arena, x, op, one);
        let mut session = LoweringSession::new();
        let frag = lower_expr(&arena, &mut session, assign, ExprContext::None).unwrap();
        match frag {
            Fragment::RuntimeCall {
                func: RuntimeFn::Compound(name),
                ..
            } => assert_eq!(name, expected),
            other => panic!("unexpected fragment {other:?}"),
        }
    }
}

#[test]
fn literal_assignment_target_is_rejected() {
    let mut arena = NodeArena::new("1 = x");
    let one = arena.add_number(1.0, Span::new(0, 1));
    let x = arena.add_ident("x", Span::new(4, 5));
    let assign = assignment(&mut arena, one, AssignOp::Assign, x);
    let mut session = LoweringSession::new();

    let err = lower_expr(&arena, &mut session, assign, ExprContext::None).unwrap_err();
    assert!(matches!(
        err.kind,
        LowerErrorKind::UnsupportedAssignTarget { kind: "NumberLit" }
    ));
}

#[test]
fn increment_resolves_an_addressable_location() {
    let mut arena = NodeArena::new("a.b++");
    let a = arena.add_ident("a", Span::new(0, 1));
    let ab = member(&mut arena, a, "b", false);
    let incr = arena.add(
        NodeKind::IncrDecr {
            op: IncrDecrOp::Increment,
            operand: ab,
            prefix: false,
        },
        Span::new(0, 5),
    );
    let mut session = LoweringSession::new();

    let frag = lower_expr(&arena, &mut session, incr, ExprContext::None).unwrap();
    assert_eq!(
        frag,
        Fragment::call(
            RuntimeFn::Increment { post: true },
            vec![scope_find("a"), Fragment::string("b")],
        )
    );
}

#[test]
fn literal_increment_folds() {
    let mut arena = NodeArena::new("5++ 5--");
    let five = arena.add_number(5.0, Span::new(0, 1));
    let incr = arena.add(
        NodeKind::IncrDecr {
            op: IncrDecrOp::Increment,
            operand: five,
            prefix: true,
        },
        Span::EMPTY,
    );
    let five2 = arena.add_number(5.0, Span::new(4, 5));
    let decr = arena.add(
        NodeKind::IncrDecr {
            op: IncrDecrOp::Decrement,
            operand: five2,
            prefix: true,
        },
        Span::EMPTY,
    );
    let mut session = LoweringSession::new();

    let folded = lower_expr(&arena, &mut session, incr, ExprContext::None).unwrap();
    assert_eq!(folded, Fragment::Number(5.0));

    let negated = lower_expr(&arena, &mut session, decr, ExprContext::None).unwrap();
    assert_eq!(
        negated,
        Fragment::call(RuntimeFn::Operator("Negate"), vec![Fragment::Number(5.0)])
    );
}

#[test]
fn increment_of_an_operation_is_rejected() {
    let mut arena = NodeArena::new("(a + b)++");
    let a = arena.add_ident("a", Span::new(1, 2));
    let b = arena.add_ident("b", Span::new(5, 6));
    let sum = arena.add(
        NodeKind::Binary {
            op: BinaryOp::Plus,
            left: a,
            right: b,
        },
        Span::new(1, 6),
    );
    let incr = arena.add(
        NodeKind::IncrDecr {
            op: IncrDecrOp::Increment,
            operand: sum,
            prefix: false,
        },
        Span::new(0, 9),
    );
    let mut session = LoweringSession::new();

    let err = lower_expr(&arena, &mut session, incr, ExprContext::None).unwrap_err();
    assert!(matches!(
        err.kind,
        LowerErrorKind::BadIncrementOperand { kind: "Binary" }
    ));
}
