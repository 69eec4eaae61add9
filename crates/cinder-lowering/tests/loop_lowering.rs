//! Loop lowering: iterator protocol, tabular bookkeeping, finally-guarded
//! steps, synthetic name sequencing.

use cinder_ast::{
    AssignOp, CompareOp, IncrDecrOp, NodeArena, NodeIndex, NodeKind,
};
use cinder_common::Span;
use cinder_lowering::{
    ExprContext, Fragment, LoweringSession, RuntimeFn, lower_expr, lower_stmt,
};

fn for_in(
    arena: &mut NodeArena,
    var_name: &str,
    source_name: &str,
    body: Vec<NodeIndex>,
) -> NodeIndex {
    let var = arena.add_ident(var_name, Span::EMPTY);
    let source = arena.add_ident(source_name, Span::EMPTY);
    let body = arena.add_block(body, Span::EMPTY);
    arena.add(
        NodeKind::ForIn {
            var,
            source,
            body,
            declares_local: false,
            label: None,
        },
        Span::EMPTY,
    )
}

fn count_calls(frag: &Fragment, func: RuntimeFn) -> usize {
    frag.count_matching(|f| matches!(f, Fragment::RuntimeCall { func: got, .. } if *got == func))
}

#[test]
fn for_in_carries_tabular_bookkeeping() {
    let mut arena = NodeArena::new("");
    let stmt = {
        let x = arena.add_ident("row", Span::EMPTY);
        let read = arena.add_expr_stmt(x, Span::EMPTY);
        read
    };
    let loop_node = for_in(&mut arena, "row", "rows", vec![stmt]);

    let mut session = LoweringSession::new();
    let frag = lower_stmt(&arena, &mut session, loop_node).unwrap();

    let Fragment::Sequence(parts) = &frag else {
        panic!("expected sequence, got {frag:?}");
    };
    // Source temp, tabular test, registration, iterator, guarded loop.
    assert_eq!(parts.len(), 5);
    assert_eq!(
        parts[0],
        Fragment::var_decl(
            "_src1",
            Some(Fragment::call(
                RuntimeFn::ScopeFind,
                vec![Fragment::name("context"), Fragment::string("rows")],
            )),
        )
    );
    assert_eq!(
        parts[1],
        Fragment::var_decl(
            "_qry1",
            Some(Fragment::call(
                RuntimeFn::IsQuery,
                vec![Fragment::name("_src1")],
            )),
        )
    );
    assert!(matches!(parts[2], Fragment::If { .. }));
    assert_eq!(
        parts[3],
        Fragment::var_decl(
            "_it1",
            Some(Fragment::call(
                RuntimeFn::IterOf,
                vec![Fragment::name("_src1")],
            )),
        )
    );

    // Unregistration runs in the guaranteed-execution position.
    let Fragment::TryFinally { body, finalizer } = &parts[4] else {
        panic!("expected try/finally, got {:?}", parts[4]);
    };
    assert_eq!(count_calls(finalizer, RuntimeFn::QueryUnregister), 1);

    // The loop itself: has-next condition, per-iteration binding first,
    // position increment last.
    let Fragment::While { cond, body } = body.as_ref() else {
        panic!("expected while");
    };
    assert_eq!(
        **cond,
        Fragment::call(RuntimeFn::IterHasNext, vec![Fragment::name("_it1")])
    );
    let Fragment::Block(stmts) = body.as_ref() else {
        panic!("expected block");
    };
    assert_eq!(
        stmts[0],
        Fragment::expr_stmt(Fragment::call(
            RuntimeFn::ScopeAssign,
            vec![
                Fragment::name("context"),
                Fragment::string("row"),
                Fragment::call(RuntimeFn::IterNext, vec![Fragment::name("_it1")]),
            ],
        ))
    );
    assert_eq!(
        count_calls(stmts.last().unwrap(), RuntimeFn::QueryIncrement),
        1
    );
    assert_eq!(count_calls(&frag, RuntimeFn::QueryRegister), 1);
}

#[test]
fn sibling_loops_get_distinct_temporaries() {
    let mut arena = NodeArena::new("");
    let first = for_in(&mut arena, "a", "xs", Vec::new());
    let second = for_in(&mut arena, "b", "ys", Vec::new());
    arena.add_script(vec![first, second], Span::EMPTY);

    let mut session = LoweringSession::new();
    let first_frag = lower_stmt(&arena, &mut session, first).unwrap();
    let second_frag = lower_stmt(&arena, &mut session, second).unwrap();

    let decl_names = |frag: &Fragment| {
        let mut names = Vec::new();
        frag.walk(&mut |f| {
            if let Fragment::VarDecl { name, .. } = f {
                names.push(name.clone());
            }
        });
        names
    };
    assert_eq!(decl_names(&first_frag), ["_src1", "_qry1", "_it1"]);
    assert_eq!(decl_names(&second_frag), ["_src2", "_qry2", "_it2"]);
}

#[test]
fn for_in_can_declare_a_local_binding() {
    let mut arena = NodeArena::new("");
    let var = arena.add_ident("row", Span::EMPTY);
    let source = arena.add_ident("rows", Span::EMPTY);
    let body = arena.add_block(Vec::new(), Span::EMPTY);
    let loop_node = arena.add(
        NodeKind::ForIn {
            var,
            source,
            body,
            declares_local: true,
            label: None,
        },
        Span::EMPTY,
    );

    let mut session = LoweringSession::new();
    let frag = lower_stmt(&arena, &mut session, loop_node).unwrap();
    assert_eq!(count_calls(&frag, RuntimeFn::LocalAssign), 1);
    assert_eq!(count_calls(&frag, RuntimeFn::ScopeAssign), 0);
}

#[test]
fn indexed_for_guards_the_step_with_finally() {
    // for (i = 1; i < 10; i++) { work(); }
    let mut arena = NodeArena::new("");
    let init = {
        let i = arena.add_ident("i", Span::EMPTY);
        let one = arena.add_number(1.0, Span::EMPTY);
        arena.add(
            NodeKind::Assignment {
                target: i,
                op: AssignOp::Assign,
                value: one,
                declares_local: false,
            },
            Span::EMPTY,
        )
    };
    let cond = {
        let i = arena.add_ident("i", Span::EMPTY);
        let ten = arena.add_number(10.0, Span::EMPTY);
        arena.add(
            NodeKind::Compare {
                op: CompareOp::Lt,
                left: i,
                right: ten,
            },
            Span::EMPTY,
        )
    };
    let step = {
        let i = arena.add_ident("i", Span::EMPTY);
        arena.add(
            NodeKind::IncrDecr {
                op: IncrDecrOp::Increment,
                operand: i,
                prefix: false,
            },
            Span::EMPTY,
        )
    };
    let body = {
        let call = arena.add(
            NodeKind::FunctionCall {
                name: "work".to_string(),
                args: cinder_ast::NodeList::empty(),
            },
            Span::EMPTY,
        );
        let stmt = arena.add_expr_stmt(call, Span::EMPTY);
        arena.add_block(vec![stmt], Span::EMPTY)
    };
    let loop_node = arena.add(
        NodeKind::ForIndexed {
            init,
            cond,
            step,
            body,
            label: None,
        },
        Span::EMPTY,
    );

    let mut session = LoweringSession::new();
    let frag = lower_stmt(&arena, &mut session, loop_node).unwrap();

    let Fragment::Sequence(parts) = &frag else {
        panic!("expected sequence, got {frag:?}");
    };
    assert_eq!(parts.len(), 2);
    assert!(matches!(parts[0], Fragment::ExprStmt(_)));

    let Fragment::While { body, .. } = &parts[1] else {
        panic!("expected while, got {:?}", parts[1]);
    };
    let Fragment::TryFinally { finalizer, .. } = body.as_ref() else {
        panic!("expected finally-guarded body");
    };
    assert_eq!(
        count_calls(finalizer, RuntimeFn::Increment { post: true }),
        1
    );
}

#[test]
fn indexed_for_defaults_missing_condition_to_true() {
    let mut arena = NodeArena::new("");
    let body = arena.add_block(Vec::new(), Span::EMPTY);
    let loop_node = arena.add(
        NodeKind::ForIndexed {
            init: NodeIndex::NONE,
            cond: NodeIndex::NONE,
            step: NodeIndex::NONE,
            body,
            label: None,
        },
        Span::EMPTY,
    );

    let mut session = LoweringSession::new();
    let frag = lower_stmt(&arena, &mut session, loop_node).unwrap();
    assert_eq!(
        frag,
        Fragment::while_loop(Fragment::Bool(true), Fragment::Block(Vec::new()))
    );
}

#[test]
fn do_while_keeps_body_before_condition() {
    let mut arena = NodeArena::new("");
    let body = arena.add_block(Vec::new(), Span::EMPTY);
    let cond = arena.add_bool(false, Span::EMPTY);
    let loop_node = arena.add(
        NodeKind::DoWhile {
            body,
            cond,
            label: None,
        },
        Span::EMPTY,
    );

    let mut session = LoweringSession::new();
    let frag = lower_stmt(&arena, &mut session, loop_node).unwrap();
    assert_eq!(
        frag,
        Fragment::do_while(Fragment::Block(Vec::new()), Fragment::Bool(false))
    );
}

#[test]
fn labeled_loop_is_wrapped_in_its_label() {
    let mut arena = NodeArena::new("");
    let body = arena.add_block(Vec::new(), Span::EMPTY);
    let cond = arena.add_bool(true, Span::EMPTY);
    let loop_node = arena.add(
        NodeKind::While {
            cond,
            body,
            label: Some("outer".to_string()),
        },
        Span::EMPTY,
    );

    let mut session = LoweringSession::new();
    let frag = lower_stmt(&arena, &mut session, loop_node).unwrap();
    assert_eq!(
        frag,
        Fragment::labeled(
            "outer",
            Fragment::while_loop(Fragment::Bool(true), Fragment::Block(Vec::new())),
        )
    );
}

#[test]
fn lowering_twice_is_deterministic() {
    let mut arena = NodeArena::new("");
    let stmt = {
        let row = arena.add_ident("row", Span::EMPTY);
        arena.add_expr_stmt(row, Span::EMPTY)
    };
    let loop_node = for_in(&mut arena, "row", "rows", vec![stmt]);

    let mut first_session = LoweringSession::new();
    let first = lower_stmt(&arena, &mut first_session, loop_node).unwrap();
    let mut second_session = LoweringSession::new();
    let second = lower_stmt(&arena, &mut second_session, loop_node).unwrap();
    assert_eq!(first, second);
}

#[test]
fn loop_condition_reads_are_plain_values() {
    let mut arena = NodeArena::new("");
    let cond = arena.add_ident("go", Span::EMPTY);
    let body = arena.add_block(Vec::new(), Span::EMPTY);
    let loop_node = arena.add(
        NodeKind::While {
            cond,
            body,
            label: None,
        },
        Span::EMPTY,
    );

    let mut session = LoweringSession::new();
    let frag = lower_stmt(&arena, &mut session, loop_node).unwrap();
    let mut expect_session = LoweringSession::new();
    let read = lower_expr(&arena, &mut expect_session, cond, ExprContext::Right).unwrap();
    assert_eq!(
        frag,
        Fragment::while_loop(read, Fragment::Block(Vec::new()))
    );
}
