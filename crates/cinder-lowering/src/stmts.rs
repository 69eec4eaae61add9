//! Loop and switch lowering.
//!
//! Switches lower into a single-iteration do/while(false) acting as a
//! breakable block: the subject is evaluated once into a temporary and a
//! sticky case-entered flag implements fallthrough without re-testing
//! later conditions. Collection for-in lowers to the iterator protocol with
//! position-tracking registration around tabular sources; indexed for runs
//! its step in a finally-guarded position so it executes however the body
//! terminates.

use crate::access::assign_value;
use crate::engine::{lower_expr, lower_stmt};
use crate::error::{LowerError, LowerErrorKind, LowerResult};
use crate::ir::{Fragment, RuntimeFn};
use crate::session::{ExprContext, LoopFrame, LoweringSession};
use cinder_ast::{NodeArena, NodeIndex, NodeKind};

fn misplaced(arena: &NodeArena, idx: NodeIndex) -> LowerError {
    LowerError::at(
        LowerErrorKind::MisplacedNode {
            kind: arena.kind(idx).kind_name(),
        },
        arena,
        idx,
    )
}

/// Wrap a lowered loop in its labels: the source label when present,
/// otherwise the synthetic native label if an exit needed one.
fn apply_label(loop_frag: Fragment, label: Option<String>, frame: Option<&LoopFrame>) -> Fragment {
    if let Some(label) = label {
        return Fragment::labeled(label, loop_frag);
    }
    if let Some(frame) = frame {
        if frame.native_label_used {
            return Fragment::labeled(frame.native_label.clone(), loop_frag);
        }
    }
    loop_frag
}

/// Prepend the break-detection flag declaration when an exit set it.
fn apply_break_flag(frag: Fragment, frame: Option<&LoopFrame>) -> Fragment {
    match frame {
        Some(frame) if frame.break_flag_used => Fragment::Sequence(vec![
            Fragment::var_decl(frame.break_flag.clone(), Some(Fragment::Bool(false))),
            frag,
        ]),
        _ => frag,
    }
}

pub(crate) fn lower_while(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    let NodeKind::While { cond, body, label } = arena.kind(idx).clone() else {
        return Err(misplaced(arena, idx));
    };
    let names = session.next_loop_names();
    let cond_frag = lower_expr(arena, session, cond, ExprContext::Right)?;

    session.push_loop_frame(idx, label.clone(), &names);
    let body_result = lower_stmt(arena, session, body);
    let frame = session.pop_loop_frame();
    let body_frag = body_result?;

    let loop_frag = apply_label(
        Fragment::while_loop(cond_frag, body_frag),
        label,
        frame.as_ref(),
    );
    Ok(apply_break_flag(loop_frag, frame.as_ref()))
}

pub(crate) fn lower_do_while(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    let NodeKind::DoWhile { body, cond, label } = arena.kind(idx).clone() else {
        return Err(misplaced(arena, idx));
    };
    let names = session.next_loop_names();

    session.push_loop_frame(idx, label.clone(), &names);
    let body_result = lower_stmt(arena, session, body);
    let frame = session.pop_loop_frame();
    let body_frag = body_result?;

    let cond_frag = lower_expr(arena, session, cond, ExprContext::Right)?;
    let loop_frag = apply_label(
        Fragment::do_while(body_frag, cond_frag),
        label,
        frame.as_ref(),
    );
    Ok(apply_break_flag(loop_frag, frame.as_ref()))
}

pub(crate) fn lower_for_indexed(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    let NodeKind::ForIndexed {
        init,
        cond,
        step,
        body,
        label,
    } = arena.kind(idx).clone()
    else {
        return Err(misplaced(arena, idx));
    };
    let names = session.next_loop_names();

    let init_frag = if init.is_some() {
        Some(Fragment::expr_stmt(lower_expr(
            arena,
            session,
            init,
            ExprContext::None,
        )?))
    } else {
        None
    };
    let cond_frag = if cond.is_some() {
        lower_expr(arena, session, cond, ExprContext::Right)?
    } else {
        Fragment::Bool(true)
    };
    let step_frag = if step.is_some() {
        Some(Fragment::expr_stmt(lower_expr(
            arena,
            session,
            step,
            ExprContext::None,
        )?))
    } else {
        None
    };

    session.push_loop_frame(idx, label.clone(), &names);
    let body_result = lower_stmt(arena, session, body);
    let frame = session.pop_loop_frame();
    let body_frag = body_result?;

    // The step runs on every iteration regardless of how the body exits.
    let guarded = match step_frag {
        Some(step) => Fragment::try_finally(body_frag, step),
        None => body_frag,
    };
    let loop_frag = apply_label(
        Fragment::while_loop(cond_frag, guarded),
        label,
        frame.as_ref(),
    );
    let loop_frag = apply_break_flag(loop_frag, frame.as_ref());

    match init_frag {
        Some(init) => Ok(Fragment::Sequence(vec![init, loop_frag])),
        None => Ok(loop_frag),
    }
}

pub(crate) fn lower_for_in(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    let NodeKind::ForIn {
        var,
        source,
        body,
        declares_local,
        label,
    } = arena.kind(idx).clone()
    else {
        return Err(misplaced(arena, idx));
    };
    let names = session.next_loop_names();
    let source_frag = lower_expr(arena, session, source, ExprContext::Right)?;

    session.push_loop_frame(idx, label.clone(), &names);
    let binding_result = assign_value(
        arena,
        session,
        var,
        Fragment::call(RuntimeFn::IterNext, vec![Fragment::name(&names.iter)]),
        declares_local,
    );
    let body_result = lower_stmt(arena, session, body);
    let frame = session.pop_loop_frame();
    let binding = binding_result?;
    let body_frag = body_result?;

    let loop_body = Fragment::Block(vec![
        Fragment::expr_stmt(binding),
        body_frag,
        // Tabular sources track the current row position.
        Fragment::if_then(
            Fragment::name(&names.query),
            Fragment::expr_stmt(Fragment::call(
                RuntimeFn::QueryIncrement,
                vec![Fragment::name(&names.source)],
            )),
        ),
    ]);
    let loop_frag = apply_label(
        Fragment::while_loop(
            Fragment::call(RuntimeFn::IterHasNext, vec![Fragment::name(&names.iter)]),
            loop_body,
        ),
        label,
        frame.as_ref(),
    );
    // Unregistration must run however the loop exits.
    let guarded = Fragment::try_finally(
        loop_frag,
        Fragment::if_then(
            Fragment::name(&names.query),
            Fragment::expr_stmt(Fragment::call(
                RuntimeFn::QueryUnregister,
                vec![Fragment::name(&names.source)],
            )),
        ),
    );

    let mut parts = vec![
        Fragment::var_decl(&names.source, Some(source_frag)),
        Fragment::var_decl(
            &names.query,
            Some(Fragment::call(
                RuntimeFn::IsQuery,
                vec![Fragment::name(&names.source)],
            )),
        ),
        Fragment::if_then(
            Fragment::name(&names.query),
            Fragment::expr_stmt(Fragment::call(
                RuntimeFn::QueryRegister,
                vec![Fragment::name(&names.source)],
            )),
        ),
        Fragment::var_decl(
            &names.iter,
            Some(Fragment::call(
                RuntimeFn::IterOf,
                vec![Fragment::name(&names.source)],
            )),
        ),
    ];
    if let Some(frame) = frame.as_ref() {
        if frame.break_flag_used {
            parts.push(Fragment::var_decl(
                frame.break_flag.clone(),
                Some(Fragment::Bool(false)),
            ));
        }
    }
    parts.push(guarded);
    Ok(Fragment::Sequence(parts))
}

pub(crate) fn lower_switch(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    let NodeKind::Switch { subject, members } = arena.kind(idx).clone() else {
        return Err(misplaced(arena, idx));
    };
    let names = session.next_switch_names();
    let subject_frag = lower_expr(arena, session, subject, ExprContext::Right)?;

    // Validate the member list up front: only case clauses, at most one
    // default.
    let mut default_case = None;
    let mut cases = Vec::new();
    for member in members.iter() {
        match arena.kind(member) {
            NodeKind::Case { value, .. } => {
                if value.is_none() {
                    if default_case.is_some() {
                        return Err(LowerError::at(
                            LowerErrorKind::DuplicateDefaultCase,
                            arena,
                            member,
                        ));
                    }
                    default_case = Some(member);
                } else {
                    cases.push(member);
                }
            }
            other => {
                return Err(LowerError::at(
                    LowerErrorKind::InvalidSwitchMember {
                        kind: other.kind_name(),
                    },
                    arena,
                    member,
                ));
            }
        }
    }

    let mut body_parts = Vec::new();
    for case in cases {
        let NodeKind::Case {
            value,
            delimiter,
            body,
        } = arena.kind(case).clone()
        else {
            return Err(misplaced(arena, case));
        };
        let value_frag = lower_expr(arena, session, value, ExprContext::Right)?;
        let match_call = match delimiter {
            Some(delimiter) => Fragment::call(
                RuntimeFn::CaseMatchList,
                vec![
                    Fragment::name(&names.subject),
                    value_frag,
                    Fragment::string(delimiter),
                ],
            ),
            None => Fragment::call(
                RuntimeFn::CaseMatch,
                vec![Fragment::name(&names.subject), value_frag],
            ),
        };
        // Once any case has matched, the sticky flag carries execution into
        // every following case body until a break.
        let cond = Fragment::logical_or(Fragment::name(&names.entered), match_call);
        let mut then_parts = vec![Fragment::assign(&names.entered, Fragment::Bool(true))];
        for stmt in body.iter() {
            then_parts.push(lower_stmt(arena, session, stmt)?);
        }
        body_parts.push(Fragment::if_then(cond, Fragment::Block(then_parts)));
    }

    // The default body runs unconditionally after every explicit case,
    // wherever it appeared in source order.
    if let Some(default_case) = default_case {
        let NodeKind::Case { body, .. } = arena.kind(default_case).clone() else {
            return Err(misplaced(arena, default_case));
        };
        for stmt in body.iter() {
            body_parts.push(lower_stmt(arena, session, stmt)?);
        }
    }

    Ok(Fragment::Sequence(vec![
        Fragment::var_decl(&names.subject, Some(subject_frag)),
        Fragment::var_decl(&names.entered, Some(Fragment::Bool(false))),
        Fragment::do_while(Fragment::Block(body_parts), Fragment::Bool(false)),
    ]))
}
