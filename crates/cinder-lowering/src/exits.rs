//! Control-flow exit resolution.
//!
//! `break`, `continue`, and `return` are lowered against the nearest
//! enclosing exit-relevant construct, found by walking parent links. Nearest
//! wins: a break inside a loop inside a component targets the loop. A
//! component body may run as an ordinary call several frames away from the
//! loop that invoked it, so exits that resolve to a component cannot jump
//! natively; they return a tagged body-result value that the body-execution
//! machinery re-dispatches.
//!
//! Function and closure boundaries stop the search for break/continue: a
//! loop outside the enclosing callable is not a valid target.

use crate::engine::lower_expr;
use crate::error::{LowerError, LowerErrorKind, LowerResult};
use crate::ir::{BodyResultKind, Fragment, RuntimeFn};
use crate::session::{ExprContext, LoweringSession};
use cinder_ast::{NodeArena, NodeIndex, NodeKind};

/// Where a break/continue resolved.
enum ExitTarget {
    /// A native loop; carries the loop node and whether a lowered switch
    /// lies between the exit and the loop (a native unlabeled jump would
    /// then bind to the switch's do/while wrapper instead).
    Loop {
        node: NodeIndex,
        crossed_switch: bool,
    },
    /// The do/while(false) wrapper a switch lowers into (unlabeled break
    /// only).
    Switch,
    /// A component body; the exit threads back as a body-result value.
    Component,
}

/// Walk ancestors of `idx` resolving a break or continue. `switch_breaks`
/// is true for break (an enclosing switch absorbs it) and false for
/// continue (switches are transparent).
fn resolve_exit(
    arena: &NodeArena,
    idx: NodeIndex,
    label: Option<&str>,
    switch_breaks: bool,
) -> Option<ExitTarget> {
    let mut crossed_switch = false;
    let mut current = arena.get(idx)?.parent;
    while let Some(node) = arena.get(current) {
        match &node.kind {
            kind if kind.is_loop() => {
                if label.is_none() || kind.loop_label() == label {
                    return Some(ExitTarget::Loop {
                        node: current,
                        crossed_switch,
                    });
                }
            }
            NodeKind::Switch { .. } => {
                if switch_breaks && label.is_none() {
                    return Some(ExitTarget::Switch);
                }
                crossed_switch = true;
            }
            NodeKind::ComponentBody { .. } => return Some(ExitTarget::Component),
            NodeKind::FunctionDecl { .. } | NodeKind::Closure { .. } => return None,
            _ => {}
        }
        current = node.parent;
    }
    None
}

/// True when a component body encloses the loop within the same callable
/// frame; such a component observes breaks through the per-loop flag.
fn component_observes_loop(arena: &NodeArena, loop_idx: NodeIndex) -> bool {
    let mut current = match arena.get(loop_idx) {
        Some(node) => node.parent,
        None => return false,
    };
    while let Some(node) = arena.get(current) {
        match &node.kind {
            NodeKind::ComponentBody { .. } => return true,
            NodeKind::FunctionDecl { .. } | NodeKind::Closure { .. } => return false,
            _ => {}
        }
        current = node.parent;
    }
    false
}

fn body_result(kind: BodyResultKind, payload: Fragment) -> Fragment {
    Fragment::ret(Some(Fragment::call(
        RuntimeFn::BodyResult(kind),
        vec![payload],
    )))
}

fn label_payload(label: Option<&str>) -> Fragment {
    match label {
        Some(label) => Fragment::string(label),
        None => Fragment::Null,
    }
}

pub(crate) fn lower_break(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    let NodeKind::Break { label } = arena.kind(idx).clone() else {
        return Err(LowerError::at(
            LowerErrorKind::MisplacedNode {
                kind: arena.kind(idx).kind_name(),
            },
            arena,
            idx,
        ));
    };

    match resolve_exit(arena, idx, label.as_deref(), true) {
        Some(ExitTarget::Switch) => Ok(Fragment::Break(None)),
        Some(ExitTarget::Loop { node, .. }) => {
            // A labeled break names its loop directly; the loop transformer
            // wraps labeled loops in a Labeled fragment.
            let native = Fragment::Break(label.clone());
            if component_observes_loop(arena, node) {
                if let Some(flag) = session.use_break_flag(node) {
                    return Ok(Fragment::Sequence(vec![
                        Fragment::assign(flag, Fragment::Bool(true)),
                        native,
                    ]));
                }
            }
            Ok(native)
        }
        Some(ExitTarget::Component) => Ok(body_result(
            BodyResultKind::Break,
            label_payload(label.as_deref()),
        )),
        None => Err(LowerError::at(
            LowerErrorKind::ExitOutsideConstruct { exit: "break" },
            arena,
            idx,
        )),
    }
}

pub(crate) fn lower_continue(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    let NodeKind::Continue { label } = arena.kind(idx).clone() else {
        return Err(LowerError::at(
            LowerErrorKind::MisplacedNode {
                kind: arena.kind(idx).kind_name(),
            },
            arena,
            idx,
        ));
    };

    match resolve_exit(arena, idx, label.as_deref(), false) {
        Some(ExitTarget::Loop {
            node,
            crossed_switch,
        }) => {
            let emitted = if label.is_some() {
                label
            } else if crossed_switch {
                // An unlabeled native continue would target the switch's
                // do/while wrapper; name the loop explicitly.
                session.use_loop_label(node)
            } else {
                None
            };
            Ok(Fragment::Continue(emitted))
        }
        Some(ExitTarget::Component) => Ok(body_result(
            BodyResultKind::Continue,
            label_payload(label.as_deref()),
        )),
        Some(ExitTarget::Switch) | None => Err(LowerError::at(
            LowerErrorKind::ExitOutsideConstruct { exit: "continue" },
            arena,
            idx,
        )),
    }
}

pub(crate) fn lower_return(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    let NodeKind::Return { value } = arena.kind(idx).clone() else {
        return Err(LowerError::at(
            LowerErrorKind::MisplacedNode {
                kind: arena.kind(idx).kind_name(),
            },
            arena,
            idx,
        ));
    };

    let value_frag = if value.is_some() {
        Some(lower_expr(arena, session, value, ExprContext::Right)?)
    } else {
        None
    };

    // Nearest callable-or-component ancestor decides the shape; loops are
    // transparent to return.
    let mut current = arena.get(idx).map(|n| n.parent).unwrap_or(NodeIndex::NONE);
    while let Some(node) = arena.get(current) {
        match &node.kind {
            NodeKind::FunctionDecl { .. } | NodeKind::Closure { .. } => {
                return Ok(Fragment::Return(value_frag.map(Box::new)));
            }
            NodeKind::ComponentBody { .. } => {
                return Ok(body_result(
                    BodyResultKind::Return,
                    value_frag.unwrap_or(Fragment::Null),
                ));
            }
            _ => {}
        }
        current = node.parent;
    }

    // The unit body is itself a callable frame; a top-level return exits it.
    Ok(Fragment::Return(value_frag.map(Box::new)))
}
