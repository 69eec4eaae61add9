//! Scope and access/assignment lowering.
//!
//! Identifiers are dynamic keys resolved against the scope chain at runtime,
//! not fixed storage slots. A bare-identifier read lowers to one
//! `scope.find` call; a write to one `scope.assign`. Access chains lower to
//! one `runtime.deref` call per hop, nested innermost-first; a safe hop
//! anywhere in a chain makes every hop of that chain safe, so an absent
//! value short-circuits the whole tail.
//!
//! Assignment targets are addressed, never read-then-written: compound
//! assignment and increment/decrement resolve the target to an assignable
//! location (base + final key) exactly once, and deep paths collapse into a
//! single `runtime.deepSet` call carrying the root and the full key path.

use crate::engine::lower_expr;
use crate::error::{LowerError, LowerErrorKind, LowerResult};
use crate::ir::{Fragment, RuntimeFn};
use crate::session::{ExprContext, LoweringSession};
use cinder_ast::{AssignOp, IncrDecrOp, NodeArena, NodeIndex, NodeKind};
use smallvec::SmallVec;

/// Runtime operation invoked by a compound assignment, read-modify-write in
/// one call. An operator missing from this table cannot be lowered.
fn compound_runtime_name(op: AssignOp) -> Option<&'static str> {
    match op {
        AssignOp::AddAssign => Some("Plus"),
        AssignOp::SubAssign => Some("Minus"),
        AssignOp::MulAssign => Some("Multiply"),
        AssignOp::DivAssign => Some("Divide"),
        AssignOp::ModAssign => Some("Modulus"),
        AssignOp::ConcatAssign => Some("Concat"),
        AssignOp::Assign => None,
    }
}

/// True when any hop of the access chain rooted at `idx` carries the safe
/// flag. Inner safety forces every outer hop safe.
pub(crate) fn chain_has_safe(arena: &NodeArena, start: NodeIndex) -> bool {
    let mut idx = start;
    loop {
        match arena.get(idx).map(|n| &n.kind) {
            Some(NodeKind::MemberAccess { base, safe, .. })
            | Some(NodeKind::IndexAccess { base, safe, .. }) => {
                if *safe {
                    return true;
                }
                idx = *base;
            }
            _ => return false,
        }
    }
}

fn is_access(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::MemberAccess { .. } | NodeKind::IndexAccess { .. }
    )
}

/// Lower a bare identifier under `ctx`.
pub(crate) fn lower_ident(
    session: &mut LoweringSession,
    name: &str,
    ctx: ExprContext,
) -> Fragment {
    session.record_key(name);
    match ctx {
        // Key position of a dereference: the literal name, no scope lookup.
        ExprContext::Dereferencing => Fragment::string(name),
        ExprContext::Left => {
            let context = session.context_name().to_string();
            Fragment::location(
                Fragment::call(
                    RuntimeFn::ScopeLocate,
                    vec![Fragment::name(context), Fragment::string(name)],
                ),
                Fragment::string(name),
            )
        }
        ExprContext::None | ExprContext::Right | ExprContext::Safe => {
            let context = session.context_name().to_string();
            Fragment::call(
                RuntimeFn::ScopeFind,
                vec![Fragment::name(context), Fragment::string(name)],
            )
        }
    }
}

/// Lower one access hop (member or index) as a read. `Left` callers go
/// through [`lower_location`] instead.
pub(crate) fn lower_access(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
    ctx: ExprContext,
) -> LowerResult<Fragment> {
    if ctx == ExprContext::Left {
        return lower_location(arena, session, idx);
    }
    match arena.kind(idx).clone() {
        NodeKind::MemberAccess { base, name, safe } => {
            let hop_safe = safe || ctx == ExprContext::Safe || chain_has_safe(arena, base);
            let base_ctx = if hop_safe {
                ExprContext::Safe
            } else {
                ExprContext::Right
            };
            let base_frag = lower_expr(arena, session, base, base_ctx)?;
            session.record_key(&name);
            Ok(Fragment::call(
                RuntimeFn::Deref { safe: hop_safe },
                vec![base_frag, Fragment::string(name)],
            ))
        }
        NodeKind::IndexAccess { base, index, safe } => {
            let hop_safe = safe || ctx == ExprContext::Safe || chain_has_safe(arena, base);
            let base_ctx = if hop_safe {
                ExprContext::Safe
            } else {
                ExprContext::Right
            };
            let base_frag = lower_expr(arena, session, base, base_ctx)?;
            let key = lower_expr(arena, session, index, ExprContext::Dereferencing)?;
            Ok(Fragment::call(
                RuntimeFn::Deref { safe: hop_safe },
                vec![base_frag, key],
            ))
        }
        other => Err(LowerError::at(
            LowerErrorKind::MisplacedNode {
                kind: other.kind_name(),
            },
            arena,
            idx,
        )),
    }
}

/// Resolve an assignment target to its addressable location: the
/// scope-or-object holding the final key, plus that key. The base is lowered
/// exactly once; callers that both read and write (compound assignment,
/// increment/decrement) hand the location to a single runtime call.
pub(crate) fn lower_location(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    match arena.kind(idx).clone() {
        NodeKind::Ident { name } => Ok(lower_ident(session, &name, ExprContext::Left)),
        NodeKind::MemberAccess { base, name, .. } => {
            let base_frag = lower_expr(arena, session, base, ExprContext::Right)?;
            session.record_key(&name);
            Ok(Fragment::location(base_frag, Fragment::string(name)))
        }
        NodeKind::IndexAccess { base, index, .. } => {
            let base_frag = lower_expr(arena, session, base, ExprContext::Right)?;
            let key = lower_expr(arena, session, index, ExprContext::Dereferencing)?;
            Ok(Fragment::location(base_frag, key))
        }
        other => Err(LowerError::at(
            LowerErrorKind::UnsupportedAssignTarget {
                kind: other.kind_name(),
            },
            arena,
            idx,
        )),
    }
}

/// Walk an access chain down to its non-access root, collecting the key of
/// every hop in path order. Returns the lowered root.
fn collect_path(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
    keys: &mut SmallVec<[Fragment; 4]>,
) -> LowerResult<Fragment> {
    match arena.kind(idx).clone() {
        NodeKind::MemberAccess { base, name, .. } => {
            let root = collect_path(arena, session, base, keys)?;
            session.record_key(&name);
            keys.push(Fragment::string(name));
            Ok(root)
        }
        NodeKind::IndexAccess { base, index, .. } => {
            let root = collect_path(arena, session, base, keys)?;
            let key = lower_expr(arena, session, index, ExprContext::Dereferencing)?;
            keys.push(key);
            Ok(root)
        }
        _ => lower_expr(arena, session, idx, ExprContext::Right),
    }
}

/// Assign an already-lowered value into `target`.
///
/// Identifiers resolve-and-assign through the scope chain (or declare a new
/// local binding); single-hop accesses write through `runtime.set`; deeper
/// paths emit one `runtime.deepSet` so missing intermediate containers are
/// created by the runtime, never read here.
pub(crate) fn assign_value(
    arena: &NodeArena,
    session: &mut LoweringSession,
    target: NodeIndex,
    value: Fragment,
    declares_local: bool,
) -> LowerResult<Fragment> {
    match arena.kind(target).clone() {
        NodeKind::Ident { name } => {
            session.record_key(&name);
            let context = session.context_name().to_string();
            let func = if declares_local {
                RuntimeFn::LocalAssign
            } else {
                RuntimeFn::ScopeAssign
            };
            Ok(Fragment::call(
                func,
                vec![Fragment::name(context), Fragment::string(name), value],
            ))
        }
        NodeKind::MemberAccess { base, name, .. } if !is_access(arena.kind(base)) => {
            let base_frag = lower_expr(arena, session, base, ExprContext::Right)?;
            session.record_key(&name);
            Ok(Fragment::call(
                RuntimeFn::Set,
                vec![base_frag, Fragment::string(name), value],
            ))
        }
        NodeKind::IndexAccess { base, index, .. } if !is_access(arena.kind(base)) => {
            let base_frag = lower_expr(arena, session, base, ExprContext::Right)?;
            let key = lower_expr(arena, session, index, ExprContext::Dereferencing)?;
            Ok(Fragment::call(
                RuntimeFn::Set,
                vec![base_frag, key, value],
            ))
        }
        NodeKind::MemberAccess { base, name, .. } => {
            let mut keys = SmallVec::new();
            let root = collect_path(arena, session, base, &mut keys)?;
            session.record_key(&name);
            keys.push(Fragment::string(name));
            Ok(Fragment::call(
                RuntimeFn::DeepSet,
                vec![root, Fragment::Array(keys.into_vec()), value],
            ))
        }
        NodeKind::IndexAccess { base, index, .. } => {
            let mut keys = SmallVec::new();
            let root = collect_path(arena, session, base, &mut keys)?;
            let key = lower_expr(arena, session, index, ExprContext::Dereferencing)?;
            keys.push(key);
            Ok(Fragment::call(
                RuntimeFn::DeepSet,
                vec![root, Fragment::Array(keys.into_vec()), value],
            ))
        }
        other => Err(LowerError::at(
            LowerErrorKind::UnsupportedAssignTarget {
                kind: other.kind_name(),
            },
            arena,
            target,
        )),
    }
}

/// Lower an assignment node, plain or compound.
pub(crate) fn lower_assignment(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    let NodeKind::Assignment {
        target,
        op,
        value,
        declares_local,
    } = arena.kind(idx).clone()
    else {
        return Err(LowerError::at(
            LowerErrorKind::MisplacedNode {
                kind: arena.kind(idx).kind_name(),
            },
            arena,
            idx,
        ));
    };

    let value_frag = lower_expr(arena, session, value, ExprContext::Right)?;

    if !op.is_compound() {
        return assign_value(arena, session, target, value_frag, declares_local);
    }

    let op_name = compound_runtime_name(op).ok_or_else(|| {
        LowerError::at(
            LowerErrorKind::UnknownOperator {
                operator: op.symbol().to_string(),
            },
            arena,
            idx,
        )
    })?;

    // Resolve the target location once; the runtime performs the
    // read-modify-write in a single call.
    match lower_location(arena, session, target)? {
        Fragment::Location { base, key } => Ok(Fragment::call(
            RuntimeFn::Compound(op_name),
            vec![*base, *key, value_frag],
        )),
        _ => Err(LowerError::at(
            LowerErrorKind::UnsupportedAssignTarget {
                kind: arena.kind(target).kind_name(),
            },
            arena,
            target,
        )),
    }
}

/// Lower `++`/`--`, prefix or postfix.
pub(crate) fn lower_incr_decr(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    let NodeKind::IncrDecr {
        op,
        operand,
        prefix,
    } = arena.kind(idx).clone()
    else {
        return Err(LowerError::at(
            LowerErrorKind::MisplacedNode {
                kind: arena.kind(idx).kind_name(),
            },
            arena,
            idx,
        ));
    };

    match arena.kind(operand) {
        // Literals have no location to write back to; fold instead.
        NodeKind::NumberLit { .. }
        | NodeKind::StringLit { .. }
        | NodeKind::BoolLit { .. }
        | NodeKind::NullLit => {
            let operand_frag = lower_expr(arena, session, operand, ExprContext::Right)?;
            match op {
                IncrDecrOp::Increment => Ok(operand_frag),
                IncrDecrOp::Decrement => Ok(Fragment::call(
                    RuntimeFn::Operator("Negate"),
                    vec![operand_frag],
                )),
            }
        }
        NodeKind::Ident { .. } | NodeKind::MemberAccess { .. } | NodeKind::IndexAccess { .. } => {
            match lower_location(arena, session, operand)? {
                Fragment::Location { base, key } => {
                    let func = match op {
                        IncrDecrOp::Increment => RuntimeFn::Increment { post: !prefix },
                        IncrDecrOp::Decrement => RuntimeFn::Decrement { post: !prefix },
                    };
                    Ok(Fragment::call(func, vec![*base, *key]))
                }
                _ => Err(LowerError::at(
                    LowerErrorKind::BadIncrementOperand {
                        kind: arena.kind(operand).kind_name(),
                    },
                    arena,
                    operand,
                )),
            }
        }
        other => Err(LowerError::at(
            LowerErrorKind::BadIncrementOperand {
                kind: other.kind_name(),
            },
            arena,
            operand,
        )),
    }
}
