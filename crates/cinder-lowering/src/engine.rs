//! The lowering dispatch.
//!
//! `lower_expr` and `lower_stmt` match exhaustively over [`NodeKind`] and
//! hand each kind to its transformer. Lowering is strict post-order: a
//! transformer lowers its children first and synthesizes the parent fragment
//! from the child fragments, so no transformer ever sees an un-lowered
//! child. The [`ExprContext`] a caller passes decides how the same node kind
//! lowers (value, assignment target, safe-navigation member, raw key).

use crate::access::{
    chain_has_safe, lower_access, lower_assignment, lower_ident, lower_incr_decr,
};
use crate::error::{LowerError, LowerErrorKind, LowerResult};
use crate::exits::{lower_break, lower_continue, lower_return};
use crate::ir::{Fragment, RuntimeFn};
use crate::session::{ExprContext, LoweringSession, NestedCallable};
use crate::stmts::{lower_do_while, lower_for_in, lower_for_indexed, lower_switch, lower_while};
use cinder_ast::{NodeArena, NodeIndex, NodeKind, NodeList};

fn misplaced(arena: &NodeArena, idx: NodeIndex) -> LowerError {
    LowerError::at(
        LowerErrorKind::MisplacedNode {
            kind: arena.kind(idx).kind_name(),
        },
        arena,
        idx,
    )
}

/// Lower one expression node under `ctx`.
pub fn lower_expr(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
    ctx: ExprContext,
) -> LowerResult<Fragment> {
    match arena.kind(idx).clone() {
        NodeKind::Ident { name } => Ok(lower_ident(session, &name, ctx)),

        NodeKind::MemberAccess { .. } | NodeKind::IndexAccess { .. } => {
            lower_access(arena, session, idx, ctx)
        }

        NodeKind::Binary { op, left, right } => {
            let left_frag = lower_expr(arena, session, left, ExprContext::Right)?;
            let right_frag = lower_expr(arena, session, right, ExprContext::Right)?;
            Ok(Fragment::call(
                RuntimeFn::Operator(op.name()),
                vec![left_frag, right_frag],
            ))
        }

        NodeKind::Compare { op, left, right } => {
            let left_frag = lower_expr(arena, session, left, ExprContext::Right)?;
            let right_frag = lower_expr(arena, session, right, ExprContext::Right)?;
            Ok(Fragment::call(
                RuntimeFn::Operator(op.name()),
                vec![left_frag, right_frag],
            ))
        }

        NodeKind::Unary { op, operand } => {
            let operand_frag = lower_expr(arena, session, operand, ExprContext::Right)?;
            Ok(Fragment::call(
                RuntimeFn::Operator(op.name()),
                vec![operand_frag],
            ))
        }

        NodeKind::IncrDecr { .. } => lower_incr_decr(arena, session, idx),

        NodeKind::Ternary {
            cond,
            then_value,
            else_value,
        } => {
            let cond_frag = lower_expr(arena, session, cond, ExprContext::Right)?;
            let then_frag = lower_expr(arena, session, then_value, ExprContext::Right)?;
            let else_frag = lower_expr(arena, session, else_value, ExprContext::Right)?;
            Ok(Fragment::ternary(cond_frag, then_frag, else_frag))
        }

        NodeKind::Assignment { .. } => lower_assignment(arena, session, idx),

        NodeKind::StringLit { value } => Ok(Fragment::Str(value)),
        NodeKind::NumberLit { value, .. } => Ok(Fragment::Number(value)),
        NodeKind::BoolLit { value } => Ok(Fragment::Bool(value)),
        NodeKind::NullLit => Ok(Fragment::Null),

        NodeKind::InterpString { parts } => {
            let mut args = Vec::with_capacity(parts.len());
            for part in parts.iter() {
                args.push(lower_expr(arena, session, part, ExprContext::Right)?);
            }
            Ok(Fragment::call(RuntimeFn::StrConcat, args))
        }

        NodeKind::ArrayLit { elements } => {
            let mut args = Vec::with_capacity(elements.len());
            for element in elements.iter() {
                args.push(lower_expr(arena, session, element, ExprContext::Right)?);
            }
            Ok(Fragment::call(RuntimeFn::ArrayNew, args))
        }

        NodeKind::StructLit {
            keys,
            values,
            ordered,
        } => {
            let mut args = Vec::with_capacity(keys.len() * 2);
            for (key, value) in keys.iter().zip(values.iter()) {
                // Bare-identifier keys denote literal names.
                args.push(lower_expr(arena, session, key, ExprContext::Dereferencing)?);
                args.push(lower_expr(arena, session, value, ExprContext::Right)?);
            }
            Ok(Fragment::call(RuntimeFn::StructNew { ordered }, args))
        }

        NodeKind::FunctionCall { name, args } => {
            let context = session.context_name().to_string();
            let args_frag = lower_args(arena, session, &args)?;
            Ok(Fragment::call(
                RuntimeFn::CallFunction,
                vec![
                    Fragment::name(context),
                    Fragment::string(name),
                    Fragment::Array(args_frag),
                ],
            ))
        }

        NodeKind::MethodCall {
            base,
            name,
            args,
            safe,
        } => {
            let hop_safe = safe || ctx == ExprContext::Safe || chain_has_safe(arena, base);
            let base_ctx = if hop_safe {
                ExprContext::Safe
            } else {
                ExprContext::Right
            };
            let base_frag = lower_expr(arena, session, base, base_ctx)?;
            let args_frag = lower_args(arena, session, &args)?;
            Ok(Fragment::call(
                RuntimeFn::CallMethod { safe: hop_safe },
                vec![
                    base_frag,
                    Fragment::string(name),
                    Fragment::Array(args_frag),
                ],
            ))
        }

        NodeKind::StaticCall {
            class_name,
            name,
            args,
        } => {
            let args_frag = lower_args(arena, session, &args)?;
            Ok(Fragment::call(
                RuntimeFn::CallStatic,
                vec![
                    Fragment::string(class_name),
                    Fragment::string(name),
                    Fragment::Array(args_frag),
                ],
            ))
        }

        NodeKind::DynamicCall { callee, args } => {
            let callee_frag = lower_expr(arena, session, callee, ExprContext::Right)?;
            let args_frag = lower_args(arena, session, &args)?;
            Ok(Fragment::call(
                RuntimeFn::CallDynamic,
                vec![callee_frag, Fragment::Array(args_frag)],
            ))
        }

        NodeKind::New { class_name, args } => {
            let class_frag = lower_expr(arena, session, class_name, ExprContext::Dereferencing)?;
            let args_frag = lower_args(arena, session, &args)?;
            Ok(Fragment::call(
                RuntimeFn::Instantiate,
                vec![class_frag, Fragment::Array(args_frag)],
            ))
        }

        NodeKind::Arg { .. } => lower_arg(arena, session, idx),

        NodeKind::Closure { .. } => lower_closure(arena, session, idx),

        // Params only occur inside closure/function declarations, which
        // consume them directly.
        NodeKind::Param { .. } => Err(misplaced(arena, idx)),

        // Statement kinds never reach expression position; the parser wraps
        // the other direction (ExprStmt), not this one.
        NodeKind::Script { .. }
        | NodeKind::Block { .. }
        | NodeKind::ExprStmt { .. }
        | NodeKind::If { .. }
        | NodeKind::While { .. }
        | NodeKind::DoWhile { .. }
        | NodeKind::ForIndexed { .. }
        | NodeKind::ForIn { .. }
        | NodeKind::Switch { .. }
        | NodeKind::Case { .. }
        | NodeKind::Break { .. }
        | NodeKind::Continue { .. }
        | NodeKind::Return { .. }
        | NodeKind::FunctionDecl { .. }
        | NodeKind::ComponentBody { .. }
        | NodeKind::Import { .. } => Err(misplaced(arena, idx)),
    }
}

/// Lower one statement node.
pub fn lower_stmt(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    match arena.kind(idx).clone() {
        NodeKind::Script { statements } => {
            let mut frags = Vec::with_capacity(statements.len());
            for stmt in statements.iter() {
                frags.push(lower_stmt(arena, session, stmt)?);
            }
            Ok(Fragment::Sequence(frags))
        }

        NodeKind::Block { statements } => {
            let mut frags = Vec::with_capacity(statements.len());
            for stmt in statements.iter() {
                frags.push(lower_stmt(arena, session, stmt)?);
            }
            Ok(Fragment::Block(frags))
        }

        NodeKind::ExprStmt { expr } => Ok(Fragment::expr_stmt(lower_expr(
            arena,
            session,
            expr,
            ExprContext::None,
        )?)),

        NodeKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let cond_frag = lower_expr(arena, session, cond, ExprContext::Right)?;
            let then_frag = lower_stmt(arena, session, then_branch)?;
            if else_branch.is_some() {
                let else_frag = lower_stmt(arena, session, else_branch)?;
                Ok(Fragment::if_else(cond_frag, then_frag, else_frag))
            } else {
                Ok(Fragment::if_then(cond_frag, then_frag))
            }
        }

        NodeKind::While { .. } => lower_while(arena, session, idx),
        NodeKind::DoWhile { .. } => lower_do_while(arena, session, idx),
        NodeKind::ForIndexed { .. } => lower_for_indexed(arena, session, idx),
        NodeKind::ForIn { .. } => lower_for_in(arena, session, idx),
        NodeKind::Switch { .. } => lower_switch(arena, session, idx),

        // Case clauses are consumed by the switch transformer.
        NodeKind::Case { .. } => Err(misplaced(arena, idx)),

        NodeKind::Break { .. } => lower_break(arena, session, idx),
        NodeKind::Continue { .. } => lower_continue(arena, session, idx),
        NodeKind::Return { .. } => lower_return(arena, session, idx),

        NodeKind::FunctionDecl {
            name, params, body, ..
        } => {
            // Declared functions become side-table callables under the
            // enclosing context; nothing is emitted inline.
            let context = session.context_name().to_string();
            let fragments = lower_callable_body(arena, session, &params, body, false)?;
            session.nested_callables.push(NestedCallable {
                name,
                context_name: context,
                fragments,
            });
            Ok(Fragment::Sequence(Vec::new()))
        }

        NodeKind::ComponentBody { name, body } => {
            let context = session.context_name().to_string();
            let fragments = lower_callable_body(arena, session, &NodeList::empty(), body, false)?;
            session.nested_callables.push(NestedCallable {
                name,
                context_name: context,
                fragments,
            });
            Ok(Fragment::Sequence(Vec::new()))
        }

        NodeKind::Import { name, alias } => {
            session.imports.push(crate::session::ImportDecl { name, alias });
            Ok(Fragment::Sequence(Vec::new()))
        }

        // Expression kinds in statement position arrive wrapped in ExprStmt.
        NodeKind::Ident { .. }
        | NodeKind::MemberAccess { .. }
        | NodeKind::IndexAccess { .. }
        | NodeKind::Binary { .. }
        | NodeKind::Compare { .. }
        | NodeKind::Unary { .. }
        | NodeKind::IncrDecr { .. }
        | NodeKind::Ternary { .. }
        | NodeKind::Assignment { .. }
        | NodeKind::StringLit { .. }
        | NodeKind::NumberLit { .. }
        | NodeKind::BoolLit { .. }
        | NodeKind::NullLit
        | NodeKind::InterpString { .. }
        | NodeKind::ArrayLit { .. }
        | NodeKind::StructLit { .. }
        | NodeKind::FunctionCall { .. }
        | NodeKind::MethodCall { .. }
        | NodeKind::StaticCall { .. }
        | NodeKind::DynamicCall { .. }
        | NodeKind::New { .. }
        | NodeKind::Arg { .. }
        | NodeKind::Closure { .. }
        | NodeKind::Param { .. } => Err(misplaced(arena, idx)),
    }
}

/// Lower an invocation argument list. Bare expressions pass positionally;
/// `Arg` nodes may add a name.
fn lower_args(
    arena: &NodeArena,
    session: &mut LoweringSession,
    args: &NodeList,
) -> LowerResult<Vec<Fragment>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args.iter() {
        let frag = match arena.kind(arg) {
            NodeKind::Arg { .. } => lower_arg(arena, session, arg)?,
            _ => lower_expr(arena, session, arg, ExprContext::Right)?,
        };
        out.push(frag);
    }
    Ok(out)
}

fn lower_arg(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    let NodeKind::Arg { name, value } = arena.kind(idx).clone() else {
        return Err(misplaced(arena, idx));
    };
    let value_frag = lower_expr(arena, session, value, ExprContext::Right)?;
    match name {
        Some(name) => Ok(Fragment::call(
            RuntimeFn::NamedArg,
            vec![Fragment::string(name), value_frag],
        )),
        None => Ok(value_frag),
    }
}

/// Lower the parameter prelude and body of a callable into its fragment
/// sequence. Lambdas turn their trailing expression statement into a return.
fn lower_callable_body(
    arena: &NodeArena,
    session: &mut LoweringSession,
    params: &NodeList,
    body: NodeIndex,
    is_lambda: bool,
) -> LowerResult<Vec<Fragment>> {
    let mut frags = Vec::new();
    for param in params.iter() {
        let NodeKind::Param { name, default, .. } = arena.kind(param).clone() else {
            return Err(misplaced(arena, param));
        };
        let init = if default.is_some() {
            Some(lower_expr(arena, session, default, ExprContext::Right)?)
        } else {
            None
        };
        frags.push(Fragment::var_decl(name, init));
    }
    match arena.kind(body).clone() {
        NodeKind::Block { statements } => {
            for stmt in statements.iter() {
                frags.push(lower_stmt(arena, session, stmt)?);
            }
        }
        _ => frags.push(lower_stmt(arena, session, body)?),
    }
    if is_lambda {
        if let Some(Fragment::ExprStmt(_)) = frags.last() {
            if let Some(Fragment::ExprStmt(expr)) = frags.pop() {
                frags.push(Fragment::Return(Some(expr)));
            }
        }
    }
    Ok(frags)
}

/// Lower a closure/lambda: the body becomes a side-table callable named from
/// the closure counter, and the inline fragment binds that callable to the
/// active execution context.
fn lower_closure(
    arena: &NodeArena,
    session: &mut LoweringSession,
    idx: NodeIndex,
) -> LowerResult<Fragment> {
    let NodeKind::Closure {
        params,
        body,
        is_lambda,
    } = arena.kind(idx).clone()
    else {
        return Err(misplaced(arena, idx));
    };

    let names = session.next_closure_names();
    let outer_context = session.context_name().to_string();
    session.push_context_name(names.context.clone());
    let body_result = lower_callable_body(arena, session, &params, body, is_lambda);
    session.pop_context_name();
    let fragments = body_result?;

    session.nested_callables.push(NestedCallable {
        name: names.callable.clone(),
        context_name: names.context,
        fragments,
    });
    Ok(Fragment::call(
        RuntimeFn::ClosureNew,
        vec![
            Fragment::name(outer_context),
            Fragment::string(names.callable),
        ],
    ))
}
