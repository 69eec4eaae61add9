//! Traversal and rewrite contracts.
//!
//! Two dispatch contracts cover the whole node taxonomy:
//!
//! - [`Visit`]: a non-mutating pass. `walk` drives a depth-first traversal
//!   and calls `enter`/`leave` around every node.
//! - [`Rewrite`]: a tree-rewriting pass. `rewrite_tree` rewrites children
//!   first, re-attaches any replacement through the arena's standard
//!   child-replacement procedure (preserving the parent invariant), then
//!   offers the node itself for replacement.
//!
//! Both ride on `NodeKind::for_each_child`, whose exhaustive match makes a
//! new node kind a compile error until the walk is extended.

use crate::arena::NodeArena;
use crate::base::NodeIndex;

/// Non-mutating visitor over the tree.
pub trait Visit {
    /// Called before a node's children are visited.
    fn enter(&mut self, arena: &NodeArena, idx: NodeIndex);

    /// Called after a node's children have been visited.
    fn leave(&mut self, _arena: &NodeArena, _idx: NodeIndex) {}
}

/// Depth-first traversal of the subtree rooted at `idx`.
pub fn walk<V: Visit>(arena: &NodeArena, idx: NodeIndex, visitor: &mut V) {
    if arena.get(idx).is_none() {
        return;
    }
    visitor.enter(arena, idx);
    let children = arena.kind(idx).children();
    for child in children {
        walk(arena, child, visitor);
    }
    visitor.leave(arena, idx);
}

/// Tree-rewriting visitor. Returns the node itself or a replacement; the
/// driver is responsible for splicing the replacement into the parent slot.
pub trait Rewrite {
    fn rewrite(&mut self, arena: &mut NodeArena, idx: NodeIndex) -> NodeIndex;
}

/// Post-order rewrite of the subtree rooted at `idx`. Returns the (possibly
/// replaced) root; the caller re-attaches it if the root itself changed.
pub fn rewrite_tree<R: Rewrite>(
    arena: &mut NodeArena,
    idx: NodeIndex,
    rewriter: &mut R,
) -> NodeIndex {
    if arena.get(idx).is_none() {
        return idx;
    }
    let children = arena.kind(idx).children();
    for child in children {
        let replacement = rewrite_tree(arena, child, rewriter);
        if replacement != child {
            arena.replace_child(idx, child, replacement);
        }
    }
    rewriter.rewrite(arena, idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BinaryOp, NodeKind};
    use cinder_common::Span;

    struct KindCollector {
        entered: Vec<&'static str>,
        left: Vec<&'static str>,
    }

    impl Visit for KindCollector {
        fn enter(&mut self, arena: &NodeArena, idx: NodeIndex) {
            self.entered.push(arena.kind(idx).kind_name());
        }

        fn leave(&mut self, arena: &NodeArena, idx: NodeIndex) {
            self.left.push(arena.kind(idx).kind_name());
        }
    }

    #[test]
    fn walk_visits_depth_first() {
        let mut arena = NodeArena::new("a + 1");
        let a = arena.add_ident("a", Span::new(0, 1));
        let one = arena.add_number(1.0, Span::new(4, 5));
        let bin = arena.add(
            NodeKind::Binary {
                op: BinaryOp::Plus,
                left: a,
                right: one,
            },
            Span::new(0, 5),
        );
        let stmt = arena.add_expr_stmt(bin, Span::new(0, 5));

        let mut collector = KindCollector {
            entered: Vec::new(),
            left: Vec::new(),
        };
        walk(&arena, stmt, &mut collector);

        assert_eq!(
            collector.entered,
            vec!["ExprStmt", "Binary", "Ident", "NumberLit"]
        );
        assert_eq!(
            collector.left,
            vec!["Ident", "NumberLit", "Binary", "ExprStmt"]
        );
    }

    /// Replaces every identifier named "old" with one named "new".
    struct RenameIdent;

    impl Rewrite for RenameIdent {
        fn rewrite(&mut self, arena: &mut NodeArena, idx: NodeIndex) -> NodeIndex {
            let span = arena.span(idx);
            match arena.kind(idx) {
                NodeKind::Ident { name } if name == "old" => arena.add_ident("new", span),
                _ => idx,
            }
        }
    }

    #[test]
    fn rewrite_tree_reattaches_through_parent_slot() {
        let mut arena = NodeArena::new("old + x");
        let old = arena.add_ident("old", Span::new(0, 3));
        let x = arena.add_ident("x", Span::new(6, 7));
        let bin = arena.add(
            NodeKind::Binary {
                op: BinaryOp::Plus,
                left: old,
                right: x,
            },
            Span::new(0, 7),
        );

        let root = rewrite_tree(&mut arena, bin, &mut RenameIdent);
        assert_eq!(root, bin);

        let NodeKind::Binary { left, right, .. } = arena.kind(bin) else {
            panic!("expected binary node");
        };
        let (left, right) = (*left, *right);
        assert_ne!(left, old);
        assert_eq!(right, x);
        assert!(matches!(arena.kind(left), NodeKind::Ident { name } if name == "new"));
        // Parent invariant holds after the splice.
        assert_eq!(arena.parent(left), bin);
        assert_eq!(arena.parent(old), NodeIndex::NONE);
    }
}
