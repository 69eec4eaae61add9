//! Arena storage for syntax-tree nodes.
//!
//! Nodes live in a flat `Vec` and are addressed by `NodeIndex`; each node
//! stores its parent's index. Child replacement is an arena update, never a
//! live object-graph mutation, so there are no aliasing or dangling-pointer
//! concerns: a node can only be reached through the single parent slot that
//! holds it.

use crate::base::{NodeIndex, NodeList};
use crate::node::{Node, NodeKind};
use cinder_common::Span;

#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    /// Unit source text; node spans slice into it.
    source: String,
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new(source: impl Into<String>) -> NodeArena {
        NodeArena {
            source: source.into(),
            nodes: Vec::new(),
        }
    }

    /// Pre-allocate for an expected node count.
    pub fn with_capacity(source: impl Into<String>, capacity: usize) -> NodeArena {
        NodeArena {
            source: source.into(),
            nodes: Vec::with_capacity(capacity),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ========================================================================
    // Node creation
    // ========================================================================

    /// Add a node and attach the parent back-reference of every child slot.
    ///
    /// Children are created before parents (bottom-up construction), so every
    /// child index is already valid when the parent is added.
    pub fn add(&mut self, kind: NodeKind, span: Span) -> NodeIndex {
        let index = NodeIndex(self.nodes.len() as u32);
        let mut children = Vec::new();
        kind.for_each_child(|c| {
            if c.is_some() {
                children.push(c);
            }
        });
        self.nodes.push(Node {
            kind,
            span,
            parent: NodeIndex::NONE,
        });
        for child in children {
            self.set_parent(child, index);
        }
        index
    }

    /// Set the parent for a single child node.
    #[inline]
    fn set_parent(&mut self, child: NodeIndex, parent: NodeIndex) {
        if let Some(node) = self.nodes.get_mut(child.0 as usize) {
            node.parent = parent;
        }
    }

    // Convenience constructors for the kinds tests and rewriters synthesize
    // most often.

    pub fn add_ident(&mut self, name: impl Into<String>, span: Span) -> NodeIndex {
        self.add(NodeKind::Ident { name: name.into() }, span)
    }

    pub fn add_string(&mut self, value: impl Into<String>, span: Span) -> NodeIndex {
        self.add(
            NodeKind::StringLit {
                value: value.into(),
            },
            span,
        )
    }

    pub fn add_number(&mut self, value: f64, span: Span) -> NodeIndex {
        self.add(
            NodeKind::NumberLit {
                value,
                text: value.to_string(),
            },
            span,
        )
    }

    pub fn add_bool(&mut self, value: bool, span: Span) -> NodeIndex {
        self.add(NodeKind::BoolLit { value }, span)
    }

    pub fn add_null(&mut self, span: Span) -> NodeIndex {
        self.add(NodeKind::NullLit, span)
    }

    pub fn add_expr_stmt(&mut self, expr: NodeIndex, span: Span) -> NodeIndex {
        self.add(NodeKind::ExprStmt { expr }, span)
    }

    pub fn add_block(&mut self, statements: Vec<NodeIndex>, span: Span) -> NodeIndex {
        self.add(
            NodeKind::Block {
                statements: NodeList::new(statements),
            },
            span,
        )
    }

    pub fn add_script(&mut self, statements: Vec<NodeIndex>, span: Span) -> NodeIndex {
        self.add(
            NodeKind::Script {
                statements: NodeList::new(statements),
            },
            span,
        )
    }

    // ========================================================================
    // Access
    // ========================================================================

    pub fn get(&self, idx: NodeIndex) -> Option<&Node> {
        if idx.is_none() {
            return None;
        }
        self.nodes.get(idx.0 as usize)
    }

    /// Panicking accessor for indices known to be valid.
    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx.0 as usize]
    }

    pub fn kind(&self, idx: NodeIndex) -> &NodeKind {
        &self.node(idx).kind
    }

    pub fn span(&self, idx: NodeIndex) -> Span {
        self.node(idx).span
    }

    pub fn parent(&self, idx: NodeIndex) -> NodeIndex {
        self.node(idx).parent
    }

    /// The raw source text slice this node was parsed from.
    pub fn text(&self, idx: NodeIndex) -> &str {
        self.node(idx).span.text(&self.source)
    }

    // ========================================================================
    // Child replacement
    // ========================================================================

    /// Replace `old` with `new` in the parent's child slots.
    ///
    /// The swap is atomic with respect to the tree invariants: the old
    /// child's parent back-reference is detached, the new child's is
    /// attached, and every sibling slot keeps its identity and order.
    /// Returns false when `old` is not a child of `parent`.
    pub fn replace_child(&mut self, parent: NodeIndex, old: NodeIndex, new: NodeIndex) -> bool {
        if parent.is_none() || old.is_none() {
            return false;
        }
        let mut replaced = false;
        if let Some(node) = self.nodes.get_mut(parent.0 as usize) {
            node.kind.for_each_child_mut(|slot| {
                if !replaced && *slot == old {
                    *slot = new;
                    replaced = true;
                }
            });
        }
        if replaced {
            self.set_parent(old, NodeIndex::NONE);
            self.set_parent(new, parent);
        }
        replaced
    }

    // ========================================================================
    // Ancestor queries
    // ========================================================================

    /// Walk `parent` links upward from (excluding) `idx`; return the first
    /// ancestor whose kind satisfies `pred`.
    pub fn find_ancestor(
        &self,
        idx: NodeIndex,
        mut pred: impl FnMut(&NodeKind) -> bool,
    ) -> Option<NodeIndex> {
        let mut current = self.get(idx)?.parent;
        while let Some(node) = self.get(current) {
            if pred(&node.kind) {
                return Some(current);
            }
            current = node.parent;
        }
        None
    }

    /// True when `ancestor` lies on the parent chain of `idx`.
    pub fn is_ancestor_of(&self, ancestor: NodeIndex, idx: NodeIndex) -> bool {
        let mut current = match self.get(idx) {
            Some(node) => node.parent,
            None => return false,
        };
        while current.is_some() {
            if current == ancestor {
                return true;
            }
            current = self.node(current).parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::BinaryOp;

    fn arena() -> NodeArena {
        NodeArena::new("a + b")
    }

    #[test]
    fn add_attaches_parent_backrefs() {
        let mut arena = arena();
        let left = arena.add_ident("a", Span::new(0, 1));
        let right = arena.add_ident("b", Span::new(4, 5));
        let bin = arena.add(
            NodeKind::Binary {
                op: BinaryOp::Plus,
                left,
                right,
            },
            Span::new(0, 5),
        );

        assert_eq!(arena.parent(left), bin);
        assert_eq!(arena.parent(right), bin);
        assert_eq!(arena.parent(bin), NodeIndex::NONE);
        assert_eq!(arena.text(bin), "a + b");
    }

    #[test]
    fn replace_child_swaps_slot_and_backrefs() {
        let mut arena = arena();
        let left = arena.add_ident("a", Span::new(0, 1));
        let right = arena.add_ident("b", Span::new(4, 5));
        let bin = arena.add(
            NodeKind::Binary {
                op: BinaryOp::Plus,
                left,
                right,
            },
            Span::new(0, 5),
        );
        let replacement = arena.add_number(1.0, Span::EMPTY);

        assert!(arena.replace_child(bin, left, replacement));
        assert_eq!(arena.parent(replacement), bin);
        assert_eq!(arena.parent(left), NodeIndex::NONE);
        // Sibling slot untouched.
        match arena.kind(bin) {
            NodeKind::Binary { left: l, right: r, .. } => {
                assert_eq!(*l, replacement);
                assert_eq!(*r, right);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn replace_child_rejects_non_child() {
        let mut arena = arena();
        let a = arena.add_ident("a", Span::new(0, 1));
        let b = arena.add_ident("b", Span::new(4, 5));
        let stmt = arena.add_expr_stmt(a, Span::new(0, 1));
        let stranger = arena.add_number(2.0, Span::EMPTY);

        assert!(!arena.replace_child(stmt, b, stranger));
        assert_eq!(arena.parent(a), stmt);
    }

    #[test]
    fn replace_child_in_list_slot_preserves_order() {
        let mut arena = arena();
        let s1 = {
            let e = arena.add_number(1.0, Span::EMPTY);
            arena.add_expr_stmt(e, Span::EMPTY)
        };
        let s2 = {
            let e = arena.add_number(2.0, Span::EMPTY);
            arena.add_expr_stmt(e, Span::EMPTY)
        };
        let s3 = {
            let e = arena.add_number(3.0, Span::EMPTY);
            arena.add_expr_stmt(e, Span::EMPTY)
        };
        let block = arena.add_block(vec![s1, s2, s3], Span::EMPTY);
        let swap = {
            let e = arena.add_null(Span::EMPTY);
            arena.add_expr_stmt(e, Span::EMPTY)
        };

        assert!(arena.replace_child(block, s2, swap));
        match arena.kind(block) {
            NodeKind::Block { statements } => {
                assert_eq!(statements.nodes, vec![s1, swap, s3]);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn find_ancestor_stops_at_first_match() {
        let mut arena = arena();
        let inner_expr = arena.add_ident("x", Span::EMPTY);
        let inner_stmt = arena.add_expr_stmt(inner_expr, Span::EMPTY);
        let inner_body = arena.add_block(vec![inner_stmt], Span::EMPTY);
        let cond = arena.add_bool(true, Span::EMPTY);
        let inner_loop = arena.add(
            NodeKind::While {
                cond,
                body: inner_body,
                label: None,
            },
            Span::EMPTY,
        );
        let outer_body = arena.add_block(vec![inner_loop], Span::EMPTY);
        let cond2 = arena.add_bool(true, Span::EMPTY);
        let outer_loop = arena.add(
            NodeKind::While {
                cond: cond2,
                body: outer_body,
                label: None,
            },
            Span::EMPTY,
        );

        let found = arena.find_ancestor(inner_expr, NodeKind::is_loop);
        assert_eq!(found, Some(inner_loop));
        assert!(arena.is_ancestor_of(outer_loop, inner_expr));
        assert!(!arena.is_ancestor_of(inner_expr, outer_loop));
    }
}
