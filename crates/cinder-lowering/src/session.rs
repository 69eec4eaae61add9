//! Per-unit lowering state.
//!
//! A [`LoweringSession`] is created for each compilation unit and threaded by
//! mutable reference through every lowering call. Nothing here is global:
//! concurrent units own independent sessions and cannot interfere. The
//! session carries the context-name stack, the synthetic-name counters, the
//! loop-frame stack used by exit resolution, and the side tables handed to
//! the backend emitter.

use crate::ir::Fragment;
use cinder_ast::NodeIndex;
use rustc_hash::FxHashSet;

/// How the caller will use the fragment being lowered. The same node kind
/// lowers differently per context: an access under `Left` yields an
/// assignable location, under `Right` a read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExprContext {
    #[default]
    None,
    /// Assignment target.
    Left,
    /// Value consumer.
    Right,
    /// Sub-expression of a safe-navigation chain; every hop short-circuits.
    Safe,
    /// Raw key of a chained dereference; identifiers lower to their literal
    /// name instead of a scope lookup.
    Dereferencing,
}

/// One entry in the loop-frame stack, pushed while a loop body is lowered.
#[derive(Clone, Debug)]
pub struct LoopFrame {
    /// The loop node this frame belongs to.
    pub node: NodeIndex,
    /// Source-level label, if the loop carries one.
    pub label: Option<String>,
    /// Break-detection flag name from this loop's counter id. Declared in
    /// the lowered output only when an exit actually sets it.
    pub break_flag: String,
    pub break_flag_used: bool,
    /// Synthetic label for the lowered native loop. Emitted only when an
    /// exit must name the loop explicitly (a continue crossing a lowered
    /// switch would otherwise target the switch's do/while wrapper).
    pub native_label: String,
    pub native_label_used: bool,
}

/// A callable generated during lowering (closure or lambda body), emitted as
/// a side-table entry next to the unit's main fragment sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct NestedCallable {
    pub name: String,
    pub context_name: String,
    pub fragments: Vec<Fragment>,
}

/// An import statement collected while lowering; imports produce no inline
/// fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportDecl {
    pub name: String,
    pub alias: Option<String>,
}

/// Synthetic names allocated for one loop.
#[derive(Clone, Debug)]
pub struct LoopNames {
    /// Iterator temporary.
    pub iter: String,
    /// Source-collection temporary.
    pub source: String,
    /// Tabular-collection flag temporary.
    pub query: String,
    /// Break-detection flag.
    pub break_flag: String,
    /// Native-loop label.
    pub label: String,
}

/// Synthetic names allocated for one switch.
#[derive(Clone, Debug)]
pub struct SwitchNames {
    /// Subject-value temporary.
    pub subject: String,
    /// Sticky case-entered flag.
    pub entered: String,
}

/// Synthetic names allocated for one closure.
#[derive(Clone, Debug)]
pub struct ClosureNames {
    /// Generated callable name.
    pub callable: String,
    /// Execution-context name pushed around the closure body.
    pub context: String,
}

/// Mutable per-unit lowering state. Counters are monotonic for the life of
/// the unit and never reset mid-unit.
#[derive(Debug)]
pub struct LoweringSession {
    context_names: Vec<String>,
    loop_seq: u32,
    switch_seq: u32,
    closure_seq: u32,
    loop_frames: Vec<LoopFrame>,
    key_constants: Vec<String>,
    key_seen: FxHashSet<String>,
    pub nested_callables: Vec<NestedCallable>,
    pub imports: Vec<ImportDecl>,
}

impl LoweringSession {
    pub fn new() -> LoweringSession {
        LoweringSession {
            context_names: vec!["context".to_string()],
            loop_seq: 0,
            switch_seq: 0,
            closure_seq: 0,
            loop_frames: Vec::new(),
            key_constants: Vec::new(),
            key_seen: FxHashSet::default(),
            nested_callables: Vec::new(),
            imports: Vec::new(),
        }
    }

    /// The identifier currently denoting the active execution context.
    pub fn context_name(&self) -> &str {
        // The stack is seeded at construction and pops never remove the root.
        self.context_names
            .last()
            .map(String::as_str)
            .unwrap_or("context")
    }

    pub fn push_context_name(&mut self, name: impl Into<String>) {
        self.context_names.push(name.into());
    }

    pub fn pop_context_name(&mut self) {
        if self.context_names.len() > 1 {
            self.context_names.pop();
        }
    }

    /// Allocate the synthetic names for one loop. Each call advances the
    /// per-unit loop counter, so sibling loops never share temporaries.
    pub fn next_loop_names(&mut self) -> LoopNames {
        self.loop_seq += 1;
        let id = self.loop_seq;
        tracing::debug!("[lowering] loop names allocated, id {id}");
        LoopNames {
            iter: format!("_it{id}"),
            source: format!("_src{id}"),
            query: format!("_qry{id}"),
            break_flag: format!("_brk{id}"),
            label: format!("_loop{id}"),
        }
    }

    pub fn next_switch_names(&mut self) -> SwitchNames {
        self.switch_seq += 1;
        let id = self.switch_seq;
        tracing::debug!("[lowering] switch names allocated, id {id}");
        SwitchNames {
            subject: format!("_sw{id}"),
            entered: format!("_hit{id}"),
        }
    }

    pub fn next_closure_names(&mut self) -> ClosureNames {
        self.closure_seq += 1;
        let id = self.closure_seq;
        tracing::debug!("[lowering] closure names allocated, id {id}");
        ClosureNames {
            callable: format!("_closure{id}"),
            context: format!("_ctx{id}"),
        }
    }

    pub fn push_loop_frame(&mut self, node: NodeIndex, label: Option<String>, names: &LoopNames) {
        self.loop_frames.push(LoopFrame {
            node,
            label,
            break_flag: names.break_flag.clone(),
            break_flag_used: false,
            native_label: names.label.clone(),
            native_label_used: false,
        });
    }

    /// Pop the innermost frame; the loop transformer inspects which of the
    /// flag and the native label were actually used before assembling its
    /// output.
    pub fn pop_loop_frame(&mut self) -> Option<LoopFrame> {
        self.loop_frames.pop()
    }

    /// The frame for `node`, if its body is currently being lowered.
    pub fn loop_frame_for(&self, node: NodeIndex) -> Option<&LoopFrame> {
        self.loop_frames.iter().rev().find(|frame| frame.node == node)
    }

    /// Record that an exit targeting `node`'s loop sets the break flag.
    /// Returns the flag name, or `None` when the loop has no frame.
    pub fn use_break_flag(&mut self, node: NodeIndex) -> Option<String> {
        let frame = self
            .loop_frames
            .iter_mut()
            .rev()
            .find(|frame| frame.node == node)?;
        frame.break_flag_used = true;
        Some(frame.break_flag.clone())
    }

    /// The label an exit must name to target `node`'s loop natively: the
    /// source label when the loop has one, otherwise the synthetic label
    /// (marked used so the loop transformer emits it).
    pub fn use_loop_label(&mut self, node: NodeIndex) -> Option<String> {
        let frame = self
            .loop_frames
            .iter_mut()
            .rev()
            .find(|frame| frame.node == node)?;
        if let Some(label) = &frame.label {
            return Some(label.clone());
        }
        frame.native_label_used = true;
        Some(frame.native_label.clone())
    }

    /// Record a string key referenced by an emitted fragment. Keys keep
    /// first-reference order and are reported once.
    pub fn record_key(&mut self, key: &str) {
        if self.key_seen.insert(key.to_string()) {
            self.key_constants.push(key.to_string());
        }
    }

    pub fn key_constants(&self) -> &[String] {
        &self.key_constants
    }

    pub fn into_side_tables(self) -> (Vec<String>, Vec<NestedCallable>, Vec<ImportDecl>) {
        (self.key_constants, self.nested_callables, self.imports)
    }
}

impl Default for LoweringSession {
    fn default() -> Self {
        LoweringSession::new()
    }
}
