//! Lowered fragment representation.
//!
//! Lowering produces a tree of [`Fragment`]s: structured constructs of the
//! executable target representation, built through typed constructors
//! instead of textual templates. The backend emitter consumes these trees;
//! nothing here round-trips through strings, so a fragment that exists is a
//! fragment that validated.
//!
//! Calls into the runtime value/operator layer are represented by
//! [`RuntimeFn`]: a closed set of call shapes (name + fixed argument order).
//! The lowering engine depends only on these shapes, not on the runtime's
//! implementation.

/// Tag carried by a body-result value threaded across component call
/// frames. `Break`/`Continue` carry an optional label; `Return` carries the
/// function result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyResultKind {
    Break,
    Continue,
    Return,
}

impl BodyResultKind {
    pub const fn tag(self) -> &'static str {
        match self {
            BodyResultKind::Break => "BREAK",
            BodyResultKind::Continue => "CONTINUE",
            BodyResultKind::Return => "RETURN",
        }
    }
}

/// Runtime-layer call shapes. The canonical name is what the emitted call
/// dispatches on; argument order is fixed per shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuntimeFn {
    /// `op.invoke(left, right)` / `op.invoke(operand)`, dispatched by the
    /// canonical operator name.
    Operator(&'static str),
    /// `op.compound(location, key, value)` — read-modify-write in one call,
    /// dispatched by the canonical operator name.
    Compound(&'static str),

    /// `scope.find(context, key)` — nearest scope holding the key, falling
    /// back to the designated default scope, then read.
    ScopeFind,
    /// `scope.locate(context, key)` — the holding scope itself (assignable
    /// location base for identifiers).
    ScopeLocate,
    /// `scope.assign(context, key, value)` — resolve then assign.
    ScopeAssign,
    /// `scope.local(context, key, value)` — declare-and-assign a new local
    /// binding.
    LocalAssign,

    /// `runtime.deref(base, key)` — one access-chain hop. A safe hop
    /// short-circuits the hop (and everything chained onto its result) to
    /// an absent value when the base is absent.
    Deref { safe: bool },
    /// `runtime.set(base, key, value)` — single-hop member write.
    Set,
    /// `runtime.deepSet(root, keyPath, value)` — multi-hop write; creates
    /// missing intermediate containers.
    DeepSet,

    /// `op.increment(location, key)` / `op.decrement(location, key)`;
    /// the post forms return the prior value.
    Increment { post: bool },
    Decrement { post: bool },

    /// `ctrl.bodyResult(tag, ...)` — break/continue/return signal carried
    /// across a component-body call frame.
    BodyResult(BodyResultKind),

    /// `query.isQuery(value)` — runtime test for tabular collections.
    IsQuery,
    /// `query.register(query)` / `query.unregister(query)` — position
    /// tracking around a tabular for-in.
    QueryRegister,
    QueryUnregister,
    /// `query.increment(query)` — advance the tracked row position.
    QueryIncrement,

    /// `iter.of(collection)` / `iter.hasNext(it)` / `iter.next(it)`.
    IterOf,
    IterHasNext,
    IterNext,

    /// `switch.match(subject, value)` — case equality test.
    CaseMatch,
    /// `switch.matchList(subject, value, delimiter)` — delimited-list
    /// containment test.
    CaseMatchList,

    /// `fn.call(context, name, args)` — named-function invocation.
    CallFunction,
    /// `method.call(base, name, args)` — member invocation; safe form
    /// short-circuits on an absent base.
    CallMethod { safe: bool },
    /// `static.call(class, name, args)`.
    CallStatic,
    /// `expr.call(callee, args)` — expression-as-callee invocation.
    CallDynamic,
    /// `obj.new(class, args)` — object construction.
    Instantiate,
    /// `fn.closure(context, name)` — bind a generated callable to the
    /// active execution context.
    ClosureNew,

    /// `array.new(elements...)`.
    ArrayNew,
    /// `struct.new(key, value, ...)`; ordered structs preserve insertion
    /// order.
    StructNew { ordered: bool },
    /// `string.concat(parts...)` — interpolated-string assembly.
    StrConcat,
    /// `arg.named(name, value)` — named invocation argument.
    NamedArg,
}

impl RuntimeFn {
    /// Canonical dispatch name of the call shape.
    pub const fn name(self) -> &'static str {
        match self {
            RuntimeFn::Operator(_) => "op.invoke",
            RuntimeFn::Compound(_) => "op.compound",
            RuntimeFn::ScopeFind => "scope.find",
            RuntimeFn::ScopeLocate => "scope.locate",
            RuntimeFn::ScopeAssign => "scope.assign",
            RuntimeFn::LocalAssign => "scope.local",
            RuntimeFn::Deref { .. } => "runtime.deref",
            RuntimeFn::Set => "runtime.set",
            RuntimeFn::DeepSet => "runtime.deepSet",
            RuntimeFn::Increment { .. } => "op.increment",
            RuntimeFn::Decrement { .. } => "op.decrement",
            RuntimeFn::BodyResult(_) => "ctrl.bodyResult",
            RuntimeFn::IsQuery => "query.isQuery",
            RuntimeFn::QueryRegister => "query.register",
            RuntimeFn::QueryUnregister => "query.unregister",
            RuntimeFn::QueryIncrement => "query.increment",
            RuntimeFn::IterOf => "iter.of",
            RuntimeFn::IterHasNext => "iter.hasNext",
            RuntimeFn::IterNext => "iter.next",
            RuntimeFn::CaseMatch => "switch.match",
            RuntimeFn::CaseMatchList => "switch.matchList",
            RuntimeFn::CallFunction => "fn.call",
            RuntimeFn::CallMethod { .. } => "method.call",
            RuntimeFn::CallStatic => "static.call",
            RuntimeFn::CallDynamic => "expr.call",
            RuntimeFn::Instantiate => "obj.new",
            RuntimeFn::ClosureNew => "fn.closure",
            RuntimeFn::ArrayNew => "array.new",
            RuntimeFn::StructNew { .. } => "struct.new",
            RuntimeFn::StrConcat => "string.concat",
            RuntimeFn::NamedArg => "arg.named",
        }
    }
}

/// A piece of the executable target representation produced by lowering one
/// node.
#[derive(Clone, Debug, PartialEq)]
pub enum Fragment {
    // =========================================================================
    // Values
    // =========================================================================
    Null,
    Bool(bool),
    Number(f64),
    Str(String),

    /// A target-level name: a synthetic temporary or the active execution
    /// context identifier.
    Name(String),

    /// A call into the runtime layer.
    RuntimeCall {
        func: RuntimeFn,
        args: Vec<Fragment>,
    },

    /// Native short-circuit OR over target booleans (synthetic flags).
    LogicalOr {
        left: Box<Fragment>,
        right: Box<Fragment>,
    },

    /// Native ternary over already-lowered values.
    Ternary {
        cond: Box<Fragment>,
        when_true: Box<Fragment>,
        when_false: Box<Fragment>,
    },

    /// An ordered pack (key paths, argument lists).
    Array(Vec<Fragment>),

    /// An assignable location: the scope-or-object holding the final key.
    /// Produced only under `Left` context; never a readable value.
    Location {
        base: Box<Fragment>,
        key: Box<Fragment>,
    },

    // =========================================================================
    // Statements
    // =========================================================================
    /// Statements spliced into the enclosing sequence without a block scope.
    Sequence(Vec<Fragment>),

    Block(Vec<Fragment>),

    VarDecl {
        name: String,
        init: Option<Box<Fragment>>,
    },

    /// Assignment to a synthetic target-level name.
    Assign {
        name: String,
        value: Box<Fragment>,
    },

    ExprStmt(Box<Fragment>),

    If {
        cond: Box<Fragment>,
        then_branch: Box<Fragment>,
        else_branch: Option<Box<Fragment>>,
    },

    While {
        cond: Box<Fragment>,
        body: Box<Fragment>,
    },

    DoWhile {
        body: Box<Fragment>,
        cond: Box<Fragment>,
    },

    /// `finalizer` runs however `body` terminates (the guaranteed-execution
    /// position for loop steps and query unregistration).
    TryFinally {
        body: Box<Fragment>,
        finalizer: Box<Fragment>,
    },

    Break(Option<String>),
    Continue(Option<String>),

    Return(Option<Box<Fragment>>),

    Labeled {
        label: String,
        body: Box<Fragment>,
    },
}

impl Fragment {
    // Builder helpers, used pervasively by the transformers.

    pub fn name(name: impl Into<String>) -> Self {
        Fragment::Name(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Fragment::Str(value.into())
    }

    pub fn call(func: RuntimeFn, args: Vec<Fragment>) -> Self {
        Fragment::RuntimeCall { func, args }
    }

    pub fn logical_or(left: Fragment, right: Fragment) -> Self {
        Fragment::LogicalOr {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn ternary(cond: Fragment, when_true: Fragment, when_false: Fragment) -> Self {
        Fragment::Ternary {
            cond: Box::new(cond),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
        }
    }

    pub fn location(base: Fragment, key: Fragment) -> Self {
        Fragment::Location {
            base: Box::new(base),
            key: Box::new(key),
        }
    }

    pub fn var_decl(name: impl Into<String>, init: Option<Fragment>) -> Self {
        Fragment::VarDecl {
            name: name.into(),
            init: init.map(Box::new),
        }
    }

    pub fn assign(name: impl Into<String>, value: Fragment) -> Self {
        Fragment::Assign {
            name: name.into(),
            value: Box::new(value),
        }
    }

    pub fn expr_stmt(expr: Fragment) -> Self {
        Fragment::ExprStmt(Box::new(expr))
    }

    pub fn if_then(cond: Fragment, then_branch: Fragment) -> Self {
        Fragment::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: None,
        }
    }

    pub fn if_else(cond: Fragment, then_branch: Fragment, else_branch: Fragment) -> Self {
        Fragment::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Some(Box::new(else_branch)),
        }
    }

    pub fn while_loop(cond: Fragment, body: Fragment) -> Self {
        Fragment::While {
            cond: Box::new(cond),
            body: Box::new(body),
        }
    }

    pub fn do_while(body: Fragment, cond: Fragment) -> Self {
        Fragment::DoWhile {
            body: Box::new(body),
            cond: Box::new(cond),
        }
    }

    pub fn try_finally(body: Fragment, finalizer: Fragment) -> Self {
        Fragment::TryFinally {
            body: Box::new(body),
            finalizer: Box::new(finalizer),
        }
    }

    pub fn ret(value: Option<Fragment>) -> Self {
        Fragment::Return(value.map(Box::new))
    }

    pub fn labeled(label: impl Into<String>, body: Fragment) -> Self {
        Fragment::Labeled {
            label: label.into(),
            body: Box::new(body),
        }
    }

    /// Visit this fragment and every sub-fragment, depth-first.
    pub fn walk(&self, f: &mut impl FnMut(&Fragment)) {
        self.walk_impl(f);
    }

    fn walk_impl(&self, f: &mut dyn FnMut(&Fragment)) {
        f(self);
        match self {
            Fragment::Null
            | Fragment::Bool(_)
            | Fragment::Number(_)
            | Fragment::Str(_)
            | Fragment::Name(_)
            | Fragment::Break(_)
            | Fragment::Continue(_) => {}
            Fragment::RuntimeCall { args, .. } => {
                for a in args {
                    a.walk_impl(f);
                }
            }
            Fragment::LogicalOr { left, right } => {
                left.walk_impl(f);
                right.walk_impl(f);
            }
            Fragment::Ternary {
                cond,
                when_true,
                when_false,
            } => {
                cond.walk_impl(f);
                when_true.walk_impl(f);
                when_false.walk_impl(f);
            }
            Fragment::Array(items) | Fragment::Sequence(items) | Fragment::Block(items) => {
                for item in items {
                    item.walk_impl(f);
                }
            }
            Fragment::Location { base, key } => {
                base.walk_impl(f);
                key.walk_impl(f);
            }
            Fragment::VarDecl { init, .. } => {
                if let Some(init) = init {
                    init.walk_impl(f);
                }
            }
            Fragment::Assign { value, .. } => value.walk_impl(f),
            Fragment::ExprStmt(expr) => expr.walk_impl(f),
            Fragment::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.walk_impl(f);
                then_branch.walk_impl(f);
                if let Some(e) = else_branch {
                    e.walk_impl(f);
                }
            }
            Fragment::While { cond, body } => {
                cond.walk_impl(f);
                body.walk_impl(f);
            }
            Fragment::DoWhile { body, cond } => {
                body.walk_impl(f);
                cond.walk_impl(f);
            }
            Fragment::TryFinally { body, finalizer } => {
                body.walk_impl(f);
                finalizer.walk_impl(f);
            }
            Fragment::Return(value) => {
                if let Some(v) = value {
                    v.walk_impl(f);
                }
            }
            Fragment::Labeled { body, .. } => body.walk_impl(f),
        }
    }

    /// Count sub-fragments matching `pred` (used by tests to assert
    /// single-evaluation guarantees).
    pub fn count_matching(&self, pred: impl Fn(&Fragment) -> bool) -> usize {
        let mut count = 0;
        self.walk(&mut |frag| {
            if pred(frag) {
                count += 1;
            }
        });
        count
    }
}
