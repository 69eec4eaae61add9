//! Node model: the closed taxonomy of syntax-tree kinds.
//!
//! Every node is a `Node` header (kind + span + parent back-reference)
//! stored in a `NodeArena` and addressed by `NodeIndex`. `NodeKind` is a
//! closed tagged union: the child-slot walk, the traversal contracts, the
//! structural serializer, and the lowering registry all match on it
//! exhaustively, so adding a kind is a compile-enforced update at each of
//! those sites.
//!
//! Expressions and statements are disjoint categories. An expression in
//! statement position is wrapped by `ExprStmt`; no statement produces a
//! value.

use crate::base::{NodeIndex, NodeList};
use cinder_common::Span;

/// A syntax-tree node: kind-specific children plus bookkeeping shared by
/// every kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Back-reference to the holding parent; `NONE` only for the root.
    pub parent: NodeIndex,
}

/// Binary arithmetic/logical operators. Each carries a canonical runtime
/// operation name and a source symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulus,
    Exponent,
    Concat,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub const fn name(self) -> &'static str {
        match self {
            BinaryOp::Plus => "Plus",
            BinaryOp::Minus => "Minus",
            BinaryOp::Multiply => "Multiply",
            BinaryOp::Divide => "Divide",
            BinaryOp::Modulus => "Modulus",
            BinaryOp::Exponent => "Exponent",
            BinaryOp::Concat => "Concat",
            BinaryOp::And => "And",
            BinaryOp::Or => "Or",
            BinaryOp::Xor => "Xor",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulus => "%",
            BinaryOp::Exponent => "^",
            BinaryOp::Concat => "&",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Xor => "xor",
        }
    }
}

/// Comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    NotContains,
}

impl CompareOp {
    pub const fn name(self) -> &'static str {
        match self {
            CompareOp::Eq => "Eq",
            CompareOp::Neq => "Neq",
            CompareOp::Lt => "Lt",
            CompareOp::Lte => "Lte",
            CompareOp::Gt => "Gt",
            CompareOp::Gte => "Gte",
            CompareOp::Contains => "Contains",
            CompareOp::NotContains => "NotContains",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Neq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Contains => "contains",
            CompareOp::NotContains => "does not contain",
        }
    }
}

/// Unary prefix operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

impl UnaryOp {
    pub const fn name(self) -> &'static str {
        match self {
            UnaryOp::Not => "Not",
            UnaryOp::Neg => "Negate",
            UnaryOp::Pos => "Identity",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
        }
    }
}

/// Increment/decrement operators (`++`/`--`, prefix or postfix per node).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IncrDecrOp {
    Increment,
    Decrement,
}

impl IncrDecrOp {
    pub const fn name(self) -> &'static str {
        match self {
            IncrDecrOp::Increment => "Increment",
            IncrDecrOp::Decrement => "Decrement",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            IncrDecrOp::Increment => "++",
            IncrDecrOp::Decrement => "--",
        }
    }
}

/// Assignment operators: plain `=` and the compound forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    ConcatAssign,
}

impl AssignOp {
    pub const fn name(self) -> &'static str {
        match self {
            AssignOp::Assign => "Assign",
            AssignOp::AddAssign => "AddAssign",
            AssignOp::SubAssign => "SubAssign",
            AssignOp::MulAssign => "MulAssign",
            AssignOp::DivAssign => "DivAssign",
            AssignOp::ModAssign => "ModAssign",
            AssignOp::ConcatAssign => "ConcatAssign",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
            AssignOp::ConcatAssign => "&=",
        }
    }

    pub const fn is_compound(self) -> bool {
        !matches!(self, AssignOp::Assign)
    }
}

/// The closed node taxonomy.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    // =========================================================================
    // Expressions
    // =========================================================================
    /// Bare identifier. Resolved against the dynamic scope chain at runtime.
    Ident { name: String },

    /// Dot access: `base.name`, optionally safe (`base?.name`).
    MemberAccess {
        base: NodeIndex,
        name: String,
        safe: bool,
    },

    /// Bracket access: `base[index]`, optionally safe.
    IndexAccess {
        base: NodeIndex,
        index: NodeIndex,
        safe: bool,
    },

    Binary {
        op: BinaryOp,
        left: NodeIndex,
        right: NodeIndex,
    },

    Compare {
        op: CompareOp,
        left: NodeIndex,
        right: NodeIndex,
    },

    Unary {
        op: UnaryOp,
        operand: NodeIndex,
    },

    /// `++x` / `x++` / `--x` / `x--`.
    IncrDecr {
        op: IncrDecrOp,
        operand: NodeIndex,
        prefix: bool,
    },

    Ternary {
        cond: NodeIndex,
        then_value: NodeIndex,
        else_value: NodeIndex,
    },

    /// `target op value`. `declares_local` marks a new local binding
    /// (`var x = ...`).
    Assignment {
        target: NodeIndex,
        op: AssignOp,
        value: NodeIndex,
        declares_local: bool,
    },

    StringLit { value: String },
    NumberLit { value: f64, text: String },
    BoolLit { value: bool },
    NullLit,

    /// String built from concatenated parts (interpolation).
    InterpString { parts: NodeList },

    ArrayLit { elements: NodeList },

    /// Struct literal; `keys` and `values` are parallel lists.
    StructLit {
        keys: NodeList,
        values: NodeList,
        ordered: bool,
    },

    /// Named-function invocation: `name(args)`.
    FunctionCall { name: String, args: NodeList },

    /// Method invocation: `base.name(args)`, optionally safe.
    MethodCall {
        base: NodeIndex,
        name: String,
        args: NodeList,
        safe: bool,
    },

    /// Static-method invocation: `Class::name(args)`.
    StaticCall {
        class_name: String,
        name: String,
        args: NodeList,
    },

    /// Expression-as-callee invocation: `(expr)(args)`.
    DynamicCall { callee: NodeIndex, args: NodeList },

    /// Object construction: `new class(args)`.
    New { class_name: NodeIndex, args: NodeList },

    /// Named-or-positional invocation argument.
    Arg {
        name: Option<String>,
        value: NodeIndex,
    },

    /// Closure or lambda; `body` is a statement block.
    Closure {
        params: NodeList,
        body: NodeIndex,
        is_lambda: bool,
    },

    /// Closure/function parameter declaration.
    Param {
        name: String,
        default: NodeIndex,
        required: bool,
    },

    // =========================================================================
    // Statements
    // =========================================================================
    /// Compilation-unit root.
    Script { statements: NodeList },

    Block { statements: NodeList },

    /// Expression used in statement position.
    ExprStmt { expr: NodeIndex },

    If {
        cond: NodeIndex,
        then_branch: NodeIndex,
        else_branch: NodeIndex,
    },

    While {
        cond: NodeIndex,
        body: NodeIndex,
        label: Option<String>,
    },

    DoWhile {
        body: NodeIndex,
        cond: NodeIndex,
        label: Option<String>,
    },

    /// Indexed for: `for (init; cond; step) body`. Any of init/cond/step may
    /// be `NONE`.
    ForIndexed {
        init: NodeIndex,
        cond: NodeIndex,
        step: NodeIndex,
        body: NodeIndex,
        label: Option<String>,
    },

    /// Collection for-in: `for (var in source) body`.
    ForIn {
        var: NodeIndex,
        source: NodeIndex,
        body: NodeIndex,
        declares_local: bool,
        label: Option<String>,
    },

    /// `members` holds `Case` nodes; anything else is rejected at lowering.
    Switch {
        subject: NodeIndex,
        members: NodeList,
    },

    /// Switch member. `value == NONE` marks the default clause; `delimiter`
    /// turns the match into delimited-list containment.
    Case {
        value: NodeIndex,
        delimiter: Option<String>,
        body: NodeList,
    },

    Break { label: Option<String> },
    Continue { label: Option<String> },

    /// `value` may be `NONE`.
    Return { value: NodeIndex },

    FunctionDecl {
        name: String,
        params: NodeList,
        body: NodeIndex,
        return_hint: Option<String>,
    },

    /// Tag-like component body with its own result protocol. The body may be
    /// invoked as an ordinary call several frames removed from an enclosing
    /// loop, so exits inside it thread through body-result values.
    ComponentBody { name: String, body: NodeIndex },

    Import {
        name: String,
        alias: Option<String>,
    },
}

impl NodeKind {
    /// A short stable name for diagnostics and serialization.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Ident { .. } => "Ident",
            NodeKind::MemberAccess { .. } => "MemberAccess",
            NodeKind::IndexAccess { .. } => "IndexAccess",
            NodeKind::Binary { .. } => "Binary",
            NodeKind::Compare { .. } => "Compare",
            NodeKind::Unary { .. } => "Unary",
            NodeKind::IncrDecr { .. } => "IncrDecr",
            NodeKind::Ternary { .. } => "Ternary",
            NodeKind::Assignment { .. } => "Assignment",
            NodeKind::StringLit { .. } => "StringLit",
            NodeKind::NumberLit { .. } => "NumberLit",
            NodeKind::BoolLit { .. } => "BoolLit",
            NodeKind::NullLit => "NullLit",
            NodeKind::InterpString { .. } => "InterpString",
            NodeKind::ArrayLit { .. } => "ArrayLit",
            NodeKind::StructLit { .. } => "StructLit",
            NodeKind::FunctionCall { .. } => "FunctionCall",
            NodeKind::MethodCall { .. } => "MethodCall",
            NodeKind::StaticCall { .. } => "StaticCall",
            NodeKind::DynamicCall { .. } => "DynamicCall",
            NodeKind::New { .. } => "New",
            NodeKind::Arg { .. } => "Arg",
            NodeKind::Closure { .. } => "Closure",
            NodeKind::Param { .. } => "Param",
            NodeKind::Script { .. } => "Script",
            NodeKind::Block { .. } => "Block",
            NodeKind::ExprStmt { .. } => "ExprStmt",
            NodeKind::If { .. } => "If",
            NodeKind::While { .. } => "While",
            NodeKind::DoWhile { .. } => "DoWhile",
            NodeKind::ForIndexed { .. } => "ForIndexed",
            NodeKind::ForIn { .. } => "ForIn",
            NodeKind::Switch { .. } => "Switch",
            NodeKind::Case { .. } => "Case",
            NodeKind::Break { .. } => "Break",
            NodeKind::Continue { .. } => "Continue",
            NodeKind::Return { .. } => "Return",
            NodeKind::FunctionDecl { .. } => "FunctionDecl",
            NodeKind::ComponentBody { .. } => "ComponentBody",
            NodeKind::Import { .. } => "Import",
        }
    }

    pub const fn is_statement(&self) -> bool {
        matches!(
            self,
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
                | NodeKind::Import { .. }
        )
    }

    pub const fn is_expression(&self) -> bool {
        !self.is_statement()
    }

    pub const fn is_loop(&self) -> bool {
        matches!(
            self,
            NodeKind::While { .. }
                | NodeKind::DoWhile { .. }
                | NodeKind::ForIndexed { .. }
                | NodeKind::ForIn { .. }
        )
    }

    /// The label carried by a loop kind, if any.
    pub fn loop_label(&self) -> Option<&str> {
        match self {
            NodeKind::While { label, .. }
            | NodeKind::DoWhile { label, .. }
            | NodeKind::ForIndexed { label, .. }
            | NodeKind::ForIn { label, .. } => label.as_deref(),
            _ => None,
        }
    }

    /// Invoke `f` on every declared child slot, in sibling order. `NONE`
    /// slots are passed through so callers see the full slot layout.
    ///
    /// This match is the single exhaustive child-walk both traversal
    /// contracts ride on.
    pub fn for_each_child(&self, mut f: impl FnMut(NodeIndex)) {
        self.for_each_child_impl(&mut f);
    }

    fn for_each_child_impl(&self, f: &mut dyn FnMut(NodeIndex)) {
        fn list(l: &NodeList, f: &mut dyn FnMut(NodeIndex)) {
            for &n in &l.nodes {
                f(n);
            }
        }
        match self {
            NodeKind::Ident { .. }
            | NodeKind::StringLit { .. }
            | NodeKind::NumberLit { .. }
            | NodeKind::BoolLit { .. }
            | NodeKind::NullLit
            | NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Import { .. } => {}
            NodeKind::MemberAccess { base, .. } => f(*base),
            NodeKind::IndexAccess { base, index, .. } => {
                f(*base);
                f(*index);
            }
            NodeKind::Binary { left, right, .. } | NodeKind::Compare { left, right, .. } => {
                f(*left);
                f(*right);
            }
            NodeKind::Unary { operand, .. } | NodeKind::IncrDecr { operand, .. } => f(*operand),
            NodeKind::Ternary {
                cond,
                then_value,
                else_value,
            } => {
                f(*cond);
                f(*then_value);
                f(*else_value);
            }
            NodeKind::Assignment { target, value, .. } => {
                f(*target);
                f(*value);
            }
            NodeKind::InterpString { parts } => list(parts, f),
            NodeKind::ArrayLit { elements } => list(elements, f),
            NodeKind::StructLit { keys, values, .. } => {
                list(keys, f);
                list(values, f);
            }
            NodeKind::FunctionCall { args, .. } | NodeKind::StaticCall { args, .. } => list(args, f),
            NodeKind::MethodCall { base, args, .. } => {
                f(*base);
                list(args, f);
            }
            NodeKind::DynamicCall { callee, args } => {
                f(*callee);
                list(args, f);
            }
            NodeKind::New { class_name, args } => {
                f(*class_name);
                list(args, f);
            }
            NodeKind::Arg { value, .. } => f(*value),
            NodeKind::Closure { params, body, .. } => {
                list(params, f);
                f(*body);
            }
            NodeKind::Param { default, .. } => f(*default),
            NodeKind::Script { statements } | NodeKind::Block { statements } => list(statements, f),
            NodeKind::ExprStmt { expr } => f(*expr),
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                f(*cond);
                f(*then_branch);
                f(*else_branch);
            }
            NodeKind::While { cond, body, .. } => {
                f(*cond);
                f(*body);
            }
            NodeKind::DoWhile { body, cond, .. } => {
                f(*body);
                f(*cond);
            }
            NodeKind::ForIndexed {
                init,
                cond,
                step,
                body,
                ..
            } => {
                f(*init);
                f(*cond);
                f(*step);
                f(*body);
            }
            NodeKind::ForIn {
                var, source, body, ..
            } => {
                f(*var);
                f(*source);
                f(*body);
            }
            NodeKind::Switch { subject, members } => {
                f(*subject);
                list(members, f);
            }
            NodeKind::Case { value, body, .. } => {
                f(*value);
                list(body, f);
            }
            NodeKind::Return { value } => f(*value),
            NodeKind::FunctionDecl { params, body, .. } => {
                list(params, f);
                f(*body);
            }
            NodeKind::ComponentBody { body, .. } => f(*body),
        }
    }

    /// Mutable variant of [`for_each_child`](Self::for_each_child); yields
    /// every child slot for in-place replacement. Kept in lockstep with the
    /// immutable walk.
    pub fn for_each_child_mut(&mut self, mut f: impl FnMut(&mut NodeIndex)) {
        self.for_each_child_mut_impl(&mut f);
    }

    fn for_each_child_mut_impl(&mut self, f: &mut dyn FnMut(&mut NodeIndex)) {
        let mut list = |l: &mut NodeList, f: &mut dyn FnMut(&mut NodeIndex)| {
            for n in &mut l.nodes {
                f(n);
            }
        };
        match self {
            NodeKind::Ident { .. }
            | NodeKind::StringLit { .. }
            | NodeKind::NumberLit { .. }
            | NodeKind::BoolLit { .. }
            | NodeKind::NullLit
            | NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Import { .. } => {}
            NodeKind::MemberAccess { base, .. } => f(base),
            NodeKind::IndexAccess { base, index, .. } => {
                f(base);
                f(index);
            }
            NodeKind::Binary { left, right, .. } | NodeKind::Compare { left, right, .. } => {
                f(left);
                f(right);
            }
            NodeKind::Unary { operand, .. } | NodeKind::IncrDecr { operand, .. } => f(operand),
            NodeKind::Ternary {
                cond,
                then_value,
                else_value,
            } => {
                f(cond);
                f(then_value);
                f(else_value);
            }
            NodeKind::Assignment { target, value, .. } => {
                f(target);
                f(value);
            }
            NodeKind::InterpString { parts } => list(parts, f),
            NodeKind::ArrayLit { elements } => list(elements, f),
            NodeKind::StructLit { keys, values, .. } => {
                list(keys, f);
                list(values, f);
            }
            NodeKind::FunctionCall { args, .. } | NodeKind::StaticCall { args, .. } => {
                list(args, f)
            }
            NodeKind::MethodCall { base, args, .. } => {
                f(base);
                list(args, f);
            }
            NodeKind::DynamicCall { callee, args } => {
                f(callee);
                list(args, f);
            }
            NodeKind::New { class_name, args } => {
                f(class_name);
                list(args, f);
            }
            NodeKind::Arg { value, .. } => f(value),
            NodeKind::Closure { params, body, .. } => {
                list(params, f);
                f(body);
            }
            NodeKind::Param { default, .. } => f(default),
            NodeKind::Script { statements } | NodeKind::Block { statements } => {
                list(statements, f)
            }
            NodeKind::ExprStmt { expr } => f(expr),
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                f(cond);
                f(then_branch);
                f(else_branch);
            }
            NodeKind::While { cond, body, .. } => {
                f(cond);
                f(body);
            }
            NodeKind::DoWhile { body, cond, .. } => {
                f(body);
                f(cond);
            }
            NodeKind::ForIndexed {
                init,
                cond,
                step,
                body,
                ..
            } => {
                f(init);
                f(cond);
                f(step);
                f(body);
            }
            NodeKind::ForIn {
                var, source, body, ..
            } => {
                f(var);
                f(source);
                f(body);
            }
            NodeKind::Switch { subject, members } => {
                f(subject);
                list(members, f);
            }
            NodeKind::Case { value, body, .. } => {
                f(value);
                list(body, f);
            }
            NodeKind::Return { value } => f(value),
            NodeKind::FunctionDecl { params, body, .. } => {
                list(params, f);
                f(body);
            }
            NodeKind::ComponentBody { body, .. } => f(body),
        }
    }

    /// Collect the non-`NONE` children in sibling order.
    pub fn children(&self) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        self.for_each_child(|c| {
            if c.is_some() {
                out.push(c);
            }
        });
        out
    }
}
