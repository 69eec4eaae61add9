//! Generic structural serialization.
//!
//! Dumps a subtree as a key→value map for debugging and tooling: child
//! nodes recurse, node lists become arrays, and operator enums serialize as
//! a name+symbol pair. Not on the lowering hot path.

use crate::arena::NodeArena;
use crate::base::{NodeIndex, NodeList};
use crate::node::NodeKind;
use serde_json::{Map, Value, json};

/// Serialize the subtree rooted at `idx`.
pub fn to_value(arena: &NodeArena, idx: NodeIndex) -> Value {
    let Some(node) = arena.get(idx) else {
        return Value::Null;
    };

    let mut map = Map::new();
    map.insert("kind".into(), json!(node.kind.kind_name()));
    map.insert("pos".into(), json!(node.span.pos));
    map.insert("end".into(), json!(node.span.end));

    let child = |idx: NodeIndex| to_value(arena, idx);
    let children = |list: &NodeList| -> Value {
        Value::Array(list.iter().map(|n| to_value(arena, n)).collect())
    };
    let op = |name: &str, symbol: &str| json!({ "name": name, "symbol": symbol });

    match &node.kind {
        NodeKind::Ident { name } => {
            map.insert("name".into(), json!(name));
        }
        NodeKind::MemberAccess { base, name, safe } => {
            map.insert("base".into(), child(*base));
            map.insert("name".into(), json!(name));
            map.insert("safe".into(), json!(safe));
        }
        NodeKind::IndexAccess { base, index, safe } => {
            map.insert("base".into(), child(*base));
            map.insert("index".into(), child(*index));
            map.insert("safe".into(), json!(safe));
        }
        NodeKind::Binary { op: o, left, right } => {
            map.insert("operator".into(), op(o.name(), o.symbol()));
            map.insert("left".into(), child(*left));
            map.insert("right".into(), child(*right));
        }
        NodeKind::Compare { op: o, left, right } => {
            map.insert("operator".into(), op(o.name(), o.symbol()));
            map.insert("left".into(), child(*left));
            map.insert("right".into(), child(*right));
        }
        NodeKind::Unary { op: o, operand } => {
            map.insert("operator".into(), op(o.name(), o.symbol()));
            map.insert("operand".into(), child(*operand));
        }
        NodeKind::IncrDecr {
            op: o,
            operand,
            prefix,
        } => {
            map.insert("operator".into(), op(o.name(), o.symbol()));
            map.insert("operand".into(), child(*operand));
            map.insert("prefix".into(), json!(prefix));
        }
        NodeKind::Ternary {
            cond,
            then_value,
            else_value,
        } => {
            map.insert("cond".into(), child(*cond));
            map.insert("then".into(), child(*then_value));
            map.insert("else".into(), child(*else_value));
        }
        NodeKind::Assignment {
            target,
            op: o,
            value,
            declares_local,
        } => {
            map.insert("target".into(), child(*target));
            map.insert("operator".into(), op(o.name(), o.symbol()));
            map.insert("value".into(), child(*value));
            map.insert("declaresLocal".into(), json!(declares_local));
        }
        NodeKind::StringLit { value } => {
            map.insert("value".into(), json!(value));
        }
        NodeKind::NumberLit { value, text } => {
            map.insert("value".into(), json!(value));
            map.insert("text".into(), json!(text));
        }
        NodeKind::BoolLit { value } => {
            map.insert("value".into(), json!(value));
        }
        NodeKind::NullLit => {}
        NodeKind::InterpString { parts } => {
            map.insert("parts".into(), children(parts));
        }
        NodeKind::ArrayLit { elements } => {
            map.insert("elements".into(), children(elements));
        }
        NodeKind::StructLit {
            keys,
            values,
            ordered,
        } => {
            map.insert("keys".into(), children(keys));
            map.insert("values".into(), children(values));
            map.insert("ordered".into(), json!(ordered));
        }
        NodeKind::FunctionCall { name, args } => {
            map.insert("name".into(), json!(name));
            map.insert("args".into(), children(args));
        }
        NodeKind::MethodCall {
            base,
            name,
            args,
            safe,
        } => {
            map.insert("base".into(), child(*base));
            map.insert("name".into(), json!(name));
            map.insert("args".into(), children(args));
            map.insert("safe".into(), json!(safe));
        }
        NodeKind::StaticCall {
            class_name,
            name,
            args,
        } => {
            map.insert("class".into(), json!(class_name));
            map.insert("name".into(), json!(name));
            map.insert("args".into(), children(args));
        }
        NodeKind::DynamicCall { callee, args } => {
            map.insert("callee".into(), child(*callee));
            map.insert("args".into(), children(args));
        }
        NodeKind::New { class_name, args } => {
            map.insert("class".into(), child(*class_name));
            map.insert("args".into(), children(args));
        }
        NodeKind::Arg { name, value } => {
            map.insert("name".into(), json!(name));
            map.insert("value".into(), child(*value));
        }
        NodeKind::Closure {
            params,
            body,
            is_lambda,
        } => {
            map.insert("params".into(), children(params));
            map.insert("body".into(), child(*body));
            map.insert("lambda".into(), json!(is_lambda));
        }
        NodeKind::Param {
            name,
            default,
            required,
        } => {
            map.insert("name".into(), json!(name));
            map.insert("default".into(), child(*default));
            map.insert("required".into(), json!(required));
        }
        NodeKind::Script { statements } | NodeKind::Block { statements } => {
            map.insert("statements".into(), children(statements));
        }
        NodeKind::ExprStmt { expr } => {
            map.insert("expr".into(), child(*expr));
        }
        NodeKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            map.insert("cond".into(), child(*cond));
            map.insert("then".into(), child(*then_branch));
            map.insert("else".into(), child(*else_branch));
        }
        NodeKind::While { cond, body, label } => {
            map.insert("cond".into(), child(*cond));
            map.insert("body".into(), child(*body));
            map.insert("label".into(), json!(label));
        }
        NodeKind::DoWhile { body, cond, label } => {
            map.insert("body".into(), child(*body));
            map.insert("cond".into(), child(*cond));
            map.insert("label".into(), json!(label));
        }
        NodeKind::ForIndexed {
            init,
            cond,
            step,
            body,
            label,
        } => {
            map.insert("init".into(), child(*init));
            map.insert("cond".into(), child(*cond));
            map.insert("step".into(), child(*step));
            map.insert("body".into(), child(*body));
            map.insert("label".into(), json!(label));
        }
        NodeKind::ForIn {
            var,
            source,
            body,
            declares_local,
            label,
        } => {
            map.insert("var".into(), child(*var));
            map.insert("source".into(), child(*source));
            map.insert("body".into(), child(*body));
            map.insert("declaresLocal".into(), json!(declares_local));
            map.insert("label".into(), json!(label));
        }
        NodeKind::Switch { subject, members } => {
            map.insert("subject".into(), child(*subject));
            map.insert("members".into(), children(members));
        }
        NodeKind::Case {
            value,
            delimiter,
            body,
        } => {
            map.insert("value".into(), child(*value));
            map.insert("delimiter".into(), json!(delimiter));
            map.insert("body".into(), children(body));
        }
        NodeKind::Break { label } | NodeKind::Continue { label } => {
            map.insert("label".into(), json!(label));
        }
        NodeKind::Return { value } => {
            map.insert("value".into(), child(*value));
        }
        NodeKind::FunctionDecl {
            name,
            params,
            body,
            return_hint,
        } => {
            map.insert("name".into(), json!(name));
            map.insert("params".into(), children(params));
            map.insert("body".into(), child(*body));
            map.insert("returnHint".into(), json!(return_hint));
        }
        NodeKind::ComponentBody { name, body } => {
            map.insert("name".into(), json!(name));
            map.insert("body".into(), child(*body));
        }
        NodeKind::Import { name, alias } => {
            map.insert("name".into(), json!(name));
            map.insert("alias".into(), json!(alias));
        }
    }

    Value::Object(map)
}
