//! The per-unit entry point.
//!
//! `lower_unit` lowers one compilation unit top to bottom and packages the
//! result for the backend emitter: the ordered fragment sequence of the unit
//! body plus the side tables collected along the way (referenced key
//! constants, generated callables, import declarations).

use crate::engine::lower_stmt;
use crate::error::LowerResult;
use crate::ir::Fragment;
use crate::session::{ImportDecl, LoweringSession, NestedCallable};
use cinder_ast::{NodeArena, NodeIndex, NodeKind};
use rustc_hash::FxHashMap;

/// Per-unit configuration resolved before lowering starts. Values are
/// opaque strings; the engine checks presence only.
#[derive(Clone, Debug, Default)]
pub struct UnitConfig {
    props: FxHashMap<String, String>,
}

impl UnitConfig {
    pub const KEY_NAME: &'static str = "unit.name";
    pub const KEY_BASE: &'static str = "unit.base";
    pub const KEY_RETURN_HINT: &'static str = "unit.returnHint";
    pub const KEY_DIALECT: &'static str = "unit.dialect";

    pub fn new() -> UnitConfig {
        UnitConfig::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.props.contains_key(key)
    }

    /// Target class/unit name.
    pub fn unit_name(&self) -> Option<&str> {
        self.get(Self::KEY_NAME)
    }

    /// Declared base/supertype.
    pub fn base_type(&self) -> Option<&str> {
        self.get(Self::KEY_BASE)
    }

    /// Declared return-type hint.
    pub fn return_hint(&self) -> Option<&str> {
        self.get(Self::KEY_RETURN_HINT)
    }

    /// Source dialect tag.
    pub fn dialect(&self) -> Option<&str> {
        self.get(Self::KEY_DIALECT)
    }
}

/// One fully lowered compilation unit, ready for the backend emitter.
#[derive(Clone, Debug, PartialEq)]
pub struct LoweredUnit {
    pub name: String,
    /// Ordered fragment sequence of the unit body.
    pub fragments: Vec<Fragment>,
    /// String keys referenced by the emitted fragments, first-use order.
    pub key_constants: Vec<String>,
    /// Callables generated during lowering (closures, declared functions,
    /// component bodies).
    pub nested_callables: Vec<NestedCallable>,
    pub imports: Vec<ImportDecl>,
}

/// Lower a whole compilation unit rooted at `root`.
///
/// Errors propagate uncaught: a construct that cannot be lowered fails the
/// unit, nothing partial is returned.
pub fn lower_unit(
    arena: &NodeArena,
    root: NodeIndex,
    config: &UnitConfig,
) -> LowerResult<LoweredUnit> {
    let name = config.unit_name().unwrap_or("unit").to_string();
    tracing::debug!("[lowering] unit start: {name}");

    let mut session = LoweringSession::new();
    let fragments = match arena.kind(root) {
        NodeKind::Script { statements } => {
            let statements = statements.clone();
            let mut frags = Vec::with_capacity(statements.len());
            for stmt in statements.iter() {
                frags.push(lower_stmt(arena, &mut session, stmt)?);
            }
            frags
        }
        _ => vec![lower_stmt(arena, &mut session, root)?],
    };

    let (key_constants, nested_callables, imports) = session.into_side_tables();
    tracing::debug!(
        "[lowering] unit done: {name}, {} fragments, {} callables",
        fragments.len(),
        nested_callables.len()
    );
    Ok(LoweredUnit {
        name,
        fragments,
        key_constants,
        nested_callables,
        imports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_accessors_read_known_keys() {
        let mut config = UnitConfig::new();
        config
            .set(UnitConfig::KEY_NAME, "orders")
            .set(UnitConfig::KEY_DIALECT, "script");
        assert_eq!(config.unit_name(), Some("orders"));
        assert_eq!(config.dialect(), Some("script"));
        assert!(config.base_type().is_none());
        assert!(!config.contains(UnitConfig::KEY_RETURN_HINT));
    }
}
