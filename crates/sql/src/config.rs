//! Configuration snapshot consumed during resolution and rebuild
//!
//! Resolution is a pure function of (tree, context); everything configurable
//! (render templates, cast templates, custom-function signatures, formatting
//! flags) is carried in an immutable `ConfigSnapshot` inside the context.
//! The cross-statement `ConfigStore` hands out snapshot clones and supports
//! replacing the snapshot wholesale, so concurrent readers never observe a
//! partial update.

use crate::types::{TypeCode, TypeDescriptor};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Type-class groups used by custom-function signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Character,
    DateTime,
    Numeric,
    Integer,
    Boolean,
    Spatial,
    Any,
}

impl TypeClass {
    pub fn matches(&self, ty: &TypeDescriptor) -> bool {
        match self {
            TypeClass::Character => ty.is_character(),
            TypeClass::DateTime => ty.is_date_time(),
            TypeClass::Numeric => ty.is_numeric(),
            TypeClass::Integer => ty.is_integer(),
            TypeClass::Boolean => ty.code == TypeCode::Boolean,
            TypeClass::Spatial => ty.is_spatial(),
            TypeClass::Any => true,
        }
    }
}

/// One overload of a configuration-registered user function.
#[derive(Debug, Clone)]
pub struct CustomSignature {
    pub param_classes: Vec<TypeClass>,
    pub return_type: TypeDescriptor,
}

impl CustomSignature {
    pub fn param_count(&self) -> usize {
        self.param_classes.len()
    }
}

/// Immutable view of the configuration store.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    /// Render templates keyed by uppercase function name. Placeholders
    /// `{0}`, `{1}`, ... are replaced by the rendered arguments.
    function_templates: HashMap<String, String>,
    /// Cast templates keyed by (source, target) type code. `{0}` is the
    /// rendered source expression, `{1}` the target type's SQL name.
    cast_templates: HashMap<(TypeCode, TypeCode), String>,
    /// Fallback cast template when no pair-specific entry exists. When this
    /// is also absent a cast render fails with `UnsupportedCast`.
    default_cast_template: Option<String>,
    /// User-function signatures keyed by (uppercase name, overload index).
    custom_functions: HashMap<(String, u32), CustomSignature>,
    /// Separator between rendered function arguments.
    pub argument_separator: String,
    /// Render interval literals without their quotes.
    pub strip_interval_quotes: bool,
    /// Quote character for identifiers.
    pub identifier_quote: char,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            function_templates: HashMap::new(),
            cast_templates: HashMap::new(),
            default_cast_template: Some("CAST({0} AS {1})".to_string()),
            custom_functions: HashMap::new(),
            argument_separator: ", ".to_string(),
            strip_interval_quotes: false,
            identifier_quote: '"',
        }
    }
}

impl ConfigSnapshot {
    pub fn function_template(&self, name: &str) -> Option<&str> {
        self.function_templates
            .get(&name.to_uppercase())
            .map(|s| s.as_str())
    }

    pub fn set_function_template(&mut self, name: &str, template: impl Into<String>) {
        self.function_templates
            .insert(name.to_uppercase(), template.into());
    }

    pub fn cast_template(&self, source: TypeCode, target: TypeCode) -> Option<&str> {
        self.cast_templates
            .get(&(source, target))
            .map(|s| s.as_str())
            .or(self.default_cast_template.as_deref())
    }

    pub fn set_cast_template(
        &mut self,
        source: TypeCode,
        target: TypeCode,
        template: impl Into<String>,
    ) {
        self.cast_templates.insert((source, target), template.into());
    }

    pub fn clear_default_cast_template(&mut self) {
        self.default_cast_template = None;
    }

    pub fn custom_function(&self, name: &str, index: u32) -> Option<&CustomSignature> {
        self.custom_functions.get(&(name.to_uppercase(), index))
    }

    pub fn register_custom_function(&mut self, name: &str, index: u32, sig: CustomSignature) {
        self.custom_functions.insert((name.to_uppercase(), index), sig);
    }

    /// Apply a `{n}`-placeholder template.
    pub fn apply_template(template: &str, args: &[String]) -> String {
        let mut out = template.to_string();
        for (i, arg) in args.iter().enumerate() {
            out = out.replace(&format!("{{{}}}", i), arg);
        }
        out
    }
}

/// Shared, reloadable configuration. Readers take a snapshot once per
/// statement; reloads swap the whole `Arc` so in-flight statements keep the
/// snapshot they started with.
pub struct ConfigStore {
    inner: RwLock<Arc<ConfigSnapshot>>,
}

impl ConfigStore {
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            inner: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.inner.read().clone()
    }

    pub fn replace(&self, snapshot: ConfigSnapshot) {
        *self.inner.write() = Arc::new(snapshot);
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(ConfigSnapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeCode;

    #[test]
    fn template_placeholders() {
        let out = ConfigSnapshot::apply_template(
            "DECODE({0}, {1})",
            &["a".to_string(), "b".to_string()],
        );
        assert_eq!(out, "DECODE(a, b)");
    }

    #[test]
    fn pair_specific_cast_template_wins_over_default() {
        let mut config = ConfigSnapshot::default();
        config.set_cast_template(TypeCode::Int, TypeCode::VarChar, "TO_CHAR({0})");
        assert_eq!(
            config.cast_template(TypeCode::Int, TypeCode::VarChar),
            Some("TO_CHAR({0})")
        );
        assert_eq!(
            config.cast_template(TypeCode::Int, TypeCode::BigInt),
            Some("CAST({0} AS {1})")
        );
    }

    #[test]
    fn store_replaces_snapshot_atomically() {
        let store = ConfigStore::default();
        let before = store.snapshot();
        let mut next = ConfigSnapshot::default();
        next.strip_interval_quotes = true;
        store.replace(next);
        assert!(!before.strip_interval_quotes);
        assert!(store.snapshot().strip_interval_quotes);
    }
}
