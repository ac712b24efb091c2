//! Value conversion between raw cells and typed field values.
//!
//! A [`Converter`] is a pure two-way function between a [`Cell`] and a
//! [`FieldValue`]. The registry resolves the converter for a field with
//! three-tier precedence, applied once at schema-resolution time:
//!
//! 1. the field's named converter reference, if declared;
//! 2. a globally registered converter for the field's [`ValueKind`];
//! 3. the built-in converter for that kind.
//!
//! Global registration is explicit, process-wide state. Registering a
//! converter affects subsequent schema resolutions only; schemas already
//! cached keep the converters they were resolved with until
//! [`reset_converters`] clears both the registry and the schema cache.
//! Callers must not mutate the registry while operations are in flight.

mod builtin;

pub use builtin::{
    BoolConverter, DateConverter, DecimalConverter, FloatConverter, IntConverter, MoneyConverter,
    TextConverter,
};
pub(crate) use builtin::serial_to_date;

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::cell::{Cell, FieldValue, ValueKind};
use crate::config::Config;
use crate::error::{ConvertResult, SchemaError, SchemaResult};

// =============================================================================
// Converter trait
// =============================================================================

/// Context available to a converter: the field's resolved `format` pattern
/// and the effective configuration of the operation.
#[derive(Debug, Clone, Copy)]
pub struct ConvertContext<'a> {
    pub format: Option<&'a str>,
    pub config: &'a Config,
}

/// A pure two-way conversion between raw cells and typed field values.
///
/// Implementations must be stateless with respect to their inputs: the same
/// cell, format, and configuration always convert to the same value.
pub trait Converter: Send + Sync {
    /// Parse a raw cell into a typed value. The engine only calls this for
    /// non-blank cells (and for textual default values), but implementations
    /// should map blank input to the appropriate `None` value anyway.
    fn from_cell(&self, cell: &Cell, ctx: &ConvertContext<'_>) -> ConvertResult<FieldValue>;

    /// Render a typed value as a raw cell. A `None` value encodes to
    /// [`Cell::Empty`] in all built-in converters; custom converters may
    /// choose a different representation.
    fn to_cell(&self, value: &FieldValue, ctx: &ConvertContext<'_>) -> ConvertResult<Cell>;
}

impl std::fmt::Debug for dyn Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Converter")
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
struct Registry {
    by_kind: HashMap<ValueKind, Arc<dyn Converter>>,
    named: HashMap<String, Arc<dyn Converter>>,
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::default()));

/// Register a global converter for every field of the given kind that does
/// not declare its own converter reference.
pub fn register_converter(kind: ValueKind, converter: Arc<dyn Converter>) {
    REGISTRY
        .write()
        .expect("converter registry lock poisoned")
        .by_kind
        .insert(kind, converter);
}

/// Register a converter under a name so fields can reference it via
/// [`FieldSpec::converter`](crate::schema::FieldSpec::converter).
pub fn register_named_converter(name: impl Into<String>, converter: Arc<dyn Converter>) {
    REGISTRY
        .write()
        .expect("converter registry lock poisoned")
        .named
        .insert(name.into(), converter);
}

/// Remove all global and named registrations and invalidate the schema
/// cache, so later resolutions see built-ins only.
///
/// Reset is total: named converters are wiped along with the per-kind
/// overrides, so fields that reference a converter by name fail resolution
/// with [`SchemaError::UnknownConverter`] until it is registered again.
pub fn reset_converters() {
    {
        let mut reg = REGISTRY.write().expect("converter registry lock poisoned");
        reg.by_kind.clear();
        reg.named.clear();
    }
    crate::schema::clear_schema_cache();
}

/// Resolve the converter for one field. Called by the schema resolver; the
/// result is captured in the resolved schema.
pub(crate) fn resolve_converter(
    kind: ValueKind,
    field_ref: Option<&str>,
) -> SchemaResult<Arc<dyn Converter>> {
    let reg = REGISTRY.read().expect("converter registry lock poisoned");

    if let Some(name) = field_ref {
        return reg
            .named
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownConverter(name.to_string()));
    }

    if let Some(conv) = reg.by_kind.get(&kind) {
        return Ok(conv.clone());
    }

    Ok(builtin::builtin(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;

    /// Converter that upper-cases text, used to observe precedence.
    struct UpperConverter;

    impl Converter for UpperConverter {
        fn from_cell(&self, cell: &Cell, _ctx: &ConvertContext<'_>) -> ConvertResult<FieldValue> {
            Ok(FieldValue::Text(Some(cell.to_text().to_uppercase())))
        }

        fn to_cell(&self, value: &FieldValue, _ctx: &ConvertContext<'_>) -> ConvertResult<Cell> {
            match value {
                FieldValue::Text(Some(s)) => Ok(Cell::Text(s.to_uppercase())),
                FieldValue::Text(None) => Ok(Cell::Empty),
                other => Err(ConvertError::other(format!(
                    "expected text value, got {}",
                    other.kind()
                ))),
            }
        }
    }

    #[test]
    fn test_builtin_fallback() {
        reset_converters();
        let config = Config::default();
        let ctx = ConvertContext {
            format: None,
            config: &config,
        };
        let conv = resolve_converter(ValueKind::Text, None).unwrap();
        let v = conv.from_cell(&Cell::Text("hello".into()), &ctx).unwrap();
        assert_eq!(v, FieldValue::Text(Some("hello".into())));
    }

    #[test]
    fn test_global_registration_overrides_builtin() {
        reset_converters();
        register_converter(ValueKind::Text, Arc::new(UpperConverter));

        let config = Config::default();
        let ctx = ConvertContext {
            format: None,
            config: &config,
        };
        let conv = resolve_converter(ValueKind::Text, None).unwrap();
        let v = conv.from_cell(&Cell::Text("hello".into()), &ctx).unwrap();
        assert_eq!(v, FieldValue::Text(Some("HELLO".into())));

        reset_converters();
        let conv = resolve_converter(ValueKind::Text, None).unwrap();
        let v = conv.from_cell(&Cell::Text("hello".into()), &ctx).unwrap();
        assert_eq!(v, FieldValue::Text(Some("hello".into())));
    }

    #[test]
    fn test_named_reference_beats_global() {
        reset_converters();
        register_named_converter("upper", Arc::new(UpperConverter));

        let config = Config::default();
        let ctx = ConvertContext {
            format: None,
            config: &config,
        };
        let conv = resolve_converter(ValueKind::Text, Some("upper")).unwrap();
        let v = conv.from_cell(&Cell::Text("abc".into()), &ctx).unwrap();
        assert_eq!(v, FieldValue::Text(Some("ABC".into())));

        reset_converters();
    }

    #[test]
    fn test_unknown_named_reference_fails_fast() {
        reset_converters();
        let err = resolve_converter(ValueKind::Text, Some("missing")).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownConverter(ref n) if n == "missing"));
    }

    #[test]
    fn test_reset_wipes_named_registrations() {
        reset_converters();
        register_named_converter("shout", Arc::new(UpperConverter));
        assert!(resolve_converter(ValueKind::Text, Some("shout")).is_ok());

        reset_converters();
        let err = resolve_converter(ValueKind::Text, Some("shout")).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownConverter(ref n) if n == "shout"));
    }
}
