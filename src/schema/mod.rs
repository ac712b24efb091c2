//! Field metadata and column schema resolution.
//!
//! A record type declares its column bindings as a list of [`FieldSpec`]s —
//! the explicit, inspectable equivalent of per-field annotations. The
//! resolver turns that declaration into an ordered, immutable
//! [`ColumnSchema`]: one authoritative column list with finalized positions
//! and the converter each column will use.
//!
//! Resolution is idempotent and side-effect-free, so results are cached per
//! record type and shared across concurrent operations.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::cell::{FieldValue, ValueKind};
use crate::convert::{resolve_converter, Converter};
use crate::error::{SchemaError, SchemaResult};

// =============================================================================
// FieldSpec
// =============================================================================

/// Declarative binding of one record field to one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Display header for the column.
    pub name: String,

    /// Semantic type of the field, used for converter dispatch.
    pub kind: ValueKind,

    /// Explicit 0-based column position. Unset fields take the lowest unused
    /// positions in declaration order.
    #[serde(default)]
    pub index: Option<usize>,

    /// Fail the row when the cell is empty and no default applies.
    #[serde(default)]
    pub required: bool,

    /// Raw (pre-conversion) fallback for empty cells.
    #[serde(default)]
    pub default_value: Option<String>,

    /// Pattern used by the date and numeric converters.
    #[serde(default)]
    pub format: Option<String>,

    /// Exclude the field from both read and write.
    #[serde(default)]
    pub ignored: bool,

    /// Column width hint in characters; write-only, adapter concern.
    #[serde(default)]
    pub width: Option<usize>,

    /// Name of a registered converter to use instead of the kind's default.
    #[serde(default)]
    pub converter: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            index: None,
            required: false,
            default_value: None,
            format: None,
            ignored: false,
            width: None,
            converter: None,
        }
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn format(mut self, pattern: impl Into<String>) -> Self {
        self.format = Some(pattern.into());
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn width(mut self, chars: usize) -> Self {
        self.width = Some(chars);
        self
    }

    pub fn converter(mut self, name: impl Into<String>) -> Self {
        self.converter = Some(name.into());
        self
    }
}

// =============================================================================
// Record trait
// =============================================================================

/// A type that maps to and from one tabular row.
///
/// `fields`, `values`, and `from_values` all use the same declaration order,
/// including ignored fields. Ignored fields never reach storage: `values`
/// output for them is discarded on write and `from_values` receives their
/// null value on read.
pub trait Record: Sized {
    /// Stable identifier for this record type; the schema cache key.
    const TYPE_NAME: &'static str;

    /// Column declarations, in declaration order.
    fn fields() -> Vec<FieldSpec>;

    /// Current field values, in declaration order.
    fn values(&self) -> Vec<FieldValue>;

    /// Rebuild a record from decoded values, in declaration order.
    fn from_values(values: Vec<FieldValue>) -> Self;
}

// =============================================================================
// ColumnSchema
// =============================================================================

/// One resolved column: its spec, final position, declaration slot, and the
/// converter chosen for it at resolution time.
#[derive(Debug)]
pub struct Column {
    pub spec: FieldSpec,
    /// Final 0-based column position in storage.
    pub position: usize,
    /// Index into the record type's declaration order.
    pub(crate) decl_index: usize,
    pub(crate) converter: Arc<dyn Converter>,
}

/// The resolved, ordered column layout of one record type. Immutable once
/// built; shared behind an `Arc` across concurrent operations.
#[derive(Debug)]
pub struct ColumnSchema {
    type_name: String,
    /// Columns sorted by ascending position.
    columns: Vec<Column>,
    /// Kinds of every declared field (ignored included), declaration order.
    decl_kinds: Vec<ValueKind>,
}

impl ColumnSchema {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of cells a written row spans: highest position plus one.
    /// Explicit indexes may leave gaps, which encode as empty cells.
    pub fn row_width(&self) -> usize {
        self.columns.last().map(|c| c.position + 1).unwrap_or(0)
    }

    /// Header names by position; gap positions get empty names.
    pub fn header_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.row_width()];
        for col in &self.columns {
            names[col.position] = col.spec.name.clone();
        }
        names
    }

    /// Width hints by position.
    pub fn widths(&self) -> Vec<Option<usize>> {
        let mut widths = vec![None; self.row_width()];
        for col in &self.columns {
            widths[col.position] = col.spec.width;
        }
        widths
    }

    /// Null values for every declared field, declaration order. The decode
    /// starting point: ignored and absent fields stay at these values.
    pub(crate) fn blank_values(&self) -> Vec<FieldValue> {
        self.decl_kinds.iter().map(|k| FieldValue::none(*k)).collect()
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Build a schema from explicit field declarations. Used directly when no
/// record type exists (e.g. a field-spec file driving the CLI validator);
/// typed resolution via [`resolve`] adds caching on top.
pub fn resolve_fields(
    type_name: impl Into<String>,
    fields: Vec<FieldSpec>,
) -> SchemaResult<ColumnSchema> {
    let type_name = type_name.into();
    let decl_kinds: Vec<ValueKind> = fields.iter().map(|f| f.kind).collect();

    let eligible: Vec<(usize, &FieldSpec)> = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.ignored)
        .collect();

    if eligible.is_empty() {
        return Err(SchemaError::NoColumns(type_name));
    }

    // Explicit indexes claim their positions first.
    let mut placed: BTreeMap<usize, usize> = BTreeMap::new();
    for (decl_index, spec) in &eligible {
        if let Some(index) = spec.index {
            if let Some(&prev) = placed.get(&index) {
                return Err(SchemaError::DuplicateIndex {
                    first: fields[prev].name.clone(),
                    second: spec.name.clone(),
                    index,
                });
            }
            placed.insert(index, *decl_index);
        }
    }

    // Remaining fields fill the lowest unused positions in declaration order.
    let mut next = 0usize;
    for (decl_index, spec) in &eligible {
        if spec.index.is_none() {
            while placed.contains_key(&next) {
                next += 1;
            }
            placed.insert(next, *decl_index);
            next += 1;
        }
    }

    let mut columns = Vec::with_capacity(placed.len());
    for (position, decl_index) in placed {
        let spec = fields[decl_index].clone();
        let converter = resolve_converter(spec.kind, spec.converter.as_deref())?;
        columns.push(Column {
            spec,
            position,
            decl_index,
            converter,
        });
    }

    Ok(ColumnSchema {
        type_name,
        columns,
        decl_kinds,
    })
}

static CACHE: Lazy<RwLock<HashMap<&'static str, Arc<ColumnSchema>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Resolve (or fetch the cached) schema for a record type.
///
/// Concurrent first resolutions may both compute; the first insert wins and
/// all callers converge on the shared value.
pub fn resolve<T: Record>() -> SchemaResult<Arc<ColumnSchema>> {
    if let Some(schema) = CACHE
        .read()
        .expect("schema cache lock poisoned")
        .get(T::TYPE_NAME)
    {
        return Ok(schema.clone());
    }

    let schema = Arc::new(resolve_fields(T::TYPE_NAME, T::fields())?);
    tracing::debug!(
        record = T::TYPE_NAME,
        columns = schema.len(),
        "resolved column schema"
    );

    let mut cache = CACHE.write().expect("schema cache lock poisoned");
    Ok(cache.entry(T::TYPE_NAME).or_insert(schema).clone())
}

/// Drop all cached schemas. Called by converter-registry reset so stale
/// converter choices cannot outlive an explicit reset.
pub(crate) fn clear_schema_cache() {
    CACHE.write().expect("schema cache lock poisoned").clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> FieldSpec {
        FieldSpec::new(name, ValueKind::Text)
    }

    #[test]
    fn test_implicit_positions_follow_declaration_order() {
        let schema = resolve_fields("T", vec![spec("a"), spec("b"), spec("c")]).unwrap();
        let positions: Vec<(String, usize)> = schema
            .columns()
            .iter()
            .map(|c| (c.spec.name.clone(), c.position))
            .collect();
        assert_eq!(
            positions,
            vec![("a".into(), 0), ("b".into(), 1), ("c".into(), 2)]
        );
    }

    #[test]
    fn test_explicit_index_takes_priority() {
        // "last" is declared last but claims position 0.
        let schema = resolve_fields(
            "T",
            vec![spec("a"), spec("b"), spec("last").index(0)],
        )
        .unwrap();
        let names = schema.header_names();
        assert_eq!(names, vec!["last", "a", "b"]);
    }

    #[test]
    fn test_sparse_explicit_index() {
        let schema = resolve_fields("T", vec![spec("a"), spec("far").index(5)]).unwrap();
        assert_eq!(schema.row_width(), 6);
        let names = schema.header_names();
        assert_eq!(names[0], "a");
        assert_eq!(names[5], "far");
        assert_eq!(names[3], "");
    }

    #[test]
    fn test_duplicate_explicit_index_fails() {
        let err =
            resolve_fields("T", vec![spec("a").index(2), spec("b").index(2)]).unwrap_err();
        match err {
            SchemaError::DuplicateIndex {
                first,
                second,
                index,
            } => {
                assert_eq!(first, "a");
                assert_eq!(second, "b");
                assert_eq!(index, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ignored_fields_never_consume_slots() {
        let schema = resolve_fields(
            "T",
            vec![spec("a"), spec("hidden").ignored(), spec("b")],
        )
        .unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.header_names(), vec!["a", "b"]);
        // Declaration slots still cover the ignored field.
        assert_eq!(schema.blank_values().len(), 3);
    }

    #[test]
    fn test_all_ignored_is_an_error() {
        let err = resolve_fields("Empty", vec![spec("x").ignored()]).unwrap_err();
        assert!(matches!(err, SchemaError::NoColumns(ref n) if n == "Empty"));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let fields = || {
            vec![
                spec("a").index(3),
                spec("b"),
                spec("c").index(0),
                spec("d"),
            ]
        };
        let first = resolve_fields("T", fields()).unwrap();
        let second = resolve_fields("T", fields()).unwrap();
        let layout = |s: &ColumnSchema| {
            s.columns()
                .iter()
                .map(|c| (c.spec.name.clone(), c.position))
                .collect::<Vec<_>>()
        };
        assert_eq!(layout(&first), layout(&second));
        // Implicit fields fill the holes left by explicit indexes.
        assert_eq!(first.header_names(), vec!["c", "b", "d", "a"]);
    }

    #[test]
    fn test_typed_resolve_caches() {
        struct Pair {
            left: Option<String>,
            right: Option<String>,
        }

        impl Record for Pair {
            const TYPE_NAME: &'static str = "schema_tests::Pair";

            fn fields() -> Vec<FieldSpec> {
                vec![
                    FieldSpec::new("Left", ValueKind::Text),
                    FieldSpec::new("Right", ValueKind::Text),
                ]
            }

            fn values(&self) -> Vec<FieldValue> {
                vec![
                    FieldValue::Text(self.left.clone()),
                    FieldValue::Text(self.right.clone()),
                ]
            }

            fn from_values(values: Vec<FieldValue>) -> Self {
                let mut it = values.into_iter();
                Self {
                    left: it.next().and_then(FieldValue::into_text),
                    right: it.next().and_then(FieldValue::into_text),
                }
            }
        }

        let first = resolve::<Pair>().unwrap();
        let second = resolve::<Pair>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
