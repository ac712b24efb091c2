//! Row codec: converts one storage row to one typed record and back.
//!
//! Decoding walks the schema in position order. For each column: read the
//! cell at that position (a short row reads as empty cells); an empty cell
//! takes the field's default value if one is declared; a still-empty
//! required field is an error; everything else goes through the column's
//! converter. The plain [`decode_row`] is all-or-nothing at row level, while
//! [`decode_fields`] exposes every individual field failure for the
//! validator's row-continues-but-is-marked-invalid mode.

use crate::cell::{Cell, FieldValue};
use crate::config::Config;
use crate::convert::ConvertContext;
use crate::error::{ConvertResult, RowError};
use crate::schema::{ColumnSchema, Record};

/// Encode one record as an ordered row of raw cells. The cell at schema
/// position `i` is the converter output for that column; gap positions from
/// sparse explicit indexes stay empty.
pub fn encode_row<T: Record>(
    record: &T,
    schema: &ColumnSchema,
    config: &Config,
) -> ConvertResult<Vec<Cell>> {
    let values = record.values();
    let mut cells = vec![Cell::Empty; schema.row_width()];

    for col in schema.columns() {
        let value = values
            .get(col.decl_index)
            .cloned()
            .unwrap_or_else(|| FieldValue::none(col.spec.kind));
        let ctx = ConvertContext {
            format: col.spec.format.as_deref(),
            config,
        };
        cells[col.position] = col.converter.to_cell(&value, &ctx)?;
    }

    Ok(cells)
}

/// Decode one row into a record, failing on the first field error.
pub fn decode_row<T: Record>(
    cells: &[Cell],
    row: usize,
    schema: &ColumnSchema,
    config: &Config,
) -> Result<T, RowError> {
    let (values, errors) = decode_fields(cells, row, schema, config);
    match errors.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(T::from_values(values)),
    }
}

/// Per-field decode shared by the plain read path and the validator.
///
/// Returns the decoded values in declaration order (ignored and failed
/// fields stay at their null value) together with every field error, each
/// carrying the column display name and offending raw value.
pub fn decode_fields(
    cells: &[Cell],
    row: usize,
    schema: &ColumnSchema,
    config: &Config,
) -> (Vec<FieldValue>, Vec<RowError>) {
    let mut values = schema.blank_values();
    let mut errors = Vec::new();

    for col in schema.columns() {
        let cell = cells.get(col.position).cloned().unwrap_or(Cell::Empty);
        let ctx = ConvertContext {
            format: col.spec.format.as_deref(),
            config,
        };

        let effective = if cell.is_blank(config.trim_values) {
            match &col.spec.default_value {
                Some(raw) => Cell::Text(raw.clone()),
                None => {
                    if col.spec.required {
                        errors.push(RowError::new(
                            row,
                            &col.spec.name,
                            "required field missing",
                        ));
                    }
                    continue;
                }
            }
        } else {
            cell
        };

        match col.converter.from_cell(&effective, &ctx) {
            Ok(value) => values[col.decl_index] = value,
            Err(err) => {
                errors.push(
                    RowError::new(row, &col.spec.name, err.to_string())
                        .with_value(effective.to_text()),
                );
            }
        }
    }

    (values, errors)
}

/// Whether every cell of the row is blank. Governs the configuration-driven
/// empty-row policy (skip, or decode as defaults/nulls).
pub fn row_is_empty(cells: &[Cell], config: &Config) -> bool {
    cells.iter().all(|c| c.is_blank(config.trim_values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::ValueKind;
    use crate::schema::{resolve_fields, FieldSpec};
    use chrono::NaiveDate;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Product {
        name: Option<String>,
        price: Option<f64>,
        in_stock: Option<bool>,
        release_date: Option<NaiveDate>,
        category: Option<String>,
        internal_notes: Option<String>,
    }

    impl Record for Product {
        const TYPE_NAME: &'static str = "codec_tests::Product";

        fn fields() -> Vec<FieldSpec> {
            vec![
                FieldSpec::new("Product Name", ValueKind::Text).required().width(25),
                FieldSpec::new("Price", ValueKind::Float).format("#,##0.00"),
                FieldSpec::new("In Stock", ValueKind::Bool),
                FieldSpec::new("Release Date", ValueKind::Date).format("%Y-%m-%d"),
                FieldSpec::new("Category", ValueKind::Text).default_value("General"),
                FieldSpec::new("Internal Notes", ValueKind::Text).ignored(),
            ]
        }

        fn values(&self) -> Vec<FieldValue> {
            vec![
                FieldValue::Text(self.name.clone()),
                FieldValue::Float(self.price),
                FieldValue::Bool(self.in_stock),
                FieldValue::Date(self.release_date),
                FieldValue::Text(self.category.clone()),
                FieldValue::Text(self.internal_notes.clone()),
            ]
        }

        fn from_values(values: Vec<FieldValue>) -> Self {
            let mut it = values.into_iter();
            Self {
                name: it.next().and_then(FieldValue::into_text),
                price: it.next().and_then(FieldValue::into_float),
                in_stock: it.next().and_then(FieldValue::into_bool),
                release_date: it.next().and_then(FieldValue::into_date),
                category: it.next().and_then(FieldValue::into_text),
                internal_notes: it.next().and_then(FieldValue::into_text),
            }
        }
    }

    fn laptop() -> Product {
        Product {
            name: Some("Laptop".into()),
            price: Some(999.99),
            in_stock: Some(true),
            release_date: NaiveDate::from_ymd_opt(2024, 3, 15),
            category: Some("Electronics".into()),
            internal_notes: Some("do not ship".into()),
        }
    }

    #[test]
    fn test_round_trip() {
        let schema = resolve_fields("P", Product::fields()).unwrap();
        let config = Config::default();

        let cells = encode_row(&laptop(), &schema, &config).unwrap();
        let back: Product = decode_row(&cells, 2, &schema, &config).unwrap();

        let mut expected = laptop();
        // Ignored field never reaches storage.
        expected.internal_notes = None;
        assert_eq!(back, expected);
    }

    #[test]
    fn test_ignored_field_absent_from_output() {
        let schema = resolve_fields("P", Product::fields()).unwrap();
        let config = Config::default();
        let cells = encode_row(&laptop(), &schema, &config).unwrap();

        assert_eq!(cells.len(), 5);
        assert!(!cells.iter().any(|c| c.to_text().contains("do not ship")));
    }

    #[test]
    fn test_default_applies_to_empty_cell() {
        let schema = resolve_fields("P", Product::fields()).unwrap();
        let config = Config::default();

        let mut product = laptop();
        product.category = None;
        let cells = encode_row(&product, &schema, &config).unwrap();
        assert_eq!(cells[4], Cell::Empty);

        let back: Product = decode_row(&cells, 2, &schema, &config).unwrap();
        assert_eq!(back.category.as_deref(), Some("General"));
    }

    #[test]
    fn test_required_field_missing() {
        let schema = resolve_fields("P", Product::fields()).unwrap();
        let config = Config::default();

        let mut product = laptop();
        product.name = None;
        let cells = encode_row(&product, &schema, &config).unwrap();

        let err = decode_row::<Product>(&cells, 7, &schema, &config).unwrap_err();
        assert_eq!(err.row, 7);
        assert_eq!(err.column, "Product Name");
        assert_eq!(err.message, "required field missing");
        assert!(err.value.is_none());
    }

    #[test]
    fn test_conversion_failure_carries_raw_value() {
        let schema = resolve_fields("P", Product::fields()).unwrap();
        let config = Config::default();

        let cells = vec![
            Cell::Text("Laptop".into()),
            Cell::Text("not-a-price".into()),
            Cell::Text("yes".into()),
            Cell::Empty,
            Cell::Empty,
        ];
        let err = decode_row::<Product>(&cells, 3, &schema, &config).unwrap_err();
        assert_eq!(err.column, "Price");
        assert_eq!(err.value.as_deref(), Some("not-a-price"));
    }

    #[test]
    fn test_short_row_reads_as_empty_cells() {
        let schema = resolve_fields("P", Product::fields()).unwrap();
        let config = Config::default();

        let cells = vec![Cell::Text("Laptop".into())];
        let back: Product = decode_row(&cells, 2, &schema, &config).unwrap();
        assert_eq!(back.name.as_deref(), Some("Laptop"));
        assert_eq!(back.price, None);
        // Short rows still get declared defaults.
        assert_eq!(back.category.as_deref(), Some("General"));
    }

    #[test]
    fn test_validator_mode_collects_all_field_errors() {
        let schema = resolve_fields("P", Product::fields()).unwrap();
        let config = Config::default();

        let cells = vec![
            Cell::Empty,                      // required name missing
            Cell::Text("abc".into()),         // bad price
            Cell::Text("perhaps".into()),     // bad bool
            Cell::Empty,
            Cell::Empty,
        ];
        let (_, errors) = decode_fields(&cells, 4, &schema, &config);
        assert_eq!(errors.len(), 3);
        let columns: Vec<&str> = errors.iter().map(|e| e.column.as_str()).collect();
        assert_eq!(columns, vec!["Product Name", "Price", "In Stock"]);
    }

    #[test]
    fn test_empty_row_detection_respects_trim() {
        let config = Config::default();
        assert!(row_is_empty(
            &[Cell::Empty, Cell::Text("  ".into())],
            &config
        ));

        let no_trim = Config {
            trim_values: false,
            ..Config::default()
        };
        assert!(!row_is_empty(
            &[Cell::Empty, Cell::Text("  ".into())],
            &no_trim
        ));
    }

    #[test]
    fn test_default_conversion_failure_is_reported() {
        let fields = vec![
            FieldSpec::new("When", ValueKind::Date).default_value("not-a-date"),
        ];
        let schema = resolve_fields("D", fields).unwrap();
        let config = Config::default();

        let (_, errors) = decode_fields(&[Cell::Empty], 2, &schema, &config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].column, "When");
        assert_eq!(errors[0].value.as_deref(), Some("not-a-date"));
    }
}
