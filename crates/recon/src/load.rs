//! Turn parsed tables into join records.

use crate::columns::{self, ColumnOverrides};
use crate::config::KeyStrategy;
use crate::error::InputError;
use crate::key::{normalize_size, parse_quantity, Quantity};
use crate::model::{Location, LocationInventory, LocationRecord, ProductList, ProductRecord, Table};

/// Label used for the master file in messages.
pub const PRODUCTS_SOURCE: &str = "product list";

/// Load the master product list. Every data row becomes a record, including
/// rows with a blank identifier (they simply never match).
pub fn load_products(table: &Table, overrides: &ColumnOverrides) -> Result<ProductList, InputError> {
    if table.headers.is_empty() {
        return Err(InputError::EmptyFile { source: PRODUCTS_SOURCE.into() });
    }

    let key_column = columns::identifier_column(table, PRODUCTS_SOURCE, overrides.key.as_deref())?;
    let sku_column = columns::sku_column(table, PRODUCTS_SOURCE, overrides.sku.as_deref(), key_column)?;
    log::debug!(
        "{PRODUCTS_SOURCE}: identifier column '{}', sku column {:?}, {} rows",
        table.headers[key_column],
        sku_column.map(|c| table.headers[c].as_str()),
        table.rows.len()
    );

    let mut warnings = Vec::new();
    let records: Vec<ProductRecord> = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| ProductRecord {
            row: i + 1,
            identifier: row.get(key_column).cloned().unwrap_or_default(),
            sku: sku_column.and_then(|c| row.get(c)).cloned().unwrap_or_default(),
            fields: row.clone(),
        })
        .collect();

    let blank = records.iter().filter(|r| r.identifier.is_blank()).count();
    if blank > 0 {
        warnings.push(format!(
            "{PRODUCTS_SOURCE}: {blank} row(s) have no '{}' value and cannot match",
            table.headers[key_column]
        ));
    }

    Ok(ProductList {
        headers: table.headers.clone(),
        key_column,
        sku_column,
        records,
        warnings,
    })
}

/// Load one location inventory file. A missing identifier column is an
/// error; a missing stock column only produces a warning and zero stock.
pub fn load_location(
    location: Location,
    table: &Table,
    overrides: &ColumnOverrides,
    strategy: KeyStrategy,
) -> Result<LocationInventory, InputError> {
    let source = location.name();
    if table.headers.is_empty() {
        return Err(InputError::MissingIdentifierColumn { source: source.into() });
    }

    let title_size = strategy == KeyStrategy::TitleSize;
    let cols = columns::location_columns(table, source, overrides, title_size)?;

    let mut warnings = Vec::new();
    if cols.stock.is_none() {
        warnings.push(format!("{source}: missing quantity column, assuming 0 stock"));
    }

    let mut invalid = 0usize;
    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let identifier = row.get(cols.key).cloned().unwrap_or_default();
        if identifier.is_blank() {
            continue;
        }

        let quantity = match cols.stock.and_then(|c| row.get(c)) {
            Some(cell) => match parse_quantity(cell) {
                Quantity::Invalid => {
                    invalid += 1;
                    0
                }
                q => q.value(),
            },
            None => 0,
        };

        let size = cols.size.and_then(|c| row.get(c)).and_then(normalize_size);
        let sku = cols.sku.and_then(|c| row.get(c)).cloned().unwrap_or_default();

        records.push(LocationRecord { identifier, size, sku, quantity });
    }

    if invalid > 0 {
        warnings.push(format!("{source}: {invalid} quantity value(s) could not be read, counted as 0"));
    }

    log::debug!(
        "{source}: identifier column '{}', stock column {:?}, {} records",
        table.headers[cols.key],
        cols.stock.map(|c| table.headers[c].as_str()),
        records.len()
    );

    Ok(LocationInventory { location, records, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| CellValue::text(*c)).collect())
                .collect(),
        )
    }

    #[test]
    fn products_keep_every_row() {
        let t = table(&["SKU", "Name"], &[&["A1", "Widget"], &["", "Loose"], &["A1", "Dup"]]);
        let list = load_products(&t, &ColumnOverrides::default()).unwrap();
        assert_eq!(list.key_column, 0);
        assert_eq!(list.records.len(), 3);
        assert_eq!(list.records[2].row, 3);
        assert_eq!(list.records[2].fields[1], CellValue::text("Dup"));
        assert_eq!(list.warnings.len(), 1);
    }

    #[test]
    fn products_without_identifier_column() {
        let t = table(&["Price"], &[&["1"]]);
        let err = load_products(&t, &ColumnOverrides::default()).unwrap_err();
        assert_eq!(err, InputError::MissingIdentifierColumn { source: "product list".into() });
    }

    #[test]
    fn empty_product_table() {
        let err = load_products(&Table::default(), &ColumnOverrides::default()).unwrap_err();
        assert!(matches!(err, InputError::EmptyFile { .. }));
    }

    #[test]
    fn location_quantities_and_blank_keys() {
        let t = table(
            &["SKU", "Qty"],
            &[&["A1", "1,200"], &["", "5"], &["A2", "oops"], &["A3", ""]],
        );
        let inv = load_location(Location::Ecom, &t, &ColumnOverrides::default(), KeyStrategy::Identifier).unwrap();
        assert_eq!(inv.records.len(), 3);
        assert_eq!(inv.records[0].quantity, 1200);
        assert_eq!(inv.records[1].quantity, 0);
        assert_eq!(inv.records[2].quantity, 0);
        assert_eq!(inv.warnings.len(), 1);
        assert!(inv.warnings[0].contains("1 quantity"));
    }

    #[test]
    fn location_without_stock_column_warns() {
        let t = table(&["SKU"], &[&["A1"]]);
        let inv = load_location(Location::Wari, &t, &ColumnOverrides::default(), KeyStrategy::Identifier).unwrap();
        assert_eq!(inv.records[0].quantity, 0);
        assert_eq!(inv.warnings, vec!["Wari: missing quantity column, assuming 0 stock"]);
    }

    #[test]
    fn location_without_identifier_names_location() {
        let t = table(&["Qty"], &[&["3"]]);
        let err = load_location(Location::Cumilla, &t, &ColumnOverrides::default(), KeyStrategy::Identifier)
            .unwrap_err();
        assert_eq!(err, InputError::MissingIdentifierColumn { source: "Cumilla".into() });
        assert!(err.to_string().contains("Cumilla"));
    }

    #[test]
    fn sizes_only_read_for_title_size() {
        let t = table(&["Title", "Size", "Stock"], &[&["Shirt", "M", "4"]]);
        let by_id = load_location(Location::Ecom, &t, &ColumnOverrides::default(), KeyStrategy::Identifier).unwrap();
        assert_eq!(by_id.records[0].size, None);
        let by_title = load_location(Location::Ecom, &t, &ColumnOverrides::default(), KeyStrategy::TitleSize).unwrap();
        assert_eq!(by_title.records[0].size.as_deref(), Some("M"));
        assert_eq!(by_title.records[0].quantity, 4);
    }

    #[test]
    fn sku_read_on_both_sides() {
        let products = table(&["Item Name", "SKU"], &[&["Shirt - M", "SH-1"], &["Mug", ""]]);
        let list = load_products(&products, &ColumnOverrides::default()).unwrap();
        assert_eq!(list.key_column, 0);
        assert_eq!(list.sku_column, Some(1));
        assert_eq!(list.records[0].sku, CellValue::text("SH-1"));
        assert_eq!(list.records[1].sku, CellValue::Empty);

        let t = table(&["Title", "Size", "SKU", "Qty"], &[&["Shirt", "M", "sh-1", "2"]]);
        let inv = load_location(Location::Ecom, &t, &ColumnOverrides::default(), KeyStrategy::TitleSize).unwrap();
        assert_eq!(inv.records[0].sku, CellValue::text("sh-1"));
        let inv = load_location(Location::Ecom, &t, &ColumnOverrides::default(), KeyStrategy::Identifier).unwrap();
        assert_eq!(inv.records[0].sku, CellValue::Empty);
    }
}
