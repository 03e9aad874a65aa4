use crate::error::InputError;
use crate::model::Table;

/// Identifier header priority tiers. Within a tier the first header wins.
const IDENTIFIER_CONTAINS: [&[&str]; 3] = [&["item name", "product name"], &["title"], &["sku"]];
const IDENTIFIER_EXACT: [&str; 5] = ["id", "identifier", "product id", "barcode", "item code"];

const STOCK_CONTAINS: [&str; 3] = ["quantity", "qty", "stock"];
const SIZE_CONTAINS: [&str; 1] = ["size"];
const SKU_CONTAINS: [&str; 1] = ["sku"];

/// Explicit column names; `None` means auto-detect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOverrides {
    pub key: Option<String>,
    pub stock: Option<String>,
    pub size: Option<String>,
    pub sku: Option<String>,
}

/// Resolved column indexes for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub key: usize,
    pub stock: Option<usize>,
    pub size: Option<usize>,
    pub sku: Option<usize>,
}

fn lowered(table: &Table) -> Vec<String> {
    table.headers.iter().map(|h| h.trim().to_lowercase()).collect()
}

fn first_containing(headers: &[String], needles: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| needles.iter().any(|n| h.contains(n)))
}

/// Find the identifier column. An override must exist; otherwise the
/// priority tiers are tried in order.
pub fn identifier_column(
    table: &Table,
    source: &str,
    explicit: Option<&str>,
) -> Result<usize, InputError> {
    if let Some(name) = explicit {
        return table.column(name).ok_or_else(|| InputError::MissingColumn {
            source: source.into(),
            column: name.into(),
        });
    }

    let headers = lowered(table);
    IDENTIFIER_CONTAINS
        .iter()
        .find_map(|tier| first_containing(&headers, tier))
        .or_else(|| headers.iter().position(|h| IDENTIFIER_EXACT.contains(&h.as_str())))
        .ok_or_else(|| InputError::MissingIdentifierColumn { source: source.into() })
}

/// Find the stock column, skipping the identifier column.
pub fn stock_column(
    table: &Table,
    source: &str,
    explicit: Option<&str>,
    key: usize,
) -> Result<Option<usize>, InputError> {
    optional_column(table, source, explicit, &STOCK_CONTAINS, key)
}

/// Find the size column, skipping the identifier column.
pub fn size_column(
    table: &Table,
    source: &str,
    explicit: Option<&str>,
    key: usize,
) -> Result<Option<usize>, InputError> {
    optional_column(table, source, explicit, &SIZE_CONTAINS, key)
}

/// Find the secondary SKU column, skipping the identifier column.
pub fn sku_column(
    table: &Table,
    source: &str,
    explicit: Option<&str>,
    key: usize,
) -> Result<Option<usize>, InputError> {
    optional_column(table, source, explicit, &SKU_CONTAINS, key)
}

fn optional_column(
    table: &Table,
    source: &str,
    explicit: Option<&str>,
    needles: &[&str],
    key: usize,
) -> Result<Option<usize>, InputError> {
    if let Some(name) = explicit {
        return table.column(name).map(Some).ok_or_else(|| InputError::MissingColumn {
            source: source.into(),
            column: name.into(),
        });
    }
    let headers = lowered(table);
    Ok(headers
        .iter()
        .enumerate()
        .find(|(i, h)| *i != key && needles.iter().any(|n| h.contains(n)))
        .map(|(i, _)| i))
}

/// Resolve every column a location file needs. Size and SKU columns are
/// only looked up for title/size keying.
pub fn location_columns(
    table: &Table,
    source: &str,
    overrides: &ColumnOverrides,
    title_size: bool,
) -> Result<ColumnMap, InputError> {
    let key = identifier_column(table, source, overrides.key.as_deref())?;
    let stock = stock_column(table, source, overrides.stock.as_deref(), key)?;
    if !title_size {
        return Ok(ColumnMap { key, stock, size: None, sku: None });
    }
    let size = size_column(table, source, overrides.size.as_deref(), key)?;
    let sku = sku_column(table, source, overrides.sku.as_deref(), key)?;
    Ok(ColumnMap { key, stock, size, sku })
}
