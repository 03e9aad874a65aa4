use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A spreadsheet cell after input parsing. Every adapter maps its native
/// cell type onto this before any matching logic runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    Text(String),
    Number(f64),
    #[default]
    Empty,
}

impl CellValue {
    /// Text cell, or `Empty` for an empty string.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() { Self::Empty } else { Self::Text(s) }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
        }
    }

    /// Display form. Integral numbers never carry a `.0` suffix.
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Empty => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

/// Format a number the way a user typed it: integers without decimals.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// A parsed sheet: one header row plus data rows padded to the header width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    /// Build a table from raw grid rows. The first non-blank row becomes the
    /// header; blank headers are named `Unnamed: <index>`. Fully blank rows
    /// are dropped. Returns `None` when the grid has no non-blank row.
    pub fn from_grid(grid: Vec<Vec<CellValue>>) -> Option<Self> {
        let mut rows = grid
            .into_iter()
            .filter(|row| row.iter().any(|c| !c.is_blank()));

        let header_row = rows.next()?;
        let mut headers: Vec<String> = header_row
            .iter()
            .enumerate()
            .map(|(i, c)| header_name(c, i))
            .collect();

        let mut data: Vec<Vec<CellValue>> = Vec::new();
        for mut row in rows {
            while headers.len() < row.len() {
                let i = headers.len();
                headers.push(format!("Unnamed: {i}"));
            }
            row.resize(headers.len(), CellValue::Empty);
            data.push(row);
        }
        for row in &mut data {
            row.resize(headers.len(), CellValue::Empty);
        }

        Some(Self { headers, rows: data })
    }

    /// Index of the column whose header equals `name`, ignoring case and
    /// surrounding whitespace.
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.headers.iter().position(|h| h.trim().to_lowercase() == wanted)
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn header_name(cell: &CellValue, index: usize) -> String {
    let name = cell.display().trim().to_string();
    if name.is_empty() { format!("Unnamed: {index}") } else { name }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// The fixed set of stock locations. Declaration order is output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Location {
    Ecom,
    Mirpur,
    Wari,
    Cumilla,
    Sylhet,
}

impl Location {
    pub const ALL: [Location; 5] = [
        Location::Ecom,
        Location::Mirpur,
        Location::Wari,
        Location::Cumilla,
        Location::Sylhet,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ecom => "Ecom",
            Self::Mirpur => "Mirpur",
            Self::Wari => "Wari",
            Self::Cumilla => "Cumilla",
            Self::Sylhet => "Sylhet",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|l| l.name()).collect()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Location {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| InputError::UnknownLocation(wanted.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// One row of the master product list.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    /// 1-based data row number in the source file (header excluded).
    pub row: usize,
    pub identifier: CellValue,
    /// Secondary SKU cell, `Empty` when the list has no SKU column.
    pub sku: CellValue,
    /// Every cell of the source row, in header order.
    pub fields: Vec<CellValue>,
}

/// The master product list: defines output rows and their order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductList {
    pub headers: Vec<String>,
    pub key_column: usize,
    pub sku_column: Option<usize>,
    pub records: Vec<ProductRecord>,
    pub warnings: Vec<String>,
}

/// One row of a location inventory file.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    pub identifier: CellValue,
    /// Normalized size, only populated for title/size keying.
    pub size: Option<String>,
    /// SKU cell, only populated for title/size keying.
    pub sku: CellValue,
    pub quantity: i64,
}

impl LocationRecord {
    pub fn new(identifier: impl Into<CellValue>, quantity: i64) -> Self {
        Self { identifier: identifier.into(), size: None, sku: CellValue::Empty, quantity }
    }

    pub fn with_size(mut self, size: &str) -> Self {
        self.size = Some(size.to_string());
        self
    }

    pub fn with_sku(mut self, sku: impl Into<CellValue>) -> Self {
        self.sku = sku.into();
        self
    }
}

/// All records of one location file.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationInventory {
    pub location: Location,
    pub records: Vec<LocationRecord>,
    pub warnings: Vec<String>,
}

impl LocationInventory {
    pub fn new(location: Location, records: Vec<LocationRecord>) -> Self {
        Self { location, records, warnings: Vec::new() }
    }
}

/// Pre-loaded join input. Locations are keyed so output column order is
/// always the `Location` declaration order.
#[derive(Debug, Clone, Default)]
pub struct JoinInput {
    pub products: Option<ProductList>,
    pub locations: BTreeMap<Location, LocationInventory>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockCell {
    pub location: Location,
    pub quantity: i64,
    pub matched: bool,
    /// The product's SKU is listed here under a different title/size than
    /// its item name. When the name found nothing, the SKU supplied the
    /// quantity.
    pub sku_mismatch: bool,
}

impl StockCell {
    pub fn unmatched(location: Location) -> Self {
        Self { location, quantity: 0, matched: false, sku_mismatch: false }
    }
}

/// A product row with one stock cell per supplied location.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub product: ProductRecord,
    pub stock: Vec<StockCell>,
}

impl MergedRecord {
    pub fn quantity(&self, location: Location) -> Option<i64> {
        self.stock.iter().find(|s| s.location == location).map(|s| s.quantity)
    }

    pub fn is_matched(&self) -> bool {
        self.stock.iter().any(|s| s.matched)
    }

    pub fn has_sku_mismatch(&self) -> bool {
        self.stock.iter().any(|s| s.sku_mismatch)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinSummary {
    pub total_rows: usize,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    pub matched_by_location: BTreeMap<Location, usize>,
    /// Matched rows as a percentage of all rows (0 when there are none).
    pub match_rate: f64,
    /// Rows whose SKU and item name disagree in at least one location.
    pub sku_mismatch_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinResult {
    pub headers: Vec<String>,
    pub key_column: usize,
    pub locations: Vec<Location>,
    pub records: Vec<MergedRecord>,
    pub summary: JoinSummary,
    pub warnings: Vec<String>,
}
