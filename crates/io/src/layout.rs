//! Export layout: order grouping and column widths.

use std::cmp::Ordering;
use std::collections::HashMap;

use stockmerge_recon::model::{CellValue, Table};
use stockmerge_recon::Separator;

/// Header fragments that identify an order grouping column.
const GROUP_HINTS: [&str; 2] = ["order", "phone"];

/// Excel column width cap (characters).
const MAX_COL_WIDTH: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupBy {
    /// First header containing "order" or "phone".
    Auto,
    Column(String),
}

impl GroupBy {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Column(s.trim().to_string())
        }
    }

    /// Resolve to a column index. `Auto` finding nothing is not an error;
    /// a named column that does not exist is.
    pub fn resolve(&self, table: &Table) -> Result<Option<usize>, String> {
        match self {
            Self::Auto => Ok(table.headers.iter().position(|h| {
                let h = h.to_lowercase();
                GROUP_HINTS.iter().any(|hint| h.contains(hint))
            })),
            Self::Column(name) => table
                .column(name)
                .map(Some)
                .ok_or_else(|| format!("group column '{name}' not found")),
        }
    }
}

/// A table ready for export: rows in final order, with each row's group.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrangedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// Group id per row; `None` for ungrouped rows and blank separators.
    pub groups: Vec<Option<usize>>,
    pub group_count: usize,
    pub separator: Separator,
}

impl ArrangedTable {
    /// No grouping: rows keep their order.
    pub fn plain(table: &Table) -> Self {
        Self {
            headers: table.headers.clone(),
            rows: table.rows.clone(),
            groups: vec![None; table.rows.len()],
            group_count: 0,
            separator: Separator::Colors,
        }
    }

    /// Whether row fills should be painted.
    pub fn colored(&self) -> bool {
        self.group_count > 0 && self.separator == Separator::Colors
    }
}

/// Arrange a table for export. Without a group column the table is passed
/// through unchanged. With one, rows are stably sorted by the group value
/// (blank values last) and numbered by first appearance.
pub fn arrange(table: &Table, group_by: Option<&GroupBy>, separator: Separator) -> Result<ArrangedTable, String> {
    let column = match group_by {
        Some(g) => g.resolve(table)?,
        None => None,
    };
    let Some(column) = column else {
        if group_by.is_some() {
            log::info!("no order or phone column found, grouping skipped");
        }
        return Ok(ArrangedTable::plain(table));
    };

    let mut order: Vec<usize> = (0..table.rows.len()).collect();
    order.sort_by(|&a, &b| compare_group_values(table.cell(a, column), table.cell(b, column)));

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut rows = Vec::with_capacity(table.rows.len());
    let mut groups = Vec::with_capacity(table.rows.len());
    let mut previous: Option<Option<usize>> = None;

    for idx in order {
        let key = table.cell(idx, column).display().trim().to_string();
        let group = if key.is_empty() {
            None
        } else {
            let next = seen.len();
            Some(*seen.entry(key).or_insert(next))
        };

        if separator == Separator::BlankRow {
            if let Some(prev) = previous {
                if prev != group {
                    rows.push(vec![CellValue::Empty; table.headers.len()]);
                    groups.push(None);
                }
            }
        }
        previous = Some(group);

        rows.push(table.rows[idx].clone());
        groups.push(group);
    }

    log::debug!("grouped {} rows into {} groups by '{}'", table.rows.len(), seen.len(), table.headers[column]);

    Ok(ArrangedTable {
        headers: table.headers.clone(),
        rows,
        groups,
        group_count: seen.len(),
        separator,
    })
}

/// Numbers before text, blanks last.
fn compare_group_values(a: &CellValue, b: &CellValue) -> Ordering {
    fn rank(v: &CellValue) -> (u8, f64, String) {
        if v.is_blank() {
            return (2, 0.0, String::new());
        }
        match v {
            CellValue::Number(n) => (0, *n, String::new()),
            other => {
                let s = other.display().trim().to_string();
                match s.parse::<f64>() {
                    Ok(n) if n.is_finite() => (0, n, s),
                    _ => (1, 0.0, s),
                }
            }
        }
    }
    let (ra, na, sa) = rank(a);
    let (rb, nb, sb) = rank(b);
    ra.cmp(&rb).then(na.total_cmp(&nb)).then_with(|| sa.cmp(&sb))
}

/// Column widths in characters: longest cell or header plus 2, capped at 50.
pub fn column_widths(table: &ArrangedTable) -> Vec<f64> {
    (0..table.headers.len())
        .map(|col| {
            let longest = table
                .rows
                .iter()
                .filter_map(|r| r.get(col))
                .map(|c| c.display().chars().count())
                .chain(std::iter::once(table.headers[col].chars().count()))
                .max()
                .unwrap_or(0);
            ((longest + 2) as f64).min(MAX_COL_WIDTH)
        })
        .collect()
}
