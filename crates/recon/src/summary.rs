use std::collections::BTreeMap;

use crate::model::{JoinSummary, Location, MergedRecord};

/// Compute match statistics from merged records.
pub fn compute_summary(records: &[MergedRecord], locations: &[Location]) -> JoinSummary {
    let mut matched_by_location: BTreeMap<Location, usize> =
        locations.iter().map(|l| (*l, 0)).collect();
    let mut matched_rows = 0;
    let mut sku_mismatch_rows = 0;

    for record in records {
        if record.is_matched() {
            matched_rows += 1;
        }
        if record.has_sku_mismatch() {
            sku_mismatch_rows += 1;
        }
        for cell in record.stock.iter().filter(|c| c.matched) {
            *matched_by_location.entry(cell.location).or_insert(0) += 1;
        }
    }

    let total_rows = records.len();
    let match_rate = if total_rows == 0 {
        0.0
    } else {
        matched_rows as f64 * 100.0 / total_rows as f64
    };

    JoinSummary {
        total_rows,
        matched_rows,
        unmatched_rows: total_rows - matched_rows,
        matched_by_location,
        match_rate,
        sku_mismatch_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, ProductRecord, StockCell};

    fn record(matches: &[(Location, bool)]) -> MergedRecord {
        MergedRecord {
            product: ProductRecord {
                row: 1,
                identifier: CellValue::text("x"),
                sku: CellValue::Empty,
                fields: Vec::new(),
            },
            stock: matches
                .iter()
                .map(|(location, matched)| StockCell { matched: *matched, ..StockCell::unmatched(*location) })
                .collect(),
        }
    }

    #[test]
    fn summary_counts() {
        let locs = [Location::Ecom, Location::Wari];
        let records = vec![
            record(&[(Location::Ecom, true), (Location::Wari, true)]),
            record(&[(Location::Ecom, false), (Location::Wari, true)]),
            record(&[(Location::Ecom, false), (Location::Wari, false)]),
            record(&[(Location::Ecom, false), (Location::Wari, false)]),
        ];
        let s = compute_summary(&records, &locs);
        assert_eq!(s.total_rows, 4);
        assert_eq!(s.matched_rows, 2);
        assert_eq!(s.unmatched_rows, 2);
        assert_eq!(s.matched_by_location[&Location::Ecom], 1);
        assert_eq!(s.matched_by_location[&Location::Wari], 2);
        assert!((s.match_rate - 50.0).abs() < 1e-9);
        assert_eq!(s.sku_mismatch_rows, 0);
    }

    #[test]
    fn sku_mismatches_counted_once_per_row() {
        let mut flagged = record(&[(Location::Ecom, true), (Location::Wari, true)]);
        for cell in &mut flagged.stock {
            cell.sku_mismatch = true;
        }
        let records = vec![flagged, record(&[(Location::Ecom, true), (Location::Wari, false)])];
        let s = compute_summary(&records, &[Location::Ecom, Location::Wari]);
        assert_eq!(s.sku_mismatch_rows, 1);
    }

    #[test]
    fn empty_summary() {
        let s = compute_summary(&[], &[Location::Sylhet]);
        assert_eq!(s.total_rows, 0);
        assert_eq!(s.match_rate, 0.0);
        assert_eq!(s.matched_by_location[&Location::Sylhet], 0);
    }
}
