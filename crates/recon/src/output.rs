use crate::config::Placement;
use crate::model::{CellValue, JoinResult, Table};

impl JoinResult {
    /// Render the merged records as an output table.
    ///
    /// Master columns named like one of the supplied locations are dropped
    /// (re-running on an earlier export must not duplicate them). Stock
    /// cells are integral numbers.
    pub fn to_table(&self, placement: Placement) -> Table {
        let keep: Vec<usize> = (0..self.headers.len())
            .filter(|&i| i == self.key_column || !self.shadows_location(&self.headers[i]))
            .collect();

        let insert_at = match placement {
            Placement::End => keep.len(),
            Placement::AfterKey => keep
                .iter()
                .position(|&i| i == self.key_column)
                .map(|p| p + 1)
                .unwrap_or(keep.len()),
        };

        let mut headers: Vec<String> = keep.iter().map(|&i| self.headers[i].clone()).collect();
        headers.splice(
            insert_at..insert_at,
            self.locations.iter().map(|l| l.name().to_string()),
        );

        let rows = self
            .records
            .iter()
            .map(|record| {
                let mut row: Vec<CellValue> = keep
                    .iter()
                    .map(|&i| record.product.fields.get(i).cloned().unwrap_or_default())
                    .collect();
                row.splice(
                    insert_at..insert_at,
                    record.stock.iter().map(|s| CellValue::from(s.quantity)),
                );
                row
            })
            .collect();

        Table::new(headers, rows)
    }

    fn shadows_location(&self, header: &str) -> bool {
        let header = header.trim();
        self.locations.iter().any(|l| l.name().eq_ignore_ascii_case(header))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::JoinOptions;
    use crate::engine::run;
    use crate::model::{JoinInput, Location, LocationInventory, LocationRecord, ProductList, ProductRecord};

    fn result(headers: &[&str], key_column: usize, rows: &[&[&str]]) -> JoinResult {
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, r)| ProductRecord {
                row: i + 1,
                identifier: CellValue::text(r[key_column]),
                sku: CellValue::Empty,
                fields: r.iter().map(|c| CellValue::text(*c)).collect(),
            })
            .collect();
        let input = JoinInput {
            products: Some(ProductList {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                key_column,
                sku_column: None,
                records,
                warnings: Vec::new(),
            }),
            locations: BTreeMap::from([
                (Location::Wari, LocationInventory::new(Location::Wari, vec![LocationRecord::new("a1", 3)])),
                (Location::Ecom, LocationInventory::new(Location::Ecom, vec![LocationRecord::new("A1", 10)])),
            ]),
        };
        run(&input, &JoinOptions::default()).unwrap()
    }

    #[test]
    fn locations_appended_in_fixed_order() {
        let table = result(&["Name", "SKU"], 1, &[&["Widget", "A1"], &["Gadget", "B2"]]).to_table(Placement::End);
        assert_eq!(table.headers, vec!["Name", "SKU", "Ecom", "Wari"]);
        assert_eq!(
            table.rows[0],
            vec![CellValue::text("Widget"), CellValue::text("A1"), CellValue::Number(10.0), CellValue::Number(3.0)]
        );
        assert_eq!(table.rows[1][2], CellValue::Number(0.0));
        assert_eq!(table.rows[1][2].display(), "0");
    }

    #[test]
    fn locations_after_key() {
        let table = result(&["Name", "SKU", "Price"], 1, &[&["Widget", "A1", "9"]]).to_table(Placement::AfterKey);
        assert_eq!(table.headers, vec!["Name", "SKU", "Ecom", "Wari", "Price"]);
        assert_eq!(table.rows[0][4], CellValue::text("9"));
    }

    #[test]
    fn stale_location_columns_replaced() {
        let table = result(&["SKU", "ecom", "Name"], 0, &[&["A1", "999", "Widget"]]).to_table(Placement::End);
        assert_eq!(table.headers, vec!["SKU", "Name", "Ecom", "Wari"]);
        assert_eq!(table.rows[0][2], CellValue::Number(10.0));
    }
}
