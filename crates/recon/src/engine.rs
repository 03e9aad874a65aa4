use std::collections::BTreeMap;

use crate::config::{DuplicatePolicy, JoinOptions};
use crate::error::InputError;
use crate::matcher::{LocationIndex, ProductKeys};
use crate::model::{
    JoinInput, JoinResult, Location, LocationRecord, MergedRecord, ProductRecord, StockCell,
};
use crate::summary::compute_summary;

/// Run the reconciliation join. Output has exactly one record per product
/// row, in product-list order.
pub fn run(input: &JoinInput, options: &JoinOptions) -> Result<JoinResult, InputError> {
    let products = input.products.as_ref().ok_or(InputError::NoProductList)?;

    let mut warnings = products.warnings.clone();
    let mut indexes: Vec<(Location, LocationIndex)> = Vec::with_capacity(input.locations.len());
    for (location, inventory) in &input.locations {
        warnings.extend(inventory.warnings.iter().cloned());

        let index = LocationIndex::build(&inventory.records, options.strategy, options.duplicates);
        if index.duplicates() > 0 {
            let action = match options.duplicates {
                DuplicatePolicy::Last => "last value kept",
                DuplicatePolicy::Sum => "quantities summed",
            };
            warnings.push(format!(
                "{location}: {} duplicate identifier(s), {action}",
                index.duplicates()
            ));
        }
        log::debug!("{location}: {} distinct keys", index.len());
        indexes.push((*location, index));
    }

    let records = merge_indexed(&products.records, &indexes, options);
    let locations: Vec<Location> = indexes.iter().map(|(l, _)| *l).collect();
    for location in &locations {
        warnings.extend(sku_mismatch_warning(*location, &records));
    }
    let summary = compute_summary(&records, &locations);

    for w in &warnings {
        log::warn!("{w}");
    }

    Ok(JoinResult {
        headers: products.headers.clone(),
        key_column: products.key_column,
        locations,
        records,
        summary,
        warnings,
    })
}

/// The bare join: products plus per-location records in, merged records out.
pub fn merge(
    products: &[ProductRecord],
    locations: &BTreeMap<Location, Vec<LocationRecord>>,
    options: &JoinOptions,
) -> Vec<MergedRecord> {
    let indexes: Vec<(Location, LocationIndex)> = locations
        .iter()
        .map(|(loc, records)| (*loc, LocationIndex::build(records, options.strategy, options.duplicates)))
        .collect();
    merge_indexed(products, &indexes, options)
}

fn merge_indexed(
    products: &[ProductRecord],
    indexes: &[(Location, LocationIndex)],
    options: &JoinOptions,
) -> Vec<MergedRecord> {
    products
        .iter()
        .map(|product| {
            let keys = ProductKeys::for_product(product, options.strategy);
            let stock = indexes
                .iter()
                .map(|(location, index)| {
                    let found = keys.resolve(index);
                    match found.quantity {
                        Some(quantity) => StockCell {
                            location: *location,
                            quantity,
                            matched: true,
                            sku_mismatch: found.sku_mismatch,
                        },
                        None => StockCell::unmatched(*location),
                    }
                })
                .collect();
            MergedRecord { product: product.clone(), stock }
        })
        .collect()
}

const MAX_LISTED_ROWS: usize = 10;

fn sku_mismatch_warning(location: Location, records: &[MergedRecord]) -> Option<String> {
    let rows: Vec<usize> = records
        .iter()
        .filter(|r| r.stock.iter().any(|c| c.location == location && c.sku_mismatch))
        .map(|r| r.product.row)
        .collect();
    if rows.is_empty() {
        return None;
    }

    let mut listed: Vec<String> = rows.iter().take(MAX_LISTED_ROWS).map(|r| r.to_string()).collect();
    if rows.len() > MAX_LISTED_ROWS {
        listed.push("...".into());
    }
    Some(format!(
        "{location}: {} row(s) where SKU and item name disagree (rows {})",
        rows.len(),
        listed.join(", ")
    ))
}
