use std::collections::HashMap;

use crate::config::{DuplicatePolicy, KeyStrategy};
use crate::key::{normalize_key, split_title_size, title_size_key};
use crate::model::{CellValue, LocationRecord, ProductRecord};

/// Normalized key → quantity for one location file.
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    quantities: HashMap<String, i64>,
    /// Normalized SKU → title/size key. Title/size keying only.
    skus: HashMap<String, String>,
    duplicates: usize,
}

impl LocationIndex {
    pub fn build(records: &[LocationRecord], strategy: KeyStrategy, policy: DuplicatePolicy) -> Self {
        let mut index = Self::default();
        for record in records {
            let key = record_key(record, strategy);
            if key.is_empty() {
                continue;
            }
            if strategy == KeyStrategy::TitleSize {
                let sku = normalize_key(&record.sku);
                if !sku.is_empty() {
                    index.skus.insert(sku, key.clone());
                }
            }
            match index.quantities.get_mut(&key) {
                Some(existing) => {
                    index.duplicates += 1;
                    *existing = match policy {
                        DuplicatePolicy::Last => record.quantity,
                        DuplicatePolicy::Sum => existing.saturating_add(record.quantity),
                    };
                }
                None => {
                    index.quantities.insert(key, record.quantity);
                }
            }
        }
        index
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        if key.is_empty() {
            return None;
        }
        self.quantities.get(key).copied()
    }

    /// Title/size key this location lists the SKU under, if any.
    pub fn sku_key(&self, sku: &str) -> Option<&str> {
        self.skus.get(sku).map(String::as_str)
    }

    /// Number of rows whose key had already been seen.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }
}

/// The join key of one location row.
pub fn record_key(record: &LocationRecord, strategy: KeyStrategy) -> String {
    match strategy {
        KeyStrategy::Identifier => normalize_key(&record.identifier),
        KeyStrategy::TitleSize => {
            title_size_key(&record.identifier.display(), record.size.as_deref())
        }
    }
}

/// Keys to try for a product row, most specific first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductKeys {
    pub primary: String,
    pub fallback: Option<String>,
    /// Normalized SKU, checked against the location's SKU map.
    pub sku: Option<String>,
}

/// Outcome of looking one product up in one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    pub quantity: Option<i64>,
    pub sku_mismatch: bool,
}

impl ProductKeys {
    pub fn for_identifier(identifier: &CellValue, strategy: KeyStrategy) -> Self {
        match strategy {
            KeyStrategy::Identifier => Self {
                primary: normalize_key(identifier),
                fallback: None,
                sku: None,
            },
            KeyStrategy::TitleSize => {
                let (title, size) = split_title_size(identifier);
                let primary = title_size_key(&title, size.as_deref());
                let fallback = size
                    .is_some()
                    .then(|| title_size_key(&title, None))
                    .filter(|k| !k.is_empty());
                Self { primary, fallback, sku: None }
            }
        }
    }

    /// Keys for a product row, including its SKU under title/size keying.
    pub fn for_product(product: &ProductRecord, strategy: KeyStrategy) -> Self {
        let mut keys = Self::for_identifier(&product.identifier, strategy);
        if strategy == KeyStrategy::TitleSize {
            keys.sku = Some(normalize_key(&product.sku)).filter(|k| !k.is_empty());
        }
        keys
    }

    /// Look the product up in one location index.
    pub fn lookup(&self, index: &LocationIndex) -> Option<i64> {
        self.resolve(index).quantity
    }

    /// Name keys first, then the SKU. A SKU listed under another title/size
    /// than the one the name matched is flagged.
    pub fn resolve(&self, index: &LocationIndex) -> Lookup {
        let by_name = std::iter::once(self.primary.as_str())
            .chain(self.fallback.as_deref())
            .find_map(|k| index.get(k).map(|q| (k, q)));
        let by_sku = self.sku.as_deref().and_then(|s| index.sku_key(s));

        match (by_name, by_sku) {
            (Some((key, quantity)), sku_key) => Lookup {
                quantity: Some(quantity),
                sku_mismatch: sku_key.is_some_and(|k| k != key),
            },
            (None, Some(sku_key)) => Lookup {
                quantity: index.get(sku_key),
                sku_mismatch: true,
            },
            (None, None) => Lookup { quantity: None, sku_mismatch: false },
        }
    }
}
