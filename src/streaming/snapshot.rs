//! Accumulated state of one search on the consumer side.

use crate::catalog::ProductRecord;
use crate::sample::Associations;
use crate::streaming::channel::ConsumerEvent;
use crate::streaming::protocol::{decode_association, decode_category, decode_product, Facet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Product count the progress display treats as a full result
pub const EXPECTED_PRODUCTS: usize = 20;

/// Everything received so far, deduplicated by identity key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSnapshot {
    pub categories: Vec<String>,
    pub products: Vec<ProductRecord>,
    pub associations: Associations,
}

impl SearchSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one line of `facet` and fold it in.
    ///
    /// Returns the event to emit, or `None` when the line was blank,
    /// unidentifiable, or a duplicate.
    pub fn accept_line(&mut self, facet: Facet, line: &str) -> Option<ConsumerEvent> {
        match facet {
            Facet::Categories => self.accept_category(decode_category(line)?),
            Facet::Products => self.accept_product(decode_product(line)?),
            Facet::Associations => {
                let (category, codes) = decode_association(line)?;
                Some(self.accept_association(category, codes))
            }
        }
    }

    pub fn accept_category(&mut self, category: String) -> Option<ConsumerEvent> {
        if self.categories.contains(&category) {
            return None;
        }
        self.categories.push(category.clone());
        Some(ConsumerEvent::Category(category))
    }

    pub fn accept_product(&mut self, product: ProductRecord) -> Option<ConsumerEvent> {
        if self.products.iter().any(|p| p.id == product.id) {
            return None;
        }
        self.products.push(product.clone());
        Some(ConsumerEvent::Product(product))
    }

    /// Associations are never dropped: a repeat replaces the earlier list.
    pub fn accept_association(&mut self, category: String, codes: Vec<String>) -> ConsumerEvent {
        self.associations.insert(category.clone(), codes.clone());
        ConsumerEvent::Association {
            category,
            product_codes: codes,
        }
    }

    /// Products shown for a category filter. `None` means all products.
    pub fn products_in(&self, category: Option<&str>) -> Vec<&ProductRecord> {
        let Some(category) = category else {
            return self.products.iter().collect();
        };
        let wanted: HashSet<&str> = self
            .associations
            .get(category)
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
            .collect();
        self.products
            .iter()
            .filter(|p| wanted.contains(p.id.as_str()))
            .collect()
    }

    /// Loading progress in percent, saturating at 100
    pub fn progress_percent(&self) -> u64 {
        progress_percent(self.products.len())
    }
}

/// Percent of `EXPECTED_PRODUCTS` that `products` represents, capped at 100
pub fn progress_percent(products: usize) -> u64 {
    ((products * 100 / EXPECTED_PRODUCTS) as u64).min(100)
}
