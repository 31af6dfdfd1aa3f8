//! Line protocol shared by the stream producers and the stream consumer.
//!
//! Wire format: UTF-8 text, one record per `\n`-terminated line.
//!
//! ```text
//! /clusters      <category>
//! /products      <name>|<code>|<price>|<review_score>|<image_reference>|<sport>|<brand>
//! /associations  <category>: <code>,<code>,...
//! ```
//!
//! Decoding is lenient: a malformed field is replaced by its placeholder and
//! logged, the rest of the line is still used.

use crate::catalog::{ProductRecord, NOT_AVAILABLE, NO_REVIEW};
use std::fmt;
use tracing::warn;

/// Separator between product fields
pub const FIELD_SEPARATOR: char = '|';

/// Number of fields in a product line
pub const PRODUCT_FIELDS: usize = 7;

/// Separator between an association's category and its codes
pub const ASSOCIATION_SEPARATOR: &str = ": ";

/// Separator between associated product codes
pub const CODE_SEPARATOR: char = ',';

// =============================================================================
// Facets
// =============================================================================

/// One independently streamed part of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Categories,
    Products,
    Associations,
}

impl Facet {
    /// Consumption order used by the stream consumer
    pub const ALL: [Facet; 3] = [Facet::Categories, Facet::Products, Facet::Associations];

    /// Route of the line stream
    pub fn path(&self) -> &'static str {
        match self {
            Facet::Categories => "/clusters",
            Facet::Products => "/products",
            Facet::Associations => "/associations",
        }
    }

    /// Route of the fully materialized JSON payload
    pub fn materialized_path(&self) -> &'static str {
        match self {
            Facet::Categories => "/clusters_non_streaming",
            Facet::Products => "/products_non_streaming",
            Facet::Associations => "/associations_non_streaming",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Facet::Categories => "categories",
            Facet::Products => "products",
            Facet::Associations => "associations",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Encoding
// =============================================================================

pub fn encode_category(category: &str) -> String {
    category.to_string()
}

/// Make an attribute value safe to embed in a product line.
///
/// Field separators become `/` and line breaks become spaces, so every
/// record occupies exactly one line with exactly seven fields.
pub fn clean_field(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            FIELD_SEPARATOR => '/',
            '\r' | '\n' => ' ',
            other => other,
        })
        .collect()
}

pub fn encode_product(record: &ProductRecord) -> String {
    [
        record.name.as_str(),
        record.id.as_str(),
        record.price.as_str(),
        record.review_score.as_str(),
        record.image_reference.as_str(),
        record.sport.as_str(),
        record.brand.as_str(),
    ]
    .join("|")
}

pub fn encode_association(category: &str, codes: &[String]) -> String {
    format!("{}{}{}", category, ASSOCIATION_SEPARATOR, codes.join(","))
}

// =============================================================================
// Decoding
// =============================================================================

/// A category line; `None` for a blank line.
pub fn decode_category(line: &str) -> Option<String> {
    let category = line.trim();
    if category.is_empty() {
        None
    } else {
        Some(category.to_string())
    }
}

/// A product line. Missing trailing fields fall back to placeholders.
///
/// Fields are split from the right, so stray separators end up in the name
/// instead of shifting the code. Returns `None` only when the line carries
/// no product code, since nothing downstream can identify such a record.
pub fn decode_product(line: &str) -> Option<ProductRecord> {
    let mut fields: Vec<&str> = line.rsplitn(PRODUCT_FIELDS, FIELD_SEPARATOR).collect();
    fields.reverse();
    if fields.len() != PRODUCT_FIELDS || fields[0].contains(FIELD_SEPARATOR) {
        warn!(
            "Product line has {} fields, expected {}: {:?}",
            line.split(FIELD_SEPARATOR).count(),
            PRODUCT_FIELDS,
            line
        );
    }

    let id = fields.get(1).map(|s| s.trim()).filter(|s| !s.is_empty())?;
    let field = |index: usize, placeholder: &str| -> String {
        fields
            .get(index)
            .map(|s| s.to_string())
            .unwrap_or_else(|| placeholder.to_string())
    };

    Some(ProductRecord {
        name: fields
            .first()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("Product {}", id)),
        id: id.to_string(),
        price: field(2, NOT_AVAILABLE),
        review_score: field(3, NO_REVIEW),
        image_reference: field(4, ""),
        sport: field(5, NOT_AVAILABLE),
        brand: field(6, NOT_AVAILABLE),
    })
}

/// An association line. A line without the separator is kept as a category
/// with no codes.
pub fn decode_association(line: &str) -> Option<(String, Vec<String>)> {
    let (category, codes) = match line.split_once(ASSOCIATION_SEPARATOR) {
        Some((category, codes)) => (category, codes),
        None => {
            warn!("Association line without separator: {:?}", line);
            (line, "")
        }
    };

    let category = category.trim();
    if category.is_empty() {
        return None;
    }

    let codes = codes
        .split(CODE_SEPARATOR)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    Some((category.to_string(), codes))
}

// =============================================================================
// Tests
// =============================================================================
