//! Product catalog: the ordered universe of product codes plus their
//! attributes.
//!
//! Loaded once at startup and read-only afterwards. Load failures never abort
//! startup; each half of the catalog independently degrades to empty.

use crate::error::{Error, Result};
use crate::streaming::protocol::clean_field;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Placeholder for a missing price, sport or brand
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder for a missing review score
pub const NO_REVIEW: &str = "None";

/// Shown when a product has no image reference
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/600x600?text=No+Image";

/// Attributes known for a product. Every field is optional; `ProductRecord`
/// is where the placeholders get substituted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductAttributes {
    pub name: Option<String>,
    pub price: Option<String>,
    pub review_score: Option<String>,
    pub image_reference: Option<String>,
    pub sport: Option<String>,
    pub brand: Option<String>,
}

impl ProductAttributes {
    /// Build from one JSON object of the product graph.
    ///
    /// Numbers keep their JSON text form, `null` counts as absent.
    pub fn from_json(value: &Value) -> Self {
        let field = |key: &str| value.get(key).and_then(json_text);
        Self {
            name: field("product_name"),
            price: field("price"),
            review_score: field("review_score"),
            image_reference: field("image_sign_kit"),
            sport: field("sport"),
            brand: field("brand"),
        }
    }
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A fully materialized product as it travels over the wire.
///
/// Serialized field names match what dashboards consume from
/// `/products_non_streaming`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub id: String,
    pub price: String,
    pub review_score: String,
    #[serde(rename = "image_sign_kit")]
    pub image_reference: String,
    pub sport: String,
    pub brand: String,
}

impl ProductRecord {
    /// Resolve a code against optional attributes, substituting placeholders
    /// for everything missing. Values are cleaned for the line protocol.
    pub fn resolve(code: &str, attributes: Option<&ProductAttributes>) -> Self {
        let attrs = attributes.cloned().unwrap_or_default();
        let clean = |value: Option<String>| value.map(|v| clean_field(&v));
        let attrs = ProductAttributes {
            name: clean(attrs.name),
            price: clean(attrs.price),
            review_score: clean(attrs.review_score),
            image_reference: clean(attrs.image_reference),
            sport: clean(attrs.sport),
            brand: clean(attrs.brand),
        };
        Self {
            name: attrs.name.unwrap_or_else(|| format!("Product {}", code)),
            id: code.to_string(),
            price: attrs.price.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            review_score: attrs.review_score.unwrap_or_else(|| NO_REVIEW.to_string()),
            image_reference: attrs.image_reference.unwrap_or_default(),
            sport: attrs.sport.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            brand: attrs.brand.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }

    /// Numeric review score, if there is a usable one.
    pub fn review_value(&self) -> Option<f64> {
        let score = self.review_score.trim();
        if score.is_empty() || score == NO_REVIEW {
            return None;
        }
        match score.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                warn!("Invalid review score for {}: {}", self.id, self.review_score);
                None
            }
        }
    }

    /// Product image URL, or a placeholder image when there is no reference
    pub fn image_url(&self) -> String {
        let reference = self.image_reference.as_str();
        if reference.is_empty() || reference == NOT_AVAILABLE {
            return PLACEHOLDER_IMAGE_URL.to_string();
        }
        let pixel_id = if reference.starts_with('p') {
            reference.to_string()
        } else {
            format!("p{}", reference)
        };
        format!(
            "https://contents.mediadecathlon.com/{}/?format=png&quality=100&f=600x600",
            pixel_id
        )
    }
}

/// Where catalog data comes from.
pub trait CatalogSource {
    /// Human-readable origin, used in logs
    fn describe(&self) -> String;

    fn load_codes(&self) -> Result<Vec<String>>;

    fn load_attributes(&self) -> Result<HashMap<String, ProductAttributes>>;
}

/// CSV product codes plus a JSON product graph on disk.
pub struct FileCatalogSource {
    pub codes_path: PathBuf,
    pub graph_path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(codes_path: impl Into<PathBuf>, graph_path: impl Into<PathBuf>) -> Self {
        Self {
            codes_path: codes_path.into(),
            graph_path: graph_path.into(),
        }
    }
}

impl CatalogSource for FileCatalogSource {
    fn describe(&self) -> String {
        format!(
            "{} + {}",
            self.codes_path.display(),
            self.graph_path.display()
        )
    }

    fn load_codes(&self) -> Result<Vec<String>> {
        let source_name = self.codes_path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.codes_path)
            .map_err(|e| Error::catalog(&source_name, e))?;

        let mut codes = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| Error::catalog(&source_name, e))?;
            match record.get(0).map(str::trim) {
                Some(code) if !code.is_empty() => codes.push(code.to_string()),
                _ => continue,
            }
        }
        Ok(codes)
    }

    fn load_attributes(&self) -> Result<HashMap<String, ProductAttributes>> {
        let source_name = self.graph_path.display().to_string();
        let text = std::fs::read_to_string(&self.graph_path)
            .map_err(|e| Error::catalog(&source_name, e))?;
        let value: Value =
            serde_json::from_str(&text).map_err(|e| Error::catalog(&source_name, e))?;
        parse_product_graph(&value).map_err(|msg| Error::catalog(&source_name, msg))
    }
}

/// Accepts either `{code: {...}}` or `[{"product_code": ..., ...}]`.
pub fn parse_product_graph(
    value: &Value,
) -> std::result::Result<HashMap<String, ProductAttributes>, String> {
    match value {
        Value::Object(map) => Ok(map
            .iter()
            .map(|(code, attrs)| (code.clone(), ProductAttributes::from_json(attrs)))
            .collect()),
        Value::Array(items) => {
            let mut graph = HashMap::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                // Numeric codes are re-keyed to their text form
                let Some(code) = item.get("product_code").and_then(json_text) else {
                    warn!("Product graph entry {} has no product_code, skipping", index);
                    continue;
                };
                graph.insert(code, ProductAttributes::from_json(item));
            }
            Ok(graph)
        }
        _ => Err("expected a JSON object or array at top level".to_string()),
    }
}

/// The loaded catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    codes: Vec<String>,
    attributes: HashMap<String, ProductAttributes>,
}

impl Catalog {
    pub fn new(codes: Vec<String>, attributes: HashMap<String, ProductAttributes>) -> Self {
        Self { codes, attributes }
    }

    /// Load from `source`. Never fails: a broken half is logged and left
    /// empty.
    pub fn load(source: &dyn CatalogSource) -> Self {
        info!("Loading catalog from {}", source.describe());

        let codes = match source.load_codes() {
            Ok(codes) => {
                info!("Loaded {} product codes", codes.len());
                codes
            }
            Err(e) => {
                error!("Error loading product codes: {}", e);
                Vec::new()
            }
        };

        let attributes = match source.load_attributes() {
            Ok(attributes) => {
                info!("Loaded product graph with {} items", attributes.len());
                attributes
            }
            Err(e) => {
                error!("Error loading product graph: {}", e);
                HashMap::new()
            }
        };

        Self { codes, attributes }
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn attributes(&self, code: &str) -> Option<&ProductAttributes> {
        self.attributes.get(code)
    }

    /// Product record for `code`, with placeholders for missing data.
    pub fn product(&self, code: &str) -> ProductRecord {
        ProductRecord::resolve(code, self.attributes(code))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn attributed_len(&self) -> usize {
        self.attributes.len()
    }
}
