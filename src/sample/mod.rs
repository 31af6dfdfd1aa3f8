//! Search samples: one random draw of products, categories and the
//! category -> products associations between them.
//!
//! ```text
//! +-----------+     +-----------------+     +-------------+
//! |  Catalog  | --> | SampleGenerator | --> | SampleStore |
//! +-----------+     +-----------------+     +-------------+
//!                                             | Arc<SearchSample> per request
//!                                             v
//!                                       stream producers
//! ```

pub mod generator;
pub mod store;

pub use generator::SampleGenerator;
pub use store::SampleStore;

use crate::config::SamplingConfig;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Built-in category labels a sample draws from.
pub const GENERIC_CATEGORIES: [&str; 20] = [
    "Outdoor Adventure",
    "Water Sports",
    "Team Sports",
    "Fitness Equipment",
    "Winter Sports",
    "Cycling",
    "Running",
    "Camping",
    "Hiking",
    "Yoga",
    "Martial Arts",
    "Racquet Sports",
    "Golf",
    "Climbing",
    "Fishing",
    "Skateboarding",
    "Surfing",
    "Swimming",
    "Athletics",
    "Gym Workout",
];

/// Category -> product codes, in insertion order.
///
/// Inserting an existing category replaces its codes in place (last write
/// wins, first position kept). Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Associations {
    entries: Vec<(String, Vec<String>)>,
}

impl Associations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: String, codes: Vec<String>) {
        match self.entries.iter_mut().find(|(c, _)| *c == category) {
            Some(entry) => entry.1 = codes,
            None => self.entries.push((category, codes)),
        }
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, codes)| codes.as_slice())
    }

    /// The `index`-th entry in insertion order
    pub fn entry(&self, index: usize) -> Option<(&str, &[String])> {
        self.entries
            .get(index)
            .map(|(c, codes)| (c.as_str(), codes.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(c, codes)| (c.as_str(), codes.as_slice()))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for Associations {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut associations = Associations::new();
        for (category, codes) in iter {
            associations.insert(category, codes);
        }
        associations
    }
}

impl Serialize for Associations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(c, codes)| (c, codes)))
    }
}

impl<'de> Deserialize<'de> for Associations {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AssociationsVisitor;

        impl<'de> Visitor<'de> for AssociationsVisitor {
            type Value = Associations;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category to product codes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Associations, A::Error> {
                let mut associations = Associations::new();
                while let Some((category, codes)) = map.next_entry::<String, Vec<String>>()? {
                    associations.insert(category, codes);
                }
                Ok(associations)
            }
        }

        deserializer.deserialize_map(AssociationsVisitor)
    }
}

/// One generated search session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSample {
    pub product_codes: Vec<String>,
    pub categories: Vec<String>,
    pub associations: Associations,
}

impl SearchSample {
    /// Describe every way this sample breaks the sampling contract for
    /// `config`. Empty means the sample is well-formed.
    pub fn invariant_violations(&self, config: &SamplingConfig) -> Vec<String> {
        let mut violations = Vec::new();
        let n = self.product_codes.len();

        if n < config.min_products || n > config.max_products {
            violations.push(format!(
                "{} product codes outside {}..={}",
                n, config.min_products, config.max_products
            ));
        }

        let products: HashSet<&str> = self.product_codes.iter().map(String::as_str).collect();
        if products.len() != n {
            violations.push("duplicate product codes".to_string());
        }

        let categories: HashSet<&str> = self.categories.iter().map(String::as_str).collect();
        if self.categories.len() != config.categories {
            violations.push(format!(
                "{} categories, expected {}",
                self.categories.len(),
                config.categories
            ));
        }
        if categories.len() != self.categories.len() {
            violations.push("duplicate categories".to_string());
        }

        let associated: HashSet<&str> = self.associations.categories().collect();
        if associated != categories || self.associations.len() != self.categories.len() {
            violations.push("association keys differ from categories".to_string());
        }

        let upper = config.max_associated.min(n);
        for (category, codes) in self.associations.iter() {
            if codes.len() < config.min_associated || codes.len() > upper {
                violations.push(format!(
                    "{}: {} associated codes outside {}..={}",
                    category,
                    codes.len(),
                    config.min_associated,
                    upper
                ));
            }
            let unique: HashSet<&str> = codes.iter().map(String::as_str).collect();
            if unique.len() != codes.len() {
                violations.push(format!("{}: duplicate associated codes", category));
            }
            if let Some(stray) = codes.iter().find(|c| !products.contains(c.as_str())) {
                violations.push(format!("{}: {} is not in the sample", category, stray));
            }
        }

        violations
    }
}
