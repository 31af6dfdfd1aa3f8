//! The single live sample.
//!
//! Samples are immutable once stored. Readers take an `Arc` once per request
//! and keep a stable snapshot even if a new search swaps the slot meanwhile.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::sample::{SampleGenerator, SearchSample};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::info;

pub struct SampleStore {
    catalog: Arc<Catalog>,
    generator: SampleGenerator,
    rng: Mutex<StdRng>,
    current: RwLock<Option<Arc<SearchSample>>>,
}

impl SampleStore {
    /// Create an empty store. `seed` makes the sample sequence reproducible.
    pub fn new(catalog: Arc<Catalog>, generator: SampleGenerator, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            catalog,
            generator,
            rng: Mutex::new(rng),
            current: RwLock::new(None),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The live sample, if one has been generated
    pub fn current(&self) -> Option<Arc<SearchSample>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return the live sample, generating the first one if needed.
    pub fn get_or_init(&self) -> Result<Arc<SearchSample>> {
        if let Some(sample) = self.current() {
            return Ok(sample);
        }

        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        // Another request may have initialized it while we waited
        if let Some(sample) = slot.as_ref() {
            return Ok(Arc::clone(sample));
        }
        let sample = Arc::new(self.generate()?);
        *slot = Some(Arc::clone(&sample));
        Ok(sample)
    }

    /// Generate a fresh sample and make it the live one.
    ///
    /// On failure the previous sample stays live.
    pub fn replace(&self) -> Result<Arc<SearchSample>> {
        let sample = Arc::new(self.generate()?);
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&sample));
        info!(
            "New search sample: {} products, {} categories (replaced: {})",
            sample.product_codes.len(),
            sample.categories.len(),
            previous.is_some()
        );
        Ok(sample)
    }

    fn generate(&self) -> Result<SearchSample> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.generator.generate(&self.catalog, &mut *rng)
    }
}
