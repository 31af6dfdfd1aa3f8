//! Sample generator.
//!
//! Draws products, categories and associations uniformly without
//! replacement. Pure apart from the randomness it consumes.

use crate::catalog::Catalog;
use crate::config::{SamplingConfig, SamplingPolicy};
use crate::error::{Error, Result};
use crate::sample::{Associations, SearchSample, GENERIC_CATEGORIES};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

/// Generator configuration is the `[sampling]` config section
pub struct SampleGenerator {
    config: SamplingConfig,
}

impl SampleGenerator {
    pub fn new(config: SamplingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Produce one sample from `catalog`.
    ///
    /// Under `SamplingPolicy::Strict` a catalog smaller than the drawn
    /// product count is an `Error::Sampling`; nothing partial is returned.
    pub fn generate<R: Rng + ?Sized>(&self, catalog: &Catalog, rng: &mut R) -> Result<SearchSample> {
        let cfg = &self.config;

        let num_products = rng.gen_range(cfg.min_products..=cfg.max_products);
        let product_codes = draw(
            catalog.codes(),
            num_products,
            "product codes",
            cfg.policy,
            rng,
        )?;
        info!("Sampled {} unique product codes", product_codes.len());

        let categories = draw(
            &GENERIC_CATEGORIES,
            cfg.categories,
            "categories",
            cfg.policy,
            rng,
        )?
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
        info!("Sampled categories: {:?}", categories);

        let mut associations = Associations::new();
        for category in &categories {
            // Capped by the sample size, so this draw can never overrun
            let k = rng
                .gen_range(cfg.min_associated..=cfg.max_associated)
                .min(product_codes.len());
            let codes: Vec<String> = product_codes.choose_multiple(rng, k).cloned().collect();
            debug!("{} -> {} products", category, codes.len());
            associations.insert(category.clone(), codes);
        }
        info!("Generated associations for {} categories", associations.len());

        Ok(SearchSample {
            product_codes,
            categories,
            associations,
        })
    }
}

/// Draw `count` distinct items from `population`, honoring `policy` when the
/// population is too small.
fn draw<T: Clone, R: Rng + ?Sized>(
    population: &[T],
    count: usize,
    what: &'static str,
    policy: SamplingPolicy,
    rng: &mut R,
) -> Result<Vec<T>> {
    if count > population.len() && policy == SamplingPolicy::Strict {
        return Err(Error::Sampling {
            what,
            requested: count,
            available: population.len(),
        });
    }
    let count = count.min(population.len());
    Ok(population.choose_multiple(rng, count).cloned().collect())
}
