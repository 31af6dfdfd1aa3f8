//! Stream producers.
//!
//! Each facet of a sample can be presented two ways: as a lazy, paced
//! sequence of protocol lines, or as one materialized JSON value. Both read
//! the same immutable sample, so they always agree.

use crate::catalog::{Catalog, ProductRecord};
use crate::sample::{Associations, SearchSample};
use crate::streaming::protocol::{encode_association, encode_category, encode_product, Facet};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Producer configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct LineProducer {
    /// Pause between consecutive lines
    delay: Duration,
}

impl LineProducer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Lazy line stream for `facet`. Each call starts from the first line.
    ///
    /// Lines are rendered only when polled, and the stream pauses between
    /// lines (never after the last one). Dropping the stream stops it.
    pub fn stream(
        &self,
        facet: Facet,
        sample: Arc<SearchSample>,
        catalog: Arc<Catalog>,
    ) -> BoxStream<'static, String> {
        let delay = self.delay;
        info!("Starting to stream {}", facet);

        stream::unfold(0usize, move |index| {
            let sample = Arc::clone(&sample);
            let catalog = Arc::clone(&catalog);
            async move {
                let Some(line) = render_line(facet, &sample, &catalog, index) else {
                    info!("Finished streaming {}", facet);
                    return None;
                };
                if index > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                debug!("Streaming {} line {}: {}", facet, index, line.trim_end());
                Some((line, index + 1))
            }
        })
        .boxed()
    }
}

/// Every line of `facet`, newline-terminated, without pacing.
pub fn render_lines(facet: Facet, sample: &SearchSample, catalog: &Catalog) -> Vec<String> {
    (0..)
        .map_while(|index| render_line(facet, sample, catalog, index))
        .collect()
}

fn render_line(
    facet: Facet,
    sample: &SearchSample,
    catalog: &Catalog,
    index: usize,
) -> Option<String> {
    let line = match facet {
        Facet::Categories => encode_category(sample.categories.get(index)?),
        Facet::Products => encode_product(&catalog.product(sample.product_codes.get(index)?)),
        Facet::Associations => {
            let (category, codes) = sample.associations.entry(index)?;
            encode_association(category, codes)
        }
    };
    Some(line + "\n")
}

/// Products of `sample` with placeholders substituted
pub fn product_records(sample: &SearchSample, catalog: &Catalog) -> Vec<ProductRecord> {
    sample
        .product_codes
        .iter()
        .map(|code| catalog.product(code))
        .collect()
}

/// A whole facet, materialized for non-streaming callers.
///
/// Serializes as the bare payload: a list of categories, a list of
/// products, or an object of category -> codes in sample order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Materialized {
    Categories(Vec<String>),
    Products(Vec<ProductRecord>),
    Associations(Associations),
}

pub fn materialize(facet: Facet, sample: &SearchSample, catalog: &Catalog) -> Materialized {
    match facet {
        Facet::Categories => Materialized::Categories(sample.categories.clone()),
        Facet::Products => Materialized::Products(product_records(sample, catalog)),
        Facet::Associations => Materialized::Associations(sample.associations.clone()),
    }
}
