use crate::catalog::Catalog;
use crate::config::Config;
use crate::sample::{SampleGenerator, SampleStore};
use crate::streaming::LineProducer;
use std::sync::Arc;
use tracing::warn;

/// Shared by every request handler.
pub struct AppState {
    pub store: SampleStore,
    pub producer: LineProducer,
}

impl AppState {
    /// Build the state and generate the first sample.
    ///
    /// A failed first generation is logged; the first request retries it.
    pub fn new(catalog: Arc<Catalog>, config: &Config) -> Arc<Self> {
        let store = SampleStore::new(
            catalog,
            SampleGenerator::new(config.sampling.clone()),
            config.sampling.seed,
        );
        if let Err(e) = store.replace() {
            warn!("Initial sample generation failed: {}", e);
        }

        Arc::new(Self {
            store,
            producer: LineProducer::new(config.server.line_delay()),
        })
    }
}
