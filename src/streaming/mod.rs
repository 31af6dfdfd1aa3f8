//! Line streaming between the sample backend and the search consumer.
//!
//! # Architecture
//!
//! ```text
//! Backend:                                Consumer:
//! +--------------+   text lines   +---------------+   events   +----------+
//! | LineProducer | -------------> | StreamConsumer| ---------> | renderer |
//! | (per facet)  |   (paced)      | (+ snapshot)  |  (mpsc)    |          |
//! +--------------+                +---------------+            +----------+
//! ```
//!
//! A search is three facets consumed in order: categories, products,
//! associations. Each facet is a plain-text body with one record per line
//! (see `protocol`). The consumer folds lines into a `SearchSnapshot`,
//! deduplicating replays after a retry, and forwards each accepted record as
//! a `ConsumerEvent`.

pub mod channel;
pub mod consumer;
pub mod producer;
pub mod protocol;
pub mod snapshot;
pub mod transport;

pub use channel::{event_channel, ConsumerEvent, EventReceiver, EventSender, EVENT_CHANNEL_SIZE};
pub use consumer::{RetryPolicy, StreamConsumer};
pub use producer::{materialize, product_records, render_lines, LineProducer, Materialized};
pub use protocol::{
    decode_association, decode_category, decode_product, encode_association, encode_category,
    encode_product, Facet,
};
pub use snapshot::{progress_percent, SearchSnapshot, EXPECTED_PRODUCTS};
pub use transport::{split_lines, HttpTransport, LineStream, LineTransport};
