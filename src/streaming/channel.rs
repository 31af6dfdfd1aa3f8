//! Events flowing from the stream consumer to the rendering layer.
//!
//! Bounded channel so a slow renderer applies backpressure to consumption.

use crate::catalog::ProductRecord;
use crate::streaming::snapshot::SearchSnapshot;
use serde::Serialize;
use tokio::sync::mpsc;

/// Channel size for consumer -> renderer events
pub const EVENT_CHANNEL_SIZE: usize = 256;

/// One incremental update of a search.
///
/// Serializes as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ConsumerEvent {
    /// A category seen for the first time
    Category(String),

    /// A product seen for the first time
    Product(ProductRecord),

    /// Products of one category; a repeated category replaces the earlier list
    Association {
        category: String,
        product_codes: Vec<String>,
    },

    /// All streams exhausted; carries everything accumulated
    Complete(SearchSnapshot),

    /// Terminal failure; no further events follow
    Error(String),
}

impl ConsumerEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConsumerEvent::Complete(_) | ConsumerEvent::Error(_))
    }
}

/// Sender for consumer events
pub type EventSender = mpsc::Sender<ConsumerEvent>;

/// Receiver for consumer events in the rendering layer
pub type EventReceiver = mpsc::Receiver<ConsumerEvent>;

/// Create a bounded channel for consumer -> renderer communication
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_SIZE)
}
