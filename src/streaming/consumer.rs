//! Stream consumer.
//!
//! Triggers a new sample, then drains the three facet streams one after the
//! other, emitting an event per accepted line and a final `Complete`
//! snapshot. Any unrecoverable failure becomes a single `Error` event.

use crate::config::ClientConfig;
use crate::error::Result;
use crate::streaming::channel::{event_channel, ConsumerEvent, EventSender};
use crate::streaming::protocol::Facet;
use crate::streaming::snapshot::SearchSnapshot;
use crate::streaming::transport::LineTransport;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per stream, including the first
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl From<&ClientConfig> for RetryPolicy {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// Whether the event receiver is still listening
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Abandoned,
}

pub struct StreamConsumer<T> {
    transport: T,
    retry: RetryPolicy,
}

impl<T: LineTransport> StreamConsumer<T> {
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one search, sending events to `tx`.
    ///
    /// Ends with exactly one terminal event unless the receiver is dropped
    /// first, in which case consumption simply stops.
    pub async fn run(&self, query: &str, tx: EventSender) {
        info!("Performing search for query: {}", query);

        match self.consume(&tx).await {
            Ok(Some(snapshot)) => {
                info!(
                    "Search complete. Found {} products across {} categories.",
                    snapshot.products.len(),
                    snapshot.categories.len()
                );
                let _ = tx.send(ConsumerEvent::Complete(snapshot)).await;
            }
            Ok(None) => debug!("Event receiver dropped, search abandoned"),
            Err(e) => {
                error!("Error fetching data: {}", e);
                let _ = tx.send(ConsumerEvent::Error(e.to_string())).await;
            }
        }
    }

    /// Run one search and gather every event it produced.
    pub async fn collect(&self, query: &str) -> Vec<ConsumerEvent> {
        let (tx, mut rx) = event_channel();
        let drain = async {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }
            events
        };
        let ((), events) = tokio::join!(self.run(query, tx), drain);
        events
    }

    async fn consume(&self, tx: &EventSender) -> Result<Option<SearchSnapshot>> {
        self.transport.new_search().await?;

        let mut snapshot = SearchSnapshot::new();
        for facet in Facet::ALL {
            if self.consume_facet(facet, &mut snapshot, tx).await? == Flow::Abandoned {
                return Ok(None);
            }
        }
        Ok(Some(snapshot))
    }

    async fn consume_facet(
        &self,
        facet: Facet,
        snapshot: &mut SearchSnapshot,
        tx: &EventSender,
    ) -> Result<Flow> {
        let mut attempt = 1;
        loop {
            match self.drain_once(facet, snapshot, tx).await {
                Err(e) if e.is_transport() && attempt < self.retry.max_attempts => {
                    warn!(
                        "Error in {} stream (attempt {}/{}): {}",
                        facet, attempt, self.retry.max_attempts, e
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Read one stream to its end. A restart after failure re-reads from the
    /// first line; dedup in the snapshot absorbs the repeats.
    async fn drain_once(
        &self,
        facet: Facet,
        snapshot: &mut SearchSnapshot,
        tx: &EventSender,
    ) -> Result<Flow> {
        let mut lines = self.transport.open(facet).await?;
        while let Some(line) = lines.next().await {
            let line = line?;
            let Some(event) = snapshot.accept_line(facet, &line) else {
                continue;
            };
            debug!("Received {:?}", event);
            if tx.send(event).await.is_err() {
                return Ok(Flow::Abandoned);
            }
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::streaming::transport::LineStream;
    use async_trait::async_trait;
    use futures::stream;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Serves canned lines. Each facet fails its first `failures` opens, and
    /// its first `read_failures` streams break after two lines.
    #[derive(Default)]
    struct FakeTransport {
        lines: HashMap<Facet, Vec<String>>,
        failures: HashMap<Facet, u32>,
        read_failures: HashMap<Facet, u32>,
        opens: Mutex<Vec<Facet>>,
        new_searches: AtomicU32,
        fail_new_search: bool,
    }

    impl FakeTransport {
        fn with_lines() -> Self {
            let mut lines = HashMap::new();
            lines.insert(
                Facet::Categories,
                vec!["Golf".to_string(), "Yoga".to_string(), "Golf".to_string()],
            );
            lines.insert(
                Facet::Products,
                vec![
                    "Club|1|30.00|4.0|p1|Golf|Inesis".to_string(),
                    "Mat|2|15.00|None||Yoga|Kimjaly".to_string(),
                    "Club|1|30.00|4.0|p1|Golf|Inesis".to_string(),
                ],
            );
            lines.insert(
                Facet::Associations,
                vec!["Golf: 1".to_string(), "Yoga: 2,1".to_string()],
            );
            Self {
                lines,
                ..Default::default()
            }
        }

        fn failing(mut self, facet: Facet, failures: u32) -> Self {
            self.failures.insert(facet, failures);
            self
        }

        fn breaking(mut self, facet: Facet, failures: u32) -> Self {
            self.read_failures.insert(facet, failures);
            self
        }
    }

    #[async_trait]
    impl LineTransport for FakeTransport {
        async fn new_search(&self) -> Result<()> {
            self.new_searches.fetch_add(1, Ordering::SeqCst);
            if self.fail_new_search {
                return Err(Error::Status {
                    status: 500,
                    url: "/new_search".into(),
                });
            }
            Ok(())
        }

        async fn open(&self, facet: Facet) -> Result<LineStream> {
            let mut opens = self.opens.lock().unwrap();
            opens.push(facet);
            let attempts = opens.iter().filter(|f| **f == facet).count() as u32;
            if attempts <= self.failures.get(&facet).copied().unwrap_or(0) {
                return Err(Error::Transport(format!("connection refused ({})", facet)));
            }
            let lines = self.lines.get(&facet).cloned().unwrap_or_default();
            if attempts <= self.read_failures.get(&facet).copied().unwrap_or(0) {
                let reset = Error::Transport(format!("connection reset ({})", facet));
                let partial = lines.into_iter().take(2).map(Ok).chain(std::iter::once(Err(reset)));
                return Ok(stream::iter(partial).boxed());
            }
            Ok(stream::iter(lines.into_iter().map(Ok)).boxed())
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_consumes_in_order_with_dedup() {
        let consumer = StreamConsumer::new(FakeTransport::with_lines(), fast_retry());
        let events = consumer.collect("running shoes").await;

        assert_eq!(consumer.transport().new_searches.load(Ordering::SeqCst), 1);
        assert_eq!(
            *consumer.transport().opens.lock().unwrap(),
            vec![Facet::Categories, Facet::Products, Facet::Associations]
        );

        // 2 categories + 2 products + 2 associations + complete
        assert_eq!(events.len(), 7);
        assert_eq!(events[0], ConsumerEvent::Category("Golf".into()));
        assert!(matches!(events[2], ConsumerEvent::Product(ref p) if p.id == "1"));
        assert!(matches!(events[4], ConsumerEvent::Association { .. }));

        let ConsumerEvent::Complete(snapshot) = events.last().unwrap() else {
            panic!("Expected Complete, got {:?}", events.last());
        };
        assert_eq!(snapshot.categories, vec!["Golf", "Yoga"]);
        assert_eq!(snapshot.products.len(), 2);
        assert_eq!(
            snapshot.associations.get("Yoga"),
            Some(&["2".to_string(), "1".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let transport = FakeTransport::with_lines().failing(Facet::Products, 2);
        let consumer = StreamConsumer::new(transport, fast_retry());
        let events = consumer.collect("tent").await;

        assert!(matches!(events.last(), Some(ConsumerEvent::Complete(_))));
        let opens = consumer.transport().opens.lock().unwrap().clone();
        assert_eq!(opens.iter().filter(|f| **f == Facet::Products).count(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_emit_single_error() {
        let transport = FakeTransport::with_lines().failing(Facet::Products, 3);
        let consumer = StreamConsumer::new(transport, fast_retry());
        let events = consumer.collect("tent").await;

        let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminal.len(), 1);
        match events.last() {
            Some(ConsumerEvent::Error(msg)) => assert!(msg.contains("connection refused")),
            other => panic!("Expected Error, got {:?}", other),
        }
        // Categories were delivered before the failure, associations never opened
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, ConsumerEvent::Category(_)))
                .count(),
            2
        );
        let opens = consumer.transport().opens.lock().unwrap().clone();
        assert!(!opens.contains(&Facet::Associations));
    }

    fn count_products(events: &[ConsumerEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, ConsumerEvent::Product(_)))
            .count()
    }

    #[tokio::test]
    async fn test_broken_read_restarts_stream_without_duplicates() {
        let transport = FakeTransport::with_lines()
            .breaking(Facet::Products, 1)
            .breaking(Facet::Categories, 2);
        let consumer = StreamConsumer::new(transport, fast_retry());
        let events = consumer.collect("tent").await;

        let opens = consumer.transport().opens.lock().unwrap().clone();
        assert_eq!(opens.iter().filter(|f| **f == Facet::Categories).count(), 3);
        assert_eq!(opens.iter().filter(|f| **f == Facet::Products).count(), 2);

        // Lines replayed after the restart are absorbed
        let categories: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ConsumerEvent::Category(c) => Some(c.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(categories, vec!["Golf", "Yoga"]);
        assert_eq!(count_products(&events), 2);

        match events.last() {
            Some(ConsumerEvent::Complete(snapshot)) => {
                assert_eq!(snapshot.categories.len(), 2);
                assert_eq!(snapshot.products.len(), 2);
            }
            other => panic!("Expected Complete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_failing_every_attempt_emits_single_error() {
        let transport = FakeTransport::with_lines().breaking(Facet::Products, 3);
        let consumer = StreamConsumer::new(transport, fast_retry());
        let events = consumer.collect("tent").await;

        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        match events.last() {
            Some(ConsumerEvent::Error(msg)) => assert!(msg.contains("connection reset")),
            other => panic!("Expected Error, got {:?}", other),
        }
        // Products delivered before the breaks appear once each
        assert_eq!(count_products(&events), 2);
        let opens = consumer.transport().opens.lock().unwrap().clone();
        assert_eq!(opens.iter().filter(|f| **f == Facet::Products).count(), 3);
        assert!(!opens.contains(&Facet::Associations));
    }

    #[tokio::test]
    async fn test_failed_new_search_is_terminal() {
        let transport = FakeTransport {
            fail_new_search: true,
            ..FakeTransport::with_lines()
        };
        let consumer = StreamConsumer::new(transport, fast_retry());
        let events = consumer.collect("bike").await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ConsumerEvent::Error(_)));
        assert!(consumer.transport().opens.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_receiver_stops_consumption() {
        let consumer = StreamConsumer::new(FakeTransport::with_lines(), fast_retry());
        let (tx, rx) = event_channel();
        drop(rx);

        consumer.run("kayak", tx).await;
        // Stopped at the first rejected send
        assert_eq!(
            *consumer.transport().opens.lock().unwrap(),
            vec![Facet::Categories]
        );
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryPolicy::from(&ClientConfig {
            max_attempts: 5,
            backoff_ms: 250,
            ..Default::default()
        });
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Duration::from_millis(250));
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }
}
