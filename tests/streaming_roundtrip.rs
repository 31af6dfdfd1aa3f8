#[cfg(test)]
mod tests {
    use gearstream::catalog::{Catalog, ProductAttributes, ProductRecord};
    use gearstream::config::{Config, SamplingPolicy};
    use gearstream::sample::{Associations, SearchSample};
    use gearstream::server::{self, AppState};
    use gearstream::streaming::{
        ConsumerEvent, Facet, HttpTransport, LineTransport, RetryPolicy, StreamConsumer,
    };
    use futures::StreamExt;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.server.line_delay_ms = 0;
        config.sampling.seed = Some(99);
        config
    }

    fn test_catalog(size: usize) -> Arc<Catalog> {
        let codes: Vec<String> = (0..size).map(|i| format!("{}", 4_000 + i)).collect();
        let mut attributes = HashMap::new();
        for code in codes.iter().step_by(2) {
            attributes.insert(
                code.clone(),
                ProductAttributes {
                    name: Some(format!("Backpack {}", code)),
                    price: Some("24.99".into()),
                    review_score: Some("4.3".into()),
                    image_reference: Some(code.clone()),
                    sport: Some("Hiking".into()),
                    brand: Some("Forclaz".into()),
                },
            );
        }
        Arc::new(Catalog::new(codes, attributes))
    }

    async fn spawn_server(catalog: Arc<Catalog>, config: Config) -> anyhow::Result<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = AppState::new(catalog, &config);
        tokio::spawn(server::serve(listener, state, std::future::pending()));
        Ok(addr)
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(10),
        }
    }

    async fn materialized_sample(transport: &HttpTransport) -> anyhow::Result<SearchSample> {
        let categories: Vec<String> = transport.fetch_materialized(Facet::Categories).await?;
        let products: Vec<ProductRecord> = transport.fetch_materialized(Facet::Products).await?;
        let associations: Associations = transport.fetch_materialized(Facet::Associations).await?;
        Ok(SearchSample {
            product_codes: products.into_iter().map(|p| p.id).collect(),
            categories,
            associations,
        })
    }

    #[tokio::test]
    async fn test_consumer_matches_materialized_payloads() -> anyhow::Result<()> {
        let addr = spawn_server(test_catalog(80), test_config()).await?;
        let base_url = format!("http://{}", addr);
        let consumer = StreamConsumer::new(HttpTransport::new(base_url.clone()), fast_retry());

        let events = consumer.collect("hiking backpack").await;
        let snapshot = match events.last() {
            Some(ConsumerEvent::Complete(snapshot)) => snapshot.clone(),
            other => panic!("Expected Complete, got {:?}", other),
        };
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

        let transport = HttpTransport::new(base_url);
        let categories: Vec<String> = transport.fetch_materialized(Facet::Categories).await?;
        let products: Vec<ProductRecord> = transport.fetch_materialized(Facet::Products).await?;
        let associations: Associations = transport.fetch_materialized(Facet::Associations).await?;

        assert_eq!(snapshot.categories, categories);
        assert_eq!(snapshot.products, products);
        assert_eq!(snapshot.associations, associations);
        assert_eq!(snapshot.categories.len(), 5);
        assert!((20..=50).contains(&snapshot.products.len()));
        assert_eq!(snapshot.progress_percent(), 100);
        Ok(())
    }

    #[tokio::test]
    async fn test_streamed_lines_are_plain_text() -> anyhow::Result<()> {
        let addr = spawn_server(test_catalog(60), test_config()).await?;
        let base_url = format!("http://{}", addr);

        let response = reqwest::get(format!("{}/clusters", base_url)).await?;
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
        let body = response.text().await?;
        assert_eq!(body.lines().count(), 5);
        assert!(body.ends_with('\n'));

        let transport = HttpTransport::new(base_url);
        let lines: Vec<String> = transport
            .open(Facet::Products)
            .await?
            .map(|line| line.unwrap())
            .collect()
            .await;
        assert!(lines.iter().all(|l| l.split('|').count() == 7));
        Ok(())
    }

    #[tokio::test]
    async fn test_regeneration_yields_fresh_valid_samples() -> anyhow::Result<()> {
        let config = test_config();
        let addr = spawn_server(test_catalog(120), config.clone()).await?;
        let transport = HttpTransport::new(format!("http://{}", addr));

        transport.new_search().await?;
        let first = materialized_sample(&transport).await?;
        transport.new_search().await?;
        let second = materialized_sample(&transport).await?;

        assert!(first.invariant_violations(&config.sampling).is_empty());
        assert!(second.invariant_violations(&config.sampling).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_new_search_response() -> anyhow::Result<()> {
        let addr = spawn_server(test_catalog(60), test_config()).await?;
        let response = reqwest::Client::new()
            .post(format!("http://{}/new_search", addr))
            .send()
            .await?;
        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["message"], "New search sample generated");
        Ok(())
    }

    #[tokio::test]
    async fn test_tiny_catalog_is_unavailable_under_strict_policy() -> anyhow::Result<()> {
        let mut config = test_config();
        config.sampling.policy = SamplingPolicy::Strict;
        let addr = spawn_server(test_catalog(5), config).await?;

        let response = reqwest::get(format!("http://{}/clusters", addr)).await?;
        assert_eq!(response.status().as_u16(), 503);

        let consumer = StreamConsumer::new(HttpTransport::new(format!("http://{}", addr)), fast_retry());
        let events = consumer.collect("anything").await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            ConsumerEvent::Error(msg) => assert!(msg.contains("503")),
            other => panic!("Expected Error, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_backend_yields_error_event() -> anyhow::Result<()> {
        // Reserve a port, then free it so nothing listens there
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let consumer = StreamConsumer::new(HttpTransport::new(format!("http://{}", addr)), fast_retry());
        let events = consumer.collect("tent").await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ConsumerEvent::Error(_)));
        Ok(())
    }
}
