//! Transport abstraction for the stream consumer.
//!
//! `HttpTransport` talks to a running backend; tests substitute their own
//! `LineTransport` to inject failures.

use crate::error::{Error, Result};
use crate::streaming::protocol::Facet;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use tracing::debug;

/// Lines of one facet, terminators stripped
pub type LineStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait LineTransport: Send + Sync {
    /// Ask the backend to replace its live sample
    async fn new_search(&self) -> Result<()>;

    /// Open the line stream of `facet`
    async fn open(&self, facet: Facet) -> Result<LineStream>;
}

/// HTTP transport backed by reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch the materialized JSON payload of `facet`.
    pub async fn fetch_materialized<T: serde::de::DeserializeOwned>(&self, facet: Facet) -> Result<T> {
        let url = self.url(facet.materialized_path());
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl LineTransport for HttpTransport {
    async fn new_search(&self) -> Result<()> {
        let url = self.url("/new_search");
        debug!("POST {}", url);
        self.client.post(&url).send().await?.error_for_status()?;
        Ok(())
    }

    async fn open(&self, facet: Facet) -> Result<LineStream> {
        let url = self.url(facet.path());
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(split_lines(Box::pin(response.bytes_stream())))
    }
}

struct LineSplitter<S> {
    body: S,
    buf: BytesMut,
    finished: bool,
}

/// Re-chunk a byte stream into lines.
///
/// A trailing line without terminator is still yielded. A body error is
/// yielded once and ends the stream.
pub fn split_lines<S, E>(body: S) -> LineStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin + Send + 'static,
    E: Into<Error>,
{
    let state = LineSplitter {
        body,
        buf: BytesMut::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(pos) = state.buf.iter().position(|b| *b == b'\n') {
                let line = state.buf.split_to(pos + 1);
                return Some((Ok(decode_line(&line)), state));
            }
            if state.finished {
                if state.buf.is_empty() {
                    return None;
                }
                let rest = state.buf.split();
                return Some((Ok(decode_line(&rest)), state));
            }
            match state.body.next().await {
                Some(Ok(chunk)) => state.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    state.finished = true;
                    state.buf.clear();
                    return Some((Err(e.into()), state));
                }
                None => state.finished = true,
            }
        }
    })
    .boxed()
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}
