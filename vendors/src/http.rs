//! reqwest-backed transport with connection pooling

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use chatbench_core::RequestSpec;
use futures::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder, Response};
use tokio::time::Instant;

use crate::streaming::LineDecoder;
use crate::traits::{BufferedResponse, LineStream, TimedLine, Transport, TransportError};

/// Configuration for the HTTP client pool.
///
/// Only connection setup is bounded here; the timing engine owns the
/// per-attempt timeout.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Idle connection timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// TCP keepalive interval
    pub tcp_keepalive: Option<Duration>,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
            connect_timeout: Duration::from_secs(30),
            tcp_keepalive: Some(Duration::from_secs(60)),
            user_agent: format!("chatbench/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Create config with custom connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Create config with custom pool size.
    pub fn with_pool_max_idle(mut self, max_idle: usize) -> Self {
        self.pool_max_idle_per_host = max_idle;
        self
    }
}

/// Shared HTTP transport.
///
/// One client serves every attempt of a run so connections are reused
/// between sequential requests to the same host.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (for example when
    /// no TLS backend can be initialised).
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent);

        if let Some(keepalive) = config.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        let client = builder.build()?;

        Ok(Self { client })
    }

    fn post(&self, spec: &RequestSpec, body: &serde_json::Value) -> RequestBuilder {
        let mut request = self.client.post(&spec.endpoint).json(body);
        if let Some(key) = &spec.api_key {
            request = request.bearer_auth(key).header("api-key", key);
        }
        if spec.streaming {
            request = request.header(reqwest::header::ACCEPT, "text/event-stream");
        }
        request
    }

    async fn send_checked(
        &self,
        spec: &RequestSpec,
        body: &serde_json::Value,
    ) -> Result<Response, TransportError> {
        let response = self.post(spec, body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "Endpoint returned error status");
        Err(TransportError::from_status(status.as_u16(), &text))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        spec: &RequestSpec,
        body: &serde_json::Value,
    ) -> Result<BufferedResponse, TransportError> {
        let response = self.send_checked(spec, body).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(BufferedResponse { status, body })
    }

    async fn open_stream(
        &self,
        spec: &RequestSpec,
        body: &serde_json::Value,
    ) -> Result<LineStream, TransportError> {
        let response = self.send_checked(spec, body).await?;
        Ok(Box::pin(lines(response.bytes_stream())))
    }
}

struct LineState<S> {
    bytes: Pin<Box<S>>,
    decoder: LineDecoder,
    pending: VecDeque<TimedLine>,
    closed: bool,
}

/// Decode a byte stream into lines, stamped when their bytes arrived.
fn lines<S, B>(bytes: S) -> impl Stream<Item = Result<TimedLine, TransportError>> + Send
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send,
    B: AsRef<[u8]> + Send,
{
    let state = LineState {
        bytes: Box::pin(bytes),
        decoder: LineDecoder::new(),
        pending: VecDeque::new(),
        closed: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.pending.pop_front() {
                return Some((Ok(line), state));
            }
            if state.closed {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let received_at = Instant::now();
                    state
                        .pending
                        .extend(state.decoder.feed(chunk.as_ref()).into_iter().map(|text| {
                            TimedLine { text, received_at }
                        }));
                }
                Some(Err(err)) => {
                    state.closed = true;
                    return Some((Err(TransportError::Stream(err.to_string())), state));
                }
                None => {
                    state.closed = true;
                    if let Some(text) = state.decoder.finish() {
                        state.pending.push_back(TimedLine::now(text));
                    }
                }
            }
        }
    })
}
