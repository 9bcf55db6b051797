//! Observation variants: each implements `observe(context) -> Result`, where
//! the success case is realized as `ObserveOutcome` and the asynchrony is
//! simply the `Future` every `async fn` already returns.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::warn;
use url::Url;

use crate::config::HttpOverride;
use crate::context::RunContext;
use crate::errors::{PipelineError, Result};
use crate::item::Item;
use crate::utils::http_client::build_client;

/// What an `Observation::observe` call yielded.
pub enum ObserveOutcome {
    /// Fetch/parse failed; the manager records the URL in `not-observed`.
    None,
    /// Fetch succeeded; each item is routed by the manager.
    Items(BoxStream<'static, Item>),
}

impl ObserveOutcome {
    pub fn items(stream: impl futures::Stream<Item = Item> + Send + 'static) -> Self {
        ObserveOutcome::Items(Box::pin(stream))
    }
}

/// A request to extract one unit of external data. `hash()` is the
/// de-duplication key the router checks into `seen`; `allowed()` is
/// the router's allow-list gate and is empty for every non-HTTP variant.
#[async_trait]
pub trait Observation: Send + Sync {
    fn url(&self) -> &str;
    fn hash(&self) -> u64;

    fn allowed(&self) -> &[String] {
        &[]
    }

    async fn observe(&self, ctx: &RunContext) -> Result<ObserveOutcome>;
}

type HttpCallback = Arc<dyn Fn(String) -> BoxStream<'static, Item> + Send + Sync>;
type LineCallback = Arc<dyn Fn(Vec<String>) -> BoxStream<'static, Item> + Send + Sync>;
type RowCallback = Arc<dyn Fn(Vec<serde_json::Value>) -> BoxStream<'static, Item> + Send + Sync>;

/// `hash = H(method|url|body)`.
pub struct HttpObservation {
    pub url: String,
    pub method: String,
    pub body: Option<String>,
    pub allowed: Vec<String>,
    pub config: HttpOverride,
    callback: HttpCallback,
}

impl HttpObservation {
    pub fn new(
        url: impl Into<String>,
        callback: impl Fn(String) -> BoxStream<'static, Item> + Send + Sync + 'static,
    ) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            body: None,
            allowed: Vec::new(),
            config: HttpOverride::default(),
            callback: Arc::new(callback),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_allowed(mut self, allowed: Vec<String>) -> Self {
        self.allowed = allowed;
        self
    }

    pub fn with_config(mut self, config: HttpOverride) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl Observation for HttpObservation {
    fn url(&self) -> &str {
        &self.url
    }

    fn hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.method.hash(&mut hasher);
        self.url.hash(&mut hasher);
        self.body.hash(&mut hasher);
        hasher.finish()
    }

    fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Issues the request with the shallow overlay of this observation's
    /// config over the global HTTP defaults, observation wins key-by-key.
    async fn observe(&self, ctx: &RunContext) -> Result<ObserveOutcome> {
        let merged = ctx.settings.observation.http.overlay(&self.config);
        let client = build_client(&merged)?;
        let method = reqwest::Method::from_bytes(self.method.as_bytes())
            .map_err(|err| PipelineError::ObservationError(err.to_string()))?;

        let mut request = client.request(method, &self.url);
        if let Some(body) = &self.body {
            request = request.body(crate::utils::template::substitute_templates(body)?);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(url = %self.url, error = %err, "http observation fetch failed");
                return Ok(ObserveOutcome::None);
            }
        };
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                warn!(url = %self.url, error = %err, "failed to read http response body");
                return Ok(ObserveOutcome::None);
            }
        };
        Ok(ObserveOutcome::Items((self.callback)(text)))
    }
}

/// Inherits HTTP; `hash = H(constructed renderer URL)` rather than the
/// plain source URL, so requests differing only in render parameters
/// de-duplicate correctly.
pub struct RenderedHttpObservation {
    pub url: String,
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub render: String,
    pub params: HashMap<String, String>,
    pub allowed: Vec<String>,
    callback: HttpCallback,
}

impl RenderedHttpObservation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        url: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        protocol: impl Into<String>,
        render: impl Into<String>,
        callback: impl Fn(String) -> BoxStream<'static, Item> + Send + Sync + 'static,
    ) -> Self {
        Self {
            url: url.into(),
            host: host.into(),
            port,
            protocol: protocol.into(),
            render: render.into(),
            params: HashMap::new(),
            allowed: Vec::new(),
            callback: Arc::new(callback),
        }
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    fn renderer_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}://{}:{}/render.{}",
            self.protocol, self.host, self.port, self.render
        ))?;
        {
            let mut sorted_params: Vec<(&String, &String)> = self.params.iter().collect();
            sorted_params.sort_by_key(|(key, _)| key.as_str());

            let mut pairs = url.query_pairs_mut();
            for (key, value) in sorted_params {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("url", &self.url);
        }
        Ok(url)
    }
}

#[async_trait]
impl Observation for RenderedHttpObservation {
    fn url(&self) -> &str {
        &self.url
    }

    fn hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match self.renderer_url() {
            Ok(url) => url.as_str().hash(&mut hasher),
            Err(_) => self.url.hash(&mut hasher),
        }
        hasher.finish()
    }

    fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Uses the global HTTP configuration, not its own. The renderer's own
    /// `timeout_ms`, when configured, overrides the global request timeout,
    /// since a render round-trip is typically slower than a plain fetch.
    async fn observe(&self, ctx: &RunContext) -> Result<ObserveOutcome> {
        let renderer_url = self.renderer_url()?;
        let mut http_config = ctx.settings.observation.http.clone();
        if let Some(renderer) = &ctx.settings.observation.renderer {
            http_config.request_timeout_ms = renderer.timeout_ms;
        }
        let client = build_client(&http_config)?;

        let response = match client.get(renderer_url.clone()).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(url = %renderer_url, error = %err, "rendered http observation fetch failed");
                return Ok(ObserveOutcome::None);
            }
        };
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                warn!(url = %renderer_url, error = %err, "failed to read rendered response body");
                return Ok(ObserveOutcome::None);
            }
        };
        Ok(ObserveOutcome::Items((self.callback)(text)))
    }
}

/// `hash = H(url)`. The file handle is a scoped resource: it is
/// opened, fully drained into memory, and dropped before the callback runs,
/// so every exit path (success or error) releases it.
pub struct FileObservation {
    pub url: String,
    callback: LineCallback,
}

impl FileObservation {
    pub fn new(
        url: impl Into<String>,
        callback: impl Fn(Vec<String>) -> BoxStream<'static, Item> + Send + Sync + 'static,
    ) -> Self {
        Self {
            url: url.into(),
            callback: Arc::new(callback),
        }
    }
}

#[async_trait]
impl Observation for FileObservation {
    fn url(&self) -> &str {
        &self.url
    }

    fn hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.url.hash(&mut hasher);
        hasher.finish()
    }

    async fn observe(&self, _ctx: &RunContext) -> Result<ObserveOutcome> {
        let file = match tokio::fs::File::open(&self.url).await {
            Ok(file) => file,
            Err(err) => {
                warn!(url = %self.url, error = %err, "failed to open file observation");
                return Ok(ObserveOutcome::None);
            }
        };

        let mut framed = FramedRead::new(file, LinesCodec::new());
        let mut lines = Vec::new();
        while let Some(line) = framed.next().await {
            match line {
                Ok(line) => lines.push(line),
                Err(err) => {
                    warn!(url = %self.url, error = %err, "failed to read file observation");
                    return Ok(ObserveOutcome::None);
                }
            }
        }
        drop(framed);

        Ok(ObserveOutcome::Items((self.callback)(lines)))
    }
}

/// `hash = H(url + "|" + query)`. `url` is the session-registry key,
/// not a network address.
pub struct SqlObservation {
    pub url: String,
    pub query: String,
    callback: RowCallback,
}

impl SqlObservation {
    pub fn new(
        session_name: impl Into<String>,
        query: impl Into<String>,
        callback: impl Fn(Vec<serde_json::Value>) -> BoxStream<'static, Item> + Send + Sync + 'static,
    ) -> Self {
        Self {
            url: session_name.into(),
            query: query.into(),
            callback: Arc::new(callback),
        }
    }
}

#[async_trait]
impl Observation for SqlObservation {
    fn url(&self) -> &str {
        &self.url
    }

    fn hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.url.hash(&mut hasher);
        "|".hash(&mut hasher);
        self.query.hash(&mut hasher);
        hasher.finish()
    }

    async fn observe(&self, ctx: &RunContext) -> Result<ObserveOutcome> {
        let session = match ctx.sessions.get(&self.url) {
            Some(session) => session,
            None => {
                warn!(session = %self.url, "sql observation references unknown session");
                return Ok(ObserveOutcome::None);
            }
        };
        let query_session = match session.as_query_session() {
            Some(query_session) => query_session,
            None => {
                warn!(session = %self.url, "session does not support querying");
                return Ok(ObserveOutcome::None);
            }
        };

        let query = crate::utils::template::substitute_templates(&self.query)?;
        match query_session.query_json(&query).await {
            Ok(rows) => Ok(ObserveOutcome::Items((self.callback)(rows))),
            Err(err) => {
                warn!(session = %self.url, error = %err, "sql observation query failed");
                Ok(ObserveOutcome::None)
            }
        }
    }
}
