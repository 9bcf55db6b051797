use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::ClientWithMiddleware;
use url::Url;

use crate::errors::Result;
use crate::session::{Session, TimeSeriesWriter};

/// Write-only session fronting a time-series ingest endpoint (e.g. an
/// InfluxDB-style line-protocol writer). Exporters targeting it submit a
/// pre-encoded write batch rather than a single row.
pub struct TimeSeriesSession {
    client: ClientWithMiddleware,
    write_url: Url,
}

impl TimeSeriesSession {
    pub fn new(client: ClientWithMiddleware, write_url: Url) -> Self {
        Self { client, write_url }
    }

    /// Builds a session around a plain `reqwest::Client` with no retry
    /// middleware, for callers that already shaped their own client.
    pub fn from_client(client: Client, write_url: Url) -> Self {
        Self {
            client: reqwest_middleware::ClientBuilder::new(client).build(),
            write_url,
        }
    }

}

#[async_trait]
impl Session for TimeSeriesSession {
    async fn release(&self) -> Result<()> {
        Ok(())
    }

    fn as_time_series_writer(&self) -> Option<&dyn TimeSeriesWriter> {
        Some(self)
    }
}

#[async_trait]
impl TimeSeriesWriter for TimeSeriesSession {
    /// Posts a batch of points (already encoded in whatever line/body format
    /// the target accepts) to the write endpoint in a single request.
    async fn write_batch(&self, body: String) -> Result<()> {
        let response = self
            .client
            .post(self.write_url.clone())
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(crate::errors::PipelineError::ExportError(format!(
                "time-series write failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
