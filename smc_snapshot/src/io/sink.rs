use std::path::{Path, PathBuf};

use async_trait::async_trait;
use snafu::{Backtrace, ResultExt, Snafu};
use tracing::info;

use crate::io::json::to_json_string;
use crate::models::payload::Payload;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// The payload could not be rendered as JSON.
    #[snafu(display("Failed to serialize payload: {source}"))]
    Serialize {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// An I/O error while writing to `path`.
    #[snafu(display("Failed to write {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

#[async_trait]
pub trait PayloadSink {
    /// The type of output returned after a successful write operation.
    ///
    /// This makes the trait flexible. For example:
    /// - A file sink returns the `PathBuf` it wrote.
    /// - A response sink returns the rendered body.
    type Output;

    /// Writes one payload to the destination.
    async fn write(&self, payload: &Payload) -> Result<Self::Output, SinkError>;
}

/// Writes the payload as indented UTF-8 JSON to a fixed path, creating parent directories.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PayloadSink for JsonFileSink {
    type Output = PathBuf;

    async fn write(&self, payload: &Payload) -> Result<PathBuf, SinkError> {
        let body = to_json_string(payload)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context(IoSnafu { path: parent })?;
        }
        tokio::fs::write(&self.path, body)
            .await
            .context(IoSnafu { path: &self.path })?;
        info!(
            path = %self.path.display(),
            timeframes = payload.timeframes.len(),
            "payload written"
        );
        Ok(self.path.clone())
    }
}

/// Renders the payload into a response body instead of persisting it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseBodySink;

#[async_trait]
impl PayloadSink for ResponseBodySink {
    type Output = String;

    async fn write(&self, payload: &Payload) -> Result<String, SinkError> {
        to_json_string(payload)
    }
}
