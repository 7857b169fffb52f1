use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::fs;
use tracing::{debug, error, info};

use crate::config::TelemetryConfig;
use crate::error::ChatError;

/// Receives every successful response. Implementations must return
/// immediately; persistence happens off the request path.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, response: &str);
}

pub fn build_sink(config: &TelemetryConfig) -> Arc<dyn TelemetrySink> {
    if config.enabled {
        let sink = FileSink::new(config.path.clone());
        info!(path = %sink.path().display(), "persisting latest response");
        Arc::new(sink)
    } else {
        Arc::new(NoopSink)
    }
}

pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn record(&self, _response: &str) {}
}

/// Keeps the latest response in a single file. Writes go through a temp file
/// and a rename, so readers see one whole response; concurrent writers race
/// and the last rename wins.
pub struct FileSink {
    inner: Arc<FileSinkInner>,
}

struct FileSinkInner {
    path: PathBuf,
    sequence: AtomicU64,
}

impl FileSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            inner: Arc::new(FileSinkInner {
                path,
                sequence: AtomicU64::new(0),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

impl FileSinkInner {
    async fn write(&self, response: &str) -> Result<(), ChatError> {
        let payload = encode_pretty(response)?;
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let staging = staging_path(&self.path, sequence);

        fs::write(&staging, payload).await.map_err(|error| {
            ChatError::SideEffect(format!("failed to write {}: {error}", staging.display()))
        })?;
        if let Err(error) = fs::rename(&staging, &self.path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(ChatError::SideEffect(format!(
                "failed to replace {}: {error}",
                self.path.display()
            )));
        }
        Ok(())
    }
}

impl TelemetrySink for FileSink {
    fn record(&self, response: &str) {
        let inner = self.inner.clone();
        let response = response.to_string();
        tokio::spawn(async move {
            match inner.write(&response).await {
                Ok(()) => debug!(path = %inner.path.display(), "wrote latest response"),
                Err(error) => error!("{error}"),
            }
        });
    }
}

fn staging_path(target: &Path, sequence: u64) -> PathBuf {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "response.json".to_string());
    target.with_file_name(format!(".{name}.{}.{sequence}.tmp", std::process::id()))
}

fn encode_pretty(response: &str) -> Result<Vec<u8>, ChatError> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    response
        .serialize(&mut serializer)
        .map_err(|error| ChatError::SideEffect(format!("failed to encode response: {error}")))?;
    Ok(buffer)
}
