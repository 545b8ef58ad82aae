//! Ingest loop shared across all input modes.
//!
//! One loop per producer: read a message, hand it to the engine, repeat
//! until the source ends or shutdown is requested. Several loops may feed
//! the same engine concurrently.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::source::{ReadingSource, SourceEvent};
use crate::engine::TrendEngine;

/// Messages between progress log lines.
const PROGRESS_EVERY: u64 = 1_000;

/// Final counters for one producer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub source: String,
    pub messages: u64,
    pub readings_accepted: u64,
    pub values_skipped: u64,
}

pub struct IngestLoop {
    engine: Arc<TrendEngine>,
    cancel_token: CancellationToken,
}

impl IngestLoop {
    pub fn new(engine: Arc<TrendEngine>, cancel_token: CancellationToken) -> Self {
        Self {
            engine,
            cancel_token,
        }
    }

    /// Run until the source is exhausted, fails, or cancellation.
    pub async fn run<S: ReadingSource + ?Sized>(self, source: &mut S) -> IngestStats {
        let mut stats = IngestStats {
            source: source.source_name().to_string(),
            ..IngestStats::default()
        };

        info!("📥 Ingesting readings from {}...", stats.source);

        loop {
            let event = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[Ingest:{}] Shutdown signal received", stats.source);
                    break;
                }
                result = source.next_message() => {
                    match result {
                        Ok(ev) => ev,
                        Err(e) => {
                            warn!("[Ingest:{}] Source error: {}", stats.source, e);
                            break;
                        }
                    }
                }
            };

            let message = match event {
                SourceEvent::Message(m) => m,
                SourceEvent::Eof => {
                    info!(
                        "[Ingest:{}] Source reached end ({} messages)",
                        stats.source, stats.messages
                    );
                    break;
                }
            };

            let counts = self.engine.ingest(&message, Utc::now());
            stats.messages += 1;
            stats.readings_accepted += counts.accepted as u64;
            stats.values_skipped += counts.skipped as u64;

            if counts.skipped > 0 {
                debug!(
                    source = %stats.source,
                    skipped = counts.skipped,
                    "Non-numeric values dropped"
                );
            }

            if stats.messages % PROGRESS_EVERY == 0 {
                let store = self.engine.store_stats();
                info!(
                    "📈 Progress [{}]: {} messages | {} readings | {} sensors tracked",
                    stats.source, stats.messages, stats.readings_accepted, store.sensors
                );
            }
        }

        info!(
            "[Ingest:{}] Done: {} messages, {} readings accepted, {} values skipped",
            stats.source, stats.messages, stats.readings_accepted, stats.values_skipped
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrendConfig;
    use crate::pipeline::source::ReplaySource;
    use crate::types::{LimitsRegistry, ReadingMessage};

    fn message(json: &str) -> ReadingMessage {
        ReadingMessage::from_json(json).unwrap()
    }

    #[tokio::test]
    async fn drains_source_into_engine() {
        let engine = Arc::new(TrendEngine::new(LimitsRegistry::new(), TrendConfig::default()));
        let mut source = ReplaySource::new(
            "mem",
            vec![
                message(r#"{"readings":{"A:x":1.0,"A:mode":"RUN"}}"#),
                message(r#"{"readings":{"A:x":"2.0","B:y":3}}"#),
            ],
            0,
        );

        let stats = IngestLoop::new(Arc::clone(&engine), CancellationToken::new())
            .run(&mut source)
            .await;

        assert_eq!(stats.source, "mem");
        assert_eq!(stats.messages, 2);
        assert_eq!(stats.readings_accepted, 3);
        assert_eq!(stats.values_skipped, 1);
        assert_eq!(engine.snapshot("A:x").len(), 2);
        assert_eq!(engine.snapshot("B:y").len(), 1);
    }

    #[tokio::test]
    async fn cancelled_loop_stops_without_reading() {
        let engine = Arc::new(TrendEngine::new(LimitsRegistry::new(), TrendConfig::default()));
        let token = CancellationToken::new();
        token.cancel();

        let mut source = ReplaySource::new("mem", vec![message(r#"{"readings":{"A:x":1}}"#)], 0);
        let stats = IngestLoop::new(engine, token).run(&mut source).await;
        // select! is unbiased; either branch may win on the first poll
        assert!(stats.messages <= 1);
    }
}
