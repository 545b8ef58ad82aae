//! Reading source abstraction for sensor ingestion.
//!
//! Provides a unified trait for reading reading messages from different
//! producers: stdin (one JSON message per line) and file replay.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

use crate::types::ReadingMessage;

/// Events produced by a reading source.
pub enum SourceEvent {
    /// A decoded message was read.
    Message(ReadingMessage),
    /// Source reached end of data.
    Eof,
}

/// Trait abstracting where reading messages come from.
///
/// The ingest loop calls [`next_message`](ReadingSource::next_message) in a
/// `select!` with cancellation, so implementations must be cancel-safe at
/// message boundaries.
#[async_trait]
pub trait ReadingSource: Send + 'static {
    /// Read the next message.
    ///
    /// Returns `SourceEvent::Eof` when no more data is available.
    async fn next_message(&mut self) -> Result<SourceEvent>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

// ============================================================================
// Replay Source
// ============================================================================

/// Replays pre-loaded messages with an optional inter-message delay.
pub struct ReplaySource {
    name: String,
    messages: std::vec::IntoIter<ReadingMessage>,
    delay_ms: u64,
    yielded_first: bool,
}

impl ReplaySource {
    pub fn new(name: impl Into<String>, messages: Vec<ReadingMessage>, delay_ms: u64) -> Self {
        Self {
            name: name.into(),
            messages: messages.into_iter(),
            delay_ms,
            yielded_first: false,
        }
    }

    /// Load a JSON-lines capture. Malformed lines are skipped with a warning.
    pub fn load(path: &Path, delay_ms: u64) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file {}", path.display()))?;
        let messages = parse_json_lines(&content, &path.display().to_string());
        Ok(Self::new(path.display().to_string(), messages, delay_ms))
    }

    pub fn remaining(&self) -> usize {
        self.messages.len()
    }
}

fn parse_json_lines(content: &str, origin: &str) -> Vec<ReadingMessage> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match ReadingMessage::from_json(line.trim()) {
            Ok(msg) => Some(msg),
            Err(e) => {
                warn!("[ReplaySource] {}:{} skipped: {}", origin, idx + 1, e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl ReadingSource for ReplaySource {
    async fn next_message(&mut self) -> Result<SourceEvent> {
        // No delay before the first message
        if self.yielded_first && self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }
        match self.messages.next() {
            Some(m) => {
                self.yielded_first = true;
                Ok(SourceEvent::Message(m))
            }
            None => Ok(SourceEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Stdin Source (JSON messages, one per line)
// ============================================================================

/// Reads JSON reading messages from stdin.
///
/// Used with the simulator: `simulation | pdm-trends --stdin --limits ...`
pub struct StdinSource {
    reader: tokio::io::BufReader<tokio::io::Stdin>,
    line_buffer: String,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            reader: tokio::io::BufReader::new(tokio::io::stdin()),
            line_buffer: String::with_capacity(2048),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingSource for StdinSource {
    async fn next_message(&mut self) -> Result<SourceEvent> {
        use tokio::io::AsyncBufReadExt;
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(SourceEvent::Eof);
            }
            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            match ReadingMessage::from_json(line) {
                Ok(msg) => return Ok(SourceEvent::Message(msg)),
                Err(e) => {
                    warn!("[StdinSource] Failed to parse message: {}", e);
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}
