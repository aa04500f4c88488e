use async_trait::async_trait;
use futures::StreamExt;

use crate::{
    core::constants::{DEFAULT_REQUEST_TIMEOUT_MS, MAX_PUSH_FRAME_BYTES},
    live::source::{PushSource, PushStream},
    MapError, Result,
};

/// Push transport over a streaming HTTP response.
///
/// Understands newline-delimited JSON and server-sent events: each non-empty
/// line is a frame, an SSE `data:` prefix is stripped and SSE comment or
/// field lines are skipped. Frames that are not UTF-8 or exceed
/// [`MAX_PUSH_FRAME_BYTES`] come through as `MapError::ParseError` items.
pub struct HttpLinePushSource {
    client: reqwest::Client,
}

impl HttpLinePushSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: super::streaming_client(DEFAULT_REQUEST_TIMEOUT_MS)?,
        })
    }
}

#[async_trait]
impl PushSource for HttpLinePushSource {
    async fn connect(&self, endpoint: &str) -> Result<PushStream> {
        let response = self
            .client
            .get(endpoint)
            .header(
                reqwest::header::ACCEPT,
                "application/x-ndjson, text/event-stream",
            )
            .send()
            .await?
            .error_for_status()?;

        let mut buffer = LineBuffer::default();
        let frames = response.bytes_stream().flat_map(move |chunk| {
            let items: Vec<Result<String>> = match chunk {
                Ok(bytes) => buffer.push(&bytes),
                Err(e) => vec![Err(MapError::from(e))],
            };
            futures::stream::iter(items)
        });
        Ok(Box::pin(frames))
    }
}

/// Splits a byte stream into frames at newlines
#[derive(Debug)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
    max_frame_bytes: usize,
    /// Inside an oversized frame; bytes are dropped up to the next newline
    skipping: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_frame(MAX_PUSH_FRAME_BYTES)
    }
}

impl LineBuffer {
    pub(crate) fn with_max_frame(max_frame_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_frame_bytes,
            skipping: false,
        }
    }

    /// Feeds a chunk and returns every frame it completed
    pub(crate) fn push(&mut self, mut chunk: &[u8]) -> Vec<Result<String>> {
        let mut frames = Vec::new();
        if self.skipping {
            match chunk.iter().position(|b| *b == b'\n') {
                Some(newline) => {
                    self.skipping = false;
                    chunk = &chunk[newline + 1..];
                }
                None => return frames,
            }
        }

        self.pending.extend_from_slice(chunk);
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            if line.len() > self.max_frame_bytes {
                frames.push(Err(self.oversized()));
                continue;
            }
            match String::from_utf8(line) {
                Ok(text) => frames.extend(frame_from_line(&text).map(Ok)),
                Err(e) => {
                    log::warn!("Dropping push frame that is not UTF-8: {}", e.utf8_error());
                    frames.push(Err(MapError::ParseError(format!(
                        "push frame is not valid UTF-8: {}",
                        e.utf8_error()
                    ))));
                }
            }
        }

        if self.pending.len() > self.max_frame_bytes {
            self.pending = Vec::new();
            self.skipping = true;
            frames.push(Err(self.oversized()));
        }
        frames
    }

    fn oversized(&self) -> MapError {
        log::warn!(
            "Dropping push frame longer than {} bytes",
            self.max_frame_bytes
        );
        MapError::ParseError(format!(
            "push frame exceeds {} bytes",
            self.max_frame_bytes
        ))
    }
}

fn frame_from_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    if let Some(data) = line.strip_prefix("data:") {
        let data = data.trim();
        return (!data.is_empty()).then(|| data.to_string());
    }
    // other SSE fields
    if ["event:", "id:", "retry:"].iter().any(|f| line.starts_with(f)) {
        return None;
    }
    Some(line.to_string())
}
