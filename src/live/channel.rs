//! Live update channel
//!
//! A listener task reads frames from a [`PushSource`] and forwards them into
//! an inbox. The owner drains the inbox from its own turn with
//! [`LiveUpdateChannel::drain`], so every store mutation happens synchronously
//! and never across an await point.

use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::StreamExt;

use crate::{
    live::{
        event::{LiveUpdate, PlaceEnvelope},
        source::PushSource,
    },
    markers::store::MarkerStore,
    prelude::Arc,
    render::{command::RenderCommand, surface::RenderSurface},
    runtime::{self, AsyncHandle},
    MapError,
};

/// Connection state changes reported by the listener
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelNotice {
    Connected,
    /// The server closed the stream
    Disconnected,
    /// Transport failure; the connection may or may not still be alive
    Error(String),
}

enum FrameKind {
    Message(String),
    /// A frame the transport could not decode
    Malformed(String),
    Notice(ChannelNotice),
}

struct Frame {
    generation: u64,
    kind: FrameKind,
}

/// Outcome of one [`LiveUpdateChannel::drain`] call
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DrainReport {
    /// Updates that changed the store, in arrival order
    pub applied: Vec<LiveUpdate>,
    /// Well-formed updates that were no-ops (duplicate add, unknown delete)
    pub ignored: usize,
    /// Malformed messages that were logged and dropped
    pub dropped: usize,
    pub notices: Vec<ChannelNotice>,
}

impl DrainReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.ignored == 0 && self.dropped == 0 && self.notices.is_empty()
    }
}

pub struct LiveUpdateChannel {
    endpoint: String,
    source: Arc<dyn PushSource>,
    listener: Option<Box<dyn AsyncHandle>>,
    /// Connection counter; every frame carries the generation of its listener
    generation: u64,
    /// Frames at or below this generation came from a closed listener
    discard_through: u64,
    tx: Sender<Frame>,
    rx: Receiver<Frame>,
}

impl LiveUpdateChannel {
    pub fn new(endpoint: impl Into<String>, source: Arc<dyn PushSource>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            endpoint: endpoint.into(),
            source,
            listener: None,
            generation: 0,
            discard_through: 0,
            tx,
            rx,
        }
    }

    /// Whether a listener is currently held and still running
    pub fn is_open(&self) -> bool {
        self.listener
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Starts listening. Returns `false` if a live listener already exists.
    ///
    /// A listener whose connection has ended is released and replaced.
    pub fn open(&mut self) -> bool {
        if self.is_open() {
            log::debug!("Live channel to {} already open", self.endpoint);
            return false;
        }
        // a listener whose stream ended; its last frames are still worth applying
        if let Some(finished) = self.listener.take() {
            finished.cancel();
        }

        self.generation += 1;
        let generation = self.generation;
        let tx = self.tx.clone();
        let source = self.source.clone();
        let endpoint = self.endpoint.clone();

        log::info!("Opening live channel to {}", endpoint);
        let handle = runtime::spawn(async move {
            let send = |kind: FrameKind| tx.send(Frame { generation, kind }).is_ok();

            let mut stream = match source.connect(&endpoint).await {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!("Live channel to {} failed to connect: {}", endpoint, e);
                    send(FrameKind::Notice(ChannelNotice::Error(e.to_string())));
                    return;
                }
            };
            if !send(FrameKind::Notice(ChannelNotice::Connected)) {
                return;
            }

            while let Some(frame) = stream.next().await {
                let delivered = match frame {
                    Ok(text) => send(FrameKind::Message(text)),
                    Err(MapError::ParseError(reason)) => send(FrameKind::Malformed(reason)),
                    Err(e) => {
                        log::warn!("Live channel to {} transport error: {}", endpoint, e);
                        send(FrameKind::Notice(ChannelNotice::Error(e.to_string())))
                    }
                };
                if !delivered {
                    return;
                }
            }

            log::info!("Live channel to {} closed by server", endpoint);
            send(FrameKind::Notice(ChannelNotice::Disconnected));
        });
        self.listener = Some(handle);
        true
    }

    /// Stops listening. Returns `false` if nothing was open.
    pub fn close(&mut self) -> bool {
        if self.listener.is_none() {
            return false;
        }
        log::info!("Closing live channel to {}", self.endpoint);
        self.release();
        true
    }

    fn release(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.cancel();
        }
        self.discard_through = self.generation;
        while self.rx.try_recv().is_ok() {}
    }

    /// Applies every frame received since the last call
    pub fn drain(&mut self, store: &mut MarkerStore, surface: &mut dyn RenderSurface) -> DrainReport {
        let mut report = DrainReport::default();
        while let Ok(frame) = self.rx.try_recv() {
            if frame.generation <= self.discard_through {
                continue;
            }
            match frame.kind {
                FrameKind::Notice(notice) => report.notices.push(notice),
                FrameKind::Malformed(reason) => {
                    log::warn!("Dropping push frame: {}", reason);
                    report.dropped += 1;
                }
                FrameKind::Message(text) => match Self::handle_message(store, surface, &text) {
                    Some(Some(update)) => report.applied.push(update),
                    Some(None) => report.ignored += 1,
                    None => report.dropped += 1,
                },
            }
        }
        report
    }

    /// Parses and applies one raw push message.
    ///
    /// Returns `None` for malformed messages (logged and dropped, store
    /// untouched), `Some(None)` for well-formed no-ops and `Some(Some(update))`
    /// when the store changed.
    pub fn handle_message(
        store: &mut MarkerStore,
        surface: &mut dyn RenderSurface,
        message: &str,
    ) -> Option<Option<LiveUpdate>> {
        let update = match PlaceEnvelope::parse(message).and_then(|env| env.normalize()) {
            Ok(update) => update,
            Err(e) => {
                log::warn!("Dropping push message: {}", e);
                return None;
            }
        };
        let changed = Self::apply_update(store, surface, &update);
        Some(changed.then_some(update))
    }

    /// Applies a normalized update to the store and mirrors it on the surface.
    /// Returns whether the store changed.
    pub fn apply_update(
        store: &mut MarkerStore,
        surface: &mut dyn RenderSurface,
        update: &LiveUpdate,
    ) -> bool {
        match update {
            LiveUpdate::Added(marker) => {
                if !store.insert(marker.clone()) {
                    log::debug!("Ignoring add for known marker {}", marker.id);
                    return false;
                }
                surface.send(RenderCommand::add_marker(marker.clone()));
            }
            LiveUpdate::Updated(marker) => {
                if store.replace(marker.clone()).is_some() {
                    surface.send(RenderCommand::remove_marker(&marker.id));
                }
                surface.send(RenderCommand::add_marker(marker.clone()));
            }
            LiveUpdate::Deleted(id) => {
                if store.remove(id).is_none() {
                    log::debug!("Ignoring delete for unknown marker {}", id);
                    return false;
                }
                surface.send(RenderCommand::remove_marker(id));
            }
        }
        log::debug!("Applied live update for marker {}", update.id());
        true
    }
}

impl Drop for LiveUpdateChannel {
    fn drop(&mut self) {
        self.release();
    }
}
