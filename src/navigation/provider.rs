use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::Stream;

use crate::core::geo::LatLng;
use crate::prelude::{Arc, Pin};
use crate::{MapError, Result};

/// Continuous stream of device positions
pub type PositionStream = Pin<Box<dyn Stream<Item = LatLng> + Send>>;

/// Source of device positions
#[async_trait]
pub trait PositionProvider: Send + Sync {
    /// One-shot lookup of the current position
    async fn current_position(&self) -> Result<LatLng>;

    /// Subscribes to position updates. Providers should only emit after the
    /// device moved at least `distance_filter_m` meters; the tracker applies
    /// the same filter again, so providers without native filtering are fine.
    fn watch(&self, distance_filter_m: f64) -> Result<PositionStream>;
}

#[derive(Default)]
struct ScriptedState {
    current: Option<LatLng>,
    watchers: Vec<UnboundedSender<LatLng>>,
}

/// Position provider driven by hand, for tests and replaying recorded tracks
#[derive(Clone, Default)]
pub struct ScriptedPositionProvider {
    state: Arc<std::sync::Mutex<ScriptedState>>,
}

impl ScriptedPositionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(position: LatLng) -> Self {
        let provider = Self::new();
        provider.set_position(position);
        provider
    }

    /// Updates the current position and delivers it to every live watcher
    pub fn set_position(&self, position: LatLng) {
        if let Ok(mut state) = self.state.lock() {
            state.current = Some(position);
            state
                .watchers
                .retain(|watcher| watcher.unbounded_send(position).is_ok());
        }
    }

    /// Makes the position unknown, as when the device has no fix
    pub fn clear_position(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.current = None;
        }
    }

    /// Number of subscriptions whose receiving side is still alive
    pub fn active_watchers(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.watchers.iter().filter(|w| !w.is_closed()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PositionProvider for ScriptedPositionProvider {
    async fn current_position(&self) -> Result<LatLng> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.current)
            .ok_or_else(|| MapError::PositionUnavailable("no position fix".into()))
    }

    fn watch(&self, _distance_filter_m: f64) -> Result<PositionStream> {
        let (tx, rx) = unbounded();
        let mut state = self
            .state
            .lock()
            .map_err(|_| MapError::PositionUnavailable("position provider poisoned".into()))?;
        state.watchers.push(tx);
        Ok(Box::pin(rx))
    }
}
