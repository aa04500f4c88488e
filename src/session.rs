//! Map session
//!
//! Owns the marker store, the rendering surface handle, the live update
//! channel and the navigation tracker for one map screen. All store writes
//! happen inside `&mut self` methods after any awaited I/O has completed, so
//! a periodic refresh and live updates can never interleave mid-write.

use crate::{
    api::{geocoding::Geocoder, places::PlaceSource},
    core::{config::FieldMapConfig, geo::LatLng},
    live::{
        channel::{DrainReport, LiveUpdateChannel},
        event::LiveUpdate,
        source::PushSource,
    },
    markers::{
        marker::Marker,
        reconcile::{reconcile, MarkerDiff},
        store::MarkerStore,
    },
    navigation::{
        nearest::nearest_marker,
        provider::PositionProvider,
        tracker::{NavigationTracker, RouteRequest},
    },
    prelude::Arc,
    render::{
        command::{RenderCommand, SurfaceEvent},
        surface::RenderSurface,
    },
    MapError, Result,
};

pub struct MapSession<S: RenderSurface> {
    config: FieldMapConfig,
    store: MarkerStore,
    surface: S,
    channel: Option<LiveUpdateChannel>,
    tracker: NavigationTracker,
    selected: Option<String>,
    foreground: bool,
}

impl<S: RenderSurface> MapSession<S> {
    pub fn new(config: FieldMapConfig, surface: S, positions: Arc<dyn PositionProvider>) -> Self {
        let tracker =
            NavigationTracker::with_distance_filter(positions, config.navigation.distance_filter_m);
        Self {
            config,
            store: MarkerStore::new(),
            surface,
            channel: None,
            tracker,
            selected: None,
            foreground: false,
        }
    }

    /// Attaches the live channel described by `live.endpoint`.
    /// Without an endpoint the session runs on periodic refresh only.
    pub fn with_push_source(mut self, source: Arc<dyn PushSource>) -> Self {
        match self.config.live.endpoint.clone() {
            Some(endpoint) => self.channel = Some(LiveUpdateChannel::new(endpoint, source)),
            None => log::info!("No live endpoint configured, live updates disabled"),
        }
        self
    }

    pub fn config(&self) -> &FieldMapConfig {
        &self.config
    }

    pub fn store(&self) -> &MarkerStore {
        &self.store
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn tracker(&self) -> &NavigationTracker {
        &self.tracker
    }

    pub fn is_live(&self) -> bool {
        self.channel.as_ref().map(|c| c.is_open()).unwrap_or(false)
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground
    }

    pub fn selected_marker(&self) -> Option<&Marker> {
        self.selected.as_deref().and_then(|id| self.store.get(id))
    }

    /// Brings the store and the surface in line with a freshly fetched full set
    pub fn apply_snapshot(&mut self, next: Vec<Marker>) -> MarkerDiff {
        let previous = self.store.snapshot();
        let diff = reconcile(&previous, &next);
        if diff.is_empty() {
            return diff;
        }

        self.surface.send_all(diff.commands());
        self.store.apply(&diff);
        if let Some(selected) = &self.selected {
            if !self.store.contains(selected) {
                self.clear_selection();
            }
        }
        log::debug!(
            "Refresh: {} added, {} removed, {} known",
            diff.added.len(),
            diff.removed.len(),
            self.store.len()
        );
        diff
    }

    /// Fetches the full set and reconciles it. On failure the store is untouched.
    pub async fn refresh_from(&mut self, source: &dyn PlaceSource) -> Result<MarkerDiff> {
        let next = source.fetch_places().await.map_err(|e| {
            log::warn!("Place refresh failed: {}", e);
            e
        })?;
        Ok(self.apply_snapshot(next))
    }

    /// Opens the live channel when the screen becomes active.
    /// Returns whether a new connection was started.
    ///
    /// The listener runs on the ambient Tokio runtime when called from one,
    /// otherwise on the crate's fallback runtime (see [`crate::runtime`]).
    pub fn on_foreground(&mut self) -> bool {
        self.foreground = true;
        self.channel.as_mut().map(|c| c.open()).unwrap_or(false)
    }

    /// Releases the live channel and the position subscription when the
    /// screen loses focus or the app goes to the background.
    pub fn on_background(&mut self) {
        self.foreground = false;
        if let Some(channel) = self.channel.as_mut() {
            channel.close();
        }
        self.tracker.stop_navigation();
    }

    /// Applies pending live updates
    pub fn poll_live(&mut self) -> DrainReport {
        let Some(channel) = self.channel.as_mut() else {
            return DrainReport::default();
        };
        let report = channel.drain(&mut self.store, &mut self.surface);
        for update in &report.applied {
            if let LiveUpdate::Deleted(id) = update {
                if self.selected.as_deref() == Some(id.as_str()) {
                    self.clear_selection();
                }
            }
        }
        report
    }

    /// Applies pending position updates; returns the number of routes published
    pub fn pump_navigation(&mut self) -> usize {
        self.tracker.pump(&mut self.surface)
    }

    /// Handles an event from the surface. A click on a known marker selects it.
    pub fn handle_surface_event(&mut self, event: SurfaceEvent) -> Option<&Marker> {
        match event {
            SurfaceEvent::MarkerClicked { marker } => {
                if !self.store.contains(&marker.id) {
                    log::warn!("Click on unknown marker {}", marker.id);
                    return None;
                }
                self.selected = Some(marker.id);
                self.selected_marker()
            }
        }
    }

    /// Parses and handles a raw surface message
    pub fn handle_surface_message(&mut self, message: &str) -> Result<Option<&Marker>> {
        let event = SurfaceEvent::from_message(message)?;
        Ok(self.handle_surface_event(event))
    }

    /// Forgets the selected marker, as when its detail view is dismissed
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Starts navigating to the selected marker
    pub async fn navigate_to_selected(&mut self) -> Result<RouteRequest> {
        let destination = self
            .selected_marker()
            .map(|m| m.position)
            .ok_or(MapError::NoSelection)?;
        self.tracker
            .start_navigation(destination, &mut self.surface)
            .await
    }

    /// Starts navigating to the marker closest to the current position and
    /// selects it
    pub async fn navigate_to_nearest(&mut self) -> Result<(Marker, RouteRequest)> {
        if self.store.is_empty() {
            return Err(MapError::EmptyStore);
        }
        let position = self.tracker.locate().await?;
        let nearest = nearest_marker(Some(position), &self.store)?.clone();
        log::info!("Nearest marker is {} at {}", nearest.id, nearest.position);

        let route = self
            .tracker
            .start_from(position, nearest.position, &mut self.surface)?;
        self.selected = Some(nearest.id.clone());
        Ok((nearest, route))
    }

    pub fn stop_navigation(&mut self) -> bool {
        self.tracker.stop_navigation()
    }

    /// Looks up an address and centers the surface on the first match
    pub async fn search_address(&mut self, geocoder: &dyn Geocoder, query: &str) -> Result<LatLng> {
        let position = crate::api::geocoding::search_address(geocoder, query).await?;
        self.surface.send(RenderCommand::fly_to(position));
        Ok(position)
    }

    /// Releases every long-lived resource
    pub fn teardown(&mut self) {
        self.on_background();
        log::debug!("Session torn down");
    }
}
