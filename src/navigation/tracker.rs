//! Navigation tracker
//!
//! `Idle --start_navigation--> Navigating --position update--> Navigating`
//! and `Navigating --stop_navigation--> Idle`. While navigating, a route from
//! the latest position to the fixed destination is republished whenever the
//! device moved at least the configured distance.

use crossbeam_channel::{unbounded, Receiver};
use futures::StreamExt;

use crate::{
    core::{constants::DEFAULT_DISTANCE_FILTER_M, geo::LatLng},
    navigation::provider::PositionProvider,
    prelude::Arc,
    render::{command::RenderCommand, surface::RenderSurface},
    runtime::{self, AsyncHandle},
    MapError, Result,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavigationState {
    Idle,
    Navigating {
        destination: LatLng,
        /// Origin of the last published route
        origin: LatLng,
    },
}

/// Route from the current position to the destination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub origin: LatLng,
    pub destination: LatLng,
}

impl RouteRequest {
    pub fn new(origin: LatLng, destination: LatLng) -> Self {
        Self {
            origin,
            destination,
        }
    }

    /// Straight-line distance left, in kilometers
    pub fn remaining_km(&self) -> f64 {
        self.origin.distance_to(&self.destination)
    }

    pub fn command(&self) -> RenderCommand {
        RenderCommand::show_route(self.origin, self.destination)
    }
}

struct Subscription {
    handle: Box<dyn AsyncHandle>,
    positions: Receiver<LatLng>,
}

pub struct NavigationTracker {
    provider: Arc<dyn PositionProvider>,
    distance_filter_m: f64,
    state: NavigationState,
    subscription: Option<Subscription>,
    last_position: Option<LatLng>,
}

impl NavigationTracker {
    pub fn new(provider: Arc<dyn PositionProvider>) -> Self {
        Self::with_distance_filter(provider, DEFAULT_DISTANCE_FILTER_M)
    }

    pub fn with_distance_filter(provider: Arc<dyn PositionProvider>, distance_filter_m: f64) -> Self {
        Self {
            provider,
            distance_filter_m: distance_filter_m.max(0.0),
            state: NavigationState::Idle,
            subscription: None,
            last_position: None,
        }
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn is_navigating(&self) -> bool {
        matches!(self.state, NavigationState::Navigating { .. })
    }

    pub fn distance_filter_m(&self) -> f64 {
        self.distance_filter_m
    }

    /// Most recent position seen by the tracker, from a lookup or the subscription
    pub fn last_position(&self) -> Option<LatLng> {
        self.last_position
    }

    /// Route currently shown, if navigating
    pub fn current_route(&self) -> Option<RouteRequest> {
        match self.state {
            NavigationState::Idle => None,
            NavigationState::Navigating {
                destination,
                origin,
            } => Some(RouteRequest::new(origin, destination)),
        }
    }

    /// Asks the provider for the current position and remembers it
    pub async fn locate(&mut self) -> Result<LatLng> {
        let position = self.fetch_position().await?;
        self.last_position = Some(position);
        Ok(position)
    }

    async fn fetch_position(&self) -> Result<LatLng> {
        match self.provider.current_position().await {
            Ok(position) if position.is_valid() => Ok(position),
            Ok(position) => Err(MapError::PositionUnavailable(format!(
                "provider returned invalid position {}",
                position
            ))),
            Err(e @ MapError::PositionUnavailable(_)) => Err(e),
            Err(e) => Err(MapError::PositionUnavailable(e.to_string())),
        }
    }

    /// Starts navigating towards `destination` from the current position.
    ///
    /// On failure nothing is published and the tracker keeps its previous
    /// state and subscription. Starting while already navigating replaces
    /// the previous destination and subscription.
    pub async fn start_navigation(
        &mut self,
        destination: LatLng,
        surface: &mut dyn RenderSurface,
    ) -> Result<RouteRequest> {
        check_destination(destination)?;
        let origin = self.fetch_position().await?;
        self.start_from(origin, destination, surface)
    }

    /// Starts navigating from an already located `origin`.
    ///
    /// Same guarantees as [`start_navigation`](Self::start_navigation); the
    /// current subscription is only released once the new one exists.
    pub fn start_from(
        &mut self,
        origin: LatLng,
        destination: LatLng,
        surface: &mut dyn RenderSurface,
    ) -> Result<RouteRequest> {
        check_destination(destination)?;
        if !origin.is_valid() {
            return Err(MapError::PositionUnavailable(format!(
                "route origin {} is out of range",
                origin
            )));
        }
        let stream = self.provider.watch(self.distance_filter_m)?;

        if self.is_navigating() {
            log::debug!("Restarting navigation with a new destination");
        }
        self.release_subscription();

        let (tx, positions) = unbounded();
        let handle = runtime::spawn(async move {
            let mut stream = stream;
            while let Some(position) = stream.next().await {
                if tx.send(position).is_err() {
                    break;
                }
            }
            log::debug!("Position stream ended");
        });
        self.subscription = Some(Subscription { handle, positions });
        self.last_position = Some(origin);

        let route = RouteRequest::new(origin, destination);
        self.state = NavigationState::Navigating {
            destination,
            origin,
        };
        log::info!(
            "Navigation started: {} -> {} ({:.3} km)",
            origin,
            destination,
            route.remaining_km()
        );
        surface.send(route.command());
        Ok(route)
    }

    /// Applies every position received from the subscription since the last
    /// call. Returns the number of routes published.
    pub fn pump(&mut self, surface: &mut dyn RenderSurface) -> usize {
        let positions: Vec<LatLng> = match &self.subscription {
            Some(subscription) => subscription.positions.try_iter().collect(),
            None => return 0,
        };
        let mut published = 0;
        for position in positions {
            if self.on_position(position, surface).is_some() {
                published += 1;
            }
        }
        published
    }

    /// Handles one position update; publishes and returns the new route when
    /// the device moved far enough from the last published origin.
    pub fn on_position(
        &mut self,
        position: LatLng,
        surface: &mut dyn RenderSurface,
    ) -> Option<RouteRequest> {
        if !position.is_valid() {
            log::warn!("Ignoring invalid position update {}", position);
            return None;
        }
        self.last_position = Some(position);

        let NavigationState::Navigating {
            destination,
            origin,
        } = self.state
        else {
            return None;
        };

        if position.distance_m(&origin) < self.distance_filter_m {
            return None;
        }

        let route = RouteRequest::new(position, destination);
        self.state = NavigationState::Navigating {
            destination,
            origin: position,
        };
        log::debug!(
            "Route refreshed from {} ({:.3} km left)",
            position,
            route.remaining_km()
        );
        surface.send(route.command());
        Some(route)
    }

    /// Stops navigating and releases the position subscription.
    /// Returns `false` if the tracker was already idle.
    pub fn stop_navigation(&mut self) -> bool {
        self.release_subscription();
        if !self.is_navigating() {
            return false;
        }
        self.state = NavigationState::Idle;
        log::info!("Navigation stopped");
        true
    }

    fn release_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.handle.cancel();
        }
    }
}

fn check_destination(destination: LatLng) -> Result<()> {
    if destination.is_valid() {
        return Ok(());
    }
    Err(MapError::InvalidCoordinates(format!(
        "navigation destination {} is out of range",
        destination
    )))
}

impl Drop for NavigationTracker {
    fn drop(&mut self) {
        self.release_subscription();
    }
}
