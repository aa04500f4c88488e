use serde::{Deserialize, Serialize};

use crate::{core::geo::LatLng, markers::marker::Marker, MapError, Result};

/// Commands accepted by the rendering surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderCommand {
    /// Show a marker
    AddMarker { marker: Marker },
    /// Remove the marker with this id
    RemoveMarker { id: String },
    /// Center the view on a position
    FlyTo { position: LatLng },
    /// Draw a route between two positions
    ShowRoute { origin: LatLng, destination: LatLng },
}

impl RenderCommand {
    pub fn add_marker(marker: Marker) -> Self {
        Self::AddMarker { marker }
    }

    pub fn remove_marker(id: impl Into<String>) -> Self {
        Self::RemoveMarker { id: id.into() }
    }

    pub fn fly_to(position: LatLng) -> Self {
        Self::FlyTo { position }
    }

    pub fn show_route(origin: LatLng, destination: LatLng) -> Self {
        Self::ShowRoute {
            origin,
            destination,
        }
    }

    /// JSON form posted to the surface
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Events emitted by the rendering surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurfaceEvent {
    /// A marker was tapped; carries the full marker as the surface knows it
    MarkerClicked { marker: Marker },
}

impl SurfaceEvent {
    /// Parses a message posted by the surface.
    ///
    /// Besides the tagged form, a bare marker object is accepted since that
    /// is what simple surfaces post on click.
    pub fn from_message(message: &str) -> Result<Self> {
        if let Ok(event) = serde_json::from_str::<SurfaceEvent>(message) {
            return Ok(event);
        }
        serde_json::from_str::<Marker>(message)
            .map(|marker| Self::MarkerClicked { marker })
            .map_err(|e| MapError::ParseError(format!("unrecognized surface message: {}", e)))
    }
}
