use serde::{Deserialize, Serialize};

use crate::{
    markers::marker::{Marker, RawPlace},
    MapError, Result,
};

/// Kind of change announced by the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceAction {
    Added,
    Updated,
    Deleted,
}

/// Envelope pushed by the server: `{"action": ..., "place": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceEnvelope {
    pub action: PlaceAction,
    pub place: RawPlace,
}

/// A push message after normalization
#[derive(Debug, Clone, PartialEq)]
pub enum LiveUpdate {
    Added(Marker),
    Updated(Marker),
    /// Deletions only need the id
    Deleted(String),
}

impl LiveUpdate {
    pub fn id(&self) -> &str {
        match self {
            Self::Added(marker) | Self::Updated(marker) => &marker.id,
            Self::Deleted(id) => id,
        }
    }
}

impl PlaceEnvelope {
    pub fn parse(message: &str) -> Result<Self> {
        serde_json::from_str(message).map_err(|e| {
            MapError::ParseError(format!("malformed push message: {}", e))
        })
    }

    pub fn normalize(&self) -> Result<LiveUpdate> {
        match self.action {
            PlaceAction::Added => Ok(LiveUpdate::Added(self.place.normalize()?)),
            PlaceAction::Updated => Ok(LiveUpdate::Updated(self.place.normalize()?)),
            PlaceAction::Deleted => Ok(LiveUpdate::Deleted(self.place.identity()?)),
        }
    }
}

impl std::str::FromStr for LiveUpdate {
    type Err = MapError;

    fn from_str(message: &str) -> Result<Self> {
        PlaceEnvelope::parse(message)?.normalize()
    }
}
