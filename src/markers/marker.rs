use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{core::geo::LatLng, MapError, Result};

/// A single geolocated observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    pub position: LatLng,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contamination_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plastic_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Marker {
    pub fn new(id: impl Into<String>, position: LatLng) -> Self {
        Self {
            id: id.into(),
            position,
            contamination_level: None,
            plastic_level: None,
            status: None,
        }
    }

    pub fn with_contamination_level(mut self, level: impl Into<String>) -> Self {
        self.contamination_level = Some(level.into());
        self
    }

    pub fn with_plastic_level(mut self, level: impl Into<String>) -> Self {
        self.plastic_level = Some(level.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// A place record as served by the bulk endpoint and the push channel.
///
/// Identifiers and coordinates arrive either as JSON numbers or as strings,
/// so they are kept loosely typed until [`RawPlace::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlace {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub place_id: Option<Value>,
    #[serde(default)]
    pub latitude: Option<Value>,
    #[serde(default)]
    pub longitude: Option<Value>,
    #[serde(default)]
    pub pollution_level: Option<String>,
    #[serde(default)]
    pub plastic_level: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl RawPlace {
    /// Stable identifier of the record: `id`, falling back to `place_id`
    pub fn identity(&self) -> Result<String> {
        [&self.id, &self.place_id]
            .into_iter()
            .flatten()
            .find_map(id_from_value)
            .ok_or_else(|| MapError::ParseError("place record has no id or place_id".into()))
    }

    /// Converts the wire record into a [`Marker`], rejecting records without
    /// an identifier or with missing/out-of-range coordinates.
    pub fn normalize(&self) -> Result<Marker> {
        let id = self.identity()?;
        let lat = coordinate(self.latitude.as_ref(), "latitude", &id)?;
        let lng = coordinate(self.longitude.as_ref(), "longitude", &id)?;
        let position = LatLng::new(lat, lng);
        if !position.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "place {} has out-of-range position {}",
                id, position
            )));
        }

        Ok(Marker {
            id,
            position,
            contamination_level: self.pollution_level.clone(),
            plastic_level: self.plastic_level.clone(),
            status: self.status.clone(),
        })
    }
}

impl From<&Marker> for RawPlace {
    fn from(marker: &Marker) -> Self {
        Self {
            id: Some(Value::String(marker.id.clone())),
            place_id: None,
            latitude: serde_json::Number::from_f64(marker.position.lat).map(Value::Number),
            longitude: serde_json::Number::from_f64(marker.position.lng).map(Value::Number),
            pollution_level: marker.contamination_level.clone(),
            plastic_level: marker.plastic_level.clone(),
            status: marker.status.clone(),
        }
    }
}

impl TryFrom<RawPlace> for Marker {
    type Error = MapError;

    fn try_from(raw: RawPlace) -> Result<Self> {
        raw.normalize()
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coordinate(value: Option<&Value>, field: &str, id: &str) -> Result<f64> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(MapError::InvalidCoordinates(format!(
            "place {} has missing or non-numeric {}",
            id, field
        ))),
    }
}

/// Parses a JSON array of place records, keeping the well-formed ones.
///
/// Returns the normalized markers and the number of records that were dropped.
pub fn normalize_places(records: Vec<Value>) -> (Vec<Marker>, usize) {
    let mut markers = Vec::with_capacity(records.len());
    let mut dropped = 0;
    for record in records {
        let parsed = serde_json::from_value::<RawPlace>(record)
            .map_err(MapError::from)
            .and_then(|raw| raw.normalize());
        match parsed {
            Ok(marker) => markers.push(marker),
            Err(e) => {
                log::warn!("Dropping malformed place record: {}", e);
                dropped += 1;
            }
        }
    }
    (markers, dropped)
}
