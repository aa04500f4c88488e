use std::collections::VecDeque;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    core::config::FieldMapConfig,
    markers::marker::{normalize_places, Marker},
    MapError, Result,
};

/// Bulk source of the full marker set
#[async_trait]
pub trait PlaceSource: Send + Sync {
    async fn fetch_places(&self) -> Result<Vec<Marker>>;
}

/// Fetches places from the REST API
pub struct HttpPlaceSource {
    client: reqwest::Client,
    url: String,
}

impl HttpPlaceSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: super::HTTP_CLIENT.clone(),
            url: url.into(),
        }
    }

    pub fn from_config(config: &FieldMapConfig) -> Result<Self> {
        Ok(Self {
            client: super::request_client(config.api.request_timeout_ms)?,
            url: config.places_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PlaceSource for HttpPlaceSource {
    async fn fetch_places(&self) -> Result<Vec<Marker>> {
        log::debug!("Fetching places from {}", self.url);
        let body: Value = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_places_body(body)
    }
}

/// Extracts markers from a places response.
///
/// Accepts a bare array or an object wrapping it under `results` (paginated
/// APIs) or `places`. Malformed records are dropped with a warning.
pub fn parse_places_body(body: Value) -> Result<Vec<Marker>> {
    let records = match body {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("results").or_else(|| map.remove("places")) {
            Some(Value::Array(records)) => records,
            _ => {
                return Err(MapError::ParseError(
                    "places response has no record array".into(),
                ))
            }
        },
        other => {
            return Err(MapError::ParseError(format!(
                "unexpected places response: {}",
                other
            )))
        }
    };

    let total = records.len();
    let (markers, dropped) = normalize_places(records);
    if dropped > 0 {
        log::warn!("Dropped {} of {} place records", dropped, total);
    }
    Ok(markers)
}

/// Place source replaying queued responses, for tests and offline demos.
/// Once the queue is down to one response, that response repeats.
#[derive(Default)]
pub struct ScriptedPlaceSource {
    responses: std::sync::Mutex<VecDeque<std::result::Result<Vec<Marker>, String>>>,
}

impl ScriptedPlaceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, markers: Vec<Marker>) -> &Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Ok(markers));
        }
        self
    }

    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(message.into()));
        }
        self
    }
}

#[async_trait]
impl PlaceSource for ScriptedPlaceSource {
    async fn fetch_places(&self) -> Result<Vec<Marker>> {
        let mut queue = self
            .responses
            .lock()
            .map_err(|_| MapError::Channel("scripted source poisoned".into()))?;
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match next {
            Some(Ok(markers)) => Ok(markers),
            Some(Err(message)) => Err(MapError::Channel(message)),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_array() {
        let markers = parse_places_body(json!([
            {"id": 1, "latitude": -12.05, "longitude": -77.04, "status": "Pendiente"},
            {"place_id": "p2", "latitude": "-12.1", "longitude": "-77.1"},
            {"latitude": 0, "longitude": 0}
        ]))
        .unwrap();
        let ids: Vec<_> = markers.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "p2"]);
    }

    #[test]
    fn test_parse_paginated() {
        let markers = parse_places_body(json!({
            "count": 1,
            "results": [{"id": "a", "latitude": 1, "longitude": 1}]
        }))
        .unwrap();
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn test_parse_unexpected_shape() {
        assert!(parse_places_body(json!({"detail": "nope"})).is_err());
        assert!(parse_places_body(json!("text")).is_err());
    }

    #[tokio::test]
    async fn test_scripted_source_replays() {
        use crate::core::geo::LatLng;

        let source = ScriptedPlaceSource::new();
        source
            .push_failure("offline")
            .push_response(vec![Marker::new("a", LatLng::new(0.0, 0.0))]);

        assert!(source.fetch_places().await.is_err());
        assert_eq!(source.fetch_places().await.unwrap().len(), 1);
        assert_eq!(source.fetch_places().await.unwrap().len(), 1);
    }
}
