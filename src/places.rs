// src/places.rs
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::error::{Result, SessionError};
use crate::models::{Coordinates, Place};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacesQuery {
    pub origin: Coordinates,
    pub radius_m: u32,
}

/// Supplies candidate places around a location. Implementations own their
/// retry policy; an `Err` means retries are exhausted.
#[async_trait]
pub trait PlacesSource: Send + Sync {
    async fn fetch_places(&self, query: &PlacesQuery) -> Result<Vec<Place>>;
}

/// Drops unnamed places and repeated ids, keeping the first occurrence.
pub fn dedupe_named(places: Vec<Place>) -> Vec<Place> {
    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter(|p| {
            let name = p.name.trim();
            !name.is_empty() && !name.eq_ignore_ascii_case("unknown")
        })
        .filter(|p| seen.insert(p.place_id.clone()))
        .collect()
}

/// A fixed catalogue, filtered by distance. Used for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPlacesSource {
    places: Vec<Place>,
}

impl StaticPlacesSource {
    pub fn new(places: Vec<Place>) -> Self {
        Self { places }
    }

    /// Loads a JSON array of places.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            SessionError::Config(format!("cannot read places fixture {}: {e}", path.display()))
        })?;
        let places: Vec<Place> = serde_json::from_str(&raw).map_err(|e| {
            SessionError::Config(format!("malformed places fixture {}: {e}", path.display()))
        })?;
        info!(count = places.len(), path = %path.display(), "loaded places fixture");
        Ok(Self::new(places))
    }
}

#[async_trait]
impl PlacesSource for StaticPlacesSource {
    async fn fetch_places(&self, query: &PlacesQuery) -> Result<Vec<Place>> {
        let radius = f64::from(query.radius_m);
        let nearby = self
            .places
            .iter()
            .filter(|p| query.origin.distance_m(&p.coordinates()) <= radius)
            .cloned()
            .collect();
        Ok(dedupe_named(nearby))
    }
}
