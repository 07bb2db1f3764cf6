// src/overpass.rs
//! Food venues from the OpenStreetMap Overpass API.
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::models::Place;
use crate::places::{dedupe_named, PlacesQuery, PlacesSource};

pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://lz4.overpass-api.de/api/interpreter",
];

const AMENITIES: &str = "^(restaurant|cafe|fast_food|food_court|takeaway)$";

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<Center>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Center {
    lat: f64,
    lon: f64,
}

impl Element {
    fn into_place(mut self) -> Option<Place> {
        let (lat, lon) = match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => (lat, lon),
            (_, _, Some(c)) => (c.lat, c.lon),
            _ => return None,
        };
        let name = self.tags.get("name").cloned().unwrap_or_default();
        let opening_hours = self.tags.remove("opening_hours");

        Some(Place {
            place_id: format!("{}/{}", self.kind, self.id),
            name,
            lat,
            lon,
            opening_hours,
            tags: self.tags,
        })
    }
}

pub fn build_query(query: &PlacesQuery) -> String {
    let around = format!(
        "around:{},{},{}",
        query.radius_m, query.origin.lat, query.origin.lon
    );
    format!(
        "[out:json][timeout:25];(\
         node({around})[amenity~\"{AMENITIES}\"];\
         way({around})[amenity~\"{AMENITIES}\"];\
         relation({around})[amenity~\"{AMENITIES}\"];\
         );out center tags;"
    )
}

fn parse_places(body: OverpassResponse) -> Vec<Place> {
    dedupe_named(body.elements.into_iter().filter_map(Element::into_place).collect())
}

pub struct OverpassSource {
    client: reqwest::Client,
    endpoints: Vec<String>,
    backoff: Duration,
}

impl OverpassSource {
    pub fn new(endpoints: Vec<String>, backoff: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
            backoff,
        }
    }

    async fn fetch_from(&self, endpoint: &str, query: &str) -> std::result::Result<OverpassResponse, reqwest::Error> {
        self.client
            .get(endpoint)
            .query(&[("data", query)])
            .send()
            .await?
            .error_for_status()?
            .json::<OverpassResponse>()
            .await
    }
}

#[async_trait]
impl PlacesSource for OverpassSource {
    /// Tries each endpoint in turn, waiting a little longer after every failure
    /// that still has another endpoint to fall back on.
    async fn fetch_places(&self, query: &PlacesQuery) -> Result<Vec<Place>> {
        let overpass_query = build_query(query);
        let mut last_error = None;

        for (attempt, endpoint) in self.endpoints.iter().enumerate() {
            match self.fetch_from(endpoint, &overpass_query).await {
                Ok(body) => {
                    let places = parse_places(body);
                    debug!(endpoint = %endpoint, count = places.len(), "overpass answered");
                    return Ok(places);
                }
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "overpass endpoint failed");
                    last_error = Some(e.to_string());
                    if attempt + 1 < self.endpoints.len() {
                        tokio::time::sleep(self.backoff * (attempt as u32 + 1)).await;
                    }
                }
            }
        }

        Err(SessionError::PlacesSource(
            last_error.unwrap_or_else(|| "no overpass endpoints configured".to_string()),
        ))
    }
}
