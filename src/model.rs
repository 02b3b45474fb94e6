//! In-memory model produced by one refresh tick.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::geo::LatLng;

/// One bus's position at refresh time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleReport {
    pub id: String,
    pub route_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Seconds since the Unix epoch, as reported by the vehicle.
    pub timestamp: Option<u64>,
}

impl VehicleReport {
    pub fn new(
        id: impl Into<String>,
        route_id: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id: id.into(),
            route_id: route_id.into(),
            latitude,
            longitude,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// Two reports on the same route closer than the bunching threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BunchingAlert {
    pub route_id: String,
    pub first_id: String,
    pub second_id: String,
    pub distance_km: f64,
    pub midpoint: LatLng,
}

/// Alerts keyed by route id. Routes without alerts are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AlertSet(BTreeMap<String, Vec<BunchingAlert>>);

impl AlertSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, alert: BunchingAlert) {
        self.0.entry(alert.route_id.clone()).or_default().push(alert);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of alerts across all routes.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn route_count(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, route_id: &str) -> Option<&[BunchingAlert]> {
        self.0.get(route_id).map(Vec::as_slice)
    }

    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// All alerts, route by route in route-id order.
    pub fn alerts(&self) -> impl Iterator<Item = &BunchingAlert> {
        self.0.values().flatten()
    }
}
