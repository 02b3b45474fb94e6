//! Great-circle geometry on a spherical Earth.

use serde::Serialize;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS-84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns `true` if both components are finite and inside
    /// [-90, 90] / [-180, 180].
    pub fn is_valid(&self) -> bool {
        is_valid_coordinate(self.lat, self.lng)
    }
}

pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

/// Haversine distance in kilometres between two points.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Arithmetic mean of the two points' components. Not a geodesic midpoint.
pub fn midpoint(a: LatLng, b: LatLng) -> LatLng {
    LatLng {
        lat: (a.lat + b.lat) / 2.0,
        lng: (a.lng + b.lng) / 2.0,
    }
}
