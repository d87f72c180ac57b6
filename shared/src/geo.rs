use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for edge lengths.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Latitude limit of the Web-Mercator projection.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a coordinate from the optional pair found in feed records.
    /// Returns `None` when either half is missing or out of range.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        let point = Self::new(lat?, lng?);
        point.is_valid().then_some(point)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Haversine distance to another point in meters.
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let a =
            (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();
        EARTH_RADIUS_M * c
    }

    /// Project onto the unit Web-Mercator square: x grows east, y grows south,
    /// both in `0.0..=1.0`.
    pub fn to_mercator(&self) -> (f64, f64) {
        let lat = self.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
        let x = (self.lng + 180.0) / 360.0;
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0;
        (x, y)
    }

    pub fn from_mercator(x: f64, y: f64) -> Self {
        let lng = x * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
        Self { lat, lng }
    }
}
