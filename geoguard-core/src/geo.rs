//! Geodesic helpers
//!
//! Great-circle math on a spherical Earth. Everything in here is a pure
//! function of its inputs and safe to call from anywhere.

use serde::{Deserialize, Serialize};

use crate::error::GeoError;

/// Mean Earth radius used by the Haversine formula, in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting values outside the valid degree ranges
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        let coordinate = Coordinate {
            latitude,
            longitude,
        };
        if coordinate.is_valid() {
            Ok(coordinate)
        } else {
            Err(GeoError::InvalidCoordinate {
                latitude,
                longitude,
            })
        }
    }

    /// Create a coordinate without range checks (for constants and test data)
    pub const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }

    /// Check the latitude/longitude ranges. NaN is never valid.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance to `other` in meters
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance(self, other)
    }

    /// Project a point `distance_m` meters away along `bearing_deg`
    ///
    /// Uses the same sphere as [`distance`], so the round trip
    /// `distance(c, c.destination(b, d))` returns `d` up to floating point error.
    pub fn destination(&self, bearing_deg: f64, distance_m: f64) -> Coordinate {
        let angular = distance_m / EARTH_RADIUS_METERS;
        let bearing = bearing_deg.to_radians();
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();

        let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
        let lon2 = lon1
            + (bearing.sin() * angular.sin() * lat1.cos())
                .atan2(angular.cos() - lat1.sin() * lat2.sin());

        Coordinate {
            latitude: lat2.to_degrees(),
            longitude: normalize_longitude(lon2.to_degrees()),
        }
    }
}

/// Haversine distance between two coordinates in meters
///
/// Accurate to the usual ~0.5% spherical-Earth error, which is well inside
/// what delivery geofencing needs for ranges of meters to tens of kilometers.
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    // abs() keeps the result bit-for-bit symmetric in (a, b)
    let delta_lat = (b.latitude - a.latitude).abs().to_radians();
    let delta_lon = (b.longitude - a.longitude).abs().to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Clamp guards asin against h drifting a hair above 1.0 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}

/// Initial great-circle bearing from `from` to `to`, in degrees [0, 360)
pub fn initial_bearing(from: &Coordinate, to: &Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

fn normalize_longitude(lon: f64) -> f64 {
    let mut lon = (lon + 540.0) % 360.0 - 180.0;
    if lon == -180.0 {
        lon = 180.0;
    }
    lon
}
