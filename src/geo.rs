//! Map positions and the coordinate key used to index markers.
//!
//! DESIGN
//! ======
//! Every marker is addressed by a `CoordinateKey` built from its latitude and
//! longitude as `"<lat> <lng>"`. Each component is rendered with Rust's
//! shortest round-trip float formatting, so two pairs map to the same key
//! exactly when their parsed `f64` values are numerically equal. Markers that
//! share a point intentionally share a key.
//!
//! EDGE CASES
//! ==========
//! `-0.0 == 0.0` numerically, so negative zero is folded to `0` before
//! formatting. NaN never equals itself, so non-finite inputs are rejected
//! rather than producing a key that would collide with itself.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeoError {
    #[error("coordinate is not a finite number: {0}")]
    NonFinite(String),
    #[error("coordinate could not be parsed: {0:?}")]
    Unparsable(String),
}

// =============================================================================
// POSITION
// =============================================================================

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle (haversine) distance to `other`, in meters.
    #[must_use]
    pub fn distance_m(&self, other: &LatLng) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Whether `other` lies within `radius_m` meters of this position.
    #[must_use]
    pub fn within(&self, other: &LatLng, radius_m: f64) -> bool {
        self.distance_m(other) <= radius_m
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

// =============================================================================
// COORDINATE KEY
// =============================================================================

/// Registry key derived from a coordinate pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoordinateKey(String);

impl CoordinateKey {
    /// Build the key for a numeric coordinate pair.
    ///
    /// # Errors
    ///
    /// Returns `NonFinite` if either component is NaN or infinite.
    pub fn from_coords(lat: f64, lng: f64) -> Result<Self, GeoError> {
        Ok(Self(format!("{} {}", canonical(lat)?, canonical(lng)?)))
    }

    /// Build the key for a position.
    ///
    /// # Errors
    ///
    /// Returns `NonFinite` if either component is NaN or infinite.
    pub fn from_position(position: LatLng) -> Result<Self, GeoError> {
        Self::from_coords(position.lat, position.lng)
    }

    /// Build the key from textual coordinates, as they arrive from forms and
    /// query payloads. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns `Unparsable` if either component is not a float literal, or
    /// `NonFinite` if it parses to NaN or infinity.
    pub fn parse(lat: &str, lng: &str) -> Result<Self, GeoError> {
        Self::from_coords(parse_component(lat)?, parse_component(lng)?)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<LatLng> for CoordinateKey {
    type Error = GeoError;

    fn try_from(position: LatLng) -> Result<Self, Self::Error> {
        Self::from_position(position)
    }
}

fn canonical(value: f64) -> Result<String, GeoError> {
    if !value.is_finite() {
        return Err(GeoError::NonFinite(value.to_string()));
    }
    // Folds -0.0 into 0.0.
    let value = if value == 0.0 { 0.0 } else { value };
    Ok(format!("{value}"))
}

fn parse_component(raw: &str) -> Result<f64, GeoError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| GeoError::Unparsable(raw.to_owned()))
}

#[cfg(test)]
#[path = "geo_test.rs"]
mod tests;
