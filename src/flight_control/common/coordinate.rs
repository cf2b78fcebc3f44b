use std::fmt::{Display, Formatter};
use strum_macros::Display;

/// A geographic position in decimal degrees.
///
/// Values built through [`Coordinate::new`] are guaranteed to be finite and
/// inside `[-90, 90]` latitude / `[-180, 180]` longitude.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    lat: f64,
    /// Longitude in decimal degrees.
    lon: f64,
}

#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum CoordinateError {
    NotFinite,
    LatitudeOutOfRange,
    LongitudeOutOfRange,
}

impl std::error::Error for CoordinateError {}

impl Coordinate {
    pub const MAX_LAT: f64 = 90.0;
    pub const MAX_LON: f64 = 180.0;

    /// Creates a validated coordinate.
    ///
    /// # Arguments
    /// - `lat`: Latitude in decimal degrees.
    /// - `lon`: Longitude in decimal degrees.
    ///
    /// # Returns
    /// The coordinate, or a `CoordinateError` naming the offending axis.
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if lat.abs() > Self::MAX_LAT {
            return Err(CoordinateError::LatitudeOutOfRange);
        }
        if lon.abs() > Self::MAX_LON {
            return Err(CoordinateError::LongitudeOutOfRange);
        }
        Ok(Self { lat, lon })
    }

    /// Builds a coordinate from compile-time constants without validation.
    pub(crate) const fn from_const(lat: f64, lon: f64) -> Self { Self { lat, lon } }

    pub fn lat(&self) -> f64 { self.lat }

    pub fn lon(&self) -> f64 { self.lon }

    /// Moves `fraction` of the way along the straight latitude/longitude delta
    /// towards `other`. Only meaningful for displacements that are small
    /// compared to the earth radius.
    ///
    /// The longitude delta takes the short way across the antimeridian and the
    /// result is wrapped back into `[-180, 180]`.
    pub fn lerp_towards(&self, other: &Coordinate, fraction: f64) -> Coordinate {
        let d_lon = Self::wrap_lon(other.lon - self.lon);
        Coordinate {
            lat: self.lat + (other.lat - self.lat) * fraction,
            lon: Self::wrap_lon(self.lon + d_lon * fraction),
        }
    }

    fn wrap_lon(lon: f64) -> f64 {
        if (-Self::MAX_LON..=Self::MAX_LON).contains(&lon) {
            lon
        } else {
            (lon + Self::MAX_LON).rem_euclid(2.0 * Self::MAX_LON) - Self::MAX_LON
        }
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

impl TryFrom<(f64, f64)> for Coordinate {
    type Error = CoordinateError;

    fn try_from(value: (f64, f64)) -> Result<Self, Self::Error> { Self::new(value.0, value.1) }
}
