use super::coordinate::Coordinate;

/// Mean earth radius used by every distance computation in the crate.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates using the haversine formula.
///
/// # Arguments
/// - `a`: The first coordinate.
/// - `b`: The second coordinate.
///
/// # Returns
/// The distance in meters on a spherical earth.
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat_a = a.lat().to_radians();
    let lat_b = b.lat().to_radians();
    let d_lat = (b.lat() - a.lat()).to_radians();
    let d_lon = (b.lon() - a.lon()).to_radians();

    // rounding can push h marginally above 1 for antipodal points
    let h = ((d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2)).clamp(0.0, 1.0);
    EARTH_RADIUS_M * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}
