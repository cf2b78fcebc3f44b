pub(crate) mod coordinate;
pub(crate) mod geo_math;

pub use coordinate::Coordinate;
pub use geo_math::distance_meters;
