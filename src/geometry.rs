use geo::{Bearing, Distance, Haversine};
use geo_types::Point;

/// Meters per degree of latitude, and per degree of longitude at the
/// equator.
const METERS_PER_DEGREE_LAT: f64 = 110_567.0;

/// Fast approximate distances around a fixed center.
///
/// Pre-computes the meters-per-degree scale for the center's latitude so
/// that a squared distance costs two multiplies, no trigonometry. Accurate
/// enough for the A* lower bound, where only admissibility matters.
pub struct DistanceApproximator {
    center: Point<f64>,
    meters_per_lng_degree: f64,
}

impl DistanceApproximator {
    pub fn new(center: Point<f64>) -> Self {
        let meters_per_lng_degree = METERS_PER_DEGREE_LAT * center.y().to_radians().cos();
        Self { center, meters_per_lng_degree }
    }

    pub fn center(&self) -> Point<f64> {
        self.center
    }

    /// Squared distance in meters² between `p` and the center.
    pub fn distance_squared(&self, p: Point<f64>) -> f32 {
        let dx = (p.x() - self.center.x()) * self.meters_per_lng_degree;
        let dy = (p.y() - self.center.y()) * METERS_PER_DEGREE_LAT;
        (dx * dx + dy * dy) as f32
    }

    pub fn distance(&self, p: Point<f64>) -> f32 {
        self.distance_squared(p).sqrt()
    }
}

/// A* lower bound against a search disc: zero inside the disc, distance to
/// the disc boundary outside. A destination can sit anywhere within the
/// disc, including at the same location as `lnglat`, so anything larger
/// would overestimate.
pub fn cluster_heuristic(
    approximator: &DistanceApproximator,
    search_radius: f32,
    lnglat: Point<f64>,
) -> f32 {
    let d2 = approximator.distance_squared(lnglat);
    let rad2 = search_radius * search_radius;
    if d2 < rad2 {
        0.0
    } else {
        d2.sqrt() - search_radius
    }
}

/// Bearing from `from` to `to` in degrees, normalized to `[0, 360)`,
/// north = 0, east = 90.
pub fn bearing_degrees(from: Point<f64>, to: Point<f64>) -> f32 {
    (Haversine.bearing(from, to).rem_euclid(360.0)) as f32
}

/// Great-circle distance in meters.
pub fn haversine_meters(a: Point<f64>, b: Point<f64>) -> f32 {
    Haversine.distance(a, b) as f32
}

fn clamp_heading(heading: f32) -> u16 {
    heading.clamp(0.0, 359.0) as u16
}

/// Heading of an edge at its begin node, pointing away along the first
/// shape segment. Shapes are stored in the `forward` orientation; a
/// non-forward edge reads its shape back to front.
pub fn outbound_edge_heading(shape: &[Point<f64>], forward: bool) -> u16 {
    if shape.len() < 2 {
        return 0;
    }
    let heading = if forward {
        bearing_degrees(shape[0], shape[1])
    } else {
        bearing_degrees(shape[shape.len() - 1], shape[shape.len() - 2])
    };
    clamp_heading(heading)
}

/// Heading at an edge's end node, pointing back along the last shape
/// segment (the direction a traveler would face when turned around).
pub fn inbound_edge_heading(shape: &[Point<f64>], forward: bool) -> u16 {
    if shape.len() < 2 {
        return 0;
    }
    let heading = if forward {
        bearing_degrees(shape[shape.len() - 1], shape[shape.len() - 2])
    } else {
        bearing_degrees(shape[0], shape[1])
    };
    clamp_heading(heading)
}

/// Absolute turn angle between an inbound and an outbound heading, in
/// `[0, 180]`. The inbound heading points back along the arrival edge, so
/// 0 is a U-turn and 180 is straight through.
pub fn turn_degree180(inbound: u16, outbound: u16) -> u16 {
    let diff = (i32::from(inbound) - i32::from(outbound)).unsigned_abs() as u16 % 360;
    if diff > 180 {
        360 - diff
    } else {
        diff
    }
}
