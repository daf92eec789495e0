//! Spatial coordinates of nodes.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

///
/// A point in the simulation area.
///
/// Two-dimensional deployments keep `z` at zero; see
/// [`Dim`](crate::config::Dim) for the configured dimensionality.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// The x coordinate.
    pub x: f64,
    /// The y coordinate.
    pub y: f64,
    /// The z coordinate (zero in 2D deployments).
    pub z: f64,
}

impl Position {
    /// The origin of the simulation area.
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Creates a new three-dimensional position.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a new position in the z = 0 plane.
    #[must_use]
    pub const fn new_2d(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Returns the squared Euclidean distance to `other`.
    ///
    /// Cheaper than [`dist`](Position::dist) when only comparisons against a
    /// squared radius are needed, e.g. in connectivity models.
    #[must_use]
    pub fn dist_squared(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Returns the Euclidean distance to `other`.
    #[must_use]
    pub fn dist(&self, other: &Position) -> f64 {
        self.dist_squared(other).sqrt()
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Position::new_2d(x, y)
    }
}

impl From<(f64, f64, f64)> for Position {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Position::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances() {
        let a = Position::new_2d(0.0, 0.0);
        let b = Position::new_2d(3.0, 4.0);
        assert_eq!(a.dist(&b), 5.0);
        assert_eq!(a.dist_squared(&b), 25.0);

        let c = Position::new(1.0, 2.0, 2.0);
        assert_eq!(Position::ORIGIN.dist(&c), 3.0);
    }
}
