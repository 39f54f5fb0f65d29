use serde::{Deserialize, Serialize};

/// Camera position plus Euler rotation (degrees) at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f64; 3],
    pub rotation: [f64; 3],
}

impl Pose {
    pub fn new(position: [f64; 3], rotation: [f64; 3]) -> Self {
        Self { position, rotation }
    }

    /// All six scalars equal bit for bit. Unlike `==`, a NaN component
    /// matches itself and `-0.0` differs from `0.0`.
    pub fn bitwise_eq(&self, other: &Pose) -> bool {
        self.position
            .iter()
            .chain(&self.rotation)
            .zip(other.position.iter().chain(&other.rotation))
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    /// Squared Euclidean distance between the two positions.
    pub fn position_distance_sq(&self, other: &Pose) -> f64 {
        self.position
            .iter()
            .zip(other.position.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Sum of absolute per-axis rotation deltas, in degrees.
    pub fn rotation_delta(&self, other: &Pose) -> f64 {
        self.rotation
            .iter()
            .zip(other.rotation.iter())
            .map(|(a, b)| (a - b).abs())
            .sum()
    }
}
