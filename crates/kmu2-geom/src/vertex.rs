use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Mutually closest points of two rays and the derived vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosestApproach {
    /// Midpoint of the two closest points.
    pub vertex: Vector3<f64>,
    /// Separation of the two closest points.
    pub cda: f64,
    /// Parameter along the first ray.
    pub t1: f64,
    /// Parameter along the second ray.
    pub t2: f64,
    /// Closest point on the first ray.
    pub q1: Vector3<f64>,
    /// Closest point on the second ray.
    pub q2: Vector3<f64>,
}

/// Solves for the closest approach of `pos1 + t1*dir1` and `pos2 + t2*dir2`.
///
/// Returns `None` when the determinant `(dir1.dir2)^2 - |dir1|^2 |dir2|^2`
/// is exactly zero, i.e. the rays are parallel (or a direction is null).
/// No tolerance is applied: near-parallel rays still produce a solution.
pub fn closest_approach(
    pos1: &Vector3<f64>,
    dir1: &Vector3<f64>,
    pos2: &Vector3<f64>,
    dir2: &Vector3<f64>,
) -> Option<ClosestApproach> {
    let d = pos1 - pos2;
    let a = dir1.dot(dir2);
    let n1 = dir1.dot(dir1);
    let n2 = dir2.dot(dir2);
    let det = a * a - n1 * n2;
    if det == 0.0 {
        return None;
    }
    let d1 = d.dot(dir1);
    let d2 = d.dot(dir2);
    let t1 = (n2 * d1 - a * d2) / det;
    let t2 = (a * d1 - n1 * d2) / det;
    let q1 = pos1 + dir1 * t1;
    let q2 = pos2 + dir2 * t2;
    Some(ClosestApproach {
        vertex: (q1 + q2) * 0.5,
        cda: (q1 - q2).norm(),
        t1,
        t2,
        q1,
        q2,
    })
}
