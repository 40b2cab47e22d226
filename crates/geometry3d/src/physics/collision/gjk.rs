//! GJK distance between convex support mappings
//!
//! Iteratively refines a simplex of the Minkowski difference `A - B` towards
//! the origin. The closest point on the simplex is found by region tests
//! (vertex, edge, face, interior) and the simplex is reduced to the features
//! carrying non-zero barycentric weight.

use crate::foundation::math::constants::DEGENERATE_EPSILON;
use crate::foundation::math::{Mat3, Vec3};
use crate::physics::collision::primitives::{closest_on_segment, Triangle};

/// Relative duality gap accepted when exact computation is requested
const MIN_RELATIVE_GAP: f64 = 1e-12;

/// A convex set described by its support function
pub trait SupportMap {
    /// Point of the set furthest along `direction`
    fn support(&self, direction: &Vec3) -> Vec3;
}

/// Termination controls for [`gjk_distance`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GjkSettings {
    /// Iteration cap
    pub max_iterations: u32,
    /// Acceptable error relative to the distance
    pub rel_err: f64,
    /// Acceptable absolute error
    pub abs_err: f64,
}

impl Default for GjkSettings {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            rel_err: 0.0,
            abs_err: 0.0,
        }
    }
}

/// Separation between two convex sets and a witness point on each
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GjkResult {
    /// Distance between the sets (0 when they overlap)
    pub distance: f64,
    /// Closest point on the first set
    pub point_a: Vec3,
    /// Closest point on the second set
    pub point_b: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SimplexVertex {
    w: Vec3,
    a: Vec3,
    b: Vec3,
}

type WeightedSimplex = Vec<(SimplexVertex, f64)>;

/// Distance between `a` and `b`
pub fn gjk_distance<A, B>(a: &A, b: &B, settings: &GjkSettings) -> GjkResult
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    let vertex = |direction: &Vec3| {
        let pa = a.support(direction);
        let pb = b.support(&-direction);
        SimplexVertex { w: pa - pb, a: pa, b: pb }
    };

    let mut simplex: WeightedSimplex = vec![(vertex(&Vec3::x()), 1.0)];
    let mut v = simplex[0].0.w;
    let mut overlap = false;

    for _ in 0..settings.max_iterations {
        let v_sq = v.norm_squared();
        if v_sq <= DEGENERATE_EPSILON {
            overlap = true;
            break;
        }

        let next = vertex(&-v);
        if simplex.iter().any(|(s, _)| s.w == next.w) {
            break;
        }

        // |v| - v·w/|v| bounds the error of |v| as a distance estimate
        let dist = v_sq.sqrt();
        let gap = v_sq - v.dot(&next.w);
        let allowed = (settings.rel_err.max(MIN_RELATIVE_GAP) * dist).max(settings.abs_err);
        if gap <= allowed * dist {
            break;
        }

        let mut points: Vec<SimplexVertex> = simplex.iter().map(|(s, _)| *s).collect();
        points.push(next);
        let reduced = closest_on_simplex(&points);
        let next_v = combine(&reduced, |s| s.w);
        if next_v.norm_squared() >= v_sq {
            break;
        }
        simplex = reduced;
        v = next_v;

        // A full tetrahedron means the origin is enclosed; the recombined
        // `v` is rounding noise
        if simplex.len() == 4 {
            overlap = true;
            break;
        }
    }

    let point_a = combine(&simplex, |s| s.a);
    let point_b = combine(&simplex, |s| s.b);
    GjkResult {
        distance: if overlap { 0.0 } else { v.norm() },
        point_a,
        point_b,
    }
}

fn combine(simplex: &[(SimplexVertex, f64)], field: impl Fn(&SimplexVertex) -> Vec3) -> Vec3 {
    simplex
        .iter()
        .fold(Vec3::zeros(), |acc, (s, weight)| acc + field(s) * *weight)
}

fn keep(weighted: impl IntoIterator<Item = (SimplexVertex, f64)>) -> WeightedSimplex {
    weighted.into_iter().filter(|(_, weight)| *weight > 0.0).collect()
}

/// Closest point to the origin on the simplex, as the sub-simplex that
/// supports it with barycentric weights
fn closest_on_simplex(points: &[SimplexVertex]) -> WeightedSimplex {
    let origin = Vec3::zeros();
    match points {
        [a] => vec![(*a, 1.0)],
        [a, b] => {
            let (_, t) = closest_on_segment(&a.w, &b.w, &origin);
            keep([(*a, 1.0 - t), (*b, t)])
        }
        [a, b, c] => {
            let (_, weights) = Triangle::new(a.w, b.w, c.w).closest_point_barycentric(&origin);
            keep([(*a, weights[0]), (*b, weights[1]), (*c, weights[2])])
        }
        _ => closest_on_tetrahedron(points),
    }
}

fn closest_on_tetrahedron(points: &[SimplexVertex]) -> WeightedSimplex {
    const FACES: [[usize; 4]; 4] = [[0, 1, 2, 3], [0, 1, 3, 2], [0, 2, 3, 1], [1, 2, 3, 0]];

    let origin = Vec3::zeros();
    let w = |i: usize| points[i].w;
    let edges = Mat3::from_columns(&[w(1) - w(0), w(2) - w(0), w(3) - w(0)]);
    let scale = edges.column(0).norm() * edges.column(1).norm() * edges.column(2).norm();
    let flat = edges.determinant().abs() <= 1e-12 * scale;

    let mut best: Option<(f64, WeightedSimplex)> = None;
    for [i, j, k, opposite] in FACES {
        let normal = (w(j) - w(i)).cross(&(w(k) - w(i)));
        let origin_side = normal.dot(&(origin - w(i)));
        let opposite_side = normal.dot(&(w(opposite) - w(i)));
        if !flat && origin_side * opposite_side >= 0.0 {
            continue;
        }
        let (closest, weights) = Triangle::new(w(i), w(j), w(k)).closest_point_barycentric(&origin);
        let dist_sq = closest.norm_squared();
        if best.as_ref().map_or(true, |(d, _)| dist_sq < *d) {
            let face = keep([
                (points[i], weights[0]),
                (points[j], weights[1]),
                (points[k], weights[2]),
            ]);
            best = Some((dist_sq, face));
        }
    }

    if let Some((_, face)) = best {
        return face;
    }

    // Origin inside: express it in barycentric coordinates of all four vertices
    match edges.try_inverse() {
        Some(inverse) => {
            let l = inverse * (origin - w(0));
            keep([
                (points[0], 1.0 - l.x - l.y - l.z),
                (points[1], l.x),
                (points[2], l.y),
                (points[3], l.z),
            ])
        }
        None => points.iter().map(|p| (*p, 0.25)).collect(),
    }
}
